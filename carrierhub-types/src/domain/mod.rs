//! Domain models for the consultation service.

/// Generates `as_str`, `Display` and `FromStr` for enums stored as
/// SCREAMING_SNAKE_CASE text.
macro_rules! text_enum {
    ($name:ident, $kind:literal { $($variant:ident => $text:literal),* $(,)? }) => {
        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),*];

            /// Storage and wire representation.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),*
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::error::DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)*
                    other => Err($crate::error::DomainError::UnknownValue {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

pub mod booking;
pub mod ids;
pub mod money;
pub mod payment;
pub mod user;
pub mod webhook;

pub use booking::{Booking, BookingDetail, BookingStatus, ConsultantType, StudentSummary};
pub use ids::{AdminId, BookingId, PaymentId, StudentId};
pub use money::{Currency, Money};
pub use payment::{Payment, PaymentStatus, PaymentSummary};
pub use user::{Admin, Student};
pub use webhook::{GatewayEvent, PaymentEntity, RefundEntity, WebhookEvent, WebhookStatus};
