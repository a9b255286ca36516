//! Database-assigned identifiers.

use serde::{Deserialize, Deserializer, Serialize, de::Error};
use serde_json::Value;

macro_rules! define_id {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(
                Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
                utoipa::ToSchema,
            )]
            #[serde(transparent)]
            #[schema(value_type = i64, example = 1)]
            pub struct $name(i64);

            impl $name {
                /// Wraps a raw database key.
                pub fn new(raw: i64) -> Self {
                    Self(raw)
                }

                /// Returns the raw database key.
                pub fn get(self) -> i64 {
                    self.0
                }
            }

            impl From<i64> for $name {
                fn from(raw: i64) -> Self {
                    Self(raw)
                }
            }

            impl std::fmt::Display for $name {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    write!(f, "{}", self.0)
                }
            }

            impl std::str::FromStr for $name {
                type Err = std::num::ParseIntError;

                fn from_str(s: &str) -> Result<Self, Self::Err> {
                    s.trim().parse().map(Self)
                }
            }
        )*
    };
}

define_id! {
    /// Unique identifier for a Student.
    StudentId,
    /// Unique identifier for an Admin.
    AdminId,
    /// Unique identifier for a Booking.
    BookingId,
    /// Unique identifier for a Payment.
    PaymentId,
}

/// Reads a positive id sent either as a JSON number or as a numeric string.
pub fn positive_id<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: From<i64>,
{
    let raw = Value::deserialize(deserializer)?;
    let id = match &raw {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    match id {
        Some(id) if id > 0 => Ok(T::from(id)),
        _ => Err(D::Error::custom(format!(
            "expected a positive integer id, got {raw}"
        ))),
    }
}

/// [`positive_id`] for optional fields; `null` reads as absent.
pub fn optional_positive_id<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: From<i64>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(value) => positive_id(value).map(Some).map_err(D::Error::custom),
    }
}
