//! Demo data for local environments.
//!
//! Creates an admin, a sample student and three sample bookings for that
//! student. Each step is skipped when its data already exists, so the
//! seeder can run on every deploy.

use carrierhub_repo::security::hash_password_blocking;
use carrierhub_types::{
    BookingFilter, BookingStatus, ConsultRepository, ConsultantType, Currency, NewAdmin,
    NewBooking, NewPayment, NewStudent, StudentId,
};

pub struct SeedAccounts {
    pub admin_email: String,
    pub admin_password: String,
    pub student_email: String,
    pub student_password: String,
}

impl Default for SeedAccounts {
    fn default() -> Self {
        Self {
            admin_email: "admin@carrierhub.com".to_string(),
            admin_password: "Admin@123456".to_string(),
            student_email: "student@carrierhub.com".to_string(),
            student_password: "Student@123456".to_string(),
        }
    }
}

impl SeedAccounts {
    /// Defaults overridden by `SEED_*` variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let var = |key: &str, default: String| {
            std::env::var(key)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(default)
        };
        Self {
            admin_email: var("SEED_ADMIN_EMAIL", defaults.admin_email),
            admin_password: var("SEED_ADMIN_PASSWORD", defaults.admin_password),
            student_email: var("SEED_STUDENT_EMAIL", defaults.student_email),
            student_password: var("SEED_STUDENT_PASSWORD", defaults.student_password),
        }
    }
}

/// What a seeding run actually created.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub admin_created: bool,
    pub student_created: bool,
    pub bookings_created: usize,
}

struct SampleBooking {
    consultant_type: ConsultantType,
    details: &'static str,
    amount: i64,
    status: BookingStatus,
}

const SAMPLE_BOOKINGS: [SampleBooking; 3] = [
    SampleBooking {
        consultant_type: ConsultantType::CareerGuidance,
        details: "I need guidance on choosing between software engineering and data science careers. I have a background in computer science and am interested in both fields.",
        amount: 150000,
        status: BookingStatus::Success,
    },
    SampleBooking {
        consultant_type: ConsultantType::StudyAbroad,
        details: "Looking for guidance on applying to universities in Canada for MS in Computer Science. Need help with application process and visa requirements.",
        amount: 200000,
        status: BookingStatus::Pending,
    },
    SampleBooking {
        consultant_type: ConsultantType::ExamPreparation,
        details: "Need preparation strategy for GATE exam. I have 6 months to prepare and want to focus on computer science subjects.",
        amount: 100000,
        status: BookingStatus::Completed,
    },
];

pub async fn run<R: ConsultRepository>(
    repo: &R,
    accounts: &SeedAccounts,
    bcrypt_cost: u32,
) -> anyhow::Result<SeedReport> {
    let mut report = SeedReport::default();

    if repo
        .find_admin_credentials(&accounts.admin_email)
        .await?
        .is_none()
    {
        let admin = repo
            .create_admin(NewAdmin {
                name: "CarrierHub Admin".to_string(),
                email: accounts.admin_email.clone(),
                password_hash: hash_password_blocking(accounts.admin_password.clone(), bcrypt_cost)
                    .await?,
            })
            .await?;
        tracing::info!(admin_id = %admin.id, email = %admin.email, "admin created");
        report.admin_created = true;
    }

    let student_id = match repo.find_student_credentials(&accounts.student_email).await? {
        Some(existing) => existing.student.id,
        None => {
            let student = repo
                .create_student(NewStudent {
                    name: "Test Student".to_string(),
                    email: accounts.student_email.clone(),
                    phone: "9876543210".to_string(),
                    password_hash: hash_password_blocking(
                        accounts.student_password.clone(),
                        bcrypt_cost,
                    )
                    .await?,
                })
                .await?;
            tracing::info!(student_id = %student.id, email = %student.email, "student created");
            report.student_created = true;
            student.id
        }
    };

    report.bookings_created = seed_bookings(repo, student_id).await?;
    Ok(report)
}

async fn seed_bookings<R: ConsultRepository>(
    repo: &R,
    student_id: StudentId,
) -> anyhow::Result<usize> {
    let filter = BookingFilter {
        student_id: Some(student_id),
        ..Default::default()
    };
    let (_, existing) = repo.list_bookings(&filter, None).await?;
    if existing > 0 {
        tracing::info!(existing, "sample bookings already exist");
        return Ok(0);
    }

    for sample in &SAMPLE_BOOKINGS {
        // Paid bookings reach SUCCESS through the recorded payment.
        let initial = match sample.status {
            BookingStatus::Success => BookingStatus::Pending,
            other => other,
        };
        let detail = repo
            .create_booking(NewBooking {
                student_id,
                consultant_type: sample.consultant_type,
                details: sample.details.to_string(),
                amount: sample.amount,
                currency: Currency::INR,
                status: initial,
            })
            .await?;
        let id = detail.booking.id;

        if sample.status == BookingStatus::Success {
            let order_id = format!("order_seed_{id}");
            repo.set_booking_order_id(id, &order_id).await?;
            repo.record_payment(NewPayment {
                booking_id: id,
                razorpay_payment_id: format!("pay_seed_{id}"),
                razorpay_order_id: order_id,
                razorpay_signature: format!("sig_seed_{id}"),
                amount: sample.amount,
                currency: Currency::INR,
            })
            .await?;
        }
        tracing::info!(booking_id = %id, status = %sample.status, "sample booking created");
    }

    Ok(SAMPLE_BOOKINGS.len())
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use carrierhub_repo::SqliteRepo;

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let repo = SqliteRepo::new("sqlite::memory:").await.unwrap();
        let accounts = SeedAccounts::default();

        let first = run(&repo, &accounts, 4).await.unwrap();
        assert_eq!(
            first,
            SeedReport {
                admin_created: true,
                student_created: true,
                bookings_created: 3,
            }
        );

        let second = run(&repo, &accounts, 4).await.unwrap();
        assert_eq!(second, SeedReport::default());

        let (bookings, total) = repo
            .list_bookings(&BookingFilter::default(), None)
            .await
            .unwrap();
        assert_eq!(total, 3);

        let paid: Vec<_> = bookings.iter().filter(|b| b.payment.is_some()).collect();
        assert_eq!(paid.len(), 1);
        assert_eq!(paid[0].booking.status, BookingStatus::Success);
        assert_eq!(paid[0].booking.amount, 150000);

        let stats = repo
            .dashboard_stats(chrono::Utc::now() - chrono::Duration::days(1))
            .await
            .unwrap();
        assert_eq!(stats.pending_bookings, 1);
        assert_eq!(stats.completed_bookings, 1);
        assert_eq!(stats.total_revenue, 150000);
    }
}
