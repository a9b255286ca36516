//! Seeds an admin, a sample student and sample bookings.

use carrierhub_app::seed::{self, SeedAccounts};
use carrierhub_repo::{build_repo, security::PASSWORD_HASH_COST};
use carrierhub_types::ConsultantType;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,carrierhub_app=debug".into()),
        )
        .init();

    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;
    let repo = build_repo(&database_url).await?;
    let accounts = SeedAccounts::from_env();

    let report = seed::run(&repo, &accounts, PASSWORD_HASH_COST).await?;
    tracing::info!(
        admin_created = report.admin_created,
        student_created = report.student_created,
        bookings_created = report.bookings_created,
        "Database seeding completed"
    );

    println!("Login credentials:");
    println!("  Admin:   {} / {}", accounts.admin_email, accounts.admin_password);
    println!("  Student: {} / {}", accounts.student_email, accounts.student_password);
    println!("Available consultant categories:");
    for category in ConsultantType::ALL {
        println!("  - {} ({})", category.title(), category);
    }

    Ok(())
}
