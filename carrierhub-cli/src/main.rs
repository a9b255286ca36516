//! CarrierHub CLI
//!
//! Command-line interface for the CarrierHub API, plus helpers for
//! exercising the payment flow without a real checkout.

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::{Value, json};

use carrierhub_client::CarrierHubClient;
use carrierhub_types::{
    AdminBookingQuery, BookingId, CreateBookingRequest, PageQuery, RegisterRequest,
    VerifyPaymentRequest,
};
use razorpay_gateway::signature;

#[derive(Parser)]
#[command(name = "carrierhub")]
#[command(author, version, about = "CarrierHub API CLI client", long_about = None)]
struct Cli {
    /// Base URL of the CarrierHub API
    #[arg(
        long,
        env = "CARRIERHUB_API_URL",
        default_value = "http://localhost:5000"
    )]
    api_url: String,

    /// Bearer token of a student or admin
    #[arg(long, env = "CARRIERHUB_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check API health
    Health,
    /// List consultation categories
    Categories,
    /// Registration and login
    Auth {
        #[command(subcommand)]
        action: AuthCommands,
    },
    /// Student bookings
    Booking {
        #[command(subcommand)]
        action: BookingCommands,
    },
    /// Admin console
    Admin {
        #[command(subcommand)]
        action: AdminCommands,
    },
    /// Payment operations
    Payment {
        #[command(subcommand)]
        action: PaymentCommands,
    },
    /// Webhook helpers
    Webhook {
        #[command(subcommand)]
        action: WebhookCommands,
    },
}

#[derive(Subcommand)]
enum AuthCommands {
    /// Register a student account
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        password: String,
    },
    /// Log in and print the token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Log in as an admin
        #[arg(long)]
        admin: bool,
    },
    /// Show the logged-in student
    Me,
}

#[derive(Subcommand)]
enum BookingCommands {
    /// Book a consultation
    Create {
        /// Consultant type, e.g. CAREER_GUIDANCE
        #[arg(long = "type")]
        consultant_type: String,
        #[arg(long)]
        details: String,
        /// Amount in paise
        #[arg(long)]
        amount: i64,
    },
    /// List your bookings
    List {
        #[arg(long)]
        page: Option<String>,
        #[arg(long)]
        limit: Option<String>,
    },
    /// Show one of your bookings
    Get { id: i64 },
}

#[derive(clap::Args)]
struct FilterArgs {
    #[arg(long)]
    status: Option<String>,
    #[arg(long = "type")]
    consultant_type: Option<String>,
    #[arg(long)]
    date_from: Option<String>,
    #[arg(long)]
    date_to: Option<String>,
}

#[derive(Subcommand)]
enum AdminCommands {
    /// List all bookings
    Bookings {
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long)]
        page: Option<String>,
        #[arg(long)]
        limit: Option<String>,
    },
    /// Change a booking's status
    SetStatus { id: i64, status: String },
    /// Export bookings as CSV
    Export {
        #[command(flatten)]
        filter: FilterArgs,
        /// Write to this file instead of stdout
        #[arg(long)]
        output: Option<std::path::PathBuf>,
    },
    /// Dashboard statistics
    Stats,
}

#[derive(Subcommand)]
enum PaymentCommands {
    /// Show the public gateway key
    Key,
    /// Create (or fetch) the gateway order for a booking
    Create { booking: i64 },
    /// Verify a checkout response
    Verify {
        #[arg(long)]
        booking: i64,
        #[arg(long)]
        order: String,
        #[arg(long)]
        payment: String,
        #[arg(long)]
        signature: String,
    },
    /// Open a hosted checkout session
    Session { booking: i64 },
    /// Compute the signature Checkout would return for an order and payment
    Sign {
        #[arg(long)]
        order: String,
        #[arg(long)]
        payment: String,
        #[arg(long, env = "RAZORPAY_KEY_SECRET")]
        secret: String,
    },
}

#[derive(Subcommand)]
enum WebhookCommands {
    /// Send a signed test webhook for a payment
    Send {
        /// payment.captured, payment.failed or payment.authorized
        #[arg(long, default_value = "payment.captured")]
        event: String,
        #[arg(long)]
        order: String,
        #[arg(long)]
        payment: String,
        /// Amount in paise
        #[arg(long)]
        amount: i64,
        #[arg(long)]
        event_id: Option<String>,
        #[arg(long, env = "RAZORPAY_WEBHOOK_SECRET")]
        secret: String,
    },
}

impl FilterArgs {
    fn into_query(self, page: Option<String>, limit: Option<String>) -> AdminBookingQuery {
        AdminBookingQuery {
            status: self.status,
            consultant_type: self.consultant_type,
            page,
            limit,
            date_from: self.date_from,
            date_to: self.date_to,
        }
    }
}

/// Body of a Razorpay payment event.
fn payment_event(event: &str, order_id: &str, payment_id: &str, amount: i64) -> Value {
    let status = match event {
        "payment.failed" => "failed",
        "payment.authorized" => "authorized",
        _ => "captured",
    };
    json!({
        "entity": "event",
        "event": event,
        "payload": {
            "payment": {
                "entity": {
                    "id": payment_id,
                    "order_id": order_id,
                    "amount": amount,
                    "currency": "INR",
                    "status": status
                }
            }
        }
    })
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut client = CarrierHubClient::new(&cli.api_url);
    if let Some(token) = cli.token {
        client = client.with_token(token);
    }

    match cli.command {
        Commands::Health => {
            let health = client.health().await?;
            println!("✓ {} is healthy ({})", health.service, health.environment);
        }

        Commands::Categories => {
            for category in client.categories().await? {
                println!("{:<22} {}", category.consultant_type, category.title);
            }
        }

        Commands::Auth { action } => match action {
            AuthCommands::Register {
                name,
                email,
                phone,
                password,
            } => {
                let auth = client
                    .register(&RegisterRequest {
                        name,
                        email,
                        phone,
                        password,
                    })
                    .await?;
                eprintln!("✓ Registered {}", auth.student.email);
                println!("{}", auth.token);
            }
            AuthCommands::Login {
                email,
                password,
                admin,
            } => {
                let token = if admin {
                    client.admin_login(&email, &password).await?.token
                } else {
                    client.login(&email, &password).await?.token
                };
                println!("{token}");
            }
            AuthCommands::Me => print_json(&client.me().await?)?,
        },

        Commands::Booking { action } => match action {
            BookingCommands::Create {
                consultant_type,
                details,
                amount,
            } => {
                let booking = client
                    .create_booking(&CreateBookingRequest {
                        consultant_type,
                        details,
                        amount,
                    })
                    .await?;
                print_json(&booking)?;
            }
            BookingCommands::List { page, limit } => {
                print_json(&client.my_bookings(&PageQuery { page, limit }).await?)?;
            }
            BookingCommands::Get { id } => {
                print_json(&client.get_booking(BookingId::new(id)).await?)?;
            }
        },

        Commands::Admin { action } => match action {
            AdminCommands::Bookings {
                filter,
                page,
                limit,
            } => {
                let query = filter.into_query(page, limit);
                print_json(&client.admin_bookings(&query).await?)?;
            }
            AdminCommands::SetStatus { id, status } => {
                let booking = client
                    .update_booking_status(BookingId::new(id), &status)
                    .await?;
                print_json(&booking)?;
            }
            AdminCommands::Export { filter, output } => {
                let csv = client.export_bookings(&filter.into_query(None, None)).await?;
                match output {
                    Some(path) => {
                        std::fs::write(&path, csv)?;
                        eprintln!("✓ Wrote {}", path.display());
                    }
                    None => print!("{csv}"),
                }
            }
            AdminCommands::Stats => print_json(&client.dashboard_stats().await?)?,
        },

        Commands::Payment { action } => match action {
            PaymentCommands::Key => println!("{}", client.payment_key().await?),
            PaymentCommands::Create { booking } => {
                print_json(&client.create_payment(BookingId::new(booking)).await?)?;
            }
            PaymentCommands::Verify {
                booking,
                order,
                payment,
                signature,
            } => {
                let payment = client
                    .verify_payment(&VerifyPaymentRequest {
                        razorpay_payment_id: payment,
                        razorpay_order_id: order,
                        razorpay_signature: signature,
                        booking_id: Some(BookingId::new(booking)),
                    })
                    .await?;
                print_json(&payment)?;
            }
            PaymentCommands::Session { booking } => {
                let session = client
                    .create_payment_session(BookingId::new(booking))
                    .await?;
                println!("{}{}", cli.api_url.trim_end_matches('/'), session.payment_url);
            }
            PaymentCommands::Sign {
                order,
                payment,
                secret,
            } => {
                println!("{}", signature::payment_signature(&order, &payment, &secret));
            }
        },

        Commands::Webhook { action } => match action {
            WebhookCommands::Send {
                event,
                order,
                payment,
                amount,
                event_id,
                secret,
            } => {
                let body = serde_json::to_vec(&payment_event(&event, &order, &payment, amount))?;
                let sig = signature::sign(&body, &secret);
                let reply = client.send_webhook(body, &sig, event_id.as_deref()).await?;
                let mark = if reply.success { "✓" } else { "✗" };
                println!("{mark} {}", reply.message);
            }
        },
    }

    Ok(())
}
