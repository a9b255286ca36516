//! CSV export of admin booking listings.

use chrono::NaiveDate;
use csv::{QuoteStyle, Terminator, WriterBuilder};

use carrierhub_types::{BookingDetail, Money};

const HEADER: [&str; 12] = [
    "Booking ID",
    "Student Name",
    "Student Email",
    "Student Phone",
    "Consultant Type",
    "Details",
    "Amount (₹)",
    "Status",
    "Payment ID",
    "Payment Status",
    "Created At",
    "Updated At",
];

const MISSING: &str = "N/A";

pub fn filename(date: NaiveDate) -> String {
    format!("bookings-export-{}.csv", date.format("%Y-%m-%d"))
}

/// Renders bookings as CSV with a header row and CRLF line endings.
pub fn bookings_csv(bookings: &[BookingDetail]) -> Result<String, csv::Error> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::CRLF)
        .from_writer(Vec::new());
    writer.write_record(HEADER)?;

    for detail in bookings {
        let b = &detail.booking;
        let amount = Money::new(b.amount, b.currency)
            .map(|m| m.format_major())
            .unwrap_or_else(|_| b.amount.to_string());
        let (payment_id, payment_status) = match &detail.payment {
            Some(p) => (p.razorpay_payment_id.clone(), p.status.to_string()),
            None => (MISSING.to_string(), MISSING.to_string()),
        };

        writer.write_record([
            b.id.to_string(),
            detail.student.name.clone(),
            detail.student.email.clone(),
            detail.student.phone.clone(),
            b.consultant_type.to_string(),
            b.details.clone(),
            amount,
            b.status.to_string(),
            payment_id,
            payment_status,
            b.created_at.to_rfc3339(),
            b.updated_at.to_rfc3339(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
