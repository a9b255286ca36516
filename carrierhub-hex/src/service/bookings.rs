//! Student bookings and the admin views over them.

use chrono::{Datelike, NaiveTime, Utc};

use carrierhub_types::{
    AdminBookingQuery, AppError, BookingDetail, BookingFilter, BookingListResponse,
    BookingStatus, CategoryInfo, ConsultRepository, ConsultantType, CreateBookingRequest,
    Currency, DashboardStats, NewBooking, PageQuery, PageRequest, Pagination, PaymentGateway,
    Student, UpdateBookingStatusRequest,
};

use super::ConsultService;
use crate::{export, validation};

/// A rendered CSV download.
#[derive(Debug, Clone)]
pub struct CsvExport {
    pub filename: String,
    pub body: String,
}

impl<R: ConsultRepository, G: PaymentGateway> ConsultService<R, G> {
    // ─────────────────────────────────────────────────────────────────────────────
    // Student
    // ─────────────────────────────────────────────────────────────────────────────

    #[tracing::instrument(skip(self, student, req), fields(student_id = %student.id))]
    pub async fn create_booking(
        &self,
        student: &Student,
        req: CreateBookingRequest,
    ) -> Result<BookingDetail, AppError> {
        let input = validation::booking(&req, self.config.min_booking_amount)?;

        let detail = self
            .repo
            .create_booking(NewBooking {
                student_id: student.id,
                consultant_type: input.consultant_type,
                details: input.details,
                amount: input.amount,
                currency: Currency::INR,
                status: BookingStatus::Pending,
            })
            .await?;

        tracing::info!(booking_id = %detail.booking.id, "booking created");
        Ok(detail)
    }

    pub async fn list_my_bookings(
        &self,
        student: &Student,
        query: PageQuery,
    ) -> Result<BookingListResponse, AppError> {
        let (page, limit) = validation::pagination(query.page.as_deref(), query.limit.as_deref())?;
        let filter = BookingFilter {
            student_id: Some(student.id),
            ..Default::default()
        };
        self.paged(&filter, page, limit).await
    }

    /// A student's own booking; someone else's is reported as missing.
    pub async fn get_my_booking(
        &self,
        student: &Student,
        raw_id: &str,
    ) -> Result<BookingDetail, AppError> {
        let id = validation::booking_id(raw_id)?;
        self.repo
            .get_booking_for_student(id, student.id)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".into()))
    }

    pub fn categories(&self) -> Vec<CategoryInfo> {
        ConsultantType::ALL.iter().copied().map(CategoryInfo::from).collect()
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Admin
    // ─────────────────────────────────────────────────────────────────────────────

    pub async fn admin_list_bookings(
        &self,
        query: AdminBookingQuery,
    ) -> Result<BookingListResponse, AppError> {
        let (page, limit) = validation::pagination(query.page.as_deref(), query.limit.as_deref())?;
        let filter = validation::admin_filter(&query)?;
        self.paged(&filter, page, limit).await
    }

    #[tracing::instrument(skip(self, req), fields(status = %req.status))]
    pub async fn admin_update_status(
        &self,
        raw_id: &str,
        req: UpdateBookingStatusRequest,
    ) -> Result<BookingDetail, AppError> {
        let id = validation::booking_id(raw_id)?;
        let status = validation::booking_status(&req.status)?;

        let detail = self
            .repo
            .update_booking_status(id, status)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".into()))?;

        tracing::info!(booking_id = %id, status = %status, "booking status updated by admin");
        Ok(detail)
    }

    /// Every booking matching the filters, unpaginated, as CSV.
    pub async fn export_bookings(&self, query: AdminBookingQuery) -> Result<CsvExport, AppError> {
        let filter = validation::admin_filter(&query)?;
        let (bookings, total) = self.repo.list_bookings(&filter, None).await?;

        tracing::info!(total, "bookings exported");
        Ok(CsvExport {
            filename: export::filename(Utc::now().date_naive()),
            body: export::bookings_csv(&bookings)
                .map_err(|e| AppError::Internal(format!("CSV export failed: {e}")))?,
        })
    }

    /// Totals over all bookings; the monthly figure counts from the first
    /// day of the current UTC month.
    pub async fn dashboard_stats(&self) -> Result<DashboardStats, AppError> {
        let today = Utc::now().date_naive();
        let since = today
            .with_day(1)
            .unwrap_or(today)
            .and_time(NaiveTime::MIN)
            .and_utc();

        Ok(self.repo.dashboard_stats(since).await?)
    }

    async fn paged(
        &self,
        filter: &BookingFilter,
        page: u32,
        limit: u32,
    ) -> Result<BookingListResponse, AppError> {
        let (bookings, total) = self
            .repo
            .list_bookings(filter, Some(PageRequest::new(page, limit)))
            .await?;

        Ok(BookingListResponse {
            bookings,
            pagination: Pagination::new(page, limit, total),
        })
    }
}
