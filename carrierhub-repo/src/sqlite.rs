//! SQLite repository adapter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::str::FromStr;

use carrierhub_types::{
    Admin, AdminCredentials, AdminId, Booking, BookingDetail, BookingFilter, BookingId,
    BookingStatus, ConsultRepository, DashboardStats, NewAdmin, NewBooking, NewPayment,
    NewStudent, NewWebhookEvent, PageRequest, Payment, PaymentStatus, RecordOutcome, RepoError,
    Student, StudentCredentials, StudentId, WebhookEvent, WebhookStatus,
};

use crate::types::{
    BOOKING_COLUMNS, BOOKING_DETAIL_SELECT, DbAdmin, DbBooking, DbBookingCounts,
    DbBookingDetail, DbCategoryCount, DbPayment, DbStudent, DbWebhookEvent, PAYMENT_COLUMNS,
    category_stats, db_err, map_write_err,
};

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Repository
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite repository implementation.
pub struct SqliteRepo {
    pool: SqlitePool,
}

/// Executes SQL statements from a migration file, splitting by semicolons.
async fn execute_migration(pool: &SqlitePool, sql: &str, name: &str) -> anyhow::Result<()> {
    for statement in sql.split(';') {
        let stmt = statement.trim();
        if !stmt.is_empty() {
            sqlx::query(stmt)
                .execute(pool)
                .await
                .map_err(|e| anyhow::anyhow!("Migration {} failed: {}", name, e))?;
        }
    }
    Ok(())
}

async fn run_migrations(pool: &SqlitePool) -> anyhow::Result<()> {
    execute_migration(pool, include_str!("../migrations/0001_create_accounts.sql"), "0001")
        .await?;
    execute_migration(pool, include_str!("../migrations/0002_create_bookings.sql"), "0002")
        .await?;
    execute_migration(
        pool,
        include_str!("../migrations/0003_create_webhook_events.sql"),
        "0003",
    )
    .await?;
    Ok(())
}

impl SqliteRepo {
    /// Creates a new SQLite repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");

        // Ensure on-disk SQLite target directory exists.
        if !in_memory {
            if let Some(path) = database_url
                .strip_prefix("sqlite://")
                .or_else(|| database_url.strip_prefix("sqlite:"))
            {
                let path = path.split('?').next().unwrap_or(path);
                if let Some(parent) = std::path::Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // An in-memory database lives only as long as its connection.
        let pool = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new().connect_with(options).await?
        };

        run_migrations(&pool).await?;
        tracing::debug!(in_memory, "sqlite repository ready");

        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn booking_detail_where(
        &self,
        clause: &str,
        id: i64,
        student_id: Option<i64>,
    ) -> Result<Option<BookingDetail>, RepoError> {
        let sql = format!("{BOOKING_DETAIL_SELECT} WHERE {clause}");
        let mut query = sqlx::query_as::<_, DbBookingDetail>(&sql).bind(id);
        if let Some(student_id) = student_id {
            query = query.bind(student_id);
        }
        let row = query.fetch_optional(&self.pool).await.map_err(db_err)?;
        row.map(DbBookingDetail::into_domain).transpose()
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &BookingFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(student_id) = filter.student_id {
        qb.push(" AND b.student_id = ").push_bind(student_id.get());
    }
    if let Some(status) = filter.status {
        qb.push(" AND b.status = ").push_bind(status.as_str());
    }
    if let Some(kind) = filter.consultant_type {
        qb.push(" AND b.consultant_type = ").push_bind(kind.as_str());
    }
    if let Some(from) = filter.created_from {
        qb.push(" AND b.created_at >= ").push_bind(from);
    }
    if let Some(to) = filter.created_to {
        qb.push(" AND b.created_at <= ").push_bind(to);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Repository implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl ConsultRepository for SqliteRepo {
    async fn create_student(&self, req: NewStudent) -> Result<Student, RepoError> {
        let now = Utc::now();

        let row: DbStudent = sqlx::query_as(
            r#"INSERT INTO students (name, email, phone, password_hash, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?)
               RETURNING id, name, email, phone, password_hash, created_at"#,
        )
        .bind(&req.name)
        .bind(&req.email)
        .bind(&req.phone)
        .bind(&req.password_hash)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_err(e, "Email already registered"))?;

        Ok(row.into_domain())
    }

    async fn find_student_credentials(
        &self,
        email: &str,
    ) -> Result<Option<StudentCredentials>, RepoError> {
        let row: Option<DbStudent> = sqlx::query_as(
            r#"SELECT id, name, email, phone, password_hash, created_at FROM students WHERE email = ?"#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.map(|row| {
            let password_hash = row.password_hash.clone();
            StudentCredentials {
                student: row.into_domain(),
                password_hash,
            }
        }))
    }

    async fn get_student(&self, id: StudentId) -> Result<Option<Student>, RepoError> {
        let row: Option<DbStudent> = sqlx::query_as(
            r#"SELECT id, name, email, phone, password_hash, created_at FROM students WHERE id = ?"#,
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.map(DbStudent::into_domain))
    }

    async fn create_admin(&self, req: NewAdmin) -> Result<Admin, RepoError> {
        let now = Utc::now();

        let row: DbAdmin = sqlx::query_as(
            r#"INSERT INTO admins (name, email, password_hash, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?)
               RETURNING id, name, email, password_hash, created_at"#,
        )
        .bind(&req.name)
        .bind(&req.email)
        .bind(&req.password_hash)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_err(e, "Admin email already registered"))?;

        Ok(row.into_domain())
    }

    async fn find_admin_credentials(
        &self,
        email: &str,
    ) -> Result<Option<AdminCredentials>, RepoError> {
        let row: Option<DbAdmin> = sqlx::query_as(
            r#"SELECT id, name, email, password_hash, created_at FROM admins WHERE email = ?"#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.map(|row| {
            let password_hash = row.password_hash.clone();
            AdminCredentials {
                admin: row.into_domain(),
                password_hash,
            }
        }))
    }

    async fn get_admin(&self, id: AdminId) -> Result<Option<Admin>, RepoError> {
        let row: Option<DbAdmin> = sqlx::query_as(
            r#"SELECT id, name, email, password_hash, created_at FROM admins WHERE id = ?"#,
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.map(DbAdmin::into_domain))
    }

    async fn create_booking(&self, req: NewBooking) -> Result<BookingDetail, RepoError> {
        let now = Utc::now();

        let id: i64 = sqlx::query_scalar(
            r#"INSERT INTO bookings (student_id, consultant_type, details, amount, currency, status, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)
               RETURNING id"#,
        )
        .bind(req.student_id.get())
        .bind(req.consultant_type.as_str())
        .bind(&req.details)
        .bind(req.amount)
        .bind(req.currency.as_str())
        .bind(req.status.as_str())
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        self.get_booking(BookingId::new(id))
            .await?
            .ok_or(RepoError::NotFound)
    }

    async fn get_booking(&self, id: BookingId) -> Result<Option<BookingDetail>, RepoError> {
        self.booking_detail_where("b.id = ?", id.get(), None).await
    }

    async fn get_booking_for_student(
        &self,
        id: BookingId,
        student_id: StudentId,
    ) -> Result<Option<BookingDetail>, RepoError> {
        self.booking_detail_where("b.id = ? AND b.student_id = ?", id.get(), Some(student_id.get()))
            .await
    }

    async fn list_bookings(
        &self,
        filter: &BookingFilter,
        page: Option<PageRequest>,
    ) -> Result<(Vec<BookingDetail>, i64), RepoError> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM bookings b");
        push_filter(&mut count, filter);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        let mut select = QueryBuilder::<Sqlite>::new(BOOKING_DETAIL_SELECT);
        push_filter(&mut select, filter);
        select.push(" ORDER BY b.created_at DESC, b.id DESC");
        if let Some(page) = page {
            select
                .push(" LIMIT ")
                .push_bind(page.limit)
                .push(" OFFSET ")
                .push_bind(page.offset);
        }

        let rows: Vec<DbBookingDetail> = select
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        let bookings = rows
            .into_iter()
            .map(DbBookingDetail::into_domain)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((bookings, total))
    }

    async fn update_booking_status(
        &self,
        id: BookingId,
        status: BookingStatus,
    ) -> Result<Option<BookingDetail>, RepoError> {
        let result = sqlx::query(r#"UPDATE bookings SET status = ?, updated_at = ? WHERE id = ?"#)
            .bind(status.as_str())
            .bind(Utc::now())
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_booking(id).await
    }

    async fn set_booking_order_id(&self, id: BookingId, order_id: &str) -> Result<(), RepoError> {
        let result =
            sqlx::query(r#"UPDATE bookings SET razorpay_order_id = ?, updated_at = ? WHERE id = ?"#)
                .bind(order_id)
                .bind(Utc::now())
                .bind(id.get())
                .execute(&self.pool)
                .await
                .map_err(|e| map_write_err(e, "Order already attached to another booking"))?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn find_booking_by_order_id(&self, order_id: &str) -> Result<Option<Booking>, RepoError> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE razorpay_order_id = ?");
        let row: Option<DbBooking> = sqlx::query_as(&sql)
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.map(DbBooking::into_domain).transpose()
    }

    async fn find_payment_by_gateway_id(
        &self,
        razorpay_payment_id: &str,
    ) -> Result<Option<Payment>, RepoError> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE razorpay_payment_id = ?");
        let row: Option<DbPayment> = sqlx::query_as(&sql)
            .bind(razorpay_payment_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.map(DbPayment::into_domain).transpose()
    }

    async fn record_payment(&self, req: NewPayment) -> Result<RecordOutcome, RepoError> {
        if let Some(existing) = self
            .find_payment_by_gateway_id(&req.razorpay_payment_id)
            .await?
        {
            return Ok(RecordOutcome::AlreadyRecorded(existing));
        }

        let inserted = {
            let mut db_tx = self
                .pool
                .begin()
                .await
                .map_err(|e| RepoError::Transaction(e.to_string()))?;

            let now = Utc::now();
            let sql = format!(
                "INSERT INTO payments (booking_id, razorpay_payment_id, razorpay_order_id, razorpay_signature, amount, currency, status, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                 RETURNING {PAYMENT_COLUMNS}"
            );
            let row: Result<DbPayment, sqlx::Error> = sqlx::query_as(&sql)
                .bind(req.booking_id.get())
                .bind(&req.razorpay_payment_id)
                .bind(&req.razorpay_order_id)
                .bind(&req.razorpay_signature)
                .bind(req.amount)
                .bind(req.currency.as_str())
                .bind(PaymentStatus::Success.as_str())
                .bind(now)
                .bind(now)
                .fetch_one(&mut *db_tx)
                .await;

            match row {
                Ok(row) => {
                    let updated = sqlx::query(
                        r#"UPDATE bookings SET status = ?, updated_at = ? WHERE id = ?"#,
                    )
                    .bind(BookingStatus::Success.as_str())
                    .bind(now)
                    .bind(req.booking_id.get())
                    .execute(&mut *db_tx)
                    .await
                    .map_err(db_err)?;

                    if updated.rows_affected() == 0 {
                        return Err(RepoError::NotFound);
                    }

                    db_tx
                        .commit()
                        .await
                        .map_err(|e| RepoError::Transaction(e.to_string()))?;
                    Ok(row)
                }
                Err(e) => Err(map_write_err(e, "Booking already has a payment")),
            }
        };

        match inserted {
            Ok(row) => Ok(RecordOutcome::Recorded(row.into_domain()?)),
            // Lost a race against a concurrent insert of the same gateway payment.
            Err(RepoError::Conflict(msg)) => self
                .find_payment_by_gateway_id(&req.razorpay_payment_id)
                .await?
                .map(RecordOutcome::AlreadyRecorded)
                .ok_or(RepoError::Conflict(msg)),
            Err(e) => Err(e),
        }
    }

    async fn mark_payment_refunded(
        &self,
        razorpay_payment_id: &str,
    ) -> Result<Option<Payment>, RepoError> {
        let mut db_tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        let now = Utc::now();
        let sql = format!(
            "UPDATE payments SET status = ?, updated_at = ? WHERE razorpay_payment_id = ? RETURNING {PAYMENT_COLUMNS}"
        );
        let row: Option<DbPayment> = sqlx::query_as(&sql)
            .bind(PaymentStatus::Refunded.as_str())
            .bind(now)
            .bind(razorpay_payment_id)
            .fetch_optional(&mut *db_tx)
            .await
            .map_err(db_err)?;

        let Some(row) = row else {
            return Ok(None);
        };

        sqlx::query(r#"UPDATE bookings SET status = ?, updated_at = ? WHERE id = ?"#)
            .bind(BookingStatus::Failed.as_str())
            .bind(now)
            .bind(row.booking_id)
            .execute(&mut *db_tx)
            .await
            .map_err(db_err)?;

        db_tx
            .commit()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        row.into_domain().map(Some)
    }

    async fn dashboard_stats(&self, since: DateTime<Utc>) -> Result<DashboardStats, RepoError> {
        let counts: DbBookingCounts = sqlx::query_as(
            r#"SELECT
                COUNT(*) AS total,
                COALESCE(SUM(CASE WHEN status = 'PENDING' THEN 1 ELSE 0 END), 0) AS pending,
                COALESCE(SUM(CASE WHEN status = 'SUCCESS' THEN 1 ELSE 0 END), 0) AS success,
                COALESCE(SUM(CASE WHEN status = 'COMPLETED' THEN 1 ELSE 0 END), 0) AS completed,
                COALESCE(SUM(CASE WHEN created_at >= ? THEN 1 ELSE 0 END), 0) AS monthly
               FROM bookings"#,
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        let total_revenue: i64 = sqlx::query_scalar(
            r#"SELECT COALESCE(SUM(amount), 0) FROM payments WHERE status = 'SUCCESS'"#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        let categories: Vec<DbCategoryCount> = sqlx::query_as(
            r#"SELECT consultant_type, COUNT(*) AS count FROM bookings
               GROUP BY consultant_type ORDER BY count DESC, consultant_type ASC"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(DashboardStats {
            total_bookings: counts.total,
            pending_bookings: counts.pending,
            success_bookings: counts.success,
            completed_bookings: counts.completed,
            total_revenue,
            monthly_bookings: counts.monthly,
            category_stats: category_stats(categories),
        })
    }

    async fn record_webhook_event(&self, req: NewWebhookEvent) -> Result<WebhookEvent, RepoError> {
        let payload =
            serde_json::to_string(&req.payload).map_err(|e| RepoError::Database(e.to_string()))?;

        // A redelivery of a known event reuses its row and counts the attempt.
        if let Some(event_id) = &req.event_id {
            let retried: Option<DbWebhookEvent> = sqlx::query_as(
                r#"UPDATE webhook_events
                   SET event_type = ?, payload = ?, status = ?, attempts = attempts + 1,
                       last_error = NULL, processed_at = NULL
                   WHERE id = (SELECT id FROM webhook_events WHERE event_id = ? ORDER BY id DESC LIMIT 1)
                   RETURNING id, event_id, event_type, payload, status, attempts, last_error, created_at, processed_at"#,
            )
            .bind(&req.event_type)
            .bind(&payload)
            .bind(WebhookStatus::Processing.as_str())
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

            if let Some(row) = retried {
                return row.into_domain();
            }
        }

        let row: DbWebhookEvent = sqlx::query_as(
            r#"INSERT INTO webhook_events (event_id, event_type, payload, status, attempts, created_at)
               VALUES (?, ?, ?, ?, 1, ?)
               RETURNING id, event_id, event_type, payload, status, attempts, last_error, created_at, processed_at"#,
        )
        .bind(&req.event_id)
        .bind(&req.event_type)
        .bind(payload)
        .bind(WebhookStatus::Processing.as_str())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        row.into_domain()
    }

    async fn find_webhook_event(&self, event_id: &str) -> Result<Option<WebhookEvent>, RepoError> {
        let row: Option<DbWebhookEvent> = sqlx::query_as(
            r#"SELECT id, event_id, event_type, payload, status, attempts, last_error, created_at, processed_at
               FROM webhook_events WHERE event_id = ? ORDER BY id DESC LIMIT 1"#,
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(DbWebhookEvent::into_domain).transpose()
    }

    async fn update_webhook_status(
        &self,
        id: i64,
        status: WebhookStatus,
        last_error: Option<&str>,
    ) -> Result<(), RepoError> {
        let processed_at = matches!(status, WebhookStatus::Completed | WebhookStatus::Failed)
            .then(Utc::now);

        sqlx::query(
            r#"UPDATE webhook_events SET status = ?, last_error = ?, processed_at = ? WHERE id = ?"#,
        )
        .bind(status.as_str())
        .bind(last_error)
        .bind(processed_at)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }
}
