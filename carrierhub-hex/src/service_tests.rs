//! ConsultService unit tests.

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use serde_json::json;

    use carrierhub_types::{
        AdminBookingQuery, Admin, AdminCredentials, AdminId, AppError, Booking, BookingDetail,
        BookingFilter, BookingId, BookingStatus, CategoryStat, ConsultRepository,
        CreateBookingRequest, DashboardStats, LoginRequest, NewAdmin, NewBooking, NewPayment,
        NewStudent, NewWebhookEvent, PageQuery, PageRequest, Payment, PaymentId, PaymentStatus,
        RecordOutcome, RegisterRequest, RepoError, Student, StudentCredentials, StudentId,
        UpdateBookingStatusRequest, VerifyPaymentRequest, WebhookEvent, WebhookStatus,
    };
    use razorpay_gateway::{OfflineGateway, signature};

    use crate::{ConsultService, ServiceConfig};

    const KEY_SECRET: &str = "key_secret";
    const WEBHOOK_SECRET: &str = "whsec_test";

    #[derive(Default)]
    struct State {
        students: Vec<(Student, String)>,
        admins: Vec<(Admin, String)>,
        bookings: Vec<Booking>,
        payments: Vec<Payment>,
        webhooks: Vec<WebhookEvent>,
    }

    impl State {
        fn detail(&self, booking: &Booking) -> Option<BookingDetail> {
            let (student, _) = self.students.iter().find(|(s, _)| s.id == booking.student_id)?;
            Some(BookingDetail {
                booking: booking.clone(),
                student: student.summary(),
                payment: self
                    .payments
                    .iter()
                    .find(|p| p.booking_id == booking.id)
                    .map(Payment::summary),
            })
        }

        fn booking_mut(&mut self, id: BookingId) -> Option<&mut Booking> {
            self.bookings.iter_mut().find(|b| b.id == id)
        }
    }

    /// Simple in-memory repository for testing the service layer.
    #[derive(Default)]
    pub struct MockRepo {
        state: Mutex<State>,
        fail_payments: AtomicBool,
    }

    impl MockRepo {
        pub fn new() -> Self {
            Self::default()
        }

        /// Makes `record_payment` fail as a storage error would.
        fn fail_payments(&self, fail: bool) {
            self.fail_payments.store(fail, Ordering::SeqCst);
        }

        fn webhook_log(&self) -> Vec<WebhookEvent> {
            self.state.lock().unwrap().webhooks.clone()
        }
    }

    fn next_id(len: usize) -> i64 {
        len as i64 + 1
    }

    #[async_trait]
    impl ConsultRepository for MockRepo {
        async fn create_student(&self, req: NewStudent) -> Result<Student, RepoError> {
            let mut state = self.state.lock().unwrap();
            if state.students.iter().any(|(s, _)| s.email == req.email) {
                return Err(RepoError::Conflict("Email already registered".into()));
            }
            let student = Student {
                id: StudentId::new(next_id(state.students.len())),
                name: req.name,
                email: req.email,
                phone: req.phone,
                created_at: Utc::now(),
            };
            state.students.push((student.clone(), req.password_hash));
            Ok(student)
        }

        async fn find_student_credentials(
            &self,
            email: &str,
        ) -> Result<Option<StudentCredentials>, RepoError> {
            let state = self.state.lock().unwrap();
            Ok(state
                .students
                .iter()
                .find(|(s, _)| s.email == email)
                .map(|(student, hash)| StudentCredentials {
                    student: student.clone(),
                    password_hash: hash.clone(),
                }))
        }

        async fn get_student(&self, id: StudentId) -> Result<Option<Student>, RepoError> {
            let state = self.state.lock().unwrap();
            Ok(state
                .students
                .iter()
                .find(|(s, _)| s.id == id)
                .map(|(s, _)| s.clone()))
        }

        async fn create_admin(&self, req: NewAdmin) -> Result<Admin, RepoError> {
            let mut state = self.state.lock().unwrap();
            let admin = Admin {
                id: AdminId::new(next_id(state.admins.len())),
                name: req.name,
                email: req.email,
                created_at: Utc::now(),
            };
            state.admins.push((admin.clone(), req.password_hash));
            Ok(admin)
        }

        async fn find_admin_credentials(
            &self,
            email: &str,
        ) -> Result<Option<AdminCredentials>, RepoError> {
            let state = self.state.lock().unwrap();
            Ok(state
                .admins
                .iter()
                .find(|(a, _)| a.email == email)
                .map(|(admin, hash)| AdminCredentials {
                    admin: admin.clone(),
                    password_hash: hash.clone(),
                }))
        }

        async fn get_admin(&self, id: AdminId) -> Result<Option<Admin>, RepoError> {
            let state = self.state.lock().unwrap();
            Ok(state
                .admins
                .iter()
                .find(|(a, _)| a.id == id)
                .map(|(a, _)| a.clone()))
        }

        async fn create_booking(&self, req: NewBooking) -> Result<BookingDetail, RepoError> {
            let mut state = self.state.lock().unwrap();
            let now = Utc::now();
            let booking = Booking {
                id: BookingId::new(next_id(state.bookings.len())),
                student_id: req.student_id,
                consultant_type: req.consultant_type,
                details: req.details,
                amount: req.amount,
                currency: req.currency,
                status: req.status,
                razorpay_order_id: None,
                created_at: now,
                updated_at: now,
            };
            state.bookings.push(booking.clone());
            state.detail(&booking).ok_or(RepoError::NotFound)
        }

        async fn get_booking(&self, id: BookingId) -> Result<Option<BookingDetail>, RepoError> {
            let state = self.state.lock().unwrap();
            Ok(state
                .bookings
                .iter()
                .find(|b| b.id == id)
                .and_then(|b| state.detail(b)))
        }

        async fn get_booking_for_student(
            &self,
            id: BookingId,
            student_id: StudentId,
        ) -> Result<Option<BookingDetail>, RepoError> {
            let state = self.state.lock().unwrap();
            Ok(state
                .bookings
                .iter()
                .find(|b| b.id == id && b.student_id == student_id)
                .and_then(|b| state.detail(b)))
        }

        async fn list_bookings(
            &self,
            filter: &BookingFilter,
            page: Option<PageRequest>,
        ) -> Result<(Vec<BookingDetail>, i64), RepoError> {
            let state = self.state.lock().unwrap();
            let mut matching: Vec<BookingDetail> = state
                .bookings
                .iter()
                .filter(|b| filter.student_id.is_none_or(|id| b.student_id == id))
                .filter(|b| filter.status.is_none_or(|s| b.status == s))
                .filter(|b| filter.consultant_type.is_none_or(|c| b.consultant_type == c))
                .filter(|b| filter.created_from.is_none_or(|from| b.created_at >= from))
                .filter(|b| filter.created_to.is_none_or(|to| b.created_at <= to))
                .filter_map(|b| state.detail(b))
                .collect();
            matching.reverse();

            let total = matching.len() as i64;
            let rows = match page {
                Some(p) => matching
                    .into_iter()
                    .skip(p.offset as usize)
                    .take(p.limit as usize)
                    .collect(),
                None => matching,
            };
            Ok((rows, total))
        }

        async fn update_booking_status(
            &self,
            id: BookingId,
            status: BookingStatus,
        ) -> Result<Option<BookingDetail>, RepoError> {
            let mut state = self.state.lock().unwrap();
            let Some(booking) = state.booking_mut(id) else {
                return Ok(None);
            };
            booking.status = status;
            booking.updated_at = Utc::now();
            let booking = booking.clone();
            Ok(state.detail(&booking))
        }

        async fn set_booking_order_id(
            &self,
            id: BookingId,
            order_id: &str,
        ) -> Result<(), RepoError> {
            let mut state = self.state.lock().unwrap();
            let booking = state.booking_mut(id).ok_or(RepoError::NotFound)?;
            booking.razorpay_order_id = Some(order_id.to_string());
            Ok(())
        }

        async fn find_booking_by_order_id(
            &self,
            order_id: &str,
        ) -> Result<Option<Booking>, RepoError> {
            let state = self.state.lock().unwrap();
            Ok(state
                .bookings
                .iter()
                .find(|b| b.razorpay_order_id.as_deref() == Some(order_id))
                .cloned())
        }

        async fn find_payment_by_gateway_id(
            &self,
            razorpay_payment_id: &str,
        ) -> Result<Option<Payment>, RepoError> {
            let state = self.state.lock().unwrap();
            Ok(state
                .payments
                .iter()
                .find(|p| p.razorpay_payment_id == razorpay_payment_id)
                .cloned())
        }

        async fn record_payment(&self, req: NewPayment) -> Result<RecordOutcome, RepoError> {
            if self.fail_payments.load(Ordering::SeqCst) {
                return Err(RepoError::Database("disk I/O error".into()));
            }
            let mut state = self.state.lock().unwrap();
            if let Some(existing) = state
                .payments
                .iter()
                .find(|p| p.razorpay_payment_id == req.razorpay_payment_id)
            {
                return Ok(RecordOutcome::AlreadyRecorded(existing.clone()));
            }
            if state.payments.iter().any(|p| p.booking_id == req.booking_id) {
                return Err(RepoError::Conflict("Booking already has a payment".into()));
            }

            let booking = state.booking_mut(req.booking_id).ok_or(RepoError::NotFound)?;
            booking.status = BookingStatus::Success;

            let payment = Payment {
                id: PaymentId::new(next_id(state.payments.len())),
                booking_id: req.booking_id,
                razorpay_payment_id: req.razorpay_payment_id,
                razorpay_order_id: req.razorpay_order_id,
                razorpay_signature: req.razorpay_signature,
                amount: req.amount,
                currency: req.currency,
                status: PaymentStatus::Success,
                created_at: Utc::now(),
            };
            state.payments.push(payment.clone());
            Ok(RecordOutcome::Recorded(payment))
        }

        async fn mark_payment_refunded(
            &self,
            razorpay_payment_id: &str,
        ) -> Result<Option<Payment>, RepoError> {
            let mut state = self.state.lock().unwrap();
            let Some(payment) = state
                .payments
                .iter_mut()
                .find(|p| p.razorpay_payment_id == razorpay_payment_id)
            else {
                return Ok(None);
            };
            payment.status = PaymentStatus::Refunded;
            let payment = payment.clone();
            if let Some(booking) = state.booking_mut(payment.booking_id) {
                booking.status = BookingStatus::Failed;
            }
            Ok(Some(payment))
        }

        async fn dashboard_stats(
            &self,
            since: DateTime<Utc>,
        ) -> Result<DashboardStats, RepoError> {
            let state = self.state.lock().unwrap();
            let count = |status: BookingStatus| {
                state.bookings.iter().filter(|b| b.status == status).count() as i64
            };

            let mut category_stats: Vec<CategoryStat> = Vec::new();
            for booking in &state.bookings {
                match category_stats
                    .iter_mut()
                    .find(|c| c.consultant_type == booking.consultant_type)
                {
                    Some(stat) => stat.count += 1,
                    None => category_stats.push(CategoryStat {
                        consultant_type: booking.consultant_type,
                        count: 1,
                    }),
                }
            }
            category_stats.sort_by(|a, b| b.count.cmp(&a.count));

            Ok(DashboardStats {
                total_bookings: state.bookings.len() as i64,
                pending_bookings: count(BookingStatus::Pending),
                success_bookings: count(BookingStatus::Success),
                completed_bookings: count(BookingStatus::Completed),
                total_revenue: state
                    .payments
                    .iter()
                    .filter(|p| p.status == PaymentStatus::Success)
                    .map(|p| p.amount)
                    .sum(),
                monthly_bookings: state
                    .bookings
                    .iter()
                    .filter(|b| b.created_at >= since)
                    .count() as i64,
                category_stats,
            })
        }

        async fn record_webhook_event(
            &self,
            req: NewWebhookEvent,
        ) -> Result<WebhookEvent, RepoError> {
            let mut state = self.state.lock().unwrap();
            if let Some(id) = req.event_id.as_deref() {
                if let Some(event) = state
                    .webhooks
                    .iter_mut()
                    .rev()
                    .find(|e| e.event_id.as_deref() == Some(id))
                {
                    event.event_type = req.event_type;
                    event.payload = req.payload;
                    event.status = WebhookStatus::Processing;
                    event.attempts += 1;
                    event.last_error = None;
                    event.processed_at = None;
                    return Ok(event.clone());
                }
            }
            let event = WebhookEvent {
                id: next_id(state.webhooks.len()),
                event_id: req.event_id,
                event_type: req.event_type,
                payload: req.payload,
                status: WebhookStatus::Processing,
                attempts: 1,
                last_error: None,
                created_at: Utc::now(),
                processed_at: None,
            };
            state.webhooks.push(event.clone());
            Ok(event)
        }

        async fn find_webhook_event(
            &self,
            event_id: &str,
        ) -> Result<Option<WebhookEvent>, RepoError> {
            let state = self.state.lock().unwrap();
            Ok(state
                .webhooks
                .iter()
                .rev()
                .find(|e| e.event_id.as_deref() == Some(event_id))
                .cloned())
        }

        async fn update_webhook_status(
            &self,
            id: i64,
            status: WebhookStatus,
            last_error: Option<&str>,
        ) -> Result<(), RepoError> {
            let mut state = self.state.lock().unwrap();
            let event = state
                .webhooks
                .iter_mut()
                .find(|e| e.id == id)
                .ok_or(RepoError::NotFound)?;
            event.status = status;
            event.last_error = last_error.map(str::to_string);
            if matches!(status, WebhookStatus::Completed | WebhookStatus::Failed) {
                event.processed_at = Some(Utc::now());
            }
            Ok(())
        }
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────────────

    type TestService = ConsultService<MockRepo, OfflineGateway>;

    fn service() -> TestService {
        ConsultService::new(
            MockRepo::new(),
            OfflineGateway::new("rzp_test_key", KEY_SECRET, Some(WEBHOOK_SECRET.to_string())),
            ServiceConfig {
                jwt_secret: "test-secret".to_string(),
                bcrypt_cost: 4,
                ..Default::default()
            },
        )
    }

    fn registration(email: &str) -> RegisterRequest {
        RegisterRequest {
            name: "Test Student".to_string(),
            email: email.to_string(),
            phone: "9876543210".to_string(),
            password: "Student@123456".to_string(),
        }
    }

    async fn student(svc: &TestService, email: &str) -> Student {
        svc.register(registration(email)).await.unwrap().student
    }

    async fn booking(svc: &TestService, student: &Student, amount: i64) -> BookingId {
        svc.create_booking(
            student,
            CreateBookingRequest {
                consultant_type: "CAREER_GUIDANCE".to_string(),
                details: "Help me pick between engineering and design".to_string(),
                amount,
            },
        )
        .await
        .unwrap()
        .booking
        .id
    }

    fn checkout(order_id: &str, payment_id: &str, booking_id: BookingId) -> VerifyPaymentRequest {
        VerifyPaymentRequest {
            razorpay_payment_id: payment_id.to_string(),
            razorpay_order_id: order_id.to_string(),
            razorpay_signature: signature::payment_signature(order_id, payment_id, KEY_SECRET),
            booking_id: Some(booking_id),
        }
    }

    async fn webhook(svc: &TestService, body: &serde_json::Value, event_id: Option<&str>) -> Result<crate::service::WebhookAck, AppError> {
        let raw = serde_json::to_vec(body).unwrap();
        let sig = signature::sign(&raw, WEBHOOK_SECRET);
        svc.handle_webhook(&raw, Some(&sig), event_id).await
    }

    fn payment_event(event: &str, payment_id: &str, order_id: &str, amount: i64) -> serde_json::Value {
        json!({
            "event": event,
            "payload": {
                "payment": {
                    "entity": {
                        "id": payment_id,
                        "order_id": order_id,
                        "amount": amount,
                        "currency": "INR",
                        "status": "captured"
                    }
                }
            }
        })
    }

    async fn status_of(svc: &TestService, id: BookingId) -> BookingStatus {
        svc.repo().get_booking(id).await.unwrap().unwrap().booking.status
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Accounts
    // ─────────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_register_then_login() {
        let svc = service();
        let registered = svc.register(registration("Asha@Example.com")).await.unwrap();
        assert_eq!(registered.student.email, "asha@example.com");

        let me = svc.authenticate_student(&registered.token).await.unwrap();
        assert_eq!(me.id, registered.student.id);

        let login = svc
            .login(LoginRequest {
                email: "asha@example.com".to_string(),
                password: "Student@123456".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(login.student.id, registered.student.id);
    }

    #[tokio::test]
    async fn test_bad_credentials_are_indistinguishable() {
        let svc = service();
        student(&svc, "asha@example.com").await;

        let wrong_password = svc
            .login(LoginRequest {
                email: "asha@example.com".to_string(),
                password: "Wrong@123456".to_string(),
            })
            .await;
        assert!(matches!(wrong_password, Err(AppError::InvalidCredentials)));

        let unknown = svc
            .login(LoginRequest {
                email: "nobody@example.com".to_string(),
                password: "Student@123456".to_string(),
            })
            .await;
        assert!(matches!(unknown, Err(AppError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_duplicate_registration() {
        let svc = service();
        student(&svc, "asha@example.com").await;

        let result = svc.register(registration("ASHA@example.com")).await;
        assert!(matches!(result, Err(AppError::Duplicate(_))));
    }

    #[tokio::test]
    async fn test_registration_validation() {
        let svc = service();
        let mut req = registration("asha@example.com");
        req.password = "weakpassword".to_string();

        let result = svc.register(req).await;
        assert!(matches!(result, Err(AppError::Validation(ref f)) if f[0].field == "password"));
    }

    #[tokio::test]
    async fn test_tokens_are_role_bound() {
        let svc = service();
        let student_token = svc.register(registration("asha@example.com")).await.unwrap().token;

        let hash = carrierhub_repo::security::hash_password("Admin@123456", 4).unwrap();
        svc.repo()
            .create_admin(NewAdmin {
                name: "System Admin".to_string(),
                email: "admin@carrierhub.com".to_string(),
                password_hash: hash,
            })
            .await
            .unwrap();
        let admin_token = svc
            .admin_login(LoginRequest {
                email: "admin@carrierhub.com".to_string(),
                password: "Admin@123456".to_string(),
            })
            .await
            .unwrap()
            .token;

        assert!(svc.authenticate_admin(&admin_token).await.is_ok());
        assert!(matches!(
            svc.authenticate_student(&admin_token).await,
            Err(AppError::InvalidToken)
        ));
        assert!(matches!(
            svc.authenticate_admin(&student_token).await,
            Err(AppError::InvalidToken)
        ));
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Bookings
    // ─────────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_booking_is_pending_inr() {
        let svc = service();
        let asha = student(&svc, "asha@example.com").await;
        let id = booking(&svc, &asha, 150000).await;

        let detail = svc.get_my_booking(&asha, &id.to_string()).await.unwrap();
        assert_eq!(detail.booking.status, BookingStatus::Pending);
        assert_eq!(detail.booking.currency.as_str(), "INR");
        assert!(detail.payment.is_none());
    }

    #[tokio::test]
    async fn test_booking_below_minimum_rejected() {
        let svc = service();
        let asha = student(&svc, "asha@example.com").await;

        let result = svc
            .create_booking(
                &asha,
                CreateBookingRequest {
                    consultant_type: "CAREER_GUIDANCE".to_string(),
                    details: "Help me pick between engineering and design".to_string(),
                    amount: 999,
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_other_students_booking_is_not_found() {
        let svc = service();
        let asha = student(&svc, "asha@example.com").await;
        let ravi = student(&svc, "ravi@example.com").await;
        let id = booking(&svc, &asha, 1500).await;

        let result = svc.get_my_booking(&ravi, &id.to_string()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let result = svc.get_my_booking(&asha, "abc").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_my_bookings_paginate() {
        let svc = service();
        let asha = student(&svc, "asha@example.com").await;
        for _ in 0..3 {
            booking(&svc, &asha, 1500).await;
        }

        let page = svc
            .list_my_bookings(
                &asha,
                PageQuery {
                    page: Some("2".to_string()),
                    limit: Some("2".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(page.bookings.len(), 1);
        assert_eq!(page.pagination.total, 3);
        assert_eq!(page.pagination.pages, 2);
    }

    #[tokio::test]
    async fn test_admin_update_and_export() {
        let svc = service();
        let asha = student(&svc, "asha@example.com").await;
        let id = booking(&svc, &asha, 150000).await;

        let updated = svc
            .admin_update_status(
                &id.to_string(),
                UpdateBookingStatusRequest {
                    status: "COMPLETED".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.booking.status, BookingStatus::Completed);

        let missing = svc
            .admin_update_status(
                "999",
                UpdateBookingStatusRequest {
                    status: "COMPLETED".to_string(),
                },
            )
            .await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));

        let export = svc
            .export_bookings(AdminBookingQuery {
                status: Some("COMPLETED".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(export.filename.starts_with("bookings-export-"));
        assert_eq!(export.body.lines().count(), 2);
        assert!(export.body.contains("1500.00,COMPLETED,N/A,N/A"));

        let stats = svc.dashboard_stats().await.unwrap();
        assert_eq!(stats.total_bookings, 1);
        assert_eq!(stats.completed_bookings, 1);
        assert_eq!(stats.monthly_bookings, 1);
    }

    #[test]
    fn test_categories_catalogue() {
        let categories = service().categories();
        assert_eq!(categories.len(), 9);
        assert_eq!(categories[0].title, "Career Guidance");
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Payments
    // ─────────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_order_created_once() {
        let svc = service();
        let asha = student(&svc, "asha@example.com").await;
        let id = booking(&svc, &asha, 150000).await;

        let first = svc.create_payment_order(&asha, id).await.unwrap();
        assert!(!first.existing);
        assert_eq!(first.order.amount, 150000);
        assert_eq!(first.order.key_id, "rzp_test_key");

        let second = svc.create_payment_order(&asha, id).await.unwrap();
        assert!(second.existing);
        assert_eq!(second.message(), "Payment order already exists");
        assert_eq!(second.order.order_id, first.order.order_id);

        let orders = svc.gateway().orders();
        assert_eq!(orders.len(), 1);
        let (request, _) = &orders[0];
        assert_eq!(request.receipt, id.to_string());
        assert_eq!(request.notes["bookingId"], id.to_string());
        assert_eq!(request.notes["studentEmail"], "asha@example.com");
        assert_eq!(request.notes["consultantType"], "CAREER_GUIDANCE");
    }

    #[tokio::test]
    async fn test_order_requires_payable_booking() {
        let svc = service();
        let asha = student(&svc, "asha@example.com").await;
        let id = booking(&svc, &asha, 1500).await;
        svc.repo()
            .update_booking_status(id, BookingStatus::Completed)
            .await
            .unwrap();

        let result = svc.create_payment_order(&asha, id).await;
        assert!(matches!(
            result,
            Err(AppError::InvalidBookingStatus(BookingStatus::Completed))
        ));
    }

    #[tokio::test]
    async fn test_gateway_failure_leaves_booking_untouched() {
        let svc = service();
        let asha = student(&svc, "asha@example.com").await;
        let id = booking(&svc, &asha, 1500).await;
        svc.gateway().set_unavailable(true);

        let result = svc.create_payment_order(&asha, id).await;
        assert!(matches!(result, Err(AppError::Gateway(_))));

        let detail = svc.repo().get_booking(id).await.unwrap().unwrap();
        assert!(detail.booking.razorpay_order_id.is_none());
    }

    #[tokio::test]
    async fn test_verify_payment_records_once() {
        let svc = service();
        let asha = student(&svc, "asha@example.com").await;
        let id = booking(&svc, &asha, 150000).await;
        let order_id = svc.create_payment_order(&asha, id).await.unwrap().order.order_id;

        let verified = svc
            .verify_payment(&asha, checkout(&order_id, "pay_1", id))
            .await
            .unwrap();
        assert!(!verified.already_verified);
        assert_eq!(verified.payment.amount, 150000);
        assert_eq!(status_of(&svc, id).await, BookingStatus::Success);

        let again = svc
            .verify_payment(&asha, checkout(&order_id, "pay_1", id))
            .await
            .unwrap();
        assert!(again.already_verified);
        assert_eq!(again.payment.id, verified.payment.id);
    }

    #[tokio::test]
    async fn test_bad_signature_fails_booking() {
        let svc = service();
        let asha = student(&svc, "asha@example.com").await;
        let id = booking(&svc, &asha, 1500).await;
        let order_id = svc.create_payment_order(&asha, id).await.unwrap().order.order_id;

        let mut req = checkout(&order_id, "pay_1", id);
        req.razorpay_signature = "0".repeat(64);

        let result = svc.verify_payment(&asha, req).await;
        assert!(matches!(result, Err(AppError::InvalidSignature(_))));
        assert_eq!(status_of(&svc, id).await, BookingStatus::Failed);

        // A failed booking can be retried.
        assert!(svc.create_payment_order(&asha, id).await.is_ok());
    }

    #[tokio::test]
    async fn test_bad_signature_keeps_paid_booking() {
        let svc = service();
        let asha = student(&svc, "asha@example.com").await;
        let id = booking(&svc, &asha, 1500).await;
        let order_id = svc.create_payment_order(&asha, id).await.unwrap().order.order_id;
        svc.verify_payment(&asha, checkout(&order_id, "pay_1", id))
            .await
            .unwrap();

        let mut forged = checkout(&order_id, "pay_2", id);
        forged.razorpay_signature = "0".repeat(64);

        let result = svc.verify_payment(&asha, forged).await;
        assert!(matches!(result, Err(AppError::InvalidSignature(_))));
        assert_eq!(status_of(&svc, id).await, BookingStatus::Success);
    }

    #[tokio::test]
    async fn test_verify_rejects_foreign_order_and_payment() {
        let svc = service();
        let asha = student(&svc, "asha@example.com").await;
        let first = booking(&svc, &asha, 1500).await;
        let second = booking(&svc, &asha, 1500).await;
        let first_order = svc.create_payment_order(&asha, first).await.unwrap().order.order_id;
        let second_order = svc.create_payment_order(&asha, second).await.unwrap().order.order_id;

        let result = svc
            .verify_payment(&asha, checkout(&first_order, "pay_x", second))
            .await;
        assert!(matches!(result, Err(AppError::PaymentMismatch(_))));

        svc.verify_payment(&asha, checkout(&first_order, "pay_1", first))
            .await
            .unwrap();
        let reused = svc
            .verify_payment(&asha, checkout(&second_order, "pay_1", second))
            .await;
        assert!(matches!(reused, Err(AppError::PaymentMismatch(_))));
    }

    #[tokio::test]
    async fn test_payment_session_opens_checkout() {
        let svc = service();
        let asha = student(&svc, "asha@example.com").await;
        let id = booking(&svc, &asha, 200000).await;

        let session = svc.create_payment_session(&asha, id).await.unwrap();
        assert!(session.payment_url.starts_with("/api/payments/web-payment?token="));
        assert!(session.payment_url.ends_with(&session.payment_token));

        let ctx = svc.web_checkout(&session.payment_token).await.unwrap();
        assert_eq!(ctx.booking_id, id);
        assert_eq!(ctx.amount, 200000);
        assert_eq!(ctx.student_email, "asha@example.com");

        let detail = svc.repo().get_booking(id).await.unwrap().unwrap();
        assert_eq!(detail.booking.razorpay_order_id, Some(ctx.order_id));

        let access_token = svc.tokens().issue(crate::tokens::Role::Student, asha.id.get()).unwrap();
        assert!(matches!(
            svc.web_checkout(&access_token).await,
            Err(AppError::InvalidToken)
        ));
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Webhooks
    // ─────────────────────────────────────────────────────────────────────────────

    async fn ordered_booking(svc: &TestService, amount: i64) -> (BookingId, String) {
        let asha = student(svc, "asha@example.com").await;
        let id = booking(svc, &asha, amount).await;
        let order_id = svc.create_payment_order(&asha, id).await.unwrap().order.order_id;
        (id, order_id)
    }

    #[tokio::test]
    async fn test_webhook_signature_required() {
        let svc = service();
        let body = serde_json::to_vec(&payment_event("payment.captured", "pay_1", "order_1", 1500)).unwrap();

        let missing = svc.handle_webhook(&body, None, None).await;
        assert!(matches!(missing, Err(AppError::InvalidSignature(_))));

        let forged = svc.handle_webhook(&body, Some("deadbeef"), None).await;
        assert!(matches!(forged, Err(AppError::InvalidSignature(_))));
        assert!(svc.repo().webhook_log().is_empty());
    }

    #[tokio::test]
    async fn test_webhook_payload_must_be_an_event() {
        let svc = service();
        let result = webhook(&svc, &json!({"hello": "world"}), None).await;
        assert!(matches!(result, Err(AppError::InvalidPayload(_))));
    }

    #[tokio::test]
    async fn test_captured_webhook_records_payment() {
        let svc = service();
        let (id, order_id) = ordered_booking(&svc, 150000).await;
        let event = payment_event("payment.captured", "pay_1", &order_id, 150000);

        let ack = webhook(&svc, &event, Some("evt_1")).await.unwrap();
        assert!(ack.success);
        assert_eq!(status_of(&svc, id).await, BookingStatus::Success);

        let payment = svc.repo().find_payment_by_gateway_id("pay_1").await.unwrap().unwrap();
        assert_eq!(payment.razorpay_signature, "");

        let replay = webhook(&svc, &event, Some("evt_1")).await.unwrap();
        assert_eq!(replay.message, "Event already processed");

        let redelivered = webhook(&svc, &event, Some("evt_2")).await.unwrap();
        assert_eq!(redelivered.message, "Payment already processed");

        let log = svc.repo().webhook_log();
        assert_eq!(log.len(), 2);
        assert!(log.iter().all(|e| e.status == WebhookStatus::Completed));
    }

    #[tokio::test]
    async fn test_captured_webhook_anomalies_are_acknowledged() {
        let svc = service();
        let (id, order_id) = ordered_booking(&svc, 150000).await;

        let mismatch = webhook(&svc, &payment_event("payment.captured", "pay_1", &order_id, 100), None)
            .await
            .unwrap();
        assert!(!mismatch.success);
        assert_eq!(mismatch.message, "Amount mismatch detected");
        assert_eq!(status_of(&svc, id).await, BookingStatus::Pending);

        let unknown = webhook(&svc, &payment_event("payment.captured", "pay_2", "order_unknown", 150000), None)
            .await
            .unwrap();
        assert!(!unknown.success);
        assert_eq!(unknown.message, "Booking not found");
    }

    #[tokio::test]
    async fn test_failed_webhook_does_not_undo_success() {
        let svc = service();
        let (id, order_id) = ordered_booking(&svc, 1500).await;

        webhook(&svc, &payment_event("payment.authorized", "pay_1", &order_id, 1500), None)
            .await
            .unwrap();
        assert_eq!(status_of(&svc, id).await, BookingStatus::Processing);

        webhook(&svc, &payment_event("payment.failed", "pay_1", &order_id, 1500), None)
            .await
            .unwrap();
        assert_eq!(status_of(&svc, id).await, BookingStatus::Failed);

        webhook(&svc, &payment_event("payment.captured", "pay_2", &order_id, 1500), None)
            .await
            .unwrap();
        webhook(&svc, &payment_event("payment.failed", "pay_3", &order_id, 1500), None)
            .await
            .unwrap();
        assert_eq!(status_of(&svc, id).await, BookingStatus::Success);
    }

    #[tokio::test]
    async fn test_refund_webhook() {
        let svc = service();
        let (id, order_id) = ordered_booking(&svc, 1500).await;
        webhook(&svc, &payment_event("payment.captured", "pay_1", &order_id, 1500), None)
            .await
            .unwrap();

        let refund = |payment_id: &str| {
            json!({
                "event": "refund.processed",
                "payload": {"refund": {"entity": {"id": "rfnd_1", "payment_id": payment_id, "amount": 1500}}}
            })
        };

        let ack = webhook(&svc, &refund("pay_1"), None).await.unwrap();
        assert!(ack.success);
        assert_eq!(status_of(&svc, id).await, BookingStatus::Failed);

        let unknown = webhook(&svc, &refund("pay_missing"), None).await.unwrap();
        assert_eq!(unknown.message, "Payment not found");
    }

    #[tokio::test]
    async fn test_unknown_event_acknowledged() {
        let svc = service();
        let ack = webhook(&svc, &json!({"event": "order.paid", "payload": {}}), None)
            .await
            .unwrap();
        assert!(ack.success);
    }

    #[tokio::test]
    async fn test_storage_failure_is_retryable() {
        let svc = service();
        let (_, order_id) = ordered_booking(&svc, 1500).await;
        svc.repo().fail_payments(true);
        let event = payment_event("payment.captured", "pay_1", &order_id, 1500);

        let result = webhook(&svc, &event, Some("evt_9")).await;
        assert!(matches!(result, Err(AppError::Webhook(_))));

        let log = svc.repo().webhook_log();
        assert_eq!(log[0].status, WebhookStatus::Failed);
        assert!(log[0].last_error.as_deref().unwrap().contains("disk I/O error"));

        svc.repo().fail_payments(false);
        let ack = webhook(&svc, &event, Some("evt_9")).await.unwrap();
        assert!(ack.success);

        let log = svc.repo().webhook_log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].attempts, 2);
        assert_eq!(log[0].status, WebhookStatus::Completed);
        assert!(log[0].last_error.is_none());
    }
}
