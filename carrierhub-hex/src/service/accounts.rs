//! Registration, login and token authentication.

use carrierhub_repo::security::{hash_password_blocking, verify_password_blocking};
use carrierhub_types::{
    Admin, AdminAuthResponse, AdminId, AppError, ConsultRepository, LoginRequest, NewStudent,
    PaymentGateway, RegisterRequest, RepoError, Student, StudentAuthResponse, StudentId,
};

use super::ConsultService;
use crate::tokens::Role;
use crate::validation;

impl<R: ConsultRepository, G: PaymentGateway> ConsultService<R, G> {
    #[tracing::instrument(skip(self, req), fields(email = %req.email.trim()))]
    pub async fn register(&self, req: RegisterRequest) -> Result<StudentAuthResponse, AppError> {
        let reg = validation::registration(&req)?;

        if self.repo.find_student_credentials(&reg.email).await?.is_some() {
            return Err(AppError::Duplicate("Email already registered".into()));
        }

        let password_hash = hash_password_blocking(reg.password, self.config.bcrypt_cost)
            .await
            .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))?;

        let student = self
            .repo
            .create_student(NewStudent {
                name: reg.name,
                email: reg.email,
                phone: reg.phone,
                password_hash,
            })
            .await
            .map_err(|e| match e {
                RepoError::Conflict(_) => AppError::Duplicate("Email already registered".into()),
                other => other.into(),
            })?;

        let token = self.tokens.issue(Role::Student, student.id.get())?;
        tracing::info!(student_id = %student.id, "student registered");
        Ok(StudentAuthResponse { student, token })
    }

    #[tracing::instrument(skip(self, req))]
    pub async fn login(&self, req: LoginRequest) -> Result<StudentAuthResponse, AppError> {
        let email = validation::login(&req)?;

        let creds = self
            .repo
            .find_student_credentials(&email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !verify_password_blocking(req.password, creds.password_hash).await {
            return Err(AppError::InvalidCredentials);
        }

        let token = self.tokens.issue(Role::Student, creds.student.id.get())?;
        Ok(StudentAuthResponse {
            student: creds.student,
            token,
        })
    }

    #[tracing::instrument(skip(self, req))]
    pub async fn admin_login(&self, req: LoginRequest) -> Result<AdminAuthResponse, AppError> {
        let email = validation::login(&req)?;

        let creds = self
            .repo
            .find_admin_credentials(&email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !verify_password_blocking(req.password, creds.password_hash).await {
            return Err(AppError::InvalidCredentials);
        }

        let token = self.tokens.issue(Role::Admin, creds.admin.id.get())?;
        Ok(AdminAuthResponse {
            admin: creds.admin,
            token,
        })
    }

    /// Resolves a bearer token to the student it names.
    pub async fn authenticate_student(&self, token: &str) -> Result<Student, AppError> {
        let claims = self.tokens.verify(token)?;
        if claims.role != Role::Student {
            return Err(AppError::InvalidToken);
        }
        self.repo
            .get_student(StudentId::new(claims.sub))
            .await?
            .ok_or(AppError::InvalidToken)
    }

    /// Resolves a bearer token to the admin it names.
    pub async fn authenticate_admin(&self, token: &str) -> Result<Admin, AppError> {
        let claims = self.tokens.verify(token)?;
        if claims.role != Role::Admin {
            return Err(AppError::InvalidToken);
        }
        self.repo
            .get_admin(AdminId::new(claims.sub))
            .await?
            .ok_or(AppError::InvalidToken)
    }

    /// Current profile, re-read so edits since login are visible.
    pub async fn me(&self, student: &Student) -> Result<Student, AppError> {
        self.repo
            .get_student(student.id)
            .await?
            .ok_or_else(|| AppError::NotFound("Student not found".into()))
    }
}
