//! Booking domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ids::{BookingId, StudentId};
use super::money::{Currency, Money};
use super::payment::PaymentSummary;
use crate::error::DomainError;

/// Kind of consultation a student can book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsultantType {
    CareerGuidance,
    CollegeCourse,
    ExamPreparation,
    StudyAbroad,
    SkillMentorship,
    JobPlacement,
    GovernmentJobs,
    PersonalGrowth,
    AlternativeCareers,
}

text_enum!(ConsultantType, "consultant type" {
    CareerGuidance => "CAREER_GUIDANCE",
    CollegeCourse => "COLLEGE_COURSE",
    ExamPreparation => "EXAM_PREPARATION",
    StudyAbroad => "STUDY_ABROAD",
    SkillMentorship => "SKILL_MENTORSHIP",
    JobPlacement => "JOB_PLACEMENT",
    GovernmentJobs => "GOVERNMENT_JOBS",
    PersonalGrowth => "PERSONAL_GROWTH",
    AlternativeCareers => "ALTERNATIVE_CAREERS",
});

impl ConsultantType {
    /// Display title shown in the category catalogue.
    pub fn title(&self) -> &'static str {
        match self {
            ConsultantType::CareerGuidance => "Career Guidance",
            ConsultantType::CollegeCourse => "College Course Selection",
            ConsultantType::ExamPreparation => "Exam Preparation",
            ConsultantType::StudyAbroad => "Study Abroad",
            ConsultantType::SkillMentorship => "Skill Mentorship",
            ConsultantType::JobPlacement => "Job Placement",
            ConsultantType::GovernmentJobs => "Government Jobs",
            ConsultantType::PersonalGrowth => "Personal Growth",
            ConsultantType::AlternativeCareers => "Alternative Careers",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ConsultantType::CareerGuidance => {
                "Professional career counseling and guidance to help you choose the right career path based on your interests, skills, and market trends."
            }
            ConsultantType::CollegeCourse => {
                "Expert advice on selecting the right college and course that aligns with your career goals and academic performance."
            }
            ConsultantType::ExamPreparation => {
                "Comprehensive preparation strategies and study plans for various competitive exams and entrance tests."
            }
            ConsultantType::StudyAbroad => {
                "Complete guidance for studying abroad including university selection, application process, visa assistance, and scholarship opportunities."
            }
            ConsultantType::SkillMentorship => {
                "Personalized mentorship to develop industry-relevant skills and enhance your professional capabilities."
            }
            ConsultantType::JobPlacement => {
                "Career placement assistance including resume building, interview preparation, and job search strategies."
            }
            ConsultantType::GovernmentJobs => {
                "Specialized guidance for government job preparation including exam strategies, application process, and interview techniques."
            }
            ConsultantType::PersonalGrowth => {
                "Personal development coaching to enhance soft skills, confidence, and overall personality development."
            }
            ConsultantType::AlternativeCareers => {
                "Explore unconventional career paths and emerging opportunities in various industries and sectors."
            }
        }
    }
}

/// Lifecycle of a booking, driven by the payment flow and by admins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    #[default]
    Pending,
    Processing,
    Success,
    Failed,
    Completed,
}

text_enum!(BookingStatus, "booking status" {
    Pending => "PENDING",
    Processing => "PROCESSING",
    Success => "SUCCESS",
    Failed => "FAILED",
    Completed => "COMPLETED",
});

impl BookingStatus {
    /// Only unpaid or previously failed bookings accept a new payment order.
    pub fn is_payable(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Failed)
    }

    /// Paid bookings; a later failure report must not move them back.
    pub fn is_settled(&self) -> bool {
        matches!(self, BookingStatus::Success | BookingStatus::Completed)
    }
}

/// A consultation booked by a student.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: BookingId,
    pub student_id: StudentId,
    pub consultant_type: ConsultantType,
    /// Free-text description of what the student needs
    pub details: String,
    /// Amount in minor units (paise)
    #[schema(example = 150000)]
    pub amount: i64,
    pub currency: Currency,
    pub status: BookingStatus,
    /// Gateway order attached once checkout has started
    pub razorpay_order_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// The booking amount as validated Money.
    pub fn money(&self) -> Result<Money, DomainError> {
        Money::new(self.amount, self.currency)
    }
}

/// Contact fields of the student who owns a booking.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    pub id: StudentId,
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// A booking with its owner and, once paid, its payment.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetail {
    #[serde(flatten)]
    pub booking: Booking,
    pub student: StudentSummary,
    pub payment: Option<PaymentSummary>,
}
