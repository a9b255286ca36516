//! Student and admin accounts.
//!
//! Password hashes never appear on these types; repositories hand them out
//! separately through credential lookups.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::booking::StudentSummary;
use super::ids::{AdminId, StudentId};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: StudentId,
    #[schema(example = "Test Student")]
    pub name: String,
    #[schema(example = "student@carrierhub.com")]
    pub email: String,
    #[schema(example = "9876543210")]
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

impl Student {
    pub fn summary(&self) -> StudentSummary {
        StudentSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    pub id: AdminId,
    #[schema(example = "System Admin")]
    pub name: String,
    #[schema(example = "admin@carrierhub.com")]
    pub email: String,
    pub created_at: DateTime<Utc>,
}
