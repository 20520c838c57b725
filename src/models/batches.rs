use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

pub const BATCH_STATUS_ACTIVE: &str = "active";
pub const BATCH_STATUS_INACTIVE: &str = "inactive";

/// One section row. Sibling sections share `name`, `department_id` and
/// `total_sections`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Batch {
    pub id: Uuid,
    pub name: String,
    pub section: Option<String>,
    pub department_id: Uuid,
    pub total_sections: i32,
    pub tutor_id: Option<Uuid>,
    pub current_semester: i32,
    pub semester_start: NaiveDate,
    pub semester_end: NaiveDate,
    pub status: String,
    pub created_at: NaiveDateTime,
}

impl Batch {
    pub fn full_name(&self) -> String {
        match &self.section {
            Some(section) => format!("{} {}", self.name, section),
            None => self.name.clone(),
        }
    }
}

/// Batch joined with department and tutor names for the admin listing.
#[derive(Debug, FromRow, Serialize)]
pub struct BatchDetails {
    pub id: Uuid,
    pub name: String,
    pub section: Option<String>,
    pub department_id: Uuid,
    pub department_name: String,
    pub total_sections: i32,
    pub tutor_id: Option<Uuid>,
    pub tutor_name: Option<String>,
    pub current_semester: i32,
    pub semester_start: NaiveDate,
    pub semester_end: NaiveDate,
    pub status: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBatchRequest {
    /// `"YYYY-YYYY"`; sections get their letter appended automatically.
    #[validate(length(min = 1, message = "Batch name is required"))]
    pub name: String,
    #[validate(range(min = 1, max = 26, message = "total_sections must be between 1 and 26"))]
    pub total_sections: i32,
    pub department_id: Uuid,
    pub tutor_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBatchRequest {
    pub tutor_id: Option<Uuid>,
    #[validate(range(min = 1, max = 26, message = "total_sections must be between 1 and 26"))]
    pub total_sections: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SetSemesterRequest {
    #[validate(range(min = 1, max = 8, message = "Semester must lie between 1 and 8"))]
    pub current_semester: i32,
}
