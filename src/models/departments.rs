use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Department {
    pub id: Uuid,
    pub name: String,
    pub created_at: NaiveDateTime,
}

/// Department with its resolved HOD, for the admin listing.
#[derive(Debug, FromRow, Serialize)]
pub struct DepartmentDetails {
    pub id: Uuid,
    pub name: String,
    pub hod_id: Option<Uuid>,
    pub hod_name: Option<String>,
    pub batch_count: i64,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDepartmentRequest {
    #[validate(length(min = 1, message = "Department name is required"))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateDepartmentRequest {
    #[validate(length(min = 1, message = "Department name is required"))]
    pub name: String,
}
