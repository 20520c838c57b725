use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Tutor,
    Hod,
    Admin,
    Principal,
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Role::Student),
            "tutor" => Ok(Role::Tutor),
            "hod" => Ok(Role::Hod),
            "admin" => Ok(Role::Admin),
            "principal" => Ok(Role::Principal),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::Student => "student",
            Role::Tutor => "tutor",
            Role::Hod => "hod",
            Role::Admin => "admin",
            Role::Principal => "principal",
        };
        write!(f, "{}", s)
    }
}

/// One row of the `profiles` table. The role string is parsed into [`Role`]
/// wherever gating decisions are made.
#[derive(Debug, Clone, FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub role: String,
    pub password_hash: String,
    pub department_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// What other users are allowed to see of a profile.
#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub role: String,
    pub department_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<Profile> for UserProfile {
    fn from(profile: Profile) -> Self {
        UserProfile {
            id: profile.id,
            first_name: profile.first_name,
            last_name: profile.last_name,
            username: profile.username,
            email: profile.email,
            phone_number: profile.phone_number,
            role: profile.role,
            department_id: profile.department_id,
            batch_id: profile.batch_id,
            created_at: profile.created_at,
            updated_at: profile.updated_at,
        }
    }
}

/// Admin-side provisioning of staff accounts (tutor/hod/admin/principal).
/// Students are created through the student endpoints instead, so their
/// register-number record is never skipped.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    pub last_name: Option<String>,
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: String,
    pub phone_number: Option<String>,
    pub role: String,
    pub department_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: UserProfile,
    pub token: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
}

/// Admin updates to staff profiles: reassignment of department or batch
/// affiliation, contact details. Role changes are deliberately absent.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub department_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn role_round_trips_through_display() {
        for role in [Role::Student, Role::Tutor, Role::Hod, Role::Admin, Role::Principal] {
            assert_eq!(Role::from_str(&role.to_string()).unwrap(), role);
        }
    }

    #[test]
    fn unknown_role_is_rejected() {
        claim::assert_err!(Role::from_str("registrar"));
        claim::assert_err!(Role::from_str("Student"));
    }
}
