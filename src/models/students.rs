use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use unicode_segmentation::UnicodeSegmentation;
use uuid::Uuid;
use validator::Validate;

/// Flattened join of a student with profile, batch, department, tutor and
/// HOD names, the shape every review screen and the certificate renderer
/// consume.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StudentDetails {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub register_number: String,
    pub parent_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub nationality: Option<String>,
    pub batch_id: Option<Uuid>,
    pub batch_name: Option<String>,
    pub batch_section: Option<String>,
    pub current_semester: Option<i32>,
    pub department_id: Option<Uuid>,
    pub department_name: Option<String>,
    pub tutor_id: Option<Uuid>,
    pub tutor_name: Option<String>,
    pub hod_id: Option<Uuid>,
    pub hod_name: Option<String>,
    pub created_at: NaiveDateTime,
}

impl StudentDetails {
    /// `"2023-2027 A"` style display name, section appended when present.
    pub fn full_batch_name(&self) -> Option<String> {
        self.batch_name.as_ref().map(|name| match &self.batch_section {
            Some(section) => format!("{} {}", name, section),
            None => name.clone(),
        })
    }

    pub fn display_name(&self) -> String {
        match &self.last_name {
            Some(last) => format!("{} {}", self.first_name, last),
            None => self.first_name.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateStudentRequest {
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    pub last_name: Option<String>,
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: String,
    pub phone_number: Option<String>,
    #[validate(length(min = 1, message = "Register number is required"))]
    pub register_number: String,
    pub parent_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub nationality: Option<String>,
    pub department_id: Uuid,
    pub batch_id: Uuid,
    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,
}

/// The fixed bulk-upload column set. Header order in the downloadable
/// template matches this list exactly.
pub const IMPORT_HEADERS: [&str; 9] = [
    "first_name",
    "last_name",
    "username",
    "email",
    "phone_number",
    "register_number",
    "parent_name",
    "department_id",
    "batch_id",
];

/// One parsed spreadsheet row. Rows are validated strictly; a malformed row
/// is reported, never silently skipped.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StudentImportRow {
    #[validate(length(min = 1, message = "first_name is required"))]
    pub first_name: String,
    pub last_name: Option<String>,
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    #[validate(email(message = "email is not a valid address"))]
    pub email: String,
    pub phone_number: Option<String>,
    #[validate(length(min = 1, message = "register_number is required"))]
    pub register_number: String,
    pub parent_name: Option<String>,
    pub department_id: Uuid,
    pub batch_id: Uuid,
}

impl StudentImportRow {
    /// Spreadsheet cells pass the derive checks but can still smuggle in
    /// absurd content; cap name lengths by grapheme count.
    pub fn check_lengths(&self) -> Result<(), String> {
        if self.first_name.graphemes(true).count() > 256 {
            return Err("first_name is longer than 256 characters".to_string());
        }
        if self.register_number.graphemes(true).count() > 64 {
            return Err("register_number is longer than 64 characters".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct ImportRowError {
    /// Spreadsheet row number; the header is row 1.
    pub row: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub failed: usize,
    pub errors: Vec<ImportRowError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details() -> StudentDetails {
        StudentDetails {
            id: Uuid::new_v4(),
            first_name: "Priya".to_string(),
            last_name: Some("Raman".to_string()),
            username: "priya.r".to_string(),
            email: "priya@example.edu".to_string(),
            phone_number: None,
            register_number: "7376211CS239".to_string(),
            parent_name: Some("Raman".to_string()),
            date_of_birth: None,
            nationality: None,
            batch_id: None,
            batch_name: Some("2023-2027".to_string()),
            batch_section: Some("A".to_string()),
            current_semester: Some(4),
            department_id: None,
            department_name: Some("Computer Science".to_string()),
            tutor_id: None,
            tutor_name: None,
            hod_id: None,
            hod_name: None,
            created_at: chrono::NaiveDateTime::from_timestamp_opt(0, 0).unwrap(),
        }
    }

    #[test]
    fn full_batch_name_appends_section() {
        assert_eq!(details().full_batch_name().unwrap(), "2023-2027 A");
    }

    #[test]
    fn full_batch_name_without_section() {
        let mut d = details();
        d.batch_section = None;
        assert_eq!(d.full_batch_name().unwrap(), "2023-2027");
    }

    #[test]
    fn import_row_validation_accepts_well_formed_rows() {
        use fake::faker::internet::en::SafeEmail;
        use fake::faker::name::en::FirstName;
        use fake::Fake;

        let row = StudentImportRow {
            first_name: FirstName().fake(),
            last_name: None,
            username: "student.one".to_string(),
            email: SafeEmail().fake(),
            phone_number: None,
            register_number: "7376211CS240".to_string(),
            parent_name: None,
            department_id: Uuid::new_v4(),
            batch_id: Uuid::new_v4(),
        };
        claim::assert_ok!(validator::Validate::validate(&row));
        claim::assert_ok!(row.check_lengths());
    }

    #[test]
    fn import_row_validation_catches_bad_email() {
        let row = StudentImportRow {
            first_name: "A".to_string(),
            last_name: None,
            username: "a".to_string(),
            email: "not-an-email".to_string(),
            phone_number: None,
            register_number: "R1".to_string(),
            parent_name: None,
            department_id: Uuid::new_v4(),
            batch_id: Uuid::new_v4(),
        };
        claim::assert_err!(validator::Validate::validate(&row));
    }
}
