use std::collections::HashMap;
use std::io::Cursor;

use actix_multipart::Multipart;
use actix_web::{get, post, web, HttpResponse, Result};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use futures_util::TryStreamExt;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::core::jwt_auth::{require_role, JwtMiddleware};
use crate::core::{AppError, AppSuccessResponse};
use crate::db::students;
use crate::models::pagination::{PaginationMeta, PaginationQuery};
use crate::models::students::{
    CreateStudentRequest, ImportReport, ImportRowError, StudentImportRow, IMPORT_HEADERS,
};
use crate::models::users::Role;

const IMPORT_FILE_LIMIT: usize = 10 * 1024 * 1024; // 10MB

#[tracing::instrument(name = "Create Student", skip(pool, auth, request))]
#[post("")]
pub async fn create_student(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    request: web::Json<CreateStudentRequest>,
) -> Result<HttpResponse, AppError> {
    require_role(&auth.claims, &[Role::Admin])?;
    request.validate()?;

    if crate::db::profiles::email_exists(&pool, &request.email).await? {
        return Err(AppError::validation_error(
            "A user with this email address already exists",
        ));
    }
    if crate::db::profiles::username_exists(&pool, &request.username).await? {
        return Err(AppError::validation_error("This username is already taken"));
    }
    if students::register_number_exists(&pool, &request.register_number).await? {
        return Err(AppError::validation_error(
            "A student with this register number already exists",
        ));
    }

    let details = students::create_student(&pool, &request).await?;

    Ok(HttpResponse::Created().json(AppSuccessResponse {
        success: true,
        data: details,
        message: "Student created successfully".to_string(),
        pagination: None,
    }))
}

/// Listing is role-scoped: admins see the whole college, tutors and HODs
/// only their assigned students.
#[tracing::instrument(name = "List Students", skip(pool, auth))]
#[get("")]
pub async fn list_students(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    query: web::Query<PaginationQuery>,
) -> Result<HttpResponse, AppError> {
    let role = require_role(
        &auth.claims,
        &[Role::Admin, Role::Tutor, Role::Hod, Role::Principal],
    )?;

    let mut pagination = query.into_inner();
    pagination.validate();

    match role {
        Role::Tutor => {
            let list = students::fetch_students_for_tutor(&pool, auth.user_id).await?;
            Ok(HttpResponse::Ok().json(AppSuccessResponse {
                success: true,
                data: list,
                message: "Students retrieved successfully".to_string(),
                pagination: None,
            }))
        }
        Role::Hod => {
            let list = students::fetch_students_for_hod(&pool, auth.user_id).await?;
            Ok(HttpResponse::Ok().json(AppSuccessResponse {
                success: true,
                data: list,
                message: "Students retrieved successfully".to_string(),
                pagination: None,
            }))
        }
        _ => {
            let (list, total) =
                students::fetch_all_students_with_details(&pool, &pagination).await?;
            Ok(HttpResponse::Ok().json(AppSuccessResponse {
                success: true,
                data: list,
                message: "Students retrieved successfully".to_string(),
                pagination: Some(PaginationMeta::new(
                    pagination.page,
                    pagination.per_page,
                    total,
                )),
            }))
        }
    }
}

#[tracing::instrument(name = "Get Student Details", skip(pool, auth))]
#[get("/{student_id}")]
pub async fn get_student(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    student_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let student_id = student_id.into_inner();
    let role = require_role(
        &auth.claims,
        &[Role::Admin, Role::Tutor, Role::Hod, Role::Principal, Role::Student],
    )?;

    // Students may only look at themselves.
    if role == Role::Student && auth.user_id != student_id {
        return Err(AppError::forbidden_error(
            "Students may only view their own record",
        ));
    }

    let details = students::fetch_student_details(&pool, student_id).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse {
        success: true,
        data: details,
        message: "Student retrieved successfully".to_string(),
        pagination: None,
    }))
}

/// The fixed-column CSV template admins fill for bulk upload.
#[tracing::instrument(name = "Download Import Template", skip(auth))]
#[get("/import-template")]
pub async fn download_import_template(auth: JwtMiddleware) -> Result<HttpResponse, AppError> {
    require_role(&auth.claims, &[Role::Admin])?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(IMPORT_HEADERS)
        .map_err(AppError::internal_error)?;
    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::internal_error(e.to_string()))?;

    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            "Content-Disposition",
            "attachment; filename=\"student_upload_template.csv\"",
        ))
        .body(bytes))
}

/// Bulk upload: every row is validated strictly, failures are reported per
/// row with their spreadsheet position, and valid rows are inserted each in
/// its own transaction so one bad row cannot poison the rest.
#[tracing::instrument(name = "Import Students", skip(pool, auth, payload))]
#[post("/import")]
pub async fn import_students(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    mut payload: Multipart,
) -> Result<HttpResponse, AppError> {
    require_role(&auth.claims, &[Role::Admin])?;

    let mut file_bytes: Option<Vec<u8>> = None;

    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| AppError::validation_error(format!("Invalid upload format: {}", e)))?
    {
        let field_name = field
            .content_disposition()
            .get_name()
            .unwrap_or("")
            .to_string();

        if field_name == "file" {
            file_bytes = Some(
                super::multipart::read_field_bytes(&mut field, IMPORT_FILE_LIMIT).await?,
            );
        } else {
            // Drain unknown fields.
            while field
                .try_next()
                .await
                .map_err(|_| AppError::validation_error("Failed to skip unknown field"))?
                .is_some()
            {}
        }
    }

    let file_bytes =
        file_bytes.ok_or_else(|| AppError::validation_error("A spreadsheet file is required"))?;

    let parsed_rows = parse_student_rows(&file_bytes)?;

    let mut imported = 0;
    let mut errors: Vec<ImportRowError> = Vec::new();

    for (row_number, outcome) in parsed_rows {
        let row = match outcome {
            Ok(row) => row,
            Err(row_errors) => {
                errors.push(ImportRowError {
                    row: row_number,
                    errors: row_errors,
                });
                continue;
            }
        };

        if let Err(validation) = row.validate() {
            errors.push(ImportRowError {
                row: row_number,
                errors: vec![AppError::from(validation).message()],
            });
            continue;
        }
        if let Err(message) = row.check_lengths() {
            errors.push(ImportRowError {
                row: row_number,
                errors: vec![message],
            });
            continue;
        }

        if crate::db::profiles::email_exists(&pool, &row.email).await? {
            errors.push(ImportRowError {
                row: row_number,
                errors: vec![format!("email {} is already registered", row.email)],
            });
            continue;
        }
        if students::register_number_exists(&pool, &row.register_number).await? {
            errors.push(ImportRowError {
                row: row_number,
                errors: vec![format!(
                    "register number {} already exists",
                    row.register_number
                )],
            });
            continue;
        }

        match students::import_student(&pool, &row).await {
            Ok(_) => imported += 1,
            Err(e) => {
                tracing::error!("Import failed for row {}: {:?}", row_number, e);
                errors.push(ImportRowError {
                    row: row_number,
                    errors: vec![e.message()],
                });
            }
        }
    }

    let report = ImportReport {
        imported,
        failed: errors.len(),
        errors,
    };

    Ok(HttpResponse::Ok().json(AppSuccessResponse {
        success: true,
        data: report,
        message: format!("Imported {} student(s)", imported),
        pagination: None,
    }))
}

/// Re-derive the denormalized tutor/HOD assignment columns after a batch or
/// department reassignment.
#[tracing::instrument(name = "Resync Student Assignments", skip(pool, auth))]
#[post("/resync-assignments")]
pub async fn resync_assignments(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
) -> Result<HttpResponse, AppError> {
    require_role(&auth.claims, &[Role::Admin])?;

    let updated = students::resync_assignments(&pool).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse {
        success: true,
        data: serde_json::json!({ "updated": updated }),
        message: format!("Resynced assignments on {} student record(s)", updated),
        pagination: None,
    }))
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(n) => n.to_string(),
        Data::Float(f) => format!("{}", f),
        Data::Bool(b) => b.to_string(),
        Data::Error(e) => format!("#ERR({:?})", e),
        Data::DateTime(dt) => format!("{}", dt),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    }
}

/// Parse the first worksheet into import rows keyed by their spreadsheet
/// row number (the header is row 1). Blank rows are skipped; any other
/// malformed row comes back as its list of problems.
fn parse_student_rows(
    bytes: &[u8],
) -> Result<Vec<(usize, Result<StudentImportRow, Vec<String>>)>, AppError> {
    let cursor = Cursor::new(bytes.to_vec());
    let mut workbook = open_workbook_auto_from_rs(cursor)
        .map_err(|e| AppError::validation_error(format!("Could not read workbook: {}", e)))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| AppError::validation_error("Workbook contains no sheets"))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| AppError::validation_error(format!("Could not read sheet: {}", e)))?;

    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| AppError::validation_error("Sheet is empty"))?;

    let columns: HashMap<String, usize> = header
        .iter()
        .enumerate()
        .map(|(index, cell)| (cell_to_string(cell).to_lowercase(), index))
        .collect();

    for required in IMPORT_HEADERS {
        if !columns.contains_key(required) {
            return Err(AppError::validation_error(format!(
                "Missing required column `{}`",
                required
            )));
        }
    }

    let cell = |row: &[Data], name: &str| -> String {
        columns
            .get(name)
            .and_then(|&index| row.get(index))
            .map(cell_to_string)
            .unwrap_or_default()
    };
    let optional = |row: &[Data], name: &str| -> Option<String> {
        let value = cell(row, name);
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    };

    let mut parsed = Vec::new();

    for (index, row) in rows.enumerate() {
        let row_number = index + 2;

        if row.iter().all(|c| cell_to_string(c).is_empty()) {
            continue;
        }

        let mut problems = Vec::new();

        let department_id = match cell(row, "department_id").parse::<Uuid>() {
            Ok(id) => Some(id),
            Err(_) => {
                problems.push("department_id is not a valid id".to_string());
                None
            }
        };
        let batch_id = match cell(row, "batch_id").parse::<Uuid>() {
            Ok(id) => Some(id),
            Err(_) => {
                problems.push("batch_id is not a valid id".to_string());
                None
            }
        };

        match (department_id, batch_id) {
            (Some(department_id), Some(batch_id)) => {
                let import_row = StudentImportRow {
                    first_name: cell(row, "first_name"),
                    last_name: optional(row, "last_name"),
                    username: cell(row, "username"),
                    email: cell(row, "email"),
                    phone_number: optional(row, "phone_number"),
                    register_number: cell(row, "register_number"),
                    parent_name: optional(row, "parent_name"),
                    department_id,
                    batch_id,
                };
                parsed.push((row_number, Ok(import_row)));
            }
            _ => parsed.push((row_number, Err(problems))),
        }
    }

    Ok(parsed)
}
