use actix_web::{get, post, put, web, HttpResponse, Result};
use chrono::Local;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::core::jwt_auth::{require_role, JwtMiddleware};
use crate::core::semester::calculate_current_semester_for_batch;
use crate::core::{AppError, AppSuccessResponse};
use crate::db::batches;
use crate::models::batches::{
    CreateBatchRequest, SetSemesterRequest, UpdateBatchRequest, BATCH_STATUS_ACTIVE,
};
use crate::models::users::Role;

#[tracing::instrument(name = "Create Batch", skip(pool, auth, request))]
#[post("")]
pub async fn create_batch(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    request: web::Json<CreateBatchRequest>,
) -> Result<HttpResponse, AppError> {
    require_role(&auth.claims, &[Role::Admin])?;
    request.validate()?;

    let today = Local::now().date_naive();
    let created = batches::create_batch(&pool, &request, today).await?;

    Ok(HttpResponse::Created().json(AppSuccessResponse {
        success: true,
        message: format!(
            "Batch \"{}\" with {} section(s) created successfully",
            request.name,
            created.len()
        ),
        data: created,
        pagination: None,
    }))
}

/// Listing recomputes the semester of active batches from today's date so
/// the bookkeeping never looks stale, whatever is stored.
#[tracing::instrument(name = "List Batches", skip(pool, auth))]
#[get("")]
pub async fn list_batches(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
) -> Result<HttpResponse, AppError> {
    require_role(
        &auth.claims,
        &[Role::Admin, Role::Tutor, Role::Hod, Role::Principal],
    )?;

    let today = Local::now().date_naive();
    let mut batches = batches::fetch_batches(&pool).await?;
    for batch in &mut batches {
        if batch.status == BATCH_STATUS_ACTIVE {
            let full_name = match &batch.section {
                Some(section) => format!("{} {}", batch.name, section),
                None => batch.name.clone(),
            };
            batch.current_semester = calculate_current_semester_for_batch(&full_name, today);
        }
    }

    Ok(HttpResponse::Ok().json(AppSuccessResponse {
        success: true,
        data: batches,
        message: "Batches retrieved successfully".to_string(),
        pagination: None,
    }))
}

/// Tutor reassignment and section-count changes. A section-count change is
/// propagated to every sibling section of the batch name.
#[tracing::instrument(name = "Update Batch", skip(pool, auth, request))]
#[put("/{batch_id}")]
pub async fn update_batch(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    batch_id: web::Path<Uuid>,
    request: web::Json<UpdateBatchRequest>,
) -> Result<HttpResponse, AppError> {
    require_role(&auth.claims, &[Role::Admin])?;
    request.validate()?;

    let today = Local::now().date_naive();
    let siblings = batches::update_batch(&pool, batch_id.into_inner(), &request, today).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse {
        success: true,
        data: siblings,
        message: "Batch updated successfully".to_string(),
        pagination: None,
    }))
}

#[tracing::instrument(name = "Toggle Batch Status", skip(pool, auth))]
#[post("/{batch_id}/toggle-status")]
pub async fn toggle_batch_status(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    batch_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    require_role(&auth.claims, &[Role::Admin])?;

    let batch = batches::toggle_batch_status(&pool, batch_id.into_inner()).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse {
        success: true,
        message: format!("Batch is now {}", batch.status),
        data: batch,
        pagination: None,
    }))
}

/// Manual semester override for the odd cohort that runs off-calendar.
#[tracing::instrument(name = "Set Batch Semester", skip(pool, auth, request))]
#[put("/{batch_id}/semester")]
pub async fn set_batch_semester(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    batch_id: web::Path<Uuid>,
    request: web::Json<SetSemesterRequest>,
) -> Result<HttpResponse, AppError> {
    require_role(&auth.claims, &[Role::Admin])?;
    request.validate()?;

    let today = Local::now().date_naive();
    let batch = batches::set_batch_semester(
        &pool,
        batch_id.into_inner(),
        request.current_semester,
        today,
    )
    .await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse {
        success: true,
        data: batch,
        message: "Semester updated successfully".to_string(),
        pagination: None,
    }))
}

/// On-demand run of the same recomputation the daily background job does.
#[tracing::instrument(name = "Refresh Batch Semesters", skip(pool, auth))]
#[post("/refresh-semesters")]
pub async fn refresh_semesters(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
) -> Result<HttpResponse, AppError> {
    require_role(&auth.claims, &[Role::Admin])?;

    let today = Local::now().date_naive();
    let updated = batches::refresh_active_batches(&pool, today).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse {
        success: true,
        data: serde_json::json!({ "updated": updated }),
        message: format!("Refreshed {} batch(es)", updated),
        pagination: None,
    }))
}
