use actix_web::{delete, get, post, put, web, HttpResponse, Result};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::core::jwt_auth::{require_role, JwtMiddleware};
use crate::core::{AppError, AppSuccessResponse};
use crate::db::departments;
use crate::models::departments::{CreateDepartmentRequest, UpdateDepartmentRequest};
use crate::models::users::{MessageResponse, Role};

#[tracing::instrument(name = "Create Department", skip(pool, auth, request))]
#[post("")]
pub async fn create_department(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    request: web::Json<CreateDepartmentRequest>,
) -> Result<HttpResponse, AppError> {
    require_role(&auth.claims, &[Role::Admin])?;
    request.validate()?;

    if departments::department_exists(&pool, &request.name).await? {
        return Err(AppError::conflict(
            "A department with this name already exists",
        ));
    }

    let department = departments::create_department(&pool, &request).await?;

    Ok(HttpResponse::Created().json(AppSuccessResponse {
        success: true,
        data: department,
        message: "Department created successfully".to_string(),
        pagination: None,
    }))
}

#[tracing::instrument(name = "List Departments", skip(pool, auth))]
#[get("")]
pub async fn list_departments(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
) -> Result<HttpResponse, AppError> {
    require_role(
        &auth.claims,
        &[Role::Admin, Role::Hod, Role::Principal, Role::Tutor],
    )?;

    let departments = departments::fetch_departments(&pool).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse {
        success: true,
        data: departments,
        message: "Departments retrieved successfully".to_string(),
        pagination: None,
    }))
}

#[tracing::instrument(name = "Update Department", skip(pool, auth, request))]
#[put("/{department_id}")]
pub async fn update_department(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    department_id: web::Path<Uuid>,
    request: web::Json<UpdateDepartmentRequest>,
) -> Result<HttpResponse, AppError> {
    require_role(&auth.claims, &[Role::Admin])?;
    request.validate()?;

    let department =
        departments::update_department(&pool, department_id.into_inner(), &request).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse {
        success: true,
        data: department,
        message: "Department updated successfully".to_string(),
        pagination: None,
    }))
}

#[tracing::instrument(name = "Delete Department", skip(pool, auth))]
#[delete("/{department_id}")]
pub async fn delete_department(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    department_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    require_role(&auth.claims, &[Role::Admin])?;

    departments::delete_department(&pool, department_id.into_inner()).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse {
        success: true,
        data: MessageResponse {
            message: "Department deleted successfully".to_string(),
        },
        message: "Department deleted successfully".to_string(),
        pagination: None,
    }))
}
