use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::AppError;
use crate::models::departments::{
    CreateDepartmentRequest, Department, DepartmentDetails, UpdateDepartmentRequest,
};

pub async fn create_department(
    pool: &PgPool,
    request: &CreateDepartmentRequest,
) -> Result<Department, AppError> {
    let now = Utc::now().naive_utc();

    let department = sqlx::query_as::<_, Department>(
        "INSERT INTO departments (id, name, created_at) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&request.name)
    .bind(now)
    .fetch_one(pool)
    .await
    .map_err(AppError::db_error)?;

    Ok(department)
}

pub async fn department_exists(pool: &PgPool, name: &str) -> Result<bool, AppError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM departments WHERE name = $1")
        .bind(name)
        .fetch_one(pool)
        .await
        .map_err(AppError::db_error)?;

    Ok(count > 0)
}

pub async fn fetch_departments(pool: &PgPool) -> Result<Vec<DepartmentDetails>, AppError> {
    let departments = sqlx::query_as::<_, DepartmentDetails>(
        r#"
        SELECT d.id,
               d.name,
               hp.id AS hod_id,
               NULLIF(TRIM(CONCAT(hp.first_name, ' ', COALESCE(hp.last_name, ''))), '') AS hod_name,
               (SELECT COUNT(*) FROM batches b WHERE b.department_id = d.id) AS batch_count,
               d.created_at
        FROM departments d
        LEFT JOIN profiles hp ON hp.role = 'hod' AND hp.department_id = d.id
        ORDER BY d.name
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(AppError::db_error)?;

    Ok(departments)
}

pub async fn fetch_department(pool: &PgPool, id: Uuid) -> Result<Department, AppError> {
    let department = sqlx::query_as::<_, Department>("SELECT * FROM departments WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await?;

    Ok(department)
}

pub async fn update_department(
    pool: &PgPool,
    id: Uuid,
    request: &UpdateDepartmentRequest,
) -> Result<Department, AppError> {
    let department = sqlx::query_as::<_, Department>(
        "UPDATE departments SET name = $2 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&request.name)
    .fetch_one(pool)
    .await?;

    Ok(department)
}

/// Deletion is refused while batches still reference the department.
pub async fn delete_department(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    let batch_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM batches WHERE department_id = $1")
            .bind(id)
            .fetch_one(pool)
            .await
            .map_err(AppError::db_error)?;

    if batch_count > 0 {
        return Err(AppError::conflict(
            "Department still owns batches; reassign or remove them first",
        ));
    }

    let result = sqlx::query("DELETE FROM departments WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(AppError::db_error)?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("No department with that id"));
    }

    Ok(())
}
