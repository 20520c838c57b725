use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::AppError;
use crate::models::templates::CertificateTemplate;

pub async fn create_template(
    pool: &PgPool,
    name: &str,
    template_type: &str,
    body: Option<&str>,
    file_path: Option<&str>,
) -> Result<CertificateTemplate, AppError> {
    let now = Utc::now().naive_utc();

    let template = sqlx::query_as::<_, CertificateTemplate>(
        r#"
        INSERT INTO templates (id, name, template_type, body, file_path, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(template_type)
    .bind(body)
    .bind(file_path)
    .bind(now)
    .fetch_one(pool)
    .await
    .map_err(AppError::db_error)?;

    Ok(template)
}

pub async fn fetch_templates(pool: &PgPool) -> Result<Vec<CertificateTemplate>, AppError> {
    let templates =
        sqlx::query_as::<_, CertificateTemplate>("SELECT * FROM templates ORDER BY name")
            .fetch_all(pool)
            .await
            .map_err(AppError::db_error)?;

    Ok(templates)
}

pub async fn fetch_template(pool: &PgPool, id: Uuid) -> Result<CertificateTemplate, AppError> {
    let template = sqlx::query_as::<_, CertificateTemplate>("SELECT * FROM templates WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await?;

    Ok(template)
}

/// Row update after the route layer has settled the file bookkeeping.
/// `file_path` is written as given: `Some(path)` for a fresh upload, `None`
/// when the template switched to inline HTML.
pub async fn update_template(
    pool: &PgPool,
    id: Uuid,
    name: &str,
    template_type: &str,
    body: Option<&str>,
    file_path: Option<&str>,
) -> Result<CertificateTemplate, AppError> {
    let template = sqlx::query_as::<_, CertificateTemplate>(
        r#"
        UPDATE templates
        SET name = $2, template_type = $3, body = $4, file_path = $5
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(template_type)
    .bind(body)
    .bind(file_path)
    .fetch_one(pool)
    .await?;

    Ok(template)
}

pub async fn delete_template(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    let referencing: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM requests WHERE template_id = $1 AND status != 'Approved'",
    )
    .bind(id)
    .fetch_one(pool)
    .await
    .map_err(AppError::db_error)?;

    if referencing > 0 {
        return Err(AppError::conflict(
            "Template is selected by requests still in review",
        ));
    }

    let result = sqlx::query("DELETE FROM templates WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(AppError::db_error)?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("No template with that id"));
    }

    Ok(())
}
