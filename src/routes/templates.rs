use actix_multipart::Multipart;
use actix_web::{delete, get, post, put, web, HttpResponse, Result};
use chrono::Utc;
use futures_util::TryStreamExt;
use sqlx::PgPool;
use std::str::FromStr;
use uuid::Uuid;

use crate::core::jwt_auth::{require_role, JwtMiddleware};
use crate::core::{AppError, AppSuccessResponse};
use crate::db::templates;
use crate::models::templates::TemplateType;
use crate::models::users::{MessageResponse, Role};
use crate::storage::{content_type_for, TemplateStore};

const TEMPLATE_FILE_LIMIT: usize = 20 * 1024 * 1024; // 20MB

struct TemplateForm {
    name: Option<String>,
    template_type: Option<String>,
    body: Option<String>,
    file: Option<(String, Vec<u8>)>,
}

async fn read_template_form(payload: &mut Multipart) -> Result<TemplateForm, AppError> {
    let mut form = TemplateForm {
        name: None,
        template_type: None,
        body: None,
        file: None,
    };

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

        match field_name.as_str() {
            "name" => form.name = Some(super::multipart::read_field_string(&mut field).await?),
            "template_type" => {
                form.template_type =
                    Some(super::multipart::read_field_string(&mut field).await?)
            }
            "body" => {
                let body = super::multipart::read_field_string(&mut field).await?;
                if !body.is_empty() {
                    form.body = Some(body);
                }
            }
            "file" => {
                let filename = field
                    .content_disposition()
                    .get_filename()
                    .ok_or_else(|| AppError::validation_error("Filename is required"))?
                    .to_string();
                let bytes =
                    super::multipart::read_field_bytes(&mut field, TEMPLATE_FILE_LIMIT).await?;
                form.file = Some((filename, bytes));
            }
            _ => {
                while field
                    .try_next()
                    .await
                    .map_err(|_| AppError::validation_error("Failed to skip unknown field"))?
                    .is_some()
                {}
            }
        }
    }

    Ok(form)
}

fn parse_template_type(raw: Option<&str>) -> Result<TemplateType, AppError> {
    let raw = raw.ok_or_else(|| AppError::validation_error("template_type is required"))?;
    TemplateType::from_str(raw)
        .map_err(|_| AppError::validation_error("template_type must be html, pdf or word"))
}

#[tracing::instrument(name = "Create Template", skip(pool, store, auth, payload))]
#[post("")]
pub async fn create_template(
    pool: web::Data<PgPool>,
    store: web::Data<TemplateStore>,
    auth: JwtMiddleware,
    mut payload: Multipart,
) -> Result<HttpResponse, AppError> {
    require_role(&auth.claims, &[Role::Admin])?;

    let form = read_template_form(&mut payload).await?;
    let name = form
        .name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| AppError::validation_error("Template name is required"))?;
    let template_type = parse_template_type(form.template_type.as_deref())?;

    if template_type != TemplateType::Html && form.file.is_none() {
        return Err(AppError::validation_error(
            "File-based templates require an uploaded file",
        ));
    }

    let file_path = match &form.file {
        Some((filename, bytes)) => {
            let object_path =
                TemplateStore::object_path(filename, Utc::now().timestamp_millis());
            store.save(&object_path, bytes)?;
            Some(object_path)
        }
        None => None,
    };

    let created = templates::create_template(
        &pool,
        &name,
        &template_type.to_string(),
        form.body.as_deref(),
        file_path.as_deref(),
    )
    .await;

    let template = match created {
        Ok(template) => template,
        Err(e) => {
            // The row never landed; don't leave the file stranded.
            if let Some(path) = &file_path {
                if let Err(cleanup) = store.delete(path) {
                    tracing::warn!("Failed to clean up stored file {}: {:?}", path, cleanup);
                }
            }
            return Err(e);
        }
    };

    Ok(HttpResponse::Created().json(AppSuccessResponse {
        success: true,
        data: template,
        message: "Template created successfully".to_string(),
        pagination: None,
    }))
}

#[tracing::instrument(name = "List Templates", skip(pool, auth))]
#[get("")]
pub async fn list_templates(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
) -> Result<HttpResponse, AppError> {
    require_role(&auth.claims, &[Role::Admin, Role::Hod, Role::Principal])?;

    let templates = templates::fetch_templates(&pool).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse {
        success: true,
        data: templates,
        message: "Templates retrieved successfully".to_string(),
        pagination: None,
    }))
}

/// Replace a template. A new upload deletes the old stored file before the
/// replacement is written; switching to inline HTML clears the stored file.
#[tracing::instrument(name = "Update Template", skip(pool, store, auth, payload))]
#[put("/{template_id}")]
pub async fn update_template(
    pool: web::Data<PgPool>,
    store: web::Data<TemplateStore>,
    auth: JwtMiddleware,
    template_id: web::Path<Uuid>,
    mut payload: Multipart,
) -> Result<HttpResponse, AppError> {
    require_role(&auth.claims, &[Role::Admin])?;

    let template_id = template_id.into_inner();
    let existing = templates::fetch_template(&pool, template_id).await?;

    let form = read_template_form(&mut payload).await?;
    let name = form.name.filter(|n| !n.trim().is_empty()).unwrap_or(existing.name);
    let template_type = match form.template_type.as_deref() {
        Some(raw) => parse_template_type(Some(raw))?,
        None => TemplateType::from_str(&existing.template_type)
            .map_err(AppError::internal_error)?,
    };
    let body = form.body.or(existing.body);

    let file_path = match &form.file {
        Some((filename, bytes)) => {
            if let Some(old_path) = &existing.file_path {
                if let Err(e) = store.delete(old_path) {
                    tracing::warn!("Failed to delete old template file {}: {:?}", old_path, e);
                }
            }
            let object_path =
                TemplateStore::object_path(filename, Utc::now().timestamp_millis());
            store.save(&object_path, bytes)?;
            Some(object_path)
        }
        None if template_type == TemplateType::Html => {
            // No replacement and the template is now inline HTML: drop any
            // stored file.
            if let Some(old_path) = &existing.file_path {
                if let Err(e) = store.delete(old_path) {
                    tracing::warn!("Failed to delete old template file {}: {:?}", old_path, e);
                }
            }
            None
        }
        None => existing.file_path,
    };

    let template = templates::update_template(
        &pool,
        template_id,
        &name,
        &template_type.to_string(),
        body.as_deref(),
        file_path.as_deref(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse {
        success: true,
        data: template,
        message: "Template updated successfully".to_string(),
        pagination: None,
    }))
}

/// Deletion removes the stored file first, then the row.
#[tracing::instrument(name = "Delete Template", skip(pool, store, auth))]
#[delete("/{template_id}")]
pub async fn delete_template(
    pool: web::Data<PgPool>,
    store: web::Data<TemplateStore>,
    auth: JwtMiddleware,
    template_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    require_role(&auth.claims, &[Role::Admin])?;

    let template_id = template_id.into_inner();
    let template = templates::fetch_template(&pool, template_id).await?;

    if let Some(path) = &template.file_path {
        if let Err(e) = store.delete(path) {
            tracing::warn!("Failed to delete stored template file {}: {:?}", path, e);
        }
    }

    templates::delete_template(&pool, template_id).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse {
        success: true,
        data: MessageResponse {
            message: "Template deleted successfully".to_string(),
        },
        message: "Template deleted successfully".to_string(),
        pagination: None,
    }))
}

/// Stream the stored file behind a pdf/word template.
#[tracing::instrument(name = "Download Template File", skip(pool, store, auth))]
#[get("/{template_id}/file")]
pub async fn download_template_file(
    pool: web::Data<PgPool>,
    store: web::Data<TemplateStore>,
    auth: JwtMiddleware,
    template_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    require_role(&auth.claims, &[Role::Admin, Role::Hod, Role::Principal])?;

    let template = templates::fetch_template(&pool, template_id.into_inner()).await?;
    let file_path = template
        .file_path
        .as_deref()
        .ok_or_else(|| AppError::not_found("This template has no stored file"))?;

    let bytes = store.read(file_path)?;

    Ok(HttpResponse::Ok()
        .content_type(content_type_for(file_path))
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", template.name),
        ))
        .body(bytes))
}
