use actix_web::{get, post, web, HttpResponse, Result};
use chrono::Local;
use sqlx::PgPool;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use crate::certificates::{
    render_certificate_html, rendered_certificate_file_name, stored_template_file_name,
    CertificateFields,
};
use crate::core::jwt_auth::{require_role, JwtMiddleware};
use crate::core::{AppError, AppSuccessResponse};
use crate::db::{requests, students, templates};
use crate::models::pagination::{PaginationMeta, PaginationQuery};
use crate::models::requests::{
    ApproveRequest, BonafideRequest, CreateRequestRequest, ForwardRequest, RequestStatus,
    ReturnRequest,
};
use crate::models::templates::TemplateType;
use crate::models::users::Role;
use crate::storage::{content_type_for, TemplateStore};
use crate::workflow::{plan_transition, ReviewAction, TransitionError};

impl From<TransitionError> for AppError {
    fn from(error: TransitionError) -> Self {
        match error {
            TransitionError::IllegalTransition { .. } => AppError::conflict(error.to_string()),
            TransitionError::MissingReturnReason | TransitionError::MissingTemplate => {
                AppError::validation_error(error.to_string())
            }
        }
    }
}

fn parse_status(request: &BonafideRequest) -> Result<RequestStatus, AppError> {
    RequestStatus::from_str(&request.status)
        .map_err(|_| AppError::internal_error("Request row holds an unrecognized status"))
}

/// Reviewers may only act on requests from students assigned to them; the
/// principal and admin see the whole college.
async fn ensure_reviewer_scope(
    pool: &PgPool,
    role: Role,
    reviewer_id: Uuid,
    student_id: Uuid,
) -> Result<(), AppError> {
    let details = students::fetch_student_details(pool, student_id).await?;

    let in_scope = match role {
        Role::Tutor => details.tutor_id == Some(reviewer_id),
        Role::Hod => details.hod_id == Some(reviewer_id),
        Role::Principal | Role::Admin => true,
        Role::Student => details.id == reviewer_id,
    };

    if in_scope {
        Ok(())
    } else {
        Err(AppError::forbidden_error(
            "This request is outside your assigned students",
        ))
    }
}

#[tracing::instrument(name = "Submit Bonafide Request", skip(pool, auth, request))]
#[post("")]
pub async fn submit_request(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    request: web::Json<CreateRequestRequest>,
) -> Result<HttpResponse, AppError> {
    require_role(&auth.claims, &[Role::Student])?;
    request.validate()?;

    // The student row must exist; a bare profile cannot file requests.
    students::fetch_student_details(&pool, auth.user_id)
        .await
        .map_err(|_| AppError::forbidden_error("No student record behind this account"))?;

    let today = Local::now().date_naive();
    let created = requests::insert_request(&pool, auth.user_id, &request, today).await?;

    Ok(HttpResponse::Created().json(AppSuccessResponse {
        success: true,
        data: created,
        message: "Request submitted for tutor approval".to_string(),
        pagination: None,
    }))
}

#[tracing::instrument(name = "My Requests", skip(pool, auth))]
#[get("/mine")]
pub async fn my_requests(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
) -> Result<HttpResponse, AppError> {
    require_role(&auth.claims, &[Role::Student])?;

    let list = requests::fetch_requests_for_student(&pool, auth.user_id).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse {
        success: true,
        data: list,
        message: "Requests retrieved successfully".to_string(),
        pagination: None,
    }))
}

/// The caller's review queue, scoped by their stage and their students.
#[tracing::instrument(name = "Pending Requests", skip(pool, auth))]
#[get("/pending")]
pub async fn pending_requests(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
) -> Result<HttpResponse, AppError> {
    let role = require_role(&auth.claims, &[Role::Tutor, Role::Hod, Role::Principal])?;

    let list = match role {
        Role::Tutor => requests::fetch_pending_for_tutor(&pool, auth.user_id).await?,
        Role::Hod => requests::fetch_pending_for_hod(&pool, auth.user_id).await?,
        _ => requests::fetch_pending_for_principal(&pool).await?,
    };

    Ok(HttpResponse::Ok().json(AppSuccessResponse {
        success: true,
        data: list,
        message: "Pending requests retrieved successfully".to_string(),
        pagination: None,
    }))
}

/// Requests that have already moved past the caller's stage.
#[tracing::instrument(name = "Request History", skip(pool, auth))]
#[get("/history")]
pub async fn request_history(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
) -> Result<HttpResponse, AppError> {
    let role = require_role(&auth.claims, &[Role::Tutor, Role::Hod])?;

    let (column, stage) = match role {
        Role::Tutor => (
            requests::ReviewerColumn::Tutor,
            RequestStatus::PendingTutorApproval,
        ),
        _ => (
            requests::ReviewerColumn::Hod,
            RequestStatus::PendingHodApproval,
        ),
    };

    let list = requests::fetch_history_for_reviewer(&pool, column, auth.user_id, stage).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse {
        success: true,
        data: list,
        message: "Request history retrieved successfully".to_string(),
        pagination: None,
    }))
}

#[tracing::instrument(name = "List All Requests", skip(pool, auth))]
#[get("")]
pub async fn list_all_requests(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    query: web::Query<PaginationQuery>,
) -> Result<HttpResponse, AppError> {
    require_role(&auth.claims, &[Role::Admin, Role::Principal])?;

    let mut pagination = query.into_inner();
    pagination.validate();

    let (list, total) = requests::fetch_all_requests(&pool, &pagination).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse {
        success: true,
        data: list,
        message: "Requests retrieved successfully".to_string(),
        pagination: Some(PaginationMeta::new(
            pagination.page,
            pagination.per_page,
            total,
        )),
    }))
}

#[tracing::instrument(name = "Get Request", skip(pool, auth))]
#[get("/{request_id}")]
pub async fn get_request(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    request_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let role = require_role(
        &auth.claims,
        &[Role::Student, Role::Tutor, Role::Hod, Role::Principal, Role::Admin],
    )?;

    let request = requests::fetch_request(&pool, request_id.into_inner()).await?;
    ensure_reviewer_scope(&pool, role, auth.user_id, request.student_id).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse {
        success: true,
        data: request,
        message: "Request retrieved successfully".to_string(),
        pagination: None,
    }))
}

/// Tutor to HOD, or HOD to principal (the latter requires the chosen
/// template). The row update is conditional on the current status, so two
/// reviewers racing on one request cannot both win.
#[tracing::instrument(name = "Forward Request", skip(pool, auth, body))]
#[post("/{request_id}/forward")]
pub async fn forward_request(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    request_id: web::Path<Uuid>,
    body: web::Json<ForwardRequest>,
) -> Result<HttpResponse, AppError> {
    let role = require_role(&auth.claims, &[Role::Tutor, Role::Hod])?;

    let request_id = request_id.into_inner();
    let request = requests::fetch_request(&pool, request_id).await?;
    ensure_reviewer_scope(&pool, role, auth.user_id, request.student_id).await?;

    if let Some(template_id) = body.template_id {
        // Surface a bad template choice before the transition runs.
        templates::fetch_template(&pool, template_id).await?;
    }

    let current = parse_status(&request)?;
    let plan = plan_transition(current, role, ReviewAction::Forward, None, body.template_id)?;
    let updated = requests::transition_request(&pool, request_id, current, &plan).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse {
        success: true,
        message: format!("Request forwarded; now {}", updated.status),
        data: updated,
        pagination: None,
    }))
}

#[tracing::instrument(name = "Return Request", skip(pool, auth, body))]
#[post("/{request_id}/return")]
pub async fn return_request(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    request_id: web::Path<Uuid>,
    body: web::Json<ReturnRequest>,
) -> Result<HttpResponse, AppError> {
    let role = require_role(&auth.claims, &[Role::Tutor, Role::Hod, Role::Principal])?;

    let request_id = request_id.into_inner();
    let request = requests::fetch_request(&pool, request_id).await?;
    ensure_reviewer_scope(&pool, role, auth.user_id, request.student_id).await?;

    let current = parse_status(&request)?;
    let plan = plan_transition(
        current,
        role,
        ReviewAction::Return,
        Some(body.reason.as_str()),
        None,
    )?;
    let updated = requests::transition_request(&pool, request_id, current, &plan).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse {
        success: true,
        message: format!("Request returned; now {}", updated.status),
        data: updated,
        pagination: None,
    }))
}

/// Principal approval: render the certificate, then advance the request,
/// then hand the document back. A rendering failure aborts before any
/// mutation; a failed transition never produces a download.
#[tracing::instrument(name = "Approve Request", skip(pool, store, auth, body))]
#[post("/{request_id}/approve")]
pub async fn approve_request(
    pool: web::Data<PgPool>,
    store: web::Data<TemplateStore>,
    auth: JwtMiddleware,
    request_id: web::Path<Uuid>,
    body: Option<web::Json<ApproveRequest>>,
) -> Result<HttpResponse, AppError> {
    require_role(&auth.claims, &[Role::Principal])?;

    let request_id = request_id.into_inner();
    let request = requests::fetch_request(&pool, request_id).await?;
    let current = parse_status(&request)?;

    let plan = plan_transition(current, Role::Principal, ReviewAction::Approve, None, None)?;

    let student = students::fetch_student_details(&pool, request.student_id)
        .await
        .map_err(|_| {
            AppError::internal_error("Could not resolve student details for certificate")
        })?;

    let template_id = request
        .template_id
        .ok_or_else(|| AppError::validation_error("No template was selected for this request"))?;
    let template = templates::fetch_template(&pool, template_id).await?;
    let template_type = TemplateType::from_str(&template.template_type)
        .map_err(AppError::internal_error)?;

    let today = Local::now().date_naive();

    let (bytes, file_name, content_type) = match template_type {
        TemplateType::Html => {
            let fields = CertificateFields::from_parts(&request, &student, today);
            let with_signature = body
                .as_ref()
                .and_then(|b| b.with_signature)
                .unwrap_or(true);
            let html = render_certificate_html(template.body.as_deref(), &fields, with_signature);
            (
                html.into_bytes(),
                rendered_certificate_file_name(&student.register_number),
                "text/html; charset=utf-8".to_string(),
            )
        }
        TemplateType::Pdf | TemplateType::Word => {
            let file_path = template.file_path.as_deref().ok_or_else(|| {
                AppError::not_found("No stored file behind this template")
            })?;
            let bytes = store.read(file_path)?;
            (
                bytes,
                stored_template_file_name(
                    &template.name,
                    &student.register_number,
                    template_type.extension(),
                ),
                content_type_for(file_path).to_string(),
            )
        }
    };

    let updated = requests::transition_request(&pool, request_id, current, &plan).await?;
    tracing::info!(
        "Request {} approved; certificate {} issued",
        updated.id,
        file_name
    );

    Ok(HttpResponse::Ok()
        .content_type(content_type.as_str())
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", file_name),
        ))
        .body(bytes))
}
