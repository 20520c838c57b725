use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::AppError;
use crate::models::pagination::PaginationQuery;
use crate::models::requests::{BonafideRequest, CreateRequestRequest, RequestStatus};
use crate::workflow::TransitionPlan;

pub async fn insert_request(
    pool: &PgPool,
    student_id: Uuid,
    request: &CreateRequestRequest,
    today: NaiveDate,
) -> Result<BonafideRequest, AppError> {
    let now = Utc::now().naive_utc();

    let created = sqlx::query_as::<_, BonafideRequest>(
        r#"
        INSERT INTO requests
            (id, student_id, request_type, sub_type, reason, date, status,
             return_reason, template_id, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, NULL, NULL, $8, $8)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(student_id)
    .bind(&request.request_type)
    .bind(&request.sub_type)
    .bind(&request.reason)
    .bind(today)
    .bind(RequestStatus::PendingTutorApproval.as_str())
    .bind(now)
    .fetch_one(pool)
    .await
    .map_err(AppError::db_error)?;

    Ok(created)
}

pub async fn fetch_request(pool: &PgPool, id: Uuid) -> Result<BonafideRequest, AppError> {
    let request = sqlx::query_as::<_, BonafideRequest>("SELECT * FROM requests WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await?;

    Ok(request)
}

pub async fn fetch_requests_for_student(
    pool: &PgPool,
    student_id: Uuid,
) -> Result<Vec<BonafideRequest>, AppError> {
    let requests = sqlx::query_as::<_, BonafideRequest>(
        "SELECT * FROM requests WHERE student_id = $1 ORDER BY created_at DESC",
    )
    .bind(student_id)
    .fetch_all(pool)
    .await
    .map_err(AppError::db_error)?;

    Ok(requests)
}

/// Pending queue for a tutor: requests at the tutor stage from students
/// assigned to them.
pub async fn fetch_pending_for_tutor(
    pool: &PgPool,
    tutor_id: Uuid,
) -> Result<Vec<BonafideRequest>, AppError> {
    let requests = sqlx::query_as::<_, BonafideRequest>(
        r#"
        SELECT r.* FROM requests r
        JOIN students s ON s.id = r.student_id
        WHERE r.status = $1 AND s.tutor_id = $2
        ORDER BY r.created_at
        "#,
    )
    .bind(RequestStatus::PendingTutorApproval.as_str())
    .bind(tutor_id)
    .fetch_all(pool)
    .await
    .map_err(AppError::db_error)?;

    Ok(requests)
}

pub async fn fetch_pending_for_hod(
    pool: &PgPool,
    hod_id: Uuid,
) -> Result<Vec<BonafideRequest>, AppError> {
    let requests = sqlx::query_as::<_, BonafideRequest>(
        r#"
        SELECT r.* FROM requests r
        JOIN students s ON s.id = r.student_id
        WHERE r.status = $1 AND s.hod_id = $2
        ORDER BY r.created_at
        "#,
    )
    .bind(RequestStatus::PendingHodApproval.as_str())
    .bind(hod_id)
    .fetch_all(pool)
    .await
    .map_err(AppError::db_error)?;

    Ok(requests)
}

/// The principal reviews the whole college; no student scoping.
pub async fn fetch_pending_for_principal(pool: &PgPool) -> Result<Vec<BonafideRequest>, AppError> {
    let requests = sqlx::query_as::<_, BonafideRequest>(
        "SELECT * FROM requests WHERE status = $1 ORDER BY created_at",
    )
    .bind(RequestStatus::PendingPrincipalApproval.as_str())
    .fetch_all(pool)
    .await
    .map_err(AppError::db_error)?;

    Ok(requests)
}

/// Requests of a reviewer's students that have moved past (or been returned
/// from) the reviewer's own stage.
pub async fn fetch_history_for_reviewer(
    pool: &PgPool,
    reviewer_column: ReviewerColumn,
    reviewer_id: Uuid,
    own_stage: RequestStatus,
) -> Result<Vec<BonafideRequest>, AppError> {
    let query = format!(
        r#"
        SELECT r.* FROM requests r
        JOIN students s ON s.id = r.student_id
        WHERE r.status != $1 AND s.{} = $2
        ORDER BY r.updated_at DESC
        "#,
        reviewer_column.column_name()
    );

    let requests = sqlx::query_as::<_, BonafideRequest>(&query)
        .bind(own_stage.as_str())
        .bind(reviewer_id)
        .fetch_all(pool)
        .await
        .map_err(AppError::db_error)?;

    Ok(requests)
}

/// Which denormalized assignment column scopes a reviewer's history.
#[derive(Debug, Clone, Copy)]
pub enum ReviewerColumn {
    Tutor,
    Hod,
}

impl ReviewerColumn {
    fn column_name(&self) -> &'static str {
        match self {
            ReviewerColumn::Tutor => "tutor_id",
            ReviewerColumn::Hod => "hod_id",
        }
    }
}

pub async fn fetch_all_requests(
    pool: &PgPool,
    pagination: &PaginationQuery,
) -> Result<(Vec<BonafideRequest>, i64), AppError> {
    let requests = sqlx::query_as::<_, BonafideRequest>(
        "SELECT * FROM requests ORDER BY created_at DESC LIMIT $1 OFFSET $2",
    )
    .bind(pagination.per_page)
    .bind(pagination.offset())
    .fetch_all(pool)
    .await
    .map_err(AppError::db_error)?;

    let total_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM requests")
        .fetch_one(pool)
        .await
        .map_err(AppError::db_error)?;

    Ok((requests, total_count))
}

/// Apply a validated transition plan. The update is conditional on the row
/// still holding the `from` status; a stale reviewer gets a conflict back
/// instead of overwriting a concurrent decision.
pub async fn transition_request(
    pool: &PgPool,
    id: Uuid,
    from: RequestStatus,
    plan: &TransitionPlan,
) -> Result<BonafideRequest, AppError> {
    let now = Utc::now().naive_utc();

    let updated = sqlx::query_as::<_, BonafideRequest>(
        r#"
        UPDATE requests
        SET status = $3,
            return_reason = COALESCE($4, return_reason),
            template_id = COALESCE($5, template_id),
            updated_at = $6
        WHERE id = $1 AND status = $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(from.as_str())
    .bind(plan.to.as_str())
    .bind(&plan.return_reason)
    .bind(plan.template_id)
    .bind(now)
    .fetch_optional(pool)
    .await
    .map_err(AppError::db_error)?;

    match updated {
        Some(request) => Ok(request),
        None => {
            // Distinguish a vanished row from a lost race.
            let current = sqlx::query_as::<_, BonafideRequest>(
                "SELECT * FROM requests WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(AppError::db_error)?;

            match current {
                Some(request) => Err(AppError::conflict(format!(
                    "Request is no longer `{}` (now `{}`); someone else acted on it first",
                    from.as_str(),
                    request.status
                ))),
                None => Err(AppError::not_found("No request with that id")),
            }
        }
    }
}
