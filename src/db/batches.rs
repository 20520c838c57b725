use chrono::{NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::core::semester::{calculate_current_semester_for_batch, semester_date_range};
use crate::core::AppError;
use crate::models::batches::{
    Batch, BatchDetails, CreateBatchRequest, UpdateBatchRequest, BATCH_STATUS_ACTIVE,
    BATCH_STATUS_INACTIVE,
};

const SECTION_LETTERS: [&str; 26] = [
    "A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "O", "P", "Q", "R", "S",
    "T", "U", "V", "W", "X", "Y", "Z",
];

fn full_batch_name(name: &str, section: Option<&str>) -> String {
    match section {
        Some(section) => format!("{} {}", name, section),
        None => name.to_string(),
    }
}

/// Create a batch: one row per section, each seeded with the semester and
/// date range derived from the batch name.
pub async fn create_batch(
    pool: &PgPool,
    request: &CreateBatchRequest,
    today: NaiveDate,
) -> Result<Vec<Batch>, AppError> {
    let existing: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM batches WHERE department_id = $1 AND name = $2")
            .bind(request.department_id)
            .bind(&request.name)
            .fetch_one(pool)
            .await
            .map_err(AppError::db_error)?;

    if existing > 0 {
        return Err(AppError::conflict(
            "A batch with this name already exists in the department",
        ));
    }

    let mut tx = pool.begin().await.map_err(AppError::db_error)?;
    let mut created = Vec::with_capacity(request.total_sections as usize);

    for index in 0..request.total_sections as usize {
        let section = if request.total_sections > 1 {
            Some(SECTION_LETTERS[index])
        } else {
            None
        };
        let batch = insert_batch_row(
            &mut tx,
            &request.name,
            section,
            request.department_id,
            request.total_sections,
            request.tutor_id,
            today,
        )
        .await?;
        created.push(batch);
    }

    tx.commit().await.map_err(AppError::db_error)?;

    Ok(created)
}

async fn insert_batch_row(
    tx: &mut Transaction<'_, Postgres>,
    name: &str,
    section: Option<&str>,
    department_id: Uuid,
    total_sections: i32,
    tutor_id: Option<Uuid>,
    today: NaiveDate,
) -> Result<Batch, AppError> {
    let full_name = full_batch_name(name, section);
    let current_semester = calculate_current_semester_for_batch(&full_name, today);
    let range = semester_date_range(&full_name, current_semester, today);
    let now = Utc::now().naive_utc();

    let batch = sqlx::query_as::<_, Batch>(
        r#"
        INSERT INTO batches
            (id, name, section, department_id, total_sections, tutor_id,
             current_semester, semester_start, semester_end, status, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(section)
    .bind(department_id)
    .bind(total_sections)
    .bind(tutor_id)
    .bind(current_semester)
    .bind(range.from)
    .bind(range.to)
    .bind(BATCH_STATUS_ACTIVE)
    .bind(now)
    .fetch_one(tx.as_mut())
    .await
    .map_err(AppError::db_error)?;

    Ok(batch)
}

pub async fn fetch_batches(pool: &PgPool) -> Result<Vec<BatchDetails>, AppError> {
    let batches = sqlx::query_as::<_, BatchDetails>(
        r#"
        SELECT b.id,
               b.name,
               b.section,
               b.department_id,
               d.name AS department_name,
               b.total_sections,
               b.tutor_id,
               NULLIF(TRIM(CONCAT(tp.first_name, ' ', COALESCE(tp.last_name, ''))), '') AS tutor_name,
               b.current_semester,
               b.semester_start,
               b.semester_end,
               b.status,
               b.created_at
        FROM batches b
        JOIN departments d ON d.id = b.department_id
        LEFT JOIN profiles tp ON tp.id = b.tutor_id
        ORDER BY b.name, b.section NULLS FIRST
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(AppError::db_error)?;

    Ok(batches)
}

pub async fn fetch_batch(pool: &PgPool, id: Uuid) -> Result<Batch, AppError> {
    let batch = sqlx::query_as::<_, Batch>("SELECT * FROM batches WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await?;

    Ok(batch)
}

/// Update a section row. A change to `total_sections` is propagated to all
/// sibling sections of the same batch name, and any missing section rows
/// are created; sibling rows are never deleted on shrink, the count is
/// advisory for them.
pub async fn update_batch(
    pool: &PgPool,
    id: Uuid,
    request: &UpdateBatchRequest,
    today: NaiveDate,
) -> Result<Vec<Batch>, AppError> {
    let batch = fetch_batch(pool, id).await?;

    let mut tx = pool.begin().await.map_err(AppError::db_error)?;

    if request.tutor_id.is_some() {
        sqlx::query("UPDATE batches SET tutor_id = $2 WHERE id = $1")
            .bind(id)
            .bind(request.tutor_id)
            .execute(tx.as_mut())
            .await
            .map_err(AppError::db_error)?;
    }

    if let Some(new_total) = request.total_sections {
        if new_total != batch.total_sections {
            sqlx::query(
                "UPDATE batches SET total_sections = $3 WHERE department_id = $1 AND name = $2",
            )
            .bind(batch.department_id)
            .bind(&batch.name)
            .bind(new_total)
            .execute(tx.as_mut())
            .await
            .map_err(AppError::db_error)?;

            if new_total > 1 {
                // A lone unsectioned row becomes section A before siblings
                // are added.
                sqlx::query(
                    "UPDATE batches SET section = 'A' WHERE department_id = $1 AND name = $2 AND section IS NULL",
                )
                .bind(batch.department_id)
                .bind(&batch.name)
                .execute(tx.as_mut())
                .await
                .map_err(AppError::db_error)?;
            }

            let existing: Vec<String> = sqlx::query_scalar(
                "SELECT section FROM batches WHERE department_id = $1 AND name = $2 AND section IS NOT NULL",
            )
            .bind(batch.department_id)
            .bind(&batch.name)
            .fetch_all(tx.as_mut())
            .await
            .map_err(AppError::db_error)?;

            for letter in SECTION_LETTERS.iter().copied().take(new_total as usize) {
                if !existing.iter().any(|s| s == letter) {
                    insert_batch_row(
                        &mut tx,
                        &batch.name,
                        Some(letter),
                        batch.department_id,
                        new_total,
                        request.tutor_id.or(batch.tutor_id),
                        today,
                    )
                    .await?;
                }
            }
        }
    }

    tx.commit().await.map_err(AppError::db_error)?;

    fetch_siblings(pool, batch.department_id, &batch.name).await
}

pub async fn fetch_siblings(
    pool: &PgPool,
    department_id: Uuid,
    name: &str,
) -> Result<Vec<Batch>, AppError> {
    let batches = sqlx::query_as::<_, Batch>(
        "SELECT * FROM batches WHERE department_id = $1 AND name = $2 ORDER BY section NULLS FIRST",
    )
    .bind(department_id)
    .bind(name)
    .fetch_all(pool)
    .await
    .map_err(AppError::db_error)?;

    Ok(batches)
}

pub async fn toggle_batch_status(pool: &PgPool, id: Uuid) -> Result<Batch, AppError> {
    let batch = fetch_batch(pool, id).await?;
    let new_status = if batch.status == BATCH_STATUS_ACTIVE {
        BATCH_STATUS_INACTIVE
    } else {
        BATCH_STATUS_ACTIVE
    };

    let batch = sqlx::query_as::<_, Batch>(
        "UPDATE batches SET status = $2 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(new_status)
    .fetch_one(pool)
    .await?;

    Ok(batch)
}

/// Manual semester override; the date range follows the chosen semester.
pub async fn set_batch_semester(
    pool: &PgPool,
    id: Uuid,
    semester: i32,
    today: NaiveDate,
) -> Result<Batch, AppError> {
    let batch = fetch_batch(pool, id).await?;
    let range = semester_date_range(&batch.full_name(), semester, today);

    let batch = sqlx::query_as::<_, Batch>(
        r#"
        UPDATE batches
        SET current_semester = $2, semester_start = $3, semester_end = $4
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(semester)
    .bind(range.from)
    .bind(range.to)
    .fetch_one(pool)
    .await?;

    Ok(batch)
}

/// Recompute semester bookkeeping for every active batch. Returns how many
/// rows actually moved.
pub async fn refresh_active_batches(pool: &PgPool, today: NaiveDate) -> Result<u64, AppError> {
    let batches = sqlx::query_as::<_, Batch>("SELECT * FROM batches WHERE status = $1")
        .bind(BATCH_STATUS_ACTIVE)
        .fetch_all(pool)
        .await
        .map_err(AppError::db_error)?;

    let mut updated = 0;
    for batch in batches {
        let full_name = batch.full_name();
        let semester = calculate_current_semester_for_batch(&full_name, today);
        let range = semester_date_range(&full_name, semester, today);

        if semester != batch.current_semester
            || range.from != batch.semester_start
            || range.to != batch.semester_end
        {
            sqlx::query(
                r#"
                UPDATE batches
                SET current_semester = $2, semester_start = $3, semester_end = $4
                WHERE id = $1
                "#,
            )
            .bind(batch.id)
            .bind(semester)
            .bind(range.from)
            .bind(range.to)
            .execute(pool)
            .await
            .map_err(AppError::db_error)?;
            updated += 1;
        }
    }

    Ok(updated)
}
