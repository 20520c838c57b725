use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::core::AppError;
use crate::db::profiles::{self, NewProfile};
use crate::models::pagination::PaginationQuery;
use crate::models::students::{CreateStudentRequest, StudentDetails, StudentImportRow};
use crate::models::users::Role;

const DETAILS_SELECT: &str = r#"
    SELECT s.id,
           p.first_name,
           p.last_name,
           p.username,
           p.email,
           p.phone_number,
           s.register_number,
           s.parent_name,
           s.date_of_birth,
           s.nationality,
           s.batch_id,
           b.name AS batch_name,
           b.section AS batch_section,
           b.current_semester,
           b.department_id AS department_id,
           d.name AS department_name,
           s.tutor_id,
           NULLIF(TRIM(CONCAT(tp.first_name, ' ', COALESCE(tp.last_name, ''))), '') AS tutor_name,
           s.hod_id,
           NULLIF(TRIM(CONCAT(hp.first_name, ' ', COALESCE(hp.last_name, ''))), '') AS hod_name,
           p.created_at
    FROM students s
    JOIN profiles p ON p.id = s.id
    LEFT JOIN batches b ON b.id = s.batch_id
    LEFT JOIN departments d ON d.id = b.department_id
    LEFT JOIN profiles tp ON tp.id = s.tutor_id
    LEFT JOIN profiles hp ON hp.id = s.hod_id
"#;

/// Create a student: profile row plus student row in one transaction, so a
/// failure part-way leaves nothing behind. The tutor comes from the chosen
/// batch and the HOD from the batch's department, which keeps the
/// denormalized assignment columns consistent at birth.
pub async fn create_student(
    pool: &PgPool,
    request: &CreateStudentRequest,
) -> Result<StudentDetails, AppError> {
    let password_hash = profiles::hash_password(&request.password)?;

    let batch_tutor: Option<Uuid> =
        sqlx::query_scalar("SELECT tutor_id FROM batches WHERE id = $1")
            .bind(request.batch_id)
            .fetch_one(pool)
            .await?;

    let hod_id = profiles::get_hod_for_department(pool, request.department_id)
        .await?
        .map(|hod| hod.id);

    let mut tx = pool.begin().await.map_err(AppError::db_error)?;

    let profile = profiles::insert_profile(
        &mut tx,
        &NewProfile {
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
            username: request.username.clone(),
            email: request.email.clone(),
            phone_number: request.phone_number.clone(),
            role: Role::Student,
            department_id: Some(request.department_id),
            batch_id: Some(request.batch_id),
            password_hash,
        },
    )
    .await?;

    insert_student_row(
        &mut tx,
        profile.id,
        &request.register_number,
        request.parent_name.as_deref(),
        request.date_of_birth,
        request.nationality.as_deref(),
        request.batch_id,
        batch_tutor,
        hod_id,
    )
    .await?;

    tx.commit().await.map_err(AppError::db_error)?;

    fetch_student_details(pool, profile.id).await
}

/// Bulk-import variant: same transactional shape, initial password set to
/// the register number for first login.
pub async fn import_student(pool: &PgPool, row: &StudentImportRow) -> Result<Uuid, AppError> {
    let password_hash = profiles::hash_password(&row.register_number)?;

    let batch_tutor: Option<Uuid> =
        sqlx::query_scalar("SELECT tutor_id FROM batches WHERE id = $1")
            .bind(row.batch_id)
            .fetch_one(pool)
            .await?;

    let hod_id = profiles::get_hod_for_department(pool, row.department_id)
        .await?
        .map(|hod| hod.id);

    let mut tx = pool.begin().await.map_err(AppError::db_error)?;

    let profile = profiles::insert_profile(
        &mut tx,
        &NewProfile {
            first_name: row.first_name.clone(),
            last_name: row.last_name.clone(),
            username: row.username.clone(),
            email: row.email.clone(),
            phone_number: row.phone_number.clone(),
            role: Role::Student,
            department_id: Some(row.department_id),
            batch_id: Some(row.batch_id),
            password_hash,
        },
    )
    .await?;

    insert_student_row(
        &mut tx,
        profile.id,
        &row.register_number,
        row.parent_name.as_deref(),
        None,
        None,
        row.batch_id,
        batch_tutor,
        hod_id,
    )
    .await?;

    tx.commit().await.map_err(AppError::db_error)?;

    Ok(profile.id)
}

#[allow(clippy::too_many_arguments)]
async fn insert_student_row(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    register_number: &str,
    parent_name: Option<&str>,
    date_of_birth: Option<chrono::NaiveDate>,
    nationality: Option<&str>,
    batch_id: Uuid,
    tutor_id: Option<Uuid>,
    hod_id: Option<Uuid>,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO students
            (id, register_number, parent_name, date_of_birth, nationality,
             batch_id, tutor_id, hod_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(id)
    .bind(register_number)
    .bind(parent_name)
    .bind(date_of_birth)
    .bind(nationality)
    .bind(batch_id)
    .bind(tutor_id)
    .bind(hod_id)
    .execute(tx.as_mut())
    .await
    .map_err(AppError::db_error)?;

    Ok(())
}

pub async fn register_number_exists(
    pool: &PgPool,
    register_number: &str,
) -> Result<bool, AppError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM students WHERE register_number = $1")
        .bind(register_number)
        .fetch_one(pool)
        .await
        .map_err(AppError::db_error)?;

    Ok(count > 0)
}

pub async fn fetch_student_details(pool: &PgPool, id: Uuid) -> Result<StudentDetails, AppError> {
    let query = format!("{} WHERE s.id = $1", DETAILS_SELECT);
    let details = sqlx::query_as::<_, StudentDetails>(&query)
        .bind(id)
        .fetch_one(pool)
        .await?;

    Ok(details)
}

pub async fn fetch_all_students_with_details(
    pool: &PgPool,
    pagination: &PaginationQuery,
) -> Result<(Vec<StudentDetails>, i64), AppError> {
    let query = format!(
        "{} ORDER BY s.register_number LIMIT $1 OFFSET $2",
        DETAILS_SELECT
    );
    let students = sqlx::query_as::<_, StudentDetails>(&query)
        .bind(pagination.per_page)
        .bind(pagination.offset())
        .fetch_all(pool)
        .await
        .map_err(AppError::db_error)?;

    let total_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM students")
        .fetch_one(pool)
        .await
        .map_err(AppError::db_error)?;

    Ok((students, total_count))
}

/// Students whose batch is assigned to the given tutor.
pub async fn fetch_students_for_tutor(
    pool: &PgPool,
    tutor_id: Uuid,
) -> Result<Vec<StudentDetails>, AppError> {
    let query = format!(
        "{} WHERE s.tutor_id = $1 ORDER BY s.register_number",
        DETAILS_SELECT
    );
    let students = sqlx::query_as::<_, StudentDetails>(&query)
        .bind(tutor_id)
        .fetch_all(pool)
        .await
        .map_err(AppError::db_error)?;

    Ok(students)
}

/// Students in the given HOD's department, via the denormalized column.
pub async fn fetch_students_for_hod(
    pool: &PgPool,
    hod_id: Uuid,
) -> Result<Vec<StudentDetails>, AppError> {
    let query = format!(
        "{} WHERE s.hod_id = $1 ORDER BY s.register_number",
        DETAILS_SELECT
    );
    let students = sqlx::query_as::<_, StudentDetails>(&query)
        .bind(hod_id)
        .fetch_all(pool)
        .await
        .map_err(AppError::db_error)?;

    Ok(students)
}

/// Re-derive the denormalized tutor/HOD columns from the batch and
/// department they were originally copied from. Run after reassigning a
/// batch tutor or a department HOD.
pub async fn resync_assignments(pool: &PgPool) -> Result<u64, AppError> {
    let mut tx = pool.begin().await.map_err(AppError::db_error)?;

    let tutors = sqlx::query(
        r#"
        UPDATE students s
        SET tutor_id = b.tutor_id
        FROM batches b
        WHERE s.batch_id = b.id
          AND s.tutor_id IS DISTINCT FROM b.tutor_id
        "#,
    )
    .execute(tx.as_mut())
    .await
    .map_err(AppError::db_error)?;

    let hods = sqlx::query(
        r#"
        UPDATE students s
        SET hod_id = hp.id
        FROM batches b
        JOIN profiles hp ON hp.role = 'hod' AND hp.department_id = b.department_id
        WHERE s.batch_id = b.id
          AND s.hod_id IS DISTINCT FROM hp.id
        "#,
    )
    .execute(tx.as_mut())
    .await
    .map_err(AppError::db_error)?;

    tx.commit().await.map_err(AppError::db_error)?;

    Ok(tutors.rows_affected() + hods.rows_affected())
}
