use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::Utc;
use secrecy::ExposeSecret;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::core::config::BootstrapAdminConfig;
use crate::core::AppError;
use crate::models::users::{Profile, Role, UpdateProfileRequest, UpdateUserRequest};

/// Everything needed to insert a `profiles` row. Built by the auth handler
/// for staff and by the student layer as the first half of its transaction.
pub struct NewProfile {
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub role: Role,
    pub department_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
    pub password_hash: String,
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AppError::internal_error("Failed to hash password"))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|_| AppError::internal_error("Invalid password hash"))?;

    let argon2 = Argon2::default();
    Ok(argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub async fn insert_profile(
    tx: &mut Transaction<'_, Postgres>,
    new_profile: &NewProfile,
) -> Result<Profile, AppError> {
    let id = Uuid::new_v4();
    let now = Utc::now().naive_utc();

    let profile = sqlx::query_as::<_, Profile>(
        r#"
        INSERT INTO profiles
            (id, first_name, last_name, username, email, phone_number, role,
             password_hash, department_id, batch_id, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&new_profile.first_name)
    .bind(&new_profile.last_name)
    .bind(&new_profile.username)
    .bind(&new_profile.email)
    .bind(&new_profile.phone_number)
    .bind(new_profile.role.to_string())
    .bind(&new_profile.password_hash)
    .bind(new_profile.department_id)
    .bind(new_profile.batch_id)
    .bind(now)
    .fetch_one(tx.as_mut())
    .await
    .map_err(AppError::db_error)?;

    Ok(profile)
}

pub async fn get_profile_by_email(pool: &PgPool, email: &str) -> Result<Profile, AppError> {
    let profile = sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE email = $1")
        .bind(email)
        .fetch_one(pool)
        .await?;

    Ok(profile)
}

pub async fn get_profile_by_id(pool: &PgPool, id: Uuid) -> Result<Profile, AppError> {
    let profile = sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await?;

    Ok(profile)
}

pub async fn email_exists(pool: &PgPool, email: &str) -> Result<bool, AppError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM profiles WHERE email = $1")
        .bind(email)
        .fetch_one(pool)
        .await
        .map_err(AppError::db_error)?;

    Ok(count > 0)
}

pub async fn username_exists(pool: &PgPool, username: &str) -> Result<bool, AppError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM profiles WHERE username = $1")
        .bind(username)
        .fetch_one(pool)
        .await
        .map_err(AppError::db_error)?;

    Ok(count > 0)
}

/// The HOD profile of a department, if one has been provisioned.
pub async fn get_hod_for_department(
    pool: &PgPool,
    department_id: Uuid,
) -> Result<Option<Profile>, AppError> {
    let profile = sqlx::query_as::<_, Profile>(
        "SELECT * FROM profiles WHERE role = 'hod' AND department_id = $1",
    )
    .bind(department_id)
    .fetch_optional(pool)
    .await
    .map_err(AppError::db_error)?;

    Ok(profile)
}

pub async fn list_profiles_by_role(pool: &PgPool, role: Role) -> Result<Vec<Profile>, AppError> {
    let profiles =
        sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE role = $1 ORDER BY first_name")
            .bind(role.to_string())
            .fetch_all(pool)
            .await
            .map_err(AppError::db_error)?;

    Ok(profiles)
}

pub async fn update_own_profile(
    pool: &PgPool,
    user_id: Uuid,
    request: &UpdateProfileRequest,
) -> Result<Profile, AppError> {
    let now = Utc::now().naive_utc();

    let profile = sqlx::query_as::<_, Profile>(
        r#"
        UPDATE profiles
        SET first_name = COALESCE($2, first_name),
            last_name = COALESCE($3, last_name),
            phone_number = COALESCE($4, phone_number),
            updated_at = $5
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(&request.first_name)
    .bind(&request.last_name)
    .bind(&request.phone_number)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(profile)
}

/// Admin-side update of a staff profile, including department/batch
/// reassignment. The role column is never touched here.
pub async fn admin_update_profile(
    pool: &PgPool,
    user_id: Uuid,
    request: &UpdateUserRequest,
) -> Result<Profile, AppError> {
    let now = Utc::now().naive_utc();

    let profile = sqlx::query_as::<_, Profile>(
        r#"
        UPDATE profiles
        SET first_name = COALESCE($2, first_name),
            last_name = COALESCE($3, last_name),
            phone_number = COALESCE($4, phone_number),
            department_id = COALESCE($5, department_id),
            batch_id = COALESCE($6, batch_id),
            updated_at = $7
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(&request.first_name)
    .bind(&request.last_name)
    .bind(&request.phone_number)
    .bind(request.department_id)
    .bind(request.batch_id)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(profile)
}

pub async fn change_password(
    pool: &PgPool,
    user_id: Uuid,
    new_password: &str,
) -> Result<(), AppError> {
    let now = Utc::now().naive_utc();
    let password_hash = hash_password(new_password)?;

    sqlx::query("UPDATE profiles SET password_hash = $2, updated_at = $3 WHERE id = $1")
        .bind(user_id)
        .bind(password_hash)
        .bind(now)
        .execute(pool)
        .await
        .map_err(AppError::db_error)?;

    Ok(())
}

/// Role-specific deletion used by the admin tutor/HOD screens. Student
/// profiles are never removed through this path.
pub async fn delete_staff_profile(pool: &PgPool, user_id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM profiles WHERE id = $1 AND role IN ('tutor', 'hod')")
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(AppError::db_error)?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("No tutor or HOD profile with that id"));
    }

    Ok(())
}

/// Create the seed admin on first startup so provisioning endpoints have a
/// caller. A no-op once any profile exists.
pub async fn ensure_bootstrap_admin(
    pool: &PgPool,
    bootstrap: &BootstrapAdminConfig,
) -> Result<(), AppError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM profiles")
        .fetch_one(pool)
        .await
        .map_err(AppError::db_error)?;

    if count > 0 {
        return Ok(());
    }

    let mut tx = pool.begin().await.map_err(AppError::db_error)?;
    let new_profile = NewProfile {
        first_name: bootstrap.username.clone(),
        last_name: None,
        username: bootstrap.username.clone(),
        email: bootstrap.email.clone(),
        phone_number: None,
        role: Role::Admin,
        department_id: None,
        batch_id: None,
        password_hash: hash_password(bootstrap.password.expose_secret())?,
    };
    insert_profile(&mut tx, &new_profile).await?;
    tx.commit().await.map_err(AppError::db_error)?;

    tracing::info!("Bootstrap admin `{}` created", bootstrap.username);
    Ok(())
}
