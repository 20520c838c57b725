use actix_web::{delete, get, post, put, web, HttpResponse, Result};
use chrono::{Duration, Utc};
use sqlx::PgPool;
use std::str::FromStr;
use validator::Validate;

use crate::core::jwt_auth::{generate_jwt_token, require_role, JwtClaims, JwtMiddleware};
use crate::core::{AppConfig, AppError, AppErrorResponse, AppSuccessResponse};
use crate::db::profiles;
use crate::models::users::{
    ChangePasswordRequest, LoginRequest, LoginResponse, MessageResponse, RegisterRequest, Role,
    UpdateProfileRequest, UpdateUserRequest, UserProfile,
};

/// Staff provisioning. Students go through the student endpoints so their
/// register-number record is created alongside the profile.
#[tracing::instrument(name = "Register Staff Profile", skip(pool, auth, request))]
#[post("/register")]
pub async fn register(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    request: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    require_role(&auth.claims, &[Role::Admin])?;
    request.validate()?;

    let role = Role::from_str(&request.role)
        .map_err(|_| AppError::validation_error("Unrecognized role"))?;

    if role == Role::Student {
        return Ok(HttpResponse::BadRequest().json(AppErrorResponse {
            success: false,
            message: "Students are created through the student endpoints".to_string(),
        }));
    }

    if profiles::email_exists(&pool, &request.email).await? {
        return Ok(HttpResponse::BadRequest().json(AppErrorResponse {
            success: false,
            message: "A user with this email address already exists".to_string(),
        }));
    }

    if profiles::username_exists(&pool, &request.username).await? {
        return Ok(HttpResponse::BadRequest().json(AppErrorResponse {
            success: false,
            message: "This username is already taken".to_string(),
        }));
    }

    // A department owns at most one HOD.
    if role == Role::Hod {
        let department_id = request
            .department_id
            .ok_or_else(|| AppError::validation_error("An HOD profile requires a department"))?;
        if profiles::get_hod_for_department(&pool, department_id)
            .await?
            .is_some()
        {
            return Err(AppError::conflict("This department already has an HOD"));
        }
    }

    let password_hash = profiles::hash_password(&request.password)?;
    let mut tx = pool.begin().await.map_err(AppError::db_error)?;
    let profile = profiles::insert_profile(
        &mut tx,
        &profiles::NewProfile {
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
            username: request.username.clone(),
            email: request.email.clone(),
            phone_number: request.phone_number.clone(),
            role,
            department_id: request.department_id,
            batch_id: request.batch_id,
            password_hash,
        },
    )
    .await?;
    tx.commit().await.map_err(AppError::db_error)?;

    Ok(HttpResponse::Created().json(AppSuccessResponse {
        success: true,
        data: UserProfile::from(profile),
        message: "Profile created successfully".to_string(),
        pagination: None,
    }))
}

#[tracing::instrument(name = "User Login", skip(pool, config, request))]
#[post("/login")]
pub async fn login(
    pool: web::Data<PgPool>,
    config: web::Data<AppConfig>,
    request: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let profile = match profiles::get_profile_by_email(&pool, &request.email).await {
        Ok(profile) => profile,
        Err(_) => {
            return Ok(HttpResponse::Unauthorized().json(AppErrorResponse {
                success: false,
                message: "Email or password is incorrect".to_string(),
            }));
        }
    };

    if !profiles::verify_password(&request.password, &profile.password_hash)? {
        return Ok(HttpResponse::Unauthorized().json(AppErrorResponse {
            success: false,
            message: "Email or password is incorrect".to_string(),
        }));
    }

    let expires_at = Utc::now() + Duration::hours(config.jwt_auth_config.token_expiration_hours);
    let claims = JwtClaims {
        sub: profile.id.to_string(),
        email: profile.email.clone(),
        role: profile.role.clone(),
        exp: expires_at.timestamp() as usize,
    };

    let token = generate_jwt_token(&claims)?;

    let response = LoginResponse {
        user: UserProfile::from(profile),
        token,
        expires_at,
    };

    Ok(HttpResponse::Ok().json(AppSuccessResponse {
        success: true,
        data: response,
        message: "Login successful".to_string(),
        pagination: None,
    }))
}

#[tracing::instrument(name = "Get Own Profile", skip(pool, auth))]
#[get("/profile")]
pub async fn get_profile(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
) -> Result<HttpResponse, AppError> {
    let profile = profiles::get_profile_by_id(&pool, auth.user_id).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse {
        success: true,
        data: UserProfile::from(profile),
        message: "Profile retrieved successfully".to_string(),
        pagination: None,
    }))
}

#[tracing::instrument(name = "Update Own Profile", skip(pool, auth, request))]
#[put("/profile")]
pub async fn update_profile(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    request: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse, AppError> {
    let profile = profiles::update_own_profile(&pool, auth.user_id, &request).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse {
        success: true,
        data: UserProfile::from(profile),
        message: "Profile updated successfully".to_string(),
        pagination: None,
    }))
}

#[tracing::instrument(name = "Change Password", skip(pool, auth, request))]
#[post("/change-password")]
pub async fn change_password(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    request: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse, AppError> {
    let profile = profiles::get_profile_by_id(&pool, auth.user_id).await?;

    if !profiles::verify_password(&request.current_password, &profile.password_hash)? {
        return Ok(HttpResponse::BadRequest().json(AppErrorResponse {
            success: false,
            message: "The current password you provided is incorrect".to_string(),
        }));
    }

    if request.new_password.len() < 6 {
        return Ok(HttpResponse::BadRequest().json(AppErrorResponse {
            success: false,
            message: "New password must be at least 6 characters long".to_string(),
        }));
    }

    profiles::change_password(&pool, auth.user_id, &request.new_password).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse {
        success: true,
        data: MessageResponse {
            message: "Password changed successfully".to_string(),
        },
        message: "Password changed successfully".to_string(),
        pagination: None,
    }))
}

#[derive(Debug, serde::Deserialize)]
pub struct ListUsersQuery {
    pub role: String,
}

/// Admin listing of staff by role, backing the tutor and faculty screens.
#[tracing::instrument(name = "List Users By Role", skip(pool, auth))]
#[get("/users")]
pub async fn list_users(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    query: web::Query<ListUsersQuery>,
) -> Result<HttpResponse, AppError> {
    require_role(&auth.claims, &[Role::Admin])?;

    let role = Role::from_str(&query.role)
        .map_err(|_| AppError::validation_error("Unrecognized role"))?;

    let users: Vec<UserProfile> = profiles::list_profiles_by_role(&pool, role)
        .await?
        .into_iter()
        .map(UserProfile::from)
        .collect();

    Ok(HttpResponse::Ok().json(AppSuccessResponse {
        success: true,
        data: users,
        message: "Users retrieved successfully".to_string(),
        pagination: None,
    }))
}

#[tracing::instrument(name = "Admin Update User", skip(pool, auth, request))]
#[put("/users/{user_id}")]
pub async fn admin_update_user(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    user_id: web::Path<uuid::Uuid>,
    request: web::Json<UpdateUserRequest>,
) -> Result<HttpResponse, AppError> {
    require_role(&auth.claims, &[Role::Admin])?;

    let profile = profiles::admin_update_profile(&pool, user_id.into_inner(), &request).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse {
        success: true,
        data: UserProfile::from(profile),
        message: "Profile updated successfully".to_string(),
        pagination: None,
    }))
}

/// Role-specific deletion for the tutor/HOD management screens.
#[tracing::instrument(name = "Admin Delete Staff", skip(pool, auth))]
#[delete("/users/{user_id}")]
pub async fn admin_delete_staff(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    user_id: web::Path<uuid::Uuid>,
) -> Result<HttpResponse, AppError> {
    require_role(&auth.claims, &[Role::Admin])?;

    profiles::delete_staff_profile(&pool, user_id.into_inner()).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse {
        success: true,
        data: MessageResponse {
            message: "Profile deleted successfully".to_string(),
        },
        message: "Profile deleted successfully".to_string(),
        pagination: None,
    }))
}
