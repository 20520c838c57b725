use actix_web::{dev::Payload, Error as ActixWebError};
use actix_web::{error::ErrorUnauthorized, http, FromRequest, HttpMessage, HttpRequest};
use core::fmt;
use jsonwebtoken::{decode, DecodingKey, Validation};
use jsonwebtoken::{encode, EncodingKey, Header};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};
use std::str::FromStr;
use uuid::Uuid;

use crate::core::AppError;
use crate::models::users::Role;

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", serde_json::to_string(&self).unwrap())
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    success: bool,
    message: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtClaims {
    pub sub: String, // profile ID
    pub email: String,
    pub role: String,
    pub exp: usize, // expiration time
}

#[derive(Debug)]
pub struct JwtMiddleware {
    pub user_id: Uuid,
    pub claims: JwtClaims,
}

static JWT_SECRET: Lazy<String> = Lazy::new(|| {
    std::env::var("BONAFIDE_JWT_SECRET")
        .unwrap_or_else(|_| "REPLACE-ME-IN-DEPLOYMENT-NEVER-SHIP-THIS".to_string())
});

impl FromRequest for JwtMiddleware {
    type Error = ActixWebError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let token = req
            .headers()
            .get(http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|value| value.to_string());

        let token = match token {
            Some(token) => token,
            None => {
                let error = ErrorResponse {
                    message: "Missing authentication token".to_string(),
                    success: false,
                };
                return ready(Err(ErrorUnauthorized(error)));
            }
        };

        let claims = match decode::<JwtClaims>(
            &token,
            &DecodingKey::from_secret(JWT_SECRET.as_ref()),
            &Validation::default(),
        ) {
            Ok(c) => c.claims,
            Err(_) => {
                let error = ErrorResponse {
                    message: "Invalid token".to_string(),
                    success: false,
                };
                return ready(Err(ErrorUnauthorized(error)));
            }
        };

        let user_id = match Uuid::parse_str(&claims.sub) {
            Ok(id) => id,
            Err(_) => {
                let error = ErrorResponse {
                    message: "Invalid user ID in token".to_string(),
                    success: false,
                };
                return ready(Err(ErrorUnauthorized(error)));
            }
        };

        req.extensions_mut().insert(claims.clone());

        ready(Ok(JwtMiddleware { user_id, claims }))
    }
}

pub fn generate_jwt_token(claims: &JwtClaims) -> Result<String, AppError> {
    let header = Header::default();
    let encoding_key = EncodingKey::from_secret(JWT_SECRET.as_ref());

    encode(&header, claims, &encoding_key)
        .map_err(|_| AppError::internal_error("Failed to generate JWT token"))
}

/// Role gate used at the top of role-prefixed handlers. Redirect-on-mismatch
/// from the original UI becomes a 403 here.
pub fn require_role(claims: &JwtClaims, allowed: &[Role]) -> Result<Role, AppError> {
    let role = Role::from_str(&claims.role)
        .map_err(|_| AppError::unauthorized("Unrecognized role in token"))?;

    if allowed.contains(&role) {
        Ok(role)
    } else {
        Err(AppError::forbidden_error(
            "Your role does not permit this operation",
        ))
    }
}

impl FromRequest for JwtClaims {
    type Error = ActixWebError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        if let Some(claims) = req.extensions().get::<JwtClaims>() {
            ready(Ok(claims.clone()))
        } else {
            let error = ErrorResponse {
                message: "No authentication token found".to_string(),
                success: false,
            };
            ready(Err(ErrorUnauthorized(error)))
        }
    }
}
