use crate::errors::ApiError;
use crate::handlers::auth::{IdentityClaims, TokenCodec};
use crate::handlers::password::{hash_password, verify_password};
use crate::middleware::auth_middleware::RequestAuth;
use crate::models::all_models::{AuthPayload, User, UserCredentials, UserRole};
use crate::routes::non_blank;
use actix_web::{web, HttpResponse};
use log::{info, warn};
use serde::Deserialize;
use sqlx::PgPool;

//Login / Register Request
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

fn issue_payload(codec: &TokenCodec, user: User) -> Result<AuthPayload, ApiError> {
    let claims = IdentityClaims {
        id: user.id,
        email: user.email.clone(),
        role: user.role,
    };
    let token = codec
        .encode(&claims)
        .map_err(|e| ApiError::internal("Failed to sign token", e))?;

    Ok(AuthPayload { token, user })
}

//Register
//Register Input: CredentialsRequest
//Register Output: AuthPayload
pub async fn register(
    pool: web::Data<PgPool>,
    codec: web::Data<TokenCodec>,
    payload: web::Json<CredentialsRequest>,
) -> Result<HttpResponse, ApiError> {
    let email = non_blank("Email", &payload.email)?;
    if payload.password.is_empty() {
        return Err(ApiError::BadRequest("Password cannot be empty".to_string()));
    }

    let password_hash = hash_password(&payload.password)
        .map_err(|e| ApiError::internal("Failed to hash password", e))?;

    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (email, password, role) VALUES ($1, $2, $3) RETURNING id, email, role",
    )
    .bind(&email)
    .bind(password_hash)
    .bind(UserRole::User)
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| match ApiError::from(e) {
        ApiError::Conflict(_) => ApiError::Conflict("Email already registered".to_string()),
        other => other,
    })?;

    info!("Registered user {} ({})", user.id, user.email);
    Ok(HttpResponse::Ok().json(issue_payload(&codec, user)?))
}

//Login
//Login Input: CredentialsRequest
//Login Output: AuthPayload
pub async fn login(
    pool: web::Data<PgPool>,
    codec: web::Data<TokenCodec>,
    payload: web::Json<CredentialsRequest>,
) -> Result<HttpResponse, ApiError> {
    let email = non_blank("Email", &payload.email)?;
    if payload.password.is_empty() {
        return Err(ApiError::BadCredentials);
    }

    let user = sqlx::query_as::<_, UserCredentials>(
        "SELECT id, email, password, role FROM users WHERE email = $1",
    )
    .bind(&email)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or(ApiError::BadCredentials)?;

    let verified = verify_password(&payload.password, &user.password)
        .map_err(|e| ApiError::internal("Error verifying password", e))?;
    if !verified {
        warn!("Failed login for user {}", user.id);
        return Err(ApiError::BadCredentials);
    }

    let user = User {
        id: user.id,
        email: user.email,
        role: user.role,
    };
    Ok(HttpResponse::Ok().json(issue_payload(&codec, user)?))
}

// Current request's decoded token, or null without one
pub async fn me(auth: RequestAuth) -> HttpResponse {
    HttpResponse::Ok().json(auth.get())
}

//Config User Auth Routes
// POST /auth/register
// POST /auth/login
// GET /auth/me
pub fn config_user_auth_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .route("/me", web::get().to(me)),
    );
}
