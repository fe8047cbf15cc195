use crate::errors::ApiError;
use crate::middleware::auth_middleware::RequestAuth;
use crate::models::all_models::{User, UserRole};
use actix_web::{web, HttpResponse};
use sqlx::PgPool;

//All Users
//All Users Input: HttpRequest(JWT Token, ADMIN)
//All Users Output: Vec<User>
pub async fn all_users(
    pool: web::Data<PgPool>,
    auth: RequestAuth,
) -> Result<HttpResponse, ApiError> {
    auth.require(UserRole::Admin)?;

    let users = sqlx::query_as::<_, User>("SELECT id, email, role FROM users ORDER BY id")
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(users))
}

//Config User Routes
// GET /users
pub fn config_user_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/users", web::get().to(all_users));
}
