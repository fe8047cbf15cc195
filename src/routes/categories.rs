use crate::errors::ApiError;
use crate::middleware::auth_middleware::RequestAuth;
use crate::models::all_models::{Category, CategorySummary, UserRole};
use crate::routes::{links_for_categories, non_blank};
use actix_web::{web, HttpResponse};
use log::info;
use serde::Deserialize;
use sqlx::PgPool;

//Create / Update Category Request
#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
}

fn not_found(category_id: i32) -> ApiError {
    ApiError::NotFound(format!("Category {category_id} not found"))
}

//Get Categories
//Get Categories Output: Vec<Category>
pub async fn get_categories(pool: web::Data<PgPool>) -> Result<HttpResponse, ApiError> {
    let summaries = sqlx::query_as::<_, CategorySummary>(
        "SELECT id, name FROM categories ORDER BY id",
    )
    .fetch_all(pool.get_ref())
    .await?;

    let ids: Vec<i32> = summaries.iter().map(|c| c.id).collect();
    let links = links_for_categories(pool.get_ref(), &ids).await?;

    let categories: Vec<Category> = summaries
        .into_iter()
        .map(|summary| Category::from_summary(summary, &links))
        .collect();

    Ok(HttpResponse::Ok().json(categories))
}

//Create Category
//Create Category Input: HttpRequest(JWT Token, ADMIN), CategoryRequest
//Create Category Output: Category
pub async fn create_category(
    pool: web::Data<PgPool>,
    auth: RequestAuth,
    payload: web::Json<CategoryRequest>,
) -> Result<HttpResponse, ApiError> {
    let admin = auth.require(UserRole::Admin)?;
    let name = non_blank("Name", &payload.name)?;

    let summary = sqlx::query_as::<_, CategorySummary>(
        "INSERT INTO categories (name) VALUES ($1) RETURNING id, name",
    )
    .bind(&name)
    .fetch_one(pool.get_ref())
    .await?;

    info!("Category {} created by user {}", summary.id, admin.id);
    Ok(HttpResponse::Ok().json(Category::from_summary(summary, &[])))
}

//Update Category
//Update Category Input: Path (/categories/{category_id}), CategoryRequest
//Update Category Output: Category
pub async fn update_category(
    pool: web::Data<PgPool>,
    auth: RequestAuth,
    path: web::Path<i32>,
    payload: web::Json<CategoryRequest>,
) -> Result<HttpResponse, ApiError> {
    let admin = auth.require(UserRole::Admin)?;
    let category_id = path.into_inner();
    let name = non_blank("Name", &payload.name)?;

    let summary = sqlx::query_as::<_, CategorySummary>(
        "UPDATE categories SET name = $1 WHERE id = $2 RETURNING id, name",
    )
    .bind(&name)
    .bind(category_id)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| not_found(category_id))?;

    let links = links_for_categories(pool.get_ref(), &[summary.id]).await?;

    info!("Category {} renamed by user {}", summary.id, admin.id);
    Ok(HttpResponse::Ok().json(Category::from_summary(summary, &links)))
}

//Delete Category
//Delete Category Input: Path (/categories/{category_id})
//Delete Category Output: Category (as it was before deletion)
pub async fn delete_category(
    pool: web::Data<PgPool>,
    auth: RequestAuth,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let admin = auth.require(UserRole::Admin)?;
    let category_id = path.into_inner();

    let mut tx = pool.begin().await?;

    let links = links_for_categories(&mut *tx, &[category_id]).await?;

    sqlx::query("DELETE FROM category_product WHERE category_id = $1")
        .bind(category_id)
        .execute(&mut *tx)
        .await?;

    let summary = sqlx::query_as::<_, CategorySummary>(
        "DELETE FROM categories WHERE id = $1 RETURNING id, name",
    )
    .bind(category_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| not_found(category_id))?;

    tx.commit().await?;

    info!("Category {} deleted by user {}", summary.id, admin.id);
    Ok(HttpResponse::Ok().json(Category::from_summary(summary, &links)))
}

//Config Category Routes
// GET /categories
// POST /categories
// PUT /categories/{category_id}
// DELETE /categories/{category_id}
pub fn config_category_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/categories")
            .route("", web::get().to(get_categories))
            .route("", web::post().to(create_category))
            .route("/{category_id}", web::put().to(update_category))
            .route("/{category_id}", web::delete().to(delete_category)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{bearer_for, test_app};
    use actix_web::http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        StatusCode,
    };
    use actix_web::test;
    use serde_json::json;

    #[actix_web::test]
    async fn mutations_without_token_are_rejected() {
        let app = test_app!(config_category_routes);

        let requests = [
            test::TestRequest::post()
                .uri("/categories")
                .set_json(json!({"name": "Tools"})),
            test::TestRequest::put()
                .uri("/categories/4")
                .set_json(json!({"name": "Tools"})),
            test::TestRequest::delete().uri("/categories/4"),
        ];

        for req in requests {
            let resp = test::call_service(&app, req.to_request()).await;
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
            let body: serde_json::Value = test::read_body_json(resp).await;
            assert_eq!(body["code"], "UNAUTHENTICATED");
        }
    }

    #[actix_web::test]
    async fn malformed_body_and_path_render_as_api_errors() {
        let app = test_app!(config_category_routes);

        let requests = [
            test::TestRequest::post()
                .uri("/categories")
                .insert_header((CONTENT_TYPE, "application/json"))
                .set_payload("{not json"),
            test::TestRequest::delete().uri("/categories/abc"),
            test::TestRequest::put()
                .uri("/categories/abc")
                .set_json(json!({"name": "Tools"})),
        ];

        for req in requests {
            let resp = test::call_service(&app, req.to_request()).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            let body: serde_json::Value = test::read_body_json(resp).await;
            assert_eq!(body["code"], "BAD_REQUEST");
            assert!(!body["message"].as_str().unwrap().is_empty());
        }
    }

    #[actix_web::test]
    async fn user_role_cannot_delete() {
        let app = test_app!(config_category_routes);
        let req = test::TestRequest::delete()
            .uri("/categories/4")
            .insert_header((AUTHORIZATION, bearer_for(UserRole::User)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "User is not authenticated");
    }

    #[actix_web::test]
    async fn admin_with_blank_name_gets_bad_request() {
        let app = test_app!(config_category_routes);
        let req = test::TestRequest::post()
            .uri("/categories")
            .insert_header((AUTHORIZATION, bearer_for(UserRole::Admin)))
            .set_json(json!({"name": "   "}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
