use crate::errors::ApiError;
use crate::middleware::auth_middleware::RequestAuth;
use crate::models::all_models::{Product, ProductSummary, UserRole};
use crate::routes::{dedup_ids, links_for_products, non_blank};
use actix_web::{web, HttpResponse};
use log::info;
use serde::Deserialize;
use sqlx::{PgConnection, PgPool};

//Create / Update Product Request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRequest {
    pub name: String,
    pub category_ids: Vec<i32>,
}

fn not_found(product_id: i32) -> ApiError {
    ApiError::NotFound(format!("Product {product_id} not found"))
}

// Links a product to each category; an unknown category id fails the statement.
async fn link_categories(
    conn: &mut PgConnection,
    product_id: i32,
    category_ids: &[i32],
) -> Result<(), sqlx::Error> {
    if category_ids.is_empty() {
        return Ok(());
    }

    sqlx::query(
        "INSERT INTO category_product (category_id, product_id) \
         SELECT UNNEST($1::int4[]), $2",
    )
    .bind(category_ids)
    .bind(product_id)
    .execute(conn)
    .await?;

    Ok(())
}

//Get Products
//Get Products Output: Vec<Product>
pub async fn get_products(pool: web::Data<PgPool>) -> Result<HttpResponse, ApiError> {
    let summaries =
        sqlx::query_as::<_, ProductSummary>("SELECT id, name FROM products ORDER BY id")
            .fetch_all(pool.get_ref())
            .await?;

    let ids: Vec<i32> = summaries.iter().map(|p| p.id).collect();
    let links = links_for_products(pool.get_ref(), &ids).await?;

    let products: Vec<Product> = summaries
        .into_iter()
        .map(|summary| Product::from_summary(summary, &links))
        .collect();

    Ok(HttpResponse::Ok().json(products))
}

//Create Product
//Create Product Input: HttpRequest(JWT Token, ADMIN), ProductRequest
//Create Product Output: Product
pub async fn create_product(
    pool: web::Data<PgPool>,
    auth: RequestAuth,
    payload: web::Json<ProductRequest>,
) -> Result<HttpResponse, ApiError> {
    let admin = auth.require(UserRole::Admin)?;
    let name = non_blank("Name", &payload.name)?;
    let category_ids = dedup_ids(&payload.category_ids);

    let mut tx = pool.begin().await?;

    let summary = sqlx::query_as::<_, ProductSummary>(
        "INSERT INTO products (name) VALUES ($1) RETURNING id, name",
    )
    .bind(&name)
    .fetch_one(&mut *tx)
    .await?;

    link_categories(&mut tx, summary.id, &category_ids).await?;
    let links = links_for_products(&mut *tx, &[summary.id]).await?;

    tx.commit().await?;

    info!("Product {} created by user {}", summary.id, admin.id);
    Ok(HttpResponse::Ok().json(Product::from_summary(summary, &links)))
}

//Update Product
//Update Product Input: Path (/products/{product_id}), ProductRequest
//Update Product Output: Product (category set replaced)
pub async fn update_product(
    pool: web::Data<PgPool>,
    auth: RequestAuth,
    path: web::Path<i32>,
    payload: web::Json<ProductRequest>,
) -> Result<HttpResponse, ApiError> {
    let admin = auth.require(UserRole::Admin)?;
    let product_id = path.into_inner();
    let name = non_blank("Name", &payload.name)?;
    let category_ids = dedup_ids(&payload.category_ids);

    let mut tx = pool.begin().await?;

    let summary = sqlx::query_as::<_, ProductSummary>(
        "UPDATE products SET name = $1 WHERE id = $2 RETURNING id, name",
    )
    .bind(&name)
    .bind(product_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| not_found(product_id))?;

    sqlx::query("DELETE FROM category_product WHERE product_id = $1")
        .bind(product_id)
        .execute(&mut *tx)
        .await?;
    link_categories(&mut tx, product_id, &category_ids).await?;
    let links = links_for_products(&mut *tx, &[product_id]).await?;

    tx.commit().await?;

    info!("Product {} updated by user {}", product_id, admin.id);
    Ok(HttpResponse::Ok().json(Product::from_summary(summary, &links)))
}

//Delete Product
//Delete Product Input: Path (/products/{product_id})
//Delete Product Output: Product (as it was before deletion)
pub async fn delete_product(
    pool: web::Data<PgPool>,
    auth: RequestAuth,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let admin = auth.require(UserRole::Admin)?;
    let product_id = path.into_inner();

    let mut tx = pool.begin().await?;

    let links = links_for_products(&mut *tx, &[product_id]).await?;

    sqlx::query("DELETE FROM category_product WHERE product_id = $1")
        .bind(product_id)
        .execute(&mut *tx)
        .await?;

    let summary = sqlx::query_as::<_, ProductSummary>(
        "DELETE FROM products WHERE id = $1 RETURNING id, name",
    )
    .bind(product_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| not_found(product_id))?;

    tx.commit().await?;

    info!("Product {} deleted by user {}", product_id, admin.id);
    Ok(HttpResponse::Ok().json(Product::from_summary(summary, &links)))
}

//Config Product Routes
// GET /products
// POST /products
// PUT /products/{product_id}
// DELETE /products/{product_id}
pub fn config_product_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/products")
            .route("", web::get().to(get_products))
            .route("", web::post().to(create_product))
            .route("/{product_id}", web::put().to(update_product))
            .route("/{product_id}", web::delete().to(delete_product)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::auth::{IdentityClaims, TokenCodec};
    use crate::routes::test_support::{bearer_for, test_app, SECRET};
    use actix_web::http::{header::AUTHORIZATION, StatusCode};
    use actix_web::test;
    use chrono::{Duration, Utc};
    use serde_json::json;

    #[actix_web::test]
    async fn request_body_uses_camel_case_ids() {
        let request: ProductRequest =
            serde_json::from_value(json!({"name": "Saw", "categoryIds": [1, 2]})).unwrap();
        assert_eq!(request.category_ids, vec![1, 2]);
    }

    #[actix_web::test]
    async fn expired_admin_token_is_rejected_with_session_message() {
        let app = test_app!(config_product_routes);
        let admin = IdentityClaims {
            id: 1,
            email: "admin@x.com".to_string(),
            role: UserRole::Admin,
        };
        let token = TokenCodec::new(SECRET)
            .encode_at(&admin, Utc::now() - Duration::hours(3))
            .unwrap();

        let req = test::TestRequest::post()
            .uri("/products")
            .insert_header((AUTHORIZATION, format!("Bearer {token}")))
            .set_json(json!({"name": "Saw", "categoryIds": [1]}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Your session expired. Sign in again.");
    }

    #[actix_web::test]
    async fn token_signed_with_other_secret_is_rejected() {
        let app = test_app!(config_product_routes);
        let admin = IdentityClaims {
            id: 1,
            email: "admin@x.com".to_string(),
            role: UserRole::Admin,
        };
        let token = TokenCodec::new("someone-else").encode(&admin).unwrap();

        let req = test::TestRequest::delete()
            .uri("/products/9")
            .insert_header((AUTHORIZATION, format!("Bearer {token}")))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn user_role_cannot_update() {
        let app = test_app!(config_product_routes);
        let req = test::TestRequest::put()
            .uri("/products/9")
            .insert_header((AUTHORIZATION, bearer_for(UserRole::User)))
            .set_json(json!({"name": "Saw", "categoryIds": []}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
