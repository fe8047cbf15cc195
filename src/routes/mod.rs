pub mod categories;
pub mod products;
pub mod user_auth;
pub mod users;

use crate::errors::ApiError;
use crate::models::all_models::CategoryProductLink;
use sqlx::PgExecutor;

/// Trimmed value of a required text field.
pub(crate) fn non_blank(field: &str, value: &str) -> Result<String, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::BadRequest(format!("{field} cannot be empty")));
    }
    Ok(value.to_string())
}

/// Distinct ids in first-seen order.
pub(crate) fn dedup_ids(ids: &[i32]) -> Vec<i32> {
    let mut seen = Vec::with_capacity(ids.len());
    for id in ids {
        if !seen.contains(id) {
            seen.push(*id);
        }
    }
    seen
}

const LINK_COLUMNS: &str = "
    SELECT cp.category_id, cp.product_id, c.name AS category_name, p.name AS product_name
    FROM category_product cp
    JOIN categories c ON c.id = cp.category_id
    JOIN products p ON p.id = cp.product_id";

pub(crate) async fn links_for_categories<'e>(
    executor: impl PgExecutor<'e>,
    category_ids: &[i32],
) -> Result<Vec<CategoryProductLink>, sqlx::Error> {
    let query = format!("{LINK_COLUMNS} WHERE cp.category_id = ANY($1) ORDER BY cp.product_id");
    sqlx::query_as::<_, CategoryProductLink>(&query)
        .bind(category_ids)
        .fetch_all(executor)
        .await
}

pub(crate) async fn links_for_products<'e>(
    executor: impl PgExecutor<'e>,
    product_ids: &[i32],
) -> Result<Vec<CategoryProductLink>, sqlx::Error> {
    let query = format!("{LINK_COLUMNS} WHERE cp.product_id = ANY($1) ORDER BY cp.category_id");
    sqlx::query_as::<_, CategoryProductLink>(&query)
        .bind(product_ids)
        .fetch_all(executor)
        .await
}
