use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use strum_macros::{Display, EnumString};

//  USER & AUTHENTICATION STRUCTS

#[derive(Debug, Serialize, Deserialize, sqlx::Type, Display, EnumString, PartialEq, Eq, Clone, Copy)]
#[sqlx(type_name = "user_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum UserRole {
    Admin,
    User,
}

/// A user row as exposed by the API. The password hash never leaves the database layer.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub role: UserRole,
}

#[derive(Debug, FromRow)]
pub struct UserCredentials {
    pub id: i32,
    pub email: String,
    pub password: String,
    pub role: UserRole,
}

#[derive(Debug, Serialize)]
pub struct AuthPayload {
    pub token: String,
    pub user: User,
}

//  CATALOG

#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
pub struct CategorySummary {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
pub struct ProductSummary {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub products: Vec<ProductSummary>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Product {
    pub id: i32,
    pub name: String,
    pub categories: Vec<CategorySummary>,
}

/// One row of the `category_product` join, carrying the far side's name.
#[derive(Debug, FromRow)]
pub struct CategoryProductLink {
    pub category_id: i32,
    pub product_id: i32,
    pub category_name: String,
    pub product_name: String,
}

impl Category {
    pub fn from_summary(summary: CategorySummary, links: &[CategoryProductLink]) -> Self {
        let products = links
            .iter()
            .filter(|link| link.category_id == summary.id)
            .map(|link| ProductSummary {
                id: link.product_id,
                name: link.product_name.clone(),
            })
            .collect();

        Category {
            id: summary.id,
            name: summary.name,
            products,
        }
    }
}

impl Product {
    pub fn from_summary(summary: ProductSummary, links: &[CategoryProductLink]) -> Self {
        let categories = links
            .iter()
            .filter(|link| link.product_id == summary.id)
            .map(|link| CategorySummary {
                id: link.category_id,
                name: link.category_name.clone(),
            })
            .collect();

        Product {
            id: summary.id,
            name: summary.name,
            categories,
        }
    }
}
