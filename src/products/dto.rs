use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::repo_types::{NewProduct, ProductPatch};
use crate::validation::non_negative_price;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(custom(function = "non_negative_price"))]
    pub price: Decimal,
    #[validate(range(min = 0, message = "stock must be a non-negative integer"))]
    pub stock: i32,
    pub image_url: Option<String>,
    pub category: Option<String>,
}

impl CreateProductRequest {
    /// The owner always comes from the authenticated caller.
    pub fn to_new(&self, farmer_id: Uuid) -> NewProduct<'_> {
        NewProduct {
            farmer_id,
            name: &self.name,
            description: self.description.as_deref(),
            price: self.price,
            stock: self.stock,
            image_url: self.image_url.as_deref(),
            category: self.category.as_deref(),
        }
    }
}

/// Every field optional; provided fields follow the create rules.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(custom(function = "non_negative_price"))]
    pub price: Option<Decimal>,
    #[validate(range(min = 0, message = "stock must be a non-negative integer"))]
    pub stock: Option<i32>,
    pub image_url: Option<String>,
    pub category: Option<String>,
}

impl UpdateProductRequest {
    pub fn as_patch(&self) -> ProductPatch<'_> {
        ProductPatch {
            name: self.name.as_deref(),
            description: self.description.as_deref(),
            price: self.price,
            stock: self.stock,
            image_url: self.image_url.as_deref(),
            category: self.category.as_deref(),
        }
    }
}
