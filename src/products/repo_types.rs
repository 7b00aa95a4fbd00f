use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Product listing owned by a farmer.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub farmer_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub image_url: Option<String>,
    pub category: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Product {
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.farmer_id == user_id
    }
}

#[derive(Debug)]
pub struct NewProduct<'a> {
    pub farmer_id: Uuid,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub price: Decimal,
    pub stock: i32,
    pub image_url: Option<&'a str>,
    pub category: Option<&'a str>,
}

/// Partial update; `None` leaves the stored column untouched.
#[derive(Debug, Default)]
pub struct ProductPatch<'a> {
    pub name: Option<&'a str>,
    pub description: Option<&'a str>,
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
    pub image_url: Option<&'a str>,
    pub category: Option<&'a str>,
}
