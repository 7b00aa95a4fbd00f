use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
    Json,
};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use tracing::warn;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::{AppError, FieldError};

/// JSON body that has passed `validator` checks.
///
/// Malformed JSON and failed validation are both 400s; the latter carries one
/// entry per offending field.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| {
                warn!(reason = %rejection.body_text(), "rejected request body");
                AppError::BadRequest(rejection.body_text())
            })?;

        value.validate().map_err(|errors| {
            let fields = field_errors(&errors);
            warn!(?fields, "validation failed");
            AppError::Validation(fields)
        })?;

        Ok(Self(value))
    }
}

/// Path parameters whose parse failures come back as JSON 400s.
pub struct ValidatedPath<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ValidatedPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                warn!(reason = %rejection.body_text(), "rejected path parameters");
                AppError::BadRequest(rejection.body_text())
            })?;
        Ok(Self(value))
    }
}

pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out: Vec<FieldError> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| FieldError {
                field: field.to_string(),
                message: e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| match e.code.as_ref() {
                        "email" => "Invalid email format".to_string(),
                        "length" => "Invalid length".to_string(),
                        "range" => "Value out of range".to_string(),
                        _ => format!("Invalid {field}"),
                    }),
            })
        })
        .collect();
    out.sort_by(|a, b| a.field.cmp(&b.field));
    out
}

/// Prices are stored as `NUMERIC(12, 2)`.
const MAX_PRICE_EXCLUSIVE: i64 = 10_000_000_000;
const PRICE_SCALE: u32 = 2;

pub fn non_negative_price(price: &Decimal) -> Result<(), ValidationError> {
    let out_of_range = |msg: &'static str| {
        Err(ValidationError::new("range").with_message(Cow::Borrowed(msg)))
    };
    if price.is_sign_negative() && !price.is_zero() {
        return out_of_range("price must be a non-negative number");
    }
    if *price >= Decimal::from(MAX_PRICE_EXCLUSIVE) {
        return out_of_range("price must be less than 10000000000");
    }
    if price.normalize().scale() > PRICE_SCALE {
        return out_of_range("price must have at most two decimal places");
    }
    Ok(())
}
