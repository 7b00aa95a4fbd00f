use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use validator::{Validate, ValidationError};

use super::repo_types::{PublicUser, Role};

/// Request body for user registration.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[validate(custom(function = "validate_role"))]
    pub role: String,
    pub farm_name: Option<String>,
    pub location: Option<String>,
}

/// Request body for login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Response returned after a successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: PublicUser,
}

fn validate_role(role: &str) -> Result<(), ValidationError> {
    role.parse::<Role>().map(|_| ()).map_err(|_| {
        ValidationError::new("role")
            .with_message(Cow::Borrowed("Role must be one of: user, farmer, admin"))
    })
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
