use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, PublicUser, Role, UnverifiedFarmer, User};

impl User {
    /// Find a user by (normalized) email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, name, phone, address, role,
                   farm_name, location, verified, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    /// Insert a new user. Fails with a unique violation if the email is taken.
    pub async fn create(db: &PgPool, new: &NewUser<'_>) -> Result<PublicUser, sqlx::Error> {
        sqlx::query_as::<_, PublicUser>(
            r#"
            INSERT INTO users (email, password_hash, name, phone, address, role, farm_name, location)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, email, name, role, verified
            "#,
        )
        .bind(new.email)
        .bind(new.password_hash)
        .bind(new.name)
        .bind(new.phone)
        .bind(new.address)
        .bind(new.role)
        .bind(new.farm_name)
        .bind(new.location)
        .fetch_one(db)
        .await
    }

    /// Mark a farmer as verified. `None` when the id is absent or not a farmer.
    pub async fn approve_farmer(db: &PgPool, farmer_id: Uuid) -> anyhow::Result<Option<PublicUser>> {
        let user = sqlx::query_as::<_, PublicUser>(
            r#"
            UPDATE users
            SET verified = TRUE
            WHERE id = $1 AND role = $2
            RETURNING id, email, name, role, verified
            "#,
        )
        .bind(farmer_id)
        .bind(Role::Farmer)
        .fetch_optional(db)
        .await
        .context("approve farmer")?;
        Ok(user)
    }

    pub async fn list_unverified_farmers(db: &PgPool) -> anyhow::Result<Vec<UnverifiedFarmer>> {
        let rows = sqlx::query_as::<_, UnverifiedFarmer>(
            r#"
            SELECT id, email, name, farm_name, location
            FROM users
            WHERE role = $1 AND verified = FALSE
            ORDER BY created_at ASC
            "#,
        )
        .bind(Role::Farmer)
        .fetch_all(db)
        .await
        .context("list unverified farmers")?;
        Ok(rows)
    }
}

/// True when `err` is Postgres rejecting a duplicate key.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}
