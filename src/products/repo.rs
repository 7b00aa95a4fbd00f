use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{NewProduct, Product, ProductPatch};

const COLUMNS: &str =
    "id, farmer_id, name, description, price, stock, image_url, category, created_at";

impl Product {
    pub async fn create(db: &PgPool, new: &NewProduct<'_>) -> anyhow::Result<Product> {
        let sql = format!(
            r#"
            INSERT INTO products (farmer_id, name, description, price, stock, image_url, category)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {COLUMNS}
            "#
        );
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(new.farmer_id)
            .bind(new.name)
            .bind(new.description)
            .bind(new.price)
            .bind(new.stock)
            .bind(new.image_url)
            .bind(new.category)
            .fetch_one(db)
            .await
            .context("insert product")?;
        Ok(product)
    }

    /// All products, newest first.
    pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<Product>> {
        let sql = format!("SELECT {COLUMNS} FROM products ORDER BY created_at DESC");
        let rows = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(db)
            .await
            .context("list products")?;
        Ok(rows)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Product>> {
        let sql = format!("SELECT {COLUMNS} FROM products WHERE id = $1");
        let row = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(db)
            .await
            .context("find product by id")?;
        Ok(row)
    }

    pub async fn list_by_farmer(db: &PgPool, farmer_id: Uuid) -> anyhow::Result<Vec<Product>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM products WHERE farmer_id = $1 ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, Product>(&sql)
            .bind(farmer_id)
            .fetch_all(db)
            .await
            .context("list products by farmer")?;
        Ok(rows)
    }

    /// Applies `patch` with COALESCE so absent fields keep their value.
    /// Returns `None` if the row disappeared in the meantime.
    pub async fn update(
        db: &PgPool,
        id: Uuid,
        patch: &ProductPatch<'_>,
    ) -> anyhow::Result<Option<Product>> {
        let sql = format!(
            r#"
            UPDATE products
            SET name        = COALESCE($1, name),
                description = COALESCE($2, description),
                price       = COALESCE($3, price),
                stock       = COALESCE($4, stock),
                image_url   = COALESCE($5, image_url),
                category    = COALESCE($6, category)
            WHERE id = $7
            RETURNING {COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, Product>(&sql)
            .bind(patch.name)
            .bind(patch.description)
            .bind(patch.price)
            .bind(patch.stock)
            .bind(patch.image_url)
            .bind(patch.category)
            .bind(id)
            .fetch_optional(db)
            .await
            .context("update product")?;
        Ok(row)
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .context("delete product")?;
        Ok(res.rows_affected() > 0)
    }
}
