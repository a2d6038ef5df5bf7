use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{Product, ProductRow};
use crate::error::RepoError;

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn create(&self, product: &Product) -> Result<(), RepoError>;
    async fn find_by_barcode(&self, barcode: &str) -> Result<Product, RepoError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Product, RepoError>;
    async fn update(&self, product: &Product) -> Result<(), RepoError>;
}

const PRODUCT_COLUMNS: &str = r#"
    id, barcode, name, brand, image_url, source, nutrients, serving_size,
    nutri_score, nutri_score_value, highlights, insights, created_at, updated_at
"#;

#[derive(Clone)]
pub struct PgProductRepository {
    db: PgPool,
}

impl PgProductRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn create(&self, p: &Product) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO products (
                id, barcode, name, brand, image_url, source, nutrients, serving_size,
                nutri_score, nutri_score_value, highlights, insights, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(p.id)
        .bind(&p.barcode)
        .bind(&p.name)
        .bind(&p.brand)
        .bind(&p.image_url)
        .bind(p.source.as_str())
        .bind(Json(&p.nutrients))
        .bind(&p.serving_size)
        .bind(p.nutri_score.map(|g| g.as_str()))
        .bind(p.nutri_score_value)
        .bind(Json(&p.highlights))
        .bind(Json(&p.insights))
        .bind(p.created_at)
        .bind(p.updated_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn find_by_barcode(&self, barcode: &str) -> Result<Product, RepoError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE barcode = $1");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(barcode)
            .fetch_optional(&self.db)
            .await?
            .ok_or(RepoError::NotFound)?;
        Product::try_from(row)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Product, RepoError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or(RepoError::NotFound)?;
        Product::try_from(row)
    }

    async fn update(&self, p: &Product) -> Result<(), RepoError> {
        let result = sqlx::query(
            r#"
            UPDATE products
               SET name = $2, brand = $3, image_url = $4, source = $5, nutrients = $6,
                   serving_size = $7, nutri_score = $8, nutri_score_value = $9,
                   highlights = $10, insights = $11, updated_at = now()
             WHERE id = $1
            "#,
        )
        .bind(p.id)
        .bind(&p.name)
        .bind(&p.brand)
        .bind(&p.image_url)
        .bind(p.source.as_str())
        .bind(Json(&p.nutrients))
        .bind(&p.serving_size)
        .bind(p.nutri_score.map(|g| g.as_str()))
        .bind(p.nutri_score_value)
        .bind(Json(&p.highlights))
        .bind(Json(&p.insights))
        .execute(&self.db)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
