use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{CartDocument, CartRepository, Result, UserId};

/// PostgreSQL-backed cart repository.
///
/// Each cart is one row in `carts`, keyed by `user_id`, with the full
/// document stored as JSONB.
#[derive(Clone)]
pub struct PostgresCartRepository {
    pool: PgPool,
}

impl PostgresCartRepository {
    /// Creates a new PostgreSQL cart repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_document(row: PgRow) -> Result<CartDocument> {
        let document: serde_json::Value = row.try_get("document")?;
        Ok(serde_json::from_value(document)?)
    }

    async fn find(&self, user_id: &UserId) -> Result<Option<CartDocument>> {
        let row: Option<PgRow> = sqlx::query("SELECT document FROM carts WHERE user_id = $1")
            .bind(user_id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_document).transpose()
    }
}

#[async_trait]
impl CartRepository for PostgresCartRepository {
    async fn fetch(&self, user_id: &UserId) -> Result<CartDocument> {
        if let Some(doc) = self.find(user_id).await? {
            return Ok(doc);
        }

        // DO NOTHING on conflict: a concurrent writer may have created the
        // cart since the read above, and its contents win.
        let doc = CartDocument::empty(user_id.clone());
        let inserted: Option<PgRow> = sqlx::query(
            r#"
            INSERT INTO carts (user_id, document, last_updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO NOTHING
            RETURNING document
            "#,
        )
        .bind(user_id.as_str())
        .bind(serde_json::to_value(&doc)?)
        .bind(doc.last_updated_at)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = inserted {
            tracing::debug!(%user_id, "created empty cart");
            return Self::row_to_document(row);
        }

        // Lost the insert race. The winner's row may itself have been
        // cleared since, in which case the cart is empty.
        Ok(self.find(user_id).await?.unwrap_or(doc))
    }

    async fn save(&self, document: &mut CartDocument) -> Result<()> {
        let previous = document.last_updated_at;
        document.touch();

        let result: Result<()> = async {
            let json = serde_json::to_value(&*document)?;
            sqlx::query(
                r#"
                INSERT INTO carts (user_id, document, last_updated_at)
                VALUES ($1, $2, $3)
                ON CONFLICT (user_id) DO UPDATE SET
                    document = EXCLUDED.document,
                    last_updated_at = EXCLUDED.last_updated_at
                "#,
            )
            .bind(document.user_id.as_str())
            .bind(json)
            .bind(document.last_updated_at)
            .execute(&self.pool)
            .await?;
            Ok(())
        }
        .await;

        if result.is_err() {
            document.last_updated_at = previous;
        }
        result
    }

    async fn clear(&self, user_id: &UserId) -> Result<()> {
        let removed = sqlx::query("DELETE FROM carts WHERE user_id = $1")
            .bind(user_id.as_str())
            .execute(&self.pool)
            .await?
            .rows_affected();

        tracing::debug!(%user_id, removed, "cleared cart");
        Ok(())
    }
}
