//! Account documents: one JSON object per account id.
//!
//! Writes merge at the top level. A key present in the incoming fields
//! replaces the stored value outright; keys it does not mention are kept.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::{Map, Value};
use sqlx::{PgPool, Row};

/// Top-level document body.
pub type Body = Map<String, Value>;

/// A stored account document.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub account_id: String,
    pub body: Body,
    pub updated_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredDocument {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> std::result::Result<Self, sqlx::Error> {
        let body = match row.try_get::<Value, _>("body")? {
            Value::Object(body) => body,
            _ => Body::new(),
        };
        Ok(StoredDocument {
            account_id: row.try_get("account_id")?,
            body,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn get(&self, account_id: &str) -> Result<Option<StoredDocument>>;

    /// Merge `fields` into the document, creating it when missing.
    async fn merge(&self, account_id: &str, fields: Body, updated_at: DateTime<Utc>) -> Result<()>;

    /// Remove the document. Returns whether one existed.
    async fn delete(&self, account_id: &str) -> Result<bool>;
}

/// PostgreSQL-backed documents.
#[derive(Debug, Clone)]
pub struct PgDocuments {
    pool: PgPool,
}

impl PgDocuments {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentRepository for PgDocuments {
    async fn get(&self, account_id: &str) -> Result<Option<StoredDocument>> {
        let document = sqlx::query_as::<_, StoredDocument>(
            r#"
            SELECT account_id, body, updated_at
            FROM documents
            WHERE account_id = $1
            "#,
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(document)
    }

    async fn merge(&self, account_id: &str, fields: Body, updated_at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (account_id, body, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (account_id) DO UPDATE SET
                body = documents.body || EXCLUDED.body,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(account_id)
        .bind(Value::Object(fields))
        .bind(updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, account_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE account_id = $1")
            .bind(account_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// In-process documents, for tests and local development.
#[derive(Debug, Default)]
pub struct MemoryDocuments {
    documents: DashMap<String, StoredDocument>,
}

impl MemoryDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait]
impl DocumentRepository for MemoryDocuments {
    async fn get(&self, account_id: &str) -> Result<Option<StoredDocument>> {
        Ok(self.documents.get(account_id).map(|entry| entry.clone()))
    }

    async fn merge(&self, account_id: &str, fields: Body, updated_at: DateTime<Utc>) -> Result<()> {
        let mut entry = self
            .documents
            .entry(account_id.to_string())
            .or_insert_with(|| StoredDocument {
                account_id: account_id.to_string(),
                body: Body::new(),
                updated_at,
            });
        entry.body.extend(fields);
        entry.updated_at = updated_at;
        Ok(())
    }

    async fn delete(&self, account_id: &str) -> Result<bool> {
        Ok(self.documents.remove(account_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> Body {
        value.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn merge_replaces_named_keys_only() {
        let documents = MemoryDocuments::new();
        let first = Utc::now();
        documents
            .merge(
                "acct-1",
                body(json!({"workouts": [{"id": "w1"}], "goals": {"weeklyWorkouts": 3}})),
                first,
            )
            .await
            .unwrap();

        let later = first + chrono::Duration::seconds(5);
        documents
            .merge("acct-1", body(json!({"workouts": []})), later)
            .await
            .unwrap();

        let stored = documents.get("acct-1").await.unwrap().unwrap();
        assert_eq!(stored.body["workouts"], json!([]));
        assert_eq!(stored.body["goals"]["weeklyWorkouts"], json!(3));
        assert_eq!(stored.updated_at, later);
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let documents = MemoryDocuments::new();
        assert!(!documents.delete("acct-1").await.unwrap());

        documents
            .merge("acct-1", Body::new(), Utc::now())
            .await
            .unwrap();
        assert_eq!(documents.len(), 1);
        assert!(documents.delete("acct-1").await.unwrap());
        assert!(documents.is_empty());
        assert_eq!(documents.get("acct-1").await.unwrap(), None);
    }
}
