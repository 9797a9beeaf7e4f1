//! Document handlers - read, merge and delete an account's document.

use crate::db::{Body, DocumentRepository};
use crate::error::{AppError, Result};
use serde::Serialize;
use serde_json::Value;
use stride_engine::{format_timestamp, Clock, Collection};

/// Field stamped with server time on every write.
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// Longest accepted account id.
pub const MAX_ACCOUNT_ID_LEN: usize = 128;

/// Response for a successful merge.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MergeResponse {
    pub account_id: String,
    pub updated_at: String,
}

/// Reject ids that cannot name an account.
pub fn validate_account_id(account_id: &str) -> Result<()> {
    if account_id.trim().is_empty() {
        return Err(AppError::InvalidAccountId("must not be empty".into()));
    }
    if account_id.chars().count() > MAX_ACCOUNT_ID_LEN {
        return Err(AppError::InvalidAccountId(format!(
            "longer than {MAX_ACCOUNT_ID_LEN} characters"
        )));
    }
    if account_id.chars().any(char::is_control) {
        return Err(AppError::InvalidAccountId(
            "contains control characters".into(),
        ));
    }
    Ok(())
}

/// Load the stored document, with `updatedAt` reflecting the last write.
pub async fn fetch_document(documents: &dyn DocumentRepository, account_id: &str) -> Result<Body> {
    validate_account_id(account_id)?;

    let stored = documents
        .get(account_id)
        .await?
        .ok_or_else(|| AppError::DocumentNotFound(account_id.to_string()))?;

    let mut body = stored.body;
    body.insert(
        UPDATED_AT_FIELD.to_string(),
        Value::String(format_timestamp(stored.updated_at)),
    );
    Ok(body)
}

/// Merge `fields` into the account's document at top level.
pub async fn merge_document(
    documents: &dyn DocumentRepository,
    clock: &dyn Clock,
    account_id: &str,
    fields: Value,
) -> Result<MergeResponse> {
    validate_account_id(account_id)?;

    let Value::Object(mut fields) = fields else {
        return Err(AppError::NotAnObject);
    };

    let known = fields
        .keys()
        .filter(|key| Collection::from_name(key).is_some())
        .count();
    if known < fields.len() {
        tracing::debug!(
            account_id = %account_id,
            unknown = fields.len() - known,
            "merging fields outside the known collections"
        );
    }

    let now = clock.now();
    let updated_at = format_timestamp(now);
    fields.insert(
        UPDATED_AT_FIELD.to_string(),
        Value::String(updated_at.clone()),
    );

    documents.merge(account_id, fields, now).await?;
    tracing::info!(account_id = %account_id, collections = known, "document merged");

    Ok(MergeResponse {
        account_id: account_id.to_string(),
        updated_at,
    })
}

/// Remove the account's document. Deleting a missing document succeeds.
pub async fn delete_document(documents: &dyn DocumentRepository, account_id: &str) -> Result<()> {
    validate_account_id(account_id)?;

    let existed = documents.delete(account_id).await?;
    tracing::info!(account_id = %account_id, existed, "document deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDocuments;
    use serde_json::json;
    use stride_engine::ManualClock;

    fn clock() -> ManualClock {
        ManualClock::at("2026-02-01T14:00:00Z").unwrap()
    }

    #[test]
    fn account_ids() {
        assert!(validate_account_id("acct-1").is_ok());
        assert!(validate_account_id("user@example.com").is_ok());
        assert!(matches!(
            validate_account_id(""),
            Err(AppError::InvalidAccountId(_))
        ));
        assert!(validate_account_id("   ").is_err());
        assert!(validate_account_id("a\nb").is_err());
        assert!(validate_account_id(&"x".repeat(MAX_ACCOUNT_ID_LEN + 1)).is_err());
    }

    #[tokio::test]
    async fn merge_stamps_server_time() {
        let documents = MemoryDocuments::new();
        let response = merge_document(
            &documents,
            &clock(),
            "acct-1",
            json!({"workouts": [], "updatedAt": "1999-01-01T00:00:00.000Z"}),
        )
        .await
        .unwrap();

        assert_eq!(
            response,
            MergeResponse {
                account_id: "acct-1".into(),
                updated_at: "2026-02-01T14:00:00.000Z".into(),
            }
        );
        let body = fetch_document(&documents, "acct-1").await.unwrap();
        assert_eq!(body["updatedAt"], json!("2026-02-01T14:00:00.000Z"));
        assert_eq!(body["workouts"], json!([]));
    }

    #[tokio::test]
    async fn merge_rejects_non_objects() {
        let documents = MemoryDocuments::new();
        for body in [json!([1, 2]), json!("text"), json!(null)] {
            let err = merge_document(&documents, &clock(), "acct-1", body)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::NotAnObject));
        }
        assert!(documents.is_empty());
    }

    #[tokio::test]
    async fn missing_documents() {
        let documents = MemoryDocuments::new();
        assert!(matches!(
            fetch_document(&documents, "nobody").await,
            Err(AppError::DocumentNotFound(_))
        ));
        assert!(delete_document(&documents, "nobody").await.is_ok());
    }
}
