use super::{Document, RemoteDocumentStore};
use crate::RemoteError;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};

/// Client for the `stride-server` document API.
#[derive(Debug, Clone)]
pub struct HttpDocumentStore {
    client: Client,
    base: Url,
    token: Option<String>,
}

impl HttpDocumentStore {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, RemoteError> {
        let base = Url::parse(base_url).map_err(|e| RemoteError::InvalidUrl(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(RemoteError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            client: Client::new(),
            base,
            token,
        })
    }

    /// `{base}/v1/documents/{account_id}`, with the id percent-encoded.
    pub fn document_url(&self, account_id: &str) -> Result<Url, RemoteError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| RemoteError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(["v1", "documents", account_id]);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

fn check_status(response: &Response) -> Result<(), RemoteError> {
    match response.status() {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(RemoteError::PermissionDenied),
        status if !status.is_success() => Err(RemoteError::Status(status.as_u16())),
        _ => Ok(()),
    }
}

#[async_trait]
impl RemoteDocumentStore for HttpDocumentStore {
    async fn get(&self, account_id: &str) -> Result<Option<Document>, RemoteError> {
        let url = self.document_url(account_id)?;
        let response = self.authorize(self.client.get(url)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        check_status(&response)?;

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }

    async fn merge_set(&self, account_id: &str, fields: Document) -> Result<(), RemoteError> {
        let url = self.document_url(account_id)?;
        let response = self
            .authorize(self.client.patch(url))
            .json(&fields)
            .send()
            .await?;
        check_status(&response)?;
        tracing::debug!(account_id = %account_id, "remote document merged");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_urls() {
        let remote = HttpDocumentStore::new("http://localhost:3000", None).unwrap();
        assert_eq!(
            remote.document_url("acct-1").unwrap().as_str(),
            "http://localhost:3000/v1/documents/acct-1"
        );

        let remote = HttpDocumentStore::new("https://sync.example.com/api/", None).unwrap();
        assert_eq!(
            remote.document_url("a/b c").unwrap().as_str(),
            "https://sync.example.com/api/v1/documents/a%2Fb%20c"
        );
    }

    #[test]
    fn rejects_unusable_base() {
        assert!(matches!(
            HttpDocumentStore::new("not a url", None),
            Err(RemoteError::InvalidUrl(_))
        ));
        assert!(matches!(
            HttpDocumentStore::new("mailto:someone@example.com", None),
            Err(RemoteError::InvalidUrl(_))
        ));
    }
}
