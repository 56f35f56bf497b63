//! HTTP client for the revision gate.
//!
//! [`HttpGate`] holds the connection configuration for one gate endpoint:
//! the base URL (up to and including `/api/v1`) and the bearer token of
//! the signed-in user.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::gate::{
    ClaimRequest, GateError, ProjectGate, RemoteProject, RemoteSummary, UpsertRequest,
    WriteReceipt,
};

/// A reqwest-backed [`ProjectGate`].
pub struct HttpGate {
    base_url: String,
    token: String,
    http: reqwest::Client,
}

impl HttpGate {
    /// Create a gate client.
    ///
    /// * `base_url` - API root, e.g. `https://api.example.com/api/v1`.
    /// * `token`    - bearer token for the signed-in user.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            token: token.into(),
            http: reqwest::Client::new(),
        }
    }

    /// API root this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait]
impl ProjectGate for HttpGate {
    async fn fetch(&self, id: &str) -> Result<RemoteProject, GateError> {
        let response = self
            .http
            .get(self.url(&format!("/projects/{id}")))
            .bearer_auth(&self.token)
            .send()
            .await?;
        decode(response).await
    }

    async fn upsert(&self, id: &str, request: &UpsertRequest) -> Result<WriteReceipt, GateError> {
        let response = self
            .http
            .put(self.url(&format!("/projects/{id}")))
            .bearer_auth(&self.token)
            .json(request)
            .send()
            .await?;
        decode(response).await
    }

    async fn tombstone(
        &self,
        id: &str,
        base_revision: Option<i64>,
    ) -> Result<WriteReceipt, GateError> {
        let mut builder = self
            .http
            .delete(self.url(&format!("/projects/{id}")))
            .bearer_auth(&self.token);
        if let Some(base) = base_revision {
            builder = builder.json(&json!({ "baseRevision": base }));
        }
        let response = builder.send().await?;
        decode(response).await
    }

    async fn list(&self, include_deleted: bool) -> Result<Vec<RemoteSummary>, GateError> {
        let response = self
            .http
            .get(self.url("/projects"))
            .query(&[("includeDeleted", if include_deleted { "1" } else { "0" })])
            .bearer_auth(&self.token)
            .send()
            .await?;
        decode(response).await
    }

    async fn claim(&self, request: &ClaimRequest) -> Result<WriteReceipt, GateError> {
        let response = self
            .http
            .post(self.url("/projects"))
            .bearer_auth(&self.token)
            .json(request)
            .send()
            .await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, GateError> {
    if response.status().is_success() {
        Ok(response.json::<T>().await?)
    } else {
        Err(decode_error(response).await)
    }
}

/// Map an error response onto [`GateError`], reading the body's `code`
/// field to split the two 409 variants apart.
async fn decode_error(response: reqwest::Response) -> GateError {
    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);

    match status {
        StatusCode::UNAUTHORIZED => GateError::Unauthorized,
        StatusCode::NOT_FOUND => GateError::NotFound,
        StatusCode::CONFLICT => {
            if body["code"] == "PROJECT_EXISTS" {
                return GateError::ProjectExists;
            }
            match serde_json::from_value::<RemoteProject>(body["server"].clone()) {
                Ok(server) => GateError::Conflict {
                    server: Box::new(server),
                },
                Err(_) => GateError::Internal("conflict response without a server row".into()),
            }
        }
        StatusCode::BAD_REQUEST => GateError::BadRequest(
            body["error"]
                .as_str()
                .unwrap_or("invalid request")
                .to_string(),
        ),
        _ => GateError::Internal(format!("unexpected status {status}")),
    }
}
