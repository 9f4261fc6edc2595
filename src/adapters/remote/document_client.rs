use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::{
    application::{dto::SaveJsonRequest, ports::DocumentRepository},
    domain::{
        document::DocumentKind,
        errors::{DomainError, DomainResult},
    },
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Documentos de otro panel: lectura por `GET /<fichero>` y escritura por
/// `POST /api/save-json`.
#[derive(Clone)]
pub struct HttpDocumentRepository {
    http: Client,
    base_url: String,
}

impl HttpDocumentRepository {
    pub fn new(base_url: impl Into<String>) -> DomainResult<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DomainError::OperationFailed(format!("cliente HTTP: {e}")))?;
        Ok(Self { http, base_url: base_url.into().trim_end_matches('/').to_string() })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

fn transport(e: reqwest::Error) -> DomainError {
    DomainError::OperationFailed(e.to_string())
}

#[async_trait]
impl DocumentRepository for HttpDocumentRepository {
    async fn load(&self, kind: DocumentKind) -> DomainResult<Value> {
        let url = self.url(kind.filename());
        debug!("GET {url}");
        let res = self.http.get(&url).send().await.map_err(transport)?;
        let status = res.status();
        if !status.is_success() {
            warn!("GET {url} -> {status}");
            return Err(match status.as_u16() {
                404 => DomainError::NotFound(url),
                _ => DomainError::OperationFailed(format!("{url}: {status}")),
            });
        }
        res.json::<Value>()
            .await
            .map_err(|e| DomainError::InvalidInput(format!("{url}: {e}")))
    }

    async fn save(&self, filename: &str, data: &Value) -> DomainResult<()> {
        let url = self.url("api/save-json");
        let res = self
            .http
            .post(&url)
            .json(&SaveJsonRequest { filename: filename.to_string(), data: data.clone() })
            .send()
            .await
            .map_err(transport)?;
        let status = res.status();
        if status.is_success() {
            return Ok(());
        }
        let body: Value = res.json().await.unwrap_or(Value::Null);
        let msg = body["error"].as_str().unwrap_or("Failed to save file").to_string();
        warn!("POST {url} -> {status}: {msg}");
        Err(match status.as_u16() {
            400 => DomainError::InvalidInput(msg),
            _ => DomainError::OperationFailed(msg),
        })
    }
}
