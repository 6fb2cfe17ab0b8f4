//! Cliente de integraciones de IA del backend
//!
//! Subida de ficheros, extracción estructurada desde un fichero subido y
//! llamada directa al LLM con esquema de respuesta.

use async_trait::async_trait;
use reqwest::{multipart, Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::BackendConfig;

/// Errores de la integración de IA
#[derive(Error, Debug)]
pub enum AiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("AI integration responded {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

/// Resultado de `ExtractDataFromUploadedFile`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractionResult {
    pub status: String,
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub details: Option<String>,
}

impl ExtractionResult {
    pub fn is_success(&self) -> bool {
        self.status == "success" && self.output.is_some()
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file_url: String,
}

/// Contrato de la integración de IA
#[async_trait]
pub trait AiIntegration: Send + Sync {
    async fn upload_file(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, AiError>;

    async fn extract_data(&self, file_url: &str, json_schema: &Value) -> Result<ExtractionResult, AiError>;

    async fn invoke_llm(&self, prompt: &str, response_json_schema: &Value) -> Result<Value, AiError>;
}

pub struct AiIntegrationClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl AiIntegrationClient {
    pub fn new(config: &BackendConfig) -> Result<Self, AiError> {
        let client = Client::builder().timeout(config.ai_timeout).build()?;
        Ok(Self::with_client(client, config.app_url(), config.api_key.clone()))
    }

    pub fn with_client(client: Client, app_url: String, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: format!("{}/integration-endpoints/Core", app_url),
            api_key,
        }
    }

    fn post(&self, endpoint: &str) -> RequestBuilder {
        let builder = self.client.post(format!("{}/{}", self.base_url, endpoint));
        match &self.api_key {
            Some(key) => builder.header("api_key", key),
            None => builder,
        }
    }

    async fn execute<T: serde::de::DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        endpoint: &str,
    ) -> Result<T, AiError> {
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                AiError::Timeout(endpoint.to_string())
            } else {
                AiError::Http(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body: Value = response.json().await?;
        serde_json::from_value(body.clone())
            .map_err(|e| AiError::UnexpectedResponse(format!("{}: {} ({})", endpoint, e, body)))
    }
}

#[async_trait]
impl AiIntegration for AiIntegrationClient {
    async fn upload_file(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, AiError> {
        info!("📤 A enviar ficheiro '{}' ({} bytes)", file_name, bytes.len());
        let part = multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = multipart::Form::new().part("file", part);
        let response: UploadResponse = self
            .execute(self.post("UploadFile").multipart(form), "UploadFile")
            .await?;
        Ok(response.file_url)
    }

    async fn extract_data(&self, file_url: &str, json_schema: &Value) -> Result<ExtractionResult, AiError> {
        debug!("🔎 Extracção estruturada de {}", file_url);
        let body = json!({ "file_url": file_url, "json_schema": json_schema });
        self.execute(
            self.post("ExtractDataFromUploadedFile").json(&body),
            "ExtractDataFromUploadedFile",
        )
        .await
    }

    async fn invoke_llm(&self, prompt: &str, response_json_schema: &Value) -> Result<Value, AiError> {
        let body = json!({ "prompt": prompt, "response_json_schema": response_json_schema });
        self.execute(self.post("InvokeLLM").json(&body), "InvokeLLM").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_result_success() {
        let ok = ExtractionResult {
            status: "success".to_string(),
            output: Some(json!({"serie": "A1"})),
            details: None,
        };
        assert!(ok.is_success());

        let failed: ExtractionResult =
            serde_json::from_value(json!({"status": "error", "details": "ilegível"})).unwrap();
        assert!(!failed.is_success());
        assert_eq!(failed.details.as_deref(), Some("ilegível"));
    }
}
