//! # HTTP Service Module
//!
//! Astrazione del client HTTP usato per parlare con il servizio di ottimizzazione.
//!
//! ## Responsabilità:
//! - Definisce il trait `HttpService` (POST multipart, POST JSON, GET)
//! - Fornisce l'implementazione di produzione `ReqwestHttpService`
//! - Ogni richiesta ha un timeout esplicito
//! - Status HTTP non 2xx diventano `OptimizeError::Transport`
//!
//! Il trait permette di sostituire il client nei test con risposte scriptate.

use crate::error::OptimizeError;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use tracing::debug;

/// Multipart submission: plain text fields plus one file part
#[derive(Debug, Clone)]
pub struct MultipartUpload {
    pub fields: Vec<(String, String)>,
    pub file_field: String,
    pub file_name: String,
    pub file_bytes: Vec<u8>,
}

impl MultipartUpload {
    /// Value of a text field, if present
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// HTTP operations the workflow needs; bodies are returned as raw bytes
#[async_trait]
pub trait HttpService: Send + Sync {
    async fn post_multipart(
        &self,
        url: &str,
        upload: MultipartUpload,
        timeout: Duration,
    ) -> Result<Vec<u8>, OptimizeError>;

    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<Vec<u8>, OptimizeError>;

    async fn get(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, OptimizeError>;
}

/// `HttpService` backed by `reqwest`
#[derive(Clone, Default)]
pub struct ReqwestHttpService {
    client: reqwest::Client,
}

impl ReqwestHttpService {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    async fn read_body(response: reqwest::Response) -> Result<Vec<u8>, OptimizeError> {
        let response = response.error_for_status().map_err(OptimizeError::transport)?;
        let bytes = response.bytes().await.map_err(OptimizeError::transport)?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl HttpService for ReqwestHttpService {
    async fn post_multipart(
        &self,
        url: &str,
        upload: MultipartUpload,
        timeout: Duration,
    ) -> Result<Vec<u8>, OptimizeError> {
        debug!("POST multipart {} ({} bytes)", url, upload.file_bytes.len());

        let mut form = Form::new();
        for (name, value) in upload.fields {
            form = form.text(name, value);
        }
        let part = Part::bytes(upload.file_bytes).file_name(upload.file_name);
        form = form.part(upload.file_field, part);

        let response = self
            .client
            .post(url)
            .multipart(form)
            .timeout(timeout)
            .send()
            .await
            .map_err(OptimizeError::transport)?;
        Self::read_body(response).await
    }

    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<Vec<u8>, OptimizeError> {
        debug!("POST json {}", url);

        let response = self
            .client
            .post(url)
            .json(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(OptimizeError::transport)?;
        Self::read_body(response).await
    }

    async fn get(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, OptimizeError> {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(OptimizeError::transport)?;
        Self::read_body(response).await
    }
}
