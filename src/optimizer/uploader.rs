//! # Uploader
//!
//! Invio multipart del file sorgente all'endpoint di upload.
//!
//! Campi fissi: `plugin_version`, `wait=30`, `convertto=+avif|+webp`,
//! `refresh=0` e `file_paths`, la mappa JSON `campo -> path originale`
//! che il servizio usa per riportare il nome corretto del file.

use crate::{
    error::OptimizeError,
    optimizer::request::{OptimizationRequest, CLIENT_TAG, UPLOAD_TIMEOUT, UPLOAD_WAIT_SECS},
    response::OptimizationResult,
    service::{HttpService, MultipartUpload},
};
use std::collections::BTreeMap;
use tracing::debug;

/// Name of the multipart field carrying the image
pub const FILE_FIELD: &str = "file1";

/// Also produce AVIF and WebP variants
const CONVERT_TO: &str = "+avif|+webp";

/// Builds the multipart form for one source file
pub fn build_upload(
    request: &OptimizationRequest,
    file_bytes: Vec<u8>,
) -> Result<MultipartUpload, OptimizeError> {
    let source = request.source_path.to_string_lossy().to_string();
    let file_name = request
        .source_path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .ok_or_else(|| OptimizeError::SourceUnavailable(request.source_path.clone()))?;

    let mut file_paths = BTreeMap::new();
    file_paths.insert(FILE_FIELD, source);
    // serde_json non fa escape degli slash
    let file_paths = serde_json::to_string(&file_paths)
        .map_err(|e| OptimizeError::Config(e.to_string()))?;

    let fields = vec![
        ("key".to_string(), request.api_key.clone()),
        ("plugin_version".to_string(), CLIENT_TAG.to_string()),
        ("lossy".to_string(), request.compression_mode.api_value().to_string()),
        ("wait".to_string(), UPLOAD_WAIT_SECS.to_string()),
        ("convertto".to_string(), CONVERT_TO.to_string()),
        ("refresh".to_string(), "0".to_string()),
        ("file_paths".to_string(), file_paths),
    ];

    Ok(MultipartUpload {
        fields,
        file_field: FILE_FIELD.to_string(),
        file_name,
        file_bytes,
    })
}

/// Uploads the file and returns the first result of the response array
pub async fn upload<H>(
    http: &H,
    endpoint: &str,
    request: &OptimizationRequest,
    file_bytes: Vec<u8>,
) -> Result<OptimizationResult, OptimizeError>
where
    H: HttpService + ?Sized,
{
    let form = build_upload(request, file_bytes)?;
    let body = http.post_multipart(endpoint, form, UPLOAD_TIMEOUT).await?;
    let result = OptimizationResult::from_body(&body)?;

    debug!(
        "Upload response for {}: code {} ({})",
        request.source_path.display(),
        result.status.code,
        result.status.message
    );
    Ok(result)
}
