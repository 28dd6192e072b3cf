//! # Fetcher / Replacer
//!
//! Scarica la variante scelta e la installa sopra il file target:
//! byte in memoria → file temporaneo univoco → copia con overwrite → delete del temp.
//! Il temp viene rimosso anche quando la copia fallisce.

use crate::{
    error::OptimizeError,
    file_manager::FileService,
    optimizer::request::DOWNLOAD_TIMEOUT,
    service::HttpService,
};
use std::path::Path;
use tracing::{debug, warn};

/// GET the optimized variant; an empty body is an error
pub async fn download<H>(http: &H, url: &str) -> Result<Vec<u8>, OptimizeError>
where
    H: HttpService + ?Sized,
{
    let bytes = http.get(url, DOWNLOAD_TIMEOUT).await?;
    if bytes.is_empty() {
        return Err(OptimizeError::EmptyDownload(url.to_string()));
    }
    debug!("Downloaded {} bytes from {}", bytes.len(), url);
    Ok(bytes)
}

/// Installs `bytes` as the new content of `target`
pub async fn replace<F>(files: &F, target: &Path, bytes: &[u8]) -> Result<(), OptimizeError>
where
    F: FileService + ?Sized,
{
    let temp = files.write_temp(bytes).await?;
    debug!("Staged optimized content at {}", temp.display());

    let copied = files.copy_over(&temp, target).await;

    if let Err(e) = files.delete(&temp).await {
        warn!("Failed to release temporary file {}: {}", temp.display(), e);
    }

    copied
}
