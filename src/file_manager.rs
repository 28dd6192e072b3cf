//! # File Management Module
//!
//! Questo modulo gestisce tutte le operazioni sui file e la discovery delle immagini.
//!
//! ## Responsabilità:
//! - Definisce il trait `FileService` usato dal workflow
//! - Implementazione locale `LocalFileService` (tokio::fs + tempfile)
//! - Discovery ricorsiva di immagini in directory
//! - Utilità per dimensioni e percentuali
//!
//! ## Operazioni sui file:
//! - `is_readable()`: Controlla esistenza e leggibilità
//! - `len()` / `read()`: Dimensione e contenuto
//! - `write_temp()`: Scrive i byte in un file temporaneo con nome univoco
//! - `copy_over()`: Copia sovrascrivendo il target
//! - `delete()`: Rimuove il file temporaneo
//!
//! ## Sicurezza operazioni:
//! - Il target non viene mai scritto in streaming: prima il temp, poi la copia
//! - Il temp file ha nome univoco, invocazioni concorrenti non collidono
//!
//! ## Esempio:
//! ```ignore
//! let files = LocalFileService::new(std::env::temp_dir());
//! let temp = files.write_temp(&bytes).await?;
//! let copied = files.copy_over(&temp, &target).await;
//! files.delete(&temp).await?;
//! copied?;
//! ```

use crate::error::OptimizeError;
use async_trait::async_trait;
use image::ImageFormat;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::fs;
use walkdir::WalkDir;

/// Filesystem operations the workflow needs
#[async_trait]
pub trait FileService: Send + Sync {
    /// True when the path is an existing, readable regular file
    async fn is_readable(&self, path: &Path) -> bool;

    async fn len(&self, path: &Path) -> Result<u64, OptimizeError>;

    async fn read(&self, path: &Path) -> Result<Vec<u8>, OptimizeError>;

    /// Writes `bytes` to a uniquely named file in the scoped temp location
    async fn write_temp(&self, bytes: &[u8]) -> Result<PathBuf, OptimizeError>;

    /// Copies `from` over `to`, replacing any existing content
    async fn copy_over(&self, from: &Path, to: &Path) -> Result<(), OptimizeError>;

    async fn delete(&self, path: &Path) -> Result<(), OptimizeError>;
}

/// Local filesystem implementation
#[derive(Debug, Clone)]
pub struct LocalFileService {
    temp_dir: PathBuf,
}

impl LocalFileService {
    pub fn new(temp_dir: PathBuf) -> Self {
        Self { temp_dir }
    }
}

impl Default for LocalFileService {
    fn default() -> Self {
        Self::new(std::env::temp_dir())
    }
}

#[async_trait]
impl FileService for LocalFileService {
    async fn is_readable(&self, path: &Path) -> bool {
        match fs::metadata(path).await {
            Ok(metadata) if metadata.is_file() => fs::File::open(path).await.is_ok(),
            _ => false,
        }
    }

    async fn len(&self, path: &Path) -> Result<u64, OptimizeError> {
        Ok(fs::metadata(path).await?.len())
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>, OptimizeError> {
        Ok(fs::read(path).await?)
    }

    async fn write_temp(&self, bytes: &[u8]) -> Result<PathBuf, OptimizeError> {
        let temp_dir = self.temp_dir.clone();
        let bytes = bytes.to_vec();

        // tempfile è sincrono: lo spostiamo fuori dal runtime
        tokio::task::spawn_blocking(move || -> Result<PathBuf, OptimizeError> {
            let mut file = tempfile::Builder::new()
                .prefix("optimized-")
                .suffix(".tmp")
                .tempfile_in(&temp_dir)
                .map_err(|e| OptimizeError::write(&temp_dir, e))?;
            file.write_all(&bytes)
                .and_then(|_| file.flush())
                .map_err(|e| OptimizeError::write(file.path(), e))?;
            // Da qui in poi la rimozione spetta al chiamante (delete)
            file.into_temp_path()
                .keep()
                .map_err(|e| OptimizeError::write(&temp_dir, e.error))
        })
        .await
        .map_err(|e| OptimizeError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?
    }

    async fn copy_over(&self, from: &Path, to: &Path) -> Result<(), OptimizeError> {
        fs::copy(from, to)
            .await
            .map(|_| ())
            .map_err(|e| OptimizeError::write(to, e))
    }

    async fn delete(&self, path: &Path) -> Result<(), OptimizeError> {
        Ok(fs::remove_file(path).await?)
    }
}

/// Find all image files under a directory, sorted for stable ordering
pub fn find_image_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|path| is_image(path))
        .collect();
    files.sort();
    files
}

/// Check if a path looks like an image, by extension
pub fn is_image(path: &Path) -> bool {
    ImageFormat::from_path(path).is_ok()
}

/// Get human-readable file size
pub fn format_size(size: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = size as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", size as u64, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

/// Calculate percentage reduction
pub fn calculate_reduction(original_size: u64, new_size: u64) -> f64 {
    if original_size == 0 {
        0.0
    } else {
        ((original_size as f64 - new_size as f64) / original_size as f64) * 100.0
    }
}
