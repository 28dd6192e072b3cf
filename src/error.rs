//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore del workflow di ottimizzazione.
//!
//! ## Responsabilità:
//! - Definisce `OptimizeError` enum per categorizzare tutti gli errori possibili
//! - Fornisce messaggi di errore descrittivi, usati direttamente nei log
//! - Integra con `thiserror` per automatic error conversion
//!
//! ## Categorie di errori:
//! - `MissingApiKey`, `Config`: errori di configurazione
//! - `SourceUnavailable`: file sorgente mancante o non leggibile
//! - `ServiceFailure`, `PollExhausted`, `MalformedResponse`: errori del servizio remoto
//! - `Transport`: qualsiasi errore durante le chiamate HTTP
//! - `MissingOptimizedUrl`, `EmptyDownload`: errori sul contenuto scaricato
//! - `Write`, `Io`: errori di scrittura locale
//!
//! ## Propagazione:
//! Nessuno di questi errori è fatale: il workflow li converte tutti in un
//! messaggio di log e lascia il file originale al suo posto.
//!
//! ## Esempio:
//! ```ignore
//! if api_key.trim().is_empty() {
//!     return Err(OptimizeError::MissingApiKey);
//! }
//! ```

use std::path::PathBuf;

/// Custom error types for the optimize-and-replace workflow
#[derive(thiserror::Error, Debug)]
pub enum OptimizeError {
    #[error("Missing API key")]
    MissingApiKey,

    #[error("Source file missing or unreadable: {}", .0.display())]
    SourceUnavailable(PathBuf),

    #[error("Optimization failed or not ready: code {code}, message {message}")]
    ServiceFailure { code: i64, message: String },

    #[error("Optimization failed or not ready: still pending after {attempts} polls, message {message}")]
    PollExhausted { attempts: u32, message: String },

    #[error("Malformed service response: {0}")]
    MalformedResponse(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Missing optimized URL")]
    MissingOptimizedUrl,

    #[error("Empty downloaded content from {0}")]
    EmptyDownload(String),

    #[error("Failed to write optimized file {}: {}", .path.display(), .source)]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl OptimizeError {
    /// Wraps any displayable transport failure
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    /// Wraps an I/O failure on the final write path
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }
}
