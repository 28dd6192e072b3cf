//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con le impostazioni persistite
//! - Definisce `CompressionMode` e la sua mappatura numerica verso il servizio
//! - Fornisce validazione dei parametri di input
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Permette override della API key da variabile d'ambiente
//!
//! ## Parametri di configurazione:
//! - `api_key`: Credenziale del servizio (default: vuota)
//! - `compression_type`: `lossy`, `glossy` o `lossless` (default: `glossy`)
//! - `api_base_url`: URL base del servizio (default: `https://api.shortpixel.com`)
//! - `temp_dir`: Directory per i file temporanei (default: temp di sistema)
//! - `schemes`: Mappa `schema -> directory radice` per gli URI logici
//!
//! ## Validazione:
//! - Controlla che `api_base_url` sia un URL http(s)
//! - Controlla che gli schemi abbiano nome non vuoto e radice assoluta
//! - Una API key vuota NON è un errore di validazione: il workflow la
//!   segnala nei log e lascia il file invariato
//!
//! ## Esempio:
//! ```ignore
//! let config = Config {
//!     api_key: "abc123".to_string(),
//!     compression_type: CompressionMode::Lossy,
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the persisted API key
pub const API_KEY_ENV: &str = "OPTIMIZER_API_KEY";

/// Default base URL of the optimization service
pub const DEFAULT_API_BASE_URL: &str = "https://api.shortpixel.com";

/// Compression level requested from the optimization service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase", from = "Option<serde_json::Value>")]
pub enum CompressionMode {
    Lossless,
    Lossy,
    #[default]
    Glossy,
}

impl CompressionMode {
    /// Numeric value sent in the `lossy` field
    pub fn api_value(self) -> u8 {
        match self {
            Self::Lossless => 0,
            Self::Lossy => 1,
            Self::Glossy => 2,
        }
    }

    /// Lenient parsing: anything unrecognized or absent is glossy
    pub fn from_setting(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("lossless") => Self::Lossless,
            Some("lossy") => Self::Lossy,
            _ => Self::Glossy,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lossless => "lossless",
            Self::Lossy => "lossy",
            Self::Glossy => "glossy",
        }
    }
}

// null, numeri o altri tipi JSON ricadono su glossy come le stringhe sconosciute
impl From<Option<serde_json::Value>> for CompressionMode {
    fn from(value: Option<serde_json::Value>) -> Self {
        Self::from_setting(value.as_ref().and_then(serde_json::Value::as_str))
    }
}

impl fmt::Display for CompressionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service credential
    pub api_key: String,
    /// Requested compression level
    pub compression_type: CompressionMode,
    /// Base URL of the optimization service
    pub api_base_url: String,
    /// Directory for scoped temporary files (None = system temp dir)
    pub temp_dir: Option<PathBuf>,
    /// Logical URI schemes mapped to filesystem roots
    pub schemes: BTreeMap<String, PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            compression_type: CompressionMode::Glossy,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            temp_dir: None,
            schemes: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        let url = reqwest::Url::parse(&self.api_base_url)
            .map_err(|e| anyhow::anyhow!("Invalid api_base_url {}: {}", self.api_base_url, e))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(anyhow::anyhow!("api_base_url must be http or https: {}", self.api_base_url));
        }

        for (scheme, root) in &self.schemes {
            if scheme.is_empty() {
                return Err(anyhow::anyhow!("Scheme names must not be empty"));
            }
            if !root.is_absolute() {
                return Err(anyhow::anyhow!("Root for scheme {} is not absolute: {}", scheme, root.display()));
            }
        }

        if let Some(ref temp_dir) = self.temp_dir {
            if !temp_dir.is_dir() {
                return Err(anyhow::anyhow!("Temp directory does not exist: {}", temp_dir.display()));
            }
        }

        Ok(())
    }

    /// Like `validate`, but also requires a credential
    pub fn check_ready(&self) -> Result<()> {
        self.validate()?;
        if self.api_key.trim().is_empty() {
            return Err(anyhow::anyhow!("api_key is not set (use `init --api-key` or {})", API_KEY_ENV));
        }
        Ok(())
    }

    /// Upload endpoint (multipart)
    pub fn upload_endpoint(&self) -> String {
        format!("{}/v2/post-reducer.php", self.api_base_url.trim_end_matches('/'))
    }

    /// Polling endpoint (JSON)
    pub fn poll_endpoint(&self) -> String {
        format!("{}/v2/reducer.php", self.api_base_url.trim_end_matches('/'))
    }

    /// Default location: `<config_dir>/derivative-optimizer/config.json`
    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(dir.join("derivative-optimizer").join("config.json"))
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config {}: {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// Apply the `OPTIMIZER_API_KEY` override, if set and non-empty
    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.api_key = key;
            }
        }
    }
}
