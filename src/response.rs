//! # Service Response Module
//!
//! Modello della risposta del servizio di ottimizzazione ("meta").
//!
//! ## Responsabilità:
//! - Deserializza il primo elemento dell'array JSON restituito dal servizio
//! - Normalizza `Status.Code` (numero o stringa numerica) in un intero
//! - Seleziona l'URL candidato da scaricare secondo un ordine fisso
//!
//! ## Ordine di preferenza:
//! AVIF lossy → AVIF lossless → WebP lossy → WebP lossless → lossy → lossless.
//! Un candidato è usabile solo se non vuoto e diverso da `"NA"`.
//!
//! ## Esempio risposta:
//! ```json
//! [{
//!   "Status": {"Code": "2", "Message": "Success"},
//!   "OriginalURL": "https://api.example.com/u/abc.jpg",
//!   "AVIFLossyURL": "https://api.example.com/u/abc.avif",
//!   "WebPLossyURL": "NA"
//! }]
//! ```

use crate::error::OptimizeError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Status code: still processing
pub const STATUS_PENDING: i64 = 1;
/// Status code: optimization done
pub const STATUS_DONE: i64 = 2;

/// Sentinel the service uses for "variant not produced"
const NOT_AVAILABLE: &str = "NA";

/// `Status` object of a service response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatus {
    #[serde(rename = "Code", default, deserialize_with = "deserialize_code")]
    pub code: i64,
    #[serde(rename = "Message", default, deserialize_with = "deserialize_text")]
    pub message: String,
}

/// One element of the service response array
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    #[serde(rename = "Status", default)]
    pub status: ServiceStatus,
    #[serde(rename = "OriginalURL", default)]
    pub original_url: Option<String>,
    #[serde(rename = "AVIFLossyURL", default)]
    pub avif_lossy_url: Option<String>,
    #[serde(rename = "AVIFLosslessURL", default)]
    pub avif_lossless_url: Option<String>,
    #[serde(rename = "WebPLossyURL", default)]
    pub webp_lossy_url: Option<String>,
    #[serde(rename = "WebPLosslessURL", default)]
    pub webp_lossless_url: Option<String>,
    #[serde(rename = "LossyURL", default)]
    pub lossy_url: Option<String>,
    #[serde(rename = "LosslessURL", default)]
    pub lossless_url: Option<String>,
}

/// Where a result stands in the upload/poll lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultState {
    Pending,
    Done,
    Failed(i64),
}

impl OptimizationResult {
    /// Parses a raw response body. The body must be a JSON array; an empty
    /// array gives the empty result.
    pub fn from_body(body: &[u8]) -> Result<Self, OptimizeError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| OptimizeError::MalformedResponse(format!("invalid JSON: {}", e)))?;

        let items = match value {
            Value::Array(items) => items,
            other => {
                return Err(OptimizeError::MalformedResponse(format!(
                    "expected an array, got {}",
                    json_kind(&other)
                )))
            }
        };

        match items.into_iter().next() {
            Some(first @ Value::Object(_)) => serde_json::from_value(first)
                .map_err(|e| OptimizeError::MalformedResponse(e.to_string())),
            _ => Ok(Self::default()),
        }
    }

    pub fn state(&self) -> ResultState {
        match self.status.code {
            STATUS_PENDING => ResultState::Pending,
            STATUS_DONE => ResultState::Done,
            other => ResultState::Failed(other),
        }
    }

    /// Polling handle, if the service assigned one
    pub fn handle(&self) -> Option<&str> {
        self.original_url.as_deref().filter(|url| !url.is_empty())
    }

    /// Candidate URLs in preference order
    pub fn candidates(&self) -> [(&'static str, Option<&str>); 6] {
        [
            ("AVIFLossyURL", self.avif_lossy_url.as_deref()),
            ("AVIFLosslessURL", self.avif_lossless_url.as_deref()),
            ("WebPLossyURL", self.webp_lossy_url.as_deref()),
            ("WebPLosslessURL", self.webp_lossless_url.as_deref()),
            ("LossyURL", self.lossy_url.as_deref()),
            ("LosslessURL", self.lossless_url.as_deref()),
        ]
    }

    /// First usable candidate with its field name
    pub fn select_candidate(&self) -> Option<(&'static str, &str)> {
        self.candidates()
            .into_iter()
            .find_map(|(name, url)| url.filter(|url| is_usable(url)).map(|url| (name, url)))
    }

    /// First usable candidate, or `""` when none qualifies
    pub fn select_download_url(&self) -> &str {
        self.select_candidate().map(|(_, url)| url).unwrap_or("")
    }
}

fn is_usable(url: &str) -> bool {
    !url.is_empty() && url != NOT_AVAILABLE
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn deserialize_code<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_i64().unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

fn deserialize_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}
