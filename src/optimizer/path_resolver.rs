//! # Path Resolution Module
//!
//! Centralizza la traduzione da riferimento logico (`public://styles/x.jpg`)
//! a path reale sul filesystem.

use crate::{config::Config, error::OptimizeError};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

const SCHEME_SEPARATOR: &str = "://";

/// Risolve URI logici usando la tabella `schema -> radice` della config
#[derive(Debug, Clone, Default)]
pub struct UriResolver {
    roots: BTreeMap<String, PathBuf>,
}

impl UriResolver {
    pub fn new(roots: BTreeMap<String, PathBuf>) -> Self {
        Self { roots }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.schemes.clone())
    }

    /// Calcola il path reale per un riferimento. I path senza schema passano invariati.
    pub fn resolve(&self, reference: &str) -> Result<PathBuf, OptimizeError> {
        let Some((scheme, rest)) = reference.split_once(SCHEME_SEPARATOR) else {
            return Ok(PathBuf::from(reference));
        };

        let root = self
            .roots
            .get(scheme)
            .ok_or_else(|| OptimizeError::SourceUnavailable(PathBuf::from(reference)))?;

        let relative = Path::new(rest);
        // Solo componenti normali: niente `..`, niente path assoluti
        if !relative.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(OptimizeError::SourceUnavailable(PathBuf::from(reference)));
        }

        let resolved = root.join(relative);
        debug!("Resolved {} -> {}", reference, resolved.display());
        Ok(resolved)
    }
}
