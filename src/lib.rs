//! # Derivative Optimizer Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Impostazioni persistite e modalità di compressione
//! - `error`: Tipi di errore del workflow
//! - `response`: Modello della risposta del servizio e scelta del candidato
//! - `service`: Client HTTP (trait + implementazione reqwest)
//! - `file_manager`: Operazioni sui file (trait + implementazione locale)
//! - `optimizer`: Upload → poll → download → replace
//! - `progress`: Progress bar e statistiche dei batch
//!
//! ## Utilizzo:
//! ```ignore
//! use derivative_optimizer::{Config, LocalFileService, ReqwestHttpService, Workflow};
//!
//! let config = Config::from_file(&Config::default_path()?).await?;
//! let workflow = Workflow::new(&config, ReqwestHttpService::new(), LocalFileService::default());
//! workflow.optimize("public://styles/thumbnail/photo.jpg").await;
//! ```

pub mod config;
pub mod error;
pub mod file_manager;
pub mod optimizer;
pub mod progress;
pub mod response;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{CompressionMode, Config};
pub use error::OptimizeError;
pub use file_manager::{FileService, LocalFileService};
pub use optimizer::{BatchOptimizer, OptimizationRequest, Outcome, Workflow};
pub use response::OptimizationResult;
pub use service::{HttpService, ReqwestHttpService};
