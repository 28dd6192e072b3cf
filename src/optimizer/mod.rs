//! # Optimizer Module
//!
//! Il workflow di ottimizzazione separato in sottomoduli:
//! - `request`: Input dell'invocazione e parametri fissi del protocollo
//! - `uploader`: Invio multipart del file sorgente
//! - `poller`: Attesa limitata dei risultati "pending"
//! - `fetcher`: Download della variante e sostituzione del file
//! - `workflow`: Macchina a stati che collega le fasi
//! - `batch`: Esecuzione sequenziale su più target
//! - `path_resolver`: Traduzione URI logico → path reale

pub mod batch;
pub mod fetcher;
pub mod path_resolver;
pub mod poller;
pub mod request;
pub mod uploader;
pub mod workflow;

pub use batch::BatchOptimizer;
pub use path_resolver::UriResolver;
pub use request::OptimizationRequest;
pub use workflow::{Outcome, Workflow};
