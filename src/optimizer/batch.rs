//! # Batch Optimizer
//!
//! Esegue il workflow su più target, uno alla volta.
//!
//! ## Flusso:
//! 1. **Discovery**: le directory vengono espanse nelle immagini che contengono
//! 2. **Processing**: ogni target passa dal workflow, in sequenza
//! 3. **Statistics**: gli esiti alimentano `OptimizationStats`
//! 4. **Reporting**: riepilogo finale nei log
//!
//! Nessuna parallelizzazione: un upload alla volta.

use crate::{
    file_manager::{find_image_files, FileService},
    optimizer::workflow::{Outcome, Workflow},
    progress::{OptimizationStats, ProgressManager},
    service::HttpService,
};
use std::path::Path;
use tracing::{info, warn};

pub struct BatchOptimizer<H, F> {
    workflow: Workflow<H, F>,
    show_progress: bool,
}

impl<H, F> BatchOptimizer<H, F>
where
    H: HttpService,
    F: FileService,
{
    pub fn new(workflow: Workflow<H, F>) -> Self {
        Self {
            workflow,
            show_progress: true,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Espande le directory nelle immagini contenute; URI e file restano invariati
    pub fn expand_targets(targets: &[String]) -> Vec<String> {
        let mut expanded = Vec::new();
        for target in targets {
            let path = Path::new(target);
            if !target.contains("://") && path.is_dir() {
                let images = find_image_files(path);
                if images.is_empty() {
                    warn!("No images found in {}", path.display());
                }
                expanded.extend(images.into_iter().map(|p| p.to_string_lossy().to_string()));
            } else {
                expanded.push(target.clone());
            }
        }
        expanded
    }

    /// Processa tutti i target e restituisce le statistiche
    pub async fn run(&self, targets: &[String]) -> OptimizationStats {
        let targets = Self::expand_targets(targets);
        info!("📁 {} target(s) to optimize", targets.len());

        let progress = if self.show_progress {
            ProgressManager::new(targets.len() as u64)
        } else {
            ProgressManager::hidden()
        };
        let mut stats = OptimizationStats::new();

        for target in &targets {
            progress.set_message(target);
            let outcome = self.workflow.optimize_uri(target).await;
            let label = match &outcome {
                Outcome::Replaced { .. } => "replaced",
                Outcome::DryRun { .. } => "ready (dry run)",
                Outcome::Kept(_) => "kept original",
            };
            stats.record(&outcome);
            progress.update(&format!("{}: {}", target, label));
        }

        let summary = stats.format_summary();
        progress.finish(&summary);
        info!("📊 {}", summary);
        stats
    }
}
