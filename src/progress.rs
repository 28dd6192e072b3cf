//! # Progress Tracking and Statistics Module
//!
//! Questo modulo gestisce il progress tracking e le statistiche di un batch.
//!
//! ## Responsabilità:
//! - Progress bar visual con `indicatif` per feedback real-time
//! - Tracking esiti per file (sostituiti, lasciati invariati, dry-run)
//! - Calcolo byte risparmiati e percentuale di riduzione
//!
//! ## Statistiche tracciate:
//! - **files_processed**: Totale file elaborati
//! - **files_replaced**: File sostituiti con la versione ottimizzata
//! - **files_kept**: File lasciati com'erano (qualsiasi errore)
//! - **files_dry_run**: File pronti ma non toccati (`--dry-run`)
//! - **total_bytes_saved**: Byte totali risparmiati
//!
//! ## Esempio:
//! ```ignore
//! let progress = ProgressManager::new(total_files);
//! let mut stats = OptimizationStats::new();
//! stats.record(&outcome);
//! progress.update("thumb.jpg");
//! progress.finish(&stats.format_summary());
//! ```

use crate::file_manager::format_size;
use crate::optimizer::Outcome;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Manages progress reporting for a batch of targets
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager
    pub fn new(total_files: u64) -> Self {
        let bar = ProgressBar::new(total_files);

        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-");
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Progress manager that draws nothing
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Update progress with a message
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    /// Set a custom message without incrementing
    pub fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

/// Statistics tracker for optimization results
#[derive(Debug, Default)]
pub struct OptimizationStats {
    pub files_processed: usize,
    pub files_replaced: usize,
    pub files_kept: usize,
    pub files_dry_run: usize,
    pub total_bytes_saved: u64,
    pub total_original_size: u64,
}

impl OptimizationStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: &Outcome) {
        self.files_processed += 1;
        match outcome {
            Outcome::Replaced {
                original_size,
                optimized_size,
            } => {
                self.files_replaced += 1;
                self.total_original_size += original_size;
                self.total_bytes_saved += original_size.saturating_sub(*optimized_size);
            }
            Outcome::DryRun { .. } => self.files_dry_run += 1,
            Outcome::Kept(_) => self.files_kept += 1,
        }
    }

    pub fn overall_reduction_percent(&self) -> f64 {
        if self.total_original_size > 0 {
            (self.total_bytes_saved as f64 / self.total_original_size as f64) * 100.0
        } else {
            0.0
        }
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Processed: {} files | Replaced: {} | Kept: {} | Dry run: {} | Total saved: {} ({:.2}%)",
            self.files_processed,
            self.files_replaced,
            self.files_kept,
            self.files_dry_run,
            format_size(self.total_bytes_saved),
            self.overall_reduction_percent()
        )
    }
}
