//! # Optimize-and-Replace Workflow
//!
//! Orchestratore di una singola invocazione.
//!
//! ## Stati:
//! `START → UPLOADED → (POLLING)* → READY → DOWNLOADED → REPLACED`,
//! con uscita verso `FAILED` da ogni stato.
//!
//! ## Regole:
//! - `START`: API key presente, file sorgente esistente e leggibile
//! - `UPLOADED`: codice 2 → READY; codice 1 con handle → POLLING; altro → FAILED
//! - `POLLING`: massimo 3 tentativi, poi FAILED se ancora pending
//! - `READY`: nessun URL candidato usabile → FAILED
//!
//! ## Contratto verso il chiamante:
//! `optimize()` restituisce sempre `true`. Un'ottimizzazione fallita non deve
//! mai bloccare la pipeline che genera le immagini: il file originale resta
//! dov'è e solo i log raccontano cosa è successo.

use crate::{
    config::{CompressionMode, Config},
    error::OptimizeError,
    file_manager::{calculate_reduction, format_size, FileService},
    optimizer::{
        fetcher,
        path_resolver::UriResolver,
        poller,
        request::OptimizationRequest,
        uploader,
    },
    response::ResultState,
    service::HttpService,
};
use tracing::{debug, error, info};

/// Terminal state of one invocation
#[derive(Debug)]
pub enum Outcome {
    /// Target replaced by the optimized variant
    Replaced {
        original_size: u64,
        optimized_size: u64,
    },
    /// Dry run: a variant was ready but nothing was downloaded
    DryRun { url: String },
    /// Original left untouched
    Kept(OptimizeError),
}

impl Outcome {
    pub fn is_replaced(&self) -> bool {
        matches!(self, Self::Replaced { .. })
    }
}

/// Upload → poll → download → replace, over injected collaborators
pub struct Workflow<H, F> {
    http: H,
    files: F,
    resolver: UriResolver,
    upload_endpoint: String,
    poll_endpoint: String,
    api_key: String,
    compression_mode: CompressionMode,
    dry_run: bool,
}

impl<H, F> Workflow<H, F>
where
    H: HttpService,
    F: FileService,
{
    pub fn new(config: &Config, http: H, files: F) -> Self {
        Self {
            http,
            files,
            resolver: UriResolver::from_config(config),
            upload_endpoint: config.upload_endpoint(),
            poll_endpoint: config.poll_endpoint(),
            api_key: config.api_key.clone(),
            compression_mode: config.compression_type,
            dry_run: false,
        }
    }

    /// Stop before the download: nothing on disk changes
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Caller-facing entry point; always `true`
    pub async fn optimize(&self, source_uri: &str) -> bool {
        let _ = self.optimize_uri(source_uri).await;
        true
    }

    /// Resolves a logical reference and runs the workflow on it
    pub async fn optimize_uri(&self, source_uri: &str) -> Outcome {
        match self.resolver.resolve(source_uri) {
            Ok(source_path) => {
                let request =
                    OptimizationRequest::new(self.api_key.clone(), source_path, self.compression_mode);
                self.run(&request).await
            }
            Err(e) => {
                error!("Source file missing or unreadable: {} ({})", source_uri, e);
                Outcome::Kept(e)
            }
        }
    }

    /// Runs one request to a terminal state, logging any failure
    pub async fn run(&self, request: &OptimizationRequest) -> Outcome {
        match self.try_run(request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                log_failure(request, &e);
                Outcome::Kept(e)
            }
        }
    }

    async fn try_run(&self, request: &OptimizationRequest) -> Result<Outcome, OptimizeError> {
        let path = request.source_path.as_path();

        // START
        if request.api_key.trim().is_empty() {
            return Err(OptimizeError::MissingApiKey);
        }
        if !self.files.is_readable(path).await {
            return Err(OptimizeError::SourceUnavailable(path.to_path_buf()));
        }
        let original_size = self.files.len(path).await?;
        info!(
            "🚀 Optimizing {} ({}) with {} compression",
            path.display(),
            format_size(original_size),
            request.compression_mode
        );

        // UPLOADED
        let file_bytes = self.files.read(path).await?;
        let uploaded = uploader::upload(&self.http, &self.upload_endpoint, request, file_bytes).await?;
        debug!("Upload state for {}: {:?}", path.display(), uploaded.state());

        // POLLING
        let polled = poller::poll_until_ready(&self.http, &self.poll_endpoint, request, uploaded).await?;
        let result = polled.result;
        match result.state() {
            ResultState::Done => {}
            ResultState::Pending if polled.attempts > 0 => {
                return Err(OptimizeError::PollExhausted {
                    attempts: polled.attempts,
                    message: result.status.message,
                })
            }
            ResultState::Pending | ResultState::Failed(_) => {
                return Err(OptimizeError::ServiceFailure {
                    code: result.status.code,
                    message: result.status.message,
                })
            }
        }

        // READY
        let (variant, url) = result
            .select_candidate()
            .ok_or(OptimizeError::MissingOptimizedUrl)?;
        debug!("Selected optimized variant {} ({}) for {}", variant, url, path.display());

        if self.dry_run {
            info!("🔍 Dry run: would replace {} with {}", path.display(), url);
            return Ok(Outcome::DryRun { url: url.to_string() });
        }

        // DOWNLOADED → REPLACED
        let bytes = fetcher::download(&self.http, url).await?;
        fetcher::replace(&self.files, path, &bytes).await?;

        let optimized_size = self.files.len(path).await.unwrap_or(bytes.len() as u64);
        info!(
            "✅ Optimized {}: {} → {} ({:.1}% saved)",
            path.display(),
            format_size(original_size),
            format_size(optimized_size),
            calculate_reduction(original_size, optimized_size)
        );

        Ok(Outcome::Replaced {
            original_size,
            optimized_size,
        })
    }
}

fn log_failure(request: &OptimizationRequest, err: &OptimizeError) {
    let path = request.source_path.display();
    match err {
        OptimizeError::MissingApiKey => {
            error!("Missing API key, leaving {} unoptimized", path)
        }
        OptimizeError::SourceUnavailable(missing) => {
            error!("Source file missing or unreadable: {}", missing.display())
        }
        OptimizeError::ServiceFailure { .. } | OptimizeError::PollExhausted { .. } => {
            error!("{} ({})", err, path)
        }
        OptimizeError::MissingOptimizedUrl => {
            error!("Missing optimized URL for {}", path)
        }
        OptimizeError::EmptyDownload(url) => {
            error!("Empty downloaded content from {} for {}", url, path)
        }
        OptimizeError::Write { .. } => error!("{}", err),
        OptimizeError::Transport(_)
        | OptimizeError::MalformedResponse(_)
        | OptimizeError::Io(_)
        | OptimizeError::Config(_) => {
            error!("Optimization request failed for {}: {}", path, err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_manager::LocalFileService;
    use crate::testing::{capture_logs, meta, meta_all_na, Call, ScriptedHttp};
    use serde_json::json;
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio_test::assert_ok;

    const ORIGINAL: &[u8] = b"original derivative bytes";
    const HANDLE: &str = "https://api.example.com/u/thumb.jpg";

    struct Fixture {
        _work: TempDir,
        scratch: TempDir,
        target: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let work = TempDir::new().unwrap();
            let scratch = TempDir::new().unwrap();
            let target = work.path().join("thumb.jpg");
            std::fs::write(&target, ORIGINAL).unwrap();
            Self {
                _work: work,
                scratch,
                target,
            }
        }

        fn config(&self, api_key: &str) -> Config {
            Config {
                api_key: api_key.to_string(),
                api_base_url: "http://svc".to_string(),
                ..Default::default()
            }
        }

        fn workflow(&self, api_key: &str, http: ScriptedHttp) -> Workflow<ScriptedHttp, LocalFileService> {
            Workflow::new(
                &self.config(api_key),
                http,
                LocalFileService::new(self.scratch.path().to_path_buf()),
            )
        }

        fn target_uri(&self) -> String {
            self.target.to_string_lossy().to_string()
        }

        fn target_bytes(&self) -> Vec<u8> {
            std::fs::read(&self.target).unwrap()
        }

        fn scratch_is_empty(&self) -> bool {
            std::fs::read_dir(self.scratch.path()).unwrap().count() == 0
        }
    }

    #[tokio::test]
    async fn test_missing_api_key_keeps_file() {
        let fx = Fixture::new();
        let workflow = fx.workflow("", ScriptedHttp::new());
        let (_guard, logs) = capture_logs();

        let outcome = workflow.optimize_uri(&fx.target_uri()).await;

        assert!(matches!(outcome, Outcome::Kept(OptimizeError::MissingApiKey)));
        let logged = logs.contents();
        assert!(logged.contains("ERROR"));
        assert!(logged.contains("Missing API key"));
        assert_eq!(fx.target_bytes(), ORIGINAL);
        assert!(workflow.http.calls().is_empty());
        assert!(workflow.optimize(&fx.target_uri()).await);
    }

    #[tokio::test]
    async fn test_missing_source_keeps_going() {
        let fx = Fixture::new();
        let workflow = fx.workflow("key", ScriptedHttp::new());
        let missing = fx.target.with_file_name("gone.jpg");

        let outcome = workflow.optimize_uri(&missing.to_string_lossy()).await;

        assert!(matches!(outcome, Outcome::Kept(OptimizeError::SourceUnavailable(p)) if p == missing));
        assert!(workflow.http.calls().is_empty());
    }

    #[tokio::test]
    async fn test_immediate_success_replaces_target() {
        let fx = Fixture::new();
        let http = ScriptedHttp::new()
            .upload_responds(meta(
                "2",
                Some(HANDLE),
                &[
                    ("AVIFLossyURL", "https://x/a.avif"),
                    ("WebPLossyURL", "https://x/a.webp"),
                    ("LossyURL", "https://x/a.jpg"),
                ],
            ))
            .download("https://x/a.avif", b"avif!");
        let workflow = fx.workflow("key", http);

        let outcome = workflow.optimize_uri(&fx.target_uri()).await;

        assert!(matches!(
            outcome,
            Outcome::Replaced { original_size, optimized_size: 5 } if original_size == ORIGINAL.len() as u64
        ));
        assert_eq!(fx.target_bytes(), b"avif!");
        assert_eq!(workflow.http.gets_sent(), vec!["https://x/a.avif".to_string()]);
        assert!(workflow.http.polls_sent().is_empty());
        assert!(fx.scratch_is_empty());
        assert!(matches!(
            &workflow.http.calls()[0],
            Call::Upload { url, .. } if url == "http://svc/v2/post-reducer.php"
        ));

        let uploads = workflow.http.uploads_sent();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].field("lossy"), Some("2"));
        assert_eq!(uploads[0].file_bytes, ORIGINAL);
    }

    #[tokio::test]
    async fn test_rerun_on_optimized_file_is_idempotent() {
        let fx = Fixture::new();
        let done = meta("2", Some(HANDLE), &[("LossyURL", "https://x/a.jpg")]);
        let http = ScriptedHttp::new()
            .upload_responds(done.clone())
            .upload_responds(done)
            .download("https://x/a.jpg", b"optimized");
        let workflow = fx.workflow("key", http);

        assert!(workflow.optimize_uri(&fx.target_uri()).await.is_replaced());
        assert!(workflow.optimize_uri(&fx.target_uri()).await.is_replaced());
        assert_eq!(fx.target_bytes(), b"optimized");
        assert!(fx.scratch_is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_then_ready_after_poll() {
        let fx = Fixture::new();
        let http = ScriptedHttp::new()
            .upload_responds(meta("1", Some(HANDLE), &[]))
            .poll_responds(meta("1", Some(HANDLE), &[]))
            .poll_responds(meta("2", Some(HANDLE), &[("WebPLosslessURL", "https://x/a.webp")]))
            .download("https://x/a.webp", b"webp");
        let workflow = fx.workflow("key", http);

        assert!(workflow.optimize_uri(&fx.target_uri()).await.is_replaced());
        assert_eq!(fx.target_bytes(), b"webp");

        let polls = workflow.http.polls_sent();
        assert_eq!(polls.len(), 2);
        assert_eq!(polls[0]["urllist"], json!([urlencoding::encode(HANDLE)]));
        assert_eq!(polls[0]["wait"], 20);
        assert!(matches!(
            &workflow.http.calls()[1],
            Call::Poll { url, .. } if url == "http://svc/v2/reducer.php"
        ));

        // upload, due poll, download: tutti con timeout di 60 secondi
        let calls = workflow.http.calls();
        assert!(matches!(&calls[0], Call::Upload { timeout, .. } if *timeout == Duration::from_secs(60)));
        assert!(matches!(&calls[1], Call::Poll { timeout, .. } if *timeout == Duration::from_secs(60)));
        assert!(matches!(&calls[2], Call::Poll { timeout, .. } if *timeout == Duration::from_secs(60)));
        assert!(matches!(&calls[3], Call::Get { timeout, .. } if *timeout == Duration::from_secs(60)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistently_pending_gives_up_after_three_polls() {
        let fx = Fixture::new();
        let http = ScriptedHttp::new()
            .upload_responds(meta("1", Some(HANDLE), &[]))
            .poll_responds(meta("1", Some(HANDLE), &[]))
            .poll_responds(meta("1", Some(HANDLE), &[]))
            .poll_responds(meta("1", Some(HANDLE), &[]));
        let workflow = fx.workflow("key", http);

        let outcome = workflow.optimize_uri(&fx.target_uri()).await;

        assert!(matches!(
            outcome,
            Outcome::Kept(OptimizeError::PollExhausted { attempts: 3, .. })
        ));
        assert_eq!(workflow.http.polls_sent().len(), 3);
        assert!(workflow.http.gets_sent().is_empty());
        assert_eq!(fx.target_bytes(), ORIGINAL);
    }

    #[tokio::test]
    async fn test_pending_without_handle_fails_without_polling() {
        let fx = Fixture::new();
        let http = ScriptedHttp::new().upload_responds(meta("1", None, &[]));
        let workflow = fx.workflow("key", http);

        let outcome = workflow.optimize_uri(&fx.target_uri()).await;

        assert!(matches!(outcome, Outcome::Kept(OptimizeError::ServiceFailure { code: 1, .. })));
        assert!(workflow.http.polls_sent().is_empty());
    }

    #[tokio::test]
    async fn test_service_failure_code_keeps_file() {
        let fx = Fixture::new();
        let http = ScriptedHttp::new().upload_responds(meta("-403", None, &[]));
        let workflow = fx.workflow("key", http);

        let outcome = workflow.optimize_uri(&fx.target_uri()).await;

        assert!(matches!(outcome, Outcome::Kept(OptimizeError::ServiceFailure { code: -403, .. })));
        assert_eq!(fx.target_bytes(), ORIGINAL);
    }

    #[tokio::test]
    async fn test_all_candidates_na_skips_download() {
        let fx = Fixture::new();
        let http = ScriptedHttp::new().upload_responds(meta_all_na(HANDLE));
        let workflow = fx.workflow("key", http);
        let (_guard, logs) = capture_logs();

        let outcome = workflow.optimize_uri(&fx.target_uri()).await;

        assert!(matches!(outcome, Outcome::Kept(OptimizeError::MissingOptimizedUrl)));
        assert!(logs.contents().contains("Missing optimized URL"));
        assert!(workflow.http.gets_sent().is_empty());
        assert_eq!(fx.target_bytes(), ORIGINAL);
    }

    #[tokio::test]
    async fn test_transport_and_malformed_errors_are_absorbed() {
        let fx = Fixture::new();
        let http = ScriptedHttp::new()
            .upload_fails("connection refused")
            .upload_raw(br#"{"error":"not an array"}"#);
        let workflow = fx.workflow("key", http);

        assert!(workflow.optimize(&fx.target_uri()).await);
        let outcome = workflow.optimize_uri(&fx.target_uri()).await;

        assert!(matches!(outcome, Outcome::Kept(OptimizeError::MalformedResponse(_))));
        assert_eq!(workflow.http.uploads_sent().len(), 2);
        assert_eq!(fx.target_bytes(), ORIGINAL);
    }

    #[tokio::test]
    async fn test_failed_or_empty_download_keeps_file() {
        let fx = Fixture::new();
        let http = ScriptedHttp::new()
            .upload_responds(meta("2", Some(HANDLE), &[("LossyURL", "https://x/broken.jpg")]))
            .upload_responds(meta("2", Some(HANDLE), &[("LosslessURL", "https://x/empty.jpg")]))
            .download_fails("https://x/broken.jpg", "connection reset")
            .download("https://x/empty.jpg", b"");
        let workflow = fx.workflow("key", http);

        let first = workflow.optimize_uri(&fx.target_uri()).await;
        let second = workflow.optimize_uri(&fx.target_uri()).await;

        assert!(matches!(first, Outcome::Kept(OptimizeError::Transport(_))));
        assert!(matches!(second, Outcome::Kept(OptimizeError::EmptyDownload(_))));
        assert_eq!(fx.target_bytes(), ORIGINAL);
        assert!(fx.scratch_is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_leaves_target_alone() {
        let fx = Fixture::new();
        let http = ScriptedHttp::new()
            .upload_responds(meta("2", Some(HANDLE), &[("AVIFLosslessURL", "https://x/a.avif")]));
        let workflow = fx.workflow("key", http).with_dry_run(true);

        let outcome = workflow.optimize_uri(&fx.target_uri()).await;

        assert!(matches!(outcome, Outcome::DryRun { ref url } if url == "https://x/a.avif"));
        assert!(workflow.http.gets_sent().is_empty());
        assert_eq!(fx.target_bytes(), ORIGINAL);
    }

    #[tokio::test]
    async fn test_logical_uri_is_resolved() {
        let fx = Fixture::new();
        let mut config = fx.config("key");
        config
            .schemes
            .insert("public".to_string(), fx.target.parent().unwrap().to_path_buf());
        let http = ScriptedHttp::new()
            .upload_responds(meta("2", Some(HANDLE), &[("LossyURL", "https://x/a.jpg")]))
            .download("https://x/a.jpg", b"tiny");
        let workflow = Workflow::new(
            &config,
            http,
            LocalFileService::new(fx.scratch.path().to_path_buf()),
        );

        assert!(workflow.optimize_uri("public://thumb.jpg").await.is_replaced());
        assert_eq!(fx.target_bytes(), b"tiny");

        let uploads = workflow.http.uploads_sent();
        let expected = format!(r#"{{"file1":"{}"}}"#, fx.target.display());
        assert_eq!(uploads[0].field("file_paths"), Some(expected.as_str()));
        assert_ok!(config.validate());
    }
}
