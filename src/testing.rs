//! Fake collaborators for unit tests.

use crate::error::OptimizeError;
use crate::service::{HttpService, MultipartUpload};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Scripted = Result<Vec<u8>, String>;

/// One request seen by `ScriptedHttp`
#[derive(Debug, Clone)]
pub(crate) enum Call {
    Upload {
        url: String,
        form: MultipartUpload,
        timeout: Duration,
    },
    Poll {
        url: String,
        body: Value,
        timeout: Duration,
    },
    Get {
        url: String,
        timeout: Duration,
    },
}

/// `HttpService` that replays queued responses and records every request
#[derive(Default)]
pub(crate) struct ScriptedHttp {
    uploads: Mutex<VecDeque<Scripted>>,
    polls: Mutex<VecDeque<Scripted>>,
    downloads: Mutex<HashMap<String, Scripted>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedHttp {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn upload_responds(self, body: Value) -> Self {
        self.uploads.lock().unwrap().push_back(Ok(body.to_string().into_bytes()));
        self
    }

    pub(crate) fn upload_fails(self, message: &str) -> Self {
        self.uploads.lock().unwrap().push_back(Err(message.to_string()));
        self
    }

    pub(crate) fn upload_raw(self, body: &[u8]) -> Self {
        self.uploads.lock().unwrap().push_back(Ok(body.to_vec()));
        self
    }

    pub(crate) fn poll_responds(self, body: Value) -> Self {
        self.polls.lock().unwrap().push_back(Ok(body.to_string().into_bytes()));
        self
    }

    pub(crate) fn download(self, url: &str, bytes: &[u8]) -> Self {
        self.downloads
            .lock()
            .unwrap()
            .insert(url.to_string(), Ok(bytes.to_vec()));
        self
    }

    pub(crate) fn download_fails(self, url: &str, message: &str) -> Self {
        self.downloads
            .lock()
            .unwrap()
            .insert(url.to_string(), Err(message.to_string()));
        self
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn uploads_sent(&self) -> Vec<MultipartUpload> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Upload { form, .. } => Some(form),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn polls_sent(&self) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Poll { body, .. } => Some(body),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn gets_sent(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Get { url, .. } => Some(url),
                _ => None,
            })
            .collect()
    }

    fn replay(queue: &Mutex<VecDeque<Scripted>>) -> Result<Vec<u8>, OptimizeError> {
        match queue.lock().unwrap().pop_front() {
            Some(Ok(body)) => Ok(body),
            Some(Err(message)) => Err(OptimizeError::Transport(message)),
            None => Err(OptimizeError::Transport("unscripted request".to_string())),
        }
    }
}

#[async_trait]
impl HttpService for ScriptedHttp {
    async fn post_multipart(
        &self,
        url: &str,
        upload: MultipartUpload,
        timeout: Duration,
    ) -> Result<Vec<u8>, OptimizeError> {
        self.calls.lock().unwrap().push(Call::Upload {
            url: url.to_string(),
            form: upload,
            timeout,
        });
        Self::replay(&self.uploads)
    }

    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        timeout: Duration,
    ) -> Result<Vec<u8>, OptimizeError> {
        self.calls.lock().unwrap().push(Call::Poll {
            url: url.to_string(),
            body: body.clone(),
            timeout,
        });
        Self::replay(&self.polls)
    }

    async fn get(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, OptimizeError> {
        self.calls.lock().unwrap().push(Call::Get {
            url: url.to_string(),
            timeout,
        });
        match self.downloads.lock().unwrap().get(url) {
            Some(Ok(bytes)) => Ok(bytes.clone()),
            Some(Err(message)) => Err(OptimizeError::Transport(message.clone())),
            None => Err(OptimizeError::Transport(format!("404 for {}", url))),
        }
    }
}

/// Builds a one-element response array
pub(crate) fn meta(code: &str, original_url: Option<&str>, urls: &[(&str, &str)]) -> Value {
    let mut item = json!({
        "Status": { "Code": code, "Message": format!("status {}", code) },
    });
    if let Some(original) = original_url {
        item["OriginalURL"] = json!(original);
    }
    for (field, url) in urls {
        item[*field] = json!(url);
    }
    json!([item])
}

/// A done result whose six candidates are all "NA"
pub(crate) fn meta_all_na(original_url: &str) -> Value {
    meta(
        "2",
        Some(original_url),
        &[
            ("AVIFLossyURL", "NA"),
            ("AVIFLosslessURL", "NA"),
            ("WebPLossyURL", "NA"),
            ("WebPLosslessURL", "NA"),
            ("LossyURL", "NA"),
            ("LosslessURL", "NA"),
        ],
    )
}

/// In-memory sink for the `tracing` output of a single test
#[derive(Clone, Default)]
pub(crate) struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub(crate) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Routes this thread's events into a buffer until the guard is dropped.
/// Needs the current-thread runtime that `#[tokio::test]` uses by default.
pub(crate) fn capture_logs() -> (tracing::subscriber::DefaultGuard, CapturedLogs) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    (tracing::subscriber::set_default(subscriber), logs)
}
