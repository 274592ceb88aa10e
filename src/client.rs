//! Client abstraction for talking to a pensum tracker.
//!
//! `PensumClient` wraps either a local [`Tracker`] or an HTTP connection to a
//! `pensumd` daemon. The CLI resolves which variant to use at startup via
//! [`discover_server`]; both variants expose the same operation surface, and
//! timestamps cross the wire as RFC 3339 with an explicit UTC offset.

use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::StoreError;
use crate::extract::Extractor;
use crate::horizon::HorizonView;
use crate::obligation::{Obligation, ObligationDraft, ObligationId, UpdatePatch};
use crate::paths::PensumPaths;
use crate::tracker::{CaptureOutcome, Tracker, TrackerInfo};

// ---------------------------------------------------------------------------
// Server discovery
// ---------------------------------------------------------------------------

/// Information about a running pensumd instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub pid: u32,
    pub port: u16,
    pub bind: String,
}

impl ServerInfo {
    /// Base URL for HTTP requests.
    pub fn base_url(&self) -> String {
        let host = if self.bind == "0.0.0.0" {
            "127.0.0.1"
        } else {
            &self.bind
        };
        format!("http://{host}:{}", self.port)
    }
}

/// Discover a running pensumd server via its PID file.
///
/// Returns `Some(ServerInfo)` when the PID file parses and the server answers
/// `GET /health`; a stale file is removed on the way out.
pub fn discover_server(paths: &PensumPaths) -> Option<ServerInfo> {
    let pid_path = paths.pid_file();
    let contents = std::fs::read_to_string(&pid_path).ok()?;
    let info: ServerInfo = serde_json::from_str(&contents).ok()?;

    let url = format!("{}/health", info.base_url());
    match ureq::get(&url).timeout(Duration::from_secs(2)).call() {
        Ok(resp) if resp.status() == 200 => Some(info),
        _ => {
            let _ = std::fs::remove_file(&pid_path);
            None
        }
    }
}

/// Write a PID file for the current pensumd process.
pub fn write_pid_file(paths: &PensumPaths, port: u16, bind: &str) -> std::io::Result<()> {
    let info = ServerInfo {
        pid: std::process::id(),
        port,
        bind: bind.to_string(),
    };
    let json = serde_json::to_string_pretty(&info).expect("ServerInfo is always serializable");
    std::fs::write(paths.pid_file(), json)
}

/// Remove the PID file on shutdown.
pub fn remove_pid_file(paths: &PensumPaths) {
    let _ = std::fs::remove_file(paths.pid_file());
}

// ---------------------------------------------------------------------------
// Client error
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ClientError {
    #[error("remote request failed: {message}")]
    #[diagnostic(code(pensum::client::request), help("Is pensumd running?"))]
    Request { message: String },

    #[error("unexpected response from server: {message}")]
    #[diagnostic(code(pensum::client::response), help("Server version mismatch?"))]
    Response { message: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Tracker(#[from] crate::error::PensumError),
}

impl From<StoreError> for ClientError {
    fn from(e: StoreError) -> Self {
        Self::Tracker(e.into())
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

// ---------------------------------------------------------------------------
// PensumClient
// ---------------------------------------------------------------------------

/// Either a local tracker or a remote HTTP connection to pensumd.
pub enum PensumClient {
    /// Direct local tracker access.
    Local(Tracker),
    /// HTTP client to a running pensumd server.
    Remote { base_url: String, http: ureq::Agent },
}

#[derive(Serialize)]
struct CaptureRequest<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct ClarifyRequest<'a> {
    draft: &'a ObligationDraft,
    phrase: &'a str,
}

impl PensumClient {
    /// Connect to a remote daemon at the given base URL.
    pub fn remote(base_url: impl Into<String>) -> Self {
        Self::Remote {
            base_url: base_url.into(),
            http: ureq::AgentBuilder::new()
                .timeout(Duration::from_secs(10))
                .build(),
        }
    }

    fn get_json<T: serde::de::DeserializeOwned>(
        http: &ureq::Agent,
        url: &str,
    ) -> ClientResult<T> {
        let response = http.get(url).call().map_err(map_ureq_error)?;
        response.into_json().map_err(|e| ClientError::Response {
            message: e.to_string(),
        })
    }

    fn send_json<T: serde::de::DeserializeOwned>(
        request: ureq::Request,
        body: &impl Serialize,
    ) -> ClientResult<T> {
        let response = request.send_json(body).map_err(map_ureq_error)?;
        response.into_json().map_err(|e| ClientError::Response {
            message: e.to_string(),
        })
    }

    // ── Operations ───────────────────────────────────────────────────

    /// All obligations, post-sweep.
    pub fn list_all(&mut self, now: DateTime<FixedOffset>) -> ClientResult<Vec<Obligation>> {
        match self {
            Self::Local(tracker) => Ok(tracker.list_all(now)?),
            Self::Remote { base_url, http } => {
                Self::get_json(http, &format!("{base_url}/obligations"))
            }
        }
    }

    /// The five display horizons, post-sweep.
    pub fn horizon(&mut self, now: DateTime<FixedOffset>) -> ClientResult<HorizonView> {
        match self {
            Self::Local(tracker) => Ok(tracker.horizon(now)?),
            Self::Remote { base_url, http } => {
                Self::get_json(http, &format!("{base_url}/horizon"))
            }
        }
    }

    /// Add a structured draft.
    pub fn add(
        &mut self,
        draft: ObligationDraft,
        now: DateTime<FixedOffset>,
    ) -> ClientResult<Obligation> {
        match self {
            Self::Local(tracker) => Ok(tracker.add(draft, now)?),
            Self::Remote { base_url, http } => {
                Self::send_json(http.post(&format!("{base_url}/obligations")), &draft)
            }
        }
    }

    /// Capture free text through the extraction path.
    pub fn capture(
        &mut self,
        extractor: &dyn Extractor,
        text: &str,
        now: DateTime<FixedOffset>,
    ) -> ClientResult<CaptureOutcome> {
        match self {
            Self::Local(tracker) => Ok(tracker.capture_text(extractor, text, now)?),
            Self::Remote { base_url, http } => Self::send_json(
                http.post(&format!("{base_url}/capture")),
                &CaptureRequest { text },
            ),
        }
    }

    /// Resolve a clarification follow-up.
    pub fn clarify(
        &mut self,
        draft: ObligationDraft,
        phrase: &str,
        now: DateTime<FixedOffset>,
    ) -> ClientResult<CaptureOutcome> {
        match self {
            Self::Local(tracker) => Ok(tracker.clarify(draft, phrase, now)?),
            Self::Remote { base_url, http } => Self::send_json(
                http.post(&format!("{base_url}/clarify")),
                &ClarifyRequest {
                    draft: &draft,
                    phrase,
                },
            ),
        }
    }

    /// Apply a partial update.
    pub fn update(
        &mut self,
        id: ObligationId,
        patch: UpdatePatch,
        now: DateTime<FixedOffset>,
    ) -> ClientResult<Obligation> {
        match self {
            Self::Local(tracker) => Ok(tracker.update(id, patch, now)?),
            Self::Remote { base_url, http } => Self::send_json(
                http.request("PATCH", &format!("{base_url}/obligations/{}", id.get())),
                &patch,
            ),
        }
    }

    /// Toggle completion.
    pub fn toggle_done(&mut self, id: ObligationId) -> ClientResult<Obligation> {
        match self {
            Self::Local(tracker) => Ok(tracker.toggle_done(id)?),
            Self::Remote { base_url, http } => Self::send_json(
                http.post(&format!("{base_url}/obligations/{}/toggle", id.get())),
                &serde_json::json!({}),
            ),
        }
    }

    /// Delete one obligation.
    pub fn delete(&mut self, id: ObligationId) -> ClientResult<Obligation> {
        match self {
            Self::Local(tracker) => Ok(tracker.delete(id)?),
            Self::Remote { base_url, http } => {
                let response = http
                    .delete(&format!("{base_url}/obligations/{}", id.get()))
                    .call()
                    .map_err(map_ureq_error)?;
                response.into_json().map_err(|e| ClientError::Response {
                    message: e.to_string(),
                })
            }
        }
    }

    /// Delete everything, returning the removed count.
    pub fn clear_all(&mut self) -> ClientResult<usize> {
        match self {
            Self::Local(tracker) => Ok(tracker.clear_all()?),
            Self::Remote { base_url, http } => {
                #[derive(Deserialize)]
                struct Cleared {
                    removed: usize,
                }
                let response = http
                    .delete(&format!("{base_url}/obligations"))
                    .call()
                    .map_err(map_ureq_error)?;
                let cleared: Cleared =
                    response.into_json().map_err(|e| ClientError::Response {
                        message: e.to_string(),
                    })?;
                Ok(cleared.removed)
            }
        }
    }

    /// Tracker summary.
    pub fn info(&mut self) -> ClientResult<TrackerInfo> {
        match self {
            Self::Local(tracker) => Ok(tracker.info()),
            Self::Remote { base_url, http } => Self::get_json(http, &format!("{base_url}/info")),
        }
    }
}

/// Map a ureq failure; a 404 body from pensumd carries the missing id.
fn map_ureq_error(e: ureq::Error) -> ClientError {
    match e {
        ureq::Error::Status(404, response) => {
            #[derive(Deserialize)]
            struct NotFoundBody {
                id: u64,
            }
            match response.into_json::<NotFoundBody>() {
                Ok(body) => StoreError::NotFound { id: body.id }.into(),
                Err(_) => ClientError::Response {
                    message: "not found".into(),
                },
            }
        }
        ureq::Error::Status(code, response) => ClientError::Response {
            message: format!(
                "HTTP {code}: {}",
                response.into_string().unwrap_or_default()
            ),
        },
        ureq::Error::Transport(t) => ClientError::Request {
            message: t.to_string(),
        },
    }
}
