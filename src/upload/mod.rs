//! Upload of a canonical recording to the viewing service.
//!
//! One form-encoded `POST /scripts` carrying the script stream, the timing
//! stream and the terminal size. The response body is the URL of the hosted
//! recording.

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use rustls::client::danger::ServerCertVerifier;
use rustls::client::WebPkiServerVerifier;
use rustls::crypto::CryptoProvider;
use rustls::{ClientConfig, RootCertStore};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::form_urlencoded::byte_serialize;

use crate::config::{Config, UploadSettings, DEFAULT_ENDPOINT};
use crate::terminal::TerminalDimensions;
use crate::timing::CanonicalSession;

pub mod pinning;

pub use pinning::{PinSet, PinnedKeyVerifier};

/// Overrides the configured endpoint and turns pinning off.
pub const SERVER_ENV: &str = "TTYCAST_SERVER";

pub const USER_AGENT: &str = concat!("ttycast/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("upload request failed: {0}")]
    Network(#[source] reqwest::Error),

    #[error("server rejected upload ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("TLS public key of {host} is not in the pinned key set")]
    PinMismatch { host: String },

    #[error("invalid pinned key set: {0}")]
    InvalidPins(String),

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl UploadError {
    /// Network failures and rejections get one more attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, UploadError::Network(_) | UploadError::Rejected { .. })
    }
}

/// Endpoint, timeouts and pins, resolved once at startup.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub endpoint: String,
    /// `Some` only for the default hosted endpoint.
    pub pins: Option<PinSet>,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl UploadConfig {
    pub fn resolve(config: &Config) -> Result<Self, UploadError> {
        let server_override = std::env::var(SERVER_ENV).ok();
        Self::from_sources(&config.upload, server_override)
    }

    pub fn from_sources(
        settings: &UploadSettings,
        server_override: Option<String>,
    ) -> Result<Self, UploadError> {
        let server_override = server_override
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let (endpoint, pins) = match server_override {
            Some(endpoint) => {
                info!("Using {} from {}; key pinning disabled", endpoint, SERVER_ENV);
                (endpoint, None)
            }
            None => {
                let endpoint = settings.endpoint.trim().to_string();
                let pins = if is_default_endpoint(&endpoint) {
                    let mut pins = PinSet::bundled()?;
                    let extra = settings.extra_pinned_keys.trim();
                    if !extra.is_empty() {
                        pins.extend_from_file(&PathBuf::from(extra))?;
                    }
                    Some(pins)
                } else {
                    debug!("Custom endpoint {}; standard certificate checks only", endpoint);
                    None
                };
                (endpoint, pins)
            }
        };

        Ok(Self {
            endpoint,
            pins,
            connect_timeout: Duration::from_secs(settings.connect_timeout_secs),
            read_timeout: Duration::from_secs(settings.read_timeout_secs),
        })
    }

    pub fn scripts_url(&self) -> String {
        format!("{}/scripts", self.endpoint.trim_end_matches('/'))
    }

    fn host(&self) -> String {
        url::Url::parse(&self.endpoint)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| self.endpoint.clone())
    }
}

fn is_default_endpoint(endpoint: &str) -> bool {
    endpoint.trim_end_matches('/') == DEFAULT_ENDPOINT
}

pub struct UploadClient {
    client: Client,
    config: UploadConfig,
    pin_mismatch: Arc<AtomicBool>,
}

impl UploadClient {
    pub fn new(config: &UploadConfig) -> Result<Self, UploadError> {
        let pin_mismatch = Arc::new(AtomicBool::new(false));
        let verifier = server_verifier(config.pins.clone(), pin_mismatch.clone())?;
        Self::with_verifier(config, verifier, pin_mismatch)
    }

    /// Build a client around an already assembled certificate verifier.
    /// `pin_mismatch` must be the flag that verifier sets.
    pub(crate) fn with_verifier(
        config: &UploadConfig,
        verifier: Arc<dyn ServerCertVerifier>,
        pin_mismatch: Arc<AtomicBool>,
    ) -> Result<Self, UploadError> {
        let tls = tls_config(verifier)?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .use_preconfigured_tls(tls)
            .build()
            .map_err(|e| UploadError::Client(e.to_string()))?;

        Ok(Self {
            client,
            config: config.clone(),
            pin_mismatch,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// Upload, retrying once. Returns the response body, trimmed.
    pub async fn upload(
        &self,
        session: &CanonicalSession,
        dims: TerminalDimensions,
    ) -> Result<String, UploadError> {
        let body = encode_form(session, dims);

        match self.attempt(&body).await {
            Ok(url) => Ok(url),
            Err(err) if err.is_retryable() => {
                warn!("Upload failed ({}); retrying once", err);
                self.attempt(&body).await
            }
            Err(err) => Err(err),
        }
    }

    async fn attempt(&self, body: &str) -> Result<String, UploadError> {
        let url = self.config.scripts_url();
        debug!("POST {} ({} bytes)", url, body.len());

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body.to_string())
            .send()
            .await
            .map_err(|err| self.classify(err))?;

        let status = response.status();
        let text = response.text().await.map_err(|err| self.classify(err))?;

        if !status.is_success() {
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                body: text.trim().to_string(),
            });
        }

        Ok(text.trim().to_string())
    }

    fn classify(&self, err: reqwest::Error) -> UploadError {
        if self.pin_mismatch.swap(false, Ordering::SeqCst) {
            UploadError::PinMismatch {
                host: self.config.host(),
            }
        } else {
            UploadError::Network(err)
        }
    }
}

/// webpki chain validation, wrapped in the pin check when pins are given.
fn server_verifier(
    pins: Option<PinSet>,
    mismatch: Arc<AtomicBool>,
) -> Result<Arc<dyn ServerCertVerifier>, UploadError> {
    let roots = Arc::new(RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    });
    let webpki = WebPkiServerVerifier::builder_with_provider(roots, crypto_provider())
        .build()
        .map_err(|e| UploadError::Client(e.to_string()))?;

    let verifier: Arc<dyn ServerCertVerifier> = match pins {
        Some(pins) => Arc::new(PinnedKeyVerifier::new(webpki, pins, mismatch)),
        None => webpki,
    };
    Ok(verifier)
}

fn tls_config(verifier: Arc<dyn ServerCertVerifier>) -> Result<ClientConfig, UploadError> {
    let config = ClientConfig::builder_with_provider(crypto_provider())
        .with_safe_default_protocol_versions()
        .map_err(|e| UploadError::Client(e.to_string()))?
        .dangerous()
        .with_custom_certificate_verifier(verifier)
        .with_no_client_auth();

    Ok(config)
}

fn crypto_provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

/// `scriptfile`, `timingfile`, `cols`, `lines`, percent-encoded byte for byte
/// so non-UTF-8 output survives with its byte counts intact.
fn encode_form(session: &CanonicalSession, dims: TerminalDimensions) -> String {
    let columns = dims.columns.to_string();
    let rows = dims.rows.to_string();
    let fields: [(&str, &[u8]); 4] = [
        ("scriptfile", session.script.as_slice()),
        ("timingfile", session.timing.as_bytes()),
        ("cols", columns.as_bytes()),
        ("lines", rows.as_bytes()),
    ];

    fields
        .iter()
        .map(|(name, value)| format!("{}={}", name, byte_serialize(value).collect::<String>()))
        .collect::<Vec<_>>()
        .join("&")
}
