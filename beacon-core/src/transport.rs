//! Delivery to the collector
//!
//! Sends are fire-and-forget: the status code is reported for logging but
//! never classified, and there is no retry and no timeout. Errors go to a
//! separate fallback endpoint.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::TransportError;

/// Collector path for events
pub const EVENT_PATH: &str = "/api/event";

/// Collector path for error reports
pub const ERROR_PATH: &str = "/api/error";

/// Terminal state of a send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    /// HTTP status when the collector answered
    pub status: Option<u16>,
}

/// Carries serialized payloads to the collector
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST one JSON event body
    async fn send(&self, body: String) -> Result<Delivery, TransportError>;

    /// Report an error message on the fallback channel; never fails
    async fn report_error(&self, message: &str);
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport for the collector at `base_url`
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        Url::parse(base_url)?;
        Ok(Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn event_url(&self) -> Result<Url, TransportError> {
        Ok(Url::parse(&format!("{}{}", self.base_url, EVENT_PATH))?)
    }

    pub fn error_url(&self, message: &str) -> Result<Url, TransportError> {
        Ok(Url::parse(&format!(
            "{}{}?message={}",
            self.base_url,
            ERROR_PATH,
            urlencoding::encode(message)
        ))?)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, body: String) -> Result<Delivery, TransportError> {
        let url = self.event_url()?;
        // text/plain keeps this a simple request for browsers (no preflight)
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "text/plain")
            .body(body)
            .send()
            .await?;

        Ok(Delivery {
            status: Some(response.status().as_u16()),
        })
    }

    async fn report_error(&self, message: &str) {
        let url = match self.error_url(message) {
            Ok(url) => url,
            Err(e) => {
                debug!("Cannot build error report URL: {}", e);
                return;
            }
        };
        if let Err(e) = self.client.get(url).send().await {
            debug!("Error report was not delivered: {}", e);
        }
    }
}

/// In-memory transport that records what it was asked to send
///
/// Used by tests and by `beacon --dry-run`.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    events: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
    refuse: bool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport whose sends all end in a network error
    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    /// Raw bodies in send order
    pub fn bodies(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Bodies parsed as JSON; unparseable bodies are skipped
    pub fn payloads(&self) -> Vec<Value> {
        self.bodies()
            .iter()
            .filter_map(|body| serde_json::from_str(body).ok())
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn sent_count(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, body: String) -> Result<Delivery, TransportError> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(body);
        if self.refuse {
            return Err(TransportError::Refused("recording transport refuses sends".into()));
        }
        Ok(Delivery { status: None })
    }

    async fn report_error(&self, message: &str) {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }
}
