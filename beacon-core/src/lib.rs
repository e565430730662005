//! beacon-core: event enrichment and delivery for the beacon analytics agent
//!
//! The crate decides whether an event may be sent, builds its payload
//! (including first-touch attribution kept in a first-party cookie) and
//! hands it to a [`Transport`] exactly once per trigger:
//!
//! - **Call surface** - [`CallSurface`] buffers host calls until an [`Agent`]
//!   is installed, then dispatches `page`, `trigger`, `trackPushState` and
//!   `configure`
//! - **Eligibility** - [`guard::should_track`] skips local and prerendered pages
//! - **Payloads** - [`payload::build`] combines [`ContextReader`] facts with
//!   [`AttributionStore`] data
//! - **Delivery** - [`HttpTransport`] posts to `{collector}/api/event` and
//!   reports failures to `{collector}/api/error`
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use beacon_core::{Call, CallSurface, HttpTransport, Page};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let surface = CallSurface::new();
//!     // Calls made before the agent exists are queued
//!     surface.call(Call::new("configure").arg("trackAcquisition").arg(true))?;
//!     surface.call(Call::new("page"))?;
//!
//!     let page = Arc::new(Page::builder("https://example.com/?ref=newsletter").build()?);
//!     let transport = Arc::new(HttpTransport::new("https://plausible.io")?);
//!     surface.start(page, transport);
//!
//!     if let Some(agent) = surface.agent() {
//!         agent.wait_for_deliveries().await;
//!     }
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod attribution;
pub mod config;
pub mod context;
pub mod cookie;
pub mod error;
pub mod guard;
pub mod host;
pub mod navigation;
pub mod payload;
pub mod surface;
pub mod transport;

pub use agent::Agent;
pub use attribution::{AttributionRecord, AttributionStore};
pub use config::RuntimeConfig;
pub use context::ContextReader;
pub use cookie::{Cookie, CookieJar, FileCookieJar, MemoryCookieJar, SameSite};
pub use error::{BeaconError, Result, StorageError, TransportError};
pub use guard::{Eligibility, IgnoreReason};
pub use host::{HostEnvironment, Location, Page, VisibilityState};
pub use navigation::{History, NavigationKind, NavigationObserver};
pub use payload::EventPayload;
pub use surface::{Call, CallSurface, Callback, CommandQueue, Operation, TriggerOptions};
pub use transport::{Delivery, HttpTransport, RecordingTransport, Transport};
