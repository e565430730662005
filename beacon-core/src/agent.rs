//! The tracking agent
//!
//! One [`Agent`] exists per page load. It owns the runtime configuration and
//! turns operations into deliveries:
//!
//! ```text
//! operation ─▶ eligibility guard ─▶ payload builder ─▶ transport ─▶ callback
//!                    │                    │
//!                    ▼                    ▼
//!               warn + abort      context + attribution
//! ```
//!
//! Each send runs as its own task so the calling code never waits on the
//! network. Failures inside a trigger are reported once on the fallback
//! channel and never reach the caller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use serde_json::Value;
use tokio::runtime::Handle;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, warn};

use crate::config::RuntimeConfig;
use crate::context::ContextReader;
use crate::error::{BeaconError, Result};
use crate::guard::{self, Eligibility};
use crate::host::HostEnvironment;
use crate::navigation::{NavigationKind, NavigationObserver};
use crate::payload::{self, PAGEVIEW};
use crate::surface::{Call, Operation, TriggerOptions};
use crate::transport::Transport;

pub struct Agent {
    env: Arc<dyn HostEnvironment>,
    transport: Arc<dyn Transport>,
    config: RwLock<RuntimeConfig>,
    tracking_navigation: AtomicBool,
    halted: AtomicBool,
    deliveries: TaskTracker,
    runtime: Handle,
}

impl Agent {
    /// Create an agent for `env`. Must be called within a tokio runtime.
    pub fn new(env: Arc<dyn HostEnvironment>, transport: Arc<dyn Transport>) -> Result<Arc<Self>> {
        let runtime = Handle::try_current().map_err(|e| BeaconError::Bootstrap(e.to_string()))?;
        let config = RuntimeConfig::for_hostname(env.location().hostname);

        Ok(Arc::new(Self {
            env,
            transport,
            config: RwLock::new(config),
            tracking_navigation: AtomicBool::new(false),
            halted: AtomicBool::new(false),
            deliveries: TaskTracker::new(),
            runtime,
        }))
    }

    pub fn env(&self) -> &dyn HostEnvironment {
        self.env.as_ref()
    }

    /// Snapshot of the current configuration
    pub fn config(&self) -> RuntimeConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Resolve and run a raw call
    pub fn dispatch_call(self: &Arc<Self>, call: Call) -> Result<()> {
        let operation = Operation::parse(call)?;
        self.dispatch(operation)
    }

    pub fn dispatch(self: &Arc<Self>, operation: Operation) -> Result<()> {
        match operation {
            Operation::Page { options } => self.page(options),
            Operation::Trigger { name, options } => self.trigger(&name, options),
            Operation::TrackPushState => self.track_push_state(),
            Operation::Configure { key, value } => self.configure(&key, value)?,
        }
        Ok(())
    }

    /// Fire a page view for the current location
    pub fn page(&self, options: TriggerOptions) {
        self.trigger(PAGEVIEW, options);
    }

    /// Fire a named event.
    ///
    /// Returns as soon as the send is handed off. The callback runs when the
    /// send finishes, whatever its outcome, and never runs for ignored
    /// events.
    pub fn trigger(&self, event_name: &str, options: TriggerOptions) {
        if self.is_halted() {
            debug!(event = event_name, "Agent is halted, dropping event");
            return;
        }

        let context = ContextReader::new(self.env.as_ref());
        if let Eligibility::Ignored(reason) = guard::should_track(&context) {
            warn!("[beacon] Ignoring event because {}", reason);
            return;
        }

        if let Err(e) = self.deliver(event_name, options) {
            self.report(&e);
        }
    }

    fn deliver(&self, event_name: &str, options: TriggerOptions) -> Result<()> {
        let config = self.config();
        let payload = payload::build(event_name, &config, self.env.as_ref());
        let body = serde_json::to_string(&payload)?;
        debug!(event = event_name, url = %payload.url, "Sending event");

        let transport = Arc::clone(&self.transport);
        let event = event_name.to_string();
        self.deliveries.spawn_on(
            async move {
                match transport.send(body).await {
                    Ok(delivery) => {
                        debug!(event = %event, status = ?delivery.status, "Event delivered")
                    }
                    Err(e) => debug!(event = %event, "Event dropped: {}", e),
                }
                if let Some(callback) = options.callback {
                    callback.invoke();
                }
            },
            &self.runtime,
        );
        Ok(())
    }

    /// Log `error` and send it to the fallback error endpoint
    pub fn report(&self, error: &BeaconError) {
        error!("{}", error);
        let transport = Arc::clone(&self.transport);
        let message = error.to_string();
        self.deliveries.spawn_on(
            async move { transport.report_error(&message).await },
            &self.runtime,
        );
    }

    /// Set one runtime option
    pub fn configure(&self, key: &str, value: Value) -> Result<()> {
        let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);
        config.set(key, value)?;
        debug!(key, "Configured");
        Ok(())
    }

    /// Fire a page view on every later `pushState` and back/forward
    /// navigation. Installed at most once; never removed.
    pub fn track_push_state(self: &Arc<Self>) {
        if self.tracking_navigation.swap(true, Ordering::SeqCst) {
            debug!("Navigation tracking already installed");
            return;
        }
        self.env.history().observe(Arc::new(PageviewOnNavigation {
            agent: Arc::downgrade(self),
        }));
        debug!("Navigation tracking installed");
    }

    /// Stop sending events for good. Installed navigation hooks stay in
    /// place but fire nothing.
    pub fn halt(&self) {
        self.halted.store(true, Ordering::SeqCst);
    }

    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    pub fn is_tracking_navigation(&self) -> bool {
        self.tracking_navigation.load(Ordering::SeqCst)
    }

    /// Sends and error reports still in flight
    pub fn in_flight(&self) -> usize {
        self.deliveries.len()
    }

    /// Wait until every send started so far has finished.
    ///
    /// A hung request makes this wait forever; callers that need a bound
    /// should wrap it in `tokio::time::timeout`.
    pub async fn wait_for_deliveries(&self) {
        self.deliveries.close();
        self.deliveries.wait().await;
        self.deliveries.reopen();
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("config", &self.config())
            .field("tracking_navigation", &self.is_tracking_navigation())
            .field("halted", &self.is_halted())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

// Holds the agent weakly: the agent owns the host, which owns the history,
// which owns this observer.
struct PageviewOnNavigation {
    agent: Weak<Agent>,
}

impl NavigationObserver for PageviewOnNavigation {
    fn on_route_change(&self, kind: NavigationKind) {
        if let Some(agent) = self.agent.upgrade().filter(|agent| !agent.is_halted()) {
            debug!(?kind, "Route changed");
            agent.page(TriggerOptions::default());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Page;
    use crate::transport::RecordingTransport;
    use serde_json::json;

    fn agent_for(url: &str) -> (Arc<Agent>, Arc<RecordingTransport>) {
        let page = Arc::new(Page::builder(url).build().unwrap());
        let transport = Arc::new(RecordingTransport::new());
        let agent = Agent::new(page, transport.clone()).unwrap();
        (agent, transport)
    }

    #[test]
    fn new_requires_runtime() {
        let page = Arc::new(Page::builder("https://example.com/").build().unwrap());
        let result = Agent::new(page, Arc::new(RecordingTransport::new()));
        assert!(matches!(result, Err(BeaconError::Bootstrap(_))));
    }

    #[tokio::test]
    async fn default_domain_is_hostname() {
        let (agent, _) = agent_for("https://blog.example.com/post");
        assert_eq!(agent.config().domain, "blog.example.com");
    }

    #[tokio::test]
    async fn configure_rejects_bad_values_without_reporting() {
        let (agent, transport) = agent_for("https://example.com/");
        let err = agent.configure("domain", json!(5)).unwrap_err();
        assert!(matches!(err, BeaconError::InvalidArguments { .. }));
        agent.wait_for_deliveries().await;
        assert!(transport.errors().is_empty());
    }

    #[tokio::test]
    async fn trigger_sends_event_body() {
        let (agent, transport) = agent_for("https://example.com/checkout");
        agent.trigger("purchase", TriggerOptions::default());
        agent.wait_for_deliveries().await;

        let payloads = transport.payloads();
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0]["name"], "purchase");
        assert_eq!(payloads[0]["url"], "https://example.com/checkout");
    }

    #[tokio::test]
    async fn track_push_state_installs_once() {
        let (agent, _) = agent_for("https://example.com/");
        agent.track_push_state();
        agent.track_push_state();
        assert!(agent.is_tracking_navigation());
        assert_eq!(agent.env().history().observer_count(), 1);
    }

    #[tokio::test]
    async fn halted_agent_sends_nothing() {
        let (agent, transport) = agent_for("https://example.com/");
        agent.track_push_state();
        agent.halt();

        agent.trigger("signup", TriggerOptions::with_callback(|| panic!("must not run")));
        agent.page(TriggerOptions::default());
        agent.env().history().push_state("/later").unwrap();
        agent.wait_for_deliveries().await;

        assert!(agent.is_halted());
        assert_eq!(transport.sent_count(), 0);
    }

    #[tokio::test]
    async fn report_goes_to_fallback_channel() {
        let (agent, transport) = agent_for("https://example.com/");
        agent.report(&BeaconError::Bootstrap("boom".to_string()));
        agent.wait_for_deliveries().await;
        assert_eq!(transport.errors(), vec!["Bootstrap failed: boom".to_string()]);
    }
}
