//! Page setup shared by the commands that fire events.
//!
//! A [`Session`] is one simulated page load: a [`Page`] backed by the on-disk
//! cookie jar, an agent, and a call surface that has already replayed the
//! settings from config files and flags.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use beacon_core::{
    Agent, Call, CallSurface, CommandQueue, FileCookieJar, HostEnvironment, HttpTransport, Page,
    RecordingTransport, Transport, VisibilityState,
};
use clap::Args;
use tracing::{debug, info};

use crate::config::{BeaconConfig, ConfigLoader};

/// Page and delivery options shared by `page`, `trigger` and `replay`
#[derive(Debug, Clone, Args)]
pub struct HostArgs {
    /// URL of the page the event happens on
    #[arg(long, default_value = "https://example.com/")]
    pub url: String,

    /// Document referrer
    #[arg(long)]
    pub referrer: Option<String>,

    /// User agent reported with the event
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Viewport width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Document visibility: visible, hidden, prerender
    #[arg(long, default_value = "visible")]
    pub visibility: VisibilityState,

    /// Collector base URL (overrides config)
    #[arg(long)]
    pub collector: Option<String>,

    /// Site domain to report (overrides config)
    #[arg(long)]
    pub domain: Option<String>,

    /// Record first-touch referrer and source
    #[arg(long)]
    pub track_acquisition: bool,

    /// Cookie jar file (overrides config)
    #[arg(long)]
    pub cookie_jar: Option<PathBuf>,

    /// Print payloads instead of sending them
    #[arg(long)]
    pub dry_run: bool,
}

pub struct Session {
    surface: CallSurface,
    agent: Arc<Agent>,
    page: Arc<Page>,
    recorder: Option<Arc<RecordingTransport>>,
}

impl Session {
    /// Open a session using the merged user and project config
    pub fn open(args: &HostArgs, queue: CommandQueue) -> Result<Self> {
        let config = ConfigLoader::load()?;
        Self::open_with(args, &config, queue)
    }

    /// Open a session; `queue` runs after the settings calls
    pub fn open_with(args: &HostArgs, config: &BeaconConfig, queue: CommandQueue) -> Result<Self> {
        let jar_path = args
            .cookie_jar
            .clone()
            .unwrap_or_else(|| config.storage.cookie_jar.clone());
        let jar = FileCookieJar::load(&jar_path)
            .with_context(|| format!("Failed to open cookie jar {}", jar_path.display()))?;

        let mut builder = Page::builder(&args.url)
            .visibility(args.visibility)
            .cookies(jar);
        if let Some(referrer) = &args.referrer {
            builder = builder.referrer(referrer.as_str());
        }
        if let Some(user_agent) = &args.user_agent {
            builder = builder.user_agent(user_agent.as_str());
        }
        if let Some(width) = args.width {
            builder = builder.inner_width(width);
        }
        let page = Arc::new(
            builder
                .build()
                .with_context(|| format!("Invalid page URL: {}", args.url))?,
        );

        let recorder = args.dry_run.then(|| Arc::new(RecordingTransport::new()));
        let transport: Arc<dyn Transport> = match &recorder {
            Some(recorder) => recorder.clone(),
            None => {
                let collector = args.collector.as_deref().unwrap_or(&config.collector.url);
                debug!(collector, "Using collector");
                Arc::new(HttpTransport::new(collector)?)
            }
        };

        let mut calls = CommandQueue::new();
        if let Some(domain) = args.domain.as_ref().or(config.tracking.domain.as_ref()) {
            calls.push(Call::new("configure").arg("domain").arg(domain.as_str()));
        }
        if args.track_acquisition || config.tracking.track_acquisition {
            calls.push(Call::new("configure").arg("trackAcquisition").arg(true));
        }
        calls.extend(queue);

        let agent = Agent::new(page.clone(), transport)?;
        let surface = CallSurface::with_queue(calls);
        surface.install(agent.clone());

        Ok(Self {
            surface,
            agent,
            page,
            recorder,
        })
    }

    pub fn call(&self, call: Call) -> Result<()> {
        self.surface.call(call)?;
        Ok(())
    }

    /// Simulate `history.pushState` to `path`
    pub fn navigate(&self, path: &str) -> Result<()> {
        self.page
            .history()
            .push_state(path)
            .with_context(|| format!("Cannot navigate to {}", path))
    }

    /// Wait for in-flight sends, then print dry-run payloads
    pub async fn finish(self) -> Result<()> {
        self.agent.wait_for_deliveries().await;

        if let Some(recorder) = &self.recorder {
            for payload in recorder.payloads() {
                println!("{}", serde_json::to_string(&payload)?);
            }
            info!(events = recorder.sent_count(), "Dry run, nothing sent");
        }

        if self.surface.is_inert() {
            bail!("A queued call failed; later calls were dropped");
        }
        Ok(())
    }

    #[cfg(test)]
    fn recorded(&self) -> Vec<serde_json::Value> {
        self.recorder
            .as_ref()
            .map(|recorder| recorder.payloads())
            .unwrap_or_default()
    }
}
