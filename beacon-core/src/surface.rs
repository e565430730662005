//! Public call surface
//!
//! Host code talks to the agent through named operations:
//!
//! | name             | arguments                   |
//! |------------------|-----------------------------|
//! | `page`           | -                           |
//! | `trigger`        | event name                  |
//! | `trackPushState` | -                           |
//! | `configure`      | option name, option value   |
//!
//! `page` and `trigger` additionally take a completion callback through
//! [`Call::with_callback`].
//!
//! Calls made before the agent exists are buffered by [`CallSurface`] and
//! replayed in order once [`CallSurface::install`] runs.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::agent::Agent;
use crate::error::{BeaconError, Result};
use crate::host::HostEnvironment;
use crate::transport::Transport;

/// Completion callback, run once the send reaches a terminal state
pub struct Callback(Box<dyn FnOnce() + Send + 'static>);

impl Callback {
    pub fn new(f: impl FnOnce() + Send + 'static) -> Self {
        Self(Box::new(f))
    }

    pub fn invoke(self) {
        (self.0)()
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callback")
    }
}

/// Options accepted by `page` and `trigger`
#[derive(Debug, Default)]
pub struct TriggerOptions {
    pub callback: Option<Callback>,
}

impl TriggerOptions {
    pub fn with_callback(f: impl FnOnce() + Send + 'static) -> Self {
        Self {
            callback: Some(Callback::new(f)),
        }
    }
}

/// An operation name with its raw arguments
#[derive(Debug)]
pub struct Call {
    pub name: String,
    pub args: Vec<Value>,
    pub options: TriggerOptions,
}

impl Call {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            options: TriggerOptions::default(),
        }
    }

    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn with_callback(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.options = TriggerOptions::with_callback(f);
        self
    }

    /// Parse the queued-call shape `["name", arg, ...]`
    pub fn from_json(value: Value) -> Result<Self> {
        let Value::Array(mut items) = value else {
            return Err(BeaconError::Bootstrap(format!(
                "queued call must be an array, got {}",
                value
            )));
        };
        if items.is_empty() {
            return Err(BeaconError::Bootstrap("queued call is empty".to_string()));
        }
        let Value::String(name) = items.remove(0) else {
            return Err(BeaconError::Bootstrap(
                "queued call must start with an operation name".to_string(),
            ));
        };
        Ok(Self {
            name,
            args: items,
            options: TriggerOptions::default(),
        })
    }
}

/// A resolved operation
#[derive(Debug)]
pub enum Operation {
    Page { options: TriggerOptions },
    Trigger { name: String, options: TriggerOptions },
    TrackPushState,
    Configure { key: String, value: Value },
}

type Resolver = fn(Call) -> Result<Operation>;

const OPERATIONS: [(&str, Resolver); 4] = [
    ("page", resolve_page),
    ("trigger", resolve_trigger),
    ("trackPushState", resolve_track_push_state),
    ("configure", resolve_configure),
];

impl Operation {
    /// Look `call.name` up in the operation table
    pub fn parse(call: Call) -> Result<Self> {
        let resolve = OPERATIONS
            .iter()
            .find(|(name, _)| *name == call.name)
            .map(|(_, resolve)| *resolve)
            .ok_or_else(|| BeaconError::UnknownOperation(call.name.clone()))?;
        resolve(call)
    }

    /// Names of all registered operations
    pub fn names() -> impl Iterator<Item = &'static str> {
        OPERATIONS.iter().map(|(name, _)| *name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::Page { .. } => "page",
            Operation::Trigger { .. } => "trigger",
            Operation::TrackPushState => "trackPushState",
            Operation::Configure { .. } => "configure",
        }
    }
}

fn resolve_page(call: Call) -> Result<Operation> {
    Ok(Operation::Page {
        options: call.options,
    })
}

fn resolve_trigger(call: Call) -> Result<Operation> {
    match call.args.first() {
        Some(Value::String(name)) => Ok(Operation::Trigger {
            name: name.clone(),
            options: call.options,
        }),
        Some(other) => Err(BeaconError::invalid_arguments(
            "trigger",
            format!("event name must be a string, got {}", other),
        )),
        None => Err(BeaconError::invalid_arguments(
            "trigger",
            "missing event name",
        )),
    }
}

fn resolve_track_push_state(_call: Call) -> Result<Operation> {
    Ok(Operation::TrackPushState)
}

fn resolve_configure(call: Call) -> Result<Operation> {
    let mut args = call.args.into_iter();
    let key = match args.next() {
        Some(Value::String(key)) => key,
        Some(other) => {
            return Err(BeaconError::invalid_arguments(
                "configure",
                format!("option name must be a string, got {}", other),
            ));
        }
        None => return Err(BeaconError::invalid_arguments("configure", "missing option name")),
    };
    let value = args.next().ok_or_else(|| {
        BeaconError::invalid_arguments("configure", format!("missing value for {}", key))
    })?;
    Ok(Operation::Configure { key, value })
}

/// Calls captured before the agent was installed
#[derive(Debug, Default)]
pub struct CommandQueue {
    calls: Vec<Call>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, call: Call) {
        self.calls.push(call);
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Parse a JSON array of queued calls, e.g.
    /// `[["configure", "domain", "a.com"], ["page"]]`
    pub fn from_json(input: &str) -> Result<Self> {
        let items: Vec<Value> = serde_json::from_str(input)?;
        let calls = items
            .into_iter()
            .map(Call::from_json)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { calls })
    }
}

impl Extend<Call> for CommandQueue {
    fn extend<T: IntoIterator<Item = Call>>(&mut self, iter: T) {
        self.calls.extend(iter);
    }
}

impl IntoIterator for CommandQueue {
    type Item = Call;
    type IntoIter = std::vec::IntoIter<Call>;

    fn into_iter(self) -> Self::IntoIter {
        self.calls.into_iter()
    }
}

enum SurfaceState {
    Buffering(CommandQueue),
    Live(Arc<Agent>),
    /// Bootstrap failed; calls are dropped
    Inert,
}

/// Single entry point for host calls
///
/// ```
/// use beacon_core::surface::{Call, CallSurface};
///
/// let surface = CallSurface::new();
/// surface.call(Call::new("configure").arg("domain").arg("example.com")).unwrap();
/// assert_eq!(surface.pending(), 1);
/// ```
pub struct CallSurface {
    state: Mutex<SurfaceState>,
}

impl Default for CallSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl CallSurface {
    pub fn new() -> Self {
        Self::with_queue(CommandQueue::new())
    }

    /// Start buffering on top of calls the host already queued
    pub fn with_queue(queue: CommandQueue) -> Self {
        Self {
            state: Mutex::new(SurfaceState::Buffering(queue)),
        }
    }

    /// Buffer, dispatch or drop `call` depending on the surface state.
    ///
    /// While live, an unknown operation or bad arguments are returned to the
    /// caller.
    pub fn call(&self, call: Call) -> Result<()> {
        let agent = {
            let mut state = self.lock();
            match &mut *state {
                SurfaceState::Buffering(queue) => {
                    debug!(operation = %call.name, "Buffering call until agent is installed");
                    queue.push(call);
                    return Ok(());
                }
                SurfaceState::Live(agent) => Arc::clone(agent),
                SurfaceState::Inert => {
                    debug!(operation = %call.name, "Agent is inert, dropping call");
                    return Ok(());
                }
            }
        };

        agent.dispatch_call(call).inspect_err(|e| {
            error!("{}", e);
        })
    }

    /// Create an agent for `env` and install it
    pub fn start(&self, env: Arc<dyn HostEnvironment>, transport: Arc<dyn Transport>) {
        match Agent::new(env, transport) {
            Ok(agent) => self.install(agent),
            Err(e) => {
                error!("{}", e);
                *self.lock() = SurfaceState::Inert;
            }
        }
    }

    /// Go live and replay buffered calls in order.
    ///
    /// A queued `configure` with a bad value is skipped with a warning and the
    /// previous value is kept. Any other failure is reported through the
    /// agent's fallback channel, the agent is halted and the surface becomes
    /// inert.
    pub fn install(&self, agent: Arc<Agent>) {
        let queue = {
            let mut state = self.lock();
            match std::mem::replace(&mut *state, SurfaceState::Live(Arc::clone(&agent))) {
                SurfaceState::Buffering(queue) => queue,
                previous => {
                    *state = previous;
                    warn!("Call surface is already installed");
                    return;
                }
            }
        };

        info!(queued = queue.len(), "Agent installed");
        for call in queue {
            match agent.dispatch_call(call) {
                Ok(()) => {}
                Err(BeaconError::InvalidArguments {
                    operation: "configure",
                    reason,
                }) => warn!("Skipping queued configure: {}", reason),
                Err(e) => {
                    agent.report(&BeaconError::Bootstrap(e.to_string()));
                    agent.halt();
                    *self.lock() = SurfaceState::Inert;
                    return;
                }
            }
        }
    }

    /// Calls waiting for installation
    pub fn pending(&self) -> usize {
        match &*self.lock() {
            SurfaceState::Buffering(queue) => queue.len(),
            _ => 0,
        }
    }

    pub fn agent(&self) -> Option<Arc<Agent>> {
        match &*self.lock() {
            SurfaceState::Live(agent) => Some(Arc::clone(agent)),
            _ => None,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(&*self.lock(), SurfaceState::Live(_))
    }

    pub fn is_inert(&self) -> bool {
        matches!(&*self.lock(), SurfaceState::Inert)
    }

    fn lock(&self) -> MutexGuard<'_, SurfaceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_every_registered_operation() {
        let page = Operation::parse(Call::new("page")).unwrap();
        assert!(matches!(page, Operation::Page { .. }));

        let trigger = Operation::parse(Call::new("trigger").arg("signup")).unwrap();
        assert!(matches!(trigger, Operation::Trigger { ref name, .. } if name == "signup"));

        let track = Operation::parse(Call::new("trackPushState")).unwrap();
        assert!(matches!(track, Operation::TrackPushState));

        let configure =
            Operation::parse(Call::new("configure").arg("domain").arg("a.com")).unwrap();
        match configure {
            Operation::Configure { key, value } => {
                assert_eq!(key, "domain");
                assert_eq!(value, json!("a.com"));
            }
            other => panic!("expected configure, got {:?}", other),
        }
    }

    #[test]
    fn unknown_operation_fails() {
        let err = Operation::parse(Call::new("identify")).unwrap_err();
        assert!(matches!(err, BeaconError::UnknownOperation(ref name) if name == "identify"));
    }

    #[test]
    fn trigger_requires_string_name() {
        assert!(matches!(
            Operation::parse(Call::new("trigger")),
            Err(BeaconError::InvalidArguments { .. })
        ));
        assert!(matches!(
            Operation::parse(Call::new("trigger").arg(42)),
            Err(BeaconError::InvalidArguments { .. })
        ));
    }

    #[test]
    fn configure_requires_key_and_value() {
        assert!(Operation::parse(Call::new("configure")).is_err());
        assert!(Operation::parse(Call::new("configure").arg("domain")).is_err());
        assert!(Operation::parse(Call::new("configure").arg(false).arg(true)).is_err());
    }

    #[test]
    fn callback_travels_with_the_operation() {
        let call = Call::new("trigger").arg("download").with_callback(|| {});
        match Operation::parse(call).unwrap() {
            Operation::Trigger { options, .. } => assert!(options.callback.is_some()),
            other => panic!("expected trigger, got {:?}", other),
        }
    }

    #[test]
    fn operation_names_match_table() {
        let names: Vec<_> = Operation::names().collect();
        assert_eq!(names, vec!["page", "trigger", "trackPushState", "configure"]);
        assert_eq!(Operation::TrackPushState.name(), "trackPushState");
    }

    #[test]
    fn queue_parses_from_json() {
        let queue =
            CommandQueue::from_json(r#"[["configure", "domain", "a.com"], ["page"]]"#).unwrap();
        let calls: Vec<_> = queue.into_iter().collect();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "configure");
        assert_eq!(calls[0].args, vec![json!("domain"), json!("a.com")]);
        assert_eq!(calls[1].name, "page");
        assert!(calls[1].args.is_empty());
    }

    #[test]
    fn queue_rejects_malformed_entries() {
        assert!(CommandQueue::from_json(r#"[[]]"#).is_err());
        assert!(CommandQueue::from_json(r#"[[1, 2]]"#).is_err());
        assert!(CommandQueue::from_json(r#"["page"]"#).is_err());
        assert!(CommandQueue::from_json("not json").is_err());
    }

    #[test]
    fn surface_buffers_before_install() {
        let surface = CallSurface::new();
        surface.call(Call::new("page")).unwrap();
        surface.call(Call::new("bogus")).unwrap();
        assert_eq!(surface.pending(), 2);
        assert!(!surface.is_live());
        assert!(surface.agent().is_none());
    }
}
