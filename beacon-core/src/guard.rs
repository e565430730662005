//! Eligibility guard
//!
//! Decides whether the current page may be tracked at all. None of the
//! checks have side effects; they run cheapest first.

use std::fmt;

use crate::context::ContextReader;

/// Why an event was not sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// `localhost` hostname or `file:` protocol
    RunningLocally,
    /// `document.visibilityState == "prerender"`
    Prerendering,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IgnoreReason::RunningLocally => write!(f, "website is running locally"),
            IgnoreReason::Prerendering => write!(f, "document is prerendering"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Allowed,
    Ignored(IgnoreReason),
}

impl Eligibility {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Eligibility::Allowed)
    }
}

pub fn should_track(context: &ContextReader<'_>) -> Eligibility {
    if context.is_localhost() || context.is_file_protocol() {
        return Eligibility::Ignored(IgnoreReason::RunningLocally);
    }
    if context.is_prerendering() {
        return Eligibility::Ignored(IgnoreReason::Prerendering);
    }
    Eligibility::Allowed
}
