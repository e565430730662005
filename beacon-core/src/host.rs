//! Host environment
//!
//! Everything the agent knows about the page it is embedded in comes through
//! [`HostEnvironment`]. [`Page`] is the in-process implementation used by the
//! CLI and by tests; an embedding with a real document would provide its own.

use std::fmt;
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::cookie::{CookieJar, MemoryCookieJar};
use crate::navigation::History;

/// `document.visibilityState`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisibilityState {
    #[default]
    Visible,
    Hidden,
    Prerender,
}

impl std::str::FromStr for VisibilityState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "visible" => Ok(Self::Visible),
            "hidden" => Ok(Self::Hidden),
            "prerender" => Ok(Self::Prerender),
            other => Err(format!("unknown visibility state: {}", other)),
        }
    }
}

/// The parts of `window.location` the agent reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Scheme including the trailing colon, e.g. `https:`
    pub protocol: String,
    /// Host without port; empty for `file:` URLs
    pub hostname: String,
    pub pathname: String,
    /// Query string including the leading `?`, or empty
    pub search: String,
}

impl Location {
    pub fn parse(input: &str) -> Result<Self, url::ParseError> {
        Ok(Self::from_url(&Url::parse(input)?))
    }

    fn from_url(url: &Url) -> Self {
        Self {
            protocol: format!("{}:", url.scheme()),
            hostname: url.host_str().unwrap_or_default().to_string(),
            pathname: url.path().to_string(),
            search: match url.query() {
                Some(query) if !query.is_empty() => format!("?{}", query),
                _ => String::new(),
            },
        }
    }

    /// Resolve a possibly relative target the way `history.pushState` does
    pub fn resolve(&self, target: &str) -> Result<Self, url::ParseError> {
        let base = Url::parse(&self.to_string())?;
        Ok(Self::from_url(&base.join(target)?))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}//{}{}{}",
            self.protocol, self.hostname, self.pathname, self.search
        )
    }
}

/// What the agent can observe about its embedding page
pub trait HostEnvironment: Send + Sync {
    fn location(&self) -> Location;

    /// `document.referrer`; empty when there is none
    fn referrer(&self) -> String;

    fn user_agent(&self) -> String;

    /// `window.innerWidth`
    fn inner_width(&self) -> u32;

    fn visibility_state(&self) -> VisibilityState;

    fn cookies(&self) -> &dyn CookieJar;

    fn history(&self) -> &History;
}

#[derive(Debug, Clone)]
struct Document {
    referrer: String,
    user_agent: String,
    inner_width: u32,
    visibility: VisibilityState,
}

/// In-process page
///
/// ```
/// use beacon_core::host::{HostEnvironment, Page};
///
/// let page = Page::builder("https://example.com/blog?ref=news")
///     .referrer("https://news.ycombinator.com/")
///     .build()
///     .unwrap();
/// assert_eq!(page.location().hostname, "example.com");
/// ```
pub struct Page {
    document: RwLock<Document>,
    history: History,
    cookies: Box<dyn CookieJar>,
}

impl Page {
    pub fn builder(url: &str) -> PageBuilder {
        PageBuilder::new(url)
    }

    pub fn set_referrer(&self, referrer: impl Into<String>) {
        self.document_mut().referrer = referrer.into();
    }

    pub fn set_visibility(&self, visibility: VisibilityState) {
        self.document_mut().visibility = visibility;
    }

    pub fn set_inner_width(&self, width: u32) {
        self.document_mut().inner_width = width;
    }

    fn document(&self) -> Document {
        self.document
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn document_mut(&self) -> std::sync::RwLockWriteGuard<'_, Document> {
        self.document.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl HostEnvironment for Page {
    fn location(&self) -> Location {
        self.history.current()
    }

    fn referrer(&self) -> String {
        self.document().referrer
    }

    fn user_agent(&self) -> String {
        self.document().user_agent
    }

    fn inner_width(&self) -> u32 {
        self.document().inner_width
    }

    fn visibility_state(&self) -> VisibilityState {
        self.document().visibility
    }

    fn cookies(&self) -> &dyn CookieJar {
        self.cookies.as_ref()
    }

    fn history(&self) -> &History {
        &self.history
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("location", &self.history.current().to_string())
            .field("document", &self.document())
            .finish()
    }
}

/// Default user agent reported by [`Page`]
pub const DEFAULT_USER_AGENT: &str = concat!("beacon/", env!("CARGO_PKG_VERSION"));

/// Default viewport width reported by [`Page`]
pub const DEFAULT_INNER_WIDTH: u32 = 1280;

/// Builder for [`Page`]
pub struct PageBuilder {
    url: String,
    document: Document,
    cookies: Option<Box<dyn CookieJar>>,
}

impl PageBuilder {
    fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            document: Document {
                referrer: String::new(),
                user_agent: DEFAULT_USER_AGENT.to_string(),
                inner_width: DEFAULT_INNER_WIDTH,
                visibility: VisibilityState::Visible,
            },
            cookies: None,
        }
    }

    pub fn referrer(mut self, referrer: impl Into<String>) -> Self {
        self.document.referrer = referrer.into();
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.document.user_agent = user_agent.into();
        self
    }

    pub fn inner_width(mut self, width: u32) -> Self {
        self.document.inner_width = width;
        self
    }

    pub fn visibility(mut self, visibility: VisibilityState) -> Self {
        self.document.visibility = visibility;
        self
    }

    /// Use `jar` instead of a fresh [`MemoryCookieJar`]
    pub fn cookies(mut self, jar: impl CookieJar + 'static) -> Self {
        self.cookies = Some(Box::new(jar));
        self
    }

    pub fn build(self) -> Result<Page, url::ParseError> {
        let location = Location::parse(&self.url)?;
        Ok(Page {
            document: RwLock::new(self.document),
            history: History::new(location),
            cookies: self
                .cookies
                .unwrap_or_else(|| Box::new(MemoryCookieJar::new())),
        })
    }
}
