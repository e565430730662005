//! Per-call facts read from the host environment

use std::sync::OnceLock;

use regex::Regex;

use crate::host::{HostEnvironment, VisibilityState};

/// First of `ref`, `source` or `utm_source` in query order
const SOURCE_PARAM_PATTERN: &str = r"[?&](ref|source|utm_source)=([^?&]+)";

/// Stateless reader over a [`HostEnvironment`]
#[derive(Clone, Copy)]
pub struct ContextReader<'a> {
    env: &'a dyn HostEnvironment,
}

impl<'a> ContextReader<'a> {
    pub fn new(env: &'a dyn HostEnvironment) -> Self {
        Self { env }
    }

    /// `protocol//hostname pathname search`, rebuilt from its parts so ports
    /// and fragments never leak into reported URLs
    pub fn current_url(&self) -> String {
        self.env.location().to_string()
    }

    pub fn hostname(&self) -> String {
        self.env.location().hostname
    }

    /// Acquisition source carried by the current URL, if any
    pub fn acquisition_source_from_query(&self) -> Option<String> {
        source_from_search(&self.env.location().search)
    }

    /// Document referrer, `None` when the page was opened directly
    pub fn referrer(&self) -> Option<String> {
        Some(self.env.referrer()).filter(|r| !r.is_empty())
    }

    pub fn user_agent(&self) -> String {
        self.env.user_agent()
    }

    pub fn screen_width(&self) -> u32 {
        self.env.inner_width()
    }

    pub fn is_localhost(&self) -> bool {
        self.env.location().hostname.ends_with("localhost")
    }

    pub fn is_file_protocol(&self) -> bool {
        self.env.location().protocol == "file:"
    }

    pub fn is_local_environment(&self) -> bool {
        self.is_localhost() || self.is_file_protocol()
    }

    pub fn is_prerendering(&self) -> bool {
        self.env.visibility_state() == VisibilityState::Prerender
    }
}

/// Extract the acquisition source from a `?query` string.
///
/// Values that don't percent-decode to UTF-8 are returned as written.
pub fn source_from_search(search: &str) -> Option<String> {
    let raw = source_param_pattern().captures(search)?.get(2)?.as_str();
    match urlencoding::decode(raw) {
        Ok(decoded) => Some(decoded.into_owned()),
        Err(_) => Some(raw.to_string()),
    }
}

fn source_param_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(SOURCE_PARAM_PATTERN).expect("source param pattern is a valid regex")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Page;

    fn page(url: &str) -> Page {
        Page::builder(url).build().unwrap()
    }

    #[test]
    fn source_pattern_compiles_once() {
        assert!(Regex::new(SOURCE_PARAM_PATTERN).is_ok());
        assert!(std::ptr::eq(source_param_pattern(), source_param_pattern()));
    }

    #[test]
    fn first_listed_param_wins() {
        assert_eq!(source_from_search("?ref=x&utm_source=y"), Some("x".into()));
        assert_eq!(source_from_search("?utm_source=y&ref=x"), Some("y".into()));
    }

    #[test]
    fn source_param_is_recognized() {
        assert_eq!(
            source_from_search("?page=2&source=newsletter"),
            Some("newsletter".into())
        );
    }

    #[test]
    fn unrelated_params_are_ignored() {
        assert_eq!(source_from_search("?utm_medium=email&preference=1"), None);
        assert_eq!(source_from_search(""), None);
    }

    #[test]
    fn empty_value_does_not_match() {
        assert_eq!(source_from_search("?ref=&source=blog"), Some("blog".into()));
    }

    #[test]
    fn value_is_percent_decoded() {
        assert_eq!(
            source_from_search("?utm_source=hacker%20news"),
            Some("hacker news".into())
        );
    }

    #[test]
    fn undecodable_value_is_returned_raw() {
        assert_eq!(source_from_search("?ref=%FF%FE"), Some("%FF%FE".into()));
    }

    #[test]
    fn current_url_is_normalized() {
        let page = page("https://example.com:443/a/b?x=1#frag");
        let reader = ContextReader::new(&page);
        assert_eq!(reader.current_url(), "https://example.com/a/b?x=1");
    }

    #[test]
    fn empty_referrer_reads_as_none() {
        let page = page("https://example.com/");
        let reader = ContextReader::new(&page);
        assert_eq!(reader.referrer(), None);

        page.set_referrer("https://google.com/");
        assert_eq!(reader.referrer(), Some("https://google.com/".into()));
    }

    #[test]
    fn localhost_suffix_counts_as_local() {
        assert!(ContextReader::new(&page("http://localhost:3000/")).is_local_environment());
        assert!(ContextReader::new(&page("http://app.localhost/")).is_local_environment());
        assert!(!ContextReader::new(&page("https://localhost.example.com/")).is_local_environment());
    }

    #[test]
    fn file_protocol_counts_as_local() {
        let page = page("file:///tmp/index.html");
        let reader = ContextReader::new(&page);
        assert!(reader.is_file_protocol());
        assert!(!reader.is_localhost());
        assert!(reader.is_local_environment());
    }

    #[test]
    fn prerender_is_detected() {
        let page = page("https://example.com/");
        let reader = ContextReader::new(&page);
        assert!(!reader.is_prerendering());
        page.set_visibility(VisibilityState::Prerender);
        assert!(reader.is_prerendering());
    }
}
