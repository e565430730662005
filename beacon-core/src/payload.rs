//! Outbound event record

use serde::Serialize;

use crate::attribution::{AttributionRecord, AttributionStore};
use crate::config::RuntimeConfig;
use crate::context::ContextReader;
use crate::host::HostEnvironment;

/// Event name used for page views
pub const PAGEVIEW: &str = "pageview";

/// The record POSTed to the collector
///
/// `referrer` and `source` are always present, `null` when unknown. The
/// `initial_*` fields are present only when acquisition tracking is enabled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventPayload {
    pub name: String,
    pub url: String,
    pub domain: String,
    pub referrer: Option<String>,
    /// Acquisition source of the current visit, not the first-touch one
    pub source: Option<String>,
    pub user_agent: String,
    pub screen_width: u32,
    #[serde(flatten)]
    pub attribution: Option<AttributionRecord>,
}

/// Compose the payload for `event_name` from the current page state
pub fn build(
    event_name: &str,
    config: &RuntimeConfig,
    env: &dyn HostEnvironment,
) -> EventPayload {
    let context = ContextReader::new(env);
    let referrer = context.referrer();
    let source = context.acquisition_source_from_query();

    let attribution = config.track_acquisition.then(|| {
        AttributionStore::new(env.cookies()).get_or_create(referrer.as_deref(), source.as_deref())
    });

    EventPayload {
        name: event_name.to_string(),
        url: context.current_url(),
        domain: config.domain.clone(),
        referrer,
        source,
        user_agent: context.user_agent(),
        screen_width: context.screen_width(),
        attribution,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribution::COOKIE_NAME;
    use crate::host::Page;
    use serde_json::json;

    fn config(track_acquisition: bool) -> RuntimeConfig {
        let mut config = RuntimeConfig::for_hostname("example.com");
        config.track_acquisition = track_acquisition;
        config
    }

    #[test]
    fn pageview_without_referrer_serializes_explicit_nulls() {
        let page = Page::builder("https://example.com/pricing")
            .user_agent("Mozilla/5.0")
            .inner_width(1440)
            .build()
            .unwrap();

        let payload = build(PAGEVIEW, &config(false), &page);
        let value = serde_json::to_value(&payload).unwrap();

        assert_eq!(
            value,
            json!({
                "name": "pageview",
                "url": "https://example.com/pricing",
                "domain": "example.com",
                "referrer": null,
                "source": null,
                "user_agent": "Mozilla/5.0",
                "screen_width": 1440,
            })
        );
        let object = value.as_object().unwrap();
        assert!(!object.contains_key("initial_referrer"));
        assert!(!object.contains_key("initial_source"));
    }

    #[test]
    fn tracking_acquisition_creates_cookie_from_current_context() {
        let page = Page::builder("https://example.com/?utm_source=launch")
            .referrer("https://news.ycombinator.com/")
            .build()
            .unwrap();
        assert!(page.cookies().get(COOKIE_NAME).is_none());

        let payload = build(PAGEVIEW, &config(true), &page);

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["initial_referrer"], "https://news.ycombinator.com/");
        assert_eq!(value["initial_source"], "launch");
        assert!(page.cookies().get(COOKIE_NAME).is_some());
    }

    #[test]
    fn initial_fields_are_null_not_missing_when_tracking() {
        let page = Page::builder("https://example.com/").build().unwrap();
        let value = serde_json::to_value(build(PAGEVIEW, &config(true), &page)).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.get("initial_referrer"), Some(&json!(null)));
        assert_eq!(object.get("initial_source"), Some(&json!(null)));
    }

    #[test]
    fn current_source_is_independent_of_first_touch() {
        let page = Page::builder("https://example.com/?ref=producthunt")
            .build()
            .unwrap();
        build(PAGEVIEW, &config(true), &page);

        page.history().push_state("/docs?source=twitter").unwrap();
        page.set_referrer("https://twitter.com/");
        let payload = build("signup", &config(true), &page);

        assert_eq!(payload.source.as_deref(), Some("twitter"));
        assert_eq!(payload.referrer.as_deref(), Some("https://twitter.com/"));
        let attribution = payload.attribution.unwrap();
        assert_eq!(attribution.initial_source.as_deref(), Some("producthunt"));
        assert_eq!(attribution.initial_referrer, None);
    }

    #[test]
    fn domain_comes_from_config() {
        let page = Page::builder("https://www.example.com/").build().unwrap();
        let mut config = config(false);
        config.domain = "example.com".to_string();
        let payload = build("download", &config, &page);
        assert_eq!(payload.name, "download");
        assert_eq!(payload.domain, "example.com");
        assert_eq!(payload.url, "https://www.example.com/");
    }
}
