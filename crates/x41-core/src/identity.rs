//! Signed-in handle detection.
//!
//! Resolution runs a cascade: the persisted cache, then an ordered list of
//! [`IdentityProbe`]s against the live page, then the same probes polled on a
//! fixed delay until the attempt budget runs out. The first hit wins and is
//! written back to storage; storage failures are logged and otherwise ignored.

use std::sync::OnceLock;

use regex::Regex;
use web_time::Duration;

use crate::config::EngineConfig;
use crate::error::IdentityError;
use crate::host::{KeyValueStore, PageProbe, Sleeper};
use crate::route::{handle_from_path, is_valid_handle};

pub const PROFILE_LINK_SELECTORS: &[&str] = &[
    r#"a[data-testid="AppTabBar_Profile_Link"]"#,
    r#"nav[role="navigation"] a[href$="/profile"]"#,
];
pub const LABELLED_PROFILE_LINK_SELECTOR: &str = r#"a[href^="/"][aria-label*="Profile"]"#;

/// Markers that put a bare `screen_name` inside the signed-in user's own context.
const AUTH_CONTEXT_MARKERS: &[&str] = &["isLoggedIn", "authenticate"];

/// One independently triable way of finding the handle on the page.
pub trait IdentityProbe {
    fn name(&self) -> &'static str;
    fn probe(&self, page: &dyn PageProbe) -> Option<String>;
}

fn viewer_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r#""viewer"\s*:\s*\{[^}]*"screen_name"\s*:\s*"([A-Za-z0-9_]+)""#).ok()
        })
        .as_ref()
}

fn screen_name_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r#""screen_name"\s*:\s*"([A-Za-z0-9_]+)""#).ok())
        .as_ref()
}

fn first_capture(pattern: &Regex, haystack: &str) -> Option<String> {
    pattern
        .captures(haystack)
        .and_then(|captures| captures.get(1))
        .map(|capture| capture.as_str().to_string())
        .filter(|handle| is_valid_handle(handle))
}

/// Embedded identity records in inline scripts. A record anchored to the
/// `viewer` object beats a bare `screen_name`, which may belong to anyone in
/// the feed.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptRecordProbe;

impl IdentityProbe for ScriptRecordProbe {
    fn name(&self) -> &'static str {
        "script_record"
    }

    fn probe(&self, page: &dyn PageProbe) -> Option<String> {
        let scripts = page.inline_scripts();
        if let Some(viewer) = viewer_pattern() {
            if let Some(handle) = scripts.iter().find_map(|script| first_capture(viewer, script)) {
                return Some(handle);
            }
        }
        let bare = screen_name_pattern()?;
        scripts
            .iter()
            .filter(|script| AUTH_CONTEXT_MARKERS.iter().any(|marker| script.contains(marker)))
            .find_map(|script| first_capture(bare, script))
    }
}

/// The host's own profile navigation link.
#[derive(Debug, Default, Clone, Copy)]
pub struct NavigationLinkProbe;

impl IdentityProbe for NavigationLinkProbe {
    fn name(&self) -> &'static str {
        "navigation_link"
    }

    fn probe(&self, page: &dyn PageProbe) -> Option<String> {
        PROFILE_LINK_SELECTORS.iter().find_map(|selector| {
            page.hrefs(selector)
                .first()
                .and_then(|href| handle_from_path(href))
        })
    }
}

/// Any accessibility-labelled profile link pointing at a single-segment path.
#[derive(Debug, Default, Clone, Copy)]
pub struct LabelledProfileLinkProbe;

impl IdentityProbe for LabelledProfileLinkProbe {
    fn name(&self) -> &'static str {
        "labelled_profile_link"
    }

    fn probe(&self, page: &dyn PageProbe) -> Option<String> {
        page.hrefs(LABELLED_PROFILE_LINK_SELECTOR)
            .iter()
            .find_map(|href| handle_from_path(href))
    }
}

pub struct IdentityResolver {
    probes: Vec<Box<dyn IdentityProbe>>,
    retry_limit: u32,
    retry_delay: Duration,
    storage_key: String,
}

impl IdentityResolver {
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_probes(
            vec![
                Box::new(ScriptRecordProbe),
                Box::new(NavigationLinkProbe),
                Box::new(LabelledProfileLinkProbe),
            ],
            config,
        )
    }

    #[must_use]
    pub fn with_probes(probes: Vec<Box<dyn IdentityProbe>>, config: &EngineConfig) -> Self {
        Self {
            probes,
            retry_limit: config.identity_retry_limit,
            retry_delay: config.identity_retry_delay,
            storage_key: config.username_storage_key.clone(),
        }
    }

    pub fn push_probe(&mut self, probe: Box<dyn IdentityProbe>) {
        self.probes.push(probe);
    }

    /// Runs every probe once, in order.
    #[must_use]
    pub fn probe_once(&self, page: &dyn PageProbe) -> Option<(&'static str, String)> {
        self.probes
            .iter()
            .find_map(|probe| probe.probe(page).map(|handle| (probe.name(), handle)))
    }

    pub async fn resolve<S, T>(
        &self,
        page: &dyn PageProbe,
        store: &S,
        sleeper: &T,
    ) -> Result<String, IdentityError>
    where
        S: KeyValueStore + ?Sized,
        T: Sleeper + ?Sized,
    {
        self.resolve_or_capture(page, store, sleeper, &|| None).await
    }

    /// Like [`Self::resolve`], but checks `captured` before every probe pass
    /// and stops as soon as it yields a handle. A captured handle is returned
    /// without being written; whoever captured it owns persisting it.
    pub async fn resolve_or_capture<S, T>(
        &self,
        page: &dyn PageProbe,
        store: &S,
        sleeper: &T,
        captured: &dyn Fn() -> Option<String>,
    ) -> Result<String, IdentityError>
    where
        S: KeyValueStore + ?Sized,
        T: Sleeper + ?Sized,
    {
        if let Some(cached) = self.cached(store).await {
            tracing::debug!(username = %cached, "identity loaded from cache");
            return Ok(cached);
        }

        // Pass 0 runs immediately; every later pass waits one retry delay.
        for pass in 0..=self.retry_limit {
            if pass > 0 {
                sleeper.sleep(self.retry_delay).await;
            }
            if let Some(handle) = captured() {
                tracing::debug!(username = %handle, pass, "identity captured while polling");
                return Ok(handle);
            }
            if let Some((strategy, handle)) = self.probe_once(page) {
                tracing::debug!(username = %handle, strategy, pass, "identity found");
                self.remember(store, &handle).await;
                return Ok(handle);
            }
        }

        let attempts = self.retry_limit + 1;
        tracing::debug!(attempts, "identity resolution exhausted");
        Err(IdentityError::NotFound { attempts })
    }

    /// Persists a handle found by any route, including a path rewrite.
    pub async fn remember<S>(&self, store: &S, handle: &str)
    where
        S: KeyValueStore + ?Sized,
    {
        if let Err(error) = store.set(&self.storage_key, handle).await {
            tracing::warn!(reason = %error, "failed to persist username");
        }
    }

    async fn cached<S>(&self, store: &S) -> Option<String>
    where
        S: KeyValueStore + ?Sized,
    {
        match store.get(&self.storage_key).await {
            Ok(Some(value)) => {
                let value = value.trim().trim_matches('"').to_string();
                is_valid_handle(&value).then_some(value)
            }
            Ok(None) => None,
            Err(error) => {
                tracing::warn!(reason = %error, "failed to read cached username");
                None
            }
        }
    }
}

/// Reads the handle from a host rewrite of the profile placeholder
/// (`/i/profile` becoming `/<handle>`).
#[must_use]
pub fn capture_from_path(path: &str) -> Option<String> {
    handle_from_path(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::USERNAME_STORAGE_KEY;
    use crate::memory::MemoryPage;
    use futures::executor::block_on;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn resolver() -> IdentityResolver {
        IdentityResolver::new(&EngineConfig::default())
    }

    #[test]
    fn viewer_record_beats_unrelated_screen_names() {
        let page = MemoryPage::new("/");
        page.add_script(r#"{"isLoggedIn":true,"tweet":{"user":{"screen_name":"someone_else"}}}"#);
        page.add_script(r#"{"viewer":{"id":"1","screen_name":"jack"}}"#);
        assert_eq!(
            ScriptRecordProbe.probe(&page),
            Some("jack".to_string())
        );
    }

    #[test]
    fn bare_screen_name_requires_auth_context() {
        let page = MemoryPage::new("/");
        page.add_script(r#"{"screen_name":"feed_author"}"#);
        assert_eq!(ScriptRecordProbe.probe(&page), None);

        page.add_script(r#"{"session":{"isLoggedIn":true,"screen_name":"jack"}}"#);
        assert_eq!(ScriptRecordProbe.probe(&page), Some("jack".to_string()));
    }

    #[test]
    fn navigation_link_ignores_placeholder_and_nested_hrefs() {
        let page = MemoryPage::new("/");
        page.add_link(PROFILE_LINK_SELECTORS[0], "/i/profile");
        assert_eq!(NavigationLinkProbe.probe(&page), None);

        page.add_link(PROFILE_LINK_SELECTORS[1], "/jack");
        assert_eq!(NavigationLinkProbe.probe(&page), Some("jack".to_string()));
    }

    #[test]
    fn labelled_link_scans_all_matches() {
        let page = MemoryPage::new("/");
        page.add_link(LABELLED_PROFILE_LINK_SELECTOR, "/settings/profile");
        page.add_link(LABELLED_PROFILE_LINK_SELECTOR, "/jack");
        assert_eq!(LabelledProfileLinkProbe.probe(&page), Some("jack".to_string()));
    }

    #[test]
    fn cached_username_short_circuits_probing() {
        let page = MemoryPage::new("/");
        page.set_stored(USERNAME_STORAGE_KEY, "jack");
        page.add_script(r#"{"viewer":{"screen_name":"other"}}"#);
        let resolved = block_on(resolver().resolve(&page, &page, &page));
        assert_eq!(resolved, Ok("jack".to_string()));
        assert!(page.storage_writes().is_empty());
        assert_eq!(page.sleep_count(), 0);
    }

    #[test]
    fn invalid_cached_value_is_ignored() {
        let page = MemoryPage::new("/");
        page.set_stored(USERNAME_STORAGE_KEY, "not a handle!");
        page.add_link(LABELLED_PROFILE_LINK_SELECTOR, "/jack");
        let resolved = block_on(resolver().resolve(&page, &page, &page));
        assert_eq!(resolved, Ok("jack".to_string()));
    }

    #[test]
    fn storage_failures_do_not_block_resolution() {
        let page = MemoryPage::new("/");
        page.fail_storage(true);
        page.add_link(PROFILE_LINK_SELECTORS[0], "/jack");
        let resolved = block_on(resolver().resolve(&page, &page, &page));
        assert_eq!(resolved, Ok("jack".to_string()));
    }

    #[test]
    fn exhausts_retry_budget_then_fails() {
        let config = EngineConfig {
            identity_retry_limit: 3,
            ..EngineConfig::default()
        };
        let page = MemoryPage::new("/");
        let resolved = block_on(IdentityResolver::new(&config).resolve(&page, &page, &page));
        assert_eq!(resolved, Err(IdentityError::NotFound { attempts: 4 }));
        assert_eq!(page.sleep_count(), 3);
    }

    #[test]
    fn captured_handle_stops_polling_without_writing() {
        let page = MemoryPage::new("/i/profile");
        let captured = Rc::new(RefCell::new(None));
        let slot = Rc::clone(&captured);
        page.schedule_after_sleeps(1, move |_| *slot.borrow_mut() = Some("jack".to_string()));
        page.schedule_after_sleeps(4, |page| {
            page.add_script(r#"{"viewer":{"screen_name":"other"}}"#);
        });

        let capture = || captured.borrow().clone();
        let resolved = block_on(resolver().resolve_or_capture(&page, &page, &page, &capture));
        assert_eq!(resolved, Ok("jack".to_string()));
        assert_eq!(page.sleep_count(), 1);
        assert!(page.storage_writes().is_empty());
    }

    #[test]
    fn capture_from_path_reads_single_segment_handles() {
        assert_eq!(capture_from_path("/jack"), Some("jack".to_string()));
        assert_eq!(capture_from_path("/i/profile"), None);
        assert_eq!(capture_from_path("/home"), None);
    }
}
