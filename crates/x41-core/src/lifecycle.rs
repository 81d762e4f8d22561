//! Startup, steady-state reconciliation and teardown.
//!
//! Initialization is split around the only asynchronous step so that no
//! borrow of the controller is held while identity resolution sleeps:
//!
//! 1. [`LifecycleController::begin`] installs styles, then navigation hooks,
//!    then theme hooks.
//! 2. The caller awaits [`IdentityResolver::resolve`].
//! 3. [`LifecycleController::complete`] builds the tab bar and starts the
//!    badge watch, or [`LifecycleController::degrade`] puts the host page back
//!    the way it was.
//!
//! [`initialize`] drives the three steps over a `RefCell`. Handlers check the
//! phase first and do nothing once the controller is degraded or destroyed.
//!
//! A handle captured from the profile placeholder rewrite while step 2 is
//! still polling ends the polling, and [`LifecycleController::complete`]
//! persists it. The cache is written at most once per page load.
//!
//! The controller never performs navigation itself. It returns [`Effect`]s
//! that the embedding layer carries out.

use std::cell::RefCell;

use serde::Serialize;
use web_time::Instant;

use crate::badge::{BadgeReader, BadgeState};
use crate::bridge::{CompanionHandshake, CompanionStatus, validate_path};
use crate::config::{EngineConfig, NavigationSource};
use crate::error::{HostError, LifecycleError};
use crate::host::{Dom, KeyValueStore, PageHooks, PageProbe, Sleeper};
use crate::identity::{IdentityResolver, capture_from_path};
use crate::navigation::{NavigationMonitor, NavigationSignal, Settle};
use crate::presenter::{TabBarPresenter, href_for};
use crate::redirect::RedirectGuard;
use crate::route::{classify, normalize_path};
use crate::session::SessionState;
use crate::styles::StyleInjector;
use crate::tabs::{PROFILE_PLACEHOLDER_PATH, TabId};
use crate::theme::{Palette, Theme, extract_palette};

/// Work the embedding layer must carry out on the controller's behalf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Effect {
    /// Replace the current location without adding a history entry.
    Redirect(String),
    /// Ask the page companion to route the host application in place.
    Navigate(String),
    /// Full page load of a same-origin path, used while no companion is
    /// confirmed.
    Load(String),
    /// Write the handle to storage; failures are only logged.
    PersistIdentity(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Created,
    /// Hooks are installed and identity resolution is in flight.
    Starting,
    Running,
    /// Initialization failed and every injected change was reverted.
    Degraded,
    Destroyed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub phase: Phase,
    pub reconciliations: u64,
    pub emitted_navigations: u64,
    pub suppressed_navigations: u64,
    pub redirects: u64,
    pub tab_bar_builds: u32,
    pub theme: Theme,
    pub badge: BadgeState,
    pub companion: CompanionStatus,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    Running(Vec<Effect>),
    Degraded(LifecycleError),
    AlreadyStarted,
    /// Teardown happened while identity resolution was still running.
    Cancelled,
}

pub struct LifecycleController<D: Dom> {
    config: EngineConfig,
    session: SessionState,
    monitor: NavigationMonitor,
    guard: RedirectGuard,
    styles: StyleInjector,
    presenter: TabBarPresenter<D>,
    badge_reader: BadgeReader,
    badge: BadgeState,
    theme: Theme,
    palette: Palette,
    companion: CompanionHandshake,
    /// Set when a handle was captured before `complete`; `complete` persists it.
    capture_unpersisted: bool,
    phase: Phase,
    reconciliations: u64,
    redirects: u64,
    last_error: Option<String>,
}

impl<D: Dom> LifecycleController<D> {
    #[must_use]
    pub fn new(dom: D, config: EngineConfig, initial_path: &str) -> Self {
        let preferences = &config.preferences;
        let guard = RedirectGuard::new(preferences.redirect_home, preferences.redirect_targets.clone());
        let styles = StyleInjector::new(preferences.show_header, config.tab_bar_height_px);
        let presenter = TabBarPresenter::new(dom, preferences.enabled_tabs(), config.tab_bar_height_px);
        let monitor = NavigationMonitor::new(config.navigation_debounce);
        let mut companion = CompanionHandshake::default();
        if preferences.navigation_source == NavigationSource::Polling {
            companion.expire();
        }
        Self {
            session: SessionState::new(initial_path),
            monitor,
            guard,
            styles,
            presenter,
            badge_reader: BadgeReader::default(),
            badge: BadgeState::None,
            theme: Theme::default(),
            palette: Palette::default(),
            companion,
            capture_unpersisted: false,
            phase: Phase::Created,
            reconciliations: 0,
            redirects: 0,
            last_error: None,
            config,
        }
    }

    #[must_use]
    pub fn session(&self) -> &SessionState {
        &self.session
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn presenter(&self) -> &TabBarPresenter<D> {
        &self.presenter
    }

    #[must_use]
    pub fn pending_deadline(&self) -> Option<Instant> {
        self.monitor.deadline()
    }

    #[must_use]
    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            phase: self.phase,
            reconciliations: self.reconciliations,
            emitted_navigations: self.monitor.emitted(),
            suppressed_navigations: self.monitor.suppressed(),
            redirects: self.redirects,
            tab_bar_builds: self.presenter.build_count(),
            theme: self.theme,
            badge: self.badge,
            companion: self.companion.status(),
            last_error: self.last_error.clone(),
        }
    }

    fn is_active(&self) -> bool {
        matches!(self.phase, Phase::Starting | Phase::Running)
    }

    /// Evaluated once at script entry, before anything is installed. When
    /// this returns a redirect the caller performs it and stops there.
    pub fn entry_redirect(&mut self) -> Option<Effect> {
        if self.phase != Phase::Created {
            return None;
        }
        let path = self.session.current_path().to_string();
        self.redirect_for(&path)
    }

    fn redirect_for(&mut self, path: &str) -> Option<Effect> {
        let target = self.guard.decide(path, &self.session)?;
        self.redirects += 1;
        if target == PROFILE_PLACEHOLDER_PATH {
            self.session.expect_profile_rewrite();
        }
        Some(Effect::Redirect(target))
    }

    /// Writes the style element at script entry, before the document has a
    /// `<body>`. The modal body class follows in [`Self::begin`].
    pub fn preload_styles(&mut self) -> Result<(), HostError> {
        if self.phase != Phase::Created {
            return Ok(());
        }
        let class = classify(self.session.current_path(), self.session.username());
        self.styles.preload(self.presenter.dom(), class.mode)?;
        Ok(())
    }

    /// Styles first, then navigation hooks, then theme hooks. Returns
    /// `Ok(false)` when the controller was already started.
    pub fn begin(
        &mut self,
        page: &dyn PageProbe,
        hooks: &mut dyn PageHooks,
    ) -> Result<bool, LifecycleError> {
        match self.phase {
            Phase::Created => {}
            Phase::Destroyed => return Err(LifecycleError::Destroyed),
            Phase::Starting | Phase::Running | Phase::Degraded => return Ok(false),
        }
        self.phase = Phase::Starting;

        let path = normalize_path(&page.current_path());
        let class = classify(&path, self.session.username());
        self.session.record_navigation(&path, &class);
        self.styles.apply(self.presenter.dom(), class.mode)?;

        hooks.install_navigation_hooks(self.config.preferences.navigation_source)?;
        hooks.install_theme_hooks()?;
        let (theme, palette) = extract_palette(page);
        self.theme = theme;
        self.palette = palette;
        tracing::debug!(path = %path, theme = ?theme, "engine hooks installed");
        Ok(true)
    }

    /// Adopts the resolved handle, builds the tab bar and starts the badge
    /// watch. Any route change that arrived during resolution is reconciled.
    ///
    /// A handle already in the session (captured from the profile rewrite)
    /// wins over `username`, and is persisted here when the resolver did not
    /// write it.
    pub fn complete(
        &mut self,
        username: &str,
        page: &dyn PageProbe,
        hooks: &mut dyn PageHooks,
    ) -> Result<Vec<Effect>, LifecycleError> {
        match self.phase {
            Phase::Starting => {}
            Phase::Destroyed => return Err(LifecycleError::Destroyed),
            Phase::Created | Phase::Running | Phase::Degraded => return Ok(Vec::new()),
        }
        let mut effects = Vec::new();
        self.session.adopt_username(username);
        let adopted = self.session.username().unwrap_or(username).to_string();
        if std::mem::take(&mut self.capture_unpersisted) || adopted != username {
            effects.push(Effect::PersistIdentity(adopted.clone()));
        }

        let path = normalize_path(&page.current_path());
        let class = classify(&path, self.session.username());
        self.session.record_navigation(&path, &class);
        // The tab bar waits for the page the redirect lands on.
        if let Some(redirect) = self.redirect_for(&path) {
            effects.push(redirect);
        } else {
            self.styles.apply(self.presenter.dom(), class.mode)?;
            self.badge = self.badge_reader.read(page);
            self.presenter
                .ensure_mounted(&self.session, self.badge, &self.palette)?;
        }
        hooks.start_badge_watch(self.config.badge_refresh_interval)?;

        self.session.mark_initialized();
        self.phase = Phase::Running;
        tracing::info!(username = %adopted, path = %path, "engine running");
        Ok(effects)
    }

    /// Reverts every change made so far, leaving the host page as though the
    /// script never ran.
    pub fn degrade(&mut self, hooks: &mut dyn PageHooks, error: LifecycleError) {
        if self.phase == Phase::Destroyed {
            return;
        }
        tracing::debug!(reason = %error, "initialization failed, restoring native page");
        self.presenter.unmount();
        hooks.uninstall_all();
        self.monitor.cancel();
        self.styles.remove(self.presenter.dom());
        self.last_error = Some(error.to_string());
        self.phase = Phase::Degraded;
    }

    /// Reverse of initialization. Returns `false` when already torn down.
    pub fn teardown(&mut self, hooks: &mut dyn PageHooks) -> bool {
        if self.phase == Phase::Destroyed {
            return false;
        }
        self.presenter.unmount();
        hooks.uninstall_all();
        self.monitor.cancel();
        self.styles.remove(self.presenter.dom());
        self.session.mark_destroyed();
        self.phase = Phase::Destroyed;
        tracing::debug!("engine torn down");
        true
    }

    /// Feeds a raw route signal into the debounce window. Returns the
    /// deadline the caller should arm a timer for.
    pub fn on_route_signal(
        &mut self,
        path: &str,
        signal: NavigationSignal,
        now: Instant,
    ) -> Option<Instant> {
        if !self.is_active() {
            return None;
        }
        Some(self.monitor.record(path, signal, now))
    }

    /// Timer callback for the debounce deadline.
    pub fn on_debounce_elapsed(&mut self, now: Instant, page: &dyn PageProbe) -> Vec<Effect> {
        if !self.is_active() {
            return Vec::new();
        }
        match self.monitor.settle(now, self.session.current_path()) {
            Settle::Ready(event) => {
                tracing::debug!(path = %event.path, signal = ?event.signal, "navigation settled");
                self.reconcile(&event.path, page)
            }
            Settle::Idle | Settle::Pending(_) | Settle::Suppressed => Vec::new(),
        }
    }

    /// Applies one settled path: identity capture, classification, redirect,
    /// styles, then the tab bar.
    pub fn reconcile(&mut self, path: &str, page: &dyn PageProbe) -> Vec<Effect> {
        if !self.is_active() {
            return Vec::new();
        }
        self.reconciliations += 1;
        let path = normalize_path(path);
        let mut effects = Vec::new();

        let came_from_placeholder = self.session.current_path() == PROFILE_PLACEHOLDER_PATH;
        if self.session.username().is_none()
            && (self.session.awaiting_profile_rewrite() || came_from_placeholder)
        {
            if let Some(handle) = capture_from_path(&path) {
                if self.session.adopt_username(&handle) {
                    tracing::debug!(username = %handle, "identity captured from profile rewrite");
                    if self.phase == Phase::Running {
                        effects.push(Effect::PersistIdentity(handle));
                    } else {
                        self.capture_unpersisted = true;
                    }
                }
            }
        }

        let class = classify(&path, self.session.username());
        self.session.record_navigation(&path, &class);

        if let Some(redirect) = self.redirect_for(&path) {
            effects.push(redirect);
            return effects;
        }

        if let Err(error) = self.styles.apply(self.presenter.dom(), class.mode) {
            tracing::debug!(reason = %error, "failed to apply styles");
        }
        if self.session.is_initialized() {
            self.badge = self.badge_reader.read(page);
            self.refresh_tab_bar();
        }
        effects
    }

    /// Prefers-dark change or host body restyle.
    pub fn on_theme_signal(&mut self, page: &dyn PageProbe) -> bool {
        if !self.is_active() {
            return false;
        }
        let (theme, palette) = extract_palette(page);
        if theme == self.theme && palette == self.palette {
            return false;
        }
        tracing::debug!(from = ?self.theme, to = ?theme, "theme changed");
        self.theme = theme;
        self.palette = palette;
        if self.session.is_initialized() {
            self.refresh_tab_bar();
        }
        true
    }

    /// Periodic or mutation-driven badge refresh. Also rebuilds the tab bar
    /// if the host removed it since the last tick. Returns whether the badge
    /// changed.
    pub fn on_badge_tick(&mut self, page: &dyn PageProbe) -> bool {
        if self.phase != Phase::Running {
            return false;
        }
        // The host may purge our style element as well as the tab bar.
        if let Err(error) = self.styles.apply(self.presenter.dom(), self.session.page_mode()) {
            tracing::debug!(reason = %error, "failed to restore styles");
        }
        let badge = self.badge_reader.read(page);
        let changed = badge != self.badge;
        self.badge = badge;
        self.refresh_tab_bar();
        changed
    }

    /// The page companion answered `X41_HELLO`.
    pub fn on_companion_ready(&mut self) -> bool {
        if !self.is_active() || self.config.preferences.navigation_source != NavigationSource::Companion {
            return false;
        }
        let changed = self.companion.confirm();
        if changed {
            tracing::debug!("page companion confirmed");
        }
        changed
    }

    /// The handshake deadline passed. Starts path polling the first time the
    /// companion is found missing.
    pub fn on_companion_timeout(&mut self, hooks: &mut dyn PageHooks) -> bool {
        if !self.is_active() || !self.companion.expire() {
            return false;
        }
        tracing::debug!("page companion unavailable, polling the path instead");
        if let Err(error) = hooks.start_path_polling() {
            tracing::debug!(reason = %error, "failed to start path polling");
        }
        true
    }

    /// A click on one of our tabs.
    pub fn on_tab_selected(&mut self, tab: TabId) -> Option<Effect> {
        if self.phase != Phase::Running {
            return None;
        }
        let target = href_for(tab, &self.session);
        if let Err(rejection) = validate_path(&target) {
            tracing::debug!(reason = %rejection, "refusing tab navigation");
            return None;
        }
        if target == PROFILE_PLACEHOLDER_PATH {
            self.session.expect_profile_rewrite();
        }
        if self.companion.is_ready() {
            Some(Effect::Navigate(target))
        } else {
            Some(Effect::Load(target))
        }
    }

    fn refresh_tab_bar(&mut self) {
        match self
            .presenter
            .ensure_mounted(&self.session, self.badge, &self.palette)
        {
            Ok(outcome) => tracing::trace!(?outcome, "tab bar reconciled"),
            Err(error) => tracing::debug!(reason = %error, "failed to reconcile tab bar"),
        }
    }
}

/// Runs initialization end to end. Borrows of `controller` and `hooks` are
/// released before identity resolution starts waiting.
pub async fn initialize<D, H, S, T>(
    controller: &RefCell<LifecycleController<D>>,
    resolver: &IdentityResolver,
    page: &dyn PageProbe,
    hooks: &RefCell<H>,
    store: &S,
    sleeper: &T,
) -> InitOutcome
where
    D: Dom,
    H: PageHooks,
    S: KeyValueStore + ?Sized,
    T: Sleeper + ?Sized,
{
    let started = controller
        .borrow_mut()
        .begin(page, &mut *hooks.borrow_mut());
    match started {
        Ok(true) => {}
        Ok(false) => return InitOutcome::AlreadyStarted,
        Err(LifecycleError::Destroyed) => return InitOutcome::Cancelled,
        Err(error) => {
            controller
                .borrow_mut()
                .degrade(&mut *hooks.borrow_mut(), error.clone());
            return InitOutcome::Degraded(error);
        }
    }

    let captured = || {
        controller
            .try_borrow()
            .ok()
            .and_then(|controller| controller.session().username().map(str::to_string))
    };
    let resolved = resolver
        .resolve_or_capture(page, store, sleeper, &captured)
        .await;

    let mut controller = controller.borrow_mut();
    let mut hooks = hooks.borrow_mut();
    if controller.phase() != Phase::Starting {
        return InitOutcome::Cancelled;
    }
    // A profile rewrite observed while polling also counts.
    let username = match resolved {
        Ok(username) => username,
        Err(error) => match controller.session().username() {
            Some(captured) => captured.to_string(),
            None => {
                let error = LifecycleError::from(error);
                controller.degrade(&mut *hooks, error.clone());
                return InitOutcome::Degraded(error);
            }
        },
    };
    match controller.complete(&username, page, &mut *hooks) {
        Ok(effects) => InitOutcome::Running(effects),
        Err(error) => {
            controller.degrade(&mut *hooks, error.clone());
            InitOutcome::Degraded(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryPage;
    use crate::presenter::TAB_BAR_ID;
    use crate::styles::{MODAL_BODY_CLASS, STYLE_ELEMENT_ID};
    use web_time::Duration;

    fn controller(page: &MemoryPage) -> LifecycleController<MemoryPage> {
        LifecycleController::new(page.clone(), EngineConfig::default(), &page.current_path())
    }

    #[test]
    fn entry_redirect_fires_only_for_default_routes() {
        let page = MemoryPage::new("/home");
        let mut engine = controller(&page);
        assert_eq!(
            engine.entry_redirect(),
            Some(Effect::Redirect(PROFILE_PLACEHOLDER_PATH.to_string()))
        );
        assert!(engine.session().awaiting_profile_rewrite());

        let page = MemoryPage::new("/explore");
        assert_eq!(controller(&page).entry_redirect(), None);
    }

    #[test]
    fn begin_installs_styles_before_hooks_and_only_once() {
        let page = MemoryPage::new("/notifications");
        let mut hooks = page.clone();
        let mut engine = controller(&page);
        assert_eq!(engine.begin(&page, &mut hooks), Ok(true));
        assert!(page.has_element(STYLE_ELEMENT_ID));
        assert_eq!(page.hook_log(), vec!["navigation:companion", "theme"]);
        assert_eq!(engine.begin(&page, &mut hooks), Ok(false));
        assert_eq!(engine.phase(), Phase::Starting);
    }

    #[test]
    fn complete_mounts_tab_bar_and_starts_badge_watch() {
        let page = MemoryPage::new("/notifications");
        let mut hooks = page.clone();
        let mut engine = controller(&page);
        engine.begin(&page, &mut hooks).expect("begin");
        let effects = engine.complete("jack", &page, &mut hooks).expect("complete");
        assert!(effects.is_empty());
        assert!(page.has_element(TAB_BAR_ID));
        assert_eq!(page.hook_log().last().map(String::as_str), Some("badge:5000ms"));
        assert_eq!(engine.session().active_tab(), Some(TabId::Notifications));
    }

    #[test]
    fn debounced_signals_reconcile_once_and_track_last_root() {
        let page = MemoryPage::new("/notifications");
        let mut hooks = page.clone();
        let mut engine = controller(&page);
        engine.begin(&page, &mut hooks).expect("begin");
        engine.complete("jack", &page, &mut hooks).expect("complete");

        let start = Instant::now();
        engine.on_route_signal("/explore", NavigationSignal::Push, start);
        let deadline = engine
            .on_route_signal("/jack", NavigationSignal::Push, start + Duration::from_millis(20))
            .expect("active");
        assert!(engine.on_debounce_elapsed(deadline, &page).is_empty());
        assert_eq!(engine.session().current_path(), "/jack");
        assert_eq!(engine.session().last_root_path(), Some("/jack"));
        assert_eq!(engine.diagnostics().reconciliations, 1);
    }

    #[test]
    fn tab_selection_routes_in_page_only_once_companion_answers() {
        let page = MemoryPage::new("/notifications");
        let mut hooks = page.clone();
        let mut engine = controller(&page);
        assert_eq!(engine.on_tab_selected(TabId::Profile), None);
        engine.begin(&page, &mut hooks).expect("begin");
        engine.complete("jack", &page, &mut hooks).expect("complete");
        assert_eq!(
            engine.on_tab_selected(TabId::Analytics),
            Some(Effect::Load("/i/account_analytics".to_string()))
        );

        assert!(engine.on_companion_ready());
        assert_eq!(engine.diagnostics().companion, CompanionStatus::Ready);
        assert_eq!(
            engine.on_tab_selected(TabId::Analytics),
            Some(Effect::Navigate("/i/account_analytics".to_string()))
        );
    }

    #[test]
    fn missing_companion_falls_back_to_path_polling_once() {
        let page = MemoryPage::new("/notifications");
        let mut hooks = page.clone();
        let mut engine = controller(&page);
        assert!(!engine.on_companion_timeout(&mut hooks));
        engine.begin(&page, &mut hooks).expect("begin");

        assert!(engine.on_companion_timeout(&mut hooks));
        assert!(!engine.on_companion_timeout(&mut hooks));
        assert_eq!(
            page.hook_log(),
            vec!["navigation:companion", "theme", "path_polling"]
        );
        assert_eq!(engine.diagnostics().companion, CompanionStatus::Unavailable);
    }

    #[test]
    fn polling_preference_never_waits_for_a_companion() {
        let page = MemoryPage::new("/notifications");
        let mut hooks = page.clone();
        let mut config = EngineConfig::default();
        config.preferences.navigation_source = NavigationSource::Polling;
        let mut engine = LifecycleController::new(page.clone(), config, "/notifications");
        engine.begin(&page, &mut hooks).expect("begin");
        engine.complete("jack", &page, &mut hooks).expect("complete");

        assert!(!engine.on_companion_ready());
        assert!(!engine.on_companion_timeout(&mut hooks));
        assert_eq!(
            engine.on_tab_selected(TabId::Notifications),
            Some(Effect::Load("/notifications".to_string()))
        );
    }

    #[test]
    fn placeholder_rewrite_captures_identity_during_startup() {
        let page = MemoryPage::new("/home");
        let mut hooks = page.clone();
        let mut engine = controller(&page);
        engine.entry_redirect();
        page.set_path(PROFILE_PLACEHOLDER_PATH);
        engine.begin(&page, &mut hooks).expect("begin");

        page.set_path("/jack");
        assert!(engine.reconcile("/jack", &page).is_empty());
        assert_eq!(engine.session().username(), Some("jack"));
        assert_eq!(engine.session().active_tab(), Some(TabId::Profile));

        // The resolver may have found someone else meanwhile; the captured
        // handle stays and is the one persisted.
        let effects = engine.complete("other", &page, &mut hooks).expect("complete");
        assert_eq!(effects, vec![Effect::PersistIdentity("jack".to_string())]);
        assert_eq!(engine.session().username(), Some("jack"));
    }

    #[test]
    fn capture_after_startup_is_persisted_immediately() {
        let page = MemoryPage::new(PROFILE_PLACEHOLDER_PATH);
        let mut hooks = page.clone();
        let mut engine = controller(&page);
        engine.begin(&page, &mut hooks).expect("begin");
        let mut unresolved = SessionState::new(PROFILE_PLACEHOLDER_PATH);
        unresolved.expect_profile_rewrite();
        engine.session = unresolved;
        engine.phase = Phase::Running;

        assert_eq!(
            engine.reconcile("/jack", &page),
            vec![Effect::PersistIdentity("jack".to_string())]
        );
    }

    #[test]
    fn preloaded_styles_precede_begin() {
        let page = MemoryPage::new("/compose/post");
        let mut hooks = page.clone();
        let mut engine = controller(&page);
        engine.preload_styles().expect("preload");
        assert!(page.has_element(STYLE_ELEMENT_ID));
        assert!(!page.has_body_class(MODAL_BODY_CLASS));
        assert!(page.hook_log().is_empty());

        engine.begin(&page, &mut hooks).expect("begin");
        assert!(page.has_body_class(MODAL_BODY_CLASS));
        assert_eq!(page.count_by_id(STYLE_ELEMENT_ID), 1);
    }

    #[test]
    fn badge_tick_reinstalls_purged_styles() {
        let page = MemoryPage::new("/notifications");
        let mut hooks = page.clone();
        let mut engine = controller(&page);
        engine.begin(&page, &mut hooks).expect("begin");
        engine.complete("jack", &page, &mut hooks).expect("complete");

        page.remove_by_id(STYLE_ELEMENT_ID);
        assert!(!page.has_element(STYLE_ELEMENT_ID));
        engine.on_badge_tick(&page);
        assert_eq!(page.count_by_id(STYLE_ELEMENT_ID), 1);
    }

    #[test]
    fn theme_signal_updates_palette_only_on_change() {
        let page = MemoryPage::new("/notifications");
        let mut hooks = page.clone();
        let mut engine = controller(&page);
        engine.begin(&page, &mut hooks).expect("begin");
        assert!(!engine.on_theme_signal(&page));
        page.set_computed(crate::theme::BODY_SELECTOR, "background-color", "rgb(0, 0, 0)");
        assert!(engine.on_theme_signal(&page));
        assert_eq!(engine.diagnostics().theme, Theme::Dark);
    }

    #[test]
    fn teardown_is_idempotent_and_silences_handlers() {
        let page = MemoryPage::new("/notifications");
        let mut hooks = page.clone();
        let mut engine = controller(&page);
        engine.begin(&page, &mut hooks).expect("begin");
        engine.complete("jack", &page, &mut hooks).expect("complete");

        assert!(engine.teardown(&mut hooks));
        assert!(!engine.teardown(&mut hooks));
        assert!(!page.has_element(TAB_BAR_ID));
        assert!(!page.has_element(STYLE_ELEMENT_ID));
        assert_eq!(
            engine.on_route_signal("/explore", NavigationSignal::Push, Instant::now()),
            None
        );
        assert_eq!(engine.begin(&page, &mut hooks), Err(LifecycleError::Destroyed));
        assert!(engine.session().is_destroyed());
    }
}
