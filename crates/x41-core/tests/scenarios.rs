use std::cell::RefCell;
use std::rc::Rc;

use futures::executor::block_on;
use serde_json::json;
use web_time::{Duration, Instant};
use x41_core::bridge::{MessageOrigin, accept_message};
use x41_core::config::USERNAME_STORAGE_KEY;
use x41_core::identity::{LABELLED_PROFILE_LINK_SELECTOR, PROFILE_LINK_SELECTORS};
use x41_core::memory::MemoryPage;
use x41_core::presenter::{MountOutcome, TAB_BAR_ID, TAB_ID_ATTRIBUTE};
use x41_core::styles::{MODAL_BODY_CLASS, STYLE_ELEMENT_ID};
use x41_core::tabs::{NOTIFICATIONS_ROOT_PATH, PROFILE_PLACEHOLDER_PATH};
use x41_core::{
    BadgeState, Dom, Effect, EngineConfig, IdentityError, IdentityResolver, InitOutcome,
    LifecycleController, LifecycleError, NavigationSignal, Palette, PathRejection, Phase,
    RedirectGuard, SessionState, TabBarPresenter, TabId, validate_path,
};

fn engine_for(page: &MemoryPage, config: EngineConfig) -> RefCell<LifecycleController<MemoryPage>> {
    RefCell::new(LifecycleController::new(
        page.clone(),
        config,
        &x41_core::PageProbe::current_path(page),
    ))
}

fn quick_config(retries: u32) -> EngineConfig {
    EngineConfig {
        identity_retry_limit: retries,
        ..EngineConfig::default()
    }
}

fn start(page: &MemoryPage, config: EngineConfig) -> (RefCell<LifecycleController<MemoryPage>>, RefCell<MemoryPage>, InitOutcome) {
    let engine = engine_for(page, config.clone());
    let hooks = RefCell::new(page.clone());
    let resolver = IdentityResolver::new(&config);
    let outcome = block_on(x41_core::initialize(&engine, &resolver, page, &hooks, page, page));
    (engine, hooks, outcome)
}

fn tab_ids(page: &MemoryPage) -> Vec<String> {
    let container = page.element_by_id(TAB_BAR_ID).expect("tab bar mounted");
    page.children(container)
        .into_iter()
        .filter_map(|node| page.attribute(node, TAB_ID_ATTRIBUTE))
        .collect()
}

#[test]
fn scenario_a_home_without_session_targets_profile_placeholder() {
    let guard = RedirectGuard::default();
    let session = SessionState::new("/home");
    assert_eq!(
        guard.decide("/home", &session).as_deref(),
        Some(PROFILE_PLACEHOLDER_PATH)
    );
}

#[test]
fn scenario_b_root_returns_to_last_root_in_one_redirect() {
    let page = MemoryPage::new(NOTIFICATIONS_ROOT_PATH);
    page.set_stored(USERNAME_STORAGE_KEY, "jack");
    let (engine, _hooks, outcome) = start(&page, EngineConfig::default());
    assert_eq!(outcome, InitOutcome::Running(Vec::new()));
    assert_eq!(
        engine.borrow().session().last_root_path(),
        Some(NOTIFICATIONS_ROOT_PATH)
    );

    let now = Instant::now();
    let deadline = engine
        .borrow_mut()
        .on_route_signal("/", NavigationSignal::Push, now)
        .expect("engine active");
    let effects = engine.borrow_mut().on_debounce_elapsed(deadline, &page);
    assert_eq!(
        effects,
        vec![Effect::Redirect(NOTIFICATIONS_ROOT_PATH.to_string())]
    );

    // The host lands on the target; no further redirect is produced.
    page.set_path(NOTIFICATIONS_ROOT_PATH);
    let deadline = engine
        .borrow_mut()
        .on_route_signal(NOTIFICATIONS_ROOT_PATH, NavigationSignal::Replace, deadline)
        .expect("engine active");
    assert!(engine.borrow_mut().on_debounce_elapsed(deadline, &page).is_empty());
    assert_eq!(engine.borrow().diagnostics().redirects, 1);
}

#[test]
fn scenario_c_polling_finds_identity_on_seventh_attempt() {
    let page = MemoryPage::new("/notifications");
    page.schedule_after_sleeps(7, |page| {
        page.add_script(r#"{"viewer":{"rest_id":"12","screen_name":"jack"}}"#);
    });
    let config = quick_config(10);
    let resolved = block_on(IdentityResolver::new(&config).resolve(&page, &page, &page));

    assert_eq!(resolved, Ok("jack".to_string()));
    assert_eq!(page.sleep_count(), 7);
    assert_eq!(
        page.storage_writes(),
        vec![(USERNAME_STORAGE_KEY.to_string(), "jack".to_string())]
    );
}

#[test]
fn scenario_d_detached_tab_bar_is_rebuilt_with_same_tabs() {
    let page = MemoryPage::new("/notifications");
    page.set_stored(USERNAME_STORAGE_KEY, "jack");
    let (engine, _hooks, _) = start(&page, EngineConfig::default());
    let before = tab_ids(&page);
    assert_eq!(before, vec!["profile", "notifications", "analytics"]);

    page.purge_body();
    assert_eq!(page.element_by_id(TAB_BAR_ID), None);

    engine.borrow_mut().on_badge_tick(&page);
    assert_eq!(tab_ids(&page), before);
    assert_eq!(page.count_by_id(TAB_BAR_ID), 1);
    assert_eq!(engine.borrow().diagnostics().tab_bar_builds, 2);
}

#[test]
fn scenario_e_cross_origin_path_is_rejected() {
    assert_eq!(
        validate_path("https://evil.example/x"),
        Err(PathRejection::MissingLeadingSlash)
    );
    let origin = MessageOrigin {
        same_window: true,
        origin: "https://x.com",
        expected_origin: "https://x.com",
    };
    let message = json!({ "type": "X41_NAVIGATE", "path": "https://evil.example/x" });
    assert_eq!(accept_message(origin, &message), None);
}

#[test]
fn ensure_mounted_twice_adds_nothing() {
    let page = MemoryPage::new("/jack");
    let mut presenter = TabBarPresenter::new(page.clone(), TabId::ALL.to_vec(), 49);
    let other = MemoryPage::new("/jack");
    other.set_stored(USERNAME_STORAGE_KEY, "jack");
    let (engine, _, _) = start(&other, EngineConfig::default());
    let session = engine.borrow().session().clone();

    assert_eq!(
        presenter.ensure_mounted(&session, BadgeState::None, &Palette::default()),
        Ok(MountOutcome::Built)
    );
    let children = page.body_child_count();
    assert_eq!(
        presenter.ensure_mounted(&session, BadgeState::None, &Palette::default()),
        Ok(MountOutcome::Refreshed)
    );
    assert_eq!(page.body_child_count(), children);
    assert_eq!(page.count_by_id(TAB_BAR_ID), 1);
}

#[test]
fn same_path_twice_reconciles_once() {
    let page = MemoryPage::new("/notifications");
    page.set_stored(USERNAME_STORAGE_KEY, "jack");
    let (engine, _hooks, _) = start(&page, EngineConfig::default());

    let mut now = Instant::now();
    for _ in 0..2 {
        let deadline = engine
            .borrow_mut()
            .on_route_signal("/explore", NavigationSignal::Poll, now)
            .expect("engine active");
        engine.borrow_mut().on_debounce_elapsed(deadline, &page);
        now = deadline + Duration::from_millis(1);
    }
    let diagnostics = engine.borrow().diagnostics();
    assert_eq!(diagnostics.reconciliations, 1);
    assert_eq!(diagnostics.suppressed_navigations, 1);
}

#[test]
fn script_record_beats_profile_link() {
    let page = MemoryPage::new("/");
    page.add_script(r#"{"viewer":{"screen_name":"from_script"}}"#);
    page.add_link(PROFILE_LINK_SELECTORS[0], "/from_link");
    page.add_link(LABELLED_PROFILE_LINK_SELECTOR, "/from_label");
    let resolved = block_on(IdentityResolver::new(&EngineConfig::default()).resolve(&page, &page, &page));
    assert_eq!(resolved, Ok("from_script".to_string()));
}

#[test]
fn identity_exhaustion_restores_native_page() {
    let page = MemoryPage::new("/compose/post");
    let (engine, _hooks, outcome) = start(&page, quick_config(2));

    assert_eq!(
        outcome,
        InitOutcome::Degraded(LifecycleError::Identity(IdentityError::NotFound {
            attempts: 3
        }))
    );
    assert!(!page.has_element(STYLE_ELEMENT_ID));
    assert!(!page.has_element(TAB_BAR_ID));
    assert!(!page.has_body_class(MODAL_BODY_CLASS));
    assert_eq!(page.hook_log().last().map(String::as_str), Some("uninstall"));
    assert_eq!(engine.borrow().phase(), Phase::Degraded);
    assert_eq!(
        engine
            .borrow_mut()
            .on_route_signal("/explore", NavigationSignal::Push, Instant::now()),
        None
    );
}

#[test]
fn hook_failure_degrades_before_identity_runs() {
    let page = MemoryPage::new("/notifications");
    page.fail_hooks(true);
    let (_engine, _hooks, outcome) = start(&page, quick_config(3));
    assert!(matches!(outcome, InitOutcome::Degraded(LifecycleError::Host(_))));
    assert_eq!(page.sleep_count(), 0);
    assert!(!page.has_element(STYLE_ELEMENT_ID));
}

#[test]
fn teardown_during_resolution_cancels_startup() {
    let page = MemoryPage::new("/notifications");
    let config = quick_config(5);
    let engine = Rc::new(engine_for(&page, config.clone()));
    let hooks = RefCell::new(page.clone());
    let teardown_target = page.clone();
    let tearing_down = Rc::clone(&engine);
    page.schedule_after_sleeps(1, move |_| {
        let mut hooks = teardown_target.clone();
        tearing_down.borrow_mut().teardown(&mut hooks);
    });
    let outcome = block_on(x41_core::initialize(
        &*engine,
        &IdentityResolver::new(&config),
        &page,
        &hooks,
        &page,
        &page,
    ));
    assert_eq!(outcome, InitOutcome::Cancelled);
    assert_eq!(engine.borrow().phase(), Phase::Destroyed);
}

#[test]
fn profile_rewrite_during_startup_wins_and_is_cached_once() {
    let page = MemoryPage::new(PROFILE_PLACEHOLDER_PATH);
    let config = quick_config(10);
    let engine = Rc::new(engine_for(&page, config.clone()));
    let hooks = RefCell::new(page.clone());
    let router = Rc::clone(&engine);
    page.schedule_after_sleeps(1, move |page| {
        page.set_path("/jack");
        assert!(router.borrow_mut().reconcile("/jack", page).is_empty());
    });
    page.schedule_after_sleeps(4, |page| {
        page.add_script(r#"{"viewer":{"screen_name":"other"}}"#);
    });

    let resolver = IdentityResolver::new(&config);
    let outcome = block_on(x41_core::initialize(&*engine, &resolver, &page, &hooks, &page, &page));
    assert_eq!(
        outcome,
        InitOutcome::Running(vec![Effect::PersistIdentity("jack".to_string())])
    );
    block_on(resolver.remember(&page, "jack"));

    assert_eq!(page.sleep_count(), 1);
    assert_eq!(
        page.storage_writes(),
        vec![(USERNAME_STORAGE_KEY.to_string(), "jack".to_string())]
    );
    let engine = engine.borrow();
    assert_eq!(engine.session().username(), Some("jack"));
    assert_eq!(engine.session().active_tab(), Some(TabId::Profile));
    assert_eq!(engine.phase(), Phase::Running);
    assert!(page.has_element(TAB_BAR_ID));
}
