use super::*;

    pub(super) async fn boot() -> Result<(), HostError> {
        let window = web_sys::window().ok_or(HostError::WindowUnavailable)?;
        let document = window.document().ok_or(HostError::DocumentUnavailable)?;
        let store = BrowserStore::new(window.clone());

        let preferences = x41_core::config::load_preferences(&store).await;
        logging::install(preferences.debug);
        let config = EngineConfig::with_preferences(preferences);

        let probe = WebProbe::new(window.clone(), document.clone());
        let mut engine =
            LifecycleController::new(WebDom::new(document.clone()), config.clone(), &probe.current_path());
        if let Some(Effect::Redirect(target)) = engine.entry_redirect() {
            tracing::debug!(to = %target, "entry redirect");
            replace_location(&window, &target);
            return Ok(());
        }
        // Ahead of first paint; the body class waits for `<body>`.
        if let Err(error) = engine.preload_styles() {
            tracing::debug!(reason = %error, "failed to preload styles");
        }

        wait_for_dom_ready(&document).await;

        let runtime = Rc::new(Runtime {
            engine: RefCell::new(engine),
            hooks: RefCell::new(BrowserHooks::new(
                window,
                document,
                config.path_poll_interval,
                config.companion_handshake_timeout,
            )),
            probe,
            store,
            resolver: IdentityResolver::new(&config),
        });
        RUNTIME.with(|slot| *slot.borrow_mut() = Some(Rc::clone(&runtime)));

        let outcome = initialize(
            &runtime.engine,
            &runtime.resolver,
            &runtime.probe,
            &runtime.hooks,
            &runtime.store,
            &TimerSleeper,
        )
        .await;
        match outcome {
            InitOutcome::Running(effects) => perform_effects(&runtime, effects),
            InitOutcome::Degraded(error) => {
                tracing::debug!(reason = %error, "content script degraded");
            }
            InitOutcome::AlreadyStarted | InitOutcome::Cancelled => {}
        }
        Ok(())
    }

    /// Resolves once the document has parsed. Hooks and the tab bar need `<body>`.
    async fn wait_for_dom_ready(document: &web_sys::Document) {
        if document.ready_state() != "loading" {
            return;
        }
        let target: web_sys::EventTarget = document.clone().into();
        let promise = js_sys::Promise::new(&mut |resolve, _reject| {
            let _ = target.add_event_listener_with_callback("DOMContentLoaded", &resolve);
        });
        let _ = JsFuture::from(promise).await;
    }

    pub(super) fn shutdown() {
        cancel_debounce();
        let Some(runtime) = RUNTIME.with(|slot| slot.borrow_mut().take()) else {
            return;
        };
        let (Ok(mut engine), Ok(mut hooks)) =
            (runtime.engine.try_borrow_mut(), runtime.hooks.try_borrow_mut())
        else {
            tracing::debug!("teardown requested while the engine is busy");
            return;
        };
        engine.teardown(&mut *hooks);
    }

    pub(super) fn dispatch_route_signal(path: &str, signal: NavigationSignal) {
        let Some(runtime) = current_runtime() else {
            return;
        };
        let deadline = {
            let Ok(mut engine) = runtime.engine.try_borrow_mut() else {
                return;
            };
            engine.on_route_signal(path, signal, Instant::now())
        };
        if let Some(deadline) = deadline {
            arm_debounce(deadline);
        }
    }

    /// One timer per burst; a later signal replaces the pending timer.
    fn arm_debounce(deadline: Instant) {
        let delay = deadline.saturating_duration_since(Instant::now());
        // Settle on a fresh task so the firing timer is never dropped from
        // inside its own callback.
        let timer = Timeout::new(duration_millis(delay), || spawn_local(async { settle_navigation() }));
        DEBOUNCE_TIMER.with(|slot| *slot.borrow_mut() = Some(timer));
    }

    pub(super) fn cancel_debounce() {
        let pending = DEBOUNCE_TIMER.with(|slot| slot.borrow_mut().take());
        drop(pending);
    }

    fn settle_navigation() {
        let Some(runtime) = current_runtime() else {
            return;
        };
        let (effects, next_deadline) = {
            let Ok(mut engine) = runtime.engine.try_borrow_mut() else {
                return;
            };
            let effects = engine.on_debounce_elapsed(Instant::now(), &runtime.probe);
            (effects, engine.pending_deadline())
        };
        match next_deadline {
            Some(deadline) => arm_debounce(deadline),
            None => DEBOUNCE_TIMER.with(|slot| *slot.borrow_mut() = None),
        }
        perform_effects(&runtime, effects);
    }

    pub(super) fn dispatch_theme_signal() {
        let Some(runtime) = current_runtime() else {
            return;
        };
        if let Ok(mut engine) = runtime.engine.try_borrow_mut() {
            engine.on_theme_signal(&runtime.probe);
        }
    }

    pub(super) fn dispatch_badge_tick() {
        let Some(runtime) = current_runtime() else {
            return;
        };
        if let Ok(mut engine) = runtime.engine.try_borrow_mut() {
            engine.on_badge_tick(&runtime.probe);
        }
    }

    pub(super) fn dispatch_companion_ready() {
        let Some(runtime) = current_runtime() else {
            return;
        };
        if let Ok(mut hooks) = runtime.hooks.try_borrow_mut() {
            hooks.settle_handshake();
        }
        if let Ok(mut engine) = runtime.engine.try_borrow_mut() {
            engine.on_companion_ready();
        }
    }

    pub(super) fn dispatch_companion_timeout() {
        let Some(runtime) = current_runtime() else {
            return;
        };
        let (Ok(mut engine), Ok(mut hooks)) =
            (runtime.engine.try_borrow_mut(), runtime.hooks.try_borrow_mut())
        else {
            tracing::debug!("companion deadline hit while the engine is busy");
            return;
        };
        hooks.settle_handshake();
        engine.on_companion_timeout(&mut *hooks);
    }

    pub(super) fn dispatch_tab_selected(tab: x41_core::TabId) {
        let Some(runtime) = current_runtime() else {
            return;
        };
        let effect = {
            let Ok(mut engine) = runtime.engine.try_borrow_mut() else {
                return;
            };
            engine.on_tab_selected(tab)
        };
        if let Some(effect) = effect {
            perform_effects(&runtime, vec![effect]);
        }
    }

    pub(super) fn perform_effects(runtime: &Rc<Runtime>, effects: Vec<Effect>) {
        let window = runtime.probe.window();
        for effect in effects {
            match effect {
                Effect::Redirect(target) => replace_location(window, &target),
                Effect::Navigate(path) => navigate(window, &path),
                Effect::Load(path) => load_location(window, &path),
                Effect::PersistIdentity(handle) => {
                    let runtime = Rc::clone(runtime);
                    spawn_local(async move {
                        runtime.resolver.remember(&runtime.store, &handle).await;
                    });
                }
            }
        }
    }

    fn replace_location(window: &web_sys::Window, target: &str) {
        if let Err(error) = window.location().replace(target) {
            tracing::warn!(to = %target, reason = %storage::describe_js_error(error), "redirect failed");
        }
    }

    /// In-app routing through the confirmed page companion. A failed post
    /// degrades to a full page load.
    fn navigate(window: &web_sys::Window, path: &str) {
        let message = match BridgeMessage::navigate(path) {
            Ok(message) => message,
            Err(rejection) => {
                tracing::debug!(reason = %rejection, "refusing navigation");
                return;
            }
        };
        if post_bridge_message(window, &message).is_err() {
            load_location(window, path);
        }
    }

    fn load_location(window: &web_sys::Window, path: &str) {
        if let Err(rejection) = x41_core::validate_path(path) {
            tracing::debug!(reason = %rejection, "refusing page load");
            return;
        }
        if let Err(error) = window.location().set_href(path) {
            tracing::warn!(path = %path, reason = %storage::describe_js_error(error), "navigation failed");
        }
    }

    pub(super) fn post_bridge_message(
        window: &web_sys::Window,
        message: &BridgeMessage,
    ) -> Result<(), JsValue> {
        let text = serde_json::to_string(message)
            .map_err(|error| JsValue::from_str(&error.to_string()))?;
        let payload = js_sys::JSON::parse(&text)?;
        window.post_message(&payload, &current_origin(window))
    }
