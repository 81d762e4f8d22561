use super::*;

    type HistoryShim = Closure<dyn FnMut(JsValue, JsValue, JsValue) -> Result<JsValue, JsValue>>;

    const PUSH_STATE: &str = "pushState";
    const REPLACE_STATE: &str = "replaceState";

    /// Page-world half of the bridge. Announces every host router change as
    /// `X41_NAVIGATED`, performs `X41_NAVIGATE` requests in place and answers
    /// `X41_HELLO` with `X41_READY`.
    pub(crate) struct PageCompanion {
        history: web_sys::History,
        original_push: js_sys::Function,
        original_replace: js_sys::Function,
        _push_shim: HistoryShim,
        _replace_shim: HistoryShim,
        _requests: ListenerGuard,
    }

    impl PageCompanion {
        pub(super) fn install() -> Result<Self, HostError> {
            let window = web_sys::window().ok_or(HostError::WindowUnavailable)?;
            let history = window
                .history()
                .map_err(|_| HostError::Hook { hook: "history" })?;
            let original_push = history_method(&history, PUSH_STATE)?;
            let original_replace = history_method(&history, REPLACE_STATE)?;

            let push_shim = announcing_shim(&window, &history, original_push.clone());
            let replace_shim = announcing_shim(&window, &history, original_replace.clone());
            let installed = set_history_method(&history, PUSH_STATE, push_shim.as_ref())
                .and_then(|()| set_history_method(&history, REPLACE_STATE, replace_shim.as_ref()));
            if let Err(error) = installed {
                let _ = set_history_method(&history, PUSH_STATE, &original_push);
                let _ = set_history_method(&history, REPLACE_STATE, &original_replace);
                return Err(error);
            }

            let target: web_sys::EventTarget = window.clone().into();
            let listener_window = window.clone();
            let requests = ListenerGuard::install(&target, "message", false, move |event| {
                on_navigate_request(&listener_window, &event);
            });
            let requests = match requests {
                Ok(requests) => requests,
                Err(error) => {
                    let _ = set_history_method(&history, PUSH_STATE, &original_push);
                    let _ = set_history_method(&history, REPLACE_STATE, &original_replace);
                    return Err(error);
                }
            };
            tracing::debug!("page companion installed");
            announce_ready(&window);
            Ok(Self {
                history,
                original_push,
                original_replace,
                _push_shim: push_shim,
                _replace_shim: replace_shim,
                _requests: requests,
            })
        }

        /// Puts the host's own history methods back. The request listener
        /// goes away with `self`.
        pub(super) fn restore(self) {
            let _ = set_history_method(&self.history, PUSH_STATE, &self.original_push);
            let _ = set_history_method(&self.history, REPLACE_STATE, &self.original_replace);
            tracing::debug!("page companion removed");
        }
    }

    fn history_method(history: &web_sys::History, name: &'static str) -> Result<js_sys::Function, HostError> {
        js_sys::Reflect::get(history, &JsValue::from_str(name))
            .ok()
            .and_then(|method| method.dyn_into::<js_sys::Function>().ok())
            .ok_or(HostError::Hook { hook: name })
    }

    fn set_history_method(
        history: &web_sys::History,
        name: &'static str,
        method: &JsValue,
    ) -> Result<(), HostError> {
        match js_sys::Reflect::set(history, &JsValue::from_str(name), method) {
            Ok(true) => Ok(()),
            _ => Err(HostError::Hook { hook: name }),
        }
    }

    fn announcing_shim(
        window: &web_sys::Window,
        history: &web_sys::History,
        original: js_sys::Function,
    ) -> HistoryShim {
        let window = window.clone();
        let history = history.clone();
        Closure::wrap(Box::new(move |state: JsValue, title: JsValue, url: JsValue| {
            let result = original.call3(&history, &state, &title, &url)?;
            announce_navigation(&window);
            Ok(result)
        }))
    }

    /// Covers a content script that booted first and already said hello.
    fn announce_ready(window: &web_sys::Window) {
        if post_bridge_message(window, &BridgeMessage::Ready).is_err() {
            tracing::debug!("failed to announce companion");
        }
    }

    fn announce_navigation(window: &web_sys::Window) {
        let path = current_pathname(window);
        match BridgeMessage::navigated(&path) {
            Ok(message) => {
                if post_bridge_message(window, &message).is_err() {
                    tracing::debug!(path = %path, "failed to announce navigation");
                }
            }
            Err(rejection) => tracing::debug!(reason = %rejection, "not announcing navigation"),
        }
    }

    fn on_navigate_request(window: &web_sys::Window, event: &web_sys::Event) {
        let Some((same_window, origin, data)) = message_event_parts(window, event) else {
            return;
        };
        let expected_origin = current_origin(window);
        let trusted = MessageOrigin {
            same_window,
            origin: &origin,
            expected_origin: &expected_origin,
        };
        match accept_message(trusted, &data) {
            Some(BridgeMessage::Navigate { path }) => navigate_in_page(window, &path),
            Some(BridgeMessage::Hello) => announce_ready(window),
            _ => {}
        }
    }

    /// Pushes the path and replays it to the host router as a traversal.
    fn navigate_in_page(window: &web_sys::Window, path: &str) {
        let Ok(history) = window.history() else {
            return;
        };
        if let Err(error) = history.push_state_with_url(&JsValue::NULL, "", Some(path)) {
            tracing::debug!(path = %path, reason = %storage::describe_js_error(error), "pushState refused");
            return;
        }
        match web_sys::PopStateEvent::new("popstate") {
            Ok(event) => {
                let _ = window.dispatch_event(&event);
            }
            Err(error) => {
                tracing::debug!(reason = %storage::describe_js_error(error), "failed to create popstate event");
            }
        }
    }
