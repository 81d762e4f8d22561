use super::*;

    /// A registered event listener. Dropping it unregisters the callback.
    pub(super) struct ListenerGuard {
        target: web_sys::EventTarget,
        event: &'static str,
        capture: bool,
        callback: Closure<dyn FnMut(web_sys::Event)>,
    }

    impl ListenerGuard {
        pub(super) fn install(
            target: &web_sys::EventTarget,
            event: &'static str,
            capture: bool,
            handler: impl FnMut(web_sys::Event) + 'static,
        ) -> Result<Self, HostError> {
            let callback = Closure::<dyn FnMut(web_sys::Event)>::wrap(Box::new(handler));
            target
                .add_event_listener_with_callback_and_bool(
                    event,
                    callback.as_ref().unchecked_ref(),
                    capture,
                )
                .map_err(|_| HostError::Hook { hook: event })?;
            Ok(Self {
                target: target.clone(),
                event,
                capture,
                callback,
            })
        }
    }

    impl Drop for ListenerGuard {
        fn drop(&mut self) {
            let _ = self.target.remove_event_listener_with_callback_and_bool(
                self.event,
                self.callback.as_ref().unchecked_ref(),
                self.capture,
            );
        }
    }

    /// A connected mutation observer. Dropping it disconnects.
    struct ObserverGuard {
        observer: web_sys::MutationObserver,
        _callback: Closure<dyn FnMut(js_sys::Array, web_sys::MutationObserver)>,
    }

    impl ObserverGuard {
        fn observe(
            target: &web_sys::Node,
            options: &web_sys::MutationObserverInit,
            hook: &'static str,
            mut handler: impl FnMut() + 'static,
        ) -> Result<Self, HostError> {
            let callback = Closure::<dyn FnMut(js_sys::Array, web_sys::MutationObserver)>::wrap(
                Box::new(move |_records, _observer| handler()),
            );
            let observer = web_sys::MutationObserver::new(callback.as_ref().unchecked_ref())
                .map_err(|_| HostError::Hook { hook })?;
            observer
                .observe_with_options(target, options)
                .map_err(|_| HostError::Hook { hook })?;
            Ok(Self {
                observer,
                _callback: callback,
            })
        }
    }

    impl Drop for ObserverGuard {
        fn drop(&mut self) {
            self.observer.disconnect();
        }
    }

    /// Browser-side listener and timer ownership for one content script.
    /// Every group is torn down by dropping its guards.
    pub(crate) struct BrowserHooks {
        window: web_sys::Window,
        document: web_sys::Document,
        path_poll_interval: Duration,
        handshake_timeout: Duration,
        listeners: Vec<ListenerGuard>,
        observers: Vec<ObserverGuard>,
        intervals: Vec<Interval>,
        handshake: Option<Timeout>,
    }

    impl BrowserHooks {
        pub(crate) fn new(
            window: web_sys::Window,
            document: web_sys::Document,
            path_poll_interval: Duration,
            handshake_timeout: Duration,
        ) -> Self {
            Self {
                window,
                document,
                path_poll_interval,
                handshake_timeout,
                listeners: Vec::new(),
                observers: Vec::new(),
                intervals: Vec::new(),
                handshake: None,
            }
        }

        /// Drops the handshake deadline. Never called from inside the
        /// deadline's own callback.
        pub(super) fn settle_handshake(&mut self) {
            self.handshake = None;
        }

        fn listen(
            &mut self,
            target: &web_sys::EventTarget,
            event: &'static str,
            capture: bool,
            handler: impl FnMut(web_sys::Event) + 'static,
        ) -> Result<(), HostError> {
            self.listeners
                .push(ListenerGuard::install(target, event, capture, handler)?);
            Ok(())
        }

        fn every(&mut self, period: Duration, handler: impl FnMut() + 'static) {
            self.intervals
                .push(Interval::new(duration_millis(period), handler));
        }
    }

    impl PageHooks for BrowserHooks {
        fn install_navigation_hooks(&mut self, source: NavigationSource) -> Result<(), HostError> {
            let window_target: web_sys::EventTarget = self.window.clone().into();
            let window = self.window.clone();
            self.listen(&window_target, "popstate", false, move |_event| {
                dispatch_route_signal(&current_pathname(&window), NavigationSignal::Traverse);
            })?;

            match source {
                NavigationSource::Companion => {
                    let window = self.window.clone();
                    self.listen(&window_target, "message", false, move |event| {
                        on_bridge_message(&window, &event);
                    })?;
                    // The companion may not be running at all. Ask, and fall
                    // back to polling if nobody answers in time.
                    self.handshake = Some(Timeout::new(duration_millis(self.handshake_timeout), || {
                        spawn_local(async { dispatch_companion_timeout() });
                    }));
                    if let Err(error) = post_bridge_message(&self.window, &BridgeMessage::Hello) {
                        tracing::debug!(reason = %storage::describe_js_error(error), "companion hello failed");
                    }
                }
                NavigationSource::Polling => self.start_path_polling()?,
            }

            let document_target: web_sys::EventTarget = self.document.clone().into();
            self.listen(&document_target, "click", true, on_document_click)
        }

        fn start_path_polling(&mut self) -> Result<(), HostError> {
            let window = self.window.clone();
            let mut poller = PathPoller::new(&current_pathname(&window));
            self.every(self.path_poll_interval, move || {
                if let Some(path) = poller.observe(&current_pathname(&window)) {
                    dispatch_route_signal(&path, NavigationSignal::Poll);
                }
            });
            Ok(())
        }

        fn install_theme_hooks(&mut self) -> Result<(), HostError> {
            if let Ok(Some(query)) = self.window.match_media(PREFERS_DARK_QUERY) {
                let query_target: web_sys::EventTarget = query.into();
                self.listen(&query_target, "change", false, |_event| dispatch_theme_signal())?;
            }
            let body = self.document.body().ok_or(HostError::BodyUnavailable)?;
            let options = web_sys::MutationObserverInit::new();
            options.set_attributes(true);
            options.set_attribute_filter(&string_array(&THEME_ATTRIBUTES));
            self.observers.push(ObserverGuard::observe(
                &body.into(),
                &options,
                "theme_observer",
                dispatch_theme_signal,
            )?);
            Ok(())
        }

        fn start_badge_watch(&mut self, interval: Duration) -> Result<(), HostError> {
            self.every(interval, dispatch_badge_tick);

            if let Ok(Some(navigation)) = self.document.query_selector(HOST_NAVIGATION_SELECTOR) {
                let options = web_sys::MutationObserverInit::new();
                options.set_child_list(true);
                options.set_subtree(true);
                options.set_character_data(true);
                self.observers.push(ObserverGuard::observe(
                    &navigation.into(),
                    &options,
                    "badge_observer",
                    dispatch_badge_tick,
                )?);
            }

            // Host re-renders that replace body children detach the tab bar.
            let body = self.document.body().ok_or(HostError::BodyUnavailable)?;
            let options = web_sys::MutationObserverInit::new();
            options.set_child_list(true);
            self.observers.push(ObserverGuard::observe(
                &body.into(),
                &options,
                "body_observer",
                dispatch_badge_tick,
            )?);
            Ok(())
        }

        fn uninstall_all(&mut self) {
            self.listeners.clear();
            self.observers.clear();
            self.intervals.clear();
            self.handshake = None;
            cancel_debounce();
        }
    }

    pub(super) fn current_pathname(window: &web_sys::Window) -> String {
        window
            .location()
            .pathname()
            .unwrap_or_else(|_| "/".to_string())
    }

    pub(super) fn current_origin(window: &web_sys::Window) -> String {
        window.location().origin().unwrap_or_default()
    }

    pub(super) fn message_event_parts(
        window: &web_sys::Window,
        event: &web_sys::Event,
    ) -> Option<(bool, String, serde_json::Value)> {
        let message = event.dyn_ref::<MessageEvent>()?;
        let same_window = message
            .source()
            .is_some_and(|source| js_sys::Object::is(&source, window.as_ref()));
        let text = js_sys::JSON::stringify(&message.data()).ok()?.as_string()?;
        let data = serde_json::from_str(&text).ok()?;
        Some((same_window, message.origin(), data))
    }

    fn on_bridge_message(window: &web_sys::Window, event: &web_sys::Event) {
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
            Some(BridgeMessage::Navigated { path }) => {
                dispatch_route_signal(&path, NavigationSignal::Push);
            }
            Some(BridgeMessage::Ready) => dispatch_companion_ready(),
            _ => {}
        }
    }

    fn on_document_click(event: web_sys::Event) {
        let Some(mouse_event) = event.dyn_ref::<MouseEvent>() else {
            return;
        };
        let gesture = ClickGesture {
            button: mouse_event.button(),
            meta: mouse_event.meta_key(),
            ctrl: mouse_event.ctrl_key(),
            shift: mouse_event.shift_key(),
            alt: mouse_event.alt_key(),
            default_prevented: event.default_prevented(),
        };
        let Some(tab_element) = tab_from_event(&event) else {
            return;
        };
        let Some(tab) = tab_for_click(gesture, tab_element.get_attribute(TAB_ID_ATTRIBUTE).as_deref())
        else {
            return;
        };
        event.prevent_default();
        dispatch_tab_selected(tab);
    }

    fn tab_from_event(event: &web_sys::Event) -> Option<web_sys::Element> {
        let selector = format!(".{TAB_CLASS}");
        let composed_path = event.composed_path();
        (0..composed_path.length())
            .filter_map(|index| composed_path.get(index).dyn_into::<web_sys::Element>().ok())
            .find_map(|element| element.closest(&selector).ok().flatten())
    }

    fn string_array(values: &[&str]) -> js_sys::Array {
        values.iter().map(|value| JsValue::from_str(value)).collect()
    }

    pub(super) fn duration_millis(duration: Duration) -> u32 {
        u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
    }
