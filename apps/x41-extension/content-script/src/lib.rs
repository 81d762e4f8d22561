#![allow(clippy::needless_pass_by_value)]

#[cfg(any(target_arch = "wasm32", test))]
mod clicks;
#[cfg(target_arch = "wasm32")]
mod wasm_constants;
#[cfg(target_arch = "wasm32")]
mod wasm_state;

#[cfg(target_arch = "wasm32")]
mod wasm {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use web_time::{Duration, Instant};

    use gloo_timers::callback::{Interval, Timeout};
    use wasm_bindgen::JsCast;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::{JsFuture, spawn_local};
    use web_sys::{MessageEvent, MouseEvent};
    use x41_core::bridge::{MessageOrigin, accept_message};
    use x41_core::presenter::{TAB_CLASS, TAB_ID_ATTRIBUTE};
    use x41_core::{
        BridgeMessage, Dom, Effect, EngineConfig, HostError, IdentityResolver, InitOutcome,
        KeyValueStore, LifecycleController, NavigationSignal, NavigationSource, PageHooks,
        PageProbe, PathPoller, Sleeper, StorageError, initialize,
    };

    use crate::clicks::{ClickGesture, tab_for_click};
    use crate::wasm_constants::*;
    use crate::wasm_state::{Runtime, UnbootedDiagnostics};

    mod companion;
    mod dom;
    mod lifecycle;
    mod logging;
    mod routing;
    mod storage;

    pub(crate) use dom::{WebDom, WebProbe};
    pub(crate) use routing::BrowserHooks;
    pub(crate) use storage::BrowserStore;

    use companion::PageCompanion;
    use lifecycle::*;
    use routing::*;
    use storage::TimerSleeper;

    thread_local! {
        static RUNTIME: RefCell<Option<Rc<Runtime>>> = const { RefCell::new(None) };
        static DEBOUNCE_TIMER: RefCell<Option<Timeout>> = const { RefCell::new(None) };
        static COMPANION: RefCell<Option<PageCompanion>> = const { RefCell::new(None) };
        static BOOT_STARTED: Cell<bool> = const { Cell::new(false) };
        static BOOT_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
    }

    /// Boots the isolated-world content script. Repeated calls are ignored.
    #[wasm_bindgen]
    pub fn boot_content_script() {
        if BOOT_STARTED.with(|started| started.replace(true)) {
            return;
        }
        console_error_panic_hook::set_once();
        spawn_local(async {
            if let Err(error) = boot().await {
                tracing::debug!(reason = %error, "content script boot failed");
                BOOT_ERROR.with(|slot| *slot.borrow_mut() = Some(error.to_string()));
            }
        });
    }

    #[wasm_bindgen]
    pub fn teardown_content_script() {
        shutdown();
    }

    #[wasm_bindgen]
    pub fn diagnostics_json() -> String {
        let Some(runtime) = current_runtime() else {
            let unbooted = UnbootedDiagnostics {
                phase: UNBOOTED_PHASE,
                last_error: BOOT_ERROR.with(|slot| slot.borrow().clone()),
            };
            return serde_json::to_string(&unbooted)
                .unwrap_or_else(|_| format!("{{\"phase\":\"{UNBOOTED_PHASE}\"}}"));
        };
        let Ok(engine) = runtime.engine.try_borrow() else {
            return "{\"phase\":\"busy\"}".to_string();
        };
        serde_json::to_string(&engine.diagnostics()).unwrap_or_else(|_| {
            "{\"phase\":\"error\",\"detail\":\"diagnostics serialization failed\"}".to_string()
        })
    }

    #[wasm_bindgen]
    pub fn session_state_json() -> String {
        current_runtime()
            .and_then(|runtime| {
                let engine = runtime.engine.try_borrow().ok()?;
                serde_json::to_string(engine.session()).ok()
            })
            .unwrap_or_else(|| "{}".to_string())
    }

    /// Installs the page-world companion. Must run in the host's own
    /// execution context, not the isolated world.
    #[wasm_bindgen]
    pub fn boot_page_companion() {
        console_error_panic_hook::set_once();
        COMPANION.with(|slot| {
            if slot.borrow().is_some() {
                return;
            }
            match PageCompanion::install() {
                Ok(companion) => *slot.borrow_mut() = Some(companion),
                Err(error) => tracing::debug!(reason = %error, "page companion unavailable"),
            }
        });
    }

    #[wasm_bindgen]
    pub fn shutdown_page_companion() {
        let companion = COMPANION.with(|slot| slot.borrow_mut().take());
        if let Some(companion) = companion {
            companion.restore();
        }
    }

    pub(super) fn current_runtime() -> Option<Rc<Runtime>> {
        RUNTIME.with(|slot| slot.borrow().clone())
    }
}

#[cfg(target_arch = "wasm32")]
pub use wasm::diagnostics_json;

#[cfg(not(target_arch = "wasm32"))]
pub fn diagnostics_json() -> String {
    "{\"phase\":\"native\",\"detail\":\"content script diagnostics only available on wasm\"}".to_string()
}
