use super::*;

    /// Extension-local storage when the extension namespace exposes it,
    /// otherwise the tab's `sessionStorage` holding JSON-encoded values.
    #[derive(Clone)]
    pub(crate) struct BrowserStore {
        window: web_sys::Window,
    }

    impl BrowserStore {
        pub(crate) fn new(window: web_sys::Window) -> Self {
            Self { window }
        }

        fn session_storage(&self) -> Result<web_sys::Storage, StorageError> {
            self.window
                .session_storage()
                .ok()
                .flatten()
                .ok_or(StorageError::Unavailable)
        }
    }

    fn extension_storage_area() -> Option<js_sys::Object> {
        let global = js_sys::global();
        EXTENSION_NAMESPACES.iter().find_map(|namespace| {
            let api = js_sys::Reflect::get(&global, &JsValue::from_str(namespace)).ok()?;
            if api.is_undefined() || api.is_null() {
                return None;
            }
            let storage = js_sys::Reflect::get(&api, &JsValue::from_str("storage")).ok()?;
            let local = js_sys::Reflect::get(&storage, &JsValue::from_str("local")).ok()?;
            local.dyn_into::<js_sys::Object>().ok()
        })
    }

    async fn call_storage_area(
        area: &js_sys::Object,
        method: &str,
        argument: &JsValue,
    ) -> Result<JsValue, String> {
        let function = js_sys::Reflect::get(area, &JsValue::from_str(method))
            .map_err(describe_js_error)?
            .dyn_into::<js_sys::Function>()
            .map_err(|_| format!("storage.local.{method} is not callable"))?;
        let result = function.call1(area, argument).map_err(describe_js_error)?;
        let promise = result
            .dyn_into::<js_sys::Promise>()
            .map_err(|_| format!("storage.local.{method} did not return a promise"))?;
        JsFuture::from(promise).await.map_err(describe_js_error)
    }

    pub(super) fn describe_js_error(error: JsValue) -> String {
        error
            .as_string()
            .or_else(|| {
                js_sys::JSON::stringify(&error)
                    .ok()
                    .and_then(|text| text.as_string())
            })
            .unwrap_or_else(|| "unknown javascript error".to_string())
    }

    /// Strings come back as-is; structured values as their JSON text.
    fn stored_value_text(value: JsValue) -> Option<String> {
        if value.is_undefined() || value.is_null() {
            return None;
        }
        if let Some(text) = value.as_string() {
            return Some(text);
        }
        js_sys::JSON::stringify(&value)
            .ok()
            .and_then(|text| text.as_string())
    }

    fn decode_session_value(raw: String) -> String {
        match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(serde_json::Value::String(text)) => text,
            _ => raw,
        }
    }

    #[async_trait::async_trait(?Send)]
    impl KeyValueStore for BrowserStore {
        async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            let read_error = |reason: String| StorageError::Read {
                key: key.to_string(),
                reason,
            };
            if let Some(area) = extension_storage_area() {
                let items = call_storage_area(&area, "get", &JsValue::from_str(key))
                    .await
                    .map_err(read_error)?;
                let value = js_sys::Reflect::get(&items, &JsValue::from_str(key))
                    .map_err(|error| read_error(describe_js_error(error)))?;
                return Ok(stored_value_text(value));
            }
            let storage = self.session_storage()?;
            let raw = storage
                .get_item(key)
                .map_err(|error| read_error(describe_js_error(error)))?;
            Ok(raw.map(decode_session_value))
        }

        async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            let write_error = |reason: String| StorageError::Write {
                key: key.to_string(),
                reason,
            };
            if let Some(area) = extension_storage_area() {
                let items = js_sys::Object::new();
                js_sys::Reflect::set(&items, &JsValue::from_str(key), &JsValue::from_str(value))
                    .map_err(|error| write_error(describe_js_error(error)))?;
                call_storage_area(&area, "set", &items)
                    .await
                    .map_err(write_error)?;
                return Ok(());
            }
            let encoded = serde_json::to_string(value)
                .map_err(|error| write_error(error.to_string()))?;
            self.session_storage()?
                .set_item(key, &encoded)
                .map_err(|error| write_error(describe_js_error(error)))
        }
    }

    pub(crate) struct TimerSleeper;

    #[async_trait::async_trait(?Send)]
    impl Sleeper for TimerSleeper {
        async fn sleep(&self, duration: Duration) {
            gloo_timers::future::sleep(duration).await;
        }
    }
