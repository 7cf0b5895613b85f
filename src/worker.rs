//! Browser bindings for the relay.
//!
//! Implements [`Platform`] and [`ClickedNotification`] on top of the service
//! worker global scope, and exports the entry points the JavaScript shim
//! calls:
//!
//! ```js
//! const ready = wasm_bindgen(WASM_URL).then(() => wasm_bindgen.install(self.MESSAGING_SW_CONFIG));
//! self.addEventListener('push', (e) => e.waitUntil(ready.then(() => wasm_bindgen.dispatchPush(e))));
//! ```
//!
//! Listeners have to be added during the script's first evaluation, before
//! the wasm module is ready, which is why they live in the shim and only
//! delegate here.

// Rust guideline compliant 2026-02

use std::cell::RefCell;
use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{future_to_promise, JsFuture};
use web_sys::{
    Client, ClientQueryOptions, ClientType, Clients, NotificationEvent, NotificationOptions,
    PushEvent, ServiceWorkerGlobalScope, ServiceWorkerRegistration, VisibilityState, WindowClient,
};

use crate::config::RelayConfig;
use crate::error::{RelayError, RelayResult};
use crate::lifecycle::{ExtendableEvent, PendingOperation, WorkerLifecycle};
use crate::payload::{data_from_values, DisplayNotification, ForwardedMessage, NotificationData};
use crate::platform::{ClickedNotification, Platform};
use crate::relay::PushRelay;

/// Global the host page's config script assigns.
const CONFIG_GLOBAL: &str = "MESSAGING_SW_CONFIG";

fn describe_js_error(operation: &str, err: &JsValue) -> String {
    let detail = err.as_string().unwrap_or_else(|| format!("{err:?}"));
    format!("{operation} failed: {detail}")
}

/// Serialize to a plain JS object (not a `Map`), so pages and the
/// notification center see ordinary properties.
pub(crate) fn to_js<T: Serialize>(value: &T) -> Result<JsValue, serde_wasm_bindgen::Error> {
    value.serialize(&serde_wasm_bindgen::Serializer::json_compatible())
}

/// Read notification data back from JS. Scalars are stringified; anything
/// that is not an object reads as empty.
pub(crate) fn read_data(value: JsValue) -> NotificationData {
    match serde_wasm_bindgen::from_value::<Option<BTreeMap<String, serde_json::Value>>>(value) {
        Ok(values) => values.map(data_from_values).unwrap_or_default(),
        Err(e) => {
            log::warn!("[Click] Ignoring unreadable notification data: {e}");
            NotificationData::new()
        }
    }
}

/// [`Platform`] backed by `ServiceWorkerGlobalScope`.
pub struct BrowserPlatform {
    registration: ServiceWorkerRegistration,
    clients: Clients,
}

impl BrowserPlatform {
    pub fn from_scope(scope: &ServiceWorkerGlobalScope) -> Self {
        Self {
            registration: scope.registration(),
            clients: scope.clients(),
        }
    }
}

#[async_trait(?Send)]
impl Platform for BrowserPlatform {
    type Client = Client;

    async fn show_notification(&self, notification: &DisplayNotification) -> RelayResult<()> {
        let options = NotificationOptions::new();
        options.set_body(&notification.body);
        let data = to_js(&notification.data)
            .map_err(|e| RelayError::Notification(format!("notification data: {e}")))?;
        options.set_data(&data);
        if let Some(icon) = &notification.icon {
            options.set_icon(icon);
        }
        if let Some(image) = &notification.image {
            js_sys::Reflect::set(&options, &"image".into(), &image.into())
                .map_err(|e| RelayError::Notification(describe_js_error("set image", &e)))?;
        }

        let promise = self
            .registration
            .show_notification_with_options(&notification.title, &options)
            .map_err(|e| RelayError::Notification(describe_js_error("showNotification", &e)))?;
        JsFuture::from(promise)
            .await
            .map_err(|e| RelayError::Notification(describe_js_error("showNotification", &e)))?;
        Ok(())
    }

    async fn window_clients(&self) -> RelayResult<Vec<Client>> {
        let options = ClientQueryOptions::new();
        options.set_type(ClientType::Window);
        options.set_include_uncontrolled(true);

        let list = JsFuture::from(self.clients.match_all_with_options(&options))
            .await
            .map_err(|e| RelayError::Clients(describe_js_error("clients.matchAll", &e)))?;
        let list: js_sys::Array = list
            .dyn_into()
            .map_err(|_| RelayError::Clients("clients.matchAll did not return an array".into()))?;

        Ok(list
            .iter()
            .filter_map(|value| value.dyn_into::<Client>().ok())
            .collect())
    }

    fn can_focus(&self, client: &Client) -> bool {
        js_sys::Reflect::has(client, &"focus".into()).unwrap_or(false)
    }

    fn is_visible(&self, client: &Client) -> bool {
        client
            .dyn_ref::<WindowClient>()
            .is_some_and(|w| w.visibility_state() == VisibilityState::Visible)
    }

    fn client_url(&self, client: &Client) -> String {
        client.url()
    }

    async fn focus(&self, client: &Client) -> RelayResult<()> {
        let window: &WindowClient = client.unchecked_ref();
        let promise = window
            .focus()
            .map_err(|e| RelayError::Window(describe_js_error("client.focus", &e)))?;
        JsFuture::from(promise)
            .await
            .map_err(|e| RelayError::Window(describe_js_error("client.focus", &e)))?;
        Ok(())
    }

    fn post_message(&self, client: &Client, message: &ForwardedMessage) -> RelayResult<()> {
        let value = to_js(message).map_err(|e| RelayError::Clients(format!("message: {e}")))?;
        client
            .post_message(&value)
            .map_err(|e| RelayError::Clients(describe_js_error("client.postMessage", &e)))
    }

    fn can_open_window(&self) -> bool {
        js_sys::Reflect::has(&self.clients, &"openWindow".into()).unwrap_or(false)
    }

    async fn open_window(&self, url: &str) -> RelayResult<()> {
        JsFuture::from(self.clients.open_window(url))
            .await
            .map_err(|e| RelayError::Window(describe_js_error("clients.openWindow", &e)))?;
        Ok(())
    }
}

/// The notification carried by a `notificationclick` event.
pub struct BrowserNotification(web_sys::Notification);

impl ClickedNotification for BrowserNotification {
    fn close(&self) {
        self.0.close();
    }

    fn data(&self) -> NotificationData {
        read_data(self.0.data())
    }
}

impl ExtendableEvent for web_sys::ExtendableEvent {
    fn wait_until(&self, operation: PendingOperation) -> RelayResult<()> {
        let promise = future_to_promise(async move {
            operation
                .run()
                .await
                .map(|()| JsValue::UNDEFINED)
                .map_err(JsValue::from)
        });
        web_sys::ExtendableEvent::wait_until(self, &promise)
            .map_err(|e| RelayError::Lifecycle(describe_js_error("waitUntil", &e)))
    }
}

struct Worker {
    lifecycle: WorkerLifecycle,
    relay: Option<PushRelay<BrowserPlatform>>,
}

thread_local! {
    static WORKER: RefCell<Worker> = RefCell::new(Worker {
        lifecycle: WorkerLifecycle::new(),
        relay: None,
    });
}

fn active_relay() -> RelayResult<PushRelay<BrowserPlatform>> {
    WORKER.with(|worker| {
        let worker = worker.borrow();
        worker.lifecycle.ensure_active()?;
        worker
            .relay
            .clone()
            .ok_or_else(|| RelayError::Lifecycle("relay not installed".into()))
    })
}

fn read_config(config: JsValue) -> RelayResult<RelayConfig> {
    let config = if config.is_undefined() || config.is_null() {
        js_sys::Reflect::get(&js_sys::global(), &CONFIG_GLOBAL.into())
            .map_err(|e| RelayError::Config(describe_js_error("read config global", &e)))?
    } else {
        config
    };

    if config.is_undefined() || config.is_null() {
        return Err(RelayError::Config(format!(
            "no configuration passed and self.{CONFIG_GLOBAL} is not set"
        )));
    }

    let config: RelayConfig =
        serde_wasm_bindgen::from_value(config).map_err(|e| RelayError::Config(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

/// Install the relay. Called once, after the wasm module has loaded.
///
/// `config` may be omitted, in which case `self.MESSAGING_SW_CONFIG` is used.
#[wasm_bindgen]
pub fn install(config: JsValue) -> Result<(), JsValue> {
    let config = read_config(config)?;
    crate::logging::init(config.level()?);

    let scope: ServiceWorkerGlobalScope = js_sys::global()
        .dyn_into()
        .map_err(|_| RelayError::Lifecycle("not running in a service worker".into()))?;

    WORKER.with(|worker| {
        let mut worker = worker.borrow_mut();
        worker.lifecycle.activate()?;
        log::info!(
            "[Worker] Installed for project {} (sender {})",
            config.messaging.project_id,
            config.messaging.messaging_sender_id
        );
        worker.relay = Some(PushRelay::new(BrowserPlatform::from_scope(&scope), config));
        Ok::<(), RelayError>(())
    })?;

    Ok(())
}

/// Handle a `push` event.
#[wasm_bindgen(js_name = "dispatchPush")]
pub fn dispatch_push(event: PushEvent) -> Result<(), JsValue> {
    let relay = active_relay()?;
    let text = event.data().map(|data| data.text());
    let extendable: &web_sys::ExtendableEvent = &event;
    relay.on_push(extendable, text)?;
    Ok(())
}

/// Handle a `notificationclick` event.
#[wasm_bindgen(js_name = "dispatchNotificationClick")]
pub fn dispatch_notification_click(event: NotificationEvent) -> Result<(), JsValue> {
    let relay = active_relay()?;
    let notification = BrowserNotification(event.notification());
    let extendable: &web_sys::ExtendableEvent = &event;
    relay.handle_notification_click(extendable, &notification)?;
    Ok(())
}

/// Stop handling events and abort work still pending on earlier events.
#[wasm_bindgen]
pub fn terminate() {
    WORKER.with(|worker| {
        let mut worker = worker.borrow_mut();
        if let Some(relay) = worker.relay.take() {
            let aborted = relay.abort_pending();
            log::info!("[Worker] Terminated, aborted {aborted} pending operation(s)");
        }
        worker.lifecycle.terminate();
    });
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_service_worker);

    fn config_object() -> JsValue {
        js_sys::JSON::parse(
            r#"{"messaging":{"apiKey":"k","appId":"a","messagingSenderId":"s","projectId":"p"}}"#,
        )
        .expect("valid json")
    }

    fn clear_config_global() {
        let global = js_sys::global();
        js_sys::Reflect::delete_property(&global, &CONFIG_GLOBAL.into())
            .expect("delete config global");
    }

    #[wasm_bindgen_test]
    fn test_data_becomes_plain_object_and_reads_back_unchanged() {
        let data: NotificationData = [("route", "chat"), ("roomId", "42"), ("peerUid", "u7")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let value = to_js(&data).expect("serialize");

        assert!(!value.is_instance_of::<js_sys::Map>());
        assert!(value.is_object());
        let room = js_sys::Reflect::get(&value, &"roomId".into()).expect("roomId");
        assert_eq!(room.as_string().as_deref(), Some("42"));
        assert_eq!(read_data(value), data);
    }

    #[wasm_bindgen_test]
    fn test_read_data_keeps_string_fields_next_to_numbers() {
        let value = js_sys::JSON::parse(r#"{"route":"chat","roomId":42}"#).expect("valid json");

        let data = read_data(value);

        assert_eq!(data.get("route").map(String::as_str), Some("chat"));
        assert_eq!(data.get("roomId").map(String::as_str), Some("42"));
    }

    #[wasm_bindgen_test]
    fn test_read_data_of_missing_or_odd_values_is_empty() {
        assert!(read_data(JsValue::UNDEFINED).is_empty());
        assert!(read_data(JsValue::NULL).is_empty());
        assert!(read_data(JsValue::from_str("chat")).is_empty());
    }

    #[wasm_bindgen_test]
    fn test_read_config_uses_global_when_not_passed() {
        clear_config_global();
        assert!(matches!(
            read_config(JsValue::UNDEFINED),
            Err(RelayError::Config(_))
        ));

        js_sys::Reflect::set(&js_sys::global(), &CONFIG_GLOBAL.into(), &config_object())
            .expect("set config global");
        let config = read_config(JsValue::UNDEFINED).expect("config from global");
        assert_eq!(config.messaging.project_id, "p");

        clear_config_global();
    }

    #[wasm_bindgen_test]
    fn test_read_config_rejects_incomplete_object() {
        let value = js_sys::JSON::parse(
            r#"{"messaging":{"apiKey":"","appId":"a","messagingSenderId":"s","projectId":"p"}}"#,
        )
        .expect("valid json");
        assert!(matches!(read_config(value), Err(RelayError::Config(_))));
    }

    #[wasm_bindgen_test]
    fn test_install_and_terminate_gate_dispatch() {
        assert!(matches!(active_relay(), Err(RelayError::Lifecycle(_))));

        install(config_object()).expect("first install");
        assert!(active_relay().is_ok());
        assert!(install(config_object()).is_err());

        terminate();
        assert!(matches!(active_relay(), Err(RelayError::Lifecycle(_))));
        assert!(install(config_object()).is_err());
    }
}
