//! Push notification relay.
//!
//! Two handlers, both stateless between invocations:
//!
//! - **Push**: parse the message, forward it to a visible page if there is
//!   one, otherwise show a system notification
//!   ([`PushRelay::handle_background_message`]).
//! - **Notification click**: close the notification, build the deep link,
//!   then focus an open window or open a new one.
//!
//! Both register their asynchronous part with the triggering event before
//! returning, so the worker is kept alive until it settles.

use std::rc::Rc;

use futures::future::AbortHandle;

use crate::config::RelayConfig;
use crate::deep_link::{self, ParamEncoding};
use crate::error::RelayResult;
use crate::lifecycle::{ExtendableEvent, OperationTracker, PendingOperation};
use crate::payload::{DisplayNotification, ForwardedMessage, NotificationData, PushPayload};
use crate::platform::{ClickedNotification, Platform};

/// What a push ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// The push carried no data.
    Ignored,
    /// A page was visible; the payload was posted to this many windows.
    /// Windows whose post failed are not counted.
    Forwarded(usize),
    /// A system notification was shown.
    Displayed(DisplayNotification),
}

/// What a notification click ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// An existing window was brought to the foreground.
    Focused,
    /// A new window was opened at the given URL.
    Opened(String),
    /// No window to focus and opening windows is unsupported.
    Nothing,
}

/// Relays push messages to notifications and notification clicks to windows.
pub struct PushRelay<P: Platform> {
    platform: Rc<P>,
    config: Rc<RelayConfig>,
    pending: Rc<OperationTracker>,
}

impl<P: Platform> Clone for PushRelay<P> {
    fn clone(&self) -> Self {
        Self {
            platform: Rc::clone(&self.platform),
            config: Rc::clone(&self.config),
            pending: Rc::clone(&self.pending),
        }
    }
}

/// Pages under this scheme belong to browser extensions, not the app.
const EXTENSION_SCHEME: &str = "chrome-extension://";

impl<P: Platform + 'static> PushRelay<P> {
    pub fn new(platform: P, config: RelayConfig) -> Self {
        Self {
            platform: Rc::new(platform),
            config: Rc::new(config),
            pending: Rc::new(OperationTracker::new()),
        }
    }

    /// Number of event operations that have not settled.
    pub fn in_flight(&self) -> usize {
        self.pending.in_flight()
    }

    /// Abort every unsettled event operation. Returns how many were aborted.
    pub fn abort_pending(&self) -> usize {
        self.pending.abort_all()
    }

    fn extend(
        &self,
        event: &impl ExtendableEvent,
        operation: PendingOperation,
    ) -> RelayResult<AbortHandle> {
        let handle = operation.abort_handle();
        self.pending.track(&operation);
        event.wait_until(operation)?;
        Ok(handle)
    }

    fn is_app_page_visible(&self, client: &P::Client) -> bool {
        self.platform.is_visible(client)
            && !self.platform.client_url(client).starts_with(EXTENSION_SCHEME)
    }

    /// Show a notification for a push received while no page is visible.
    pub async fn handle_background_message(
        &self,
        payload: &PushPayload,
    ) -> RelayResult<DisplayNotification> {
        let notification = payload.resolve(&self.config);
        log::debug!(
            "[Push] Showing notification {:?} ({} data keys)",
            notification.title,
            notification.data.len()
        );
        self.platform.show_notification(&notification).await?;
        Ok(notification)
    }

    /// Handle the text of a push message.
    pub async fn handle_push(&self, text: Option<String>) -> RelayResult<PushOutcome> {
        let Some(text) = text.filter(|t| !t.trim().is_empty()) else {
            log::info!("[Push] Push without data, ignoring");
            return Ok(PushOutcome::Ignored);
        };

        let payload = PushPayload::from_json(&text)?;
        if let Some(id) = &payload.message_id {
            log::debug!("[Push] Received message {id}");
        }

        let clients = self.platform.window_clients().await?;
        if clients.iter().any(|c| self.is_app_page_visible(c)) {
            let message = ForwardedMessage::push_received(payload);
            let mut delivered = 0;
            for client in &clients {
                match self.platform.post_message(client, &message) {
                    Ok(()) => delivered += 1,
                    Err(e) => log::warn!("[Push] Forwarding to a window failed: {e}"),
                }
            }
            log::debug!(
                "[Push] Page visible, forwarded to {delivered} of {} window(s)",
                clients.len()
            );
            return Ok(PushOutcome::Forwarded(delivered));
        }

        let notification = self.handle_background_message(&payload).await?;
        Ok(PushOutcome::Displayed(notification))
    }

    /// Register push handling with the push event.
    pub fn on_push<E: ExtendableEvent>(
        &self,
        event: &E,
        text: Option<String>,
    ) -> RelayResult<AbortHandle> {
        let relay = self.clone();
        let operation = PendingOperation::new("push", async move {
            relay.handle_push(text).await.map(|_| ())
        });
        self.extend(event, operation)
    }

    /// Deep link for a notification's data.
    pub fn deep_link(&self, data: &NotificationData) -> String {
        deep_link::build_url(
            &self.config.base_path,
            data,
            ParamEncoding::from_flag(self.config.encode_params),
        )
    }

    /// Handle a click on a displayed notification.
    ///
    /// The notification is closed and the deep link computed before this
    /// returns; window focusing or opening runs as a pending operation on
    /// `event`.
    pub fn handle_notification_click<E, N>(
        &self,
        event: &E,
        notification: &N,
    ) -> RelayResult<AbortHandle>
    where
        E: ExtendableEvent,
        N: ClickedNotification + ?Sized,
    {
        notification.close();
        let url = self.deep_link(&notification.data());
        log::debug!("[Click] Notification closed, deep link {url}");

        let relay = self.clone();
        let operation = PendingOperation::new("notificationclick", async move {
            let outcome = relay.route_click(url).await?;
            log::info!("[Click] {outcome:?}");
            Ok(())
        });
        self.extend(event, operation)
    }

    /// Focus the first focusable window, or open `url` in a new one.
    ///
    /// Which window counts as first is up to the platform.
    pub async fn route_click(&self, url: String) -> RelayResult<ClickOutcome> {
        let clients = self.platform.window_clients().await?;

        if let Some(client) = clients.iter().find(|c| self.platform.can_focus(c)) {
            self.platform.focus(client).await?;
            return Ok(ClickOutcome::Focused);
        }

        if self.platform.can_open_window() {
            self.platform.open_window(&url).await?;
            return Ok(ClickOutcome::Opened(url));
        }

        Ok(ClickOutcome::Nothing)
    }
}
