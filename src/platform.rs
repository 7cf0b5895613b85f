//! Seams over the browser APIs the relay drives.
//!
//! The worker module implements these with `web-sys`; tests use in-memory
//! fakes.

use async_trait::async_trait;

use crate::error::RelayResult;
use crate::payload::{DisplayNotification, ForwardedMessage, NotificationData};

/// Notification center and client list of the worker's global scope.
#[async_trait(?Send)]
pub trait Platform {
    /// A window client handle.
    type Client: 'static;

    /// Ask the platform to display a notification.
    async fn show_notification(&self, notification: &DisplayNotification) -> RelayResult<()>;

    /// All window clients of the origin, including ones this worker does not
    /// control, in platform order.
    async fn window_clients(&self) -> RelayResult<Vec<Self::Client>>;

    /// Whether the client can be focused.
    fn can_focus(&self, client: &Self::Client) -> bool;

    /// Whether the client's page is currently visible.
    fn is_visible(&self, client: &Self::Client) -> bool;

    /// URL of the client's page.
    fn client_url(&self, client: &Self::Client) -> String;

    /// Bring the client to the foreground.
    async fn focus(&self, client: &Self::Client) -> RelayResult<()>;

    /// Post a message to the client's page.
    fn post_message(&self, client: &Self::Client, message: &ForwardedMessage) -> RelayResult<()>;

    /// Whether new windows can be opened from this context.
    fn can_open_window(&self) -> bool;

    /// Open a new window navigated to `url`.
    async fn open_window(&self, url: &str) -> RelayResult<()>;
}

/// A displayed notification delivered with a click event.
pub trait ClickedNotification {
    /// Dismiss the notification.
    fn close(&self);

    /// Data attached when the notification was shown. Empty when it carried
    /// none or the data is not a string mapping.
    fn data(&self) -> NotificationData;
}
