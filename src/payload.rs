//! Push payload model and notification resolution.
//!
//! The messaging backend delivers a JSON document in each push message:
//!
//! ```json
//! {
//!   "from": "776894109088",
//!   "collapse_key": "chat",
//!   "fcmMessageId": "b0c1...",
//!   "notification": { "title": "Sara", "body": "hi" },
//!   "data": { "route": "chat", "roomId": "42", "peerUid": "u7" }
//! }
//! ```
//!
//! Only `notification` and `data` drive what the user sees. `data` is kept
//! exactly as received and attached to the displayed notification so the
//! click handler can build a deep link from it.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::config::RelayConfig;
use crate::error::RelayResult;

/// Application-defined key/value data carried by a push.
pub type NotificationData = BTreeMap<String, String>;

/// Build a data mapping from loosely typed values.
///
/// Strings are kept, numbers and booleans are written the way a JavaScript
/// template literal would write them. Nulls, arrays and objects are dropped,
/// so one odd value does not cost the routing fields next to it.
pub fn data_from_values(values: BTreeMap<String, Value>) -> NotificationData {
    values
        .into_iter()
        .filter_map(|(key, value)| scalar_to_string(&value).map(|v| (key, v)))
        .collect()
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Some(u.to_string())
            } else {
                let f = n.as_f64()?;
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    Some((f as i64).to_string())
                } else {
                    Some(f.to_string())
                }
            }
        }
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn lenient_data<'de, D>(deserializer: D) -> Result<Option<NotificationData>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?;
    Ok(values.map(data_from_values))
}

/// `messageType` value for payloads forwarded to a visible window.
pub const PUSH_RECEIVED: &str = "push-received";

/// Display fields of a push.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Delivery options attached by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FcmOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// A push message as delivered by the messaging channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification: Option<NotificationFields>,
    #[serde(
        default,
        deserialize_with = "lenient_data",
        skip_serializing_if = "Option::is_none"
    )]
    pub data: Option<NotificationData>,
    /// Sender id of the messaging project.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(
        default,
        rename = "collapse_key",
        alias = "collapseKey",
        skip_serializing_if = "Option::is_none"
    )]
    pub collapse_key: Option<String>,
    #[serde(
        default,
        rename = "fcmMessageId",
        alias = "messageId",
        skip_serializing_if = "Option::is_none"
    )]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fcm_options: Option<FcmOptions>,
}

impl PushPayload {
    /// Parse the text of a push message.
    pub fn from_json(text: &str) -> RelayResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    fn notification_field(&self, pick: fn(&NotificationFields) -> Option<&String>) -> Option<&str> {
        self.notification
            .as_ref()
            .and_then(pick)
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    fn data_field(&self, key: &str) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|d| d.get(key))
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Resolve what to show for this push.
    ///
    /// Title and body fall back from the notification object to the data
    /// mapping to the configured defaults. Empty strings count as missing.
    pub fn resolve(&self, config: &RelayConfig) -> DisplayNotification {
        let title = self
            .notification_field(|n| n.title.as_ref())
            .or_else(|| self.data_field("title"))
            .unwrap_or(config.default_title.as_str())
            .to_string();

        let body = self
            .notification_field(|n| n.body.as_ref())
            .or_else(|| self.data_field("body"))
            .unwrap_or(config.default_body.as_str())
            .to_string();

        DisplayNotification {
            title,
            body,
            icon: self.notification.as_ref().and_then(|n| n.icon.clone()),
            image: self.notification.as_ref().and_then(|n| n.image.clone()),
            data: self.data.clone().unwrap_or_default(),
        }
    }
}

/// A notification ready to hand to the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayNotification {
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Copied verbatim from the payload's `data`.
    pub data: NotificationData,
}

/// Message posted to visible windows instead of showing a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardedMessage {
    pub message_type: String,
    pub is_firebase_messaging: bool,
    #[serde(flatten)]
    pub payload: PushPayload,
}

impl ForwardedMessage {
    pub fn push_received(payload: PushPayload) -> Self {
        Self {
            message_type: PUSH_RECEIVED.to_string(),
            is_firebase_messaging: true,
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MessagingConfig, DEFAULT_BODY, DEFAULT_TITLE};

    fn config() -> RelayConfig {
        RelayConfig::new(MessagingConfig::default())
    }

    #[test]
    fn test_parses_wire_payload() {
        let payload = PushPayload::from_json(
            r#"{
                "from": "776",
                "collapse_key": "chat",
                "fcmMessageId": "m-1",
                "priority": "high",
                "notification": {"title": "Sara", "body": "hi", "icon": "/i.png"},
                "data": {"route": "chat", "roomId": "42"},
                "fcmOptions": {"link": "/chat"}
            }"#,
        )
        .expect("parse");

        assert_eq!(payload.from.as_deref(), Some("776"));
        assert_eq!(payload.collapse_key.as_deref(), Some("chat"));
        assert_eq!(payload.message_id.as_deref(), Some("m-1"));
        assert_eq!(payload.fcm_options.unwrap().link.as_deref(), Some("/chat"));
        assert_eq!(payload.data.unwrap().get("roomId").map(String::as_str), Some("42"));
    }

    #[test]
    fn test_accepts_external_key_aliases() {
        let payload =
            PushPayload::from_json(r#"{"collapseKey":"c","messageId":"m"}"#).expect("parse");
        assert_eq!(payload.collapse_key.as_deref(), Some("c"));
        assert_eq!(payload.message_id.as_deref(), Some("m"));
    }

    #[test]
    fn test_scalar_data_values_are_stringified() {
        let payload = PushPayload::from_json(
            r#"{"data":{"route":"chat","roomId":42,"muted":false,"ratio":1.5,"extra":{"a":1},"gone":null}}"#,
        )
        .expect("parse");

        let data = payload.data.expect("data");
        assert_eq!(data.get("route").map(String::as_str), Some("chat"));
        assert_eq!(data.get("roomId").map(String::as_str), Some("42"));
        assert_eq!(data.get("muted").map(String::as_str), Some("false"));
        assert_eq!(data.get("ratio").map(String::as_str), Some("1.5"));
        assert!(!data.contains_key("extra"));
        assert!(!data.contains_key("gone"));
    }

    #[test]
    fn test_integral_floats_print_without_fraction() {
        let values: BTreeMap<String, Value> =
            [("roomId".to_string(), serde_json::json!(42.0))].into_iter().collect();
        assert_eq!(
            data_from_values(values).get("roomId").map(String::as_str),
            Some("42")
        );
    }

    #[test]
    fn test_null_data_is_absent() {
        let payload = PushPayload::from_json(r#"{"data":null}"#).expect("parse");
        assert_eq!(payload.data, None);
    }

    #[test]
    fn test_resolve_prefers_notification_fields() {
        let payload = PushPayload::from_json(
            r#"{"notification":{"title":"N","body":"NB"},"data":{"title":"D","body":"DB"}}"#,
        )
        .unwrap();

        let shown = payload.resolve(&config());
        assert_eq!(shown.title, "N");
        assert_eq!(shown.body, "NB");
    }

    #[test]
    fn test_resolve_falls_back_to_data_fields() {
        let payload = PushPayload::from_json(r#"{"data":{"title":"D","body":"DB"}}"#).unwrap();

        let shown = payload.resolve(&config());
        assert_eq!(shown.title, "D");
        assert_eq!(shown.body, "DB");
    }

    #[test]
    fn test_resolve_treats_empty_strings_as_missing() {
        let payload = PushPayload::from_json(
            r#"{"notification":{"title":"","body":""},"data":{"title":"D"}}"#,
        )
        .unwrap();

        let shown = payload.resolve(&config());
        assert_eq!(shown.title, "D");
        assert_eq!(shown.body, DEFAULT_BODY);
    }

    #[test]
    fn test_resolve_uses_defaults_for_empty_payload() {
        let shown = PushPayload::default().resolve(&config());
        assert_eq!(shown.title, DEFAULT_TITLE);
        assert_eq!(shown.body, DEFAULT_BODY);
        assert!(shown.data.is_empty());
    }

    #[test]
    fn test_resolve_uses_configured_defaults() {
        let mut config = config();
        config.default_title = "New message".to_string();
        config.default_body = "You have a notification".to_string();

        let shown = PushPayload::default().resolve(&config);
        assert_eq!(shown.title, "New message");
        assert_eq!(shown.body, "You have a notification");
    }

    #[test]
    fn test_forwarded_message_flattens_payload() {
        let payload = PushPayload::from_json(r#"{"data":{"route":"chat"}}"#).unwrap();
        let json = serde_json::to_value(ForwardedMessage::push_received(payload)).unwrap();

        assert_eq!(json["messageType"], "push-received");
        assert_eq!(json["isFirebaseMessaging"], true);
        assert_eq!(json["data"]["route"], "chat");
    }
}
