//! Deep links back into the application.
//!
//! A clicked notification opens the app root with the routing fields from
//! its data as query parameters:
//!
//! ```text
//! /?route=chat&roomId=42&root=&title=&peerUid=
//! ```
//!
//! The application reads these on load and navigates itself. Every parameter
//! is always present, empty when the data lacks it.

use crate::payload::NotificationData;

/// Query parameters forwarded to the application, in URL order.
pub const ROUTE_PARAMS: [&str; 5] = ["route", "roomId", "root", "title", "peerUid"];

/// How parameter values are written into the query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParamEncoding {
    /// Values are inserted as-is. A value containing `&`, `=` or `#` will
    /// corrupt the query string.
    #[default]
    Raw,
    /// Values are percent-encoded.
    Percent,
}

impl ParamEncoding {
    pub fn from_flag(encode: bool) -> Self {
        if encode {
            ParamEncoding::Percent
        } else {
            ParamEncoding::Raw
        }
    }
}

/// Build the deep link for a notification's data.
pub fn build_url(base_path: &str, data: &NotificationData, encoding: ParamEncoding) -> String {
    let query = ROUTE_PARAMS
        .iter()
        .map(|key| {
            let value = data.get(*key).map(String::as_str).unwrap_or("");
            match encoding {
                ParamEncoding::Raw => format!("{key}={value}"),
                ParamEncoding::Percent => format!("{key}={}", urlencoding::encode(value)),
            }
        })
        .collect::<Vec<_>>()
        .join("&");

    format!("{base_path}?{query}")
}
