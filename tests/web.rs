//! Browser tests for the exported surface.
//!
//! Run with `wasm-pack test --headless --chrome`.

#![cfg(target_arch = "wasm32")]

use wasm_bindgen_test::*;

use messaging_sw_wasm::RelayConfig;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn test_ping() {
    assert_eq!(messaging_sw_wasm::ping(), "messaging-sw-wasm loaded");
}

#[wasm_bindgen_test]
fn test_config_from_js_object() {
    let value = js_sys::JSON::parse(
        r#"{"messaging":{"apiKey":"k","appId":"a","messagingSenderId":"s","projectId":"p"},"encodeParams":true}"#,
    )
    .expect("valid json");

    let config: RelayConfig = serde_wasm_bindgen::from_value(value).expect("deserialize");
    config.validate().expect("valid config");
    assert!(config.encode_params);
    assert_eq!(config.base_path, "/");
}
