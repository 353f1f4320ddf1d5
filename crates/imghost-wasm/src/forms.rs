//! Form validation and display formatting for the views.
//!
//! Validators return an array of messages; an empty array means the form
//! may be submitted.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use imghost_core::api::{Credentials, ProfileUpdate, Registration};
use imghost_core::format;
use imghost_core::upload::UploadPolicy;
use imghost_core::validation::{self, FieldError};
use imghost_core::{ClientConfig, Timestamp};
use serde::Serialize;
use wasm_bindgen::prelude::*;

fn messages(result: Result<(), Vec<FieldError>>) -> Vec<String> {
    result
        .err()
        .unwrap_or_default()
        .iter()
        .map(ToString::to_string)
        .collect()
}

#[wasm_bindgen]
pub fn validate_login(username: &str, password: &str) -> Vec<String> {
    messages(validation::validate_login(&Credentials {
        username: username.to_string(),
        password: password.to_string(),
    }))
}

#[wasm_bindgen]
pub fn validate_registration(
    username: &str,
    email: &str,
    password: &str,
    confirm_password: &str,
) -> Vec<String> {
    let registration = Registration {
        username: username.to_string(),
        email: email.to_string(),
        password: password.to_string(),
    };
    messages(validation::validate_registration(
        &registration,
        confirm_password,
    ))
}

#[wasm_bindgen]
pub fn validate_profile(username: Option<String>, email: Option<String>) -> Vec<String> {
    messages(validation::validate_profile(&ProfileUpdate {
        username,
        email,
        ..ProfileUpdate::default()
    }))
}

#[wasm_bindgen]
pub fn validate_password_change(current: &str, new_password: &str, confirm: &str) -> Vec<String> {
    messages(validation::validate_password_change(
        current,
        new_password,
        confirm,
    ))
}

#[derive(Serialize)]
struct StrengthReport {
    strength: validation::PasswordStrength,
    errors: Vec<String>,
}

/// `{strength: "weak" | "medium" | "strong", errors: string[]}`
#[wasm_bindgen]
pub fn password_strength(password: &str) -> Result<JsValue, JsValue> {
    let check = validation::validate_password(password);
    let report = StrengthReport {
        strength: check.strength,
        errors: check.errors.iter().map(ToString::to_string).collect(),
    };
    Ok(serde_wasm_bindgen::to_value(&report)?)
}

/// Problems that keep a file from being uploaded under the default limits.
#[wasm_bindgen]
pub fn check_upload(file_name: &str, content_type: &str, size: f64) -> Vec<String> {
    UploadPolicy::from_config(&ClientConfig::default())
        .check(file_name, content_type, size as u64)
        .iter()
        .map(ToString::to_string)
        .collect()
}

#[wasm_bindgen]
pub fn format_file_size(bytes: f64) -> String {
    format::format_file_size(bytes as u64)
}

#[wasm_bindgen]
pub fn format_number(n: f64) -> String {
    format::format_number(n as i64)
}

#[wasm_bindgen]
pub fn format_percentage(value: f64, total: f64, decimals: usize) -> String {
    format::format_percentage(value, total, decimals)
}

#[wasm_bindgen]
pub fn truncate_text(text: &str, max_chars: usize, suffix: Option<String>) -> String {
    format::truncate_text(text, max_chars, suffix.as_deref().unwrap_or("..."))
}

#[wasm_bindgen]
pub fn file_extension(file_name: &str) -> String {
    format::file_extension(file_name)
}

/// Epoch milliseconds or ISO text; anything else carries no date.
fn timestamp(value: &JsValue) -> Option<Timestamp> {
    if let Some(ms) = value.as_f64() {
        return ms.is_finite().then(|| Timestamp::Millis(ms as i64));
    }
    value.as_string().map(Timestamp::Iso)
}

/// Offset the browser's time zone has at `at`.
fn local_offset(at: DateTime<Utc>) -> FixedOffset {
    let date = js_sys::Date::new(&JsValue::from_f64(at.timestamp_millis() as f64));
    // Minutes west of UTC.
    let west = (date.get_timezone_offset() * 60.0) as i32;
    FixedOffset::west_opt(west).unwrap_or_else(|| Utc.fix())
}

/// Local date for a number (epoch ms) or ISO string; `"-"` when there is
/// none. `pattern` is `strftime` syntax, default `%Y-%m-%d %H:%M:%S`.
#[wasm_bindgen]
pub fn format_date(value: JsValue, pattern: Option<String>) -> String {
    let value = timestamp(&value);
    let offset = value
        .as_ref()
        .and_then(Timestamp::instant)
        .map_or_else(|| Utc.fix(), local_offset);
    format::format_date(
        value.as_ref(),
        offset,
        pattern.as_deref().unwrap_or(format::DATE_FORMAT),
    )
}

/// `"3 minutes ago"`, `"in 2 days"`, or `"-"`.
#[wasm_bindgen]
pub fn format_relative_time(value: JsValue) -> String {
    let now = DateTime::from_timestamp_millis(js_sys::Date::now() as i64).unwrap_or_default();
    format::format_relative_time(timestamp(&value).as_ref(), now)
}


#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_format_date_reads_numbers_and_text() {
        let iso = JsValue::from_str("2024-06-15T12:00:00Z");
        assert_eq!(format_date(iso, Some("%Y".to_string())), "2024");
        let millis = JsValue::from_f64(1_718_452_800_000.0);
        assert_eq!(format_date(millis, Some("%Y".to_string())), "2024");
    }

    #[wasm_bindgen_test]
    fn test_format_date_placeholder() {
        assert_eq!(format_date(JsValue::NULL, None), "-");
        assert_eq!(format_date(JsValue::from_str(""), None), "-");
        assert_eq!(format_date(JsValue::from_str("someday"), None), "-");
        assert_eq!(format_relative_time(JsValue::UNDEFINED), "-");
    }

    #[wasm_bindgen_test]
    fn test_relative_time_against_clock() {
        let five_minutes_ago = js_sys::Date::now() - 5.0 * 60_000.0;
        assert_eq!(
            format_relative_time(JsValue::from_f64(five_minutes_ago)),
            "5 minutes ago"
        );
    }
}
