//! Common utilities shared across report generators.

use crate::eval::Status;
use serde_json::Value as JsonValue;

/// Format a reported value compactly: strings bare, everything else as JSON.
pub fn format_value(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Marker shown in front of a clause.
pub const fn status_marker(status: Status) -> &'static str {
    match status {
        Status::Pass => "✔",
        Status::Fail => "✘",
        Status::Error => "!",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&json!("text")), "text");
        assert_eq!(format_value(&json!(3)), "3");
        assert_eq!(format_value(&json!({"a": [1, 2]})), r#"{"a":[1,2]}"#);
        assert_eq!(format_value(&JsonValue::Null), "null");
    }

    #[test]
    fn test_markers_differ() {
        assert_ne!(status_marker(Status::Pass), status_marker(Status::Fail));
        assert_ne!(status_marker(Status::Fail), status_marker(Status::Error));
    }
}
