// Request acquisition: stdin JSON body or the legacy positional argument
use serde_json::Value;
use std::io::Read;
use tracing::debug;

/// Outcome of reading the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Trimmed feedback text, possibly empty
    Feedback(String),
    /// Nothing usable was supplied; answer with the default response
    Default,
}

/// Read all of stdin and interpret it. I/O errors and invalid UTF-8 count as
/// unusable input.
pub fn read_stdin(legacy_arg: Option<&str>) -> Input {
    let mut raw = String::new();
    match std::io::stdin().read_to_string(&mut raw) {
        Ok(_) => parse(&raw, legacy_arg),
        Err(e) => {
            debug!("Could not read stdin: {}", e);
            Input::Default
        }
    }
}

/// Interpret raw stdin text, falling back to the legacy argument when stdin
/// is empty.
pub fn parse(raw: &str, legacy_arg: Option<&str>) -> Input {
    if raw.is_empty() {
        return match legacy_arg {
            Some(arg) => Input::Feedback(arg.trim().to_string()),
            None => Input::Default,
        };
    }

    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            debug!("Request is not JSON: {}", e);
            return Input::Default;
        }
    };
    let Some(request) = value.as_object() else {
        debug!("Request body is not a JSON object");
        return Input::Default;
    };

    match request.get("feedback") {
        Some(Value::String(text)) => Input::Feedback(text.trim().to_string()),
        None => Input::Feedback(String::new()),
        Some(other) if is_blank(other) => Input::Feedback(String::new()),
        Some(other) => {
            debug!("Request has an unusable feedback field: {}", other);
            Input::Default
        }
    }
}

/// Values that carry no text at all: null, false, zero, and empty containers
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_feedback_trimmed() {
        assert_eq!(
            parse(r#"{"feedback": "  app keeps crashing \n"}"#, None),
            Input::Feedback("app keeps crashing".to_string())
        );
    }

    #[test]
    fn test_empty_stdin_uses_legacy_arg() {
        assert_eq!(
            parse("", Some(" great service ")),
            Input::Feedback("great service".to_string())
        );
        assert_eq!(parse("", None), Input::Default);
    }

    #[test]
    fn test_stdin_wins_over_legacy_arg() {
        assert_eq!(
            parse(r#"{"feedback": "from stdin"}"#, Some("from argv")),
            Input::Feedback("from stdin".to_string())
        );
    }

    #[test]
    fn test_missing_or_null_feedback_is_empty() {
        assert_eq!(parse("{}", None), Input::Feedback(String::new()));
        assert_eq!(
            parse(r#"{"feedback": null}"#, None),
            Input::Feedback(String::new())
        );
        assert_eq!(
            parse(r#"{"feedback": "   ", "extra": 1}"#, None),
            Input::Feedback(String::new())
        );
    }

    #[test]
    fn test_blank_non_string_feedback_is_empty() {
        for raw in [
            r#"{"feedback": false}"#,
            r#"{"feedback": 0}"#,
            r#"{"feedback": 0.0}"#,
            r#"{"feedback": []}"#,
            r#"{"feedback": {}}"#,
        ] {
            assert_eq!(parse(raw, None), Input::Feedback(String::new()), "raw: {}", raw);
        }
    }

    #[test]
    fn test_malformed_input_is_default() {
        let cases = vec![
            "not json",
            "{\"feedback\": ",
            "\n",
            "[\"feedback\"]",
            "\"just a string\"",
            r#"{"feedback": 42}"#,
            r#"{"feedback": ["a"]}"#,
            r#"{"feedback": true}"#,
            r#"{"feedback": {"text": "hi"}}"#,
        ];

        for raw in cases {
            assert_eq!(parse(raw, Some("ignored")), Input::Default, "raw: {:?}", raw);
        }
    }
}
