//! Turns whatever a failed request carried back into one message for the user.
//!
//! A server error body may be a JSON object with a `message` field, a bare
//! string, or nothing useful at all.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorBody {
    Structured { message: String },
    Text(String),
    Empty,
}

impl ErrorBody {
    pub fn parse(body: &str) -> Self {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            return ErrorBody::Empty;
        }
        match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::Object(map)) => match map.get("message") {
                Some(Value::String(message)) if !message.trim().is_empty() => {
                    ErrorBody::Structured {
                        message: message.clone(),
                    }
                }
                // A JSON object without a usable message is not worth showing.
                _ => ErrorBody::Empty,
            },
            Ok(Value::String(text)) if !text.trim().is_empty() => ErrorBody::Text(text),
            Ok(Value::String(_)) => ErrorBody::Empty,
            _ => ErrorBody::Text(trimmed.to_string()),
        }
    }

    /// Structured message first, then the raw text, then `fallback`.
    pub fn into_message(self, fallback: &str) -> String {
        match self {
            ErrorBody::Structured { message } => message,
            ErrorBody::Text(text) => text,
            ErrorBody::Empty => fallback.to_string(),
        }
    }
}

pub fn extract_message(body: &str, fallback: &str) -> String {
    ErrorBody::parse(body).into_message(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FALLBACK: &str = "Something went wrong";

    #[test]
    fn structured_message_takes_priority() {
        let body = r#"{"message":"Session not found","error":"NotFound"}"#;
        assert_eq!(extract_message(body, FALLBACK), "Session not found");
    }

    #[test]
    fn raw_text_is_used_verbatim() {
        assert_eq!(
            extract_message("Username already exists", FALLBACK),
            "Username already exists"
        );
        assert_eq!(extract_message(r#""Email already exists""#, FALLBACK), "Email already exists");
    }

    #[test]
    fn empty_or_unhelpful_bodies_fall_back() {
        assert_eq!(extract_message("", FALLBACK), FALLBACK);
        assert_eq!(extract_message("   ", FALLBACK), FALLBACK);
        assert_eq!(extract_message(r#"{"code":500}"#, FALLBACK), FALLBACK);
    }
}
