use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use super::{as_text, missing, present, FieldHandler};
use crate::forms::answers::FormData;
use crate::forms::domain::Component;

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"))
}

fn phone_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\+?[0-9 ().\-]+$").expect("phone pattern"))
}

/// Presence check only; used for text, multiline and file-upload fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHandler;

impl FieldHandler for DefaultHandler {
    fn validate(&self, component: &Component, data: &FormData) -> Vec<String> {
        match present(component, data) {
            Some(_) => Vec::new(),
            None => missing(component),
        }
    }

    fn convert(&self, component: &Component, data: &FormData) -> Option<Value> {
        present(component, data).map(|value| match value {
            Value::String(text) => Value::String(text.trim().to_string()),
            other => other.clone(),
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EmailHandler;

impl FieldHandler for EmailHandler {
    fn validate(&self, component: &Component, data: &FormData) -> Vec<String> {
        let Some(value) = present(component, data) else {
            return missing(component);
        };
        match value.as_str().map(str::trim) {
            Some(email) if email_pattern().is_match(email) => Vec::new(),
            _ => vec![format!(
                "{} must be an email address, like name@example.com",
                component.display_label()
            )],
        }
    }

    fn convert(&self, component: &Component, data: &FormData) -> Option<Value> {
        DefaultHandler.convert(component, data)
    }
}

/// Accepts digits with the usual separators; between 7 and 20 digits.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhoneNumberHandler;

impl FieldHandler for PhoneNumberHandler {
    fn validate(&self, component: &Component, data: &FormData) -> Vec<String> {
        let Some(value) = present(component, data) else {
            return missing(component);
        };
        let valid = as_text(value).is_some_and(|phone| {
            let digits = phone.chars().filter(char::is_ascii_digit).count();
            phone_pattern().is_match(&phone) && (7..=20).contains(&digits)
        });
        if valid {
            Vec::new()
        } else {
            vec![format!(
                "{} must be a telephone number, like 01632 960 001",
                component.display_label()
            )]
        }
    }

    fn convert(&self, component: &Component, data: &FormData) -> Option<Value> {
        present(component, data)
            .and_then(as_text)
            .map(Value::String)
    }
}
