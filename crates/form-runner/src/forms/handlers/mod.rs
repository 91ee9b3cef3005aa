//! Per-field-type validation and conversion of raw page inputs.

mod address;
mod choice;
mod date;
mod number;
mod text;

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::answers::FormData;
use super::domain::Component;
use super::error::ConfigurationError;

pub use address::UkAddressHandler;
pub use choice::{OptionsHandler, YesNoHandler};
pub use date::DatePartsHandler;
pub use number::NumberHandler;
pub use text::{DefaultHandler, EmailHandler, PhoneNumberHandler};

pub const TEXT: &str = "text";
pub const MULTILINE: &str = "multiline";
pub const FILE_UPLOAD: &str = "fileupload";
pub const EMAIL: &str = "email";
pub const PHONE_NUMBER: &str = "phonenumber";
pub const NUMBER: &str = "number";
pub const SELECT: &str = "select";
pub const RADIO: &str = "radio";
pub const CHECKBOX: &str = "checkbox";
pub const YES_NO: &str = "yesno";
pub const UK_ADDRESS: &str = "ukaddress";
pub const DATE_PARTS: &str = "dateparts";

/// Validates and converts the raw inputs of one component.
///
/// Handlers must accept their own converted output as input, so stored answers
/// can be re-validated without the original submission.
pub trait FieldHandler: Send + Sync {
    /// Error messages for the component's inputs; empty when valid.
    fn validate(&self, component: &Component, data: &FormData) -> Vec<String>;

    /// Typed answer, or `None` when nothing was entered.
    fn convert(&self, component: &Component, data: &FormData) -> Option<Value>;
}

/// Maps field-type tags to their handlers.
#[derive(Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn FieldHandler>>,
}

impl HandlerRegistry {
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registry covering every built-in field type.
    pub fn standard() -> Self {
        let mut registry = Self::empty();

        let default: Arc<dyn FieldHandler> = Arc::new(DefaultHandler);
        for tag in [TEXT, MULTILINE, FILE_UPLOAD] {
            registry.register_shared(tag, default.clone());
        }

        let options: Arc<dyn FieldHandler> = Arc::new(OptionsHandler);
        for tag in [SELECT, RADIO, CHECKBOX] {
            registry.register_shared(tag, options.clone());
        }

        registry.register(EMAIL, EmailHandler);
        registry.register(PHONE_NUMBER, PhoneNumberHandler);
        registry.register(NUMBER, NumberHandler);
        registry.register(YES_NO, YesNoHandler);
        registry.register(UK_ADDRESS, UkAddressHandler);
        registry.register(DATE_PARTS, DatePartsHandler::default());
        registry
    }

    pub fn register<H>(&mut self, tag: &str, handler: H)
    where
        H: FieldHandler + 'static,
    {
        self.register_shared(tag, Arc::new(handler));
    }

    pub fn register_shared(&mut self, tag: &str, handler: Arc<dyn FieldHandler>) {
        self.handlers.insert(tag.to_string(), handler);
    }

    pub fn get(&self, tag: &str) -> Option<&dyn FieldHandler> {
        self.handlers.get(tag).map(|handler| handler.as_ref())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.handlers.contains_key(tag)
    }

    /// Handler for `component`, or a configuration error naming the page.
    pub fn resolve(
        &self,
        page_id: &str,
        component: &Component,
    ) -> Result<&dyn FieldHandler, ConfigurationError> {
        self.get(&component.field_type)
            .ok_or_else(|| ConfigurationError::UnknownFieldType {
                page_id: page_id.to_string(),
                component: component.id.clone(),
                field_type: component.field_type.clone(),
            })
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tags: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        tags.sort_unstable();
        f.debug_struct("HandlerRegistry").field("tags", &tags).finish()
    }
}

/// Submitted value for the component, ignoring blank input.
pub(crate) fn present<'a>(component: &Component, data: &'a FormData) -> Option<&'a Value> {
    let name = component.name.as_deref()?;
    data.get(name).filter(|value| !is_blank(value))
}

pub(crate) fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Error reported when nothing was entered for a component.
pub(crate) fn missing(component: &Component) -> Vec<String> {
    if component.optional {
        Vec::new()
    } else {
        vec![format!("{} is required", component.display_label())]
    }
}

/// Text content of a scalar value; numbers are rendered as entered.
pub(crate) fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
