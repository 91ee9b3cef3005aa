use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use super::{as_text, missing, FieldHandler};
use crate::forms::answers::FormData;
use crate::forms::domain::Component;

const PARTS: [(&str, &str, bool); 5] = [
    ("addressLine1", "address line 1", true),
    ("addressLine2", "address line 2", false),
    ("town", "town or city", true),
    ("county", "county", false),
    ("postcode", "postcode", true),
];

fn postcode_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^(GIR ?0AA|[A-Z]{1,2}[0-9][A-Z0-9]? ?[0-9][A-Z]{2})$")
            .expect("postcode pattern")
    })
}

/// UK postal address collected through five inputs named `<name>__<part>`.
///
/// A stored answer is an object keyed by part, which is also accepted as input.
#[derive(Debug, Clone, Copy, Default)]
pub struct UkAddressHandler;

impl UkAddressHandler {
    fn parts(component: &Component, data: &FormData) -> Map<String, Value> {
        let Some(name) = component.name.as_deref() else {
            return Map::new();
        };
        let structured = data.get(name).and_then(Value::as_object);

        PARTS
            .iter()
            .filter_map(|(part, _, _)| {
                let raw = match structured {
                    Some(object) => object.get(*part),
                    None => data.get(&format!("{name}__{part}")),
                };
                raw.and_then(as_text)
                    .filter(|text| !text.is_empty())
                    .map(|text| (part.to_string(), Value::String(text)))
            })
            .collect()
    }
}

impl FieldHandler for UkAddressHandler {
    fn validate(&self, component: &Component, data: &FormData) -> Vec<String> {
        let parts = Self::parts(component, data);
        if parts.is_empty() {
            return missing(component);
        }

        let label = component.display_label();
        let mut errors: Vec<String> = PARTS
            .iter()
            .filter(|(part, _, required)| *required && !parts.contains_key(*part))
            .map(|(_, description, _)| format!("{label}: {description} is required"))
            .collect();

        if let Some(postcode) = parts.get("postcode").and_then(Value::as_str) {
            if !postcode_pattern().is_match(postcode) {
                errors.push(format!("{label}: enter a real postcode"));
            }
        }
        errors
    }

    fn convert(&self, component: &Component, data: &FormData) -> Option<Value> {
        let mut parts = Self::parts(component, data);
        if parts.is_empty() {
            return None;
        }
        if let Some(Value::String(postcode)) = parts.get_mut("postcode") {
            *postcode = postcode.to_uppercase();
        }
        Some(Value::Object(parts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn component() -> Component {
        Component {
            id: "home".to_string(),
            field_type: "ukaddress".to_string(),
            name: Some("home".to_string()),
            label: "Home address".to_string(),
            hint: None,
            optional: false,
            validation: Vec::new(),
            options: Vec::new(),
            range: None,
            date: None,
        }
    }

    fn sub_inputs(line1: &str, town: &str, postcode: &str) -> FormData {
        let mut data = FormData::new();
        data.insert("home__addressLine1".to_string(), json!(line1));
        data.insert("home__addressLine2".to_string(), json!(""));
        data.insert("home__town".to_string(), json!(town));
        data.insert("home__county".to_string(), json!(""));
        data.insert("home__postcode".to_string(), json!(postcode));
        data
    }

    #[test]
    fn converts_sub_inputs_into_one_answer() {
        let data = sub_inputs("10 Downing Street", "London", "sw1a 2aa");
        assert!(UkAddressHandler.validate(&component(), &data).is_empty());
        assert_eq!(
            UkAddressHandler.convert(&component(), &data),
            Some(json!({
                "addressLine1": "10 Downing Street",
                "town": "London",
                "postcode": "SW1A 2AA"
            }))
        );
    }

    #[test]
    fn reports_each_missing_required_part() {
        let data = sub_inputs("10 Downing Street", "", "");
        assert_eq!(
            UkAddressHandler.validate(&component(), &data),
            vec![
                "Home address: town or city is required".to_string(),
                "Home address: postcode is required".to_string(),
            ]
        );
    }

    #[test]
    fn rejects_malformed_postcodes_and_accepts_stored_answers() {
        let data = sub_inputs("1 High Street", "Leeds", "12345");
        assert_eq!(
            UkAddressHandler.validate(&component(), &data),
            vec!["Home address: enter a real postcode".to_string()]
        );

        let mut stored = FormData::new();
        stored.insert(
            "home".to_string(),
            json!({ "addressLine1": "1 High Street", "town": "Leeds", "postcode": "LS1 4AP" }),
        );
        assert!(UkAddressHandler.validate(&component(), &stored).is_empty());
    }
}
