use serde_json::Value;

use super::{as_text, missing, present, FieldHandler, CHECKBOX};
use crate::forms::answers::FormData;
use crate::forms::domain::Component;

/// Select, radio and checkbox fields: every submitted value must be a declared option.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptionsHandler;

impl OptionsHandler {
    fn selected(component: &Component, value: &Value) -> Option<Vec<String>> {
        match value {
            Value::Array(items) if component.field_type == CHECKBOX => {
                items.iter().map(as_text).collect()
            }
            Value::Array(_) => None,
            scalar => as_text(scalar).map(|text| vec![text]),
        }
    }
}

impl FieldHandler for OptionsHandler {
    fn validate(&self, component: &Component, data: &FormData) -> Vec<String> {
        let Some(value) = present(component, data) else {
            return missing(component);
        };
        let label = component.display_label();
        let Some(selected) = Self::selected(component, value) else {
            return vec![format!("{label} has an invalid selection")];
        };

        let unknown: Vec<&str> = selected
            .iter()
            .map(String::as_str)
            .filter(|choice| !component.options.iter().any(|option| option.value == *choice))
            .collect();
        if unknown.is_empty() {
            Vec::new()
        } else {
            vec![format!(
                "{label} must be one of the listed options (unexpected: {})",
                unknown.join(", ")
            )]
        }
    }

    fn convert(&self, component: &Component, data: &FormData) -> Option<Value> {
        let selected = Self::selected(component, present(component, data)?)?;
        if component.field_type == CHECKBOX {
            Some(Value::Array(selected.into_iter().map(Value::String).collect()))
        } else {
            selected.into_iter().next().map(Value::String)
        }
    }
}

/// Accepts exactly `"yes"` or `"no"` and stores the same string, so conditions
/// read `has_pets == "yes"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct YesNoHandler;

impl YesNoHandler {
    fn parse(value: &Value) -> Option<&'static str> {
        match value.as_str()? {
            "yes" => Some("yes"),
            "no" => Some("no"),
            _ => None,
        }
    }
}

impl FieldHandler for YesNoHandler {
    fn validate(&self, component: &Component, data: &FormData) -> Vec<String> {
        match present(component, data) {
            None => missing(component),
            Some(value) if Self::parse(value).is_some() => Vec::new(),
            Some(_) => vec![format!("{} must be yes or no", component.display_label())],
        }
    }

    fn convert(&self, component: &Component, data: &FormData) -> Option<Value> {
        present(component, data)
            .and_then(Self::parse)
            .map(|answer| Value::String(answer.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::domain::ComponentOption;
    use serde_json::json;

    fn component(field_type: &str) -> Component {
        Component {
            id: "colour".to_string(),
            field_type: field_type.to_string(),
            name: Some("colour".to_string()),
            label: "Colour".to_string(),
            hint: None,
            optional: false,
            validation: Vec::new(),
            options: ["red", "green", "blue"]
                .iter()
                .map(|value| ComponentOption {
                    label: value.to_uppercase(),
                    value: value.to_string(),
                })
                .collect(),
            range: None,
            date: None,
        }
    }

    fn data(value: Value) -> FormData {
        let mut data = FormData::new();
        data.insert("colour".to_string(), value);
        data
    }

    #[test]
    fn radio_values_must_be_declared() {
        let radio = component("radio");
        assert!(OptionsHandler.validate(&radio, &data(json!("red"))).is_empty());
        assert_eq!(OptionsHandler.validate(&radio, &data(json!("pink"))).len(), 1);
        assert_eq!(
            OptionsHandler.validate(&radio, &data(json!(["red", "blue"]))),
            vec!["Colour has an invalid selection".to_string()]
        );
    }

    #[test]
    fn checkbox_accepts_subsets_and_converts_to_arrays() {
        let checkbox = component("checkbox");
        assert!(OptionsHandler
            .validate(&checkbox, &data(json!(["red", "blue"])))
            .is_empty());
        let errors = OptionsHandler.validate(&checkbox, &data(json!(["red", "teal"])));
        assert!(errors[0].contains("teal"));
        assert_eq!(
            OptionsHandler.convert(&checkbox, &data(json!("green"))),
            Some(json!(["green"]))
        );
    }

    #[test]
    fn yes_no_is_exact() {
        let yes_no = component("yesno");
        assert!(YesNoHandler.validate(&yes_no, &data(json!("yes"))).is_empty());
        assert_eq!(YesNoHandler.validate(&yes_no, &data(json!("Yes"))).len(), 1);
        assert_eq!(YesNoHandler.convert(&yes_no, &data(json!("no"))), Some(json!("no")));
    }

    #[test]
    fn yes_no_rejects_json_booleans() {
        let yes_no = component("yesno");
        assert_eq!(
            YesNoHandler.validate(&yes_no, &data(json!(true))),
            vec!["Colour must be yes or no".to_string()]
        );
        assert_eq!(YesNoHandler.convert(&yes_no, &data(json!(false))), None);
    }
}
