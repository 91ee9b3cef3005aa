use serde_json::{Number, Value};

use super::{missing, present, FieldHandler};
use crate::forms::answers::FormData;
use crate::forms::domain::Component;

#[derive(Debug, Clone, Copy, Default)]
pub struct NumberHandler;

fn parse(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|number| number.is_finite())
}

fn to_value(number: f64) -> Value {
    if number.fract() == 0.0 && number.abs() < i64::MAX as f64 {
        Value::from(number as i64)
    } else {
        Number::from_f64(number)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

impl FieldHandler for NumberHandler {
    fn validate(&self, component: &Component, data: &FormData) -> Vec<String> {
        let Some(value) = present(component, data) else {
            return missing(component);
        };
        let label = component.display_label();
        let Some(number) = parse(value) else {
            return vec![format!("{label} must be a number")];
        };

        let mut errors = Vec::new();
        if let Some(range) = &component.range {
            if range.integer && number.fract() != 0.0 {
                errors.push(format!("{label} must be a whole number"));
            }
            match (range.min, range.max) {
                (Some(min), Some(max)) if number < min || number > max => {
                    errors.push(format!("{label} must be between {min} and {max}"));
                }
                (Some(min), None) if number < min => {
                    errors.push(format!("{label} must be {min} or higher"));
                }
                (None, Some(max)) if number > max => {
                    errors.push(format!("{label} must be {max} or lower"));
                }
                _ => {}
            }
        }
        errors
    }

    fn convert(&self, component: &Component, data: &FormData) -> Option<Value> {
        present(component, data).and_then(parse).map(to_value)
    }
}
