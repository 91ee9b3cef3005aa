use chrono::{Datelike, NaiveDate, Utc};
use serde_json::{json, Value};
use tracing::debug;

use super::{as_text, FieldHandler};
use crate::forms::answers::FormData;
use crate::forms::domain::{Component, DateComparison, DateRule};

const PARTS: [&str; 3] = ["day", "month", "year"];
const EARLIEST_YEAR: i32 = 1901;

/// Day, month and year collected through inputs named `<name>__day`,
/// `<name>__month` and `<name>__year`.
///
/// The stored answer is `{"day": 5, "month": 3, "year": 1990}`, which is also
/// accepted as input.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatePartsHandler {
    today: Option<NaiveDate>,
}

impl DatePartsHandler {
    /// Handler that treats `today` as the current date.
    pub fn on(today: NaiveDate) -> Self {
        Self { today: Some(today) }
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Utc::now().date_naive())
    }
}

/// Raw text of each part, `None` where nothing was entered.
#[derive(Debug, Default)]
struct DateInput {
    day: Option<String>,
    month: Option<String>,
    year: Option<String>,
}

impl DateInput {
    fn read(name: &str, data: &FormData) -> Self {
        let structured = data.get(name).and_then(Value::as_object);
        let part = |part: &str| {
            let raw = match structured {
                Some(object) => object.get(part),
                None => data.get(&format!("{name}__{part}")),
            };
            raw.and_then(as_text).filter(|text| !text.is_empty())
        };
        Self {
            day: part("day"),
            month: part("month"),
            year: part("year"),
        }
    }

    fn is_empty(&self) -> bool {
        self.day.is_none() && self.month.is_none() && self.year.is_none()
    }

    fn missing_parts(&self) -> Vec<&'static str> {
        PARTS
            .iter()
            .zip([&self.day, &self.month, &self.year])
            .filter(|(_, value)| value.is_none())
            .map(|(part, _)| *part)
            .collect()
    }

    fn date(&self) -> Result<NaiveDate, DateProblem> {
        let (Some(day), Some(month), Some(year)) = (&self.day, &self.month, &self.year) else {
            return Err(DateProblem::Incomplete);
        };
        let (Ok(day), Ok(month), Ok(year_number)) =
            (day.parse::<u32>(), month.parse::<u32>(), year.parse::<i32>())
        else {
            return Err(DateProblem::NotReal);
        };
        if year.len() != 4 {
            return Err(DateProblem::ShortYear);
        }
        if year_number < EARLIEST_YEAR {
            return Err(DateProblem::NotReal);
        }
        NaiveDate::from_ymd_opt(year_number, month, day).ok_or(DateProblem::NotReal)
    }
}

enum DateProblem {
    Incomplete,
    ShortYear,
    NotReal,
}

fn date_name(component: &Component) -> &str {
    component
        .date
        .as_ref()
        .and_then(|settings| settings.date_name.as_deref())
        .unwrap_or("date")
}

fn capitalised(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Date named by a rule: the literal wins, otherwise the referenced answer.
fn reference(literal: Option<NaiveDate>, field: Option<&str>, data: &FormData) -> Option<NaiveDate> {
    literal.or_else(|| field.and_then(|name| DateInput::read(name, data).date().ok()))
}

impl DatePartsHandler {
    /// `None` when the rule holds or its reference date is unavailable.
    fn rule_failure(&self, rule: &DateRule, date: NaiveDate, data: &FormData) -> Option<String> {
        let today = self.today();
        let holds = match rule.comparison {
            DateComparison::TodayOrInPast => date <= today,
            DateComparison::InPast => date < today,
            DateComparison::TodayOrInFuture => date >= today,
            DateComparison::InFuture => date > today,
            comparison if comparison.needs_fixed_date() => {
                let Some(fixed) = reference(rule.fixed_date, rule.fixed_date_id.as_deref(), data)
                else {
                    debug!(rule = %rule.id, "date rule skipped; no comparison date");
                    return None;
                };
                match comparison {
                    DateComparison::SameOrAfter => date >= fixed,
                    DateComparison::After => date > fixed,
                    DateComparison::SameOrBefore => date <= fixed,
                    _ => date < fixed,
                }
            }
            _ => {
                let start = reference(rule.start_date, rule.start_date_id.as_deref(), data);
                let end = reference(rule.end_date, rule.end_date_id.as_deref(), data);
                let (Some(start), Some(end)) = (start, end) else {
                    debug!(rule = %rule.id, "date rule skipped; no date range");
                    return None;
                };
                start <= date && date <= end
            }
        };
        (!holds).then(|| rule.message.clone())
    }
}

impl FieldHandler for DatePartsHandler {
    fn validate(&self, component: &Component, data: &FormData) -> Vec<String> {
        let Some(name) = component.name.as_deref() else {
            return Vec::new();
        };
        let input = DateInput::read(name, data);
        let date_name = date_name(component);

        if input.is_empty() {
            return if component.optional {
                Vec::new()
            } else {
                vec![format!("Enter your {date_name}")]
            };
        }

        let date = match input.date() {
            Ok(date) => date,
            Err(DateProblem::Incomplete) => {
                return vec![format!(
                    "{} must include a {}",
                    capitalised(date_name),
                    input.missing_parts().join(" and ")
                )]
            }
            Err(DateProblem::ShortYear) => return vec!["Year must include 4 numbers".to_string()],
            Err(DateProblem::NotReal) => {
                return vec![format!("{} must be a real date", capitalised(date_name))]
            }
        };

        component
            .date
            .iter()
            .flat_map(|settings| &settings.rules)
            .filter_map(|rule| self.rule_failure(rule, date, data))
            .collect()
    }

    fn convert(&self, component: &Component, data: &FormData) -> Option<Value> {
        let date = DateInput::read(component.name.as_deref()?, data).date().ok()?;
        Some(json!({
            "day": date.day(),
            "month": date.month(),
            "year": date.year(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::domain::DateSettings;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).expect("valid date")
    }

    fn component(rules: Vec<DateRule>) -> Component {
        Component {
            id: "c-dob".to_string(),
            field_type: "dateparts".to_string(),
            name: Some("dob".to_string()),
            label: "Date of birth".to_string(),
            hint: None,
            optional: false,
            validation: Vec::new(),
            options: Vec::new(),
            range: None,
            date: Some(DateSettings {
                date_name: Some("date of birth".to_string()),
                rules,
            }),
        }
    }

    fn rule(comparison: DateComparison, message: &str) -> DateRule {
        DateRule {
            id: message.to_string(),
            comparison,
            message: message.to_string(),
            fixed_date: None,
            fixed_date_id: None,
            start_date: None,
            start_date_id: None,
            end_date: None,
            end_date_id: None,
        }
    }

    fn parts(day: &str, month: &str, year: &str) -> FormData {
        let mut data = FormData::new();
        data.insert("dob__day".to_string(), json!(day));
        data.insert("dob__month".to_string(), json!(month));
        data.insert("dob__year".to_string(), json!(year));
        data
    }

    #[test]
    fn reports_missing_and_partial_dates() {
        let handler = DatePartsHandler::on(today());
        let component = component(Vec::new());

        assert_eq!(
            handler.validate(&component, &parts("", "", "")),
            vec!["Enter your date of birth".to_string()]
        );
        assert_eq!(
            handler.validate(&component, &parts("4", "", "")),
            vec!["Date of birth must include a month and year".to_string()]
        );
    }

    #[test]
    fn rejects_dates_that_do_not_exist() {
        let handler = DatePartsHandler::on(today());
        let component = component(Vec::new());

        assert_eq!(
            handler.validate(&component, &parts("30", "2", "2020")),
            vec!["Date of birth must be a real date".to_string()]
        );
        assert_eq!(
            handler.validate(&component, &parts("1", "1", "85")),
            vec!["Year must include 4 numbers".to_string()]
        );
        assert_eq!(handler.validate(&component, &parts("1", "1", "1850")).len(), 1);
        assert!(handler.validate(&component, &parts("29", "2", "2024")).is_empty());
    }

    #[test]
    fn converts_to_a_structured_date_and_accepts_it_back() {
        let handler = DatePartsHandler::on(today());
        let component = component(Vec::new());

        let stored = handler
            .convert(&component, &parts(" 05", "3", "1990"))
            .expect("real date converts");
        assert_eq!(stored, json!({ "day": 5, "month": 3, "year": 1990 }));

        let mut data = FormData::new();
        data.insert("dob".to_string(), stored);
        assert!(handler.validate(&component, &data).is_empty());
        assert_eq!(handler.convert(&component, &parts("31", "4", "1990")), None);
    }

    #[test]
    fn compares_against_today() {
        let handler = DatePartsHandler::on(today());
        let component = component(vec![rule(DateComparison::InPast, "Must be in the past")]);

        assert!(handler.validate(&component, &parts("14", "6", "2025")).is_empty());
        assert_eq!(
            handler.validate(&component, &parts("15", "6", "2025")),
            vec!["Must be in the past".to_string()]
        );

        let component = component_with(rule(DateComparison::TodayOrInFuture, "Not in the past"));
        assert!(handler.validate(&component, &parts("15", "6", "2025")).is_empty());
        assert_eq!(handler.validate(&component, &parts("14", "6", "2025")).len(), 1);
    }

    fn component_with(rule: DateRule) -> Component {
        component(vec![rule])
    }

    #[test]
    fn compares_against_fixed_and_referenced_dates() {
        let handler = DatePartsHandler::on(today());
        let mut after = rule(DateComparison::After, "Must be after 1 January 2000");
        after.fixed_date = NaiveDate::from_ymd_opt(2000, 1, 1);
        let component = component_with(after);

        assert_eq!(handler.validate(&component, &parts("1", "1", "2000")).len(), 1);
        assert!(handler.validate(&component, &parts("2", "1", "2000")).is_empty());

        let mut before_move = rule(DateComparison::SameOrBefore, "Must not be after you moved in");
        before_move.fixed_date_id = Some("moved_in".to_string());
        let component = component_with(before_move);
        let mut data = parts("10", "5", "2010");
        data.insert(
            "moved_in".to_string(),
            json!({ "day": 1, "month": 5, "year": 2010 }),
        );
        assert_eq!(
            handler.validate(&component, &data),
            vec!["Must not be after you moved in".to_string()]
        );
        data.remove("moved_in");
        assert!(handler.validate(&component, &data).is_empty());
    }

    #[test]
    fn between_includes_both_ends() {
        let handler = DatePartsHandler::on(today());
        let mut between = rule(DateComparison::Between, "Must be in 2020");
        between.start_date = NaiveDate::from_ymd_opt(2020, 1, 1);
        between.end_date = NaiveDate::from_ymd_opt(2020, 12, 31);
        let component = component_with(between);

        assert!(handler.validate(&component, &parts("1", "1", "2020")).is_empty());
        assert!(handler.validate(&component, &parts("31", "12", "2020")).is_empty());
        assert_eq!(
            handler.validate(&component, &parts("1", "1", "2021")),
            vec!["Must be in 2020".to_string()]
        );
    }

    #[test]
    fn optional_dates_may_be_left_blank() {
        let handler = DatePartsHandler::on(today());
        let mut component = component(Vec::new());
        component.optional = true;

        assert!(handler.validate(&component, &parts("", "", "")).is_empty());
        assert_eq!(handler.validate(&component, &parts("1", "", "")).len(), 1);
    }
}
