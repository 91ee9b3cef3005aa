use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::answers::Answers;

/// Identifier wrapper for published form definitions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FormId(pub String);

impl fmt::Display for FormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for the applicant owning an application.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ApplicantId(pub String);

impl fmt::Display for ApplicantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Published form template. Read-only to the runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Form {
    pub id: FormId,
    pub title: String,
    pub start_page: String,
    pub pages: Vec<Page>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission: Option<SubmissionTarget>,
}

impl Form {
    pub fn page(&self, page_id: &str) -> Option<&Page> {
        self.pages.iter().find(|page| page.id == page_id)
    }

    /// Hub page and repeating group listing `page_id` as a member.
    pub fn group_of(&self, page_id: &str) -> Option<(&Page, &AddAnotherGroup)> {
        self.pages.iter().find_map(|page| {
            page.group
                .as_ref()
                .filter(|group| group.pages.iter().any(|member| member == page_id))
                .map(|group| (page, group))
        })
    }
}

/// Where completed applications are delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionTarget {
    pub destination: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_prefix: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageType {
    #[default]
    Default,
    AddAnother,
    Summary,
    Stop,
}

impl PageType {
    /// Summary and stop pages end a journey.
    pub fn is_terminal(self) -> bool {
        matches!(self, PageType::Summary | PageType::Stop)
    }

    pub fn label(self) -> &'static str {
        match self {
            PageType::Default => "default",
            PageType::AddAnother => "add_another",
            PageType::Summary => "summary",
            PageType::Stop => "stop",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: String,
    #[serde(rename = "type", default)]
    pub page_type: PageType,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<AddAnotherGroup>,
}

impl Page {
    /// Components that collect an answer.
    pub fn named_components(&self) -> impl Iterator<Item = (&str, &Component)> {
        self.components
            .iter()
            .filter_map(|component| component.name.as_deref().map(|name| (name, component)))
    }
}

/// Page sequence repeated once per item on an `add_another` hub page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddAnotherGroup {
    pub pages: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
}

impl AddAnotherGroup {
    /// Answer key holding the item array; defaults to the hub page id.
    pub fn key_for<'a>(&'a self, hub_id: &'a str) -> &'a str {
        self.answer_key.as_deref().unwrap_or(hub_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub id: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation: Vec<ValidationRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ComponentOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<NumberRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateSettings>,
}

impl Component {
    /// Label used in error messages, falling back to the answer key.
    pub fn display_label(&self) -> &str {
        if self.label.trim().is_empty() {
            self.name.as_deref().unwrap_or(&self.id)
        } else {
            &self.label
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentOption {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NumberRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default)]
    pub integer: bool,
}

/// Settings for `dateparts` fields.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateSettings {
    /// Wording used in messages, e.g. "date of birth"; defaults to "date".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<DateRule>,
}

/// Comparison of an entered date against today, a fixed date, or another date
/// answer on the same page (`*_date_id` names that field).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRule {
    pub id: String,
    pub comparison: DateComparison,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_date_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateComparison {
    TodayOrInPast,
    InPast,
    TodayOrInFuture,
    InFuture,
    SameOrAfter,
    After,
    SameOrBefore,
    Before,
    Between,
}

impl DateComparison {
    /// Comparisons against a single fixed or referenced date.
    pub fn needs_fixed_date(self) -> bool {
        matches!(
            self,
            DateComparison::SameOrAfter
                | DateComparison::After
                | DateComparison::SameOrBefore
                | DateComparison::Before
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub id: String,
    pub expression: String,
    pub next_page_id: String,
}

/// Predicate over `value` and the current answers; a false result reports `message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRule {
    pub id: String,
    pub expression: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Started,
    InProgress,
    Submitted,
}

impl ApplicationStatus {
    pub fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Started => "started",
            ApplicationStatus::InProgress => "in_progress",
            ApplicationStatus::Submitted => "submitted",
        }
    }
}

/// A form snapshot bound to one applicant together with their answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub applicant_id: ApplicantId,
    pub form: Form,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub answers: Answers,
}

impl Application {
    pub fn new(applicant_id: ApplicantId, form: Form, now: DateTime<Utc>) -> Self {
        Self {
            applicant_id,
            form,
            status: ApplicationStatus::Started,
            created_at: now,
            updated_at: now,
            answers: Answers::default(),
        }
    }
}

/// Selects one instance of a repeating group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExtraData {
    pub item_index: usize,
}

impl ExtraData {
    pub fn item(item_index: usize) -> Self {
        Self { item_index }
    }
}

/// A page to show, with the repeating-group item it applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLocation {
    pub page_id: String,
    pub page_type: PageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_data: Option<ExtraData>,
}

impl PageLocation {
    pub fn of(page: &Page, extra_data: Option<ExtraData>) -> Self {
        Self {
            page_id: page.id.clone(),
            page_type: page.page_type,
            extra_data,
        }
    }
}
