use serde::Serialize;
use serde_json::Value;

use super::answers::{AnswerScope, FormData, PageErrors};
use super::domain::{Application, ComponentOption, ExtraData, Page, PageType};

/// A page definition merged with the current answers and errors for rendering.
///
/// The form definition itself is never mutated; this overlay is rebuilt for
/// every request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageView {
    pub page_id: String,
    pub page_type: PageType,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_data: Option<ExtraData>,
    pub fields: Vec<FieldView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_count: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldView {
    pub id: String,
    pub field_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    pub optional: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ComponentOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl PageView {
    pub fn build(
        application: &Application,
        page: &Page,
        scope: AnswerScope<'_>,
        extra_data: Option<ExtraData>,
        errors: &PageErrors,
    ) -> Self {
        let fields = page
            .components
            .iter()
            .map(|component| {
                let name = component.name.as_deref();
                FieldView {
                    id: component.id.clone(),
                    field_type: component.field_type.clone(),
                    name: component.name.clone(),
                    label: component.label.clone(),
                    hint: component.hint.clone(),
                    optional: component.optional,
                    options: component.options.clone(),
                    answer: name.and_then(|name| application.answers.scoped(scope, name).cloned()),
                    errors: name
                        .map(|name| errors.for_field(name).to_vec())
                        .unwrap_or_default(),
                }
            })
            .collect();

        let item_count = (page.page_type == PageType::AddAnother)
            .then(|| application.answers.item_count(&page.id));

        Self {
            page_id: page.id.clone(),
            page_type: page.page_type,
            title: page.title.clone(),
            extra_data,
            fields,
            item_count,
        }
    }

    /// Shows the raw submitted inputs in place of the stored answers, so a
    /// rejected page is re-rendered with what the applicant typed.
    pub fn with_inputs(mut self, data: &FormData) -> Self {
        for field in &mut self.fields {
            let submitted = field.name.as_deref().and_then(|name| data.get(name));
            if let Some(value) = submitted {
                field.answer = Some(value.clone());
            }
        }
        self
    }
}
