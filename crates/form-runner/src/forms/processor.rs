use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::answers::{AnswerScope, Answers, FormData, PageErrors};
use super::condition::Expr;
use super::domain::{Application, ApplicationStatus, Component, ExtraData, Form, Page};
use super::error::{ConfigurationError, FormError};
use super::handlers::HandlerRegistry;
use super::repeating::scope_for;

/// Result of processing one page submission.
///
/// Rejection is an expected outcome: the caller re-renders the same page with
/// the per-field errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProcessOutcome {
    Accepted,
    Rejected { errors: PageErrors },
}

impl ProcessOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ProcessOutcome::Accepted)
    }

    pub fn errors(&self) -> Option<&PageErrors> {
        match self {
            ProcessOutcome::Accepted => None,
            ProcessOutcome::Rejected { errors } => Some(errors),
        }
    }
}

/// Validates a page's fields and merges the converted answers into an application.
#[derive(Debug, Clone, Copy)]
pub struct PageProcessor<'r> {
    registry: &'r HandlerRegistry,
}

struct Evaluation {
    converted: Vec<(String, Option<Value>)>,
    errors: PageErrors,
}

impl<'r> PageProcessor<'r> {
    pub fn new(registry: &'r HandlerRegistry) -> Self {
        Self { registry }
    }

    /// Validates `data` for `page_id` and, when every field passes, stores the
    /// converted answers. The application is left untouched on rejection.
    pub fn process(
        &self,
        application: &mut Application,
        page_id: &str,
        data: &FormData,
        extra_data: Option<ExtraData>,
        skip_validation: bool,
    ) -> Result<ProcessOutcome, FormError> {
        let form = &application.form;
        let page = form
            .page(page_id)
            .ok_or_else(|| FormError::page_not_found(&form.id, page_id))?;
        let scope = scope_for(form, &application.answers, page_id, extra_data)?;

        let evaluation = self.evaluate(
            form,
            &application.answers,
            page,
            scope,
            data,
            skip_validation,
        )?;
        if !evaluation.errors.is_empty() {
            debug!(
                page_id,
                fields = evaluation.errors.len(),
                "page submission rejected"
            );
            return Ok(ProcessOutcome::Rejected {
                errors: evaluation.errors,
            });
        }

        for (name, value) in evaluation.converted {
            application.answers.set_scoped(scope, &name, value);
        }
        if application.status == ApplicationStatus::Started {
            application.status = ApplicationStatus::InProgress;
        }
        application.updated_at = Utc::now();
        Ok(ProcessOutcome::Accepted)
    }

    /// Re-validates the answers already stored for a page without changing them.
    /// Required fields with no stored answer are reported as missing.
    pub fn check(
        &self,
        application: &Application,
        page_id: &str,
        extra_data: Option<ExtraData>,
    ) -> Result<PageErrors, FormError> {
        let form = &application.form;
        let page = form
            .page(page_id)
            .ok_or_else(|| FormError::page_not_found(&form.id, page_id))?;
        let scope = scope_for(form, &application.answers, page_id, extra_data)?;

        let data: FormData = page
            .named_components()
            .filter_map(|(name, _)| {
                application
                    .answers
                    .scoped(scope, name)
                    .map(|value| (name.to_string(), value.clone()))
            })
            .collect();

        let evaluation = self.evaluate(form, &application.answers, page, scope, &data, false)?;
        Ok(evaluation.errors)
    }

    fn evaluate(
        &self,
        form: &Form,
        answers: &Answers,
        page: &Page,
        scope: AnswerScope<'_>,
        data: &FormData,
        skip_validation: bool,
    ) -> Result<Evaluation, FormError> {
        let mut handlers = Vec::new();
        for (name, component) in page.named_components() {
            let handler = self
                .registry
                .resolve(&page.id, component)
                .map_err(|source| FormError::configuration(&form.id, source))?;
            handlers.push((name, component, handler));
        }

        let converted: Vec<(String, Option<Value>)> = handlers
            .iter()
            .map(|(name, component, handler)| {
                (name.to_string(), handler.convert(component, data))
            })
            .collect();

        let mut errors = PageErrors::default();
        if skip_validation {
            return Ok(Evaluation { converted, errors });
        }

        let mut ctx = match answers.context(scope) {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for (name, value) in &converted {
            if let Some(value) = value {
                ctx.insert(name.clone(), value.clone());
            }
        }

        for ((name, component, handler), (_, value)) in handlers.iter().zip(&converted) {
            let mut messages = handler.validate(component, data);
            if messages.is_empty() {
                if let Some(value) = value {
                    messages = rule_failures(component, value, &ctx)
                        .map_err(|source| FormError::configuration(&form.id, source))?;
                }
            }
            errors.record(name, messages);
        }

        Ok(Evaluation { converted, errors })
    }
}

fn rule_failures(
    component: &Component,
    value: &Value,
    ctx: &Map<String, Value>,
) -> Result<Vec<String>, ConfigurationError> {
    if component.validation.is_empty() {
        return Ok(Vec::new());
    }
    let mut scoped = ctx.clone();
    scoped.insert("value".to_string(), value.clone());
    let scoped = Value::Object(scoped);

    let mut failures = Vec::new();
    for rule in &component.validation {
        if !Expr::parse(&rule.expression)?.holds(&scoped) {
            failures.push(rule.message.clone());
        }
    }
    Ok(failures)
}
