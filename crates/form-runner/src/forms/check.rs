use std::collections::HashSet;

use super::condition::Expr;
use super::domain::{DateComparison, DateRule, Form, Page, PageType};
use super::handlers::DATE_PARTS;
use super::error::ConfigurationError;
use super::handlers::HandlerRegistry;

/// Defect found by [`Form::check`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormIssue {
    #[error("page id '{0}' is used more than once")]
    DuplicatePage(String),
    #[error("page '{page_id}' collects answer '{name}' more than once")]
    DuplicateName { page_id: String, name: String },
    #[error("repeating group on page '{page_id}' has no pages")]
    EmptyGroup { page_id: String },
    #[error("repeating group on page '{page_id}' lists unknown page '{member}'")]
    UnknownGroupMember { page_id: String, member: String },
    #[error("date rule '{rule}' on page '{page_id}' {reason}")]
    InvalidDateRule {
        page_id: String,
        rule: String,
        reason: String,
    },
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

impl Form {
    /// Static lint of the page graph; an empty result means the form can be served.
    pub fn check(&self, registry: &HandlerRegistry) -> Vec<FormIssue> {
        let mut issues = Vec::new();

        if self.page(&self.start_page).is_none() {
            issues.push(
                ConfigurationError::MissingStartPage {
                    start_page: self.start_page.clone(),
                }
                .into(),
            );
        }

        let mut seen = HashSet::new();
        for page in &self.pages {
            if !seen.insert(page.id.as_str()) {
                issues.push(FormIssue::DuplicatePage(page.id.clone()));
            }
            self.check_page(page, registry, &mut issues);
        }

        issues
    }

    fn check_page(&self, page: &Page, registry: &HandlerRegistry, issues: &mut Vec<FormIssue>) {
        let mut names = HashSet::new();
        for (name, component) in page.named_components() {
            if !names.insert(name) {
                issues.push(FormIssue::DuplicateName {
                    page_id: page.id.clone(),
                    name: name.to_string(),
                });
            }
            if let Err(err) = registry.resolve(&page.id, component) {
                issues.push(err.into());
            }
            for rule in &component.validation {
                if let Err(err) = Expr::parse(&rule.expression) {
                    issues.push(err.into());
                }
            }
            if let Some(settings) = &component.date {
                for rule in &settings.rules {
                    check_date_rule(page, rule, issues);
                }
            }
        }

        for condition in &page.conditions {
            if let Err(err) = Expr::parse(&condition.expression) {
                issues.push(err.into());
            }
            self.check_target(page, &condition.next_page_id, issues);
        }

        match page.next_page_id.as_deref() {
            Some(target) => self.check_target(page, target, issues),
            None if !page.page_type.is_terminal() => {
                issues.push(
                    ConfigurationError::MissingNextPage {
                        page_id: page.id.clone(),
                    }
                    .into(),
                );
            }
            None => {}
        }

        if page.page_type == PageType::AddAnother {
            match &page.group {
                None => issues.push(
                    ConfigurationError::MissingGroup {
                        page_id: page.id.clone(),
                    }
                    .into(),
                ),
                Some(group) if group.pages.is_empty() => issues.push(FormIssue::EmptyGroup {
                    page_id: page.id.clone(),
                }),
                Some(group) => {
                    for member in &group.pages {
                        if self.page(member).is_none() {
                            issues.push(FormIssue::UnknownGroupMember {
                                page_id: page.id.clone(),
                                member: member.clone(),
                            });
                        }
                    }
                }
            }
        }
    }

    fn check_target(&self, page: &Page, target: &str, issues: &mut Vec<FormIssue>) {
        if self.page(target).is_none() {
            issues.push(
                ConfigurationError::UnknownTarget {
                    page_id: page.id.clone(),
                    target: target.to_string(),
                }
                .into(),
            );
        }
    }
}

fn check_date_rule(page: &Page, rule: &DateRule, issues: &mut Vec<FormIssue>) {
    let mut invalid = |reason: String| {
        issues.push(FormIssue::InvalidDateRule {
            page_id: page.id.clone(),
            rule: rule.id.clone(),
            reason,
        })
    };

    let ends: Vec<(&str, bool, Option<&str>)> = match rule.comparison {
        comparison if comparison.needs_fixed_date() => vec![(
            "fixed_date",
            rule.fixed_date.is_some(),
            rule.fixed_date_id.as_deref(),
        )],
        DateComparison::Between => vec![
            ("start_date", rule.start_date.is_some(), rule.start_date_id.as_deref()),
            ("end_date", rule.end_date.is_some(), rule.end_date_id.as_deref()),
        ],
        _ => Vec::new(),
    };

    for (end, literal, field) in ends {
        match field {
            None if !literal => invalid(format!("needs {end} or {end}_id")),
            Some(field) if !literal && !is_date_field(page, field) => invalid(format!(
                "refers to '{field}', which is not a date field on the page"
            )),
            _ => {}
        }
    }
}

fn is_date_field(page: &Page, name: &str) -> bool {
    page.named_components()
        .any(|(candidate, component)| candidate == name && component.field_type == DATE_PARTS)
}
