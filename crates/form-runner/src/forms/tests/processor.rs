use serde_json::json;

use super::common::*;
use crate::forms::domain::{ApplicationStatus, ExtraData};
use crate::forms::error::{ConfigurationError, FormError, RepeatingSectionError};
use crate::forms::processor::{PageProcessor, ProcessOutcome};

#[test]
fn aggregates_one_error_entry_per_invalid_field() {
    let registry = registry();
    let mut application = application_for(household_form());
    let before = application.clone();

    let outcome = PageProcessor::new(&registry)
        .process(
            &mut application,
            "applicant",
            &data(json!({ "name": "", "email": "ada@example.com", "age": "old" })),
            None,
            false,
        )
        .expect("processing succeeds");

    let errors = outcome.errors().expect("page rejected");
    assert_eq!(errors.len(), 2);
    assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["age", "name"]);
    assert_eq!(errors.for_field("name"), ["Full name is required"]);
    assert_eq!(errors.for_field("age"), ["Age must be a number"]);
    assert_eq!(application, before, "rejected pages leave the application untouched");
}

#[test]
fn accepted_page_stores_converted_answers_and_advances_status() {
    let registry = registry();
    let mut application = application_for(household_form());

    let outcome = PageProcessor::new(&registry)
        .process(
            &mut application,
            "applicant",
            &data(json!({ "name": "  Ada  ", "email": "ada@example.com", "age": "36" })),
            None,
            false,
        )
        .expect("processing succeeds");

    assert_eq!(outcome, ProcessOutcome::Accepted);
    assert_eq!(application.answers.get("name"), Some(&json!("Ada")));
    assert_eq!(application.answers.get("age"), Some(&json!(36)));
    assert_eq!(application.status, ApplicationStatus::InProgress);
    assert!(application.updated_at > application.created_at);

    PageProcessor::new(&registry)
        .process(
            &mut application,
            "pets",
            &data(json!({ "has_pets": "yes" })),
            None,
            false,
        )
        .expect("processing succeeds");
    assert_eq!(application.answers.get("has_pets"), Some(&json!("yes")));
}

#[test]
fn skipping_validation_stores_whatever_converts() {
    let registry = registry();
    let mut application = application_for(household_form());

    let outcome = PageProcessor::new(&registry)
        .process(
            &mut application,
            "applicant",
            &data(json!({ "name": "Ada" })),
            None,
            true,
        )
        .expect("processing succeeds");

    assert!(outcome.is_accepted());
    assert_eq!(application.answers.get("name"), Some(&json!("Ada")));
    assert_eq!(application.answers.get("email"), None);
}

#[test]
fn unknown_field_type_is_a_configuration_error_even_when_skipping() {
    let registry = registry();
    let mut form = echo_form();
    form.pages[1].components[0].field_type = "signature".to_string();
    let mut application = application_for(form);

    let error = PageProcessor::new(&registry)
        .process(
            &mut application,
            "text-component",
            &data(json!({ "text": "hi" })),
            None,
            true,
        )
        .expect_err("unknown field type");

    match error {
        FormError::Configuration { source, .. } => assert_eq!(
            source,
            ConfigurationError::UnknownFieldType {
                page_id: "text-component".to_string(),
                component: "c-text".to_string(),
                field_type: "signature".to_string(),
            }
        ),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn missing_page_is_not_found() {
    let registry = registry();
    let mut application = application_for(echo_form());

    let error = PageProcessor::new(&registry)
        .process(&mut application, "nowhere", &data(json!({})), None, false)
        .expect_err("page missing");

    assert!(error.is_not_found());
    assert!(error.to_string().contains("nowhere"));
}

#[test]
fn validation_rules_run_after_the_handler_passes() {
    let registry = registry();
    let mut form = household_form();
    form.pages[0].components[2].validation = vec![crate::forms::domain::ValidationRule {
        id: "adult".to_string(),
        expression: r#"value >= 21 or has_guardian == "yes""#.to_string(),
        message: "You must be 21 or over".to_string(),
    }];
    let mut application = application_for(form);
    let processor = PageProcessor::new(&registry);

    let outcome = processor
        .process(
            &mut application,
            "applicant",
            &data(json!({ "name": "Ada", "email": "ada@example.com", "age": 19 })),
            None,
            false,
        )
        .expect("processing succeeds");
    assert_eq!(
        outcome.errors().map(|errors| errors.for_field("age").to_vec()),
        Some(vec!["You must be 21 or over".to_string()])
    );

    let outcome = processor
        .process(
            &mut application,
            "applicant",
            &data(json!({ "name": "Ada", "email": "ada@example.com", "age": 30 })),
            None,
            false,
        )
        .expect("processing succeeds");
    assert!(outcome.is_accepted());
}

#[test]
fn blank_optional_field_clears_previous_answer() {
    let registry = registry();
    let mut form = echo_form();
    form.pages[1].components[0].optional = true;
    let mut application = application_for(form);
    let processor = PageProcessor::new(&registry);

    processor
        .process(
            &mut application,
            "text-component",
            &data(json!({ "text": "first" })),
            None,
            false,
        )
        .expect("processing succeeds");
    processor
        .process(
            &mut application,
            "text-component",
            &data(json!({ "text": "   " })),
            None,
            false,
        )
        .expect("processing succeeds");

    assert_eq!(application.answers.get("text"), None);
}

#[test]
fn group_pages_write_into_the_selected_item() {
    let registry = registry();
    let mut application = application_for(household_form());
    application.answers.push_items("people", "people", 2);
    let processor = PageProcessor::new(&registry);

    let error = processor
        .process(
            &mut application,
            "person-name",
            &data(json!({ "full_name": "Grace" })),
            None,
            false,
        )
        .expect_err("item index required");
    assert!(matches!(
        error,
        FormError::Repeating(RepeatingSectionError::MissingItemIndex { .. })
    ));

    processor
        .process(
            &mut application,
            "person-name",
            &data(json!({ "full_name": "Grace" })),
            Some(ExtraData::item(1)),
            false,
        )
        .expect("processing succeeds");

    assert_eq!(
        application
            .answers
            .item("people", 1)
            .and_then(|item| item.get("full_name")),
        Some(&json!("Grace"))
    );
    assert_eq!(application.answers.get("full_name"), None);

    let error = processor
        .process(
            &mut application,
            "person-name",
            &data(json!({ "full_name": "Alan" })),
            Some(ExtraData::item(2)),
            false,
        )
        .expect_err("index out of range");
    assert!(matches!(
        error,
        FormError::Repeating(RepeatingSectionError::ItemIndexOutOfRange { index: 2, count: 2, .. })
    ));
}

#[test]
fn check_reports_unfilled_pages_without_mutating() {
    let registry = registry();
    let mut application = application_for(household_form());
    let processor = PageProcessor::new(&registry);

    let errors = processor
        .check(&application, "pets", None)
        .expect("check succeeds");
    assert_eq!(errors.for_field("has_pets"), ["Do you have pets? is required"]);

    application.answers.insert("has_pets", json!("no"));
    let before = application.clone();
    let errors = processor
        .check(&application, "pets", None)
        .expect("check succeeds");
    assert!(errors.is_empty());
    assert_eq!(application, before);
}
