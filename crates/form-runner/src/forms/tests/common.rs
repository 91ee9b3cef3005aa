use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};

use crate::forms::answers::FormData;
use crate::forms::domain::{ApplicantId, Application, Form, FormId};
use crate::forms::handlers::HandlerRegistry;
use crate::forms::repository::{
    ApplicationRepository, InMemoryApplicationRepository, InMemoryFormRepository,
    RepositoryError,
};
use crate::forms::service::FormRunnerService;
use crate::forms::submission::{CompletedSubmission, PublishError, SubmissionPublisher};

pub(super) fn form_from(value: Value) -> Form {
    serde_json::from_value(value).expect("valid form definition")
}

pub(super) fn data(value: Value) -> FormData {
    match value {
        Value::Object(map) => map,
        other => panic!("form data must be an object, got {other}"),
    }
}

pub(super) fn applicant(id: &str) -> ApplicantId {
    ApplicantId(id.to_string())
}

pub(super) fn application_for(form: Form) -> Application {
    let created = Utc
        .with_ymd_and_hms(2025, 3, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp");
    Application::new(applicant("applicant-1"), form, created)
}

pub(super) fn registry() -> HandlerRegistry {
    HandlerRegistry::standard()
}

/// start -> text-component, which loops to itself on "ERROR" and otherwise
/// finishes on the summary page.
pub(super) fn echo_form() -> Form {
    form_from(json!({
        "id": "echo",
        "title": "Echo",
        "start_page": "start",
        "pages": [
            { "id": "start", "title": "Start", "next_page_id": "text-component" },
            {
                "id": "text-component",
                "title": "Say something",
                "components": [
                    { "id": "c-text", "type": "text", "name": "text", "label": "Text" }
                ],
                "conditions": [
                    { "id": "again", "expression": "text == \"ERROR\"", "next_page_id": "text-component" }
                ],
                "next_page_id": "summary"
            },
            { "id": "summary", "type": "summary", "title": "Check your answers" }
        ]
    }))
}

/// Applicant details, an age gate, and a repeating group of household members.
pub(super) fn household_form() -> Form {
    form_from(json!({
        "id": "household",
        "title": "Household survey",
        "start_page": "applicant",
        "submission": { "destination": "housing-queue", "reference_prefix": "HH" },
        "pages": [
            {
                "id": "applicant",
                "title": "About you",
                "components": [
                    { "id": "c-name", "type": "text", "name": "name", "label": "Full name" },
                    { "id": "c-email", "type": "email", "name": "email", "label": "Email" },
                    {
                        "id": "c-age", "type": "number", "name": "age", "label": "Age",
                        "range": { "min": 0, "max": 130, "integer": true }
                    }
                ],
                "conditions": [
                    { "id": "minor", "expression": "age < 18", "next_page_id": "too-young" }
                ],
                "next_page_id": "pets"
            },
            {
                "id": "pets",
                "title": "Pets",
                "components": [
                    { "id": "c-pets", "type": "yesno", "name": "has_pets", "label": "Do you have pets?" }
                ],
                "next_page_id": "people"
            },
            {
                "id": "people",
                "type": "add_another",
                "title": "People in your household",
                "group": {
                    "pages": ["person-name", "person-age"],
                    "answer_key": "people",
                    "max_items": 3
                },
                "next_page_id": "summary"
            },
            {
                "id": "person-name",
                "title": "Name",
                "components": [
                    { "id": "c-person-name", "type": "text", "name": "full_name", "label": "Name" }
                ],
                "next_page_id": "person-age"
            },
            {
                "id": "person-age",
                "title": "Age",
                "components": [
                    { "id": "c-person-age", "type": "number", "name": "person_age", "label": "Age" }
                ],
                "next_page_id": "people"
            },
            { "id": "too-young", "type": "stop", "title": "You cannot apply" },
            { "id": "summary", "type": "summary", "title": "Check your answers" }
        ]
    }))
}

/// `a` and `b` point at each other; `c` is never reachable from the start page.
pub(super) fn cyclic_form() -> Form {
    form_from(json!({
        "id": "cyclic",
        "title": "Cyclic",
        "start_page": "a",
        "pages": [
            { "id": "a", "next_page_id": "b" },
            { "id": "b", "next_page_id": "a" },
            { "id": "c", "next_page_id": "summary" },
            { "id": "summary", "type": "summary" }
        ]
    }))
}

/// crew hub repeating [crew-name, crew-age, crew-job]; members under 16 skip the
/// job page and return straight to the hub.
pub(super) fn branching_group_form() -> Form {
    form_from(json!({
        "id": "crew",
        "title": "Crew list",
        "start_page": "crew",
        "pages": [
            {
                "id": "crew",
                "type": "add_another",
                "title": "Crew",
                "next_page_id": "summary",
                "group": { "pages": ["crew-name", "crew-age", "crew-job"], "answer_key": "crew" }
            },
            {
                "id": "crew-name",
                "components": [
                    { "id": "c-crew-name", "type": "text", "name": "crew_name", "label": "Name" }
                ],
                "next_page_id": "crew-age"
            },
            {
                "id": "crew-age",
                "components": [
                    { "id": "c-crew-age", "type": "number", "name": "crew_age", "label": "Age" }
                ],
                "conditions": [
                    { "id": "minor", "expression": "crew_age < 16", "next_page_id": "crew" }
                ],
                "next_page_id": "crew-job"
            },
            {
                "id": "crew-job",
                "components": [
                    { "id": "c-crew-job", "type": "text", "name": "crew_job", "label": "Job" }
                ],
                "next_page_id": "crew"
            },
            { "id": "summary", "type": "summary", "title": "Check your answers" }
        ]
    }))
}

pub(super) type MemoryService =
    FormRunnerService<InMemoryFormRepository, InMemoryApplicationRepository, MemoryPublisher>;

pub(super) fn build_service() -> (
    MemoryService,
    Arc<InMemoryApplicationRepository>,
    Arc<MemoryPublisher>,
) {
    let forms = Arc::new(InMemoryFormRepository::with_forms([
        echo_form(),
        household_form(),
    ]));
    let applications = Arc::new(InMemoryApplicationRepository::default());
    let publisher = Arc::new(MemoryPublisher::default());
    let service = FormRunnerService::new(forms, applications.clone(), publisher.clone());
    (service, applications, publisher)
}

pub(super) fn household_id() -> FormId {
    FormId("household".to_string())
}

#[derive(Default, Clone)]
pub(super) struct MemoryPublisher {
    events: Arc<Mutex<Vec<CompletedSubmission>>>,
}

impl MemoryPublisher {
    pub(super) fn events(&self) -> Vec<CompletedSubmission> {
        self.events.lock().expect("publisher mutex poisoned").clone()
    }
}

impl SubmissionPublisher for MemoryPublisher {
    fn publish(&self, submission: CompletedSubmission) -> Result<(), PublishError> {
        self.events
            .lock()
            .expect("publisher mutex poisoned")
            .push(submission);
        Ok(())
    }
}

pub(super) struct OfflinePublisher;

impl SubmissionPublisher for OfflinePublisher {
    fn publish(&self, _submission: CompletedSubmission) -> Result<(), PublishError> {
        Err(PublishError::Transport("queue offline".to_string()))
    }
}

pub(super) struct UnavailableApplications;

impl ApplicationRepository for UnavailableApplications {
    fn get_application(&self, _id: &ApplicantId) -> Result<Option<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_application(&self, _application: Application) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn delete_application(&self, _id: &ApplicantId) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Answers every page of the household form for one adult and one member.
pub(super) fn complete_household(service: &MemoryService, applicant_id: &ApplicantId) {
    service
        .start(applicant_id, &household_id())
        .expect("start succeeds");
    let about = service
        .process_page(
            applicant_id,
            "applicant",
            &data(json!({ "name": "Ada Lovelace", "email": "ada@example.com", "age": "36" })),
            None,
        )
        .expect("process succeeds");
    assert!(about.accepted);
    service
        .process_page(applicant_id, "pets", &data(json!({ "has_pets": "no" })), None)
        .expect("process succeeds");
    service
        .add_another(applicant_id, "people", None)
        .expect("add succeeds");
    for (page_id, answer) in [
        ("person-name", json!({ "full_name": "Charles Babbage" })),
        ("person-age", json!({ "person_age": 40 })),
    ] {
        let result = service
            .process_page(
                applicant_id,
                page_id,
                &data(answer),
                Some(crate::forms::domain::ExtraData::item(0)),
            )
            .expect("process succeeds");
        assert!(result.accepted, "{page_id} rejected: {:?}", result.errors);
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
