use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::answers::FormData;
use super::domain::{ApplicantId, ExtraData, FormId};
use super::error::FormError;
use super::repository::{ApplicationRepository, FormRepository, RepositoryError};
use super::service::FormRunnerService;
use super::submission::SubmissionPublisher;

type SharedService<F, A, P> = Arc<FormRunnerService<F, A, P>>;

#[derive(Debug, Deserialize)]
pub struct StartRequest {
    pub applicant_id: String,
    pub form_id: String,
}

/// Selects a repeating-group item with `?item=<index>`.
#[derive(Debug, Default, Deserialize)]
pub struct ItemQuery {
    pub item: Option<usize>,
}

impl ItemQuery {
    fn extra_data(&self) -> Option<ExtraData> {
        self.item.map(ExtraData::item)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AddItemsRequest {
    pub number_of_items: Option<usize>,
}

/// Router builder exposing the form runner over HTTP.
pub fn form_router<F, A, P>(service: SharedService<F, A, P>) -> Router
where
    F: FormRepository + 'static,
    A: ApplicationRepository + 'static,
    P: SubmissionPublisher + 'static,
{
    Router::new()
        .route("/api/v1/forms", get(list_forms_handler::<F, A, P>))
        .route("/api/v1/applications", post(start_handler::<F, A, P>))
        .route(
            "/api/v1/applications/:applicant_id",
            get(application_handler::<F, A, P>),
        )
        .route(
            "/api/v1/applications/:applicant_id/submit",
            post(submit_handler::<F, A, P>),
        )
        .route(
            "/api/v1/applications/:applicant_id/pages/:page_id",
            get(page_handler::<F, A, P>).post(process_page_handler::<F, A, P>),
        )
        .route(
            "/api/v1/applications/:applicant_id/pages/:page_id/change",
            post(process_change_handler::<F, A, P>),
        )
        .route(
            "/api/v1/applications/:applicant_id/pages/:page_id/resume",
            get(resume_handler::<F, A, P>),
        )
        .route(
            "/api/v1/applications/:applicant_id/pages/:page_id/items",
            post(add_items_handler::<F, A, P>),
        )
        .route(
            "/api/v1/applications/:applicant_id/pages/:page_id/items/:item_index",
            delete(remove_item_handler::<F, A, P>),
        )
        .with_state(service)
}

pub(crate) async fn list_forms_handler<F, A, P>(
    State(service): State<SharedService<F, A, P>>,
) -> Response
where
    F: FormRepository + 'static,
    A: ApplicationRepository + 'static,
    P: SubmissionPublisher + 'static,
{
    match service.list_forms() {
        Ok(forms) => (StatusCode::OK, Json(forms)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn start_handler<F, A, P>(
    State(service): State<SharedService<F, A, P>>,
    Json(request): Json<StartRequest>,
) -> Response
where
    F: FormRepository + 'static,
    A: ApplicationRepository + 'static,
    P: SubmissionPublisher + 'static,
{
    let applicant_id = ApplicantId(request.applicant_id);
    let form_id = FormId(request.form_id);
    match service.start(&applicant_id, &form_id) {
        Ok(application) => (StatusCode::CREATED, Json(application)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn application_handler<F, A, P>(
    State(service): State<SharedService<F, A, P>>,
    Path(applicant_id): Path<String>,
) -> Response
where
    F: FormRepository + 'static,
    A: ApplicationRepository + 'static,
    P: SubmissionPublisher + 'static,
{
    match service.get_application(&ApplicantId(applicant_id)) {
        Ok(application) => (StatusCode::OK, Json(application)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn page_handler<F, A, P>(
    State(service): State<SharedService<F, A, P>>,
    Path((applicant_id, page_id)): Path<(String, String)>,
    Query(query): Query<ItemQuery>,
) -> Response
where
    F: FormRepository + 'static,
    A: ApplicationRepository + 'static,
    P: SubmissionPublisher + 'static,
{
    match service.get_page(&ApplicantId(applicant_id), &page_id, query.extra_data()) {
        Ok(context) => (StatusCode::OK, Json(context)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn process_page_handler<F, A, P>(
    State(service): State<SharedService<F, A, P>>,
    Path((applicant_id, page_id)): Path<(String, String)>,
    Query(query): Query<ItemQuery>,
    Json(data): Json<FormData>,
) -> Response
where
    F: FormRepository + 'static,
    A: ApplicationRepository + 'static,
    P: SubmissionPublisher + 'static,
{
    let applicant_id = ApplicantId(applicant_id);
    match service.process_page(&applicant_id, &page_id, &data, query.extra_data()) {
        Ok(result) if result.accepted => (StatusCode::OK, Json(result)).into_response(),
        Ok(result) => (StatusCode::UNPROCESSABLE_ENTITY, Json(result)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn process_change_handler<F, A, P>(
    State(service): State<SharedService<F, A, P>>,
    Path((applicant_id, page_id)): Path<(String, String)>,
    Query(query): Query<ItemQuery>,
    Json(data): Json<FormData>,
) -> Response
where
    F: FormRepository + 'static,
    A: ApplicationRepository + 'static,
    P: SubmissionPublisher + 'static,
{
    let applicant_id = ApplicantId(applicant_id);
    match service.process_change(&applicant_id, &page_id, &data, query.extra_data()) {
        Ok(result) if result.accepted => (StatusCode::OK, Json(result)).into_response(),
        Ok(result) => (StatusCode::UNPROCESSABLE_ENTITY, Json(result)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn resume_handler<F, A, P>(
    State(service): State<SharedService<F, A, P>>,
    Path((applicant_id, page_id)): Path<(String, String)>,
    Query(query): Query<ItemQuery>,
) -> Response
where
    F: FormRepository + 'static,
    A: ApplicationRepository + 'static,
    P: SubmissionPublisher + 'static,
{
    match service.next_unfilled_page(&ApplicantId(applicant_id), &page_id, query.extra_data()) {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn add_items_handler<F, A, P>(
    State(service): State<SharedService<F, A, P>>,
    Path((applicant_id, page_id)): Path<(String, String)>,
    request: Option<Json<AddItemsRequest>>,
) -> Response
where
    F: FormRepository + 'static,
    A: ApplicationRepository + 'static,
    P: SubmissionPublisher + 'static,
{
    let number_of_items = request.and_then(|Json(request)| request.number_of_items);
    match service.add_another(&ApplicantId(applicant_id), &page_id, number_of_items) {
        Ok(count) => (StatusCode::OK, Json(json!({ "count": count }))).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn remove_item_handler<F, A, P>(
    State(service): State<SharedService<F, A, P>>,
    Path((applicant_id, page_id, item_index)): Path<(String, String, usize)>,
) -> Response
where
    F: FormRepository + 'static,
    A: ApplicationRepository + 'static,
    P: SubmissionPublisher + 'static,
{
    match service.remove_from_add_another(&ApplicantId(applicant_id), &page_id, item_index) {
        Ok(count) => (StatusCode::OK, Json(json!({ "count": count }))).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn submit_handler<F, A, P>(
    State(service): State<SharedService<F, A, P>>,
    Path(applicant_id): Path<String>,
) -> Response
where
    F: FormRepository + 'static,
    A: ApplicationRepository + 'static,
    P: SubmissionPublisher + 'static,
{
    match service.submit(&ApplicantId(applicant_id)) {
        Ok(submission) => (StatusCode::ACCEPTED, Json(submission)).into_response(),
        Err(error) => error.into_response(),
    }
}

impl FormError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            FormError::FormNotFound(_)
            | FormError::ApplicationNotFound(_)
            | FormError::PageNotFound { .. } => StatusCode::NOT_FOUND,
            FormError::Repeating(_) => StatusCode::UNPROCESSABLE_ENTITY,
            FormError::AlreadySubmitted(_) | FormError::Incomplete { .. } => StatusCode::CONFLICT,
            FormError::Store {
                source: RepositoryError::Unavailable(_),
                ..
            } => StatusCode::SERVICE_UNAVAILABLE,
            FormError::Configuration { .. } | FormError::Store { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            FormError::Publish { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for FormError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut payload = json!({ "error": self.to_string() });
        if let FormError::Incomplete { page_id, .. } = &self {
            payload["page_id"] = json!(page_id);
        }
        (status, Json(payload)).into_response()
    }
}
