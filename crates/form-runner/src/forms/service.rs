use std::fmt::Display;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::answers::{FormData, PageErrors};
use super::domain::{
    ApplicantId, Application, ApplicationStatus, ExtraData, Form, FormId, PageLocation, PageType,
};
use super::error::{ConfigurationError, FormError};
use super::handlers::HandlerRegistry;
use super::navigation::{NavigationResolver, WalkOutcome};
use super::processor::{PageProcessor, ProcessOutcome};
use super::repeating::{scope_for, RepeatingSectionController};
use super::repository::{ApplicationRepository, FormRepository, RepositoryError};
use super::submission::{CompletedSubmission, SubmissionPublisher};
use super::view::PageView;

/// Outcome of a page submission as returned to callers.
///
/// A rejected submission carries the page re-rendered with the submitted
/// inputs and the per-field errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageResult {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageLocation>,
    pub errors: PageErrors,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<PageView>,
}

/// Outcome of changing an answer from the summary page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeResult {
    pub accepted: bool,
    /// Where the applicant continues; `None` when the change was rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume: Option<WalkOutcome>,
    pub errors: PageErrors,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<PageView>,
}

/// Everything needed to render one page.
#[derive(Debug, Clone, Serialize)]
pub struct PageContext {
    pub application: Application,
    pub page: PageView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<PageLocation>,
}

/// Listing entry for a published form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSummary {
    pub id: FormId,
    pub title: String,
    pub start_page: String,
    pub pages: usize,
}

impl From<&Form> for FormSummary {
    fn from(form: &Form) -> Self {
        Self {
            id: form.id.clone(),
            title: form.title.clone(),
            start_page: form.start_page.clone(),
            pages: form.pages.len(),
        }
    }
}

/// Service composing the stores, the page processor, and the navigation resolver.
///
/// Every call re-reads the application from the store and writes the mutated
/// snapshot back; nothing is cached between calls.
pub struct FormRunnerService<F, A, P> {
    forms: Arc<F>,
    applications: Arc<A>,
    publisher: Arc<P>,
    registry: HandlerRegistry,
    repeating: RepeatingSectionController,
}

impl<F, A, P> FormRunnerService<F, A, P>
where
    F: FormRepository + 'static,
    A: ApplicationRepository + 'static,
    P: SubmissionPublisher + 'static,
{
    pub fn new(forms: Arc<F>, applications: Arc<A>, publisher: Arc<P>) -> Self {
        Self::with_registry(forms, applications, publisher, HandlerRegistry::standard())
    }

    pub fn with_registry(
        forms: Arc<F>,
        applications: Arc<A>,
        publisher: Arc<P>,
        registry: HandlerRegistry,
    ) -> Self {
        Self {
            forms,
            applications,
            publisher,
            registry,
            repeating: RepeatingSectionController,
        }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Prepares both stores. Run once at startup before serving requests.
    pub fn ensure_ready(&self) -> Result<(), FormError> {
        self.forms
            .ensure_ready()
            .map_err(store_error("prepare form store", "forms"))?;
        self.applications
            .ensure_ready()
            .map_err(store_error("prepare application store", "applications"))?;
        Ok(())
    }

    pub fn list_forms(&self) -> Result<Vec<FormSummary>, FormError> {
        let forms = self
            .forms
            .get_forms()
            .map_err(store_error("list forms", "forms"))?;
        Ok(forms.iter().map(FormSummary::from).collect())
    }

    /// Binds a fresh snapshot of `form_id` to the applicant, replacing any
    /// application they already had.
    pub fn start(
        &self,
        applicant_id: &ApplicantId,
        form_id: &FormId,
    ) -> Result<Application, FormError> {
        let form = self
            .forms
            .get_form(form_id)
            .map_err(store_error("load form", form_id))?
            .ok_or_else(|| FormError::FormNotFound(form_id.clone()))?;
        if form.page(&form.start_page).is_none() {
            return Err(FormError::configuration(
                form_id,
                ConfigurationError::MissingStartPage {
                    start_page: form.start_page.clone(),
                },
            ));
        }

        let application = Application::new(applicant_id.clone(), form, Utc::now());
        self.save(&application)?;
        info!(%applicant_id, %form_id, "application started");
        Ok(application)
    }

    pub fn get_application(&self, applicant_id: &ApplicantId) -> Result<Application, FormError> {
        self.load(applicant_id)
    }

    /// Validates and stores one page submission, then resolves where to go next.
    pub fn process_page(
        &self,
        applicant_id: &ApplicantId,
        page_id: &str,
        data: &FormData,
        extra_data: Option<ExtraData>,
    ) -> Result<PageResult, FormError> {
        let application = match self.apply_page(applicant_id, page_id, data, extra_data)? {
            Ok(application) => application,
            Err((errors, page)) => {
                return Ok(PageResult {
                    accepted: false,
                    next: None,
                    errors,
                    page: Some(page),
                })
            }
        };

        let next =
            NavigationResolver::new(&self.registry).next_page(&application, page_id, extra_data)?;
        debug!(
            %applicant_id,
            page_id,
            next = next.as_ref().map(|next| next.page_id.as_str()).unwrap_or("none"),
            "page accepted"
        );
        Ok(PageResult {
            accepted: true,
            next,
            errors: PageErrors::default(),
            page: None,
        })
    }

    /// Stores a changed answer, then fast-forwards past every page that is
    /// still complete so the applicant lands on the next page needing input,
    /// usually the summary page again.
    pub fn process_change(
        &self,
        applicant_id: &ApplicantId,
        page_id: &str,
        data: &FormData,
        extra_data: Option<ExtraData>,
    ) -> Result<ChangeResult, FormError> {
        let application = match self.apply_page(applicant_id, page_id, data, extra_data)? {
            Ok(application) => application,
            Err((errors, page)) => {
                return Ok(ChangeResult {
                    accepted: false,
                    resume: None,
                    errors,
                    page: Some(page),
                })
            }
        };

        let walk = NavigationResolver::new(&self.registry).walk_to_next_invalid_or_unfilled_page(
            &application,
            page_id,
            extra_data,
        )?;
        debug!(
            %applicant_id,
            page_id,
            resume = %walk.location.page_id,
            stop = walk.stop,
            "answer changed"
        );
        Ok(ChangeResult {
            accepted: true,
            resume: Some(walk),
            errors: PageErrors::default(),
            page: None,
        })
    }

    /// Page definition with the applicant's answers and the back link.
    pub fn get_page(
        &self,
        applicant_id: &ApplicantId,
        page_id: &str,
        extra_data: Option<ExtraData>,
    ) -> Result<PageContext, FormError> {
        let application = self.load(applicant_id)?;
        let form = &application.form;
        let page = form
            .page(page_id)
            .ok_or_else(|| FormError::page_not_found(&form.id, page_id))?;
        let scope = scope_for(form, &application.answers, page_id, extra_data)?;

        let view = PageView::build(
            &application,
            page,
            scope,
            extra_data,
            &PageErrors::default(),
        );
        let previous =
            NavigationResolver::new(&self.registry).previous_page(&application, page_id, extra_data)?;

        Ok(PageContext {
            application,
            page: view,
            previous,
        })
    }

    /// Appends items to a repeating group; `None` adds one.
    pub fn add_another(
        &self,
        applicant_id: &ApplicantId,
        page_id: &str,
        number_of_items: Option<usize>,
    ) -> Result<usize, FormError> {
        let mut application = self.load_open(applicant_id)?;
        let count =
            self.repeating
                .add_another(&mut application, page_id, number_of_items.unwrap_or(1))?;
        self.save(&application)?;
        Ok(count)
    }

    pub fn remove_from_add_another(
        &self,
        applicant_id: &ApplicantId,
        page_id: &str,
        item_index: usize,
    ) -> Result<usize, FormError> {
        let mut application = self.load_open(applicant_id)?;
        let count = self
            .repeating
            .remove_from_add_another(&mut application, page_id, item_index)?;
        self.save(&application)?;
        Ok(count)
    }

    /// First page at or after `page_id` that still needs input.
    pub fn next_unfilled_page(
        &self,
        applicant_id: &ApplicantId,
        page_id: &str,
        extra_data: Option<ExtraData>,
    ) -> Result<WalkOutcome, FormError> {
        let application = self.load(applicant_id)?;
        NavigationResolver::new(&self.registry).walk_to_next_invalid_or_unfilled_page(
            &application,
            page_id,
            extra_data,
        )
    }

    /// Marks a complete application as submitted and hands it to the publisher.
    ///
    /// The walk from the start page must end on a summary page with every page
    /// on the way valid; otherwise the first page needing attention is reported.
    pub fn submit(&self, applicant_id: &ApplicantId) -> Result<CompletedSubmission, FormError> {
        let mut application = self.load_open(applicant_id)?;
        let start_page = application.form.start_page.clone();

        let walk = NavigationResolver::new(&self.registry).walk_to_next_invalid_or_unfilled_page(
            &application,
            &start_page,
            None,
        )?;
        if !walk.stop || walk.location.page_type != PageType::Summary {
            warn!(
                %applicant_id,
                page_id = %walk.location.page_id,
                "submission refused; application incomplete"
            );
            return Err(FormError::Incomplete {
                applicant_id: applicant_id.clone(),
                page_id: walk.location.page_id,
            });
        }

        let now = Utc::now();
        application.status = ApplicationStatus::Submitted;
        application.updated_at = now;
        self.save(&application)?;

        let submission = CompletedSubmission::from_application(&application, now);
        self.publisher
            .publish(submission.clone())
            .map_err(|source| FormError::Publish {
                applicant_id: applicant_id.clone(),
                source,
            })?;

        info!(
            %applicant_id,
            form_id = %application.form.id,
            reference = %submission.reference,
            "application submitted"
        );
        Ok(submission)
    }

    /// Processes one page and saves the application when it is accepted. A
    /// rejection returns the errors with the page view to re-render.
    fn apply_page(
        &self,
        applicant_id: &ApplicantId,
        page_id: &str,
        data: &FormData,
        extra_data: Option<ExtraData>,
    ) -> Result<Result<Application, (PageErrors, PageView)>, FormError> {
        let mut application = self.load_open(applicant_id)?;

        let outcome = PageProcessor::new(&self.registry).process(
            &mut application,
            page_id,
            data,
            extra_data,
            false,
        )?;

        match outcome {
            ProcessOutcome::Accepted => {
                self.save(&application)?;
                Ok(Ok(application))
            }
            ProcessOutcome::Rejected { errors } => {
                debug!(%applicant_id, page_id, fields = errors.len(), "page rejected");
                let form = &application.form;
                let page = form
                    .page(page_id)
                    .ok_or_else(|| FormError::page_not_found(&form.id, page_id))?;
                let scope = scope_for(form, &application.answers, page_id, extra_data)?;
                let view = PageView::build(&application, page, scope, extra_data, &errors)
                    .with_inputs(data);
                Ok(Err((errors, view)))
            }
        }
    }

    fn load(&self, applicant_id: &ApplicantId) -> Result<Application, FormError> {
        self.applications
            .get_application(applicant_id)
            .map_err(store_error("load application", applicant_id))?
            .ok_or_else(|| FormError::ApplicationNotFound(applicant_id.clone()))
    }

    /// Loads an application that can still be changed.
    fn load_open(&self, applicant_id: &ApplicantId) -> Result<Application, FormError> {
        let application = self.load(applicant_id)?;
        if application.status == ApplicationStatus::Submitted {
            return Err(FormError::AlreadySubmitted(applicant_id.clone()));
        }
        Ok(application)
    }

    fn save(&self, application: &Application) -> Result<(), FormError> {
        self.applications
            .update_application(application.clone())
            .map_err(store_error("save application", &application.applicant_id))
    }
}

fn store_error(
    operation: &'static str,
    subject: impl Display,
) -> impl FnOnce(RepositoryError) -> FormError {
    let subject = subject.to_string();
    move |source| FormError::Store {
        operation,
        subject,
        source,
    }
}
