//! Form definitions, applications, and the engine that walks applicants through them.
//!
//! Pages are validated by per-field-type handlers, branched by expression
//! conditions, and linked backwards by replaying the page graph from the start
//! page with the current answers.

pub mod answers;
pub mod check;
pub mod condition;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod loader;
pub mod navigation;
pub mod processor;
pub(crate) mod repeating;
pub mod repository;
pub mod router;
pub mod service;
pub mod submission;
pub mod view;

#[cfg(test)]
mod tests;

pub use answers::{AnswerScope, Answers, FormData, PageErrors};
pub use check::FormIssue;
pub use domain::{
    AddAnotherGroup, ApplicantId, Application, ApplicationStatus, Component, ComponentOption,
    Condition, ExtraData, Form, FormId, NumberRange, Page, PageLocation, PageType,
    SubmissionTarget, ValidationRule,
};
pub use error::{ConfigurationError, FormError, RepeatingSectionError};
pub use handlers::{FieldHandler, HandlerRegistry};
pub use loader::{load_form_file, load_forms_dir, parse_form, LoadError};
pub use navigation::{NavigationResolver, WalkOutcome};
pub use processor::{PageProcessor, ProcessOutcome};
pub use repeating::RepeatingSectionController;
pub use repository::{
    ApplicationRepository, FormRepository, InMemoryApplicationRepository,
    InMemoryFormRepository, RepositoryError,
};
pub use router::form_router;
pub use service::{ChangeResult, FormRunnerService, FormSummary, PageContext, PageResult};
pub use submission::{CompletedSubmission, LogPublisher, PublishError, SubmissionPublisher};
pub use view::{FieldView, PageView};
