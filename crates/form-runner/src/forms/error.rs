use super::domain::{ApplicantId, FormId};
use super::repository::RepositoryError;
use super::submission::PublishError;

/// Error raised by the form engine and the service wrapped around it.
///
/// Validation failures are not errors; they come back as
/// [`super::processor::ProcessOutcome::Rejected`].
#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error("form '{0}' not found")]
    FormNotFound(FormId),
    #[error("no application found for applicant '{0}'")]
    ApplicationNotFound(ApplicantId),
    #[error("page '{page_id}' not found in form '{form_id}'")]
    PageNotFound { form_id: FormId, page_id: String },
    #[error("form '{form_id}' is misconfigured: {source}")]
    Configuration {
        form_id: FormId,
        #[source]
        source: ConfigurationError,
    },
    #[error(transparent)]
    Repeating(#[from] RepeatingSectionError),
    #[error("application for applicant '{0}' has already been submitted")]
    AlreadySubmitted(ApplicantId),
    #[error("application for applicant '{applicant_id}' is incomplete; continue at page '{page_id}'")]
    Incomplete {
        applicant_id: ApplicantId,
        page_id: String,
    },
    #[error("{operation} failed for {subject}: {source}")]
    Store {
        operation: &'static str,
        subject: String,
        #[source]
        source: RepositoryError,
    },
    #[error("submission for applicant '{applicant_id}' could not be delivered: {source}")]
    Publish {
        applicant_id: ApplicantId,
        #[source]
        source: PublishError,
    },
}

impl FormError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            FormError::FormNotFound(_)
                | FormError::ApplicationNotFound(_)
                | FormError::PageNotFound { .. }
        )
    }

    pub(crate) fn configuration(form_id: &FormId, source: ConfigurationError) -> Self {
        FormError::Configuration {
            form_id: form_id.clone(),
            source,
        }
    }

    pub(crate) fn page_not_found(form_id: &FormId, page_id: &str) -> Self {
        FormError::PageNotFound {
            form_id: form_id.clone(),
            page_id: page_id.to_string(),
        }
    }
}

/// Defects in a form definition, as opposed to missing data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("start page '{start_page}' does not exist")]
    MissingStartPage { start_page: String },
    #[error("component '{component}' on page '{page_id}' uses unknown field type '{field_type}'")]
    UnknownFieldType {
        page_id: String,
        component: String,
        field_type: String,
    },
    #[error("page '{page_id}' has no default next page")]
    MissingNextPage { page_id: String },
    #[error("page '{page_id}' links to unknown page '{target}'")]
    UnknownTarget { page_id: String, target: String },
    #[error("invalid expression '{expression}': {reason}")]
    InvalidExpression { expression: String, reason: String },
    #[error("page '{page_id}' is an add-another page without a repeating group")]
    MissingGroup { page_id: String },
}

/// Domain errors raised while adding or removing repeating-group items.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepeatingSectionError {
    #[error("page '{page_id}' is not an add-another page")]
    NotAGroup { page_id: String },
    #[error("item {index} is out of range for page '{page_id}' ({count} items)")]
    ItemIndexOutOfRange {
        page_id: String,
        index: usize,
        count: usize,
    },
    #[error("page '{page_id}' belongs to a repeating group and needs an item index")]
    MissingItemIndex { page_id: String },
    #[error("at least one item must be added to page '{page_id}'")]
    InvalidItemCount { page_id: String },
    #[error("page '{page_id}' allows at most {max_items} items")]
    MaxItemsReached { page_id: String, max_items: usize },
}
