use crate::config::ConfigError;
use crate::forms::{FormError, LoadError};
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Form(FormError),
    Load(LoadError),
    FormCheck { failing: usize },
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Form(err) => write!(f, "form error: {}", err),
            AppError::Load(err) => write!(f, "form loading error: {}", err),
            AppError::FormCheck { failing } => {
                write!(f, "{} form definition(s) failed the check", failing)
            }
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Form(err) => Some(err),
            AppError::Load(err) => Some(err),
            AppError::FormCheck { .. } => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Form(err) => err.status_code(),
            AppError::FormCheck { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Load(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<FormError> for AppError {
    fn from(value: FormError) -> Self {
        Self::Form(value)
    }
}

impl From<LoadError> for AppError {
    fn from(value: LoadError) -> Self {
        Self::Load(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::ApplicantId;
    use std::error::Error;

    #[test]
    fn form_errors_keep_their_status() {
        let error = AppError::from(FormError::ApplicationNotFound(ApplicantId(
            "a-1".to_string(),
        )));
        assert!(error.to_string().contains("a-1"));
        assert!(error.source().is_some());
        assert_eq!(error.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn io_errors_are_internal() {
        let error = AppError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_eq!(
            error.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
