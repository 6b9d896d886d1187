use std::{error::Error as StdError, io};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{config::LoadError, domain::error::ConfigurationError, infra::error::InfraError};

/// A contributor or alterer could not produce its content for this cycle.
#[derive(Debug, Error)]
pub enum ContentProductionError {
    #[error("transform for `{name}` produced no output")]
    EmptyTransform { name: String },
    #[error("transpiler failed for `{name}` (exit {exit_code:?}): {stderr}")]
    Transpiler {
        name: String,
        exit_code: Option<i32>,
        stderr: String,
    },
    #[error("transpiler unavailable for `{name}`: {error}")]
    TranspilerUnavailable {
        name: String,
        #[source]
        error: io::Error,
    },
    #[error("failed to read source `{name}`: {error}")]
    Read {
        name: String,
        #[source]
        error: io::Error,
    },
    #[error("document alterer failed: {message}")]
    Alterer { message: String },
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

impl ContentProductionError {
    pub fn empty_transform(name: impl Into<String>) -> Self {
        Self::EmptyTransform { name: name.into() }
    }

    pub fn alterer(message: impl Into<String>) -> Self {
        Self::Alterer {
            message: message.into(),
        }
    }
}

/// The rendering surface's document or window cannot be reached.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    #[error("rendering surface unavailable: {reason}")]
    Unavailable { reason: String },
    #[error("resource `{handle}` is not live on this surface")]
    UnknownResource { handle: String },
}

impl SurfaceError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }
}

/// Why a publish cycle was aborted. The previously visible render is left in
/// place whenever one of these is returned.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("`{label}` failed to produce content: {error}")]
    Production {
        label: String,
        #[source]
        error: ContentProductionError,
    },
    #[error(transparent)]
    Surface(#[from] SurfaceError),
}

impl PublishError {
    pub fn production(label: impl Into<String>, error: ContentProductionError) -> Self {
        Self::Production {
            label: label.into(),
            error,
        }
    }
}

/// Diagnostic chain attached to error responses for the response logger.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = vec![error.to_string()];
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: &'static str,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            status,
            public_message,
            report: ErrorReport::from_message(source, status, detail),
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        Self {
            status,
            public_message,
            report: ErrorReport::from_error(source, status, error),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.public_message).into_response();
        self.report.attach(&mut response);
        response
    }
}

impl From<PublishError> for HttpError {
    fn from(error: PublishError) -> Self {
        const SOURCE: &str = "infra::http::publish_error_to_http_error";
        match &error {
            PublishError::Production { .. } => HttpError::from_error(
                SOURCE,
                StatusCode::UNPROCESSABLE_ENTITY,
                "Content could not be produced",
                &error,
            ),
            PublishError::Surface(_) => HttpError::from_error(
                SOURCE,
                StatusCode::SERVICE_UNAVAILABLE,
                "Rendering surface unavailable",
                &error,
            ),
        }
    }
}

/// Failures that end the binary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] LoadError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Publish(#[from] PublishError),
}
