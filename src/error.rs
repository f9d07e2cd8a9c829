use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use std::path::PathBuf;
use thiserror::Error;

use crate::models::ErrorResponse;

#[derive(Error, Debug)]
pub enum SpamhamError {
    #[error("Could not read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid artifact {}: {reason}", .path.display())]
    Artifact { path: PathBuf, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl SpamhamError {
    pub fn artifact(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        SpamhamError::Artifact {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

impl ResponseError for SpamhamError {
    fn status_code(&self) -> StatusCode {
        match self {
            SpamhamError::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
        })
    }
}

pub type Result<T> = std::result::Result<T, SpamhamError>;
