//! Error types and axum `IntoResponse` implementation.
//!
//! A TwiML rendering failure still answers `200` with a canned apology so
//! the caller hears something other than the provider's generic error tone.

use axum::{
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::twiml::{FALLBACK, Twiml};

#[derive(Debug, Error)]
pub enum Error {
  #[error("unauthorized")]
  Unauthorized,
  #[error("not found")]
  NotFound,
  #[error("xml error: {0}")]
  Xml(#[from] std::io::Error),
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    match self {
      Error::Unauthorized => {
        let mut res =
          (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
        res.headers_mut().insert(
          header::WWW_AUTHENTICATE,
          HeaderValue::from_static("Basic realm=\"switchboard\""),
        );
        res
      }
      Error::NotFound => (StatusCode::NOT_FOUND, "Not Found").into_response(),
      Error::Xml(e) => {
        error!(error = %e, "failed to render twiml");
        Twiml(FALLBACK.to_owned()).into_response()
      }
    }
  }
}
