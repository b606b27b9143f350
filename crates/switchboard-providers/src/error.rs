//! Error type for `switchboard-providers`.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  /// The provider answered with a non-success status.
  #[error("{provider} returned {status}: {body}")]
  Status {
    provider: &'static str,
    status:   StatusCode,
    body:     String,
  },

  #[error("{0} returned no content")]
  EmptyResponse(&'static str),
}

impl Error {
  /// Turn a non-2xx response into [`Error::Status`], keeping a bounded
  /// excerpt of the body for the logs.
  pub(crate) async fn from_response(
    provider: &'static str,
    resp: reqwest::Response,
  ) -> Self {
    let status = resp.status();
    let mut body = resp.text().await.unwrap_or_default();
    if body.len() > 512 {
      let cut = (0..=512).rev().find(|&i| body.is_char_boundary(i)).unwrap_or(0);
      body.truncate(cut);
    }
    Self::Status { provider, status, body }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
