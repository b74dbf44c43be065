use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use thiserror::Error;

/// Failure of a single request to the exchange-rate API.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid API url: {0}")]
    InvalidUrl(String),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API responded with status {0}")]
    Status(u16),

    #[error("can't decode API response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Malformed input in a route path or query string.
#[derive(Error, Debug, PartialEq)]
pub enum RequestError {
    #[error("invalid currency code: {0:?}")]
    InvalidCurrency(String),

    #[error("invalid date {0:?}, expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("invalid lookback of {0} days")]
    InvalidLookback(u32),
}

/// Everything a page handler can fail with.
#[derive(Error, Debug)]
pub enum PageError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("can't render page: {0}")]
    Render(#[from] tera::Error),
}

impl ResponseError for PageError {
    fn status_code(&self) -> StatusCode {
        match self {
            PageError::Request(_) => StatusCode::BAD_REQUEST,
            PageError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let PageError::Render(e) = self {
            log::error!("{self}: {e:?}");
        }
        HttpResponse::build(self.status_code())
            .content_type("text/plain; charset=utf-8")
            .body(self.to_string())
    }
}
