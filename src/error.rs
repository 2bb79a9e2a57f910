//! Error taxonomy for the reporting engine.
//!
//! Three user-visible failure classes must stay distinguishable: "no data
//! for this selection" (`NotFound`), "request failed" (`Fetch`), and
//! "invalid date range" (`Validation`). `Computation` marks data-integrity
//! defects the documented sentinel/empty-cell policies do not cover; the
//! pure components (aggregation, discount, pivot) never construct it on
//! well-formed input.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    /// Network failure, timeout, or a non-404 error status from the
    /// backend. Retryable when the request may succeed if repeated.
    #[error("request failed: {message}")]
    Fetch { message: String, retryable: bool },

    /// The backend returned 404: no data exists for the given filters.
    #[error("no data for this selection: {context}")]
    NotFound { context: String },

    /// Invalid report parameters, caught before any fetch.
    #[error("invalid date range: {0}")]
    Validation(String),

    /// A missing foreign key or malformed record where no sentinel policy
    /// applies. Indicates defective upstream data, not a normal path.
    #[error("report computation failed: {0}")]
    Computation(String),
}

impl ReportError {
    /// Whether retrying the same request can reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReportError::Fetch { retryable: true, .. })
    }

    pub(crate) fn fetch(message: impl Into<String>, retryable: bool) -> Self {
        ReportError::Fetch {
            message: message.into(),
            retryable,
        }
    }

    pub(crate) fn not_found(context: impl Into<String>) -> Self {
        ReportError::NotFound {
            context: context.into(),
        }
    }
}
