//! Budgetsync is the client-side state layer for a personal budgeting app.
//!
//! The remote service owns the data; this crate owns the in-memory copy the
//! UI reads. Each entity family (budgets, transactions, plans, salaries,
//! subscriptions) gets a controller that mediates every mutation through a
//! resource client, reconciles the server's response into local state,
//! recomputes derived aggregates, and falls back to a usable offline
//! placeholder when the service is unreachable.
//!
//! Controllers are explicit instances built by [AppState] around an injected
//! [ResourceClient](clients::ResourceClient), so tests and alternative
//! transports can swap the HTTP layer out.

#![warn(missing_docs)]

mod amount;
mod app_state;

pub mod budget;
pub mod clients;
pub mod endpoints;
pub mod plan;
pub mod salary;
pub mod subscription;
pub mod transaction;

pub use app_state::AppState;

/// The errors that may occur while talking to the remote budget service.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// The remote service answered with a non-success status code.
    #[error("the remote service rejected the request (status {status})")]
    Api {
        /// The HTTP status code of the response.
        status: u16,
        /// The message from the response's structured error payload, when
        /// the body contained one.
        message: Option<String>,
    },

    /// The request never produced a response (connection refused, reset,
    /// DNS failure and the like).
    #[error("could not reach the remote service: {0}")]
    Transport(String),

    /// The request could not be built or its body could not be encoded.
    #[error("could not build the request: {0}")]
    InvalidRequest(String),

    /// The response body could not be parsed as the expected shape.
    #[error("could not parse the response body: {0}")]
    InvalidResponse(String),
}

impl Error {
    /// Derive the message to record for the user.
    ///
    /// Prefers the remote service's structured error payload, then the
    /// transport-level message, and finally the caller's `fallback`
    /// description. Controllers pass a per-operation fallback such as
    /// "Failed to create salary".
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Error::Api {
                message: Some(message),
                ..
            } => message.clone(),
            Error::Api {
                status,
                message: None,
            } => format!("request failed with status {status}"),
            Error::Transport(message) => message.clone(),
            Error::InvalidRequest(_) | Error::InvalidResponse(_) => fallback.to_string(),
        }
    }
}

#[cfg(test)]
mod user_message_tests {
    use super::Error;

    #[test]
    fn prefers_structured_payload_message() {
        let error = Error::Api {
            status: 400,
            message: Some("Plan already exists for this month".to_string()),
        };

        let got = error.user_message("Failed to create plan");

        assert_eq!("Plan already exists for this month", got);
    }

    #[test]
    fn falls_back_to_status_when_payload_is_opaque() {
        let error = Error::Api {
            status: 502,
            message: None,
        };

        let got = error.user_message("Failed to create plan");

        assert_eq!("request failed with status 502", got);
    }

    #[test]
    fn uses_transport_message_for_network_failures() {
        let error = Error::Transport("connection refused".to_string());

        let got = error.user_message("Failed to create plan");

        assert_eq!("connection refused", got);
    }

    #[test]
    fn uses_hardcoded_description_as_last_resort() {
        let error = Error::InvalidResponse("expected a map".to_string());

        let got = error.user_message("Failed to create plan");

        assert_eq!("Failed to create plan", got);
    }
}
