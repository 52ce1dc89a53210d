use thiserror::Error;

/// Failures surfaced by the prediction-service client.
///
/// Every variant collapses to a user-facing string at the UI boundary; the
/// split keeps transport and service faults distinguishable in logs and
/// tests.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} returned {status}: {detail}")]
    Service {
        endpoint: String,
        status: u16,
        detail: String,
    },
    #[error("invalid service base url '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}
