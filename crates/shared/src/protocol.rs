use serde::{Deserialize, Serialize};

/// Body for the prompt-driven endpoints (`/parse-prompt`, `/prompt-to-image`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptRequest {
    pub text: String,
}

impl PromptRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Error body the prediction services return with non-2xx statuses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceFault {
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_request_serializes_to_text_field() {
        let body = serde_json::to_value(PromptRequest::new("a red cat")).expect("serialize");
        assert_eq!(body, serde_json::json!({"text": "a red cat"}));
    }

    #[test]
    fn service_fault_reads_detail_field() {
        let fault: ServiceFault =
            serde_json::from_value(serde_json::json!({"detail": "parser exploded"}))
                .expect("deserialize");
        assert_eq!(fault.detail, "parser exploded");
    }
}
