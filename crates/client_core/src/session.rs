use shared::domain::{ProbabilityReport, SceneGraph};
use tracing::debug;

use crate::ClientEvent;

/// Progress of one request pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RequestStatus {
    #[default]
    Idle,
    Loading,
    Succeeded,
    Failed(String),
}

impl RequestStatus {
    pub fn is_loading(&self) -> bool {
        matches!(self, RequestStatus::Loading)
    }
}

/// The orchestrator's single state container.
///
/// Owns the prompt text, the two pipeline statuses, the shared error field,
/// and the result payloads. The GUI renders this struct and folds every
/// backend [`ClientEvent`] back in through [`PromptSession::apply`]; events
/// carrying a superseded generation token are discarded there, so a late
/// response can never overwrite a newer submission's state.
#[derive(Debug, Default)]
pub struct PromptSession {
    generation: u64,
    pub prompt: String,
    pub chain: RequestStatus,
    pub image: RequestStatus,
    pub error: Option<String>,
    pub scene_graph: Option<SceneGraph>,
    pub probabilities: Option<ProbabilityReport>,
    pub image_bytes: Option<Vec<u8>>,
}

impl PromptSession {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Start a new submission cycle.
    ///
    /// Whitespace-only prompts are a no-op and leave every field untouched.
    /// Otherwise previous results are replaced wholesale, the error is
    /// cleared, and the returned generation token must be attached to the
    /// outgoing request.
    pub fn begin_submission(&mut self) -> Option<u64> {
        if self.prompt.trim().is_empty() {
            return None;
        }
        self.generation += 1;
        self.chain = RequestStatus::Loading;
        self.image = RequestStatus::Idle;
        self.error = None;
        self.scene_graph = None;
        self.probabilities = None;
        self.image_bytes = None;
        Some(self.generation)
    }

    /// Fold a backend event into the session.
    pub fn apply(&mut self, event: ClientEvent) {
        if event.generation() != self.generation {
            debug!(
                event_generation = event.generation(),
                current_generation = self.generation,
                "discarding stale pipeline event"
            );
            return;
        }

        match event {
            ClientEvent::SceneGraphParsed { graph, .. } => {
                self.scene_graph = Some(graph);
            }
            ClientEvent::ProbabilitiesDerived { report, .. } => {
                self.probabilities = Some(report);
                self.chain = RequestStatus::Succeeded;
            }
            ClientEvent::ChainFailed { message, .. } => {
                self.error = Some(message.clone());
                self.chain = RequestStatus::Failed(message);
            }
            ClientEvent::ImageRequested { .. } => {
                self.image = RequestStatus::Loading;
            }
            ClientEvent::ImageRendered { bytes, .. } => {
                self.image_bytes = Some(bytes);
                self.image = RequestStatus::Succeeded;
            }
            ClientEvent::ImageFailed { message, .. } => {
                // Shares the single error field with the chain, so a late
                // image failure can overwrite an earlier chain error.
                self.error = Some(message.clone());
                self.image = RequestStatus::Failed(message);
            }
        }
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn is_busy(&self) -> bool {
        self.chain.is_loading() || self.image.is_loading()
    }

    pub fn has_results(&self) -> bool {
        self.scene_graph.is_some() || self.probabilities.is_some() || self.image_bytes.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PipelineStage;

    fn sample_graph() -> SceneGraph {
        serde_json::from_value(serde_json::json!({
            "entities": {
                "e1": {"id": "e1", "name": "cat", "category": "animal", "attributes": ["red"]}
            },
            "relationships": []
        }))
        .expect("graph")
    }

    fn session_with_prompt(text: &str) -> PromptSession {
        let mut session = PromptSession::default();
        session.prompt = text.to_string();
        session
    }

    #[test]
    fn whitespace_prompt_submission_is_a_noop() {
        let mut session = session_with_prompt("   \n\t");
        assert_eq!(session.begin_submission(), None);
        assert_eq!(session.chain, RequestStatus::Idle);
        assert_eq!(session.image, RequestStatus::Idle);
        assert!(session.error.is_none());
        assert!(!session.has_results());
    }

    #[test]
    fn successful_chain_populates_graph_and_report_then_image() {
        let mut session = session_with_prompt("a red cat sitting on a mat");
        let generation = session.begin_submission().expect("token");
        assert!(session.chain.is_loading());

        session.apply(ClientEvent::SceneGraphParsed {
            generation,
            graph: sample_graph(),
        });
        session.apply(ClientEvent::ProbabilitiesDerived {
            generation,
            report: ProbabilityReport::default(),
        });

        assert_eq!(session.chain, RequestStatus::Succeeded);
        assert!(session.error.is_none());
        assert!(session.scene_graph.is_some());
        assert!(session.probabilities.is_some());

        session.apply(ClientEvent::ImageRequested { generation });
        assert!(session.image.is_loading());
        session.apply(ClientEvent::ImageRendered {
            generation,
            bytes: vec![1, 2, 3],
        });
        assert_eq!(session.image, RequestStatus::Succeeded);
        assert_eq!(session.image_bytes.as_deref(), Some(&[1, 2, 3][..]));
    }

    #[test]
    fn parse_failure_sets_error_and_leaves_report_empty() {
        let mut session = session_with_prompt("a red cat");
        let generation = session.begin_submission().expect("token");

        session.apply(ClientEvent::ChainFailed {
            generation,
            stage: PipelineStage::ParsePrompt,
            message: "parser unreachable".to_string(),
        });

        assert_eq!(session.error.as_deref(), Some("parser unreachable"));
        assert_eq!(
            session.chain,
            RequestStatus::Failed("parser unreachable".to_string())
        );
        assert!(session.scene_graph.is_none());
        assert!(session.probabilities.is_none());

        // Image is still attempted after a failed chain.
        session.apply(ClientEvent::ImageRequested { generation });
        assert!(session.image.is_loading());
    }

    #[test]
    fn probability_failure_keeps_the_parsed_graph_visible() {
        let mut session = session_with_prompt("a red cat");
        let generation = session.begin_submission().expect("token");

        session.apply(ClientEvent::SceneGraphParsed {
            generation,
            graph: sample_graph(),
        });
        session.apply(ClientEvent::ChainFailed {
            generation,
            stage: PipelineStage::DeriveProbabilities,
            message: "model offline".to_string(),
        });

        assert!(session.scene_graph.is_some());
        assert!(session.probabilities.is_none());
        assert_eq!(session.error.as_deref(), Some("model offline"));
    }

    #[test]
    fn image_failure_overwrites_chain_error() {
        let mut session = session_with_prompt("a red cat");
        let generation = session.begin_submission().expect("token");

        session.apply(ClientEvent::ChainFailed {
            generation,
            stage: PipelineStage::ParsePrompt,
            message: "parser unreachable".to_string(),
        });
        session.apply(ClientEvent::ImageRequested { generation });
        session.apply(ClientEvent::ImageFailed {
            generation,
            message: "renderer offline".to_string(),
        });

        // Both pipelines write the single shared error field; the later
        // image failure wins.
        assert_eq!(session.error.as_deref(), Some("renderer offline"));
        assert_eq!(
            session.chain,
            RequestStatus::Failed("parser unreachable".to_string())
        );
    }

    #[test]
    fn stale_events_from_a_superseded_submission_are_discarded() {
        let mut session = session_with_prompt("first prompt");
        let first = session.begin_submission().expect("token");

        session.prompt = "second prompt".to_string();
        let second = session.begin_submission().expect("token");
        assert!(second > first);

        // The first submission's image resolves late.
        session.apply(ClientEvent::ImageRendered {
            generation: first,
            bytes: vec![9, 9, 9],
        });
        assert!(session.image_bytes.is_none());
        assert_eq!(session.image, RequestStatus::Idle);

        // The prompt text is untouched by stale traffic.
        assert_eq!(session.prompt, "second prompt");

        session.apply(ClientEvent::SceneGraphParsed {
            generation: second,
            graph: sample_graph(),
        });
        assert!(session.scene_graph.is_some());
    }

    #[test]
    fn new_submission_replaces_previous_results_wholesale() {
        let mut session = session_with_prompt("a red cat");
        let generation = session.begin_submission().expect("token");
        session.apply(ClientEvent::SceneGraphParsed {
            generation,
            graph: sample_graph(),
        });
        session.apply(ClientEvent::ImageRequested { generation });
        session.apply(ClientEvent::ImageFailed {
            generation,
            message: "renderer offline".to_string(),
        });

        session.begin_submission().expect("token");
        assert!(session.scene_graph.is_none());
        assert!(session.probabilities.is_none());
        assert!(session.image_bytes.is_none());
        assert!(session.error.is_none());
        assert!(session.chain.is_loading());
        assert_eq!(session.image, RequestStatus::Idle);
    }
}
