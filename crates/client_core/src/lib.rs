use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use shared::{
    domain::{ProbabilityReport, SceneGraph},
    protocol::{PromptRequest, ServiceFault},
};
use tracing::{debug, warn};
use url::Url;

pub mod error;
pub mod session;

pub use error::ClientError;
pub use session::{PromptSession, RequestStatus};

/// Contracts of the three collaborating prediction services.
///
/// The orchestrator only ever talks to this trait; tests substitute scripted
/// implementations, the app wires in [`HttpSceneServices`].
#[async_trait]
pub trait SceneServices: Send + Sync {
    /// Parse a free-text prompt into a scene graph.
    async fn parse_prompt(&self, text: &str) -> Result<SceneGraph, ClientError>;

    /// Derive attribute/relation/co-occurrence probabilities for a scene graph.
    async fn derive_probabilities(
        &self,
        graph: &SceneGraph,
    ) -> Result<ProbabilityReport, ClientError>;

    /// Render an image for a prompt; returns the raw encoded bytes.
    async fn render_image(&self, text: &str) -> Result<Vec<u8>, ClientError>;
}

/// Base URLs of the collaborating services, injected once at startup.
///
/// The scene-graph service also hosts the image endpoint.
#[derive(Debug, Clone)]
pub struct ServiceEndpoints {
    pub scene_graph_url: String,
    pub probability_url: String,
}

impl ServiceEndpoints {
    pub fn validate(&self) -> Result<(), ClientError> {
        for base in [&self.scene_graph_url, &self.probability_url] {
            Url::parse(base).map_err(|source| ClientError::InvalidBaseUrl {
                url: base.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

/// reqwest-backed implementation of [`SceneServices`].
pub struct HttpSceneServices {
    http: Client,
    endpoints: ServiceEndpoints,
}

impl HttpSceneServices {
    pub fn new(endpoints: ServiceEndpoints) -> Self {
        Self {
            http: Client::new(),
            endpoints,
        }
    }

    fn endpoint(base: &str, path: &str) -> String {
        format!("{}/{path}", base.trim_end_matches('/'))
    }

    /// POST a JSON body and map non-2xx statuses to [`ClientError::Service`],
    /// decoding the services' `{"detail": …}` fault body when present.
    async fn post_json(
        &self,
        endpoint: String,
        body: &(impl Serialize + Sync),
    ) -> Result<reqwest::Response, ClientError> {
        let response = self
            .http
            .post(&endpoint)
            .json(body)
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                endpoint: endpoint.clone(),
                source,
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let detail = match response.json::<ServiceFault>().await {
            Ok(fault) => fault.detail,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("unknown service failure")
                .to_string(),
        };
        Err(ClientError::Service {
            endpoint,
            status: status.as_u16(),
            detail,
        })
    }
}

#[async_trait]
impl SceneServices for HttpSceneServices {
    async fn parse_prompt(&self, text: &str) -> Result<SceneGraph, ClientError> {
        let endpoint = Self::endpoint(&self.endpoints.scene_graph_url, "parse-prompt");
        debug!(%endpoint, "parsing prompt");
        let response = self
            .post_json(endpoint.clone(), &PromptRequest::new(text))
            .await?;
        response
            .json::<SceneGraph>()
            .await
            .map_err(|source| ClientError::Transport { endpoint, source })
    }

    async fn derive_probabilities(
        &self,
        graph: &SceneGraph,
    ) -> Result<ProbabilityReport, ClientError> {
        let endpoint = Self::endpoint(&self.endpoints.probability_url, "parse-scene-graph");
        debug!(%endpoint, entities = graph.entities.len(), "deriving probabilities");
        let response = self.post_json(endpoint.clone(), graph).await?;
        response
            .json::<ProbabilityReport>()
            .await
            .map_err(|source| ClientError::Transport { endpoint, source })
    }

    async fn render_image(&self, text: &str) -> Result<Vec<u8>, ClientError> {
        let endpoint = Self::endpoint(&self.endpoints.scene_graph_url, "prompt-to-image");
        debug!(%endpoint, "requesting image");
        let response = self
            .post_json(endpoint.clone(), &PromptRequest::new(text))
            .await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|source| ClientError::Transport { endpoint, source })?;
        Ok(bytes.to_vec())
    }
}

/// Stage of the submission pipeline a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    ParsePrompt,
    DeriveProbabilities,
    RenderImage,
}

impl PipelineStage {
    pub fn label(self) -> &'static str {
        match self {
            PipelineStage::ParsePrompt => "parse-prompt",
            PipelineStage::DeriveProbabilities => "derive-probabilities",
            PipelineStage::RenderImage => "render-image",
        }
    }
}

/// Progress events emitted while a submission runs.
///
/// Every event carries the generation token of the submission that produced
/// it so stale responses from superseded submissions can be discarded.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    SceneGraphParsed {
        generation: u64,
        graph: SceneGraph,
    },
    ProbabilitiesDerived {
        generation: u64,
        report: ProbabilityReport,
    },
    ChainFailed {
        generation: u64,
        stage: PipelineStage,
        message: String,
    },
    ImageRequested {
        generation: u64,
    },
    ImageRendered {
        generation: u64,
        bytes: Vec<u8>,
    },
    ImageFailed {
        generation: u64,
        message: String,
    },
}

impl ClientEvent {
    pub fn generation(&self) -> u64 {
        match self {
            ClientEvent::SceneGraphParsed { generation, .. }
            | ClientEvent::ProbabilitiesDerived { generation, .. }
            | ClientEvent::ChainFailed { generation, .. }
            | ClientEvent::ImageRequested { generation }
            | ClientEvent::ImageRendered { generation, .. }
            | ClientEvent::ImageFailed { generation, .. } => *generation,
        }
    }
}

/// Drive one prompt submission end to end.
///
/// The graph and probability calls are strictly sequential; the image call
/// starts once that chain settles, success or failure. A chain failure halts
/// the chain but never skips the image request. No retries, no cancellation:
/// staleness of superseded submissions is handled downstream via the
/// generation token on each event.
pub async fn run_pipeline<S, F>(services: &S, generation: u64, text: &str, mut emit: F)
where
    S: SceneServices + ?Sized,
    F: FnMut(ClientEvent),
{
    match services.parse_prompt(text).await {
        Ok(graph) => {
            emit(ClientEvent::SceneGraphParsed {
                generation,
                graph: graph.clone(),
            });
            match services.derive_probabilities(&graph).await {
                Ok(report) => emit(ClientEvent::ProbabilitiesDerived { generation, report }),
                Err(err) => {
                    let stage = PipelineStage::DeriveProbabilities;
                    warn!(generation, stage = stage.label(), "chain failed: {err}");
                    emit(ClientEvent::ChainFailed {
                        generation,
                        stage,
                        message: err.to_string(),
                    });
                }
            }
        }
        Err(err) => {
            let stage = PipelineStage::ParsePrompt;
            warn!(generation, stage = stage.label(), "chain failed: {err}");
            emit(ClientEvent::ChainFailed {
                generation,
                stage,
                message: err.to_string(),
            });
        }
    }

    emit(ClientEvent::ImageRequested { generation });
    match services.render_image(text).await {
        Ok(bytes) => emit(ClientEvent::ImageRendered { generation, bytes }),
        Err(err) => {
            warn!(
                generation,
                stage = PipelineStage::RenderImage.label(),
                "image rendering failed: {err}"
            );
            emit(ClientEvent::ImageFailed {
                generation,
                message: err.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests;
