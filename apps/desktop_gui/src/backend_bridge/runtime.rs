//! Runtime bridge between the UI command queue and the prediction services.

use std::{sync::Arc, thread};

use crossbeam_channel::{Receiver, Sender};

use client_core::{run_pipeline, HttpSceneServices, ServiceEndpoints};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiError, UiErrorContext, UiEvent};

/// Spawn the backend worker thread.
///
/// The worker owns a tokio runtime and the HTTP client; each submission runs
/// in its own task so an image call still in flight never delays the next
/// prompt.
pub fn launch(cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>, endpoints: ServiceEndpoints) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    format!("backend worker startup failure: failed to build runtime: {err}"),
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            if let Err(err) = endpoints.validate() {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    format!("backend worker startup failure: {err}"),
                )));
                tracing::error!("invalid service endpoints: {err}");
                return;
            }

            let services = Arc::new(HttpSceneServices::new(endpoints));
            let _ = ui_tx.try_send(UiEvent::Info("Backend worker ready".to_string()));

            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    BackendCommand::ProcessPrompt { generation, text } => {
                        tracing::info!(generation, text_len = text.len(), "backend: process_prompt");
                        let services = services.clone();
                        let ui_tx = ui_tx.clone();
                        tokio::spawn(async move {
                            run_pipeline(services.as_ref(), generation, &text, |event| {
                                let _ = ui_tx.try_send(UiEvent::Pipeline(event));
                            })
                            .await;
                        });
                    }
                }
            }
        });
    });
}
