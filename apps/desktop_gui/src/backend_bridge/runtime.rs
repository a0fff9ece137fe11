//! Runtime bridge between UI command queue and backend event intake.

use std::thread;

use client_core::{LabelClient, LabelService};
use crossbeam_channel::{Receiver, Sender};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiError, UiErrorContext, UiEvent};

pub fn launch(server_url: String, cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>) {
    thread::spawn(move || {
        let _ = ui_tx.try_send(UiEvent::Info("Backend worker starting...".to_string()));
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

        let client = match LabelClient::new(&server_url) {
            Ok(client) => client,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    format!("backend worker startup failure: {err}"),
                )));
                tracing::error!(%server_url, "failed to configure label client: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let _ = ui_tx.try_send(UiEvent::Info(format!(
                "Label server: {}",
                client.base_url()
            )));
            while let Ok(cmd) = cmd_rx.recv() {
                tracing::debug!(command = cmd.name(), "backend command received");
                let event = run_command(&client, cmd).await;
                if ui_tx.send(event).is_err() {
                    tracing::debug!("ui event channel closed; stopping backend worker");
                    break;
                }
            }
        });
    });
}

pub async fn run_command<S: LabelService>(service: &S, cmd: BackendCommand) -> UiEvent {
    match cmd {
        BackendCommand::ParseReport { file } => {
            UiEvent::ParseSettled(service.parse_report(&file).await)
        }
        BackendCommand::GenerateLabel { request } => {
            UiEvent::GenerateSettled(service.generate_label(&request).await)
        }
        BackendCommand::LegacyUpload { file } => {
            UiEvent::LegacyUploadSettled(service.upload_report(&file).await)
        }
        BackendCommand::FetchPreview { url } => match service.fetch_artifact(&url).await {
            Ok(bytes) => UiEvent::PreviewLoaded { url, bytes },
            Err(err) => UiEvent::Error(UiError::from_message(
                UiErrorContext::Preview,
                format!("could not load label preview: {err}"),
            )),
        },
        BackendCommand::SaveArtifact { url, path } => {
            let bytes = match service.fetch_artifact(&url).await {
                Ok(bytes) => bytes,
                Err(err) => {
                    return UiEvent::Error(UiError::from_message(
                        UiErrorContext::Download,
                        format!("could not download label: {err}"),
                    ))
                }
            };
            match tokio::fs::write(&path, &bytes).await {
                Ok(()) => UiEvent::ArtifactSaved { path },
                Err(err) => UiEvent::Error(UiError::from_message(
                    UiErrorContext::Download,
                    format!("could not write '{}': {err}", path.display()),
                )),
            }
        }
    }
}
