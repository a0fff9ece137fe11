//! Command orchestration from workflow intents to the backend command queue.

use client_core::{Event, Intent};
use crossbeam_channel::{Sender, TrySendError};
use shared::error::RemoteError;

use crate::backend_bridge::commands::BackendCommand;

/// Maps a request intent to the backend command that fulfils it.
pub fn command_for_intent(intent: &Intent) -> Option<BackendCommand> {
    match intent {
        Intent::IssueParse(file) => Some(BackendCommand::ParseReport { file: file.clone() }),
        Intent::IssueGenerate(request) => Some(BackendCommand::GenerateLabel {
            request: request.clone(),
        }),
        Intent::IssueLegacyUpload(file) => {
            Some(BackendCommand::LegacyUpload { file: file.clone() })
        }
        _ => None,
    }
}

/// The event that settles `intent` when its command never reached the backend.
pub fn undelivered_settlement(intent: &Intent, reason: &str) -> Option<Event> {
    let err = RemoteError::Transport(reason.to_string());
    match intent {
        Intent::IssueParse(_) => Some(Event::ParseSettled(Err(err))),
        Intent::IssueGenerate(_) => Some(Event::GenerateSettled(Err(err))),
        Intent::IssueLegacyUpload(_) => Some(Event::LegacyUploadSettled(Err(err))),
        _ => None,
    }
}

pub fn dispatch_backend_command(
    cmd_tx: &Sender<BackendCommand>,
    cmd: BackendCommand,
    status: &mut String,
) -> Result<(), String> {
    let cmd_name = cmd.name();
    match cmd_tx.try_send(cmd) {
        Ok(()) => {
            tracing::debug!(command = cmd_name, "queued ui->backend command");
            Ok(())
        }
        Err(TrySendError::Full(_)) => {
            *status = "UI command queue is full; please retry".to_string();
            Err(status.clone())
        }
        Err(TrySendError::Disconnected(_)) => {
            *status =
                "Backend command processor disconnected (possible startup/runtime failure); restart the app"
                    .to_string();
            Err(status.clone())
        }
    }
}
