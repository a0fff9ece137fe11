//! Backend commands queued from UI to backend worker.

use shared::{domain::ReportFile, protocol::GenerateRequest};
use std::path::PathBuf;

pub enum BackendCommand {
    ParseReport {
        file: ReportFile,
    },
    GenerateLabel {
        request: GenerateRequest,
    },
    LegacyUpload {
        file: ReportFile,
    },
    FetchPreview {
        url: String,
    },
    SaveArtifact {
        url: String,
        path: PathBuf,
    },
}

impl BackendCommand {
    pub fn name(&self) -> &'static str {
        match self {
            BackendCommand::ParseReport { .. } => "parse_report",
            BackendCommand::GenerateLabel { .. } => "generate_label",
            BackendCommand::LegacyUpload { .. } => "legacy_upload",
            BackendCommand::FetchPreview { .. } => "fetch_preview",
            BackendCommand::SaveArtifact { .. } => "save_artifact",
        }
    }
}
