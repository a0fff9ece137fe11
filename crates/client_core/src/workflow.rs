//! Upload → edit → generate workflow as a pure state machine.
//!
//! `Workflow` never performs I/O. Every transition takes an [`Event`] and
//! returns the [`Intent`]s the rendering layer must carry out: screens to show,
//! requests to issue, previews to refresh. Request outcomes come back in as
//! `*Settled` events.

use shared::{
    domain::{
        DraftField, LabelArtifact, LabelDraft, LabelPreview, Mode, ReportFile, ScreenState,
        UploadInput,
    },
    error::{RemoteError, ValidationError, WorkflowError},
    protocol::{GenerateRequest, GeneratedLabel, LegacyUploadResponse, ParsedReport},
};
use tracing::{debug, warn};

/// Which server endpoints the upload path talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EndpointFlow {
    /// `/parse` then `/generate`, with an editable draft in between.
    #[default]
    Split,
    /// Single `/upload` call that returns the finished label.
    LegacyUpload,
}

/// What dismissing a remote error does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorRecovery {
    #[default]
    PreserveInput,
    ResetToStart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowOptions {
    pub manual_mode: bool,
    pub flow: EndpointFlow,
    pub error_recovery: ErrorRecovery,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self {
            manual_mode: true,
            flow: EndpointFlow::Split,
            error_recovery: ErrorRecovery::PreserveInput,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingRequest {
    Parse,
    Generate,
    LegacyUpload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    SelectMode(Mode),
    ChooseFile(ReportFile),
    DragHover(bool),
    SetUploadImei(String),
    SubmitUpload,
    SetManualField(DraftField, String),
    SubmitManual,
    EditDraft(DraftField, String),
    SubmitGenerate,
    ParseSettled(Result<ParsedReport, RemoteError>),
    GenerateSettled(Result<GeneratedLabel, RemoteError>),
    LegacyUploadSettled(Result<LegacyUploadResponse, RemoteError>),
    DismissError,
    Back,
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Render(ScreenState),
    ShowLoading,
    HideLoading,
    ShowError(WorkflowError),
    HideError,
    UpdateFileLabel(String),
    SetDropHighlight(bool),
    RefreshPreview(LabelPreview),
    IssueParse(ReportFile),
    IssueGenerate(GenerateRequest),
    IssueLegacyUpload(ReportFile),
    ShowResult(LabelArtifact),
}

impl Intent {
    /// True for intents that require a network round trip.
    pub fn is_request(&self) -> bool {
        matches!(
            self,
            Intent::IssueParse(_) | Intent::IssueGenerate(_) | Intent::IssueLegacyUpload(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workflow {
    options: WorkflowOptions,
    /// Screen beneath the error overlay. Never `ErrorOverlay` itself.
    screen: ScreenState,
    upload: UploadInput,
    manual: LabelDraft,
    draft: LabelDraft,
    draft_origin: Option<Mode>,
    pending: Option<PendingRequest>,
    error: Option<WorkflowError>,
    artifact: Option<LabelArtifact>,
    drop_highlight: bool,
}

impl Default for Workflow {
    fn default() -> Self {
        Self::new(WorkflowOptions::default())
    }
}

impl Workflow {
    pub fn new(options: WorkflowOptions) -> Self {
        let screen = Self::initial_screen_for(options);
        Self {
            options,
            screen,
            upload: UploadInput::new(Mode::Auto),
            manual: LabelDraft::default(),
            draft: LabelDraft::default(),
            draft_origin: None,
            pending: None,
            error: None,
            artifact: None,
            drop_highlight: false,
        }
    }

    fn initial_screen_for(options: WorkflowOptions) -> ScreenState {
        if options.manual_mode {
            ScreenState::ModeSelect
        } else {
            ScreenState::Upload
        }
    }

    pub fn options(&self) -> WorkflowOptions {
        self.options
    }

    pub fn initial_screen(&self) -> ScreenState {
        Self::initial_screen_for(self.options)
    }

    /// The visible screen: the error overlay while an error is shown.
    pub fn screen(&self) -> ScreenState {
        if self.error.is_some() {
            ScreenState::ErrorOverlay
        } else {
            self.screen
        }
    }

    pub fn underlying_screen(&self) -> ScreenState {
        self.screen
    }

    pub fn upload(&self) -> &UploadInput {
        &self.upload
    }

    pub fn manual_fields(&self) -> &LabelDraft {
        &self.manual
    }

    pub fn draft(&self) -> &LabelDraft {
        &self.draft
    }

    pub fn preview(&self) -> LabelPreview {
        self.draft.preview()
    }

    pub fn pending(&self) -> Option<PendingRequest> {
        self.pending
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn error(&self) -> Option<&WorkflowError> {
        self.error.as_ref()
    }

    pub fn artifact(&self) -> Option<&LabelArtifact> {
        self.artifact.as_ref()
    }

    pub fn drop_highlight(&self) -> bool {
        self.drop_highlight
    }

    /// How the current draft was produced, if one exists.
    pub fn draft_origin(&self) -> Option<Mode> {
        self.draft_origin
    }

    pub fn file_label(&self) -> Option<String> {
        self.upload.file.as_ref().map(ReportFile::display_label)
    }

    pub fn handle(&mut self, event: Event) -> Vec<Intent> {
        match event {
            Event::SelectMode(mode) => self.select_mode(mode),
            Event::ChooseFile(file) => self.choose_file(file),
            Event::DragHover(active) => self.drag_hover(active),
            Event::SetUploadImei(value) => self.set_upload_imei(value),
            Event::SubmitUpload => self.submit_upload(),
            Event::SetManualField(field, value) => self.set_manual_field(field, value),
            Event::SubmitManual => self.submit_manual(),
            Event::EditDraft(field, value) => self.on_draft_field_changed(field, value),
            Event::SubmitGenerate => self.submit_generate(),
            Event::ParseSettled(result) => self.parse_settled(result),
            Event::GenerateSettled(result) => self.generate_settled(result),
            Event::LegacyUploadSettled(result) => self.legacy_upload_settled(result),
            Event::DismissError => self.dismiss_error(),
            Event::Back => self.back(),
            Event::Reset => self.reset(),
        }
    }

    pub fn select_mode(&mut self, mode: Mode) -> Vec<Intent> {
        if self.screen != ScreenState::ModeSelect || self.pending.is_some() {
            debug!(?mode, screen = ?self.screen, "ignoring mode selection");
            return Vec::new();
        }
        let next = match mode {
            Mode::Auto => ScreenState::Upload,
            Mode::Manual if self.options.manual_mode => ScreenState::ManualEntry,
            Mode::Manual => {
                debug!("manual mode is disabled");
                return Vec::new();
            }
        };
        self.upload.mode = mode;
        self.go_to(next)
    }

    pub fn choose_file(&mut self, file: ReportFile) -> Vec<Intent> {
        if self.screen != ScreenState::Upload || self.pending.is_some() {
            debug!(file = %file.name, screen = ?self.screen, "ignoring file selection");
            return Vec::new();
        }
        let mut intents = Vec::new();
        if self.drop_highlight {
            self.drop_highlight = false;
            intents.push(Intent::SetDropHighlight(false));
        }
        intents.push(Intent::UpdateFileLabel(file.display_label()));
        self.upload.file = Some(file);
        intents
    }

    pub fn drag_hover(&mut self, active: bool) -> Vec<Intent> {
        let active = active && self.screen == ScreenState::Upload && self.pending.is_none();
        if self.drop_highlight == active {
            return Vec::new();
        }
        self.drop_highlight = active;
        vec![Intent::SetDropHighlight(active)]
    }

    pub fn set_upload_imei(&mut self, value: String) -> Vec<Intent> {
        if self.screen == ScreenState::Upload && self.pending.is_none() {
            self.upload.imei = value;
        }
        Vec::new()
    }

    pub fn submit_upload(&mut self) -> Vec<Intent> {
        if self.screen != ScreenState::Upload || self.pending.is_some() {
            debug!(screen = ?self.screen, pending = ?self.pending, "ignoring upload submission");
            return Vec::new();
        }
        if self.options.flow == EndpointFlow::LegacyUpload {
            return self.submit_legacy_upload();
        }

        let Some(file) = self.upload.file.clone() else {
            return self.fail(ValidationError::MissingFile.into());
        };
        if self.upload.imei.trim().is_empty() {
            return self.fail(ValidationError::BlankImei.into());
        }

        self.begin(PendingRequest::Parse, Intent::IssueParse(file))
    }

    /// Fused upload of the earliest server: the file alone, straight to a label.
    pub fn submit_legacy_upload(&mut self) -> Vec<Intent> {
        if self.screen != ScreenState::Upload || self.pending.is_some() {
            return Vec::new();
        }
        let Some(file) = self.upload.file.clone() else {
            return self.fail(ValidationError::MissingFile.into());
        };
        self.begin(PendingRequest::LegacyUpload, Intent::IssueLegacyUpload(file))
    }

    pub fn set_manual_field(&mut self, field: DraftField, value: String) -> Vec<Intent> {
        if self.screen == ScreenState::ManualEntry {
            self.manual.set(field, value);
        }
        Vec::new()
    }

    pub fn submit_manual(&mut self) -> Vec<Intent> {
        if self.screen != ScreenState::ManualEntry || self.pending.is_some() {
            debug!(screen = ?self.screen, "ignoring manual submission");
            return Vec::new();
        }
        if self.manual.imei.trim().is_empty() {
            return self.fail(ValidationError::BlankImei.into());
        }
        if self.manual.battery_life.trim().is_empty() {
            return self.fail(ValidationError::BlankBatteryLife.into());
        }

        self.draft = self.manual.clone();
        self.draft_origin = Some(Mode::Manual);
        let mut intents = self.go_to(ScreenState::EditPreview);
        intents.push(Intent::RefreshPreview(self.draft.preview()));
        intents
    }

    /// Applies one edit and returns the recomputed preview in the same call.
    pub fn on_draft_field_changed(&mut self, field: DraftField, value: String) -> Vec<Intent> {
        if self.screen != ScreenState::EditPreview || self.pending.is_some() {
            debug!(?field, screen = ?self.screen, "ignoring draft edit");
            return Vec::new();
        }
        self.draft.set(field, value);
        vec![Intent::RefreshPreview(self.draft.preview())]
    }

    pub fn submit_generate(&mut self) -> Vec<Intent> {
        if self.screen != ScreenState::EditPreview || self.pending.is_some() {
            debug!(screen = ?self.screen, pending = ?self.pending, "ignoring generate submission");
            return Vec::new();
        }
        let request = GenerateRequest::from(&self.draft);
        self.begin(PendingRequest::Generate, Intent::IssueGenerate(request))
    }

    pub fn parse_settled(&mut self, result: Result<ParsedReport, RemoteError>) -> Vec<Intent> {
        if !self.settle(PendingRequest::Parse) {
            return Vec::new();
        }
        match result {
            Ok(report) => {
                self.draft = report.into_draft(self.upload.imei.clone());
                self.draft_origin = Some(Mode::Auto);
                let mut intents = vec![Intent::HideLoading];
                intents.extend(self.go_to(ScreenState::EditPreview));
                intents.push(Intent::RefreshPreview(self.draft.preview()));
                intents
            }
            Err(err) => self.fail_remote(err),
        }
    }

    pub fn generate_settled(&mut self, result: Result<GeneratedLabel, RemoteError>) -> Vec<Intent> {
        if !self.settle(PendingRequest::Generate) {
            return Vec::new();
        }
        match result {
            Ok(label) => self.finish(LabelArtifact::single(label.image_url)),
            Err(err) => self.fail_remote(err),
        }
    }

    pub fn legacy_upload_settled(
        &mut self,
        result: Result<LegacyUploadResponse, RemoteError>,
    ) -> Vec<Intent> {
        if !self.settle(PendingRequest::LegacyUpload) {
            return Vec::new();
        }
        match result {
            Ok(response) => self.finish(LabelArtifact {
                preview_url: response.preview_url,
                download_url: response.pdf_url,
            }),
            Err(err) => self.fail_remote(err),
        }
    }

    pub fn dismiss_error(&mut self) -> Vec<Intent> {
        let Some(error) = self.error.take() else {
            return Vec::new();
        };
        if !error.is_local() && self.options.error_recovery == ErrorRecovery::ResetToStart {
            return self.reset();
        }
        vec![Intent::HideError, Intent::Render(self.screen)]
    }

    pub fn back(&mut self) -> Vec<Intent> {
        if self.pending.is_some() {
            return Vec::new();
        }
        let target = match self.screen {
            ScreenState::Upload | ScreenState::ManualEntry if self.options.manual_mode => {
                ScreenState::ModeSelect
            }
            ScreenState::EditPreview => match self.draft_origin {
                Some(Mode::Manual) => ScreenState::ManualEntry,
                _ => ScreenState::Upload,
            },
            ScreenState::Result if self.draft_origin.is_some() => ScreenState::EditPreview,
            _ => return Vec::new(),
        };
        self.go_to(target)
    }

    pub fn reset(&mut self) -> Vec<Intent> {
        let was_loading = self.pending.is_some();
        *self = Self::new(self.options);

        let mut intents = Vec::new();
        if was_loading {
            intents.push(Intent::HideLoading);
        }
        intents.extend([
            Intent::HideError,
            Intent::SetDropHighlight(false),
            Intent::UpdateFileLabel(String::new()),
            Intent::RefreshPreview(self.draft.preview()),
            Intent::Render(self.screen),
        ]);
        intents
    }

    fn go_to(&mut self, next: ScreenState) -> Vec<Intent> {
        let mut intents = Vec::new();
        if self.error.take().is_some() {
            intents.push(Intent::HideError);
        }
        self.screen = next;
        self.drop_highlight = false;
        intents.push(Intent::Render(next));
        intents
    }

    fn begin(&mut self, request: PendingRequest, issue: Intent) -> Vec<Intent> {
        let mut intents = Vec::new();
        if self.error.take().is_some() {
            intents.push(Intent::HideError);
        }
        self.pending = Some(request);
        intents.push(Intent::ShowLoading);
        intents.push(issue);
        intents
    }

    fn settle(&mut self, expected: PendingRequest) -> bool {
        if self.pending != Some(expected) {
            warn!(?expected, pending = ?self.pending, "dropping response with no matching request");
            return false;
        }
        self.pending = None;
        true
    }

    fn finish(&mut self, artifact: LabelArtifact) -> Vec<Intent> {
        self.artifact = Some(artifact.clone());
        let mut intents = vec![Intent::HideLoading, Intent::ShowResult(artifact)];
        intents.extend(self.go_to(ScreenState::Result));
        intents
    }

    fn fail_remote(&mut self, err: RemoteError) -> Vec<Intent> {
        warn!(error = %err, screen = ?self.screen, "label server request failed");
        let mut intents = vec![Intent::HideLoading];
        intents.extend(self.fail(err.into()));
        intents
    }

    fn fail(&mut self, err: WorkflowError) -> Vec<Intent> {
        self.error = Some(err.clone());
        vec![Intent::ShowError(err), Intent::Render(ScreenState::ErrorOverlay)]
    }
}

#[cfg(test)]
#[path = "tests/workflow_tests.rs"]
mod tests;
