use std::{collections::VecDeque, fs, path::Path, time::Duration};

use client_core::{
    parse_base_url, resolve_artifact_url, EndpointFlow, Event, Intent, Workflow, WorkflowOptions,
};
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use egui::TextureHandle;
use url::Url;
use shared::domain::{
    DraftField, LabelArtifact, LabelDraft, LabelPreview, Mode, ReportFile, ScreenState,
};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiError, UiErrorCategory, UiErrorContext, UiEvent};
use crate::controller::orchestration::{
    command_for_intent, dispatch_backend_command, undelivered_settlement,
};

const MAX_PREVIEW_SIZE: egui::Vec2 = egui::vec2(560.0, 380.0);
const FIELD_WIDTH: f32 = 260.0;

#[derive(Debug, Clone)]
pub struct StartupConfig {
    pub server_url: String,
    pub options: WorkflowOptions,
}

struct ResultImage {
    url: String,
    texture: TextureHandle,
}

pub struct LabelApp {
    workflow: Workflow,
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    server_url: String,
    base_url: Option<Url>,
    status: String,
    screen: ScreenState,
    loading: bool,
    banner: Option<UiError>,
    backend_error: Option<UiError>,
    file_label: String,
    drop_highlight: bool,
    preview: LabelPreview,
    result: Option<LabelArtifact>,
    result_image: Option<ResultImage>,
    preview_unavailable: bool,
    undecoded_preview: Option<(String, Vec<u8>)>,
}

impl LabelApp {
    pub fn new(
        config: StartupConfig,
        cmd_tx: Sender<BackendCommand>,
        ui_rx: Receiver<UiEvent>,
    ) -> Self {
        let workflow = Workflow::new(config.options);
        let base_url = match parse_base_url(&config.server_url) {
            Ok(url) => Some(url),
            Err(err) => {
                tracing::warn!("label links disabled: {err}");
                None
            }
        };
        Self {
            base_url,
            screen: workflow.screen(),
            preview: workflow.preview(),
            workflow,
            cmd_tx,
            ui_rx,
            server_url: config.server_url,
            status: String::new(),
            loading: false,
            banner: None,
            backend_error: None,
            file_label: String::new(),
            drop_highlight: false,
            result: None,
            result_image: None,
            preview_unavailable: false,
            undecoded_preview: None,
        }
    }

    fn apply(&mut self, event: Event) {
        let mut events = VecDeque::from([event]);
        while let Some(event) = events.pop_front() {
            let intents = self.workflow.handle(event);
            events.extend(self.apply_intents(intents));
        }
    }

    /// Executes presentation intents and forwards request intents to the
    /// backend. Returns settlements for requests that never left the UI.
    fn apply_intents(&mut self, intents: Vec<Intent>) -> Vec<Event> {
        let mut follow_up = Vec::new();
        for intent in intents {
            match &intent {
                Intent::Render(ScreenState::ErrorOverlay) => {}
                Intent::Render(screen) => self.screen = *screen,
                Intent::ShowLoading => self.loading = true,
                Intent::HideLoading => self.loading = false,
                Intent::ShowError(err) => {
                    self.status = err.to_string();
                    self.banner = Some(UiError::from_workflow(err));
                }
                Intent::HideError => self.banner = None,
                Intent::UpdateFileLabel(label) => self.file_label = label.clone(),
                Intent::SetDropHighlight(active) => self.drop_highlight = *active,
                Intent::RefreshPreview(preview) => self.preview = preview.clone(),
                Intent::ShowResult(artifact) => {
                    self.status = "Label generated".to_string();
                    self.result = Some(artifact.clone());
                    self.result_image = None;
                    self.preview_unavailable = false;
                    self.queue(
                        BackendCommand::FetchPreview {
                            url: artifact.preview_url.clone(),
                        },
                        UiErrorContext::Preview,
                    );
                }
                Intent::IssueParse(_) | Intent::IssueGenerate(_) | Intent::IssueLegacyUpload(_) => {
                    let Some(cmd) = command_for_intent(&intent) else {
                        continue;
                    };
                    if let Err(reason) =
                        dispatch_backend_command(&self.cmd_tx, cmd, &mut self.status)
                    {
                        follow_up.extend(undelivered_settlement(&intent, &reason));
                    }
                }
            }
        }
        follow_up
    }

    /// Queues a command whose failure only needs reporting, not settling.
    fn queue(&mut self, cmd: BackendCommand, context: UiErrorContext) {
        if let Err(reason) = dispatch_backend_command(&self.cmd_tx, cmd, &mut self.status) {
            self.report_backend_error(UiError::from_message(context, reason));
        }
    }

    fn report_backend_error(&mut self, err: UiError) {
        tracing::warn!(context = ?err.context(), "{}", err.message());
        if err.context() == UiErrorContext::Preview {
            self.preview_unavailable = true;
        }
        self.status = err.message().to_string();
        self.backend_error = Some(err);
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            self.handle_ui_event(event);
        }
    }

    fn handle_ui_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::Info(message) => self.status = message,
            UiEvent::Error(err) => self.report_backend_error(err),
            UiEvent::ParseSettled(result) => self.apply(Event::ParseSettled(result)),
            UiEvent::GenerateSettled(result) => self.apply(Event::GenerateSettled(result)),
            UiEvent::LegacyUploadSettled(result) => {
                self.apply(Event::LegacyUploadSettled(result))
            }
            UiEvent::PreviewLoaded { url, bytes } => {
                let current = self
                    .result
                    .as_ref()
                    .is_some_and(|artifact| artifact.preview_url == url);
                if current {
                    self.undecoded_preview = Some((url, bytes));
                }
            }
            UiEvent::ArtifactSaved { path } => {
                self.status = format!("Saved label to {}", path.display());
            }
        }
    }

    fn decode_pending_preview(&mut self, ctx: &egui::Context) {
        let Some((url, bytes)) = self.undecoded_preview.take() else {
            return;
        };
        match image::load_from_memory(&bytes) {
            Ok(decoded) => {
                let rgba = decoded.to_rgba8();
                let size = [rgba.width() as usize, rgba.height() as usize];
                let color_image = egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw());
                let texture =
                    ctx.load_texture("label-preview", color_image, egui::TextureOptions::LINEAR);
                self.result_image = Some(ResultImage { url, texture });
            }
            Err(err) => self.report_backend_error(UiError::from_message(
                UiErrorContext::Preview,
                format!("label preview is not a displayable image: {err}"),
            )),
        }
    }

    fn handle_file_drops(&mut self, ctx: &egui::Context) {
        let (hovering, dropped) = ctx.input(|input| {
            (
                !input.raw.hovered_files.is_empty(),
                input.raw.dropped_files.clone(),
            )
        });
        if hovering != self.drop_highlight {
            self.apply(Event::DragHover(hovering));
        }
        if let Some(file) = dropped.first() {
            match report_from_drop(file) {
                Ok(report) => self.apply(Event::ChooseFile(report)),
                Err(err) => self.status = err,
            }
        }
    }

    fn pick_report(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .set_title("Select device report")
            .pick_file()
        else {
            return;
        };
        match read_report_file(&path) {
            Ok(report) => self.apply(Event::ChooseFile(report)),
            Err(err) => self.status = err,
        }
    }

    fn save_label(&mut self) {
        let Some(artifact) = self.result.clone() else {
            return;
        };
        let file_name = self
            .artifact_url(&artifact.download_url)
            .and_then(|url| suggested_file_name(&url))
            .unwrap_or_else(|| "label.png".to_string());
        if let Some(path) = rfd::FileDialog::new()
            .set_file_name(file_name)
            .save_file()
        {
            self.status = format!("Downloading label to {}", path.display());
            self.queue(
                BackendCommand::SaveArtifact {
                    url: artifact.download_url,
                    path,
                },
                UiErrorContext::Download,
            );
        }
    }

    /// The same absolute URL the backend worker downloads.
    fn artifact_url(&self, url: &str) -> Option<Url> {
        let base_url = self.base_url.as_ref()?;
        resolve_artifact_url(base_url, url).ok()
    }

    fn start_over(&mut self) {
        self.result = None;
        self.result_image = None;
        self.preview_unavailable = false;
        self.undecoded_preview = None;
        self.backend_error = None;
        self.apply(Event::Reset);
    }

    fn show_banners(&mut self, ui: &mut egui::Ui) {
        if let Some(banner) = self.banner.clone() {
            if show_banner(ui, &banner) {
                self.apply(Event::DismissError);
            }
        }
        if let Some(error) = self.backend_error.clone() {
            if show_banner(ui, &error) {
                self.backend_error = None;
            }
        }
    }

    fn show_mode_select(&mut self, ui: &mut egui::Ui) {
        ui.heading("New device label");
        ui.weak("Upload a device report to pre-fill the label, or type the details yourself.");
        ui.add_space(12.0);
        ui.horizontal(|ui| {
            if ui.button("📄 Upload report").clicked() {
                self.apply(Event::SelectMode(Mode::Auto));
            }
            if ui.button("✏ Enter manually").clicked() {
                self.apply(Event::SelectMode(Mode::Manual));
            }
        });
    }

    fn show_upload(&mut self, ui: &mut egui::Ui) {
        let legacy = self.workflow.options().flow == EndpointFlow::LegacyUpload;
        ui.heading("Upload report");
        ui.add_space(8.0);

        let fill = if self.drop_highlight {
            ui.visuals().selection.bg_fill
        } else {
            ui.visuals().faint_bg_color
        };
        egui::Frame::group(ui.style()).fill(fill).show(ui, |ui| {
            ui.set_min_size(egui::vec2(ui.available_width(), 96.0));
            ui.vertical_centered(|ui| {
                ui.add_space(16.0);
                ui.label("Drop a report file here");
                if ui.button("Choose file…").clicked() {
                    self.pick_report();
                }
                if self.file_label.is_empty() {
                    ui.weak("No file selected");
                } else {
                    ui.strong(&self.file_label);
                }
            });
        });

        if !legacy {
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                ui.label("IMEI");
                let mut imei = self.workflow.upload().imei.clone();
                let response = ui.add(
                    egui::TextEdit::singleline(&mut imei)
                        .hint_text("15-digit IMEI")
                        .desired_width(FIELD_WIDTH),
                );
                if response.changed() {
                    self.apply(Event::SetUploadImei(imei));
                }
            });
        }

        ui.add_space(12.0);
        ui.horizontal(|ui| {
            if self.workflow.options().manual_mode && ui.button("← Back").clicked() {
                self.apply(Event::Back);
            }
            let label = if legacy { "Generate label" } else { "Continue" };
            if ui.button(label).clicked() {
                self.apply(Event::SubmitUpload);
            }
        });
    }

    fn show_manual_entry(&mut self, ui: &mut egui::Ui) {
        ui.heading("Enter device details");
        ui.add_space(8.0);
        let fields = self.workflow.manual_fields().clone();
        let edits = field_grid(ui, "manual_fields", &fields);
        for (field, value) in edits {
            self.apply(Event::SetManualField(field, value));
        }

        ui.add_space(12.0);
        ui.horizontal(|ui| {
            if ui.button("← Back").clicked() {
                self.apply(Event::Back);
            }
            if ui.button("Continue").clicked() {
                self.apply(Event::SubmitManual);
            }
        });
    }

    fn show_edit_preview(&mut self, ui: &mut egui::Ui) {
        ui.heading("Review label");
        ui.add_space(8.0);
        ui.columns(2, |columns| {
            let draft = self.workflow.draft().clone();
            let edits = field_grid(&mut columns[0], "draft_fields", &draft);
            for (field, value) in edits {
                self.apply(Event::EditDraft(field, value));
            }
            show_preview_card(&mut columns[1], &self.preview);
        });

        ui.add_space(12.0);
        ui.horizontal(|ui| {
            if ui.button("← Back").clicked() {
                self.apply(Event::Back);
            }
            if ui.button("Generate label").clicked() {
                self.apply(Event::SubmitGenerate);
            }
        });
    }

    fn show_result(&mut self, ui: &mut egui::Ui) {
        ui.heading("Label ready");
        ui.add_space(8.0);
        let Some(artifact) = self.result.clone() else {
            ui.weak("No label generated yet.");
            return;
        };

        match &self.result_image {
            Some(image) if image.url == artifact.preview_url => {
                ui.add(egui::Image::new(&image.texture).max_size(MAX_PREVIEW_SIZE));
            }
            _ if self.preview_unavailable => {
                ui.weak("Preview unavailable");
            }
            _ => {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.weak("Loading preview…");
                });
            }
        }

        ui.add_space(8.0);
        match self.artifact_url(&artifact.download_url) {
            Some(url) => {
                ui.hyperlink_to("Open label in browser", url.as_str());
            }
            None => {
                ui.weak(&artifact.download_url);
            }
        }
        ui.add_space(12.0);
        ui.horizontal(|ui| {
            if ui.button("💾 Save label…").clicked() {
                self.save_label();
            }
            if self.workflow.draft_origin().is_some() && ui.button("Edit again").clicked() {
                self.apply(Event::Back);
            }
            if ui.button("Start over").clicked() {
                self.start_over();
            }
        });
    }

    fn show_status_bar(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label(&self.status);
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.weak(&self.server_url);
            });
        });
    }
}

impl eframe::App for LabelApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();
        self.decode_pending_preview(ctx);
        self.handle_file_drops(ctx);

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| self.show_status_bar(ui));
        egui::CentralPanel::default().show(ctx, |ui| {
            self.show_banners(ui);
            if self.loading {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Working…");
                });
                return;
            }
            match self.screen {
                ScreenState::ModeSelect => self.show_mode_select(ui),
                ScreenState::Upload => self.show_upload(ui),
                ScreenState::ManualEntry => self.show_manual_entry(ui),
                ScreenState::EditPreview => self.show_edit_preview(ui),
                ScreenState::Result => self.show_result(ui),
                ScreenState::ErrorOverlay => {}
            }
        });

        ctx.request_repaint_after(if self.loading {
            Duration::from_millis(16)
        } else {
            Duration::from_millis(100)
        });
    }
}

/// Renders one editable row per draft field and returns the rows that changed.
fn field_grid(ui: &mut egui::Ui, id: &str, values: &LabelDraft) -> Vec<(DraftField, String)> {
    let mut edits = Vec::new();
    egui::Grid::new(id)
        .num_columns(2)
        .spacing([12.0, 8.0])
        .show(ui, |ui| {
            for field in DraftField::ALL {
                ui.label(field.label());
                let mut value = values.get(field).to_string();
                if ui
                    .add(egui::TextEdit::singleline(&mut value).desired_width(FIELD_WIDTH))
                    .changed()
                {
                    edits.push((field, value));
                }
                ui.end_row();
            }
        });
    edits
}

fn show_preview_card(ui: &mut egui::Ui, preview: &LabelPreview) {
    egui::Frame::group(ui.style()).show(ui, |ui| {
        ui.set_min_width(FIELD_WIDTH);
        ui.label(egui::RichText::new(&preview.title).strong().size(20.0));
        ui.separator();
        ui.label(&preview.details);
        ui.label(format!("🔋 {}", preview.battery));
        ui.add_space(6.0);
        ui.small(format!("IMEI: {}", preview.imei));
    });
}

/// Draws a dismissible banner. Returns true when dismissed.
fn show_banner(ui: &mut egui::Ui, error: &UiError) -> bool {
    let color = match error.category() {
        UiErrorCategory::Validation => ui.visuals().warn_fg_color,
        _ => ui.visuals().error_fg_color,
    };
    let mut dismissed = false;
    egui::Frame::group(ui.style()).show(ui, |ui| {
        ui.horizontal(|ui| {
            ui.colored_label(color, error.message());
            if error.is_retryable() {
                ui.weak("(you can submit again)");
            }
            dismissed = ui.small_button("✕").clicked();
        });
    });
    ui.add_space(6.0);
    dismissed
}

fn report_from_drop(file: &egui::DroppedFile) -> Result<ReportFile, String> {
    if let Some(bytes) = &file.bytes {
        let name = if file.name.is_empty() {
            "report.txt".to_string()
        } else {
            file.name.clone()
        };
        return Ok(ReportFile::new(name, bytes.to_vec()));
    }
    match &file.path {
        Some(path) => read_report_file(path),
        None => Err("Dropped item has no readable contents".to_string()),
    }
}

fn read_report_file(path: &Path) -> Result<ReportFile, String> {
    let bytes = fs::read(path)
        .map_err(|err| format!("Failed to read '{}': {err}", path.display()))?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report.txt".to_string());
    Ok(ReportFile::new(name, bytes))
}

fn suggested_file_name(url: &Url) -> Option<String> {
    url.path_segments()?
        .next_back()
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
#[path = "tests/app_tests.rs"]
mod tests;
