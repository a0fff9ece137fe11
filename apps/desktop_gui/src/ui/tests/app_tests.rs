use super::*;
use crossbeam_channel::bounded;
use shared::{
    error::RemoteError,
    protocol::{GeneratedLabel, ParsedReport},
};

fn app_with_channels(
    options: WorkflowOptions,
) -> (LabelApp, Receiver<BackendCommand>, Sender<UiEvent>) {
    app_with(options, "http://127.0.0.1:5000")
}

fn app_with_channels_for(
    server_url: &str,
) -> (LabelApp, Receiver<BackendCommand>, Sender<UiEvent>) {
    app_with(WorkflowOptions::default(), server_url)
}

fn app_with(
    options: WorkflowOptions,
    server_url: &str,
) -> (LabelApp, Receiver<BackendCommand>, Sender<UiEvent>) {
    let (cmd_tx, cmd_rx) = bounded(8);
    let (ui_tx, ui_rx) = bounded(8);
    let app = LabelApp::new(
        StartupConfig {
            server_url: server_url.to_string(),
            options,
        },
        cmd_tx,
        ui_rx,
    );
    (app, cmd_rx, ui_tx)
}

#[test]
fn upload_submission_queues_parse_and_applies_the_settlement() {
    let (mut app, cmd_rx, ui_tx) = app_with_channels(WorkflowOptions::default());
    assert_eq!(app.screen, ScreenState::ModeSelect);

    app.apply(Event::SelectMode(Mode::Auto));
    app.apply(Event::ChooseFile(ReportFile::new("report.txt", b"abc".to_vec())));
    app.apply(Event::SetUploadImei("356789012345678".to_string()));
    app.apply(Event::SubmitUpload);

    assert!(app.loading);
    assert_eq!(app.file_label, "report.txt (3 B)");
    match cmd_rx.try_recv().expect("parse command") {
        BackendCommand::ParseReport { file } => assert_eq!(file.name, "report.txt"),
        other => panic!("unexpected command {}", other.name()),
    }

    ui_tx
        .send(UiEvent::ParseSettled(Ok(ParsedReport {
            model: "iPhone 11".to_string(),
            capacity: "64GB".to_string(),
            color: "Blanco".to_string(),
            battery_life: "91%".to_string(),
        })))
        .expect("send");
    app.process_ui_events();

    assert!(!app.loading);
    assert_eq!(app.screen, ScreenState::EditPreview);
    assert_eq!(app.preview.title, "iPhone 11");
    assert_eq!(app.preview.imei, "356789012345678");
}

#[test]
fn generate_result_requests_the_preview_image() {
    let (mut app, cmd_rx, ui_tx) = app_with_channels(WorkflowOptions::default());
    app.apply(Event::SelectMode(Mode::Manual));
    app.apply(Event::SetManualField(DraftField::Imei, "490154203237518".into()));
    app.apply(Event::SetManualField(DraftField::BatteryLife, "80%".into()));
    app.apply(Event::SubmitManual);
    app.apply(Event::SubmitGenerate);
    assert!(matches!(
        cmd_rx.try_recv(),
        Ok(BackendCommand::GenerateLabel { .. })
    ));

    ui_tx
        .send(UiEvent::GenerateSettled(Ok(GeneratedLabel {
            image_url: "/generated/label.png".to_string(),
        })))
        .expect("send");
    app.process_ui_events();

    assert_eq!(app.screen, ScreenState::Result);
    match cmd_rx.try_recv().expect("preview command") {
        BackendCommand::FetchPreview { url } => assert_eq!(url, "/generated/label.png"),
        other => panic!("unexpected command {}", other.name()),
    }

    app.handle_ui_event(UiEvent::PreviewLoaded {
        url: "/generated/other.png".to_string(),
        bytes: vec![1, 2, 3],
    });
    assert!(app.undecoded_preview.is_none(), "stale previews are ignored");
    app.handle_ui_event(UiEvent::PreviewLoaded {
        url: "/generated/label.png".to_string(),
        bytes: vec![1, 2, 3],
    });
    assert!(app.undecoded_preview.is_some());
}

#[test]
fn disconnected_backend_settles_the_request_as_a_transport_error() {
    let (mut app, cmd_rx, _ui_tx) = app_with_channels(WorkflowOptions::default());
    drop(cmd_rx);

    app.apply(Event::SelectMode(Mode::Manual));
    app.apply(Event::SetManualField(DraftField::Imei, "490154203237518".into()));
    app.apply(Event::SetManualField(DraftField::BatteryLife, "80%".into()));
    app.apply(Event::SubmitManual);
    app.apply(Event::SubmitGenerate);

    assert!(!app.loading);
    let banner = app.banner.clone().expect("error banner");
    assert_eq!(banner.category(), UiErrorCategory::Transport);
    assert_eq!(app.workflow.underlying_screen(), ScreenState::EditPreview);
    assert_eq!(app.workflow.draft().imei, "490154203237518");

    app.apply(Event::DismissError);
    assert!(app.banner.is_none());
    assert_eq!(app.screen, ScreenState::EditPreview);
}

#[test]
fn server_errors_show_the_server_message() {
    let (mut app, _cmd_rx, ui_tx) = app_with_channels(WorkflowOptions::default());
    app.apply(Event::SelectMode(Mode::Auto));
    app.apply(Event::ChooseFile(ReportFile::new("report.pdf", b"%PDF".to_vec())));
    app.apply(Event::SetUploadImei("356789012345678".into()));
    app.apply(Event::SubmitUpload);

    ui_tx
        .send(UiEvent::ParseSettled(Err(RemoteError::Server(
            "Formato de archivo no soportado".to_string(),
        ))))
        .expect("send");
    app.process_ui_events();

    let banner = app.banner.clone().expect("error banner");
    assert_eq!(banner.message(), "Formato de archivo no soportado");
    assert_eq!(app.status, "Formato de archivo no soportado");
    assert_eq!(app.screen, ScreenState::Upload);
}

#[test]
fn start_over_clears_result_state() {
    let (mut app, _cmd_rx, ui_tx) = app_with_channels(WorkflowOptions {
        manual_mode: false,
        flow: EndpointFlow::LegacyUpload,
        ..WorkflowOptions::default()
    });
    app.apply(Event::ChooseFile(ReportFile::new("report.txt", b"x".to_vec())));
    app.apply(Event::SubmitUpload);
    ui_tx
        .send(UiEvent::LegacyUploadSettled(Ok(
            shared::protocol::LegacyUploadResponse {
                preview_url: "/generated/preview.png".to_string(),
                pdf_url: "/generated/etiqueta.pdf".to_string(),
            },
        )))
        .expect("send");
    app.process_ui_events();
    assert_eq!(
        app.result.as_ref().map(|artifact| artifact.download_url.as_str()),
        Some("/generated/etiqueta.pdf")
    );

    app.start_over();
    assert!(app.result.is_none());
    assert_eq!(app.screen, ScreenState::Upload);
    assert!(app.file_label.is_empty());
}

#[test]
fn preview_queue_failure_is_reported_instead_of_spinning() {
    let (cmd_tx, _cmd_rx) = bounded(1);
    let (ui_tx, ui_rx) = bounded(8);
    let mut app = LabelApp::new(
        StartupConfig {
            server_url: "http://127.0.0.1:5000".to_string(),
            options: WorkflowOptions {
                manual_mode: false,
                flow: EndpointFlow::LegacyUpload,
                ..WorkflowOptions::default()
            },
        },
        cmd_tx,
        ui_rx,
    );
    app.apply(Event::ChooseFile(ReportFile::new("report.txt", b"x".to_vec())));
    app.apply(Event::SubmitUpload);

    ui_tx
        .send(UiEvent::LegacyUploadSettled(Ok(
            shared::protocol::LegacyUploadResponse {
                preview_url: "/generated/preview.png".to_string(),
                pdf_url: "/generated/etiqueta.pdf".to_string(),
            },
        )))
        .expect("send");
    app.process_ui_events();

    assert_eq!(app.screen, ScreenState::Result);
    assert!(app.preview_unavailable);
    let error = app.backend_error.clone().expect("backend error");
    assert_eq!(error.context(), UiErrorContext::Preview);
    assert_eq!(error.category(), UiErrorCategory::Transport);
}

#[test]
fn artifact_links_match_the_downloaded_url() {
    let base = "http://labels.lan:5000";
    let (app, _cmd_rx, _ui_tx) = app_with_channels_for(base);
    let client = client_core::LabelClient::new(base).expect("client");

    for url in [
        "/generated/label.png",
        "generated/label.png",
        "//cdn.example.com/l.png",
        "/generated/a b.png",
        "https://cdn.example.com/l.png",
    ] {
        assert_eq!(
            app.artifact_url(url),
            Some(client.resolve_url(url).expect("resolve")),
            "{url}"
        );
    }
    assert_eq!(
        app.artifact_url("/generated/a b.png").map(String::from),
        Some("http://labels.lan:5000/generated/a%20b.png".to_string())
    );
}

#[test]
fn artifact_links_are_disabled_for_unusable_server_urls() {
    let (app, _cmd_rx, _ui_tx) = app_with_channels_for("not a url");
    assert_eq!(app.artifact_url("/generated/label.png"), None);
}

#[test]
fn derives_save_names_from_urls() {
    let name = |raw: &str| suggested_file_name(&Url::parse(raw).expect("url"));
    assert_eq!(
        name("http://host/generated/etiqueta.pdf"),
        Some("etiqueta.pdf".to_string())
    );
    assert_eq!(
        name("http://host/generated/label.png?v=2"),
        Some("label.png".to_string())
    );
    assert_eq!(name("http://host/generated/"), None);
}
