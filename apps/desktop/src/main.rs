use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use client_core::{
    config::{load_settings, normalize_server_url},
    EndpointFlow, Event, Intent, LabelClient, LabelService, WorkflowDriver,
};
use shared::domain::{DraftField, LabelPreview, Mode, ReportFile, ScreenState};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "labelgen", about = "Generate device labels from reports or manual entry")]
struct Cli {
    /// Label server base URL; overrides labelgen.toml and environment.
    #[arg(long)]
    server_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a report for server-side parsing, then generate.
    Auto {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        imei: String,
        #[command(flatten)]
        finish: FinishArgs,
    },
    /// Enter label fields directly, then generate.
    Manual {
        #[arg(long, default_value = "")]
        model: String,
        #[arg(long, default_value = "")]
        capacity: String,
        #[arg(long, default_value = "")]
        color: String,
        #[arg(long, default_value = "")]
        battery_life: String,
        #[arg(long)]
        imei: String,
        #[command(flatten)]
        finish: FinishArgs,
    },
    /// Single-step upload against servers exposing only `/upload`.
    Legacy {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct FinishArgs {
    /// Edit a draft field before generating, e.g. `--set color=Rojo`.
    #[arg(long = "set", value_name = "FIELD=VALUE", value_parser = parse_assignment)]
    edits: Vec<(DraftField, String)>,
    /// Save the generated label to this path.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings();
    if let Some(server_url) = &cli.server_url {
        settings.server_url = normalize_server_url(server_url);
    }
    let mut options = settings.workflow_options();

    let client = LabelClient::new(&settings.server_url)
        .with_context(|| format!("invalid server url '{}'", settings.server_url))?;
    tracing::info!(server_url = %client.base_url(), "using label server");

    let (entry, finish) = match cli.command {
        Command::Auto { file, imei, finish } => {
            options.flow = EndpointFlow::Split;
            let report = read_report(&file)?;
            let mut events = entry_events(options.manual_mode, Mode::Auto);
            events.extend([
                Event::ChooseFile(report),
                Event::SetUploadImei(imei),
                Event::SubmitUpload,
            ]);
            (events, finish)
        }
        Command::Manual {
            model,
            capacity,
            color,
            battery_life,
            imei,
            finish,
        } => {
            options.flow = EndpointFlow::Split;
            options.manual_mode = true;
            let mut events = entry_events(true, Mode::Manual);
            events.extend([
                Event::SetManualField(DraftField::Model, model),
                Event::SetManualField(DraftField::Capacity, capacity),
                Event::SetManualField(DraftField::Color, color),
                Event::SetManualField(DraftField::BatteryLife, battery_life),
                Event::SetManualField(DraftField::Imei, imei),
                Event::SubmitManual,
            ]);
            (events, finish)
        }
        Command::Legacy { file, output } => {
            options.flow = EndpointFlow::LegacyUpload;
            options.manual_mode = false;
            let report = read_report(&file)?;
            let events = vec![Event::ChooseFile(report), Event::SubmitUpload];
            (
                events,
                FinishArgs {
                    edits: Vec::new(),
                    output,
                },
            )
        }
    };

    let mut driver = WorkflowDriver::new(client, options);
    for event in entry {
        let intents = driver.dispatch(event).await;
        render(&intents);
        bail_on_error(&driver)?;
    }

    if driver.workflow().screen() == ScreenState::EditPreview {
        for (field, value) in finish.edits {
            let intents = driver.dispatch(Event::EditDraft(field, value)).await;
            render(&intents);
        }
        let intents = driver.dispatch(Event::SubmitGenerate).await;
        render(&intents);
        bail_on_error(&driver)?;
    }

    let artifact = driver
        .workflow()
        .artifact()
        .cloned()
        .ok_or_else(|| anyhow!("workflow finished without a generated label"))?;

    if let Some(output) = finish.output {
        let bytes = driver
            .service()
            .fetch_artifact(&artifact.download_url)
            .await
            .context("failed to download generated label")?;
        fs::write(&output, &bytes)
            .with_context(|| format!("failed to write label to '{}'", output.display()))?;
        println!("Saved label to {}", output.display());
    }

    Ok(())
}

fn entry_events(manual_mode: bool, mode: Mode) -> Vec<Event> {
    if manual_mode {
        vec![Event::SelectMode(mode)]
    } else {
        Vec::new()
    }
}

fn read_report(path: &Path) -> Result<ReportFile> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read report '{}'", path.display()))?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report.txt".to_string());
    Ok(ReportFile::new(name, bytes))
}

fn bail_on_error<S: LabelService>(driver: &WorkflowDriver<S>) -> Result<()> {
    match driver.workflow().error() {
        Some(err) => bail!("{err}"),
        None => Ok(()),
    }
}

fn render(intents: &[Intent]) {
    for intent in intents {
        match intent {
            Intent::UpdateFileLabel(label) if !label.is_empty() => println!("Report: {label}"),
            Intent::RefreshPreview(preview) => println!("{}", format_preview(preview)),
            Intent::ShowLoading => println!("Working..."),
            Intent::ShowResult(artifact) => {
                println!("Preview: {}", artifact.preview_url);
                println!("Download: {}", artifact.download_url);
            }
            Intent::ShowError(err) => eprintln!("Error: {err}"),
            _ => {}
        }
    }
}

fn format_preview(preview: &LabelPreview) -> String {
    format!(
        "┌ {}\n│ {}\n│ Battery: {}\n└ IMEI: {}",
        preview.title, preview.details, preview.battery, preview.imei
    )
}

fn parse_assignment(raw: &str) -> Result<(DraftField, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=VALUE, got '{raw}'"))?;
    let field = DraftField::from_key(key).ok_or_else(|| {
        format!("unknown field '{key}' (expected model, capacity, color, battery_life or imei)")
    })?;
    Ok((field, value.to_string()))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
