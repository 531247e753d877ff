//! listing-upload: direct-upload listing images from the command line.
//!
//! Reads LISTING_APP_URL (or APP_URL) and the credentials from the environment;
//! see `UploadConfig::from_env`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use listing_api_client::{compute_checksum, ApiClient};
use listing_cli::{init_tracing, parse_field, PreviewReport, TerminalPane};
use listing_core::{PreviewStatus, SelectedFile, UploadConfig};
use listing_uploads::{
    load_thumbnail, AttachmentForm, FileInput, OrchestratorOptions, PreviewEntry,
    UploadOrchestrator,
};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "listing-upload", about = "Direct-upload listing images")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload files and collect their signed references
    Upload {
        /// Files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Direct-upload endpoint (defaults to DIRECT_UPLOAD_PATH)
        #[arg(long)]
        endpoint: Option<String>,
        /// Submit the resulting form to this path
        #[arg(long, value_name = "PATH")]
        submit_to: Option<String>,
        /// Extra form field, repeatable
        #[arg(long = "field", value_name = "KEY=VALUE", value_parser = parse_field)]
        fields: Vec<(String, String)>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the direct-upload checksum of a file
    Checksum {
        file: PathBuf,
    },
    /// Print the HTML preview fragment of a file
    Preview {
        file: PathBuf,
    },
}

#[derive(Serialize)]
struct UploadReport<'a> {
    previews: Vec<PreviewReport>,
    fields: &'a [listing_uploads::FormField],
    #[serde(skip_serializing_if = "Option::is_none")]
    submission: Option<listing_api_client::FormSubmission>,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Upload {
            files,
            endpoint,
            submit_to,
            fields,
            json,
        } => upload(files, endpoint, submit_to, fields, json).await?,
        Commands::Checksum { file } => {
            let file = SelectedFile::from_path(&file)?;
            let checksum = compute_checksum(&file).await?;
            print_json(&serde_json::json!({
                "filename": file.name,
                "content_type": file.content_type,
                "byte_size": file.size,
                "checksum": checksum,
            }))?;
        }
        Commands::Preview { file } => {
            let config = UploadConfig::from_env().context("Failed to load configuration")?;
            let file = SelectedFile::from_path(&file)?;
            let thumbnail = load_thumbnail(&file, config.preview_max_bytes).await;
            println!("{}", PreviewEntry::new(file, thumbnail).render().to_html());
        }
    }

    Ok(())
}

async fn upload(
    paths: Vec<PathBuf>,
    endpoint: Option<String>,
    submit_to: Option<String>,
    fields: Vec<(String, String)>,
    json: bool,
) -> anyhow::Result<()> {
    let config = UploadConfig::from_env().context("Failed to load configuration")?;
    config.validate()?;
    let client = Arc::new(
        ApiClient::from_config(&config)
            .context("Failed to create API client. Set LISTING_APP_URL and credentials")?,
    );

    let mut form = AttachmentForm::new(config.attachment_field.clone());
    for (name, value) in fields {
        form.push_field(name, value);
    }

    let files = paths
        .iter()
        .map(|p| SelectedFile::from_path(p).with_context(|| format!("Cannot read {}", p.display())))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let mut input = FileInput::new(files);
    if let Some(endpoint) = endpoint {
        input = input.with_direct_upload_url(endpoint);
    }

    let mut orchestrator = UploadOrchestrator::new(
        client.clone(),
        TerminalPane::new(),
        Some(form),
        OrchestratorOptions::from_config(&config),
    );

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = tokio::select! {
        _ = orchestrator.on_files_selected(&mut input) => false,
        signal = &mut ctrl_c => {
            signal.context("Failed to listen for Ctrl-C")?;
            true
        }
    };
    if !interrupted {
        interrupted = tokio::select! {
            _ = orchestrator.settle() => false,
            signal = &mut ctrl_c => {
                signal.context("Failed to listen for Ctrl-C")?;
                true
            }
        };
    }
    if interrupted {
        let removed = orchestrator.cancel_in_flight();
        tracing::warn!(removed, "Interrupted, in-flight uploads cancelled");
    }

    let failed = orchestrator
        .entries()
        .iter()
        .filter(|e| matches!(e.status(), PreviewStatus::Error { .. }))
        .count();

    let (pairs, fields) = match orchestrator.form() {
        Some(form) => (form.to_form_pairs(), form.fields().to_vec()),
        None => (Vec::new(), Vec::new()),
    };

    let submission = match submit_to {
        Some(_) if interrupted => {
            tracing::warn!("Interrupted, form not submitted");
            None
        }
        Some(path) => Some(client.submit_form(&path, &pairs).await?),
        None => None,
    };

    if json {
        print_json(&UploadReport {
            previews: orchestrator
                .entries()
                .iter()
                .map(PreviewReport::from_entry)
                .collect(),
            fields: &fields,
            submission,
        })?;
    } else {
        for field in &fields {
            println!("{}={}", field.name, field.value);
        }
        if let Some(submission) = &submission {
            match &submission.location {
                Some(location) if submission.is_saved() => println!("Saved: {}", location),
                _ => println!("Form not saved (status {})", submission.status),
            }
        }
    }

    if interrupted {
        anyhow::bail!("Upload interrupted");
    }
    if failed > 0 {
        anyhow::bail!("{} upload(s) failed", failed);
    }
    Ok(())
}
