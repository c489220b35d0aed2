mod cli;
mod ui;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, ParseArgs};
use docjob::config::DocJobConfig;
use docjob::pipeline::{DocumentService, ParseRequest};
use docjob::poller::{CancelToken, cancel_pair};
use docjob::server;
use docjob::service::{ExtractionClient, HttpTransport};
use docjob::sink::{JsonlSink, NullSink, ResultSink};
use docjob::source::LocalBlobStore;
use ui::JobProgress;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = DocJobConfig::load_from(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    if let Some(timeout) = cli.timeout_secs {
        config.service.timeout_secs = timeout;
    }

    match cli.command {
        Command::Parse(args) => match config.sink.path.clone() {
            Some(path) => run_parse(&config, args, JsonlSink::new(path)).await,
            None => run_parse(&config, args, NullSink).await,
        },
        Command::Poll { job_id, summary } => run_poll(&config, &job_id, summary).await,
        Command::Serve { addr } => {
            let addr = addr.unwrap_or_else(|| config.bind_addr.clone());
            let store = LocalBlobStore::new(config.storage.root.clone());
            match config.sink.path.clone() {
                Some(path) => run_serve(&config, &addr, store, JsonlSink::new(path)).await,
                None => run_serve(&config, &addr, store, NullSink).await,
            }
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "docjob=debug,tower_http=debug"
    } else {
        "docjob=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Cancel token wired to Ctrl-C.
fn ctrl_c_token() -> CancelToken {
    let (handle, token) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel();
        }
    });
    token
}

async fn run_parse<S>(config: &DocJobConfig, args: ParseArgs, sink: S) -> Result<()>
where
    S: ResultSink + Sync,
{
    // A local file is read through a blob store rooted at its directory.
    let (root, request) = match &args.file {
        Some(file) => {
            let root = file.parent().unwrap_or(Path::new(".")).to_path_buf();
            let name = file
                .file_name()
                .and_then(|n| n.to_str())
                .context("file path has no usable file name")?
                .to_string();
            (
                root,
                ParseRequest {
                    bucket: Some(".".to_string()),
                    file_path: Some(name),
                    ..ParseRequest::default()
                },
            )
        }
        None => (
            config.storage.root.clone(),
            ParseRequest {
                text: args.text.clone(),
                ..ParseRequest::default()
            },
        ),
    };
    let request = ParseRequest {
        candidate_name: args.candidate_name.clone(),
        job_id: args.job_id.clone(),
        user_id: args.user_id.clone(),
        ..request
    };

    let client = ExtractionClient::from_config(config.service.clone())?;
    let service = DocumentService::new(
        client,
        LocalBlobStore::new(root),
        sink,
        config.parser_version.clone(),
    );

    let progress = JobProgress::start("Parsing document");
    let cancel = ctrl_c_token();
    match service.process(&request, &cancel).await {
        Ok((response, parsed)) => {
            progress.succeed(&format!(
                "Job {} finished after {} poll(s)",
                parsed.job_id, parsed.summary.polls
            ));
            if args.raw {
                print_payload(&response.parsed);
            } else {
                println!("{}", serde_json::to_string_pretty(&response)?);
            }
            Ok(())
        }
        Err(e) => {
            progress.fail(&e.to_string());
            Err(e.into())
        }
    }
}

async fn run_poll(config: &DocJobConfig, job_id: &str, show_summary: bool) -> Result<()> {
    let client = ExtractionClient::from_config(config.service.clone())?;
    let normalizer = docjob::normalize::Normalizer::new(config.service.result_field.clone());

    let progress = JobProgress::start(&format!("Waiting for job {job_id}"));
    let cancel = ctrl_c_token();
    match client.await_result(job_id, &cancel).await {
        Ok((payload, summary)) => {
            progress.succeed(&format!("Job {job_id} finished"));
            print_payload(&normalizer.normalize(payload));
            if show_summary {
                progress.print_summary(&summary);
            }
            Ok(())
        }
        Err(e) => {
            progress.fail(&e.to_string());
            Err(e.into())
        }
    }
}

async fn run_serve<S>(
    config: &DocJobConfig,
    addr: &str,
    store: LocalBlobStore,
    sink: S,
) -> Result<()>
where
    S: ResultSink + Send + Sync + 'static,
{
    let client: ExtractionClient<HttpTransport> =
        ExtractionClient::from_config(config.service.clone())?;
    let service = DocumentService::new(client, store, sink, config.parser_version.clone());
    server::serve(addr, Arc::new(service)).await?;
    Ok(())
}

fn print_payload(payload: &Value) {
    match payload {
        Value::String(text) => println!("{text}"),
        other => println!(
            "{}",
            serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string())
        ),
    }
}
