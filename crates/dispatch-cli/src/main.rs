//! Dispatch command line client.

mod cli;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::{json, Value};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use dispatch_client::{DispatchClient, JobHandle, RequestJobOptions};

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Already installed is fine; reqwest only needs one provider.
    let _ = rustls::crypto::ring::default_provider().install_default();

    init_tracing();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

/// Colored output for dev, JSON when `LOG_FORMAT=json`.
fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("dispatch_client=info,dispatch_cli=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli
        .connection
        .to_config()
        .context("invalid connection settings")?;
    info!(server = %config.base_url(), verify_tls = config.verify_tls(), "Connecting to Dispatch");

    let client = DispatchClient::new(config)?;

    match cli.command {
        Command::Status => {
            if client.status_check().await? {
                println!("OK");
            } else {
                bail!("Dispatch server did not report OK");
            }
        }
        Command::Clear { queue } => {
            client.clear_queue(&queue).await?;
            println!("Cleared queue {}", queue);
        }
        Command::Submit { queue, payload } => {
            let payload: Value =
                serde_json::from_str(&payload).context("payload must be valid JSON")?;
            client.submit_job(&queue, &payload).await?;
            println!("Submitted job to {}", queue);
        }
        Command::Request {
            queue,
            poll,
            complete,
        } => match client.request_job(&queue, poll.into()).await? {
            Some(job) => {
                println!("{}", serde_json::to_string_pretty(&job_json(&job))?);
                if complete {
                    job.complete().await?;
                    println!("Completed job {}", job.job_id());
                }
            }
            None => println!("No job available"),
        },
        Command::Complete { queue, job_id } => {
            client.complete_job(&queue, &job_id).await?;
            println!("Completed job {}", job_id);
        }
        Command::Drain { queue, poll } => {
            let drained = client.drain_queue(&queue, poll.into()).await?;
            println!("Completed {} job(s) from {}", drained, queue);
        }
        Command::Example { queue } => run_example(&client, &queue).await?,
    }

    Ok(())
}

fn job_json(job: &JobHandle) -> Value {
    json!({
        "jobId": job.job_id(),
        "queueId": job.queue_id(),
        "data": job.payload(),
    })
}

/// Two jobs in, two jobs out, printing "Hello world.".
async fn run_example(client: &DispatchClient, queue: &str) -> Result<()> {
    if !client.status_check().await? {
        bail!("Failed to connect to the Dispatch server");
    }

    // Start from an empty queue.
    client.clear_queue(queue).await?;

    client
        .submit_job(queue, &json!({"message": "Hello "}))
        .await?;
    // Order is best effort, the jobs may come back swapped.
    client
        .submit_job(queue, &json!({"message": "world."}))
        .await?;

    let options = RequestJobOptions::new().job_handle_timeout(20).long_poll(-1);
    let job1 = client
        .request_job(queue, options)
        .await?
        .context("expected a first job")?;
    let job2 = client
        .request_job(queue, options)
        .await?
        .context("expected a second job")?;

    let mut message = message_of(&job1)?;
    message.push_str(&message_of(&job2)?);
    println!("{}", message);

    job1.complete().await?;
    job2.complete().await?;

    info!("Example complete");
    Ok(())
}

fn message_of(job: &JobHandle) -> Result<String> {
    job.payload()["message"]
        .as_str()
        .map(str::to_string)
        .with_context(|| format!("job {} has no message", job.job_id()))
}

