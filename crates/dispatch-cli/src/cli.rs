//! Command line definition.

use std::convert::Infallible;
use std::path::PathBuf;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args, Parser, Subcommand};

use dispatch_client::config::parse_port;
use dispatch_client::types::{DEFAULT_JOB_HANDLE_TIMEOUT_SECS, DEFAULT_LONG_POLL_SECS};
use dispatch_client::{
    ConnectionConfig, DispatchError, DispatchResult, RequestJobOptions, TlsOptions, DEFAULT_PORT,
};

#[derive(Debug, Parser)]
#[command(name = "dispatch", version, about = "Talk to a Dispatch job queue server")]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct ConnectionArgs {
    /// Server address including scheme, e.g. https://127.0.0.1
    #[arg(long, env = "DISPATCH_HOST", global = true)]
    pub host: Option<String>,

    /// Falls back to the default port when the value is not a port number
    #[arg(
        long,
        env = "DISPATCH_PORT",
        default_value_t = DEFAULT_PORT,
        value_parser = port_or_default,
        global = true
    )]
    pub port: u16,

    #[arg(long, env = "DISPATCH_ACCESS_KEY", global = true)]
    pub access_key: Option<String>,

    #[arg(long, env = "DISPATCH_SECRET_KEY", hide_env_values = true, global = true)]
    pub secret_key: Option<String>,

    #[arg(
        long,
        env = "DISPATCH_VERIFY_TLS",
        default_value_t = true,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub verify_tls: bool,

    /// Skip server certificate verification (development only)
    #[arg(long, global = true)]
    pub insecure: bool,

    /// Extra PEM root certificate to trust
    #[arg(long, env = "DISPATCH_CA_CERT", global = true)]
    pub ca_cert: Option<PathBuf>,
}

impl ConnectionArgs {
    pub fn to_config(&self) -> DispatchResult<ConnectionConfig> {
        let host = required(&self.host, "--host or DISPATCH_HOST")?;
        let access_key = required(&self.access_key, "--access-key or DISPATCH_ACCESS_KEY")?;
        let secret_key = required(&self.secret_key, "--secret-key or DISPATCH_SECRET_KEY")?;

        Ok(
            ConnectionConfig::new(host, self.port, access_key, secret_key)?.with_tls(TlsOptions {
                verify: self.verify_tls && !self.insecure,
                ca_certificate: self.ca_cert.clone(),
            }),
        )
    }
}

fn port_or_default(value: &str) -> Result<u16, Infallible> {
    Ok(parse_port(value))
}

fn required(value: &Option<String>, name: &str) -> DispatchResult<String> {
    value
        .clone()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| DispatchError::config(format!("{} must be set", name)))
}

#[derive(Debug, Args, Clone, Copy)]
pub struct PollArgs {
    /// Seconds the job stays reserved for us (server minimum is 40)
    #[arg(long, default_value_t = DEFAULT_JOB_HANDLE_TIMEOUT_SECS)]
    pub job_timeout: u64,

    /// Seconds to wait for a job, at most 20; negative returns immediately
    #[arg(long, default_value_t = DEFAULT_LONG_POLL_SECS, allow_negative_numbers = true)]
    pub long_poll: i64,
}

impl From<PollArgs> for RequestJobOptions {
    fn from(args: PollArgs) -> Self {
        RequestJobOptions::new()
            .job_handle_timeout(args.job_timeout)
            .long_poll(args.long_poll)
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check that the server is up
    Status,

    /// Remove every pending job from a queue
    Clear { queue: String },

    /// Submit a job with a JSON payload
    Submit { queue: String, payload: String },

    /// Request the next job from a queue and print it
    Request {
        queue: String,

        #[command(flatten)]
        poll: PollArgs,

        /// Complete the job right after printing it
        #[arg(long)]
        complete: bool,
    },

    /// Mark a job as done
    Complete { queue: String, job_id: String },

    /// Request and complete jobs until the queue is empty
    Drain {
        queue: String,

        #[command(flatten)]
        poll: PollArgs,
    },

    /// Run the hello-world walkthrough against a queue
    Example {
        #[arg(long, default_value = "EXAMPLE")]
        queue: String,
    },
}
