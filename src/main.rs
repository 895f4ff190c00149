//! Helm preview
use std::io::Write;
use clap::{Parser, Subcommand};
use thiserror::Error;
use log::{debug, error, info, Level};
use preview::config::runtime::{Inputs, Options, Purpose};
use preview::github::{Context, GitHub};
use preview::{clear, cmd, config, deploy, github};

/// Deploy and tear down pull request previews on Kubernetes.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file.
    /// Defaults to helm-preview.toml in the workspace, if it exists.
    #[arg(long, env = "PREVIEW_CONFIG")]
    config: Option<String>,

    #[command(flatten)]
    inputs: Inputs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Build and push the image, package and publish the chart, and install the preview release.
    Deploy,
    /// Uninstall the previews of the current pull request, and remove their chart versions if enabled.
    Clear,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration file: {0}")]
    ConfigParse(#[from] config::file::Error),

    #[error("configuration: {0}")]
    Config(#[from] config::runtime::Error),

    #[error("github: {0}")]
    GitHub(#[from] github::Error),

    #[error("deploy preview: {0}")]
    Deploy(#[from] deploy::Error),

    #[error("clear preview: {0}")]
    Clear(#[from] clear::Error),

    #[error("serialize result: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("preview release {0} was not installed")]
    DeployFailed(String),
}

/// Read configuration file from disk and merge it with the
/// `default.toml` [built-in config](../default.toml).
///
/// If a configuration file name is not set explicitly, this function will
/// detect whether a config file with the default file name exists in the workspace.
/// If it does, it is used implicitly. If not, we ignore any read errors.
fn read_config(args: &Cli) -> Result<config::file::File, Error> {
    const DEFAULT_CONFIG_FILE: &str = "helm-preview.toml";

    let config_path = format!("{}/{}", args.inputs.workspace, DEFAULT_CONFIG_FILE);

    let config_file = match &args.config {
        None => {
            if std::fs::metadata(&config_path)
                .map(|metadata| metadata.is_file())
                .unwrap_or(false)
            {
                Some(config_path)
            } else {
                None
            }
        }
        Some(c) => Some(c.clone()),
    };

    Ok(if let Some(config_file) = config_file {
        debug!("Using configuration file {config_file}");
        config::file::File::default_with_user_config_file(&config_file)?
    } else {
        config::file::File::default()
    })
}

/// Log lines go to the Actions log; errors and warnings become annotations.
fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| match record.level() {
            Level::Error => writeln!(buf, "::error::{}", record.args()),
            Level::Warn => writeln!(buf, "::warning::{}", record.args()),
            Level::Info => writeln!(buf, "{}", record.args()),
            level => writeln!(buf, "[{}] {}", level, record.args()),
        })
        .init();
}

#[tokio::main]
async fn main() {
    init_logging();

    match run().await {
        Ok(_) => std::process::exit(0),
        Err(err) => {
            error!("fatal: {}", err);
            std::process::exit(1)
        }
    }
}

async fn run() -> Result<(), Error> {
    let args = Cli::parse();
    let cfg_file = read_config(&args)?;

    info!("helm-preview {}", env!("CARGO_PKG_VERSION"));

    let purpose = match args.command {
        Commands::Deploy => Purpose::Deploy,
        Commands::Clear => Purpose::Clear,
    };
    let options = Options::new(&cfg_file, &args.inputs, purpose)?;
    let source_control = GitHub::new(&options.github_token, Context::from_env()?)?;
    let runner = cmd::System;

    match args.command {
        Commands::Deploy => {
            let result = deploy::deploy_preview(&options, &runner, &source_control).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            github::set_outputs(&[
                ("preview-url", result.preview_url.clone()),
                ("helm-release-name", result.helm_release_name.clone()),
                ("docker-image-version", result.docker_image_version.clone()),
                ("success", result.success.to_string()),
            ])?;
            if result.success {
                Ok(())
            } else {
                Err(Error::DeployFailed(result.helm_release_name))
            }
        }
        Commands::Clear => {
            let result = clear::clear_previews(&options, &runner, &source_control).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            github::set_outputs(&[("success", result.success.to_string())])?;
            Ok(())
        }
    }
}
