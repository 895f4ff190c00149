//! Pull request and run metadata from the GitHub Actions environment.

use std::io::Write;
use log::debug;
use serde::Deserialize;
use thiserror::Error;

const DEFAULT_API_URL: &str = "https://api.github.com";
const SHORT_SHA_LENGTH: usize = 7;

#[derive(Error, Debug)]
pub enum Error {
    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),

    #[error("GITHUB_RUN_NUMBER is not a number: {0}")]
    RunNumber(String),

    #[error("no pull request found for commit {0}")]
    NoPullRequest(String),

    #[error("read event payload {path}: {err}")]
    ReadEvent {
        err: std::io::Error,
        path: String,
    },

    #[error("deserialize: {0}")]
    Deserialize(#[from] serde_json::Error),

    #[error("reqwest: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("write step outputs: {0}")]
    Output(#[from] std::io::Error),
}

/// Read access to the pull request and CI run being built.
#[allow(async_fn_in_trait)]
pub trait SourceControl {
    async fn pull_request_id(&self) -> Result<u64, Error>;

    async fn latest_commit_short_sha(&self) -> Result<String, Error>;

    fn run_number(&self) -> Result<u64, Error>;
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct Event {
    pub pull_request: Option<PullRequest>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct PullRequest {
    pub number: u64,
    pub head: Option<Head>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Head {
    pub sha: String,
}

/// The subset of the Actions environment we care about.
#[derive(Debug, Default, Clone)]
pub struct Context {
    pub api_url: String,
    pub repository: Option<String>,
    pub sha: Option<String>,
    pub run_number: Option<String>,
    pub event: Event,
}

impl Context {
    pub fn from_env() -> Result<Self, Error> {
        let event = match std::env::var("GITHUB_EVENT_PATH").ok() {
            Some(path) => Self::read_event(&path)?,
            None => Event::default(),
        };

        Ok(Self {
            api_url: std::env::var("GITHUB_API_URL").unwrap_or(DEFAULT_API_URL.to_string()),
            repository: std::env::var("GITHUB_REPOSITORY").ok(),
            sha: std::env::var("GITHUB_SHA").ok(),
            run_number: std::env::var("GITHUB_RUN_NUMBER").ok(),
            event,
        })
    }

    pub fn read_event(path: &str) -> Result<Event, Error> {
        let data = std::fs::read_to_string(path).map_err(|err| Error::ReadEvent {
            err,
            path: path.to_string(),
        })?;
        Ok(serde_json::from_str(&data)?)
    }
}

pub struct GitHub {
    client: reqwest::Client,
    token: String,
    context: Context,
}

impl GitHub {
    pub fn new(token: &str, context: Context) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            token: token.to_string(),
            context,
        })
    }

    fn head_sha(&self) -> Result<String, Error> {
        self.context
            .event
            .pull_request
            .as_ref()
            .and_then(|pr| pr.head.as_ref())
            .map(|head| head.sha.clone())
            .or_else(|| self.context.sha.clone())
            .ok_or(Error::MissingEnv("GITHUB_SHA"))
    }

    async fn pull_request_for_commit(&self, sha: &str) -> Result<u64, Error> {
        let repository = self.context.repository.as_ref().ok_or(Error::MissingEnv("GITHUB_REPOSITORY"))?;
        let url = format!("{}/repos/{}/commits/{}/pulls", self.context.api_url, repository, sha);
        debug!("Looking up pull requests for commit {sha}");

        let pulls: Vec<PullRequest> = self.client
            .get(url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        pulls
            .first()
            .map(|pr| pr.number)
            .ok_or_else(|| Error::NoPullRequest(sha.to_string()))
    }
}

impl SourceControl for GitHub {
    async fn pull_request_id(&self) -> Result<u64, Error> {
        match &self.context.event.pull_request {
            Some(pr) => Ok(pr.number),
            None => {
                let sha = self.head_sha()?;
                self.pull_request_for_commit(&sha).await
            }
        }
    }

    async fn latest_commit_short_sha(&self) -> Result<String, Error> {
        let sha = self.head_sha()?;
        Ok(sha.chars().take(SHORT_SHA_LENGTH).collect())
    }

    fn run_number(&self) -> Result<u64, Error> {
        let run_number = self.context.run_number.as_ref().ok_or(Error::MissingEnv("GITHUB_RUN_NUMBER"))?;
        run_number.parse().map_err(|_| Error::RunNumber(run_number.clone()))
    }
}

/// Append step outputs to the file named by `GITHUB_OUTPUT`.
/// Does nothing when running outside of Actions.
pub fn set_outputs(outputs: &[(&str, String)]) -> Result<(), Error> {
    match std::env::var("GITHUB_OUTPUT").ok() {
        Some(path) => write_outputs(&path, outputs),
        None => {
            debug!("GITHUB_OUTPUT not set, skipping step outputs");
            Ok(())
        }
    }
}

pub fn write_outputs(path: &str, outputs: &[(&str, String)]) -> Result<(), Error> {
    let mut file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
    for (name, value) in outputs {
        writeln!(file, "{name}={value}")?;
    }
    Ok(())
}
