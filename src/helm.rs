use log::debug;
use serde::Deserialize;
use thiserror::Error;
use crate::cmd::{self, CommandResult, Invocation, Runner};

pub const HELM_PACK_PLUGIN: &str = "https://github.com/thynquest/helm-pack.git";
pub const HELM_PUSH_PLUGIN: &str = "https://github.com/chartmuseum/helm-push.git";

#[derive(Error, Debug)]
pub enum Error {
    #[error("parse helm release list: {err}; output was: {output}")]
    ParseList {
        err: serde_json::Error,
        output: String,
    },

    #[error("helm list printed nothing")]
    EmptyList,

    #[error(transparent)]
    Command(#[from] cmd::Error),
}

/// One entry of `helm list --output json`.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct HelmRelease {
    pub name: String,
    #[serde(default)]
    pub app_version: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub revision: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub chart: String,
}

pub type HelmListResult = Vec<HelmRelease>;

/// Credentials for a chart repository.
#[derive(Debug, Clone)]
pub struct RepoAuth<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

impl RepoAuth<'_> {
    fn apply(&self, invocation: Invocation) -> Invocation {
        invocation
            .arg("--username")
            .arg(self.username)
            .arg("--password")
            .secret_arg(self.password)
    }
}

pub fn plugin_install(runner: &impl Runner, url: &str) -> Result<CommandResult, Error> {
    Ok(runner.run(&Invocation::new("helm").args(["plugin", "install", url]))?)
}

/// Package the chart at `chart_path` with the given chart and app versions.
pub fn pack(runner: &impl Runner, chart_path: &str, chart_version: &str, app_version: &str) -> Result<CommandResult, Error> {
    Ok(runner.run(
        &Invocation::new("helm")
            .arg("pack")
            .arg(chart_path)
            .arg("--version")
            .arg(chart_version)
            .arg("--app-version")
            .arg(app_version)
            .arg("--set")
            .arg(format!("image={chart_version}")),
    )?)
}

pub fn repo_add(runner: &impl Runner, name: &str, url: &str, auth: &RepoAuth) -> Result<CommandResult, Error> {
    let invocation = Invocation::new("helm").args(["repo", "add", name, url]);
    Ok(runner.run(&auth.apply(invocation))?)
}

pub fn repo_update(runner: &impl Runner) -> Result<CommandResult, Error> {
    Ok(runner.run(&Invocation::new("helm").args(["repo", "update"]))?)
}

/// Upload a packaged chart archive to the repository registered as `repo_name`.
pub fn push(runner: &impl Runner, archive: &str, repo_name: &str, auth: &RepoAuth) -> Result<CommandResult, Error> {
    let invocation = Invocation::new("helm").args(["push", archive, repo_name]);
    Ok(runner.run(&auth.apply(invocation))?)
}

/// `helm upgrade --install`, with all value overrides in a single `--set`.
pub fn upgrade_install(
    runner: &impl Runner,
    release_name: &str,
    chart: &str,
    namespace: &str,
    overrides: &[(&str, &str)],
) -> Result<CommandResult, Error> {
    let overrides = overrides
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(",");
    debug!("Value overrides: {overrides}");

    Ok(runner.run(
        &Invocation::new("helm")
            .args(["upgrade", release_name, chart, "--install", "--namespace", namespace, "--set"])
            .arg(overrides),
    )?)
}

/// List releases in `namespace` whose name matches `filter`.
///
/// The exit code is not inspected: a failing `helm list` prints something
/// that is not JSON, which surfaces as a parse error instead.
pub fn list(runner: &impl Runner, namespace: &str, filter: &str) -> Result<(CommandResult, HelmListResult), Error> {
    let result = runner.run(
        &Invocation::new("helm").args(["list", "--namespace", namespace, "--filter", filter, "--output", "json"]),
    )?;
    let releases = parse_list(&result.output)?;
    Ok((result, releases))
}

/// Parse the JSON document at the start of `output`.
///
/// Anything after it is ignored; stderr follows stdout in the combined
/// output, and helm writes warnings there.
pub fn parse_list(output: &str) -> Result<HelmListResult, Error> {
    match serde_json::Deserializer::from_str(output).into_iter::<HelmListResult>().next() {
        Some(Ok(releases)) => Ok(releases),
        Some(Err(err)) => Err(Error::ParseList {
            err,
            output: output.to_string(),
        }),
        None => Err(Error::EmptyList),
    }
}

pub fn uninstall(runner: &impl Runner, release_name: &str, namespace: &str) -> Result<CommandResult, Error> {
    Ok(runner.run(&Invocation::new("helm").args(["uninstall", release_name, "--namespace", namespace]))?)
}
