use log::{error, info};
use serde::Serialize;
use thiserror::Error;
use crate::cmd::{CommandResult, Runner};
use crate::config::runtime::Options;
use crate::github::SourceControl;
use crate::helm::RepoAuth;
use crate::{docker, github, hash, helm, naming};

#[derive(Error, Debug)]
pub enum Error {
    #[error("docker: {0}")]
    Docker(#[from] docker::Error),

    #[error("helm: {0}")]
    Helm(#[from] helm::Error),

    #[error("source control: {0}")]
    SourceControl(#[from] github::Error),
}

/// What was deployed, and where to find it.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeployResult {
    pub preview_url: String,
    pub helm_release_name: String,
    pub docker_image_version: String,
    pub success: bool,
}

fn log_result(step: &str, result: &CommandResult) {
    info!("{step} result code: {}", result.result_code);
    if result.success() {
        info!("{}", result.output);
    } else {
        error!("{}", result.output);
    }
}

/// Build, publish and install a preview of the current pull request.
///
/// Only a failing registry login or source control lookup aborts the run.
/// The exit codes of the build, push and packaging steps are logged but not acted upon;
/// `success` reflects the final `helm upgrade --install` alone.
pub async fn deploy_preview(
    options: &Options,
    runner: &impl Runner,
    source_control: &impl SourceControl,
) -> Result<DeployResult, Error> {
    info!("Starting deploy preview...");

    docker::login(runner, &options.docker_registry, &options.docker_username, &options.docker_password)?;

    let sha7 = source_control.latest_commit_short_sha().await?;
    let pull_request_id = source_control.pull_request_id().await?;
    let run_number = source_control.run_number()?;
    let tag_postfix = naming::tag_postfix(pull_request_id, &sha7);

    // Docker image
    let image_name = naming::image_name(
        &options.docker_registry,
        &options.docker_organization,
        &options.docker_image_name,
    );
    let app_version = naming::version(&options.docker_tag_major, run_number, &tag_postfix);
    let docker_image_version = format!("{image_name}:{app_version}");

    info!("Building docker image: {docker_image_version}");
    let build_result = docker::build(runner, &options.workspace, &docker_image_version, &options.docker_file)?;
    log_result("Build docker image", &build_result);

    info!("Push docker image...");
    let push_result = docker::push(runner, &docker_image_version)?;
    log_result("Push docker image", &push_result);

    // Helm chart
    let chart_version = naming::version(&options.helm_tag_major, run_number, &tag_postfix);
    let chart_archive = naming::chart_archive(&options.helm_chart_file_path, &chart_version);

    info!("Installing helm pack plugin...");
    let plugin_result = helm::plugin_install(runner, helm::HELM_PACK_PLUGIN)?;
    log_result("Install helm pack plugin", &plugin_result);

    let pack_result = helm::pack(runner, &options.helm_chart_file_path, &chart_version, &app_version)?;
    log_result("Package helm chart", &pack_result);

    match &options.helm_repo_url {
        Some(repo_url) => {
            info!("Publishing helm chart {chart_archive} to {repo_url}...");
            let auth = RepoAuth {
                username: &options.helm_repo_username,
                password: &options.helm_repo_password,
            };
            log_result("Install helm push plugin", &helm::plugin_install(runner, helm::HELM_PUSH_PLUGIN)?);
            log_result("Add helm repository", &helm::repo_add(runner, &options.helm_organization, repo_url, &auth)?);
            log_result("Update helm repositories", &helm::repo_update(runner)?);
            log_result("Push helm chart", &helm::push(runner, &chart_archive, &options.helm_organization, &auth)?);
        }
        None => info!("helm-repo-url was not set, skipping publish helm chart"),
    }

    // Preview release
    info!("Ready to deploy to Kubernetes...");
    let hash = hash::generate_hash(pull_request_id, &options.hash_salt);
    let preview = naming::Preview::new(&options.app_name, pull_request_id, &hash, &options.base_url);
    let run_number = run_number.to_string();
    let keys = &options.helm_keys;

    let final_result = helm::upgrade_install(
        runner,
        &preview.release_name,
        &chart_archive,
        &options.helm_namespace,
        &[
            (keys.image.as_str(), docker_image_version.as_str()),
            (keys.namespace.as_str(), options.helm_namespace.as_str()),
            (keys.pull_secret.as_str(), options.docker_pull_secret.as_str()),
            (keys.url.as_str(), preview.url.as_str()),
            (keys.app_name.as_str(), preview.identifier.as_str()),
            (keys.container_suffix.as_str(), run_number.as_str()),
        ],
    )?;
    log_result("Install preview release", &final_result);

    let result = DeployResult {
        preview_url: preview.url,
        helm_release_name: preview.release_name,
        docker_image_version,
        success: final_result.success(),
    };

    info!("All done! Printing returned result..");
    info!("{result:#?}");
    Ok(result)
}
