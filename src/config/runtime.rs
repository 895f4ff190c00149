use clap::Args;
use thiserror::Error;
use super::file::{File, Keys};

#[derive(Error, Debug)]
pub enum Error {
    #[error("missing required inputs: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
}

/// Inputs given as flags or environment variables. Anything set here wins over the configuration file.
#[derive(Args, Debug, Default, Clone)]
pub struct Inputs {
    /// Application name, used in release names and preview URLs.
    #[arg(long, env = "PREVIEW_APP_NAME")]
    pub app_name: Option<String>,

    /// Domain the preview host names are created under.
    #[arg(long, env = "PREVIEW_BASE_URL")]
    pub base_url: Option<String>,

    #[arg(long, env = "PREVIEW_DOCKER_REGISTRY")]
    pub docker_registry: Option<String>,

    #[arg(long, env = "PREVIEW_DOCKER_USERNAME")]
    pub docker_username: Option<String>,

    #[arg(long, env = "PREVIEW_DOCKER_PASSWORD", hide_env_values = true)]
    pub docker_password: Option<String>,

    #[arg(long, env = "PREVIEW_DOCKER_ORGANIZATION")]
    pub docker_organization: Option<String>,

    #[arg(long, env = "PREVIEW_DOCKER_IMAGE_NAME")]
    pub docker_image_name: Option<String>,

    /// Path to the Dockerfile.
    #[arg(long, env = "PREVIEW_DOCKER_FILE")]
    pub docker_file: Option<String>,

    #[arg(long, env = "PREVIEW_DOCKER_TAG_MAJOR")]
    pub docker_tag_major: Option<String>,

    /// Name of the image pull secret in the target namespace.
    #[arg(long, env = "PREVIEW_DOCKER_PULL_SECRET")]
    pub docker_pull_secret: Option<String>,

    /// Path to the chart directory.
    #[arg(long, env = "PREVIEW_HELM_CHART_FILE_PATH")]
    pub helm_chart_file_path: Option<String>,

    #[arg(long, env = "PREVIEW_HELM_NAMESPACE")]
    pub helm_namespace: Option<String>,

    #[arg(long, env = "PREVIEW_HELM_TAG_MAJOR")]
    pub helm_tag_major: Option<String>,

    /// Local name of the chart repository, used by both `helm repo add` and `helm push`.
    #[arg(long, env = "PREVIEW_HELM_ORGANIZATION")]
    pub helm_organization: Option<String>,

    /// Chart repository. Charts are neither published nor removed when unset.
    #[arg(long, env = "PREVIEW_HELM_REPO_URL")]
    pub helm_repo_url: Option<String>,

    #[arg(long, env = "PREVIEW_HELM_REPO_USERNAME")]
    pub helm_repo_username: Option<String>,

    #[arg(long, env = "PREVIEW_HELM_REPO_PASSWORD", hide_env_values = true)]
    pub helm_repo_password: Option<String>,

    /// Delete this pull request's chart versions on clear ("true" or "false").
    #[arg(long, env = "PREVIEW_HELM_REMOVE_PREVIEW_CHARTS")]
    pub helm_remove_preview_charts: Option<String>,

    #[arg(long, env = "PREVIEW_HELM_KEY_IMAGE")]
    pub helm_key_image: Option<String>,

    #[arg(long, env = "PREVIEW_HELM_KEY_NAMESPACE")]
    pub helm_key_namespace: Option<String>,

    #[arg(long, env = "PREVIEW_HELM_KEY_PULL_SECRET")]
    pub helm_key_pull_secret: Option<String>,

    #[arg(long, env = "PREVIEW_HELM_KEY_URL")]
    pub helm_key_url: Option<String>,

    #[arg(long, env = "PREVIEW_HELM_KEY_APP_NAME")]
    pub helm_key_app_name: Option<String>,

    #[arg(long, env = "PREVIEW_HELM_KEY_CONTAINER_SUFFIX")]
    pub helm_key_container_suffix: Option<String>,

    /// Salt for the hash that makes preview names unique.
    #[arg(long, env = "PREVIEW_HASH_SALT", hide_env_values = true)]
    pub hash_salt: Option<String>,

    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Docker build context.
    #[arg(long, env = "GITHUB_WORKSPACE", default_value = ".")]
    pub workspace: String,
}

/// Which flow the options are resolved for. Decides what is required.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Purpose {
    Deploy,
    Clear,
}

/// Fully resolved inputs for one run.
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub app_name: String,
    pub base_url: String,

    pub docker_registry: String,
    pub docker_username: String,
    pub docker_password: String,
    pub docker_organization: String,
    pub docker_image_name: String,
    pub docker_file: String,
    pub docker_tag_major: String,
    pub docker_pull_secret: String,

    pub helm_chart_file_path: String,
    pub helm_namespace: String,
    pub helm_tag_major: String,
    pub helm_organization: String,
    pub helm_repo_url: Option<String>,
    pub helm_repo_username: String,
    pub helm_repo_password: String,
    pub helm_remove_preview_charts: String,
    pub helm_keys: Keys,

    pub hash_salt: String,
    pub github_token: String,
    pub workspace: String,
}

impl Options {
    pub fn new(file: &File, inputs: &Inputs, purpose: Purpose) -> Result<Self, Error> {
        let deploy = purpose == Purpose::Deploy;
        let mut r = Resolver::default();
        let keys = &file.helm.keys;

        let options = Options {
            app_name: r.value("app-name", &inputs.app_name, &file.app.name, true),
            base_url: r.value("base-url", &inputs.base_url, &file.app.base_url, deploy),

            docker_registry: r.value("docker-registry", &inputs.docker_registry, &file.docker.registry, deploy),
            docker_username: r.value("docker-username", &inputs.docker_username, &None, deploy),
            docker_password: r.value("docker-password", &inputs.docker_password, &None, deploy),
            docker_organization: r.value("docker-organization", &inputs.docker_organization, &file.docker.organization, deploy),
            docker_image_name: r.value("docker-image-name", &inputs.docker_image_name, &file.docker.image_name, deploy),
            docker_file: r.value("docker-file", &inputs.docker_file, &file.docker.file, deploy),
            docker_tag_major: r.value("docker-tag-major", &inputs.docker_tag_major, &file.docker.tag_major, deploy),
            docker_pull_secret: r.value("docker-pull-secret", &inputs.docker_pull_secret, &file.docker.pull_secret, deploy),

            helm_chart_file_path: r.value("helm-chart-file-path", &inputs.helm_chart_file_path, &file.helm.chart_file_path, deploy),
            helm_namespace: r.value("helm-namespace", &inputs.helm_namespace, &file.helm.namespace, true),
            helm_tag_major: r.value("helm-tag-major", &inputs.helm_tag_major, &file.helm.tag_major, deploy),
            helm_organization: r.value("helm-organization", &inputs.helm_organization, &file.helm.organization, false),
            helm_repo_url: pick(&inputs.helm_repo_url, &file.helm.repo_url),
            helm_repo_username: r.value("helm-repo-username", &inputs.helm_repo_username, &None, false),
            helm_repo_password: r.value("helm-repo-password", &inputs.helm_repo_password, &None, false),
            helm_remove_preview_charts: r.value(
                "helm-remove-preview-charts",
                &inputs.helm_remove_preview_charts,
                &file.helm.remove_preview_charts,
                false,
            ),
            helm_keys: Keys {
                image: pick(&inputs.helm_key_image, &None).unwrap_or(keys.image.clone()),
                namespace: pick(&inputs.helm_key_namespace, &None).unwrap_or(keys.namespace.clone()),
                pull_secret: pick(&inputs.helm_key_pull_secret, &None).unwrap_or(keys.pull_secret.clone()),
                url: pick(&inputs.helm_key_url, &None).unwrap_or(keys.url.clone()),
                app_name: pick(&inputs.helm_key_app_name, &None).unwrap_or(keys.app_name.clone()),
                container_suffix: pick(&inputs.helm_key_container_suffix, &None).unwrap_or(keys.container_suffix.clone()),
            },

            hash_salt: r.value("hash-salt", &inputs.hash_salt, &None, deploy),
            github_token: r.value("github-token", &inputs.github_token, &None, true),
            workspace: inputs.workspace.clone(),
        };

        if r.missing.is_empty() {
            Ok(options)
        } else {
            Err(Error::Missing(r.missing))
        }
    }

    /// Chart versions are only removed when asked to and there is a repository to remove them from.
    pub fn should_remove_charts(&self) -> bool {
        self.helm_remove_preview_charts.eq_ignore_ascii_case("true") && self.helm_repo_url.is_some()
    }
}

/// Empty values count as unset; CI systems pass unset inputs as empty strings.
fn pick(input: &Option<String>, file: &Option<String>) -> Option<String> {
    input
        .as_ref()
        .filter(|v| !v.is_empty())
        .or(file.as_ref().filter(|v| !v.is_empty()))
        .cloned()
}

#[derive(Default)]
struct Resolver {
    missing: Vec<&'static str>,
}

impl Resolver {
    fn value(&mut self, name: &'static str, input: &Option<String>, file: &Option<String>, required: bool) -> String {
        match pick(input, file) {
            Some(value) => value,
            None => {
                if required {
                    self.missing.push(name);
                }
                String::new()
            }
        }
    }
}
