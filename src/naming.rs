//! Names shared by the deploy and clear flows.
//!
//! Tags, release names and the version matcher must agree, otherwise
//! `clear` cannot find what `deploy` created.

use regex::Regex;

pub const PREVIEW_TAG_PREFIX: &str = "-preview";

/// `-preview.<pull_request_id>.<sha7>`, shared by the image tag and the chart version.
pub fn tag_postfix(pull_request_id: u64, sha7: &str) -> String {
    format!("{PREVIEW_TAG_PREFIX}.{pull_request_id}.{sha7}")
}

/// `<major>.<run_number><postfix>`
pub fn version(major: &str, run_number: u64, postfix: &str) -> String {
    format!("{major}.{run_number}{postfix}")
}

/// `<registry>/<organization>/<image>`
pub fn image_name(registry: &str, organization: &str, image: &str) -> String {
    format!("{registry}/{organization}/{image}")
}

/// Name of the archive `helm pack` writes for the chart at `chart_path`.
pub fn chart_archive(chart_path: &str, chart_version: &str) -> String {
    let chart_name = chart_path
        .trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(chart_path);
    format!("{chart_name}-{chart_version}.tgz")
}

/// Names of a single preview environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    /// `<app>-<pr>-<hash>`, used as the host label and as the app name inside the chart.
    pub identifier: String,
    pub url: String,
    pub release_name: String,
}

impl Preview {
    pub fn new(app_name: &str, pull_request_id: u64, hash: &str, base_url: &str) -> Self {
        let identifier = format!("{app_name}-{pull_request_id}-{hash}");
        Self {
            url: format!("{identifier}.{base_url}"),
            release_name: format!("preview-{identifier}"),
            identifier,
        }
    }
}

/// Prefix of every release name deployed for this app and pull request.
pub fn release_filter(app_name: &str, pull_request_id: u64) -> String {
    format!("preview-{app_name}-{pull_request_id}")
}

/// Matches exactly the release names `Preview::new` produces for this app and pull request.
///
/// `helm list --filter` is an unanchored regex, so `preview-web-42` also lists
/// the releases of pull request 421; this is used to drop those.
pub fn release_matcher(app_name: &str, pull_request_id: u64) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        "^{}-[0-9a-f]+$",
        regex::escape(&release_filter(app_name, pull_request_id))
    ))
}

/// Matches chart versions tagged for `pull_request_id`, e.g. `1.7-preview.42.a1b2c3d`.
pub fn version_matcher(pull_request_id: u64) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r"\b{}\.{}\.\b",
        regex::escape(PREVIEW_TAG_PREFIX),
        pull_request_id
    ))
}
