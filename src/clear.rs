use log::{error, info};
use serde::Serialize;
use thiserror::Error;
use crate::chart_repo::{self, ChartRepository, ChartVersion};
use crate::cmd::Runner;
use crate::config::runtime::Options;
use crate::github::{self, SourceControl};
use crate::{helm, naming};

#[derive(Error, Debug)]
pub enum Error {
    #[error("helm: {0}")]
    Helm(#[from] helm::Error),

    #[error("chart repository: {0}")]
    ChartRepository(#[from] chart_repo::Error),

    #[error("source control: {0}")]
    SourceControl(#[from] github::Error),

    #[error("version matcher: {0}")]
    Regex(#[from] regex::Error),
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ClearResult {
    pub success: bool,
}

/// Uninstall every preview release of the current pull request,
/// and delete its chart versions from the chart repository if asked to.
///
/// A failing uninstall is logged and the next release is processed.
/// Chart repository and source control failures abort the run.
pub async fn clear_previews(
    options: &Options,
    runner: &impl Runner,
    source_control: &impl SourceControl,
) -> Result<ClearResult, Error> {
    let pull_request_id = source_control.pull_request_id().await?;
    let matcher = naming::version_matcher(pull_request_id)?;
    let release_matcher = naming::release_matcher(&options.app_name, pull_request_id)?;

    info!("Removing previews for pull request {pull_request_id}...");
    let filter = naming::release_filter(&options.app_name, pull_request_id);
    let (list_result, releases) = helm::list(runner, &options.helm_namespace, &filter)?;
    info!("Helm list result: {}", list_result.result_code);
    info!("{}", list_result.output);

    for release in &releases {
        if !release_matcher.is_match(&release.name) {
            info!("Keeping release {}, it does not belong to pull request {pull_request_id}", release.name);
            continue;
        }
        info!("Removing release {} ({}) from Kubernetes", release.name, release.app_version);
        let result = helm::uninstall(runner, &release.name, &options.helm_namespace)?;
        if result.success() {
            info!("{}", result.output);
        } else {
            error!("{}", result.output);
        }
    }

    match (&options.helm_repo_url, options.should_remove_charts()) {
        (Some(repo_url), true) => {
            info!("Removing charts..");
            let repository = ChartRepository::new(repo_url, &options.helm_repo_username, &options.helm_repo_password)?;
            let charts = repository.list(&options.app_name).await?;
            info!("All charts: {}", describe(&charts));

            let filtered = charts
                .into_iter()
                .filter(|c| c.name == options.app_name && matcher.is_match(&c.version))
                .collect::<Vec<_>>();
            info!("Charts to delete: {}", describe(&filtered));

            for chart in &filtered {
                info!("Deleting chart {}", chart.version);
                let status = repository.delete(&chart.name, &chart.version).await?;
                info!("Delete result: {status}");
            }
            info!("Done deleting helm charts");
        }
        _ => info!("Skip removing charts.."),
    }

    info!("All previews for app {} deleted successfully!", options.app_name);
    Ok(ClearResult { success: true })
}

fn describe(charts: &[ChartVersion]) -> String {
    serde_json::to_string_pretty(charts).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeRunner, FakeSourceControl};
    use wiremock::matchers::{basic_auth, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RELEASES: &str = r#"[
        {"name":"preview-web-42-0badf00d","namespace":"previews","revision":"1","status":"deployed","chart":"web-1.17-preview.42.a1b2c3d","app_version":"2.17-preview.42.a1b2c3d"},
        {"name":"preview-web-42-deadbeef","namespace":"previews","revision":"2","status":"deployed","chart":"web-1.18-preview.42.b2c3d4e","app_version":"2.18-preview.42.b2c3d4e"},
        {"name":"preview-web-42-cafebabe","namespace":"previews","revision":"1","status":"failed","chart":"web-1.19-preview.42.c3d4e5f","app_version":"2.19-preview.42.c3d4e5f"}
    ]"#;

    fn options(repo_url: Option<String>, remove_charts: &str) -> Options {
        Options {
            app_name: "web".into(),
            helm_namespace: "previews".into(),
            helm_repo_url: repo_url,
            helm_repo_username: "ci".into(),
            helm_repo_password: "repo-pw".into(),
            helm_remove_preview_charts: remove_charts.into(),
            github_token: "token".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn every_release_is_uninstalled() {
        let runner = FakeRunner::with_releases(RELEASES);
        let result = clear_previews(&options(None, "true"), &runner, &FakeSourceControl::default()).await.unwrap();

        assert_eq!(result, ClearResult { success: true });
        assert_eq!(
            runner.command_lines(),
            vec![
                "helm list --namespace previews --filter preview-web-42 --output json",
                "helm uninstall preview-web-42-0badf00d --namespace previews",
                "helm uninstall preview-web-42-deadbeef --namespace previews",
                "helm uninstall preview-web-42-cafebabe --namespace previews",
            ]
        );
    }

    #[tokio::test]
    async fn failing_uninstall_does_not_stop_the_loop() {
        let runner = FakeRunner::with_releases(RELEASES).failing_uninstall_of("preview-web-42-0badf00d");
        let result = clear_previews(&options(None, "false"), &runner, &FakeSourceControl::default()).await.unwrap();

        assert!(result.success);
        let uninstalls = runner.command_lines().into_iter().filter(|l| l.starts_with("helm uninstall")).count();
        assert_eq!(uninstalls, 3);
    }

    #[tokio::test]
    async fn releases_of_other_pull_requests_are_kept() {
        let runner = FakeRunner::with_releases(r#"[
            {"name":"preview-web-42-0badf00d","app_version":"2.17-preview.42.a1b2c3d"},
            {"name":"preview-web-421-deadbeef","app_version":"2.3-preview.421.b2c3d4e"},
            {"name":"preview-web-4200-cafebabe","app_version":"2.9-preview.4200.c3d4e5f"}
        ]"#);
        let result = clear_previews(&options(None, "false"), &runner, &FakeSourceControl::default()).await.unwrap();

        assert!(result.success);
        assert_eq!(
            runner.command_lines(),
            vec![
                "helm list --namespace previews --filter preview-web-42 --output json",
                "helm uninstall preview-web-42-0badf00d --namespace previews",
            ]
        );
    }

    #[tokio::test]
    async fn warnings_from_helm_list_do_not_abort() {
        let runner = FakeRunner::with_releases(&format!(
            "{RELEASES}\nWARNING: Kubernetes configuration file is group-readable. This is insecure.\n"
        ));
        let result = clear_previews(&options(None, "false"), &runner, &FakeSourceControl::default()).await.unwrap();

        assert!(result.success);
        let uninstalls = runner.command_lines().into_iter().filter(|l| l.starts_with("helm uninstall")).count();
        assert_eq!(uninstalls, 3);
    }

    #[tokio::test]
    async fn no_releases() {
        let runner = FakeRunner::with_releases("[]");
        let result = clear_previews(&options(None, "false"), &runner, &FakeSourceControl::default()).await.unwrap();
        assert!(result.success);
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn unparseable_release_list_is_an_error() {
        let runner = FakeRunner::with_releases("Error: Kubernetes cluster unreachable");
        let err = clear_previews(&options(None, "false"), &runner, &FakeSourceControl::default()).await.unwrap_err();
        assert!(matches!(err, Error::Helm(helm::Error::ParseList { .. })));
    }

    #[tokio::test]
    async fn charts_are_kept_when_removal_is_disabled() {
        let server = MockServer::start().await;
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;
        Mock::given(method("DELETE")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

        let runner = FakeRunner::with_releases(RELEASES);
        let result = clear_previews(&options(Some(server.uri()), "false"), &runner, &FakeSourceControl::default())
            .await
            .unwrap();
        assert!(result.success);
    }

    #[tokio::test]
    async fn only_charts_of_this_pull_request_are_deleted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/charts/web"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"name": "web", "version": "1.17-preview.42.a1b2c3d"},
                {"name": "web", "version": "1.18-preview.42.b2c3d4e"},
                {"name": "web", "version": "1.17-preview.43.a1b2c3d"},
                {"name": "web", "version": "1.0.0"},
                {"name": "web-worker", "version": "1.17-preview.42.a1b2c3d"}
            ])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/charts/web/1.17-preview.42.a1b2c3d"))
            .and(basic_auth("ci", "repo-pw"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/charts/web/1.18-preview.42.b2c3d4e"))
            .and(basic_auth("ci", "repo-pw"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let runner = FakeRunner::with_releases("[]");
        let result = clear_previews(&options(Some(server.uri()), "True"), &runner, &FakeSourceControl::default())
            .await
            .unwrap();
        assert!(result.success);
        // expectations are verified when the server is dropped
    }

    #[tokio::test]
    async fn failing_chart_listing_aborts() {
        let server = MockServer::start().await;
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(503)).mount(&server).await;

        let runner = FakeRunner::with_releases("[]");
        let err = clear_previews(&options(Some(server.uri()), "true"), &runner, &FakeSourceControl::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ChartRepository(_)));
    }
}
