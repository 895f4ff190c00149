//! Client for the ChartMuseum-style HTTP API of the chart repository.

use log::{debug, info};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("reqwest: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("{method} {url} returned {status}: {body}")]
    Status {
        method: &'static str,
        url: String,
        status: StatusCode,
        body: String,
    },
}

/// One published chart version.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ChartVersion {
    pub name: String,
    pub version: String,
    #[serde(default, rename = "appVersion", skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
}

pub type ChartListResult = Vec<ChartVersion>;

pub struct ChartRepository {
    client: reqwest::Client,
    url: String,
    username: String,
    password: String,
}

impl ChartRepository {
    pub fn new(url: &str, username: &str, password: &str) -> Result<Self, Error> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
            url: url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    /// All published versions of `chart`.
    pub async fn list(&self, chart: &str) -> Result<ChartListResult, Error> {
        let url = format!("{}/api/charts/{}", self.url, chart);
        debug!("GET {url}");
        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        info!("Fetch list of charts: {status}");

        if !status.is_success() {
            return Err(Error::Status {
                method: "GET",
                url,
                status,
                body: resp.text().await.unwrap_or_default(),
            });
        }

        Ok(resp.json().await?)
    }

    pub async fn delete(&self, chart: &str, version: &str) -> Result<StatusCode, Error> {
        let url = format!("{}/api/charts/{}/{}", self.url, chart, version);
        debug!("DELETE {url}");
        let resp = self.client
            .delete(&url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;
        let status = resp.status();

        if !status.is_success() {
            return Err(Error::Status {
                method: "DELETE",
                url,
                status,
                body: resp.text().await.unwrap_or_default(),
            });
        }

        Ok(status)
    }
}
