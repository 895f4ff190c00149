use serde::Deserialize;
use serde_inline_default::serde_inline_default;
use thiserror::Error;

const DEFAULT_CONFIG: &str = include_str!("../../default.toml");

#[derive(Error, Debug)]
pub enum Error {
    #[error("read {path}: {err}")]
    ReadFile {
        err: std::io::Error,
        path: String,
    },

    #[error("parse: {0}")]
    Parse(#[from] toml::de::Error),
}

/// A helm-preview.toml file.
///
/// Holds everything that is not a secret. Credentials, tokens and the hash salt
/// are only accepted as flags or environment variables.
#[derive(Deserialize, Debug)]
pub struct File {
    pub description: Option<String>,
    #[serde(default)]
    pub app: App,
    #[serde(default)]
    pub docker: Docker,
    #[serde(default)]
    pub helm: Helm,
}

impl Default for File {
    fn default() -> Self {
        // The default config is compiled into the program, so
        // make sure to test default() to catch panics compile-time.
        toml::from_str(DEFAULT_CONFIG).unwrap()
    }
}

impl File {
    /// Merge a user configuration file on top of the built-in defaults.
    ///
    /// Tables are merged key by key, so a user file only needs to
    /// contain the values it changes.
    pub fn default_with_user_config_file(path: &str) -> Result<Self, Error> {
        let user_config = std::fs::read_to_string(path).map_err(|err| Error::ReadFile {
            err,
            path: path.to_string(),
        })?;
        Self::default_with_user_config(&user_config)
    }

    pub fn default_with_user_config(user_config: &str) -> Result<Self, Error> {
        let mut merged: toml::Table = toml::from_str(DEFAULT_CONFIG)?;
        let user: toml::Table = toml::from_str(user_config)?;
        merge(&mut merged, user);
        Ok(toml::Value::Table(merged).try_into()?)
    }
}

fn merge(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match value {
            toml::Value::Table(overlay_table) => match base.get_mut(&key) {
                Some(toml::Value::Table(base_table)) => merge(base_table, overlay_table),
                _ => {
                    base.insert(key, toml::Value::Table(overlay_table));
                }
            },
            value => {
                base.insert(key, value);
            }
        }
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct App {
    pub name: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct Docker {
    pub registry: Option<String>,
    pub organization: Option<String>,
    pub image_name: Option<String>,
    pub file: Option<String>,
    pub tag_major: Option<String>,
    pub pull_secret: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct Helm {
    pub chart_file_path: Option<String>,
    pub namespace: Option<String>,
    pub tag_major: Option<String>,
    /// Name the chart repository is registered under with `helm repo add`,
    /// and the repository `helm push` uploads to. Both must use the same
    /// name, so there is no separate fixed repository name.
    pub organization: Option<String>,
    pub repo_url: Option<String>,
    pub remove_preview_charts: Option<String>,
    #[serde(default)]
    pub keys: Keys,
}

/// Chart value names the preview overrides.
#[serde_inline_default]
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Keys {
    #[serde_inline_default("image".to_string())]
    pub image: String,
    #[serde_inline_default("namespace".to_string())]
    pub namespace: String,
    #[serde_inline_default("imagePullSecret".to_string())]
    pub pull_secret: String,
    #[serde_inline_default("url".to_string())]
    pub url: String,
    #[serde_inline_default("appName".to_string())]
    pub app_name: String,
    #[serde_inline_default("containerSuffix".to_string())]
    pub container_suffix: String,
}

impl Default for Keys {
    fn default() -> Self {
        Self {
            image: "image".to_string(),
            namespace: "namespace".to_string(),
            pull_secret: "imagePullSecret".to_string(),
            url: "url".to_string(),
            app_name: "appName".to_string(),
            container_suffix: "containerSuffix".to_string(),
        }
    }
}
