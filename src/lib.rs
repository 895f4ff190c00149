//! Pull request preview environments on Kubernetes.
//!
//! `deploy` builds an image and a chart tagged for the pull request and installs
//! them as a Helm release with its own URL. `clear` removes those releases again,
//! and optionally the chart versions published for the pull request.

pub mod chart_repo;
pub mod clear;
pub mod cmd;
pub mod config;
pub mod deploy;
pub mod docker;
pub mod github;
pub mod hash;
pub mod helm;
pub mod naming;

#[cfg(test)]
mod testing;
