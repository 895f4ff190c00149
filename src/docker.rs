use log::debug;
use thiserror::Error;
use crate::cmd::{self, CommandResult, Invocation, Runner};

#[derive(Error, Debug)]
pub enum Error {
    #[error("docker login to {registry} failed with exit code {code}: {output}")]
    Login {
        registry: String,
        code: i32,
        output: String,
    },

    #[error(transparent)]
    Command(#[from] cmd::Error),
}

/// Log in to a container registry, passing the password on standard input.
pub fn login(runner: &impl Runner, registry: &str, username: &str, password: &str) -> Result<(), Error> {
    debug!("Logging in to Docker registry {}", registry);
    let result = runner.run(
        &Invocation::new("docker")
            .arg("login")
            .arg(registry)
            .arg("--username")
            .arg(username)
            .arg("--password-stdin")
            .stdin(password),
    )?;

    if result.success() {
        Ok(())
    } else {
        Err(Error::Login {
            registry: registry.to_string(),
            code: result.result_code,
            output: result.output,
        })
    }
}

pub fn build(runner: &impl Runner, context_dir: &str, tag: &str, docker_file: &str) -> Result<CommandResult, Error> {
    Ok(runner.run(
        &Invocation::new("docker")
            .arg("build")
            .arg(context_dir)
            .arg("-t")
            .arg(tag)
            .arg("-f")
            .arg(docker_file),
    )?)
}

pub fn push(runner: &impl Runner, image_name: &str) -> Result<CommandResult, Error> {
    debug!("Pushing image {}", image_name);
    Ok(runner.run(&Invocation::new("docker").arg("push").arg(image_name))?)
}
