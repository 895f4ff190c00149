use std::fmt::{Display, Formatter};
use std::io::{ErrorKind, Write};
use std::process::Stdio;
use log::{debug, warn};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("spawn {program}: {err}")]
    Spawn {
        err: std::io::Error,
        program: String,
    },

    #[error(transparent)]
    IOError(#[from] std::io::Error),
}

/// Outcome of a single external process.
///
/// A non-zero `result_code` is not an error; callers decide what it means.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandResult {
    pub result_code: i32,
    pub output: String,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.result_code == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Arg {
    value: String,
    secret: bool,
}

/// A program, its arguments and optional standard input.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    program: String,
    args: Vec<Arg>,
    stdin: Option<String>,
}

impl Invocation {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: vec![],
            stdin: None,
        }
    }

    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(Arg { value: value.into(), secret: false });
        self
    }

    pub fn args<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for value in values {
            self = self.arg(value);
        }
        self
    }

    /// Like `arg`, but masked when the invocation is printed.
    pub fn secret_arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(Arg { value: value.into(), secret: true });
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arg_values(&self) -> Vec<&str> {
        self.args.iter().map(|a| a.value.as_str()).collect()
    }

    pub fn stdin_input(&self) -> Option<&str> {
        self.stdin.as_deref()
    }
}

impl Display for Invocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.secret {
                f.write_str(" ***")?;
            } else {
                write!(f, " {}", arg.value)?;
            }
        }
        Ok(())
    }
}

/// Executes external programs on behalf of the preview flows.
pub trait Runner {
    fn run(&self, invocation: &Invocation) -> Result<CommandResult, Error>;
}

/// Runs programs on the host with `std::process`.
#[derive(Default, Debug, Clone, Copy)]
pub struct System;

impl Runner for System {
    fn run(&self, invocation: &Invocation) -> Result<CommandResult, Error> {
        debug!("Running {}", invocation);

        let mut child = std::process::Command::new(&invocation.program)
            .args(invocation.args.iter().map(|a| &a.value))
            .stdin(if invocation.stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| Error::Spawn {
                err,
                program: invocation.program.clone(),
            })?;

        let stdin = child.stdin.take();
        // stdin is fed from its own thread while stdout and stderr are drained
        let output = std::thread::scope(|scope| {
            if let (Some(input), Some(mut stdin)) = (&invocation.stdin, stdin) {
                scope.spawn(move || {
                    // the child may exit without reading all of its input
                    if let Err(err) = stdin.write_all(input.as_bytes()) {
                        if err.kind() != ErrorKind::BrokenPipe {
                            warn!("write stdin of {}: {}", invocation.program, err);
                        }
                    }
                    // stdin is dropped here so the child sees EOF
                });
            }
            child.wait_with_output()
        })?;
        let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(CommandResult {
            // killed by a signal
            result_code: output.status.code().unwrap_or(-1),
            output: combined,
        })
    }
}
