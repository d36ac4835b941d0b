use crate::error::{Result, UpdaterError};
use crate::project::Action;
use colored::Colorize;
use std::io::{BufRead, BufReader};
use std::process::{Command, Stdio};

/// Executes phase actions in order, stopping at the first failure.
pub struct CommandRunnerAgent {
    echo_output: bool,
}

impl CommandRunnerAgent {
    /// Runner that streams command output to the terminal.
    pub fn new() -> Self {
        Self { echo_output: true }
    }

    /// Runner that swallows command output, keeping it for debug logs only.
    pub fn quiet() -> Self {
        Self { echo_output: false }
    }

    pub fn run_all(&self, actions: &[Action]) -> Result<()> {
        for action in actions {
            self.run(action)?;
        }
        Ok(())
    }

    pub fn run(&self, action: &Action) -> Result<()> {
        match action {
            Action::Shell(command) => self.run_shell(command),
            Action::Native { label, task } => {
                if self.echo_output {
                    println!("{} {}", "Running:".dimmed(), label);
                }
                tracing::debug!(task = %label, "running native task");
                task()
            }
        }
    }

    /// Run a command line through `sh -c` with live output streaming.
    fn run_shell(&self, command_line: &str) -> Result<()> {
        if self.echo_output {
            println!("{} {}", "Executing:".dimmed(), command_line);
        }
        tracing::debug!(command = command_line, "spawning shell command");

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command_line)
            .stdout(Stdio::piped())
            .stderr(if self.echo_output {
                Stdio::inherit()
            } else {
                Stdio::null()
            })
            .spawn()
            .map_err(|e| {
                UpdaterError::Io(std::io::Error::other(format!(
                    "Failed to spawn '{command_line}': {e}"
                )))
            })?;

        // Drain stdout to EOF; output is not guaranteed to be UTF-8 and an
        // early close would kill the child with SIGPIPE.
        if let Some(stdout) = child.stdout.take() {
            let mut reader = BufReader::new(stdout);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf) {
                    Ok(0) => break,
                    Ok(_) => {
                        let line = String::from_utf8_lossy(&buf);
                        let line = line.trim_end_matches(['\n', '\r']);
                        if self.echo_output {
                            println!("{}", line);
                        } else {
                            tracing::trace!(output = %line);
                        }
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to read command output");
                        break;
                    }
                }
            }
        }

        let status = child.wait()?;
        if !status.success() {
            return Err(UpdaterError::CommandFailed {
                command: command_line.to_string(),
                code: status.code().unwrap_or(-1),
            });
        }

        Ok(())
    }
}

impl Default for CommandRunnerAgent {
    fn default() -> Self {
        Self::new()
    }
}
