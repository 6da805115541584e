use std::io::Write;
use std::process::{Command, Output, Stdio};
use std::thread;

use ecv_types::{NodeKind, NodeRef};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{TransportError, TransportResult};
use crate::output::ToolOutput;
use crate::traits::NodeTransport;

/// How a command line reaches the node's storage backend.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Launcher {
    /// Run the command directly on this machine.
    #[default]
    Local,
    /// `sudo adjust-ulimits <args>` on this machine.
    Sudo,
    /// `ssh [user@]host <args>`; the node must carry a host.
    Ssh { user: Option<String> },
    /// `sudo <binary> --image <image> shell [-n osd.N] --fsid <fsid> -- <args>`.
    Cephadm {
        binary: String,
        image: String,
        fsid: String,
    },
}

impl Launcher {
    /// Full argv for running `args` on `node`.
    pub fn command_line(&self, node: &NodeRef, args: &[String]) -> TransportResult<Vec<String>> {
        if args.is_empty() {
            return Err(TransportError::EmptyCommand);
        }
        let argv = match self {
            Self::Local => args.to_vec(),
            Self::Sudo => ["sudo", "adjust-ulimits"]
                .iter()
                .map(|s| s.to_string())
                .chain(args.iter().cloned())
                .collect(),
            Self::Ssh { user } => {
                let host = node
                    .host
                    .as_deref()
                    .ok_or_else(|| TransportError::MissingHost(node.to_string()))?;
                let target = match user {
                    Some(user) => format!("{user}@{host}"),
                    None => host.to_string(),
                };
                let remote = args.iter().map(|a| shell_quote(a)).collect::<Vec<_>>().join(" ");
                vec!["ssh".into(), target, remote]
            }
            Self::Cephadm { binary, image, fsid } => {
                let mut argv = vec![
                    "sudo".to_string(),
                    binary.clone(),
                    "--image".into(),
                    image.clone(),
                    "shell".into(),
                ];
                if let NodeKind::Osd(_) = node.kind {
                    argv.push("-n".into());
                    argv.push(node.daemon_name());
                }
                argv.extend(["--fsid".to_string(), fsid.clone(), "--".into()]);
                argv.extend(args.iter().cloned());
                argv
            }
        };
        Ok(argv)
    }

    /// Whether a path written on this machine names the same file for
    /// commands run through this launcher.
    pub fn shares_filesystem(&self) -> bool {
        matches!(self, Self::Local | Self::Sudo)
    }

    /// Whether a file one command writes on a node is still there for the
    /// next command on that node. Every `cephadm shell` starts a fresh
    /// container.
    pub fn keeps_files(&self) -> bool {
        !matches!(self, Self::Cephadm { .. })
    }
}

/// Transport that spawns processes on this machine.
#[derive(Clone, Debug, Default)]
pub struct ProcessTransport {
    launcher: Launcher,
}

impl ProcessTransport {
    pub fn new(launcher: Launcher) -> Self {
        Self { launcher }
    }

    pub fn launcher(&self) -> &Launcher {
        &self.launcher
    }
}

impl ProcessTransport {
    fn spawn(&self, node: &NodeRef, args: &[String], input: Option<&[u8]>) -> TransportResult<ToolOutput> {
        let argv = self.launcher.command_line(node, args)?;
        let (program, rest) = argv.split_first().ok_or(TransportError::EmptyCommand)?;
        debug!(
            node = %node,
            program = %program,
            args = ?rest,
            stdin_len = ?input.map(<[u8]>::len),
            "running command"
        );

        let spawn_err = |source| TransportError::Spawn {
            program: program.clone(),
            source,
        };
        let output = match input {
            None => Command::new(program).args(rest).output().map_err(spawn_err)?,
            Some(input) => {
                let mut child = Command::new(program)
                    .args(rest)
                    .stdin(Stdio::piped())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped())
                    .spawn()
                    .map_err(spawn_err)?;
                let stdin = child.stdin.take();
                // The child may fill stdout before it drains stdin.
                let (written, output) = thread::scope(|scope| {
                    let writer = scope.spawn(move || match stdin {
                        Some(mut stdin) => stdin.write_all(input),
                        None => Ok(()),
                    });
                    let output = child.wait_with_output();
                    (writer.join(), output)
                });
                let output = output.map_err(spawn_err)?;
                match written {
                    Ok(Ok(())) => {}
                    // A child that exits early closes its stdin; its exit
                    // status is the more useful report.
                    Ok(Err(_)) if !output.status.success() => {}
                    Ok(Err(source)) => {
                        return Err(TransportError::Stdin {
                            program: program.clone(),
                            source,
                        })
                    }
                    Err(_) => {
                        return Err(TransportError::Stdin {
                            program: program.clone(),
                            source: std::io::Error::other("stdin writer panicked"),
                        })
                    }
                }
                output
            }
        };

        debug!(
            node = %node,
            status = ?output.status.code(),
            stdout_len = output.stdout.len(),
            "command finished"
        );
        Ok(tool_output(output))
    }
}

impl NodeTransport for ProcessTransport {
    fn run(&self, node: &NodeRef, args: &[String]) -> TransportResult<ToolOutput> {
        self.spawn(node, args, None)
    }

    fn run_with_input(&self, node: &NodeRef, args: &[String], input: &[u8]) -> TransportResult<ToolOutput> {
        self.spawn(node, args, Some(input))
    }
}

fn tool_output(output: Output) -> ToolOutput {
    ToolOutput {
        stdout: output.stdout,
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        exit_code: output.status.code(),
    }
}

/// Quote an argument for a POSIX shell unless it is obviously safe.
fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=,:@%+".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
