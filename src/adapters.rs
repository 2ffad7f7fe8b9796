use std::process::Command;

use crate::domain::{Ecosystem, Environment, Machine, display_state, environment_name};
use crate::parser::{MachineRecord, StatusField, parse_machine_output};

/// The narrow contract the dashboard needs from the provisioning tool. Status
/// calls return the raw machine-readable text; callers parse it themselves so
/// fakes in tests can hand back canned protocol dumps.
pub trait ProvisionerAdapter: Send + Sync {
    fn version(&self) -> Result<String, ProvisionerError>;
    fn global_status(&self) -> Result<String, ProvisionerError>;
    fn machine_status(&self, identifier: &str) -> Result<String, ProvisionerError>;
    fn environment_status(&self, home: &str) -> Result<String, ProvisionerError>;
    fn run_command(&self, command: &str, identifier: &str) -> Result<String, ProvisionerError>;
    fn run_command_in_dir(&self, command: &str, home: &str) -> Result<String, ProvisionerError>;
    /// Hands the terminal to an interactive shell on the machine and blocks
    /// until it exits. Only success or failure is reported back.
    fn shell_session(&self, target: &ShellTarget) -> Result<(), ProvisionerError>;
}

/// Everything needed to open a shell on one machine. Docker-backed machines
/// have no ssh server, so the shell goes through `docker-exec` in the
/// project directory instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellTarget {
    pub machine_id: String,
    pub name: String,
    pub provider: String,
    pub home: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionerError {
    ToolNotFound(String),
    CommandFailed(String),
    InvalidUtf8(String),
}

impl ProvisionerError {
    pub fn message(&self) -> String {
        match self {
            Self::ToolNotFound(tool) => format!("'{tool}' binary not found in PATH"),
            Self::CommandFailed(message) => format!("command failed: {message}"),
            Self::InvalidUtf8(message) => format!("output was not valid UTF-8: {message}"),
        }
    }

    /// Only a missing tool is fatal; everything else is surfaced and the
    /// session continues.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ToolNotFound(_))
    }
}

/// Runs the real provisioning tool as a child process, one invocation per
/// call, capturing combined stdout and stderr.
pub struct CommandProvisioner {
    exec: String,
}

impl CommandProvisioner {
    /// Resolves the tool by running `--version` once. A spawn failure here is
    /// the fatal tool-not-found condition; nothing else is checked up front.
    pub fn locate(tool: &str) -> Result<(Self, String), ProvisionerError> {
        let adapter = Self {
            exec: tool.to_string(),
        };
        let version = adapter.version()?;
        Ok((adapter, version))
    }

    fn run_raw(&self, args: &[&str], dir: Option<&str>) -> Result<String, ProvisionerError> {
        let mut command = Command::new(&self.exec);
        command.args(args);
        if let Some(dir) = dir {
            command.current_dir(dir);
        }

        let output = command.output().map_err(|error| {
            if error.kind() == std::io::ErrorKind::NotFound {
                ProvisionerError::ToolNotFound(self.exec.clone())
            } else {
                ProvisionerError::CommandFailed(error.to_string())
            }
        })?;

        let mut combined = String::from_utf8(output.stdout).map_err(|error| {
            ProvisionerError::InvalidUtf8(format!("stdout decode failed: {error}"))
        })?;
        let stderr = String::from_utf8(output.stderr).map_err(|error| {
            ProvisionerError::InvalidUtf8(format!("stderr decode failed: {error}"))
        })?;
        combined.push_str(&stderr);

        if !output.status.success() {
            return Err(ProvisionerError::CommandFailed(
                combined.trim().to_string(),
            ));
        }

        Ok(combined)
    }
}

impl ProvisionerAdapter for CommandProvisioner {
    fn version(&self) -> Result<String, ProvisionerError> {
        let raw = self.run_raw(&["--version"], None)?;
        Ok(parse_version(&raw))
    }

    fn global_status(&self) -> Result<String, ProvisionerError> {
        self.run_raw(&["global-status", "--machine-readable"], None)
    }

    fn machine_status(&self, identifier: &str) -> Result<String, ProvisionerError> {
        let raw = self.run_raw(&["status", identifier, "--machine-readable"], None)?;
        // Some failures still exit zero but narrate an error; treat those as
        // failed status calls rather than feeding them to the parser.
        if raw.contains("Error") {
            return Err(ProvisionerError::CommandFailed(raw.trim().to_string()));
        }
        Ok(raw)
    }

    fn environment_status(&self, home: &str) -> Result<String, ProvisionerError> {
        self.run_raw(&["status", "--machine-readable"], Some(home))
    }

    fn run_command(&self, command: &str, identifier: &str) -> Result<String, ProvisionerError> {
        self.run_raw(&[command, identifier], None)
    }

    fn run_command_in_dir(&self, command: &str, home: &str) -> Result<String, ProvisionerError> {
        self.run_raw(&[command], Some(home))
    }

    fn shell_session(&self, target: &ShellTarget) -> Result<(), ProvisionerError> {
        let mut command = Command::new(&self.exec);
        if target.provider == "docker" {
            command.args(["docker-exec", &target.name, "-it", "--", "/bin/sh"]);
            command.current_dir(&target.home);
        } else {
            command.args(["ssh", &target.machine_id]);
        }

        let status = command.status().map_err(|error| {
            if error.kind() == std::io::ErrorKind::NotFound {
                ProvisionerError::ToolNotFound(self.exec.clone())
            } else {
                ProvisionerError::CommandFailed(error.to_string())
            }
        })?;

        if status.success() {
            Ok(())
        } else {
            Err(ProvisionerError::CommandFailed(format!(
                "shell session exited with {status}"
            )))
        }
    }
}

/// Pulls a `major.minor.patch` token out of `Vagrant 2.4.1`-style banners.
/// An unrecognized banner degrades to "N/A" rather than failing.
fn parse_version(raw: &str) -> String {
    raw.split_whitespace()
        .find(|token| {
            token.split('.').count() == 3
                && token
                    .split('.')
                    .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()))
        })
        .unwrap_or("N/A")
        .to_string()
}

/// How startup discovery went; drives the empty/error splash in the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryState {
    Ready,
    Empty,
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapData {
    pub ecosystem: Option<Ecosystem>,
    pub discovery_state: DiscoveryState,
}

/// Runs the global sweep once and turns it into the initial ecosystem. Zero
/// machines is a normal outcome, not an error.
pub fn bootstrap_data(provisioner: &dyn ProvisionerAdapter, per_page: usize) -> BootstrapData {
    match provisioner.global_status() {
        Ok(raw) => match build_ecosystem(&parse_machine_output(&raw), per_page) {
            Some(ecosystem) => BootstrapData {
                ecosystem: Some(ecosystem),
                discovery_state: DiscoveryState::Ready,
            },
            None => BootstrapData {
                ecosystem: None,
                discovery_state: DiscoveryState::Empty,
            },
        },
        Err(error) => BootstrapData {
            ecosystem: None,
            discovery_state: DiscoveryState::Error(error.message()),
        },
    }
}

/// Groups parsed records into environments by home-directory basename,
/// preserving the order machines first appeared in. Returns `None` for an
/// empty record list so callers can tell "nothing found" apart from a
/// populated world.
pub fn build_ecosystem(records: &[MachineRecord], per_page: usize) -> Option<Ecosystem> {
    if records.is_empty() {
        return None;
    }

    let machines: Vec<Machine> = records
        .iter()
        .map(|record| Machine {
            machine_id: record.machine_id.clone(),
            name: record.name.clone(),
            provider: record.field(StatusField::ProviderName).to_string(),
            state: display_state(record.field(StatusField::State)),
            home: record.field(StatusField::MachineHome).to_string(),
            selected_command: 0,
        })
        .collect();

    let mut environments: Vec<Environment> = Vec::new();
    for machine in machines {
        let group_name = environment_name(&machine.home);
        match environments
            .iter_mut()
            .find(|environment| environment.name == group_name)
        {
            Some(environment) => environment.machines.push(machine),
            None => environments.push(Environment {
                name: group_name,
                home: machine.home.clone(),
                machines: vec![machine],
                selected_command: 0,
                has_focus: true,
            }),
        }
    }

    Some(Ecosystem::new(environments, per_page))
}
