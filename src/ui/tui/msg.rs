use super::*;
use crate::adapters::BootstrapData;
use crate::parser::MachineRecord;

/// Every event the update loop handles, as one closed union. Each background
/// task resolves to exactly one of the completion variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Msg {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Tick,
    Resize { width: u16, height: u16 },
    EcosystemLoaded(EcosystemLoadCompletion),
    NameResolved(NameResolutionCompletion),
    MachineStatusRefreshed(MachineStatusCompletion),
    EnvironmentStatusRefreshed(EnvironmentStatusCompletion),
    CommandCompleted(CommandCompletion),
    ShellSessionEnded(ShellSessionCompletion),
    Noop,
}

/// Result of the startup global-status sweep. A missing ecosystem with a
/// `Ready` state never occurs; `Empty` means the sweep ran fine and found
/// nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct EcosystemLoadCompletion {
    pub(super) bootstrap: BootstrapData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct NameResolutionCompletion {
    pub(super) machine_id: String,
    pub(super) result: Result<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct MachineStatusCompletion {
    pub(super) identifier: String,
    pub(super) result: Result<MachineRecord, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct EnvironmentStatusCompletion {
    pub(super) environment: String,
    pub(super) result: Result<Vec<MachineRecord>, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum CommandTarget {
    Machine { identifier: String },
    Environment { name: String, home: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct CommandCompletion {
    pub(super) command: &'static str,
    pub(super) target: CommandTarget,
    pub(super) result: Result<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct ShellSessionCompletion {
    pub(super) machine: String,
    pub(super) result: Result<(), String>,
}

impl From<Event> for Msg {
    fn from(event: Event) -> Self {
        match event {
            Event::Key(key_event) => Self::Key(key_event),
            Event::Mouse(mouse_event) => Self::Mouse(mouse_event),
            Event::Tick => Self::Tick,
            Event::Resize { width, height } => Self::Resize { width, height },
            _ => Self::Noop,
        }
    }
}
