use crate::domain::{Ecosystem, Machine, TabSelection, display_state};
use crate::parser::{MachineRecord, StatusField};

/// Applies a per-machine status refresh. The update matches on either the
/// machine id or the name, because `status <id>` responses carry the name
/// while the startup sweep only knows ids. Individual status calls never
/// report the home directory, so `home` (and the id) are retained from the
/// existing machine; the command cursor resets.
///
/// Returns false when no machine matches anymore; the world may have moved
/// on between dispatch and completion, and a stale update is simply dropped.
pub fn apply_machine_status(
    ecosystem: &mut Ecosystem,
    identifier: &str,
    status: &MachineRecord,
) -> bool {
    let mut merged = false;

    for environment in &mut ecosystem.environments {
        for machine in &mut environment.machines {
            if machine.machine_id != identifier && machine.name != identifier {
                continue;
            }

            machine.name = status.name.clone();
            machine.provider = status.field(StatusField::ProviderName).to_string();
            machine.state = display_state(status.field(StatusField::State));
            machine.selected_command = 0;
            merged = true;
        }
    }

    merged
}

/// Applies an environment-wide status refresh by rebuilding that
/// environment's machine list wholesale from the reported records. Every
/// machine inherits the environment's home; nothing else survives.
pub fn apply_environment_status(
    ecosystem: &mut Ecosystem,
    environment_name: &str,
    records: &[MachineRecord],
) -> bool {
    let Some((index, environment)) = ecosystem
        .environments
        .iter_mut()
        .enumerate()
        .find(|(_, environment)| environment.name == environment_name)
    else {
        return false;
    };

    let home = environment.home.clone();
    environment.machines = records
        .iter()
        .map(|record| Machine {
            machine_id: record.machine_id.clone(),
            name: record.name.clone(),
            provider: record.field(StatusField::ProviderName).to_string(),
            state: display_state(record.field(StatusField::State)),
            home: home.clone(),
            selected_command: 0,
        })
        .collect();
    let machine_count = environment.machines.len();

    // The machine cursor may now point past the rebuilt list.
    if ecosystem.selection == TabSelection::Env(index) && ecosystem.selected_machine >= machine_count
    {
        ecosystem.selected_machine = 0;
    }

    true
}

/// Records a resolved display name for a machine discovered by id only.
pub fn apply_resolved_name(ecosystem: &mut Ecosystem, machine_id: &str, name: &str) -> bool {
    let mut merged = false;

    for environment in &mut ecosystem.environments {
        for machine in &mut environment.machines {
            if machine.machine_id == machine_id {
                machine.name = name.to_string();
                merged = true;
            }
        }
    }

    merged
}
