use crate::domain::{Ecosystem, EnvironmentCommand, MachineCommand, TabSelection};

/// Local input events that only move selection state. Command execution is
/// resolved separately via [`execute_disposition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavEvent {
    SelectCommandPrev,
    SelectCommandNext,
    SelectMachinePrev,
    SelectMachineNext,
    ToggleFocus,
    PageForward,
    PageBackward,
}

/// What pressing Execute means right now: flip a page, or actually run the
/// selected command against the focused target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecuteDisposition {
    AdvancePage,
    RetreatPage,
    Dispatch,
}

pub fn execute_disposition(ecosystem: &Ecosystem) -> ExecuteDisposition {
    match ecosystem.selection {
        TabSelection::More => ExecuteDisposition::AdvancePage,
        TabSelection::Back => ExecuteDisposition::RetreatPage,
        TabSelection::Env(_) => ExecuteDisposition::Dispatch,
    }
}

pub fn reduce(ecosystem: &mut Ecosystem, event: NavEvent) {
    match event {
        NavEvent::SelectCommandPrev => cycle_command(ecosystem, -1),
        NavEvent::SelectCommandNext => cycle_command(ecosystem, 1),
        NavEvent::SelectMachinePrev => cycle_machine(ecosystem, -1),
        NavEvent::SelectMachineNext => cycle_machine(ecosystem, 1),
        NavEvent::ToggleFocus => {
            if let Some(environment) = ecosystem.current_environment_mut() {
                environment.has_focus = !environment.has_focus;
            }
        }
        NavEvent::PageForward => page_forward(ecosystem),
        NavEvent::PageBackward => page_backward(ecosystem),
    }
}

fn cycle_command(ecosystem: &mut Ecosystem, direction: isize) {
    let selected_machine = ecosystem.selected_machine;
    let Some(environment) = ecosystem.current_environment_mut() else {
        return;
    };

    if environment.has_focus {
        environment.selected_command = cycle_index(
            environment.selected_command,
            EnvironmentCommand::ALL.len(),
            direction,
        );
    } else if let Some(machine) = environment.machines.get_mut(selected_machine) {
        machine.selected_command =
            cycle_index(machine.selected_command, MachineCommand::ALL.len(), direction);
    }
}

fn cycle_machine(ecosystem: &mut Ecosystem, direction: isize) {
    let selected_machine = ecosystem.selected_machine;
    let Some(environment) = ecosystem.current_environment() else {
        return;
    };
    // Machine selection only means something while the machines have focus.
    if environment.has_focus || environment.machines.is_empty() {
        return;
    }
    let machine_count = environment.machines.len();

    ecosystem.selected_machine = cycle_index(selected_machine, machine_count, direction);
}

fn cycle_index(current: usize, len: usize, direction: isize) -> usize {
    if len == 0 {
        return 0;
    }
    if direction.is_negative() {
        current.checked_sub(1).unwrap_or(len - 1)
    } else {
        (current + 1) % len
    }
}

// Forward tab order on a page is: environments, then More (when a next page
// exists), then Back (when a previous page exists), wrapping to the page's
// first environment. The edge pages drop the sentinel that has nothing
// behind it, which is what makes the wraparound asymmetric.
fn page_forward(ecosystem: &mut Ecosystem) {
    let environment_count = ecosystem.environments.len();
    if environment_count == 0 {
        return;
    }

    match ecosystem.selection {
        TabSelection::More => {
            if ecosystem.pager.has_previous_page() {
                ecosystem.selection = TabSelection::Back;
            } else {
                ecosystem.select_environment(ecosystem.pager.page_start());
            }
        }
        TabSelection::Back => {
            ecosystem.select_environment(ecosystem.pager.page_start());
        }
        TabSelection::Env(index) => {
            let page_end = ecosystem.pager.page_end(environment_count);
            if index < page_end {
                ecosystem.select_environment(index + 1);
            } else if ecosystem.pager.has_next_page() {
                ecosystem.selection = TabSelection::More;
            } else if ecosystem.pager.has_multiple_pages() {
                ecosystem.selection = TabSelection::Back;
            } else {
                ecosystem.select_environment(ecosystem.pager.page_start());
            }
        }
    }
}

fn page_backward(ecosystem: &mut Ecosystem) {
    let environment_count = ecosystem.environments.len();
    if environment_count == 0 {
        return;
    }

    match ecosystem.selection {
        TabSelection::Back => {
            if ecosystem.pager.has_next_page() {
                ecosystem.selection = TabSelection::More;
            } else {
                ecosystem.select_environment(ecosystem.pager.page_end(environment_count));
            }
        }
        TabSelection::More => {
            ecosystem.select_environment(ecosystem.pager.page_end(environment_count));
        }
        TabSelection::Env(index) => {
            let page_start = ecosystem.pager.page_start();
            if index > page_start {
                ecosystem.select_environment(index - 1);
            } else if ecosystem.pager.has_previous_page() {
                ecosystem.selection = TabSelection::Back;
            } else if ecosystem.pager.has_multiple_pages() {
                ecosystem.selection = TabSelection::More;
            } else {
                ecosystem.select_environment(ecosystem.pager.page_end(environment_count));
            }
        }
    }
}

/// Confirm the More tab: flip to the next page and land on its first
/// environment.
pub fn advance_page(ecosystem: &mut Ecosystem) {
    if !ecosystem.pager.has_next_page() {
        return;
    }
    ecosystem.pager.page += 1;
    ecosystem.select_environment(ecosystem.pager.page_start());
}

/// Confirm the Back tab: flip to the previous page and land on its last
/// environment.
pub fn retreat_page(ecosystem: &mut Ecosystem) {
    if !ecosystem.pager.has_previous_page() {
        return;
    }
    ecosystem.pager.page -= 1;
    ecosystem.select_environment(ecosystem.pager.page_end(ecosystem.environments.len()));
}
