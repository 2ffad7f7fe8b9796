use std::sync::{Arc, Mutex};

use ftui::core::event::{KeyCode, KeyEvent, KeyEventKind};
use ftui::{Cmd, Frame, GraphemePool};
use proptest::prelude::*;

use super::{Msg, PaddockApp};
use crate::adapters::{ProvisionerAdapter, ProvisionerError, ShellTarget, bootstrap_data};
use crate::domain::TabSelection;
use crate::event_log::{Event as LoggedEvent, EventLogger, NullEventLogger};
use crate::parser::parse_machine_output;
use crate::ui::tui::msg::{
    CommandCompletion, CommandTarget, EcosystemLoadCompletion, EnvironmentStatusCompletion,
    MachineStatusCompletion, NameResolutionCompletion, ShellSessionCompletion,
};

const GLOBAL_STATUS: &str = "\
1,,machine-id,aaa111
1,,provider-name,libvirt
1,,state,running
1,,machine-home,/h/env1
1,,machine-id,bbb222
1,,provider-name,libvirt
1,,state,power_off
1,,machine-home,/h/env1
1,,machine-id,ccc333
1,,provider-name,virtualbox
1,,state,running
1,,machine-home,/h/env2
";

const MACHINE_STATUS: &str = "\
1,web,metadata,provider,libvirt
2,web,provider-name,libvirt
3,web,state,running
4,web,state-human-long,The machine is running.
";

const ENV_STATUS: &str = "\
1,web,metadata,provider,libvirt
2,web,provider-name,libvirt
3,web,state,running
";

struct FakeProvisioner {
    global_status: Result<String, ProvisionerError>,
    machine_status: Result<String, ProvisionerError>,
    environment_status: Result<String, ProvisionerError>,
    run_result: Result<String, ProvisionerError>,
    calls: Mutex<Vec<String>>,
}

impl Default for FakeProvisioner {
    fn default() -> Self {
        Self {
            global_status: Ok(GLOBAL_STATUS.to_string()),
            machine_status: Ok(MACHINE_STATUS.to_string()),
            environment_status: Ok(ENV_STATUS.to_string()),
            run_result: Ok("Bringing machine 'web' up...\nMachine booted.\n".to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeProvisioner {
    fn record(&self, call: String) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

impl ProvisionerAdapter for FakeProvisioner {
    fn version(&self) -> Result<String, ProvisionerError> {
        Ok("2.4.1".to_string())
    }

    fn global_status(&self) -> Result<String, ProvisionerError> {
        self.record("global-status".to_string());
        self.global_status.clone()
    }

    fn machine_status(&self, identifier: &str) -> Result<String, ProvisionerError> {
        self.record(format!("status {identifier}"));
        self.machine_status.clone()
    }

    fn environment_status(&self, home: &str) -> Result<String, ProvisionerError> {
        self.record(format!("status in {home}"));
        self.environment_status.clone()
    }

    fn run_command(&self, command: &str, identifier: &str) -> Result<String, ProvisionerError> {
        self.record(format!("{command} {identifier}"));
        self.run_result.clone()
    }

    fn run_command_in_dir(&self, command: &str, home: &str) -> Result<String, ProvisionerError> {
        self.record(format!("{command} in {home}"));
        self.run_result.clone()
    }

    fn shell_session(&self, target: &ShellTarget) -> Result<(), ProvisionerError> {
        self.record(format!("shell {}", target.machine_id));
        Ok(())
    }
}

struct RecordingEventLogger {
    events: Arc<Mutex<Vec<LoggedEvent>>>,
}

impl EventLogger for RecordingEventLogger {
    fn log(&self, event: LoggedEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

fn fixture_app() -> (PaddockApp, Arc<FakeProvisioner>) {
    let fake = Arc::new(FakeProvisioner::default());
    let app = PaddockApp::new(
        Arc::clone(&fake) as Arc<dyn ProvisionerAdapter>,
        "2.4.1".to_string(),
        5,
        Box::new(NullEventLogger),
    );
    (app, fake)
}

fn loaded_app() -> (PaddockApp, Arc<FakeProvisioner>) {
    let (mut app, fake) = fixture_app();
    let bootstrap = bootstrap_data(fake.as_ref(), 5);
    let _ = app.update_model(Msg::EcosystemLoaded(EcosystemLoadCompletion { bootstrap }));
    (app, fake)
}

fn key_press(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code).with_kind(KeyEventKind::Press)
}

fn cmd_contains_task(cmd: &Cmd<Msg>) -> bool {
    match cmd {
        Cmd::Task(_, _) => true,
        Cmd::Batch(commands) | Cmd::Sequence(commands) => commands.iter().any(cmd_contains_task),
        _ => false,
    }
}

fn with_rendered_frame(app: &PaddockApp, width: u16, height: u16, assert_frame: impl FnOnce(&Frame)) {
    let mut pool = GraphemePool::new();
    let mut frame = Frame::new(width, height, &mut pool);
    ftui::Model::view(app, &mut frame);
    assert_frame(&frame);
}

fn row_text(frame: &Frame, y: u16) -> String {
    (0..frame.buffer.width())
        .filter_map(|x| {
            frame
                .buffer
                .get(x, y)
                .and_then(|cell| cell.content.as_char())
        })
        .collect::<String>()
        .trim_end()
        .to_string()
}

fn find_row_containing(frame: &Frame, text: &str) -> Option<u16> {
    (0..frame.buffer.height()).find(|&y| row_text(frame, y).contains(text))
}

fn first_machine_status() -> MachineStatusCompletion {
    MachineStatusCompletion {
        identifier: "aaa111".to_string(),
        result: parse_machine_output(MACHINE_STATUS)
            .into_iter()
            .next()
            .ok_or_else(|| "fixture should parse".to_string()),
    }
}

#[test]
fn ecosystem_load_populates_state_and_queues_name_lookups() {
    let (mut app, fake) = fixture_app();
    let bootstrap = bootstrap_data(fake.as_ref(), 5);

    let cmd = app.update_model(Msg::EcosystemLoaded(EcosystemLoadCompletion { bootstrap }));

    let ecosystem = app.ecosystem.as_ref().expect("ecosystem should be loaded");
    assert_eq!(ecosystem.environments.len(), 2);
    assert_eq!(ecosystem.environments[0].name, "env1");
    assert_eq!(ecosystem.environments[0].machines.len(), 2);
    assert_eq!(ecosystem.environments[1].name, "env2");

    // One name lookup per machine discovered by id only.
    assert_eq!(app.pending_name_lookups, 3);
    assert!(cmd_contains_task(&cmd));
}

#[test]
fn name_resolution_attaches_names_in_any_order() {
    let (mut app, _fake) = loaded_app();

    let _ = app.update_model(Msg::NameResolved(NameResolutionCompletion {
        machine_id: "bbb222".to_string(),
        result: Ok("db".to_string()),
    }));
    let _ = app.update_model(Msg::NameResolved(NameResolutionCompletion {
        machine_id: "aaa111".to_string(),
        result: Ok("web".to_string()),
    }));

    let ecosystem = app.ecosystem.as_ref().expect("ecosystem should be loaded");
    assert_eq!(ecosystem.environments[0].machines[0].name, "web");
    assert_eq!(ecosystem.environments[0].machines[1].name, "db");
    assert_eq!(app.pending_name_lookups, 1);
}

#[test]
fn failed_name_resolution_is_surfaced_not_fatal() {
    let (mut app, _fake) = loaded_app();

    let _ = app.update_model(Msg::NameResolved(NameResolutionCompletion {
        machine_id: "aaa111".to_string(),
        result: Err("machine vanished".to_string()),
    }));

    assert!(app.ecosystem.is_some());
    assert!(
        app.last_error
            .as_ref()
            .is_some_and(|message| message.contains("machine vanished"))
    );
}

#[test]
fn execute_on_a_focused_environment_dispatches_and_shows_the_spinner() {
    let (mut app, _fake) = loaded_app();

    let cmd = app.update_model(Msg::Key(key_press(KeyCode::Enter)));

    let pending = app
        .pending_command
        .as_ref()
        .expect("a command should be in flight");
    assert_eq!(pending.command, "up");
    assert_eq!(pending.target, "env1");
    assert!(cmd_contains_task(&cmd));
}

#[test]
fn execute_on_a_machine_uses_the_machine_command_list() {
    let (mut app, _fake) = loaded_app();

    // Focus the machines and pick halt (index 1).
    let _ = app.update_model(Msg::Key(key_press(KeyCode::Char(' '))));
    let _ = app.update_model(Msg::Key(key_press(KeyCode::Right)));
    let cmd = app.update_model(Msg::Key(key_press(KeyCode::Enter)));

    let pending = app
        .pending_command
        .as_ref()
        .expect("a command should be in flight");
    assert_eq!(pending.command, "halt");
    assert_eq!(pending.target, "aaa111");
    assert!(cmd_contains_task(&cmd));
}

#[test]
fn command_completion_stores_output_and_queues_a_status_refresh() {
    let (mut app, _fake) = loaded_app();
    let _ = app.update_model(Msg::Key(key_press(KeyCode::Enter)));

    let cmd = app.update_model(Msg::CommandCompleted(CommandCompletion {
        command: "up",
        target: CommandTarget::Machine {
            identifier: "aaa111".to_string(),
        },
        result: Ok("Machine booted.\n".to_string()),
    }));

    assert_eq!(app.last_output.as_deref(), Some("Machine booted.\n"));
    // The spinner stays up until the follow-up status merge lands.
    assert!(app.pending_command.is_some());
    assert!(cmd_contains_task(&cmd));
}

#[test]
fn command_failure_surfaces_the_error_and_skips_the_refresh() {
    let (mut app, _fake) = loaded_app();
    let _ = app.update_model(Msg::Key(key_press(KeyCode::Enter)));

    let cmd = app.update_model(Msg::CommandCompleted(CommandCompletion {
        command: "up",
        target: CommandTarget::Machine {
            identifier: "aaa111".to_string(),
        },
        result: Err("exited with status 1".to_string()),
    }));

    assert!(app.pending_command.is_none());
    assert!(
        app.last_error
            .as_ref()
            .is_some_and(|message| message.contains("exited with status 1"))
    );
    assert!(!cmd_contains_task(&cmd));
}

#[test]
fn machine_status_refresh_merges_and_clears_the_spinner() {
    let (mut app, _fake) = loaded_app();
    let _ = app.update_model(Msg::Key(key_press(KeyCode::Enter)));

    let _ = app.update_model(Msg::MachineStatusRefreshed(first_machine_status()));

    assert!(app.pending_command.is_none());
    let machine = &app.ecosystem.as_ref().expect("ecosystem")
        .environments[0]
        .machines[0];
    assert_eq!(machine.name, "web");
    assert_eq!(machine.home, "/h/env1");
    assert_eq!(machine.selected_command, 0);
}

#[test]
fn stale_machine_status_is_dropped_without_error() {
    let (mut app, _fake) = loaded_app();
    let before = app.ecosystem.clone();

    let _ = app.update_model(Msg::MachineStatusRefreshed(MachineStatusCompletion {
        identifier: "gone999".to_string(),
        result: parse_machine_output(MACHINE_STATUS)
            .into_iter()
            .next()
            .ok_or_else(|| "fixture should parse".to_string()),
    }));

    assert_eq!(app.ecosystem, before);
    assert!(app.last_error.is_none());
}

#[test]
fn environment_status_refresh_replaces_the_machine_list() {
    let (mut app, _fake) = loaded_app();

    let _ = app.update_model(Msg::EnvironmentStatusRefreshed(EnvironmentStatusCompletion {
        environment: "env1".to_string(),
        result: Ok(parse_machine_output(ENV_STATUS)),
    }));

    let environment = &app.ecosystem.as_ref().expect("ecosystem").environments[0];
    assert_eq!(environment.machines.len(), 1);
    assert_eq!(environment.machines[0].name, "web");
    assert_eq!(environment.machines[0].home, "/h/env1");
}

#[test]
fn shell_session_failure_lands_in_the_error_region() {
    let (mut app, _fake) = loaded_app();

    let _ = app.update_model(Msg::ShellSessionEnded(ShellSessionCompletion {
        machine: "web".to_string(),
        result: Err("shell session exited with exit status: 255".to_string()),
    }));

    assert!(
        app.last_error
            .as_ref()
            .is_some_and(|message| message.contains("255"))
    );
}

#[test]
fn ticks_only_animate_while_a_command_is_in_flight() {
    let (mut app, _fake) = loaded_app();

    let idle_cmd = app.update_model(Msg::Tick);
    assert!(matches!(idle_cmd, Cmd::None));
    assert_eq!(app.spinner_frame, 0);

    let _ = app.update_model(Msg::Key(key_press(KeyCode::Enter)));
    let busy_frame = app.spinner_frame;
    let busy_cmd = app.update_model(Msg::Tick);
    assert_eq!(app.spinner_frame, busy_frame + 1);
    assert!(!matches!(busy_cmd, Cmd::None));
}

#[test]
fn executing_the_more_tab_flips_the_page_without_dispatching() {
    let (mut app, _fake) = fixture_app();
    // Seven environments across two pages.
    let mut output = String::new();
    for index in 0..7 {
        output.push_str(&format!(
            "1,,machine-id,id{index}\n1,,provider-name,libvirt\n1,,state,running\n1,,machine-home,/h/env{index}\n"
        ));
    }
    let bootstrap = crate::adapters::build_ecosystem(&parse_machine_output(&output), 5)
        .map(|ecosystem| crate::adapters::BootstrapData {
            ecosystem: Some(ecosystem),
            discovery_state: crate::adapters::DiscoveryState::Ready,
        })
        .expect("fixture should build");
    let _ = app.update_model(Msg::EcosystemLoaded(EcosystemLoadCompletion { bootstrap }));

    {
        let ecosystem = app.ecosystem.as_mut().expect("ecosystem");
        ecosystem.selection = TabSelection::More;
    }

    let _ = app.update_model(Msg::Key(key_press(KeyCode::Enter)));

    let ecosystem = app.ecosystem.as_ref().expect("ecosystem");
    assert_eq!(ecosystem.pager.page, 1);
    assert_eq!(ecosystem.selection, TabSelection::Env(5));
    assert!(app.pending_command.is_none());
}

#[test]
fn events_are_logged_for_dispatch_and_completion() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let fake = Arc::new(FakeProvisioner::default());
    let mut app = PaddockApp::new(
        Arc::clone(&fake) as Arc<dyn ProvisionerAdapter>,
        "2.4.1".to_string(),
        5,
        Box::new(RecordingEventLogger {
            events: Arc::clone(&events),
        }),
    );
    let bootstrap = bootstrap_data(fake.as_ref(), 5);
    let _ = app.update_model(Msg::EcosystemLoaded(EcosystemLoadCompletion { bootstrap }));
    let _ = app.update_model(Msg::Key(key_press(KeyCode::Enter)));

    let logged = events.lock().expect("event lock should not be poisoned");
    assert!(
        logged
            .iter()
            .any(|event| event.event == "discovery" && event.kind == "ready")
    );
    assert!(
        logged
            .iter()
            .any(|event| event.event == "command" && event.kind == "dispatched")
    );
}

#[test]
fn rendered_frame_shows_environments_machines_and_hints() {
    let (mut app, _fake) = loaded_app();
    let _ = app.update_model(Msg::NameResolved(NameResolutionCompletion {
        machine_id: "aaa111".to_string(),
        result: Ok("web".to_string()),
    }));

    with_rendered_frame(&app, 100, 30, |frame| {
        assert!(find_row_containing(frame, "Paddock").is_some());
        assert!(find_row_containing(frame, "env1").is_some());
        assert!(find_row_containing(frame, "web").is_some());
        assert!(find_row_containing(frame, "Enter").is_some());
    });
}

#[test]
fn rendered_frame_shows_the_empty_splash_before_discovery() {
    let (app, _fake) = fixture_app();

    with_rendered_frame(&app, 100, 30, |frame| {
        assert!(find_row_containing(frame, "No environments found").is_some());
    });
}

#[test]
fn rendered_frame_shows_errors_in_the_output_region() {
    let (mut app, _fake) = loaded_app();
    app.last_error = Some("command failed: exited with status 1".to_string());

    with_rendered_frame(&app, 100, 30, |frame| {
        assert!(find_row_containing(frame, "error: command failed").is_some());
    });
}

fn arb_nav_key() -> impl Strategy<Value = KeyEvent> {
    prop_oneof![
        Just(key_press(KeyCode::Up)),
        Just(key_press(KeyCode::Down)),
        Just(key_press(KeyCode::Left)),
        Just(key_press(KeyCode::Right)),
        Just(key_press(KeyCode::Tab)),
        Just(key_press(KeyCode::BackTab)),
        Just(key_press(KeyCode::Char(' '))),
        Just(key_press(KeyCode::Char('j'))),
        Just(key_press(KeyCode::Char('k'))),
    ]
}

proptest! {
    #[test]
    fn navigation_never_breaks_selection_invariants(keys in prop::collection::vec(arb_nav_key(), 1..60)) {
        let (mut app, _fake) = loaded_app();

        for key in keys {
            let _ = app.update_model(Msg::Key(key));

            let ecosystem = app.ecosystem.as_ref().expect("ecosystem should stay loaded");
            match ecosystem.selection {
                TabSelection::Env(index) => {
                    prop_assert!(index < ecosystem.environments.len());
                    let environment = &ecosystem.environments[index];
                    if !environment.machines.is_empty() {
                        prop_assert!(ecosystem.selected_machine < environment.machines.len());
                    }
                }
                TabSelection::More | TabSelection::Back => {
                    prop_assert!(ecosystem.pager.has_multiple_pages());
                }
            }
        }
    }
}
