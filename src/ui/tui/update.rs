use super::*;

impl PaddockApp {
    pub(super) fn new(
        provisioner: Arc<dyn ProvisionerAdapter>,
        tool_version: String,
        page_size: usize,
        event_log: Box<dyn EventLogger>,
    ) -> Self {
        Self {
            provisioner,
            tool_version,
            page_size,
            ecosystem: None,
            discovery_state: DiscoveryState::Empty,
            pending_command: None,
            pending_name_lookups: 0,
            spinner_frame: 0,
            verb_cursor: 0,
            last_output: None,
            last_error: None,
            help_expanded: false,
            event_log,
            hit_zones: RefCell::new(Vec::new()),
            deferred_cmds: Vec::new(),
        }
    }

    pub(super) fn queue_cmd(&mut self, cmd: Cmd<Msg>) {
        if matches!(cmd, Cmd::None) {
            return;
        }

        self.deferred_cmds.push(cmd);
    }

    fn merge_deferred_cmds(&mut self, cmd: Cmd<Msg>) -> Cmd<Msg> {
        let deferred_cmds = std::mem::take(&mut self.deferred_cmds);
        if deferred_cmds.is_empty() {
            return cmd;
        }

        if matches!(cmd, Cmd::Quit) {
            return Cmd::Quit;
        }

        if matches!(cmd, Cmd::None) {
            return Cmd::batch(deferred_cmds);
        }

        let mut merged = Vec::with_capacity(deferred_cmds.len().saturating_add(1));
        merged.push(cmd);
        merged.extend(deferred_cmds);
        Cmd::batch(merged)
    }

    pub(super) fn init_model(&mut self) -> Cmd<Msg> {
        self.dispatch_global_sweep();
        self.merge_deferred_cmds(Cmd::set_mouse_capture(true))
    }

    pub(super) fn update_model(&mut self, msg: Msg) -> Cmd<Msg> {
        let cmd = match msg {
            Msg::Key(key_event) => self.handle_key(key_event),
            Msg::Mouse(mouse_event) => {
                self.handle_mouse(mouse_event);
                Cmd::None
            }
            Msg::Tick => self.handle_tick(),
            Msg::Resize { .. } => {
                // Zone geometry is stale until the next render pass.
                self.hit_zones.borrow_mut().clear();
                Cmd::None
            }
            Msg::EcosystemLoaded(completion) => {
                self.apply_ecosystem_load(completion);
                Cmd::None
            }
            Msg::NameResolved(completion) => {
                self.apply_name_resolution(completion);
                Cmd::None
            }
            Msg::MachineStatusRefreshed(completion) => {
                self.apply_machine_status_completion(completion);
                Cmd::None
            }
            Msg::EnvironmentStatusRefreshed(completion) => {
                self.apply_environment_status_completion(completion);
                Cmd::None
            }
            Msg::CommandCompleted(completion) => {
                self.apply_command_completion(completion);
                Cmd::None
            }
            Msg::ShellSessionEnded(completion) => {
                self.apply_shell_completion(completion);
                Cmd::None
            }
            Msg::Noop => Cmd::None,
        };

        self.merge_deferred_cmds(cmd)
    }

    fn handle_key(&mut self, key_event: KeyEvent) -> Cmd<Msg> {
        if !matches!(key_event.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
            return Cmd::None;
        }

        let ctrl = key_event.modifiers.contains(Modifiers::CTRL);
        if matches!(key_event.code, KeyCode::Char('c')) && ctrl {
            return Cmd::Quit;
        }

        match key_event.code {
            KeyCode::Char('q') | KeyCode::Escape => return Cmd::Quit,
            KeyCode::Char('?') => {
                self.help_expanded = !self.help_expanded;
                return Cmd::None;
            }
            _ => {}
        }

        if matches!(key_event.code, KeyCode::Enter) {
            self.handle_execute();
            return Cmd::None;
        }

        let Some(ecosystem) = self.ecosystem.as_mut() else {
            return Cmd::None;
        };

        match key_event.code {
            KeyCode::Left | KeyCode::Char('h') => reduce(ecosystem, NavEvent::SelectCommandPrev),
            KeyCode::Right | KeyCode::Char('l') => reduce(ecosystem, NavEvent::SelectCommandNext),
            KeyCode::Up | KeyCode::Char('k') => reduce(ecosystem, NavEvent::SelectMachinePrev),
            KeyCode::Down | KeyCode::Char('j') => reduce(ecosystem, NavEvent::SelectMachineNext),
            KeyCode::Char(' ') => reduce(ecosystem, NavEvent::ToggleFocus),
            KeyCode::Tab => reduce(ecosystem, NavEvent::PageForward),
            KeyCode::BackTab => reduce(ecosystem, NavEvent::PageBackward),
            _ => {}
        }

        Cmd::None
    }

    fn handle_mouse(&mut self, mouse_event: MouseEvent) {
        if !matches!(mouse_event.kind, MouseEventKind::Down(MouseButton::Left)) {
            return;
        }

        let target = self
            .hit_zones
            .borrow()
            .iter()
            .find(|zone| zone.contains(mouse_event.x, mouse_event.y))
            .map(|zone| zone.target);
        let Some(target) = target else {
            return;
        };
        let Some(ecosystem) = self.ecosystem.as_mut() else {
            return;
        };

        match target {
            HitTarget::EnvTab(index) => ecosystem.select_environment(index),
            HitTarget::MoreTab => ecosystem.selection = TabSelection::More,
            HitTarget::BackTab => ecosystem.selection = TabSelection::Back,
            HitTarget::MachineRow(index) => {
                let machine_count = ecosystem
                    .current_environment()
                    .map_or(0, |environment| environment.machines.len());
                if index < machine_count {
                    if let Some(environment) = ecosystem.current_environment_mut() {
                        environment.has_focus = false;
                    }
                    ecosystem.selected_machine = index;
                }
            }
            HitTarget::EnvCommand(command) => {
                if let Some(environment) = ecosystem.current_environment_mut() {
                    environment.has_focus = true;
                    environment.selected_command = command % EnvironmentCommand::ALL.len();
                }
            }
            HitTarget::MachineCommand { machine, command } => {
                let machine_count = ecosystem
                    .current_environment()
                    .map_or(0, |environment| environment.machines.len());
                if machine < machine_count {
                    if let Some(environment) = ecosystem.current_environment_mut() {
                        environment.has_focus = false;
                        if let Some(machine_entry) = environment.machines.get_mut(machine) {
                            machine_entry.selected_command = command % MachineCommand::ALL.len();
                        }
                    }
                    ecosystem.selected_machine = machine;
                }
            }
        }
    }

    fn handle_tick(&mut self) -> Cmd<Msg> {
        if self.pending_command.is_none() {
            return Cmd::None;
        }

        self.spinner_frame = self.spinner_frame.wrapping_add(1);
        Cmd::tick(Duration::from_millis(SPINNER_INTERVAL_MS))
    }

    fn handle_execute(&mut self) {
        let Some(disposition) = self
            .ecosystem
            .as_ref()
            .map(|ecosystem| execute_disposition(ecosystem))
        else {
            return;
        };

        match disposition {
            ExecuteDisposition::AdvancePage => {
                if let Some(ecosystem) = self.ecosystem.as_mut() {
                    advance_page(ecosystem);
                }
            }
            ExecuteDisposition::RetreatPage => {
                if let Some(ecosystem) = self.ecosystem.as_mut() {
                    retreat_page(ecosystem);
                }
            }
            ExecuteDisposition::Dispatch => self.dispatch_selected_command(),
        }
    }

    fn next_verb(&mut self) -> &'static str {
        let verb = SPINNER_VERBS[self.verb_cursor % SPINNER_VERBS.len()];
        self.verb_cursor = self.verb_cursor.wrapping_add(1);
        verb
    }

    fn begin_command(&mut self, command: &'static str, target: &str) {
        let verb = self.next_verb();
        self.pending_command = Some(PendingCommand {
            command,
            target: target.to_string(),
            verb,
        });
        self.spinner_frame = 0;
        self.event_log.log(
            LogEvent::new("command", "dispatched")
                .with_data("command", Value::from(command))
                .with_data("target", Value::from(target)),
        );
        self.queue_cmd(Cmd::tick(Duration::from_millis(SPINNER_INTERVAL_MS)));
    }

    fn dispatch_global_sweep(&mut self) {
        let provisioner = Arc::clone(&self.provisioner);
        let page_size = self.page_size;
        self.event_log.log(LogEvent::new("discovery", "started"));
        self.queue_cmd(Cmd::task(move || {
            let bootstrap = bootstrap_data(provisioner.as_ref(), page_size);
            Msg::EcosystemLoaded(EcosystemLoadCompletion { bootstrap })
        }));
    }

    fn dispatch_selected_command(&mut self) {
        let Some(ecosystem) = self.ecosystem.as_ref() else {
            return;
        };
        let Some(environment) = ecosystem.current_environment() else {
            return;
        };

        if environment.has_focus {
            let command = EnvironmentCommand::ALL
                [environment.selected_command % EnvironmentCommand::ALL.len()];
            let name = environment.name.clone();
            let home = environment.home.clone();
            self.begin_command(command.label(), &name);

            let provisioner = Arc::clone(&self.provisioner);
            self.queue_cmd(Cmd::task(move || {
                let result = provisioner
                    .run_command_in_dir(command.label(), &home)
                    .map_err(|error| error.message());
                Msg::CommandCompleted(CommandCompletion {
                    command: command.label(),
                    target: CommandTarget::Environment { name, home },
                    result,
                })
            }));
            return;
        }

        let Some(machine) = ecosystem.current_machine() else {
            return;
        };
        let command = MachineCommand::ALL[machine.selected_command % MachineCommand::ALL.len()];
        if command == MachineCommand::Ssh {
            self.dispatch_shell_session();
            return;
        }

        let identifier = if machine.machine_id.is_empty() {
            machine.name.clone()
        } else {
            machine.machine_id.clone()
        };
        let display_name = machine.display_name().to_string();
        self.begin_command(command.label(), &display_name);

        let provisioner = Arc::clone(&self.provisioner);
        self.queue_cmd(Cmd::task(move || {
            let result = provisioner
                .run_command(command.label(), &identifier)
                .map_err(|error| error.message());
            Msg::CommandCompleted(CommandCompletion {
                command: command.label(),
                target: CommandTarget::Machine { identifier },
                result,
            })
        }));
    }

    // The shell bypasses output capture entirely: the child inherits the
    // terminal and only success or failure comes back. No spinner, no
    // follow-up status refresh.
    fn dispatch_shell_session(&mut self) {
        let Some(machine) = self
            .ecosystem
            .as_ref()
            .and_then(|ecosystem| ecosystem.current_machine())
        else {
            return;
        };

        let target = ShellTarget {
            machine_id: machine.machine_id.clone(),
            name: machine.name.clone(),
            provider: machine.provider.clone(),
            home: machine.home.clone(),
        };
        let display_name = machine.display_name().to_string();
        self.event_log.log(
            LogEvent::new("shell", "started").with_data("machine", Value::from(display_name.clone())),
        );

        let provisioner = Arc::clone(&self.provisioner);
        self.queue_cmd(Cmd::task(move || {
            let result = provisioner
                .shell_session(&target)
                .map_err(|error| error.message());
            Msg::ShellSessionEnded(ShellSessionCompletion {
                machine: display_name,
                result,
            })
        }));
    }

    fn dispatch_name_lookup(&mut self, machine_id: String) {
        self.pending_name_lookups = self.pending_name_lookups.saturating_add(1);
        let provisioner = Arc::clone(&self.provisioner);
        self.queue_cmd(Cmd::task(move || {
            let result = provisioner
                .machine_status(&machine_id)
                .map_err(|error| error.message())
                .and_then(|raw| {
                    parse_machine_output(&raw)
                        .into_iter()
                        .next()
                        .map(|record| record.name)
                        .ok_or_else(|| "status output contained no machines".to_string())
                });
            Msg::NameResolved(NameResolutionCompletion { machine_id, result })
        }));
    }

    fn dispatch_machine_refresh(&mut self, identifier: String) {
        let provisioner = Arc::clone(&self.provisioner);
        self.queue_cmd(Cmd::task(move || {
            let result = provisioner
                .machine_status(&identifier)
                .map_err(|error| error.message())
                .and_then(|raw| {
                    parse_machine_output(&raw)
                        .into_iter()
                        .next()
                        .ok_or_else(|| "status output contained no machines".to_string())
                });
            Msg::MachineStatusRefreshed(MachineStatusCompletion { identifier, result })
        }));
    }

    fn dispatch_environment_refresh(&mut self, environment: String, home: String) {
        let provisioner = Arc::clone(&self.provisioner);
        self.queue_cmd(Cmd::task(move || {
            let result = provisioner
                .environment_status(&home)
                .map(|raw| parse_machine_output(&raw))
                .map_err(|error| error.message());
            Msg::EnvironmentStatusRefreshed(EnvironmentStatusCompletion {
                environment,
                result,
            })
        }));
    }

    fn apply_ecosystem_load(&mut self, completion: EcosystemLoadCompletion) {
        self.discovery_state = completion.bootstrap.discovery_state;

        match completion.bootstrap.ecosystem {
            Some(ecosystem) => {
                // The sweep reports ids but no display names; resolve each
                // one in the background. Arrival order does not matter.
                let machine_ids: Vec<String> = ecosystem
                    .environments
                    .iter()
                    .flat_map(|environment| &environment.machines)
                    .filter(|machine| !machine.machine_id.is_empty() && machine.name.is_empty())
                    .map(|machine| machine.machine_id.clone())
                    .collect();

                self.event_log.log(
                    LogEvent::new("discovery", "ready")
                        .with_data(
                            "environments",
                            Value::from(ecosystem.environments.len()),
                        )
                        .with_data("machines", Value::from(ecosystem.machine_count())),
                );

                self.ecosystem = Some(ecosystem);
                for machine_id in machine_ids {
                    self.dispatch_name_lookup(machine_id);
                }
            }
            None => {
                self.ecosystem = None;
                match &self.discovery_state {
                    DiscoveryState::Error(message) => self.event_log.log(
                        LogEvent::new("discovery", "failed")
                            .with_data("error", Value::from(message.clone())),
                    ),
                    _ => self.event_log.log(LogEvent::new("discovery", "no_machines")),
                }
            }
        }
    }

    fn apply_name_resolution(&mut self, completion: NameResolutionCompletion) {
        self.pending_name_lookups = self.pending_name_lookups.saturating_sub(1);

        match completion.result {
            Ok(name) => {
                let merged = self
                    .ecosystem
                    .as_mut()
                    .is_some_and(|ecosystem| {
                        apply_resolved_name(ecosystem, &completion.machine_id, &name)
                    });
                if !merged {
                    self.event_log.log(
                        LogEvent::new("name_lookup", "target_missing")
                            .with_data("machine_id", Value::from(completion.machine_id)),
                    );
                }
            }
            Err(message) => {
                self.last_error = Some(format!(
                    "name lookup for {} failed: {message}",
                    completion.machine_id
                ));
            }
        }
    }

    fn apply_machine_status_completion(&mut self, completion: MachineStatusCompletion) {
        self.pending_command = None;

        match completion.result {
            Ok(record) => {
                let merged = self.ecosystem.as_mut().is_some_and(|ecosystem| {
                    apply_machine_status(ecosystem, &completion.identifier, &record)
                });
                if !merged {
                    // The machine may have vanished between dispatch and
                    // completion; a stale update is not an error.
                    self.event_log.log(
                        LogEvent::new("status", "target_missing")
                            .with_data("identifier", Value::from(completion.identifier)),
                    );
                }
            }
            Err(message) => {
                self.last_error = Some(message);
            }
        }
    }

    fn apply_environment_status_completion(&mut self, completion: EnvironmentStatusCompletion) {
        self.pending_command = None;

        match completion.result {
            Ok(records) => {
                let merged = self.ecosystem.as_mut().is_some_and(|ecosystem| {
                    apply_environment_status(ecosystem, &completion.environment, &records)
                });
                if !merged {
                    self.event_log.log(
                        LogEvent::new("status", "target_missing")
                            .with_data("environment", Value::from(completion.environment)),
                    );
                }
            }
            Err(message) => {
                self.last_error = Some(message);
            }
        }
    }

    fn apply_command_completion(&mut self, completion: CommandCompletion) {
        match completion.result {
            Ok(output) => {
                self.last_error = None;
                self.last_output = Some(output);
                self.event_log.log(
                    LogEvent::new("command", "completed")
                        .with_data("command", Value::from(completion.command)),
                );
                // Something changed; the spinner keeps going until the
                // follow-up status lands and is merged.
                match completion.target {
                    CommandTarget::Machine { identifier } => {
                        self.dispatch_machine_refresh(identifier);
                    }
                    CommandTarget::Environment { name, home } => {
                        self.dispatch_environment_refresh(name, home);
                    }
                }
            }
            Err(message) => {
                self.event_log.log(
                    LogEvent::new("command", "failed")
                        .with_data("command", Value::from(completion.command)),
                );
                self.last_error = Some(message);
                self.pending_command = None;
            }
        }
    }

    fn apply_shell_completion(&mut self, completion: ShellSessionCompletion) {
        match completion.result {
            Ok(()) => {
                self.event_log.log(
                    LogEvent::new("shell", "ended")
                        .with_data("machine", Value::from(completion.machine)),
                );
            }
            Err(message) => {
                self.last_error = Some(message);
            }
        }
    }
}
