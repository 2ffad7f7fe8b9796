use super::*;

/// Modal body used by the help overlay; fills its area before the framed
/// text so the backdrop never bleeds through.
#[derive(Debug, Clone)]
struct HelpModalContent<'a> {
    title: &'a str,
    body: FtText<'a>,
    theme: UiTheme,
    border_color: PackedRgba,
}

impl Widget for HelpModalContent<'_> {
    fn render(&self, area: Rect, frame: &mut Frame) {
        if area.is_empty() {
            return;
        }

        let content_style = Style::new().bg(self.theme.base).fg(self.theme.text);

        Paragraph::new("").style(content_style).render(area, frame);

        let block = Block::new()
            .title(self.title)
            .title_alignment(BlockAlignment::Center)
            .borders(Borders::ALL)
            .style(content_style)
            .border_style(Style::new().fg(self.border_color).bold());
        let inner = block.inner(area);
        block.render(area, frame);

        if inner.is_empty() {
            return;
        }

        Paragraph::new(self.body.clone())
            .style(content_style)
            .render(inner, frame);
    }
}

fn span_width(value: &str) -> u16 {
    u16::try_from(text_display_width(value)).unwrap_or(u16::MAX)
}

impl PaddockApp {
    pub(super) fn view_layout_for_size(width: u16, height: u16) -> ViewLayout {
        let area = Rect::from_size(width, height);
        let rows = Flex::vertical()
            .constraints([
                Constraint::Fixed(HEADER_HEIGHT),
                Constraint::Fixed(TAB_ROW_HEIGHT),
                Constraint::Fill,
                Constraint::Fixed(OUTPUT_HEIGHT),
                Constraint::Fixed(STATUS_HEIGHT),
            ])
            .split(area);

        ViewLayout {
            header: rows[0],
            tabs: rows[1],
            content: rows[2],
            output: rows[3],
            status: rows[4],
        }
    }

    pub(super) fn render_model(&self, frame: &mut Frame) {
        frame.set_cursor(None);
        frame.set_cursor_visible(false);
        let area = Rect::from_size(frame.buffer.width(), frame.buffer.height());
        let layout = Self::view_layout_for_size(frame.buffer.width(), frame.buffer.height());

        self.hit_zones.borrow_mut().clear();

        self.render_header(frame, layout.header);
        self.render_tab_row(frame, layout.tabs);
        self.render_content(frame, layout.content);
        self.render_output(frame, layout.output);
        self.render_status_line(frame, layout.status);
        self.render_help_overlay(frame, area);
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        if area.is_empty() {
            return;
        }

        let theme = ui_theme();
        let base_style = Style::new().bg(theme.crust).fg(theme.text);
        let chip_style = Style::new().bg(theme.surface0).fg(theme.mauve).bold();
        let version_style = Style::new().bg(theme.mantle).fg(theme.subtext0);

        let left: Vec<FtSpan> = vec![
            FtSpan::styled(" ".to_string(), base_style),
            FtSpan::styled(" Paddock ".to_string(), chip_style),
            FtSpan::styled(" ".to_string(), base_style),
            FtSpan::styled(format!(" tool {} ", self.tool_version), version_style),
        ];

        let right: Vec<FtSpan> = match self.ecosystem.as_ref() {
            Some(ecosystem) => vec![FtSpan::styled(
                format!(
                    " {} environments · {} machines ",
                    ecosystem.environments.len(),
                    ecosystem.machine_count()
                ),
                version_style,
            )],
            None => Vec::new(),
        };

        let line = chrome_bar_line(usize::from(area.width), base_style, left, right);
        Paragraph::new(FtText::from_line(line)).render(area, frame);
    }

    fn render_tab_row(&self, frame: &mut Frame, area: Rect) {
        if area.is_empty() {
            return;
        }

        let theme = ui_theme();
        let Some(ecosystem) = self.ecosystem.as_ref() else {
            let message = match &self.discovery_state {
                DiscoveryState::Error(_) => "Discovery failed",
                _ => "Still looking for environments...",
            };
            Paragraph::new(FtText::from_line(FtLine::from_spans(vec![FtSpan::styled(
                message,
                Style::new().fg(theme.overlay0),
            )])))
            .render(area, frame);
            return;
        };

        let selected_style = Style::new().bg(theme.surface1).fg(theme.mauve).bold();
        let tab_style = Style::new().fg(theme.subtext0);

        let mut spans: Vec<FtSpan> = Vec::new();
        let mut x = area.x;
        let mut push_tab = |spans: &mut Vec<FtSpan>,
                            x: &mut u16,
                            label: String,
                            selected: bool,
                            target: HitTarget| {
            let width = span_width(&label);
            if u32::from(*x) + u32::from(width) <= u32::from(area.x) + u32::from(area.width) {
                self.hit_zones.borrow_mut().push(HitZone {
                    area: Rect::new(*x, area.y, width, 1),
                    target,
                });
            }
            spans.push(FtSpan::styled(
                label,
                if selected { selected_style } else { tab_style },
            ));
            *x = x.saturating_add(width);
        };

        let pager = &ecosystem.pager;
        if pager.has_multiple_pages() && pager.has_previous_page() {
            push_tab(
                &mut spans,
                &mut x,
                " ⬅ ".to_string(),
                ecosystem.selection == TabSelection::Back,
                HitTarget::BackTab,
            );
        }

        let (start, end) = pager.slice_bounds(ecosystem.environments.len());
        for (index, environment) in ecosystem.environments[start..end].iter().enumerate() {
            let env_index = start + index;
            push_tab(
                &mut spans,
                &mut x,
                format!(" {} ", environment.name),
                ecosystem.selection == TabSelection::Env(env_index),
                HitTarget::EnvTab(env_index),
            );
            spans.push(FtSpan::styled(" ".to_string(), tab_style));
            x = x.saturating_add(1);
        }

        if pager.has_multiple_pages() && pager.has_next_page() {
            push_tab(
                &mut spans,
                &mut x,
                " ⮕ ".to_string(),
                ecosystem.selection == TabSelection::More,
                HitTarget::MoreTab,
            );
        }

        Paragraph::new(FtText::from_line(FtLine::from_spans(spans))).render(area, frame);
    }

    fn state_color(&self, state: &str) -> PackedRgba {
        let theme = ui_theme();
        match state {
            "running" => theme.teal,
            "poweroff" | "power off" | "shutoff" | "aborted" | "not created" => theme.red,
            "saved" | "paused" | "suspended" => theme.yellow,
            _ => theme.text,
        }
    }

    fn render_content(&self, frame: &mut Frame, area: Rect) {
        if area.is_empty() {
            return;
        }

        let theme = ui_theme();
        let block = Block::new()
            .title("Environments")
            .borders(Borders::ALL)
            .border_style(Style::new().fg(theme.overlay0));
        let inner = block.inner(area);
        block.render(area, frame);

        if inner.is_empty() {
            return;
        }

        let Some(ecosystem) = self.ecosystem.as_ref() else {
            let lines = match &self.discovery_state {
                DiscoveryState::Error(message) => vec![
                    FtLine::from_spans(vec![FtSpan::styled(
                        "Discovery error",
                        Style::new().fg(theme.red).bold(),
                    )]),
                    FtLine::from_spans(vec![FtSpan::styled(
                        message.clone(),
                        Style::new().fg(theme.peach),
                    )]),
                ],
                _ => vec![FtLine::from_spans(vec![FtSpan::styled(
                    "No environments found :(",
                    Style::new().fg(theme.subtext0),
                )])],
            };
            Paragraph::new(FtText::from_lines(lines)).render(inner, frame);
            return;
        };

        match ecosystem.selection {
            TabSelection::More => {
                self.render_pager_hint(frame, inner, "More environments this way ⮕");
            }
            TabSelection::Back => {
                self.render_pager_hint(frame, inner, "⬅ Environments back that way");
            }
            TabSelection::Env(_) => self.render_environment_card(frame, inner, ecosystem),
        }
    }

    fn render_pager_hint(&self, frame: &mut Frame, area: Rect, headline: &str) {
        let theme = ui_theme();
        let lines = vec![
            FtLine::from_spans(vec![FtSpan::styled(
                headline.to_string(),
                Style::new().fg(theme.lavender).bold(),
            )]),
            FtLine::from_spans(vec![FtSpan::styled(
                "Hit Enter",
                Style::new().fg(theme.subtext0),
            )]),
        ];
        Paragraph::new(FtText::from_lines(lines)).render(area, frame);
    }

    fn render_environment_card(&self, frame: &mut Frame, inner: Rect, ecosystem: &Ecosystem) {
        let theme = ui_theme();
        let Some(environment) = ecosystem.current_environment() else {
            return;
        };

        let mut lines: Vec<FtLine> = Vec::new();
        let max_lines = usize::from(inner.height);

        // Environment card: the name plus the commands that run against the
        // whole project directory.
        let env_selected = environment.has_focus;
        let env_name_style = if env_selected {
            Style::new().fg(theme.mauve).bold()
        } else {
            Style::new().fg(theme.text).bold()
        };
        let mut env_spans: Vec<FtSpan> = vec![
            FtSpan::styled(
                if env_selected { "▸ " } else { "  " }.to_string(),
                Style::new().fg(theme.mauve),
            ),
            FtSpan::styled(format!("{} ", environment.name), env_name_style),
            FtSpan::styled(" ".to_string(), Style::new()),
        ];
        // Marker (2) + "name " + separator space.
        let mut env_x = inner
            .x
            .saturating_add(2)
            .saturating_add(span_width(&environment.name))
            .saturating_add(2);
        for (command_index, command) in EnvironmentCommand::ALL.iter().enumerate() {
            let label = format!(" {} {} ", command.symbol(), command.label());
            let selected = env_selected && environment.selected_command == command_index;
            let style = if selected {
                Style::new().bg(theme.mauve).fg(theme.crust).bold()
            } else {
                Style::new().bg(theme.surface0).fg(theme.subtext0)
            };
            let width = span_width(&label);
            if lines.len() < max_lines {
                self.hit_zones.borrow_mut().push(HitZone {
                    area: Rect::new(env_x, inner.y, width, 1),
                    target: HitTarget::EnvCommand(command_index),
                });
            }
            env_spans.push(FtSpan::styled(label, style));
            env_spans.push(FtSpan::styled(" ".to_string(), Style::new()));
            env_x = env_x.saturating_add(width).saturating_add(1);
        }
        lines.push(FtLine::from_spans(env_spans));
        lines.push(FtLine::raw(""));

        if environment.machines.is_empty() {
            lines.push(FtLine::from_spans(vec![FtSpan::styled(
                "No machines in this environment",
                Style::new().fg(theme.subtext0),
            )]));
        }

        for (machine_index, machine) in environment.machines.iter().enumerate() {
            if lines.len() + 2 > max_lines {
                break;
            }

            let machine_selected =
                !environment.has_focus && ecosystem.selected_machine == machine_index;
            let marker = if machine_selected { "▸ " } else { "  " };
            let name_style = if machine_selected {
                Style::new().fg(theme.blue).bold()
            } else {
                Style::new().fg(theme.text)
            };

            let row_y = inner.y.saturating_add(u16::try_from(lines.len()).unwrap_or(u16::MAX));
            self.hit_zones.borrow_mut().push(HitZone {
                area: Rect::new(inner.x, row_y, inner.width, 1),
                target: HitTarget::MachineRow(machine_index),
            });

            lines.push(FtLine::from_spans(vec![
                FtSpan::styled(marker.to_string(), Style::new().fg(theme.blue)),
                FtSpan::styled(format!("{:<16}", machine.display_name()), name_style),
                FtSpan::styled(
                    format!("{:<12}", machine.state),
                    Style::new().fg(self.state_color(&machine.state)),
                ),
                FtSpan::styled(machine.provider.clone(), Style::new().fg(theme.overlay0)),
            ]));

            // Command buttons for this machine.
            let button_y = inner.y.saturating_add(u16::try_from(lines.len()).unwrap_or(u16::MAX));
            let mut button_spans: Vec<FtSpan> =
                vec![FtSpan::styled("    ".to_string(), Style::new())];
            let mut button_x = inner.x.saturating_add(4);
            for (command_index, command) in MachineCommand::ALL.iter().enumerate() {
                let label = format!(" {} {} ", command.symbol(), command.label());
                let selected = machine_selected && machine.selected_command == command_index;
                let style = if selected {
                    Style::new().bg(theme.blue).fg(theme.crust).bold()
                } else {
                    Style::new().bg(theme.surface0).fg(theme.subtext0)
                };
                let width = span_width(&label);
                self.hit_zones.borrow_mut().push(HitZone {
                    area: Rect::new(button_x, button_y, width, 1),
                    target: HitTarget::MachineCommand {
                        machine: machine_index,
                        command: command_index,
                    },
                });
                button_spans.push(FtSpan::styled(label, style));
                button_spans.push(FtSpan::styled(" ".to_string(), Style::new()));
                button_x = button_x.saturating_add(width).saturating_add(1);
            }
            lines.push(FtLine::from_spans(button_spans));

            if lines.len() < max_lines {
                lines.push(FtLine::raw(""));
            }
        }

        Paragraph::new(FtText::from_lines(lines)).render(inner, frame);
    }

    fn render_output(&self, frame: &mut Frame, area: Rect) {
        if area.is_empty() {
            return;
        }

        let theme = ui_theme();
        let block = Block::new()
            .title("Output")
            .borders(Borders::ALL)
            .border_style(Style::new().fg(theme.overlay0));
        let inner = block.inner(area);
        block.render(area, frame);

        if inner.is_empty() {
            return;
        }

        let mut lines: Vec<FtLine> = Vec::new();
        let mut spinner_label: Option<String> = None;

        if let Some(pending) = self.pending_command.as_ref() {
            let frame_glyph = SPINNER_FRAMES[self.spinner_frame % SPINNER_FRAMES.len()];
            spinner_label = Some(format!(
                "{frame_glyph} {} '{}' ({})",
                pending.verb, pending.target, pending.command
            ));
            lines.push(FtLine::raw(""));
        } else if let Some(message) = self.last_error.as_ref() {
            lines.push(FtLine::from_spans(vec![FtSpan::styled(
                truncate_to_display_width(
                    &format!("error: {}", message.replace('\n', " ")),
                    usize::from(inner.width),
                ),
                Style::new().fg(theme.red).bold(),
            )]));
        }

        if let Some(output) = self.last_output.as_ref() {
            let budget = usize::from(inner.height).saturating_sub(lines.len());
            let tail: Vec<&str> = output.lines().rev().take(budget).collect();
            for line in tail.into_iter().rev() {
                lines.push(FtLine::from_spans(vec![FtSpan::styled(
                    truncate_to_display_width(line, usize::from(inner.width)),
                    Style::new().fg(theme.subtext0),
                )]));
            }
        }

        Paragraph::new(FtText::from_lines(lines)).render(inner, frame);

        // The busy line animates on top of the paragraph.
        if let Some(label) = spinner_label {
            let spinner_area = Rect::new(inner.x, inner.y, inner.width, 1);
            let gradient = ColorGradient::new(vec![
                (0.0, theme.mauve),
                (0.5, theme.lavender),
                (1.0, theme.mauve),
            ]);
            StyledText::new(&label)
                .bold()
                .base_color(theme.mauve)
                .effect(TextEffect::AnimatedGradient {
                    gradient,
                    speed: 1.8,
                })
                .time(self.spinner_frame as f64 * (SPINNER_INTERVAL_MS as f64 / 1000.0))
                .render(spinner_area, frame);
        }
    }

    fn render_status_line(&self, frame: &mut Frame, area: Rect) {
        if area.is_empty() {
            return;
        }

        let theme = ui_theme();
        let base_style = Style::new().bg(theme.mantle).fg(theme.text);
        let key_style = Style::new().bg(theme.mantle).fg(theme.lavender).bold();
        let text_style = Style::new().bg(theme.mantle).fg(theme.subtext0);

        let mut left: Vec<FtSpan> = vec![FtSpan::styled(" ".to_string(), base_style)];
        for (index, (key, action)) in [
            ("←/→", "command"),
            ("↑/↓", "machine"),
            ("Space", "focus"),
            ("Tab", "env"),
            ("Enter", "run"),
            ("?", "help"),
            ("q", "quit"),
        ]
        .into_iter()
        .enumerate()
        {
            if index > 0 {
                left.push(FtSpan::styled(" · ".to_string(), text_style));
            }
            left.push(FtSpan::styled(key.to_string(), key_style));
            left.push(FtSpan::styled(format!(" {action}"), text_style));
        }

        let right: Vec<FtSpan> = if self.pending_name_lookups > 0 {
            vec![FtSpan::styled(
                format!(" resolving {} names ", self.pending_name_lookups),
                Style::new().bg(theme.surface0).fg(theme.yellow),
            )]
        } else {
            Vec::new()
        };

        let line = chrome_bar_line(usize::from(area.width), base_style, left, right);
        Paragraph::new(FtText::from_line(line)).render(area, frame);
    }

    fn render_help_overlay(&self, frame: &mut Frame, area: Rect) {
        if !self.help_expanded {
            return;
        }
        if area.width < 40 || area.height < 14 {
            return;
        }

        let dialog_width = area.width.saturating_sub(8).min(64);
        let dialog_height = 14u16;
        let theme = ui_theme();
        let content_width = usize::from(dialog_width.saturating_sub(2));

        let entry = |key: &str, action: &str| {
            FtLine::from_spans(vec![
                FtSpan::styled(
                    format!("  {key:<12}"),
                    Style::new().fg(theme.lavender).bold(),
                ),
                FtSpan::styled(action.to_string(), Style::new().fg(theme.text)),
            ])
        };

        let lines = vec![
            FtLine::from_spans(vec![FtSpan::styled(
                pad_or_truncate_to_display_width("Navigation", content_width),
                Style::new().fg(theme.blue).bold(),
            )]),
            entry("↑/k ↓/j", "select machine"),
            entry("←/h →/l", "select command"),
            entry("Tab / S-Tab", "switch environment tab"),
            entry("Space", "toggle environment focus"),
            FtLine::raw(""),
            FtLine::from_spans(vec![FtSpan::styled(
                pad_or_truncate_to_display_width("Actions", content_width),
                Style::new().fg(theme.blue).bold(),
            )]),
            entry("Enter", "run the selected command"),
            entry("?", "toggle this help"),
            entry("q / Esc", "quit"),
            FtLine::raw(""),
            FtLine::from_spans(vec![FtSpan::styled(
                pad_or_truncate_to_display_width("Close help: ?", content_width),
                Style::new().fg(theme.lavender).bold(),
            )]),
        ];

        let content = HelpModalContent {
            title: "Keys",
            body: FtText::from_lines(lines),
            theme,
            border_color: theme.blue,
        };

        Modal::new(content)
            .size(
                ModalSizeConstraints::new()
                    .min_width(dialog_width)
                    .max_width(dialog_width)
                    .min_height(dialog_height)
                    .max_height(dialog_height),
            )
            .backdrop(BackdropConfig::new(theme.crust, 0.55))
            .render(area, frame);
    }
}
