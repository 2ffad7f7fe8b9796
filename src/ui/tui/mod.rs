use std::cell::RefCell;
use std::sync::Arc;
use std::time::Duration;

use ftui::core::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, Modifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ftui::core::geometry::Rect;
use ftui::layout::{Constraint, Flex};
use ftui::render::frame::Frame;
use ftui::text::{Line as FtLine, Span as FtSpan, Text as FtText, display_width as text_display_width};
use ftui::widgets::Widget;
use ftui::widgets::block::{Alignment as BlockAlignment, Block};
use ftui::widgets::borders::Borders;
use ftui::widgets::modal::{BackdropConfig, Modal, ModalSizeConstraints};
use ftui::widgets::paragraph::Paragraph;
use ftui::{App, Cmd, Model, PackedRgba, ScreenMode, Style};
use ftui_extras::text_effects::{ColorGradient, StyledText, TextEffect};
use serde_json::Value;

use crate::adapters::{DiscoveryState, ProvisionerAdapter, ShellTarget, bootstrap_data};
use crate::config::PaddockConfig;
use crate::domain::{Ecosystem, EnvironmentCommand, MachineCommand, TabSelection};
use crate::event_log::{Event as LogEvent, EventLogger};
use crate::parser::parse_machine_output;
use crate::state::{
    ExecuteDisposition, NavEvent, advance_page, execute_disposition, reduce, retreat_page,
};
use crate::sync::{apply_environment_status, apply_machine_status, apply_resolved_name};

mod msg;
use msg::*;
mod text;
use text::{chrome_bar_line, pad_or_truncate_to_display_width, truncate_to_display_width};
mod update;
mod view;

const HEADER_HEIGHT: u16 = 1;
const TAB_ROW_HEIGHT: u16 = 1;
const OUTPUT_HEIGHT: u16 = 9;
const STATUS_HEIGHT: u16 = 1;
const SPINNER_INTERVAL_MS: u64 = 100;
const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const SPINNER_VERBS: [&str; 6] = [
    "Wrangling",
    "Conjuring",
    "Negotiating",
    "Summoning",
    "Herding",
    "Nudging",
];

#[derive(Debug, Clone, Copy)]
struct UiTheme {
    base: PackedRgba,
    mantle: PackedRgba,
    crust: PackedRgba,
    surface0: PackedRgba,
    surface1: PackedRgba,
    overlay0: PackedRgba,
    text: PackedRgba,
    subtext0: PackedRgba,
    blue: PackedRgba,
    lavender: PackedRgba,
    yellow: PackedRgba,
    red: PackedRgba,
    peach: PackedRgba,
    mauve: PackedRgba,
    teal: PackedRgba,
}

fn ui_theme() -> UiTheme {
    UiTheme {
        base: PackedRgba::rgb(30, 30, 46),
        mantle: PackedRgba::rgb(24, 24, 37),
        crust: PackedRgba::rgb(17, 17, 27),
        surface0: PackedRgba::rgb(49, 50, 68),
        surface1: PackedRgba::rgb(69, 71, 90),
        overlay0: PackedRgba::rgb(108, 112, 134),
        text: PackedRgba::rgb(205, 214, 244),
        subtext0: PackedRgba::rgb(166, 173, 200),
        blue: PackedRgba::rgb(137, 180, 250),
        lavender: PackedRgba::rgb(180, 190, 254),
        yellow: PackedRgba::rgb(249, 226, 175),
        red: PackedRgba::rgb(243, 139, 168),
        peach: PackedRgba::rgb(250, 179, 135),
        mauve: PackedRgba::rgb(203, 166, 247),
        teal: PackedRgba::rgb(148, 226, 213),
    }
}

/// Things the pointer can land on. The table is rebuilt on every render pass
/// and owned by the view, so stale geometry never outlives a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HitTarget {
    EnvTab(usize),
    MoreTab,
    BackTab,
    MachineRow(usize),
    EnvCommand(usize),
    MachineCommand { machine: usize, command: usize },
}

#[derive(Debug, Clone, Copy)]
struct HitZone {
    area: Rect,
    target: HitTarget,
}

impl HitZone {
    fn contains(&self, x: u16, y: u16) -> bool {
        x >= self.area.x
            && x < self.area.x.saturating_add(self.area.width)
            && y >= self.area.y
            && y < self.area.y.saturating_add(self.area.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ViewLayout {
    header: Rect,
    tabs: Rect,
    content: Rect,
    output: Rect,
    status: Rect,
}

/// A lifecycle command currently running against a target. At most one is
/// tracked at a time; the spinner is the only guard against re-dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingCommand {
    command: &'static str,
    target: String,
    verb: &'static str,
}

struct PaddockApp {
    provisioner: Arc<dyn ProvisionerAdapter>,
    tool_version: String,
    page_size: usize,
    ecosystem: Option<Ecosystem>,
    discovery_state: DiscoveryState,
    pending_command: Option<PendingCommand>,
    pending_name_lookups: usize,
    spinner_frame: usize,
    verb_cursor: usize,
    last_output: Option<String>,
    last_error: Option<String>,
    help_expanded: bool,
    event_log: Box<dyn EventLogger>,
    hit_zones: RefCell<Vec<HitZone>>,
    deferred_cmds: Vec<Cmd<Msg>>,
}

impl Model for PaddockApp {
    type Message = Msg;

    fn init(&mut self) -> Cmd<Self::Message> {
        self.init_model()
    }

    fn update(&mut self, msg: Msg) -> Cmd<Self::Message> {
        self.update_model(msg)
    }

    fn view(&self, frame: &mut Frame) {
        self.render_model(frame);
    }
}

pub fn run(
    provisioner: Arc<dyn ProvisionerAdapter>,
    tool_version: String,
    config: &PaddockConfig,
    event_log: Box<dyn EventLogger>,
) -> std::io::Result<()> {
    let app = PaddockApp::new(provisioner, tool_version, config.page_size, event_log);

    App::new(app)
        .screen_mode(ScreenMode::AltScreen)
        .with_mouse()
        .run()
}

#[cfg(test)]
mod tests;
