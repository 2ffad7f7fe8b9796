use std::path::Path;

/// Lifecycle commands that can run against a single machine. Order matters:
/// `selected_command` indexes into [`MachineCommand::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineCommand {
    Up,
    Halt,
    Ssh,
    Reload,
    Provision,
}

impl MachineCommand {
    pub const ALL: [Self; 5] = [Self::Up, Self::Halt, Self::Ssh, Self::Reload, Self::Provision];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Halt => "halt",
            Self::Ssh => "ssh",
            Self::Reload => "reload",
            Self::Provision => "provision",
        }
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Up => "▶",
            Self::Halt => "■",
            Self::Ssh => "＞＿",
            Self::Reload => "↺",
            Self::Provision => "🛠",
        }
    }
}

/// Commands that can run against a whole environment. There is no
/// environment-wide shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentCommand {
    Up,
    Halt,
    Reload,
    Provision,
}

impl EnvironmentCommand {
    pub const ALL: [Self; 4] = [Self::Up, Self::Halt, Self::Reload, Self::Provision];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Halt => "halt",
            Self::Reload => "reload",
            Self::Provision => "provision",
        }
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Up => "▶",
            Self::Halt => "■",
            Self::Reload => "↺",
            Self::Provision => "🛠",
        }
    }
}

/// One virtual machine and its last-known status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Machine {
    pub machine_id: String,
    pub name: String,
    pub provider: String,
    pub state: String,
    pub home: String,
    pub selected_command: usize,
}

impl Machine {
    /// The global-status sweep knows ids before names; show the id until the
    /// name resolves.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.machine_id
        } else {
            &self.name
        }
    }
}

/// States arrive as `power_off`-style tokens; they read better with spaces.
pub fn display_state(raw: &str) -> String {
    raw.replace('_', " ")
}

/// A group of machines sharing one provisioning project directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    pub name: String,
    pub home: String,
    pub machines: Vec<Machine>,
    pub selected_command: usize,
    /// When set, commands target the environment as a whole instead of the
    /// currently selected machine.
    pub has_focus: bool,
}

/// Environments are keyed by the final path component of their home
/// directory. Two projects whose homes share a basename collapse into one
/// group; known limitation, kept for compatibility with existing behavior.
pub fn environment_name(home: &str) -> String {
    Path::new(home)
        .file_name()
        .and_then(|name| name.to_str())
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| home.to_string())
}

/// Which tab the operator is on: a real environment, or one of the synthetic
/// pager tabs shown when environments spill over a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabSelection {
    Env(usize),
    More,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    pub per_page: usize,
    pub page: usize,
    pub total_pages: usize,
}

impl Pager {
    pub const DEFAULT_PER_PAGE: usize = 5;

    pub fn new(per_page: usize, item_count: usize) -> Self {
        let per_page = per_page.max(1);
        Self {
            per_page,
            page: 0,
            total_pages: item_count.div_ceil(per_page).max(1),
        }
    }

    pub fn has_multiple_pages(&self) -> bool {
        self.total_pages > 1
    }

    pub fn has_next_page(&self) -> bool {
        self.page + 1 < self.total_pages
    }

    pub fn has_previous_page(&self) -> bool {
        self.page > 0
    }

    /// Index of the first item on the current page.
    pub fn page_start(&self) -> usize {
        self.page * self.per_page
    }

    /// Index of the last item on the current page.
    pub fn page_end(&self, item_count: usize) -> usize {
        (self.page_start() + self.per_page)
            .min(item_count)
            .saturating_sub(1)
    }

    /// Half-open bounds for slicing the current page out of the item list.
    pub fn slice_bounds(&self, item_count: usize) -> (usize, usize) {
        let start = self.page_start().min(item_count);
        let end = (start + self.per_page).min(item_count);
        (start, end)
    }
}

/// The root aggregate: every environment discovered in this session plus the
/// operator's selection and pagination state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ecosystem {
    pub environments: Vec<Environment>,
    pub selection: TabSelection,
    pub selected_machine: usize,
    pub pager: Pager,
}

impl Ecosystem {
    pub fn new(environments: Vec<Environment>, per_page: usize) -> Self {
        let pager = Pager::new(per_page, environments.len());
        Self {
            environments,
            selection: TabSelection::Env(0),
            selected_machine: 0,
            pager,
        }
    }

    pub fn current_environment(&self) -> Option<&Environment> {
        match self.selection {
            TabSelection::Env(index) => self.environments.get(index),
            TabSelection::More | TabSelection::Back => None,
        }
    }

    pub fn current_environment_mut(&mut self) -> Option<&mut Environment> {
        match self.selection {
            TabSelection::Env(index) => self.environments.get_mut(index),
            TabSelection::More | TabSelection::Back => None,
        }
    }

    pub fn current_machine(&self) -> Option<&Machine> {
        self.current_environment()
            .and_then(|environment| environment.machines.get(self.selected_machine))
    }

    pub fn machine_count(&self) -> usize {
        self.environments
            .iter()
            .map(|environment| environment.machines.len())
            .sum()
    }

    /// Move to a different environment tab, resetting the machine cursor so
    /// it never points past the new environment's machine list.
    pub fn select_environment(&mut self, index: usize) {
        if index >= self.environments.len() {
            return;
        }
        if self.selection != TabSelection::Env(index) {
            self.selected_machine = 0;
        }
        self.selection = TabSelection::Env(index);
    }
}
