use std::collections::BTreeMap;

/// Status fields retained on a parsed record. Everything else the tool
/// prints (ui narration, error banners, progress lines) is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StatusField {
    ProviderName,
    State,
    StateHumanLong,
    MachineHome,
}

impl StatusField {
    pub const ALL: [Self; 4] = [
        Self::ProviderName,
        Self::State,
        Self::StateHumanLong,
        Self::MachineHome,
    ];

    pub const fn key(self) -> &'static str {
        match self {
            Self::ProviderName => "provider-name",
            Self::State => "state",
            Self::StateHumanLong => "state-human-long",
            Self::MachineHome => "machine-home",
        }
    }
}

/// One machine's worth of fields pulled out of a machine-readable dump.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MachineRecord {
    pub name: String,
    pub machine_id: String,
    pub fields: BTreeMap<StatusField, String>,
}

impl MachineRecord {
    pub fn field(&self, field: StatusField) -> &str {
        self.fields
            .get(&field)
            .map(String::as_str)
            .unwrap_or_default()
    }

    fn carries_data(&self) -> bool {
        !self.machine_id.is_empty() || !self.fields.is_empty()
    }
}

// Record delimiting differs between subcommands: `status` emits one
// `metadata` line per machine with the machine name as target, while
// `global-status` has no per-machine target and instead repeats
// `machine-id`. Both boundaries are honored; `metadata` is tested first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineField {
    Metadata,
    MachineId,
    Status(StatusField),
}

impl LineField {
    const ALL: [Self; 6] = [
        Self::Metadata,
        Self::MachineId,
        Self::Status(StatusField::ProviderName),
        Self::Status(StatusField::State),
        Self::Status(StatusField::StateHumanLong),
        Self::Status(StatusField::MachineHome),
    ];

    const fn key(self) -> &'static str {
        match self {
            Self::Metadata => "metadata",
            Self::MachineId => "machine-id",
            Self::Status(field) => field.key(),
        }
    }
}

/// Parse `timestamp,target,field,value...` lines into per-machine records.
///
/// Lines that match no supported field are dropped, so error output and
/// `ui,*` narration degrade to an empty result instead of failing.
pub fn parse_machine_output(output: &str) -> Vec<MachineRecord> {
    let mut records = Vec::new();
    let mut current = MachineRecord::default();

    for line in output.lines() {
        let Some((field, target, value)) = match_line(line) else {
            continue;
        };

        match field {
            LineField::Metadata => {
                if current.name.is_empty() {
                    current.name = target;
                } else if current.name != target {
                    if current.carries_data() {
                        records.push(std::mem::take(&mut current));
                    }
                    current = MachineRecord {
                        name: target,
                        ..MachineRecord::default()
                    };
                }
            }
            LineField::MachineId => {
                if current.machine_id.is_empty() {
                    current.machine_id = value;
                } else {
                    records.push(std::mem::take(&mut current));
                    current = MachineRecord {
                        name: target,
                        machine_id: value,
                        ..MachineRecord::default()
                    };
                }
            }
            LineField::Status(status_field) => {
                current.fields.insert(status_field, value);
            }
        }
    }

    if current.carries_data() {
        records.push(current);
    }

    records
}

fn match_line(line: &str) -> Option<(LineField, String, String)> {
    for field in LineField::ALL {
        if let Some((target, value)) = match_field(line, field.key()) {
            return Some((field, target, value));
        }
    }

    None
}

// A line matches a field when it reads `timestamp,target,<key>,value` with a
// numeric timestamp and a non-empty value. The target may itself contain
// commas, so the key is located from the right, falling back leftwards until
// a non-empty value remains.
fn match_field(line: &str, key: &str) -> Option<(String, String)> {
    let line = line.trim_start();
    let (timestamp, rest) = line.split_once(',')?;
    if timestamp.is_empty() || !timestamp.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }

    let needle = format!(",{key},");
    let mut search_end = rest.len();
    while let Some(position) = rest[..search_end].rfind(&needle) {
        let value = &rest[position + needle.len()..];
        if !value.is_empty() {
            return Some((rest[..position].to_string(), value.to_string()));
        }
        search_end = position;
    }

    None
}
