//! Built-in job files for the task list components.
//!
//! Each preset targets a fixed path relative to the workspace root and
//! prints a fixed set of status lines.

use crate::config::{load_from_str, ConfigError, JobConfig};

#[derive(Debug, Clone, Copy)]
pub struct Preset {
    pub name: &'static str,
    pub summary: &'static str,
    source: &'static str,
}

impl Preset {
    /// Parse and validate the embedded job file.
    pub fn config(&self) -> Result<JobConfig, ConfigError> {
        load_from_str(self.source)
    }
}

pub const PRESETS: &[Preset] = &[
    Preset {
        name: "fix-use-client",
        summary: "Move \"use client\" back above the imports in sortable-task-item.tsx",
        source: include_str!("../presets/fix-use-client.toml"),
    },
    Preset {
        name: "memoize-sortable-task-item",
        summary: "Wrap SortableTaskItem in React.memo",
        source: include_str!("../presets/memoize-sortable-task-item.toml"),
    },
    Preset {
        name: "memoize-task-item",
        summary: "Wrap TaskItem in React.memo",
        source: include_str!("../presets/memoize-task-item.toml"),
    },
    Preset {
        name: "check-task-item",
        summary: "Report whether TaskItem is memoized (read-only)",
        source: include_str!("../presets/check-task-item.toml"),
    },
];

pub fn find(name: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|p| p.name == name)
}
