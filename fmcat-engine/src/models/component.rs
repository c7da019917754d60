//! Component code library

use super::SumCheck;
use serde::{Deserialize, Serialize};

/// Issued 4-character object-part code for one (component, sum check)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentCodeEntry {
    pub component: String,
    pub sum_check: SumCheck,
    pub code: String,
    /// Code group used for the component's damage (catalog C) rows
    pub damage_group_code: String,
    /// Code group used for the component's cause (catalog 5) rows
    pub cause_group_code: String,
    /// Same component name also occurs with a different sum check
    #[serde(default)]
    pub multi_context: bool,
}

impl ComponentCodeEntry {
    pub fn new(component: impl Into<String>, sum_check: SumCheck, code: impl Into<String>) -> Self {
        let code = code.into();
        Self {
            component: component.into(),
            sum_check,
            damage_group_code: format!("D{}", code),
            cause_group_code: format!("C{}", code),
            code,
            multi_context: false,
        }
    }
}

/// Append-only persisted list of issued component codes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentLibrary {
    pub entries: Vec<ComponentCodeEntry>,
}

impl ComponentLibrary {
    pub fn find(&self, component: &str, sum_check: SumCheck) -> Option<&ComponentCodeEntry> {
        self.entries
            .iter()
            .find(|e| e.component == component && e.sum_check == sum_check)
    }

    /// Recompute every entry's `multi_context` flag
    pub fn refresh_context_flags(&mut self) {
        let flags: Vec<bool> = self
            .entries
            .iter()
            .map(|entry| {
                self.entries
                    .iter()
                    .any(|other| other.component == entry.component && other.sum_check != entry.sum_check)
            })
            .collect();

        for (entry, flag) in self.entries.iter_mut().zip(flags) {
            entry.multi_context = flag;
        }
    }
}
