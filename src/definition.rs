use crate::error::{Violation, ViolationRule};
use crate::validator;
use serde::{Deserialize, Serialize};

/// A stored enum definition: the structured source of a generated enum file.
///
/// Fields are private; all mutation goes through the methods below so the
/// index-aligned lists (`values`/`tooltips`/`value_numbers`,
/// `removed_values`/`removed_value_numbers`) cannot drift apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumDefinition {
    enum_name: String,
    #[serde(default)]
    namespace: String,
    #[serde(default)]
    use_flags: bool,
    #[serde(default)]
    values: Vec<String>,
    #[serde(default)]
    tooltips: Vec<String>,
    /// Pinned numbers; `None` means "whatever the numbering policy assigns".
    /// Only numbers that differ from the policy's choice are pinned.
    #[serde(default)]
    value_numbers: Vec<Option<i64>>,
    /// Soft-deleted values, kept so their numbers are never reused
    #[serde(default)]
    removed_values: Vec<String>,
    #[serde(default)]
    removed_value_numbers: Vec<i64>,
}

/// Every member list of a definition, swapped in or out as one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberSnapshot {
    pub values: Vec<String>,
    pub tooltips: Vec<String>,
    pub value_numbers: Vec<Option<i64>>,
    pub removed_values: Vec<String>,
    pub removed_value_numbers: Vec<i64>,
}

impl EnumDefinition {
    pub fn new(enum_name: &str, namespace: &str, use_flags: bool) -> Self {
        Self {
            enum_name: enum_name.to_string(),
            namespace: namespace.to_string(),
            use_flags,
            values: Vec::new(),
            tooltips: Vec::new(),
            value_numbers: Vec::new(),
            removed_values: Vec::new(),
            removed_value_numbers: Vec::new(),
        }
    }

    pub fn enum_name(&self) -> &str {
        &self.enum_name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn use_flags(&self) -> bool {
        self.use_flags
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn tooltips(&self) -> &[String] {
        &self.tooltips
    }

    pub fn value_numbers(&self) -> &[Option<i64>] {
        &self.value_numbers
    }

    pub fn removed_values(&self) -> &[String] {
        &self.removed_values
    }

    pub fn removed_value_numbers(&self) -> &[i64] {
        &self.removed_value_numbers
    }

    /// Tooltip for an active value; empty when unset or unknown.
    pub fn tooltip(&self, name: &str) -> &str {
        self.index_of(name)
            .and_then(|i| self.tooltips.get(i))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn has_value(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    pub fn has_removed_value(&self, name: &str) -> bool {
        self.removed_values.iter().any(|v| v == name)
    }

    /// Frozen number of a soft-deleted value.
    pub fn removed_number(&self, name: &str) -> Option<i64> {
        self.removed_values
            .iter()
            .position(|v| v == name)
            .and_then(|i| self.removed_value_numbers.get(i).copied())
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.values.iter().position(|v| v == name)
    }

    pub fn set_namespace(&mut self, namespace: &str) {
        self.namespace = namespace.to_string();
    }

    pub fn set_use_flags(&mut self, use_flags: bool) {
        self.use_flags = use_flags;
    }

    /// Append a new active value.
    pub fn add_value(&mut self, name: &str, tooltip: &str) -> Result<(), Violation> {
        if let Some(rule) = validator::check_name(name) {
            return Err(violation(name, rule));
        }
        if self.has_value(name) {
            return Err(violation(name, ViolationRule::Duplicate));
        }
        if self.has_removed_value(name) {
            return Err(violation(name, ViolationRule::ActiveAndRemoved));
        }
        self.normalize();
        self.values.push(name.to_string());
        self.tooltips.push(tooltip.to_string());
        self.value_numbers.push(None);
        Ok(())
    }

    /// Returns false when `name` is not an active value.
    pub fn set_tooltip(&mut self, name: &str, tooltip: &str) -> bool {
        self.normalize();
        match self.index_of(name) {
            Some(i) => {
                self.tooltips[i] = tooltip.to_string();
                true
            }
            None => false,
        }
    }

    /// Rename an active value in place. Returns Ok(false) when `old` is not active.
    pub fn rename_value(&mut self, old: &str, new: &str) -> Result<bool, Violation> {
        let Some(index) = self.index_of(old) else {
            return Ok(false);
        };
        if old == new {
            return Ok(true);
        }
        if let Some(rule) = validator::check_name(new) {
            return Err(violation(new, rule));
        }
        if self.has_value(new) {
            return Err(violation(new, ViolationRule::Duplicate));
        }
        if self.has_removed_value(new) {
            return Err(violation(new, ViolationRule::ActiveAndRemoved));
        }
        self.values[index] = new.to_string();
        Ok(true)
    }

    /// Soft-delete an active value, freezing `number` as its retired value.
    /// Returns false when `name` is not active.
    pub fn remove_value(&mut self, name: &str, number: i64) -> bool {
        self.normalize();
        let Some(index) = self.index_of(name) else {
            return false;
        };
        self.values.remove(index);
        self.tooltips.remove(index);
        self.value_numbers.remove(index);
        self.removed_values.push(name.to_string());
        self.removed_value_numbers.push(number);
        true
    }

    /// Move a soft-deleted value back to the end of the active list.
    /// Returns false when `name` was not removed.
    pub fn restore_value(&mut self, name: &str) -> bool {
        self.normalize();
        let Some(index) = self.removed_values.iter().position(|v| v == name) else {
            return false;
        };
        self.removed_values.remove(index);
        self.removed_value_numbers.remove(index);
        self.values.push(name.to_string());
        self.tooltips.push(String::new());
        self.value_numbers.push(None);
        true
    }

    /// Replace the pinned numbers; padded or truncated to the active list.
    pub fn set_value_numbers(&mut self, numbers: Vec<Option<i64>>) {
        self.value_numbers = numbers;
        self.normalize();
    }

    /// Pad or truncate the auxiliary lists to their primary list's length.
    /// Returns true when anything had to change.
    pub fn normalize(&mut self) -> bool {
        let mismatched = self.tooltips.len() != self.values.len()
            || self.value_numbers.len() != self.values.len()
            || self.removed_value_numbers.len() != self.removed_values.len();
        self.tooltips.resize(self.values.len(), String::new());
        self.value_numbers.resize(self.values.len(), None);
        self.removed_value_numbers.resize(self.removed_values.len(), 0);
        mismatched
    }

    pub fn members(&self) -> MemberSnapshot {
        MemberSnapshot {
            values: self.values.clone(),
            tooltips: self.tooltips.clone(),
            value_numbers: self.value_numbers.clone(),
            removed_values: self.removed_values.clone(),
            removed_value_numbers: self.removed_value_numbers.clone(),
        }
    }

    /// Swap in a complete new member snapshot in one step.
    pub fn replace_members(&mut self, snapshot: MemberSnapshot) {
        self.values = snapshot.values;
        self.tooltips = snapshot.tooltips;
        self.value_numbers = snapshot.value_numbers;
        self.removed_values = snapshot.removed_values;
        self.removed_value_numbers = snapshot.removed_value_numbers;
        self.normalize();
    }
}

fn violation(name: &str, rule: ViolationRule) -> Violation {
    Violation {
        name: name.to_string(),
        rule,
    }
}
