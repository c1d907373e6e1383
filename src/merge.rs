//! Reconciles an enum read back from disk with its stored definition.

use crate::definition::{EnumDefinition, MemberSnapshot};
use crate::numbering::{self, NumberingPolicy};
use crate::parser::ParsedEnum;
use log::warn;
use std::collections::HashSet;

/// What a merge changed, by member name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub added: Vec<String>,
    pub reactivated: Vec<String>,
    pub retired: Vec<String>,
    /// Members missing from the file altogether
    pub dropped: Vec<String>,
    pub tooltips_updated: Vec<String>,
    pub namespace_changed: bool,
    pub flags_changed: bool,
}

impl MergeReport {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.reactivated.is_empty()
            && self.retired.is_empty()
            && self.dropped.is_empty()
            && self.tooltips_updated.is_empty()
            && !self.namespace_changed
            && !self.flags_changed
    }

    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        for (label, names) in [
            ("added", &self.added),
            ("reactivated", &self.reactivated),
            ("retired", &self.retired),
            ("dropped", &self.dropped),
            ("tooltips", &self.tooltips_updated),
        ] {
            if !names.is_empty() {
                parts.push(format!("{} [{}]", label, names.join(", ")));
            }
        }
        if self.namespace_changed {
            parts.push("namespace".to_string());
        }
        if self.flags_changed {
            parts.push("flags".to_string());
        }
        if parts.is_empty() {
            "no changes".to_string()
        } else {
            parts.join("; ")
        }
    }
}

#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub definition: EnumDefinition,
    pub report: MergeReport,
    /// Whether `definition` differs from the one passed in
    pub changed: bool,
}

/// Merge `parsed` into a copy of `existing`.
///
/// File order decides the active order. Tooltips only stored in the
/// definition survive unless the file carries a non-empty one. Obsolete
/// members go to the removed list and keep a previously frozen number.
/// `existing` itself is never touched, so a failure leaves it intact.
pub fn merge(existing: &EnumDefinition, parsed: &ParsedEnum, policy: &NumberingPolicy) -> MergeOutcome {
    let mut current = existing.clone();
    current.normalize();
    let mut report = MergeReport::default();

    if parsed.namespace != current.namespace() {
        current.set_namespace(&parsed.namespace);
        report.namespace_changed = true;
    }
    if parsed.use_flags != current.use_flags() {
        current.set_use_flags(parsed.use_flags);
        report.flags_changed = true;
    }

    let mut next = MemberSnapshot::default();
    let mut file_numbers = Vec::new();
    let mut seen = HashSet::new();

    for value in &parsed.values {
        let name = value.name.as_str();
        if !seen.insert(name) {
            warn!(
                "Enum '{}' declares '{}' more than once; keeping the first",
                current.enum_name(),
                name
            );
            continue;
        }

        if value.is_obsolete {
            let number = current.removed_number(name).unwrap_or(value.numeric_value);
            if current.has_value(name) {
                report.retired.push(name.to_string());
            }
            next.removed_values.push(name.to_string());
            next.removed_value_numbers.push(number);
            continue;
        }

        let existing_tooltip = current.tooltip(name);
        let tooltip = if value.tooltip.is_empty() {
            existing_tooltip.to_string()
        } else {
            value.tooltip.clone()
        };

        if current.has_value(name) {
            if tooltip != existing_tooltip {
                report.tooltips_updated.push(name.to_string());
            }
        } else if current.has_removed_value(name) {
            report.reactivated.push(name.to_string());
        } else {
            report.added.push(name.to_string());
        }

        next.values.push(name.to_string());
        next.tooltips.push(tooltip);
        file_numbers.push(Some(value.numeric_value));
    }

    report.dropped = current
        .values()
        .iter()
        .chain(current.removed_values())
        .filter(|name| !seen.contains(name.as_str()))
        .cloned()
        .collect();

    let mut pins = numbering::canonical_pins(
        &file_numbers,
        &next.removed_value_numbers,
        policy.mode_for(current.use_flags()),
    );
    // A stored pin equal to the policy's number resolves the same; keep it
    for ((pin, name), number) in pins.iter_mut().zip(&next.values).zip(&file_numbers) {
        if pin.is_none() && stored_pin(&current, name) == *number {
            *pin = *number;
        }
    }
    next.value_numbers = pins;

    current.replace_members(next);
    let changed = current != *existing;

    MergeOutcome {
        definition: current,
        report,
        changed,
    }
}

fn stored_pin(def: &EnumDefinition, name: &str) -> Option<i64> {
    let index = def.values().iter().position(|v| v == name)?;
    def.value_numbers().get(index).copied().flatten()
}
