use crate::definition::EnumDefinition;
use log::warn;
use std::collections::{HashMap, HashSet};

/// How numeric values are handed out to members without one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberingMode {
    /// 0, 1, 2, 3, ...
    Sequential,
    /// 1, 2, 4, 8, ... every member stays an independent bit
    PowersOfTwo,
}

impl NumberingMode {
    /// None once the next number no longer fits in an `i64`.
    fn after(self, max: Option<i64>) -> Option<i64> {
        match self {
            NumberingMode::Sequential => max.map_or(Some(0), |m| m.checked_add(1)),
            NumberingMode::PowersOfTwo => power_of_two_above(max),
        }
    }
}

/// Operator-selected numbering settings, passed in rather than read globally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberingPolicy {
    /// Number unflagged enums 1, 2, 4, ... too, so switching them to flags
    /// later needs no renumbering
    pub powers_of_two_for_unflagged: bool,
}

impl NumberingPolicy {
    /// Flags enums always use powers of two.
    pub fn mode_for(&self, use_flags: bool) -> NumberingMode {
        if use_flags || self.powers_of_two_for_unflagged {
            NumberingMode::PowersOfTwo
        } else {
            NumberingMode::Sequential
        }
    }

    pub fn mode_of(&self, def: &EnumDefinition) -> NumberingMode {
        self.mode_for(def.use_flags())
    }
}

impl Default for NumberingPolicy {
    fn default() -> Self {
        Self {
            powers_of_two_for_unflagged: true,
        }
    }
}

/// Smallest power of two strictly greater than `max`, 1 when there is none.
/// None when that power is past `1 << 62`.
fn power_of_two_above(max: Option<i64>) -> Option<i64> {
    match max {
        Some(m) if m >= 1 => (m as u64 + 1)
            .checked_next_power_of_two()
            .and_then(|p| i64::try_from(p).ok()),
        _ => Some(1),
    }
}

/// Value for one new member given the values already in use, or None when
/// `mode` has no number left above them.
pub fn next_value(current: &[i64], mode: NumberingMode) -> Option<i64> {
    mode.after(current.iter().copied().max())
}

/// Walks active members in order, tracking the running maximum so members
/// numbered together never collide, and skipping retired numbers.
struct Walker {
    mode: NumberingMode,
    retired: HashSet<i64>,
    running_max: Option<i64>,
}

impl Walker {
    fn new(mode: NumberingMode, retired: &[i64]) -> Self {
        Self {
            mode,
            retired: retired.iter().copied().collect(),
            running_max: None,
        }
    }

    fn candidate(&self) -> Option<i64> {
        let mut candidate = self.mode.after(self.running_max)?;
        while self.retired.contains(&candidate) {
            candidate = self.mode.after(Some(candidate))?;
        }
        Some(candidate)
    }

    fn record(&mut self, number: i64) {
        self.running_max = Some(self.running_max.map_or(number, |m| m.max(number)));
    }
}

/// Numbers for every active value of `def`, in order. Pinned numbers are
/// used as-is; the rest come from the numbering policy. None when an
/// unpinned member has no number left to take.
pub fn assign_numbers(def: &EnumDefinition, mode: NumberingMode) -> Option<Vec<i64>> {
    let mut walker = Walker::new(mode, def.removed_value_numbers());
    let mut numbers = Vec::with_capacity(def.values().len());
    for i in 0..def.values().len() {
        let pin = def.value_numbers().get(i).copied().flatten();
        let Some(number) = pin.or_else(|| walker.candidate()) else {
            warn!(
                "{}: no {:?} number left for '{}'",
                def.enum_name(),
                mode,
                def.values()[i]
            );
            return None;
        };
        walker.record(number);
        numbers.push(number);
    }
    Some(numbers)
}

/// Minimal pins reproducing `numbers` under `mode`: a member is pinned only
/// when its number differs from what the policy would assign at its position.
/// `None` entries take the policy's number.
pub fn canonical_pins(numbers: &[Option<i64>], retired: &[i64], mode: NumberingMode) -> Vec<Option<i64>> {
    let mut walker = Walker::new(mode, retired);
    numbers
        .iter()
        .map(|number| match (*number, walker.candidate()) {
            (Some(n), Some(candidate)) if n == candidate => {
                walker.record(n);
                None
            }
            (Some(n), _) => {
                walker.record(n);
                Some(n)
            }
            (None, Some(candidate)) => {
                walker.record(candidate);
                None
            }
            (None, None) => None,
        })
        .collect()
}

/// Number the active value `name` is generated with.
pub fn number_of(def: &EnumDefinition, name: &str, mode: NumberingMode) -> Option<i64> {
    let index = def.values().iter().position(|v| v == name)?;
    assign_numbers(def, mode)?.get(index).copied()
}

/// Run `edit` on `def` so that every member surviving it keeps the number it
/// was generated with. Restored members get their retired number back.
pub fn preserving_numbers<R>(
    def: &mut EnumDefinition,
    policy: &NumberingPolicy,
    edit: impl FnOnce(&mut EnumDefinition) -> R,
) -> R {
    let before: HashMap<String, i64> = def
        .values()
        .iter()
        .cloned()
        .zip(assign_numbers(def, policy.mode_of(def)).unwrap_or_default())
        .chain(
            def.removed_values()
                .iter()
                .cloned()
                .zip(def.removed_value_numbers().iter().copied()),
        )
        .collect();

    let result = edit(def);

    let numbers: Vec<Option<i64>> = def
        .values()
        .iter()
        .zip(def.value_numbers())
        .map(|(name, pin)| before.get(name).copied().or(*pin))
        .collect();
    let pins = canonical_pins(&numbers, def.removed_value_numbers(), policy.mode_of(def));
    def.set_value_numbers(pins);
    result
}

/// Soft-delete `name`, retiring the number it is generated with.
/// Returns the retired number, or None when `name` is not active.
pub fn soft_delete(def: &mut EnumDefinition, name: &str, policy: &NumberingPolicy) -> Option<i64> {
    let number = number_of(def, name, policy.mode_of(def))?;
    preserving_numbers(def, policy, |d| d.remove_value(name, number)).then_some(number)
}

/// Reactivate a soft-deleted value with its retired number.
pub fn restore(def: &mut EnumDefinition, name: &str, policy: &NumberingPolicy) -> bool {
    preserving_numbers(def, policy, |d| d.restore_value(name))
}
