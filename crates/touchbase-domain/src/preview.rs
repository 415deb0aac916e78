//! Preview state machine for the interactive scheduler.
//!
//! A pure reducer wraps a [`CadenceRule`] with a set of user-toggled
//! exclusions. The UI re-runs the engine on every rule change and renders
//! the fresh series with exclusion checkboxes keyed by ordinal position.
//!
//! Exclusions are positional: if the rule changes after ordinal 2 was
//! excluded, ordinal 2 in the regenerated series may be a different date and
//! the exclusion is not invalidated. This is a deliberate simplicity
//! trade-off carried over from the source design.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::cadence::{
    CadenceKind, CadenceRule, CustomInterval, GeneratedInstance, Mode, generate,
};

/// Partial update applied to the rule by a `SetFields` action.
/// `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleUpdate {
    pub mode: Option<Mode>,
    pub cadence: Option<CadenceKind>,
    pub start_date: Option<String>,
    pub time: Option<String>,
    pub weekdays: Option<BTreeSet<u8>>,
    pub month_day: Option<u32>,
    pub occurrences: Option<u32>,
    pub custom_every: Option<CustomInterval>,
}

/// Actions accepted by the preview reducer.
#[derive(Debug, Clone)]
pub enum PreviewAction {
    SetFields(RuleUpdate),
    ToggleWeekday(u8),
    ToggleExclusion(usize),
}

/// Rule plus the set of excluded ordinals. All transitions go through
/// [`reduce`](PreviewState::reduce); there is no other mutation path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewState {
    pub rule: CadenceRule,
    pub exclusions: BTreeSet<usize>,
}

impl PreviewState {
    pub fn new(rule: CadenceRule) -> Self {
        Self {
            rule,
            exclusions: BTreeSet::new(),
        }
    }

    /// Apply one action, producing the next state. Pure — safe to call from
    /// any thread or UI event handler.
    pub fn reduce(mut self, action: PreviewAction) -> Self {
        match action {
            PreviewAction::SetFields(update) => {
                let RuleUpdate {
                    mode,
                    cadence,
                    start_date,
                    time,
                    weekdays,
                    month_day,
                    occurrences,
                    custom_every,
                } = update;
                if let Some(mode) = mode {
                    self.rule.mode = mode;
                }
                if let Some(cadence) = cadence {
                    self.rule.cadence = cadence;
                }
                if let Some(start_date) = start_date {
                    self.rule.start_date = start_date;
                }
                if let Some(time) = time {
                    self.rule.time = time;
                }
                if let Some(weekdays) = weekdays {
                    self.rule.weekdays = weekdays;
                }
                if let Some(month_day) = month_day {
                    self.rule.month_day = month_day;
                }
                if let Some(occurrences) = occurrences {
                    self.rule.occurrences = occurrences;
                }
                if let Some(custom_every) = custom_every {
                    self.rule.custom_every = custom_every;
                }
                self
            }
            PreviewAction::ToggleWeekday(day) => {
                if !self.rule.weekdays.remove(&day) {
                    self.rule.weekdays.insert(day);
                }
                self
            }
            PreviewAction::ToggleExclusion(ordinal) => {
                if !self.exclusions.remove(&ordinal) {
                    self.exclusions.insert(ordinal);
                }
                self
            }
        }
    }

    /// Regenerate the series and flag each instance excluded by ordinal.
    pub fn instances(&self, hard_cap: u32) -> Vec<GeneratedInstance> {
        generate(&self.rule, hard_cap)
            .into_iter()
            .map(|mut instance| {
                instance.excluded = self.exclusions.contains(&instance.ordinal);
                instance
            })
            .collect()
    }

    /// The commit set: every generated instance that is not excluded.
    /// This is the only input the schedule store receives.
    pub fn active(&self, hard_cap: u32) -> Vec<GeneratedInstance> {
        self.instances(hard_cap)
            .into_iter()
            .filter(|instance| !instance.excluded)
            .collect()
    }
}
