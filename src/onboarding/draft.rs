//! Draft store: the in-progress onboarding form with merge-update semantics.

use tracing::trace;

use super::model::{Draft, DraftUpdate};

/// Holds the draft across steps.
///
/// Pure in-memory state: no validation, no I/O. Which step may write is
/// decided by the wizard, not here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftStore {
    draft: Draft,
}

impl DraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    /// Clone of the current draft.
    pub fn snapshot(&self) -> Draft {
        self.draft.clone()
    }

    /// Merge `update` into the draft.
    ///
    /// Top-level fields are overwritten when set. Preferences merge one level
    /// deeper, so a single toggle keeps its siblings.
    pub fn update(&mut self, update: DraftUpdate) -> &Draft {
        let DraftUpdate {
            first_name,
            last_name,
            email,
            password,
            birth_date,
            goals,
            experience,
            preferences,
        } = update;

        if let Some(v) = first_name {
            self.draft.first_name = v;
        }
        if let Some(v) = last_name {
            self.draft.last_name = v;
        }
        if let Some(v) = email {
            self.draft.email = v;
        }
        if let Some(v) = password {
            self.draft.password = v;
        }
        if let Some(v) = birth_date {
            self.draft.birth_date = Some(v);
        }
        if let Some(v) = goals {
            self.draft.goals = v;
        }
        if let Some(v) = experience {
            self.draft.experience = Some(v);
        }
        if let Some(patch) = preferences {
            self.draft.preferences = self.draft.preferences.merged(&patch);
        }

        trace!(goals = self.draft.goals.len(), "Draft updated");
        &self.draft
    }

    /// Add the goal if absent, remove it if present. Returns the new membership.
    pub fn toggle_goal(&mut self, goal: &str) -> bool {
        let selected = self.draft.goals.toggle(goal);
        trace!(goal, selected, "Goal toggled");
        selected
    }
}
