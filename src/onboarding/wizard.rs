//! The onboarding wizard: one draft, one step position, one submit handoff.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use super::draft::DraftStore;
use super::model::{Draft, DraftUpdate, SessionIdentity};
use super::state::{Advance, OnboardingStep, WizardState};
use super::submission::SubmissionCoordinator;
use super::validation::ValidationPolicy;
use crate::error::WizardError;

/// Outcome of pressing Continue.
#[derive(Debug, Clone, PartialEq)]
pub enum WizardOutcome {
    /// Moved to the next step.
    Moved(OnboardingStep),
    /// Submitted; the wizard is closed and the user is on the dashboard.
    Completed(SessionIdentity),
}

/// A single onboarding session.
///
/// Owns its draft and step position exclusively; step renderers write through
/// [`OnboardingWizard::update`] tagged with the step they render.
pub struct OnboardingWizard {
    draft: DraftStore,
    state: WizardState,
    policy: ValidationPolicy,
    coordinator: Arc<SubmissionCoordinator>,
    idempotency_key: Uuid,
    closed: bool,
}

impl OnboardingWizard {
    pub fn new(coordinator: Arc<SubmissionCoordinator>, policy: ValidationPolicy) -> Self {
        let idempotency_key = Uuid::new_v4();
        debug!(%idempotency_key, %policy, "Onboarding wizard started");
        Self {
            draft: DraftStore::new(),
            state: WizardState::new(),
            policy,
            coordinator,
            idempotency_key,
            closed: false,
        }
    }

    pub fn draft(&self) -> &Draft {
        self.draft.draft()
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn current_step(&self) -> OnboardingStep {
        self.state.current_step()
    }

    pub fn progress_percent(&self) -> u8 {
        self.state.progress_percent()
    }

    pub fn policy(&self) -> ValidationPolicy {
        self.policy
    }

    /// Key sent with every submit attempt of this wizard.
    pub fn idempotency_key(&self) -> Uuid {
        self.idempotency_key
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Whether Continue should be enabled.
    pub fn can_advance(&self) -> bool {
        !self.closed && !self.coordinator.is_in_flight()
    }

    fn ensure_open(&self) -> Result<(), WizardError> {
        if self.closed {
            Err(WizardError::Closed)
        } else {
            Ok(())
        }
    }

    fn ensure_current(&self, step: OnboardingStep) -> Result<(), WizardError> {
        let expected = self.state.current_step();
        if step != expected {
            debug!(%expected, got = %step, "Rejected update from hidden step");
            return Err(WizardError::StepMismatch { expected, got: step });
        }
        Ok(())
    }

    /// Merge an edit made on `step`. Edits from a step that is not displayed
    /// are rejected.
    pub fn update(&mut self, step: OnboardingStep, update: DraftUpdate) -> Result<&Draft, WizardError> {
        self.ensure_open()?;
        self.ensure_current(step)?;
        Ok(self.draft.update(update))
    }

    /// Toggle a goal tag from `step`. Returns the new membership.
    pub fn toggle_goal(&mut self, step: OnboardingStep, goal: &str) -> Result<bool, WizardError> {
        self.ensure_open()?;
        self.ensure_current(step)?;
        Ok(self.draft.toggle_goal(goal))
    }

    /// Go back one step. No-op on the first step.
    pub fn retreat(&mut self) -> Result<Option<OnboardingStep>, WizardError> {
        self.ensure_open()?;
        Ok(self.state.retreat())
    }

    /// Continue: validate per policy, then move on or submit.
    ///
    /// On any error the draft and step position are exactly as before.
    pub async fn advance(&mut self) -> Result<WizardOutcome, WizardError> {
        self.ensure_open()?;
        let step = self.state.current_step();
        self.policy.check_advance(step, self.draft.draft())?;

        // On the last step the sequencer signals Submit without moving.
        if let Advance::Moved(next) = self.state.advance() {
            debug!(from = %step, to = %next, progress = self.state.progress_percent(), "Step advanced");
            return Ok(WizardOutcome::Moved(next));
        }

        self.policy.check_submit(self.draft.draft())?;
        let identity = self
            .coordinator
            .submit(self.draft.draft(), self.idempotency_key)
            .await?;

        self.closed = true;
        info!(user_id = %identity.id, "Onboarding wizard closed");
        Ok(WizardOutcome::Completed(identity))
    }
}
