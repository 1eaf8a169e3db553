//! Step sequencer: which onboarding step the wizard is showing.

use serde::{Deserialize, Serialize};

/// The steps of the onboarding wizard, in display order.
///
/// Progresses linearly: PersonalInfo → Goals → Preferences → Completion.
/// Submitting from Completion leaves the wizard; it is not a fifth step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStep {
    PersonalInfo,
    Goals,
    Preferences,
    Completion,
}

impl OnboardingStep {
    /// All steps in order.
    pub const ALL: [OnboardingStep; 4] = [
        Self::PersonalInfo,
        Self::Goals,
        Self::Preferences,
        Self::Completion,
    ];

    /// Zero-based position in the sequence.
    pub fn index(&self) -> usize {
        match self {
            Self::PersonalInfo => 0,
            Self::Goals => 1,
            Self::Preferences => 2,
            Self::Completion => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<OnboardingStep> {
        Self::ALL.get(index).copied()
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::PersonalInfo => "Welcome to SafeSpace",
            Self::Goals => "Your Mental Health Goals",
            Self::Preferences => "Personalize Your Experience",
            Self::Completion => "You're All Set!",
        }
    }

    pub fn subtitle(&self) -> &'static str {
        match self {
            Self::PersonalInfo => "Let's create your account",
            Self::Goals => "What would you like to focus on?",
            Self::Preferences => "Help us tailor SafeSpace for you",
            Self::Completion => "Welcome to your mental health journey",
        }
    }
}

impl Default for OnboardingStep {
    fn default() -> Self {
        Self::PersonalInfo
    }
}

impl std::fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::PersonalInfo => "personal_info",
            Self::Goals => "goals",
            Self::Preferences => "preferences",
            Self::Completion => "completion",
        };
        write!(f, "{s}")
    }
}

/// Result of pressing Continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Moved forward to this step.
    Moved(OnboardingStep),
    /// Already on the last step: the caller must submit instead.
    Submit,
}

/// Navigation position within the fixed step sequence.
///
/// Deserializing checks the index, so a stored state can't point past the
/// last step.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawWizardState")]
pub struct WizardState {
    current: usize,
}

#[derive(Deserialize)]
struct RawWizardState {
    current: usize,
}

impl TryFrom<RawWizardState> for WizardState {
    type Error = String;

    fn try_from(raw: RawWizardState) -> Result<Self, Self::Error> {
        if raw.current >= OnboardingStep::ALL.len() {
            return Err(format!(
                "step index {} out of range, expected 0..{}",
                raw.current,
                OnboardingStep::ALL.len()
            ));
        }
        Ok(Self {
            current: raw.current,
        })
    }
}

impl WizardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of steps (N).
    pub fn len(&self) -> usize {
        OnboardingStep::ALL.len()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_step(&self) -> OnboardingStep {
        OnboardingStep::ALL[self.current]
    }

    /// One-based step number for "Step 2 of 4" labels.
    pub fn step_number(&self) -> usize {
        self.current + 1
    }

    pub fn is_last(&self) -> bool {
        self.current + 1 == self.len()
    }

    pub fn can_retreat(&self) -> bool {
        self.current > 0
    }

    /// Move forward one step, or signal submit on the last step.
    ///
    /// The index never moves past N-1.
    pub fn advance(&mut self) -> Advance {
        if self.is_last() {
            return Advance::Submit;
        }
        self.current += 1;
        Advance::Moved(self.current_step())
    }

    /// Move back one step. No-op at the first step.
    pub fn retreat(&mut self) -> Option<OnboardingStep> {
        if !self.can_retreat() {
            return None;
        }
        self.current -= 1;
        Some(self.current_step())
    }

    /// `round((current + 1) / N * 100)`.
    pub fn progress_percent(&self) -> u8 {
        let n = self.len();
        let pct = ((self.current + 1) * 100 + n / 2) / n;
        pct as u8
    }
}
