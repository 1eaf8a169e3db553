//! Client-side step validation and the policy that decides when it runs.

use std::sync::LazyLock;

use chrono::{NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::model::Draft;
use super::state::OnboardingStep;
use crate::error::{FieldIssue, ValidationError};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
});

/// When client-side checks gate the wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValidationPolicy {
    /// No client checks; the onboarding service is the only judge.
    None,
    /// Each step must pass its checks before Continue moves on.
    PerStep,
    /// Steps move freely; the whole draft is checked before submit.
    OnSubmit,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self::None
    }
}

impl std::fmt::Display for ValidationPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::PerStep => write!(f, "per-step"),
            Self::OnSubmit => write!(f, "on-submit"),
        }
    }
}

impl std::str::FromStr for ValidationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "per-step" | "per_step" => Ok(Self::PerStep),
            "on-submit" | "on_submit" => Ok(Self::OnSubmit),
            other => Err(format!(
                "unknown validation policy '{other}' (expected none, per-step or on-submit)"
            )),
        }
    }
}

impl ValidationPolicy {
    /// Checks to run before leaving `step` by Continue.
    pub fn check_advance(&self, step: OnboardingStep, draft: &Draft) -> Result<(), ValidationError> {
        match self {
            Self::PerStep => validate_step(step, draft),
            Self::None | Self::OnSubmit => Ok(()),
        }
    }

    /// Checks to run before the create call.
    pub fn check_submit(&self, draft: &Draft) -> Result<(), ValidationError> {
        match self {
            Self::None => Ok(()),
            Self::PerStep | Self::OnSubmit => validate_draft(draft),
        }
    }
}

/// Validate the fields owned by one step.
pub fn validate_step(step: OnboardingStep, draft: &Draft) -> Result<(), ValidationError> {
    let issues = match step {
        OnboardingStep::PersonalInfo => personal_info_issues(draft, Utc::now().date_naive()),
        OnboardingStep::Preferences => {
            if draft.experience.is_none() {
                vec![FieldIssue::new("experience", "please choose one option")]
            } else {
                Vec::new()
            }
        }
        OnboardingStep::Goals | OnboardingStep::Completion => Vec::new(),
    };

    if issues.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { step, issues })
    }
}

/// Validate every step in order, stopping at the first failing one.
pub fn validate_draft(draft: &Draft) -> Result<(), ValidationError> {
    OnboardingStep::ALL
        .iter()
        .try_for_each(|step| validate_step(*step, draft))
}

/// Whether `email` looks like `local@domain.tld`.
pub fn is_plausible_email(email: &str) -> bool {
    EMAIL_RE.is_match(email.trim())
}

fn personal_info_issues(draft: &Draft, today: NaiveDate) -> Vec<FieldIssue> {
    let mut issues = Vec::new();
    if draft.first_name.trim().is_empty() {
        issues.push(FieldIssue::new("firstName", "is required"));
    }
    if draft.last_name.trim().is_empty() {
        issues.push(FieldIssue::new("lastName", "is required"));
    }
    if draft.email.trim().is_empty() {
        issues.push(FieldIssue::new("email", "is required"));
    } else if !is_plausible_email(&draft.email) {
        issues.push(FieldIssue::new("email", "is not a valid address"));
    }
    if draft.password.is_empty() {
        issues.push(FieldIssue::new("password", "is required"));
    }
    match draft.birth_date {
        None => issues.push(FieldIssue::new("birthDate", "is required")),
        Some(date) if date > today => {
            issues.push(FieldIssue::new("birthDate", "cannot be in the future"))
        }
        Some(_) => {}
    }
    issues
}
