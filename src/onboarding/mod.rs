//! Onboarding: the four-step sign-up wizard and the service behind it.
//!
//! The client side collects a `Draft` across the steps (`draft`, `state`,
//! `validation`), then `submission` hands it to the onboarding service once
//! through an `OnboardingClient`. `routes` is that service's HTTP surface.

pub mod client;
pub mod draft;
pub mod model;
pub mod routes;
pub mod state;
pub mod submission;
pub mod validation;
pub mod wizard;

pub use client::{HttpOnboardingClient, OnboardingClient};
pub use draft::DraftStore;
pub use model::{
    Draft, DraftUpdate, Experience, GoalSet, OnboardingRequest, OnboardingResponse,
    PreferenceField, Preferences, Privacy, SessionIdentity, UserProfile,
};
pub use routes::{OnboardingRouteState, onboarding_routes};
pub use state::{OnboardingStep, WizardState};
pub use submission::{LogNavigator, Navigator, Route, SubmissionCoordinator};
pub use validation::ValidationPolicy;
pub use wizard::{OnboardingWizard, WizardOutcome};
