//! Submission coordinator: hands the finished draft to the onboarding
//! service exactly once per attempt.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use super::client::OnboardingClient;
use super::model::{Draft, OnboardingRequest, SessionIdentity};
use crate::error::SubmissionError;
use crate::session::SessionContext;

/// Default bound on a single create call.
pub const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_secs(15);

/// Client-side destinations the wizard can send the user to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Onboarding,
    Dashboard,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Onboarding => "/onboarding",
            Self::Dashboard => "/dashboard",
        }
    }
}

/// Receives navigation requests. Implemented by the presentation layer.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Navigator that only logs, for headless use.
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, route: Route) {
        info!(path = route.path(), "Navigate");
    }
}

/// Releases the in-flight flag on every exit path.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Serializes the draft, performs the create call, and on success stores the
/// identity and navigates to the dashboard.
pub struct SubmissionCoordinator {
    client: Arc<dyn OnboardingClient>,
    session: SessionContext,
    navigator: Arc<dyn Navigator>,
    timeout: Duration,
    in_flight: AtomicBool,
}

impl SubmissionCoordinator {
    pub fn new(
        client: Arc<dyn OnboardingClient>,
        session: SessionContext,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            client,
            session,
            navigator,
            timeout: DEFAULT_SUBMIT_TIMEOUT,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Whether a create call is outstanding.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Submit the draft.
    ///
    /// Never retries. On any failure nothing is stored and no navigation
    /// happens; the draft is only borrowed, so the caller can retry as is.
    pub async fn submit(
        &self,
        draft: &Draft,
        idempotency_key: Uuid,
    ) -> Result<SessionIdentity, SubmissionError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!(%idempotency_key, "Submit ignored, another submit is in flight");
            return Err(SubmissionError::InFlight);
        }
        let _guard = InFlightGuard(&self.in_flight);

        let request = OnboardingRequest::from(draft);
        info!(%idempotency_key, goals = request.goals.len(), "Submitting onboarding");

        let response = match tokio::time::timeout(
            self.timeout,
            self.client.create_profile(&request, idempotency_key),
        )
        .await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(%idempotency_key, error = %e, retryable = e.is_retryable(), "Onboarding submit failed");
                return Err(e);
            }
            Err(_) => {
                warn!(%idempotency_key, timeout = ?self.timeout, "Onboarding submit timed out");
                return Err(SubmissionError::Timeout(self.timeout));
            }
        };

        let identity = response.into_identity();
        self.session.store_identity(&identity).await?;
        info!(user_id = %identity.id, "Onboarding complete");
        self.navigator.navigate(Route::Dashboard);
        Ok(identity)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;

    use super::*;
    use crate::onboarding::model::OnboardingResponse;

    /// Scripted client: replies with queued results, counts calls.
    pub struct ScriptedClient {
        replies: Mutex<Vec<Result<serde_json::Value, SubmissionError>>>,
        pub calls: AtomicUsize,
        pub keys: Mutex<Vec<Uuid>>,
        pub delay: Duration,
    }

    impl ScriptedClient {
        pub fn new(replies: Vec<Result<serde_json::Value, SubmissionError>>) -> Self {
            Self {
                replies: Mutex::new(replies),
                calls: AtomicUsize::new(0),
                keys: Mutex::new(Vec::new()),
                delay: Duration::ZERO,
            }
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl OnboardingClient for ScriptedClient {
        async fn create_profile(
            &self,
            _request: &OnboardingRequest,
            idempotency_key: Uuid,
        ) -> Result<OnboardingResponse, SubmissionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.keys.lock().unwrap().push(idempotency_key);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let next = self.replies.lock().unwrap().remove(0);
            next.map(|body| serde_json::from_value(body).unwrap())
        }
    }

    /// Records every navigation request.
    #[derive(Default)]
    pub struct RecordingNavigator {
        pub routes: Mutex<Vec<Route>>,
    }

    impl RecordingNavigator {
        pub fn routes(&self) -> Vec<Route> {
            self.routes.lock().unwrap().clone()
        }
    }

    impl Navigator for RecordingNavigator {
        fn navigate(&self, route: Route) {
            self.routes.lock().unwrap().push(route);
        }
    }
}
