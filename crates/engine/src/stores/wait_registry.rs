//! Approval and clarification waits behind one owned object.
//!
//! Constructed once per process (or per orchestration session) and shared as
//! `Arc<WaitRegistry>` between the orchestrator, which registers and waits,
//! and whatever delivers human input, which resolves.

use std::sync::Arc;
use std::time::Duration;

use humangate_domain::{PlanId, RequestId, WaitError, WaitKind};

use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::ports::ClockPort;
use crate::infrastructure::settings::WaitSettings;

use super::wait_store::WaitStore;

/// Plan approvals: yes or no.
pub type ApprovalStore = WaitStore<PlanId, bool>;

/// Clarification answers: free text.
pub type ClarificationStore = WaitStore<RequestId, String>;

pub struct WaitRegistry {
    approvals: ApprovalStore,
    clarifications: ClarificationStore,
}

impl WaitRegistry {
    pub fn new(settings: WaitSettings) -> Self {
        Self::with_clock(settings, Arc::new(SystemClock::new()))
    }

    pub fn with_clock(settings: WaitSettings, clock: Arc<dyn ClockPort>) -> Self {
        Self {
            approvals: WaitStore::with_clock(WaitKind::Approval, settings, Arc::clone(&clock)),
            clarifications: WaitStore::with_clock(WaitKind::Clarification, settings, clock),
        }
    }

    pub fn approvals(&self) -> &ApprovalStore {
        &self.approvals
    }

    pub fn clarifications(&self) -> &ClarificationStore {
        &self.clarifications
    }

    // Approvals

    pub fn register_approval(&self, plan_id: PlanId) -> Result<(), WaitError> {
        self.approvals.register(plan_id)
    }

    pub fn resolve_approval(&self, plan_id: &PlanId, approved: bool) -> Result<(), WaitError> {
        self.approvals.resolve(plan_id, approved)
    }

    pub async fn wait_for_approval(
        &self,
        plan_id: &PlanId,
        timeout: Option<Duration>,
    ) -> Result<bool, WaitError> {
        self.approvals.wait(plan_id, timeout).await
    }

    pub fn cleanup_approval(&self, plan_id: &PlanId) -> bool {
        self.approvals.cleanup(plan_id)
    }

    // Clarifications

    pub fn register_clarification(&self, request_id: RequestId) -> Result<(), WaitError> {
        self.clarifications.register(request_id)
    }

    pub fn resolve_clarification(
        &self,
        request_id: &RequestId,
        answer: impl Into<String>,
    ) -> Result<(), WaitError> {
        self.clarifications.resolve(request_id, answer.into())
    }

    pub async fn wait_for_clarification(
        &self,
        request_id: &RequestId,
        timeout: Option<Duration>,
    ) -> Result<String, WaitError> {
        self.clarifications.wait(request_id, timeout).await
    }

    pub fn cleanup_clarification(&self, request_id: &RequestId) -> bool {
        self.clarifications.cleanup(request_id)
    }

    /// Drop every wait of both kinds, waking suspended waiters with `Cancelled`.
    ///
    /// Returns the total number of slots removed.
    pub fn shutdown(&self) -> usize {
        let removed = self.approvals.clear() + self.clarifications.clear();
        tracing::info!(removed, "Wait registry shut down");
        removed
    }
}

impl Default for WaitRegistry {
    fn default() -> Self {
        Self::new(WaitSettings::default())
    }
}
