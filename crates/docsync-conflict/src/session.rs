//! Per-link conflict session
//!
//! Holds what a single link run needs to settle two-sided edits: the policy
//! engine, the optional decision provider and the choice the operator asked
//! to remember. A session is created for each link and dropped afterwards,
//! so a remembered choice never leaks into the next link.

use std::sync::Arc;

use tracing::{debug, info};

use docsync_core::domain::{LocalFile, RemoteFile};
use docsync_core::ports::{ConflictChoice, IConflictDecisionProvider};

use crate::error::ConflictError;
use crate::policy::{ConflictPolicy, PolicyEngine};

pub struct ConflictSession {
    engine: Arc<PolicyEngine>,
    provider: Option<Arc<dyn IConflictDecisionProvider>>,
    remembered: Option<ConflictChoice>,
}

impl ConflictSession {
    pub fn new(
        engine: Arc<PolicyEngine>,
        provider: Option<Arc<dyn IConflictDecisionProvider>>,
    ) -> Self {
        Self {
            engine,
            provider,
            remembered: None,
        }
    }

    pub fn remembered(&self) -> Option<ConflictChoice> {
        self.remembered
    }

    /// Decides how to settle a conflict on `path`
    ///
    /// A fixed policy answers directly. For `ask`, a remembered choice is
    /// reused; otherwise the provider is awaited and its answer is stored
    /// when it asks to be remembered.
    pub async fn decide(
        &mut self,
        path: &str,
        local: &LocalFile,
        remote: &RemoteFile,
    ) -> Result<ConflictChoice, ConflictError> {
        let policy = self.engine.evaluate(path);
        if let Some(choice) = policy.choice() {
            debug!(path, %policy, "Conflict settled by policy");
            return Ok(choice);
        }
        debug_assert_eq!(policy, ConflictPolicy::Ask);

        if let Some(choice) = self.remembered {
            debug!(path, %choice, "Conflict settled by remembered choice");
            return Ok(choice);
        }

        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| ConflictError::DecisionUnavailable(path.to_string()))?;
        let decision = provider
            .ask(path, local, remote)
            .await
            .map_err(|e| ConflictError::DecisionFailed(e.to_string()))?;

        if decision.remember {
            self.remembered = Some(decision.choice);
        }
        info!(path, choice = %decision.choice, remember = decision.remember, "Conflict decided");
        Ok(decision.choice)
    }
}
