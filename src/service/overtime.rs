use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::error::ClockError;
use crate::model::employee::RoleKind;
use crate::model::overtime::{
    Decision, NewOvertime, OtStatus, OvertimeRequest, Viewer, generate_request_id,
};
use crate::service::bounded;
use crate::store::OvertimeBackend;
use crate::utils::clock::OrgClock;

/// Overtime requests and their Pending -> Approved | Rejected workflow.
#[derive(Clone)]
pub struct OvertimeRequestStore {
    backend: Arc<dyn OvertimeBackend>,
    clock: OrgClock,
    store_timeout: Duration,
}

impl OvertimeRequestStore {
    pub fn new(backend: Arc<dyn OvertimeBackend>, clock: OrgClock, store_timeout: Duration) -> Self {
        Self {
            backend,
            clock,
            store_timeout,
        }
    }

    /// Files a new request; it always starts out pending.
    pub async fn create(&self, new: NewOvertime) -> Result<OvertimeRequest, ClockError> {
        let reason = new.reason.trim();
        if reason.is_empty() {
            return Err(ClockError::BadRequest("reason is required".to_string()));
        }

        let now = self.clock.now();
        let request = OvertimeRequest {
            id: generate_request_id(now, &new.employee_id),
            employee_id: new.employee_id,
            name: new.name,
            site_id: new.site_id,
            interval: new.interval,
            reason: reason.to_string(),
            status: OtStatus::Pending,
            approver_name: None,
            decided_at: None,
            created_at: now,
        };

        bounded(self.store_timeout, self.backend.insert_request(&request)).await?;

        info!(
            request_id = %request.id,
            employee_id = %request.employee_id,
            hours = request.interval.hours(),
            "Overtime requested"
        );
        Ok(request)
    }

    /// Approves or rejects a pending request. A decided request is never
    /// overwritten; the second decision fails with `AlreadyDecided`.
    pub async fn decide(
        &self,
        request_id: &str,
        new_status: OtStatus,
        approver_name: &str,
        acting_role: RoleKind,
    ) -> Result<OvertimeRequest, ClockError> {
        if !new_status.is_decision() {
            return Err(ClockError::BadRequest(
                "decision must be Approved or Rejected".to_string(),
            ));
        }
        let approver_name = approver_name.trim();
        if approver_name.is_empty() {
            return Err(ClockError::BadRequest("approverName is required".to_string()));
        }

        let current = self.fetch(request_id).await?;
        if acting_role != RoleKind::Supervisor {
            info!(request_id, role = %acting_role, "Overtime decision refused");
            return Err(ClockError::Forbidden);
        }
        if current.status != OtStatus::Pending {
            return Err(ClockError::AlreadyDecided {
                status: current.status,
            });
        }

        let decision = Decision {
            status: new_status,
            approver_name: approver_name.to_string(),
            decided_at: self.clock.now(),
        };
        let applied = bounded(
            self.store_timeout,
            self.backend.decide_if_pending(request_id, &decision),
        )
        .await?;

        if !applied {
            // lost the race to another decision
            let winner = self.fetch(request_id).await?;
            return Err(ClockError::AlreadyDecided {
                status: winner.status,
            });
        }

        let mut updated = current;
        updated.apply(&decision);

        info!(
            request_id,
            status = %new_status,
            approver = approver_name,
            "Overtime decided"
        );
        Ok(updated)
    }

    /// Requests the viewer may see, most recent first.
    pub async fn visible_to(&self, viewer: &Viewer) -> Result<Vec<OvertimeRequest>, ClockError> {
        bounded(self.store_timeout, self.backend.requests_for(viewer)).await
    }

    async fn fetch(&self, request_id: &str) -> Result<OvertimeRequest, ClockError> {
        bounded(self.store_timeout, self.backend.find_request(request_id))
            .await?
            .ok_or(ClockError::RequestNotFound)
    }
}
