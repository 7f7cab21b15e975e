//! Cluster overview, membership, alarms, and endpoint probes.

use std::sync::Arc;
use std::time::Instant;

use etcdash_backend::{
    Alarm, AlarmType, AuthStatus, ClusterInfo, EndpointHealth, EndpointStatus, EtcdBackend,
    Lease, Member, Role, User,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::Success;
use crate::error::{ConsoleError, ConsoleResultExt};
use crate::validate;

/// Everything the dashboard page shows, fetched in one go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub cluster_info: ClusterInfo,
    pub auth_status: AuthStatus,
    pub users: Vec<User>,
    pub roles: Vec<Role>,
    pub leases: Vec<Lease>,
    pub alarms: Vec<Alarm>,
    pub members: Vec<Member>,
}

/// Outcome of a leadership transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveLeaderResult {
    pub success: bool,
    /// Hex ID of the member asked to take over.
    pub new_leader_id: String,
}

pub struct ClusterAdmin {
    backend: Arc<dyn EtcdBackend>,
}

impl ClusterAdmin {
    #[must_use]
    pub fn new(backend: Arc<dyn EtcdBackend>) -> Self {
        Self { backend }
    }

    /// # Errors
    ///
    /// Returns a normalized [`ConsoleError`] if the status call fails.
    pub async fn cluster_info(&self) -> Result<ClusterInfo, ConsoleError> {
        Ok(self.backend.cluster_info().await?)
    }

    /// Cluster summary plus every entity list, issued concurrently.
    ///
    /// # Errors
    ///
    /// Returns the first normalized [`ConsoleError`] among the reads.
    /// List reads absorb not-found into empty lists.
    pub async fn dashboard(&self) -> Result<DashboardData, ConsoleError> {
        let backend = &self.backend;
        let (cluster_info, auth_status, users, roles, leases, alarms, members) = tokio::try_join!(
            async { Ok::<_, ConsoleError>(backend.cluster_info().await?) },
            async { Ok::<_, ConsoleError>(backend.auth_status().await?) },
            async { backend.users().await.or_not_found(Vec::new()) },
            async { backend.roles().await.or_not_found(Vec::new()) },
            async { backend.leases().await.or_not_found(Vec::new()) },
            async { backend.alarms().await.or_not_found(Vec::new()) },
            async { backend.members().await.or_not_found(Vec::new()) },
        )?;

        Ok(DashboardData {
            cluster_info,
            auth_status,
            users,
            roles,
            leases,
            alarms,
            members,
        })
    }

    // ── Members ──────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns a normalized [`ConsoleError`] on any failure except
    /// not-found, which yields an empty list.
    pub async fn get_members(&self) -> Result<Vec<Member>, ConsoleError> {
        self.backend.members().await.or_not_found(Vec::new())
    }

    /// Replace a member's peer URLs. `Ok(None)` if the member is gone.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::InvalidInput`] for a malformed ID or URL
    /// list, or a normalized backend error.
    pub async fn update_member(
        &self,
        id: &str,
        peer_urls: &[String],
    ) -> Result<Option<Member>, ConsoleError> {
        let id = validate::member_id(id)?;
        let urls = validate::peer_urls(peer_urls)?;
        let member = self.backend.update_member(id, &urls).await?;
        if member.is_some() {
            info!(member_id = %id, peer_urls = ?urls, "member updated");
        }
        Ok(member)
    }

    /// Promote a learner. `Ok(None)` if the member is gone.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::InvalidInput`] for a malformed ID, or a
    /// normalized backend error (e.g. the member is already voting).
    pub async fn promote_member(&self, id: &str) -> Result<Option<Member>, ConsoleError> {
        let id = validate::member_id(id)?;
        let member = self.backend.promote_member(id).await?;
        if member.is_some() {
            info!(member_id = %id, "member promoted");
        }
        Ok(member)
    }

    /// # Errors
    ///
    /// Returns [`ConsoleError::InvalidInput`] for a malformed ID, or a
    /// normalized backend error (`NOT_FOUND` for an unknown member).
    pub async fn remove_member(&self, id: &str) -> Result<Success, ConsoleError> {
        let id = validate::member_id(id)?;
        self.backend.remove_member(id).await?;
        info!(member_id = %id, "member removed");
        Ok(Success::ok())
    }

    /// # Errors
    ///
    /// Returns [`ConsoleError::InvalidInput`] for a malformed ID, or a
    /// normalized backend error.
    pub async fn move_leader(&self, target: &str) -> Result<MoveLeaderResult, ConsoleError> {
        let target = validate::member_id(target)?;
        self.backend.move_leader(target).await?;
        info!(member_id = %target, "leadership transferred");
        Ok(MoveLeaderResult {
            success: true,
            new_leader_id: target.to_hex(),
        })
    }

    // ── Alarms ───────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns a normalized [`ConsoleError`] on any failure except
    /// not-found, which yields an empty list.
    pub async fn get_alarms(&self) -> Result<Vec<Alarm>, ConsoleError> {
        self.backend.alarms().await.or_not_found(Vec::new())
    }

    /// # Errors
    ///
    /// Returns [`ConsoleError::InvalidInput`] for a malformed member ID, or
    /// a normalized backend error.
    pub async fn disarm_alarm(
        &self,
        member_id: &str,
        alarm: AlarmType,
    ) -> Result<Success, ConsoleError> {
        let member = validate::member_id(member_id)?;
        self.backend.disarm_alarm(member, alarm).await?;
        info!(member_id = %member, ?alarm, "alarm disarmed");
        Ok(Success::ok())
    }

    /// # Errors
    ///
    /// Returns a normalized [`ConsoleError`] if any deactivation fails.
    pub async fn disarm_all_alarms(&self) -> Result<Success, ConsoleError> {
        self.backend.disarm_all_alarms().await?;
        info!("all alarms disarmed");
        Ok(Success::ok())
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// Probe every configured endpoint in order. A failed probe is
    /// reported unhealthy with its elapsed time and does not stop the rest.
    pub async fn endpoint_health(&self) -> Vec<EndpointHealth> {
        let mut results = Vec::new();
        for endpoint in self.backend.endpoints() {
            let start = Instant::now();
            let health = match self.backend.probe_endpoint(&endpoint).await {
                Ok(_) => true,
                Err(e) => {
                    warn!(endpoint = %endpoint, error = %e, "endpoint unhealthy");
                    false
                }
            };
            results.push(EndpointHealth {
                took: format_took(start),
                endpoint,
                health,
            });
        }
        results
    }

    /// Status of every reachable endpoint, in configuration order.
    /// Unreachable endpoints are left out.
    pub async fn endpoint_status(&self) -> Vec<EndpointStatus> {
        let mut results = Vec::new();
        for endpoint in self.backend.endpoints() {
            match self.backend.probe_endpoint(&endpoint).await {
                Ok(status) => results.push(status),
                Err(e) => warn!(endpoint = %endpoint, error = %e, "endpoint status unavailable"),
            }
        }
        results
    }
}

fn format_took(start: Instant) -> String {
    format!("{:.3}ms", start.elapsed().as_secs_f64() * 1000.0)
}
