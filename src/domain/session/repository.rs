//! Charging session repository interface

use async_trait::async_trait;
use uuid::Uuid;

use super::model::{ChargingSession, NewSession, SessionStatus};
use super::progress::ChargingSessionProgress;
use crate::domain::DomainResult;

#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Open a session in one transaction.
    ///
    /// Check order: station Active (`StationUnavailable`), no open session
    /// on the spot in either flow (`SpotBusy`), spot Available
    /// (`SpotNotAvailable`), no other live reservation or booking covering
    /// the current instant (`SlotConflict`). On success the session is
    /// inserted, the spot becomes Occupied and a Pending/Confirmed
    /// reservation becomes CheckedIn, all in the same commit.
    async fn start(&self, request: NewSession) -> DomainResult<ChargingSession>;

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<ChargingSession>>;

    /// Persist a session that `ChargingSession::complete` just closed.
    ///
    /// Fails with `SessionNotInProgress` if the stored row was already
    /// closed. In the same commit, advances a Pending/Confirmed reservation
    /// to CheckedIn and releases the spot unless another session holds it.
    async fn close(&self, session: &ChargingSession) -> DomainResult<()>;

    /// Staff status overwrite, decided on the stored row in one transaction.
    ///
    /// A non-terminal status only replaces the notes. A terminal status on
    /// an InProgress session closes it the way `close` does; on a closed
    /// session it rewrites status and notes and keeps cost and end time.
    /// Returns the row as written and whether this call closed it, or `None`
    /// if the session does not exist.
    async fn overwrite_status(
        &self,
        session_id: Uuid,
        status: SessionStatus,
        notes: Option<String>,
    ) -> DomainResult<Option<(ChargingSession, bool)>>;

    /// Write the live progress fields of `session` and append `record`.
    ///
    /// `record.recorded_at` is clamped to the newest existing history row.
    /// Fails with `SessionNotInProgress` if the stored row is closed.
    async fn record_progress(
        &self,
        session: &ChargingSession,
        record: ChargingSessionProgress,
    ) -> DomainResult<ChargingSessionProgress>;

    /// History ordered oldest first
    async fn progress_history(&self, session_id: Uuid)
        -> DomainResult<Vec<ChargingSessionProgress>>;

    /// Open sessions on a spot across both session flows
    async fn count_open_on_spot(&self, spot_id: Uuid) -> DomainResult<u64>;
}
