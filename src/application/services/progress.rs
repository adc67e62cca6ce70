//! Live charging progress and its history

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::application::ports::Notifier;
use crate::domain::session::{ChargingSession, ChargingSessionProgress, ProgressReport};
use crate::domain::{DomainError, DomainResult, RepositoryProvider};

pub struct ProgressService {
    repos: Arc<dyn RepositoryProvider>,
    notifier: Arc<dyn Notifier>,
}

impl ProgressService {
    pub fn new(repos: Arc<dyn RepositoryProvider>, notifier: Arc<dyn Notifier>) -> Self {
        Self { repos, notifier }
    }

    /// Overwrite the live fields and append one history row.
    pub async fn update_progress(
        &self,
        session_id: Uuid,
        report: ProgressReport,
    ) -> DomainResult<ChargingSession> {
        report.validate()?;
        let mut session = self
            .repos
            .sessions()
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| DomainError::not_found("ChargingSession", session_id))?;

        let now = Utc::now();
        session.apply_progress(
            report.soc,
            report.power_kw,
            report.energy_delivered_kwh,
            report.estimated_minutes_remaining,
            now,
        )?;
        let record = ChargingSessionProgress::record(
            session.id,
            &report,
            session.estimated_minutes_remaining,
            now,
        );
        let stored = self.repos.sessions().record_progress(&session, record).await?;

        debug!(
            %session_id,
            soc = stored.soc,
            power_kw = stored.power_kw,
            energy_kwh = stored.energy_delivered_kwh,
            "Progress recorded"
        );
        self.notifier.session_changed(&session);
        Ok(session)
    }

    pub async fn history(&self, session_id: Uuid) -> DomainResult<Vec<ChargingSessionProgress>> {
        self.ensure_exists(session_id).await?;
        self.repos.sessions().progress_history(session_id).await
    }

    /// Minutes remaining from the session's stored live values.
    pub async fn estimate(&self, session_id: Uuid) -> DomainResult<Option<f64>> {
        Ok(self.ensure_exists(session_id).await?.estimate_time_remaining())
    }

    async fn ensure_exists(&self, session_id: Uuid) -> DomainResult<ChargingSession> {
        self.repos
            .sessions()
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| DomainError::not_found("ChargingSession", session_id))
    }
}
