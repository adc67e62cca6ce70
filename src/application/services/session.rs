//! Charging session lifecycle

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::announce_spot;
use crate::application::ports::Notifier;
use crate::config::BillingConfig;
use crate::domain::session::{ChargingSession, NewSession, SessionStatus};
use crate::domain::{DomainError, DomainResult, RepositoryProvider};

/// Values reported when a session is finished.
#[derive(Debug, Clone, Default)]
pub struct CompleteSession {
    pub energy_delivered_kwh: f64,
    /// Explicit bill; computed from energy and price when absent
    pub cost: Option<f64>,
    /// Replaces the start-time price snapshot for this bill only
    pub price_per_kwh: Option<f64>,
    pub notes: Option<String>,
}

pub struct SessionService {
    repos: Arc<dyn RepositoryProvider>,
    notifier: Arc<dyn Notifier>,
    billing: BillingConfig,
}

impl SessionService {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        notifier: Arc<dyn Notifier>,
        billing: BillingConfig,
    ) -> Self {
        Self {
            repos,
            notifier,
            billing,
        }
    }

    pub async fn start_session(&self, request: NewSession) -> DomainResult<ChargingSession> {
        if let Some(vehicle_id) = request.vehicle_id {
            if !self
                .repos
                .vehicles()
                .vehicle_belongs_to_user(vehicle_id, request.user_id)
                .await?
            {
                return Err(DomainError::Forbidden(
                    "vehicle does not belong to the caller".into(),
                ));
            }
        }
        if let Some(reservation_id) = request.reservation_id {
            let reservation = self
                .repos
                .reservations()
                .find_by_id(reservation_id)
                .await?
                .ok_or_else(|| DomainError::not_found("Reservation", reservation_id))?;
            if !reservation.is_owned_by(request.user_id) {
                return Err(DomainError::Forbidden(
                    "reservation belongs to another user".into(),
                ));
            }
            if reservation.spot_id != request.spot_id {
                return Err(DomainError::Validation(
                    "reservation is for a different spot".into(),
                ));
            }
            if !reservation.status.can_check_in() {
                return Err(DomainError::Validation(format!(
                    "reservation is {}",
                    reservation.status
                )));
            }
        }

        let session = match self.repos.sessions().start(request.clone()).await {
            Ok(session) => session,
            Err(e) => {
                if e.is_conflict() {
                    metrics::counter!("session_start_conflicts_total").increment(1);
                }
                warn!(spot_id = %request.spot_id, error = %e, "Session start rejected");
                return Err(e);
            }
        };

        metrics::counter!("sessions_started_total").increment(1);
        info!(
            session_id = %session.id,
            spot_id = %session.spot_id,
            user_id = %session.user_id,
            price_per_kwh = session.price_per_kwh,
            "Charging session started"
        );

        self.notifier.session_changed(&session);
        if let Some(reservation_id) = session.reservation_id {
            self.announce_reservation(reservation_id).await;
        }
        announce_spot(self.repos.as_ref(), self.notifier.as_ref(), session.spot_id).await;
        Ok(session)
    }

    /// Start from a scanned QR code. The payload is the spot id.
    pub async fn start_from_qr(
        &self,
        user_id: Uuid,
        qr_payload: &str,
        vehicle_id: Option<Uuid>,
    ) -> DomainResult<ChargingSession> {
        let spot_id = Uuid::parse_str(qr_payload.trim())
            .map_err(|_| DomainError::Validation("QR code is not a spot id".into()))?;
        let mut request = NewSession::new(user_id, spot_id);
        request.vehicle_id = vehicle_id;
        self.start_session(request).await
    }

    /// Finish an InProgress session. `Ok(None)` if it does not exist.
    pub async fn complete_session(
        &self,
        session_id: Uuid,
        input: CompleteSession,
    ) -> DomainResult<Option<ChargingSession>> {
        let Some(mut session) = self.repos.sessions().find_by_id(session_id).await? else {
            return Ok(None);
        };

        session.complete(
            input.energy_delivered_kwh,
            input.cost,
            input.price_per_kwh,
            input.notes,
            self.billing.base_fee,
            Utc::now(),
        )?;
        self.repos.sessions().close(&session).await?;

        info!(
            session_id = %session.id,
            energy_kwh = session.energy_delivered_kwh,
            cost = ?session.cost,
            "Charging session completed"
        );
        self.after_close(&session).await;
        Ok(Some(session))
    }

    /// Staff status overwrite. `Ok(None)` if the session does not exist.
    pub async fn update_status(
        &self,
        session_id: Uuid,
        status: SessionStatus,
        notes: Option<String>,
    ) -> DomainResult<Option<ChargingSession>> {
        let Some((session, closed)) = self
            .repos
            .sessions()
            .overwrite_status(session_id, status, notes)
            .await?
        else {
            return Ok(None);
        };

        if closed {
            info!(session_id = %session.id, status = %status, "Session closed by status update");
            self.after_close(&session).await;
        } else {
            self.notifier.session_changed(&session);
        }
        Ok(Some(session))
    }

    pub async fn get(&self, session_id: Uuid) -> DomainResult<ChargingSession> {
        self.repos
            .sessions()
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| DomainError::not_found("ChargingSession", session_id))
    }

    async fn after_close(&self, session: &ChargingSession) {
        self.notifier.session_changed(session);
        if let Some(reservation_id) = session.reservation_id {
            self.announce_reservation(reservation_id).await;
        }
        announce_spot(self.repos.as_ref(), self.notifier.as_ref(), session.spot_id).await;
    }

    async fn announce_reservation(&self, reservation_id: Uuid) {
        match self.repos.reservations().find_by_id(reservation_id).await {
            Ok(Some(reservation)) => self.notifier.reservation_changed(&reservation),
            Ok(None) => {}
            Err(e) => warn!(%reservation_id, error = %e, "Reservation notification skipped"),
        }
    }
}
