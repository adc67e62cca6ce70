use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::DomainResult;

#[derive(Debug, Clone)]
pub struct Vehicle {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plate_number: String,
    pub battery_capacity_kwh: Option<f64>,
}

#[async_trait]
pub trait VehicleDirectory: Send + Sync {
    async fn vehicle_belongs_to_user(&self, vehicle_id: Uuid, user_id: Uuid) -> DomainResult<bool>;

    async fn save(&self, vehicle: Vehicle) -> DomainResult<()>;
}
