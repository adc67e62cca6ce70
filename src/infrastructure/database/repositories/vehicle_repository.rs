//! SeaORM implementation of VehicleDirectory

use async_trait::async_trait;
use log::debug;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use uuid::Uuid;

use super::db_err;
use crate::domain::vehicle::{Vehicle, VehicleDirectory};
use crate::domain::DomainResult;
use crate::infrastructure::database::entities::vehicle;

pub struct SeaOrmVehicleDirectory {
    db: DatabaseConnection,
}

impl SeaOrmVehicleDirectory {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl VehicleDirectory for SeaOrmVehicleDirectory {
    async fn vehicle_belongs_to_user(&self, vehicle_id: Uuid, user_id: Uuid) -> DomainResult<bool> {
        let model = vehicle::Entity::find_by_id(vehicle_id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.is_some_and(|v| v.user_id == user_id))
    }

    async fn save(&self, v: Vehicle) -> DomainResult<()> {
        debug!("Saving vehicle: {} ({})", v.id, v.plate_number);

        let model = vehicle::ActiveModel {
            id: Set(v.id),
            user_id: Set(v.user_id),
            plate_number: Set(v.plate_number),
            battery_capacity_kwh: Set(v.battery_capacity_kwh),
        };
        model.insert(&self.db).await.map_err(db_err)?;
        Ok(())
    }
}
