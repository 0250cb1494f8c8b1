//! プロセス内に予約を保持する保存先

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use crate::domain::core::{
    Booking, Reservation, ReservationEvent, ReservationId, ReservationRepository,
    ReservationStatus, ScheduleQuery, TechnicianId,
};
use crate::domain::{Aggregation, DataAccessError, Entity};

#[derive(Clone, Default)]
pub struct InMemoryReservationStore {
    reservations: Arc<RwLock<HashMap<ReservationId, Reservation>>>,
}

#[async_trait]
impl ReservationRepository for InMemoryReservationStore {
    async fn find_by_id(&self, id: ReservationId) -> Result<Option<Reservation>, DataAccessError> {
        Ok(self.reservations.read().await.get(&id).cloned())
    }

    async fn save(&mut self, entity: &mut Reservation) -> Result<bool, DataAccessError> {
        let created = match entity.peek() {
            Some(ReservationEvent::ReservationCreated { .. }) => true,
            Some(_) => false,
            None => return Ok(false),
        };
        let mut reservations = self.reservations.write().await;
        let exists = reservations.contains_key(&entity.id());
        if created && exists {
            return Err(DataAccessError::WriteError(
                format!("Reservation {} already exists", entity.id()).into(),
            ));
        }
        if !created && !exists {
            return Err(DataAccessError::WriteError(
                format!("Reservation {} does not exist", entity.id()).into(),
            ));
        }
        entity.clear();
        reservations.insert(entity.id(), entity.clone());
        Ok(true)
    }

    async fn delete(&mut self, entity: &mut Reservation) -> Result<bool, DataAccessError> {
        Ok(self
            .reservations
            .write()
            .await
            .remove(&entity.id())
            .is_some())
    }
}

#[async_trait]
impl ScheduleQuery for InMemoryReservationStore {
    async fn find_assigned(
        &self,
        technician: &TechnicianId,
        date: NaiveDate,
    ) -> Result<Vec<Booking>, DataAccessError> {
        Ok(self
            .reservations
            .read()
            .await
            .values()
            .filter(|r| {
                r.status() == ReservationStatus::Assigned
                    && r.service_date() == date
                    && r.technician() == Some(technician)
            })
            .map(Reservation::booking)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::core::ReservationCustomer;

    use super::*;

    fn reservation(id: u64, slot: &str) -> Reservation {
        Reservation::create(
            id.into(),
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            slot.parse().unwrap(),
            ReservationCustomer::new("山田", "090-0000-0000"),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_save_and_find() {
        let mut store = InMemoryReservationStore::default();
        let mut entity = reservation(1, "10:00");
        assert!(store.save(&mut entity).await.unwrap());
        assert!(entity.events().is_empty());
        assert!(!store.save(&mut entity).await.unwrap());
        assert_eq!(store.find_by_id(1.into()).await.unwrap(), Some(entity));
        assert_eq!(store.find_by_id(2.into()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_checks_existence() {
        let mut store = InMemoryReservationStore::default();
        let mut entity = reservation(1, "10:00");
        store.save(&mut entity).await.unwrap();

        let mut duplicate = reservation(1, "12:00");
        assert!(matches!(
            store.save(&mut duplicate).await,
            Err(DataAccessError::WriteError(_))
        ));

        let mut missing = reservation(2, "12:00");
        missing.clear();
        missing.change_status(ReservationStatus::Paid).unwrap();
        assert!(matches!(
            store.save(&mut missing).await,
            Err(DataAccessError::WriteError(_))
        ));
    }

    #[tokio::test]
    async fn test_find_assigned() {
        let mut store = InMemoryReservationStore::default();
        let tech: TechnicianId = "tech@x.com".parse().unwrap();

        let mut assigned = reservation(1, "10:00");
        assigned.assign(tech.clone());
        store.save(&mut assigned).await.unwrap();

        let mut completed = reservation(2, "14:00");
        completed.assign(tech.clone());
        completed.change_status(ReservationStatus::Completed).unwrap();
        store.save(&mut completed).await.unwrap();

        let mut other = reservation(3, "16:00");
        other.assign("other@x.com".parse().unwrap());
        store.save(&mut other).await.unwrap();

        let bookings = store
            .find_assigned(&tech, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
            .await
            .unwrap();
        assert_eq!(bookings, vec![assigned.booking()]);

        let bookings = store
            .find_assigned(&tech, NaiveDate::from_ymd_opt(2024, 6, 2).unwrap())
            .await
            .unwrap();
        assert!(bookings.is_empty());
    }

    #[tokio::test]
    async fn test_delete() {
        let mut store = InMemoryReservationStore::default();
        let mut entity = reservation(1, "10:00");
        store.save(&mut entity).await.unwrap();
        assert!(store.delete(&mut entity).await.unwrap());
        assert!(!store.delete(&mut entity).await.unwrap());
        assert_eq!(store.find_by_id(1.into()).await.unwrap(), None);
    }
}
