//! 予約の受付と作業員の手配

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{error, info, warn};

use super::{
    core::{
        Conflict, Decision, Reservation, ReservationCustomer, ReservationError, ReservationId,
        ReservationRepository, ReservationStatus, ScheduleQuery, TechnicianId, TechnicianSchedule,
        TimeSlot,
    },
    generate_id, DataAccessError, Entity,
};

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Reservation {0} not found")]
    ReservationNotFound(ReservationId),
    #[error(transparent)]
    Reservation(#[from] ReservationError),
    /// 保存先への読み書きに失敗した (再試行可能)
    #[error(transparent)]
    DataAccess(#[from] DataAccessError),
}

/// 作業員割当の結果
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssignmentOutcome {
    Assigned(Reservation),
    Conflicted(Conflict),
}

#[derive(Clone)]
pub struct Dispatcher<R, Q> {
    reservations: R,
    schedules: Q,
}

impl<R, Q> Dispatcher<R, Q>
where
    R: ReservationRepository + Send + Sync,
    Q: ScheduleQuery + Send + Sync,
{
    pub fn new(reservations: R, schedules: Q) -> Self {
        Self {
            reservations,
            schedules,
        }
    }

    /// 予約を受け付ける
    pub async fn reserve(
        &mut self,
        service_date: NaiveDate,
        slot: TimeSlot,
        customer: ReservationCustomer,
    ) -> Result<Reservation, DispatchError> {
        if !slot.is_standard() {
            warn!("通常営業の枠外で予約を受け付けます: {} {}", service_date, slot);
        }
        let mut reservation = Reservation::create(generate_id(), service_date, slot, customer)?;
        self.save(&mut reservation).await?;
        info!(
            "予約を受け付けました: {} {} {}",
            reservation.id(),
            service_date,
            slot
        );
        Ok(reservation)
    }

    pub async fn find(&self, id: ReservationId) -> Result<Reservation, DispatchError> {
        match self.reservations.find_by_id(id).await {
            Ok(Some(reservation)) => Ok(reservation),
            Ok(None) => Err(DispatchError::ReservationNotFound(id)),
            Err(e) => {
                error!("予約の取得に失敗しました: {}: {}", id, e);
                Err(e.into())
            }
        }
    }

    /// ステータスを変更する
    pub async fn change_status(
        &mut self,
        id: ReservationId,
        status: ReservationStatus,
    ) -> Result<Reservation, DispatchError> {
        let mut reservation = self.find(id).await?;
        reservation.change_status(status)?;
        self.save(&mut reservation).await?;
        info!("ステータスを変更しました: {} -> {}", id, status.label());
        Ok(reservation)
    }

    /// 作業員を割り当てる
    ///
    /// 同じ日に割当済みの予約と枠が近すぎる場合は割り当てずに重複を返す。
    /// 判定と保存の間に排他はない。
    pub async fn assign(
        &mut self,
        id: ReservationId,
        technician: TechnicianId,
    ) -> Result<AssignmentOutcome, DispatchError> {
        let mut reservation = self.find(id).await?;
        let date = reservation.service_date();
        let bookings = self
            .schedules
            .find_assigned(&technician, date)
            .await
            .map_err(|e| {
                error!("作業員の予定取得に失敗しました: {}: {}", technician, e);
                e
            })?;
        let schedule = TechnicianSchedule::new(technician.clone(), date, bookings);
        if let Decision::Conflicted(conflict) = schedule.check(&reservation.booking()) {
            info!(
                "作業員の予定と重複するため割当できません: {} {} {} {}",
                id,
                schedule.technician(),
                schedule.date(),
                conflict
            );
            return Ok(AssignmentOutcome::Conflicted(conflict));
        }
        reservation.assign(technician.clone());
        self.save(&mut reservation).await?;
        info!("作業員を割り当てました: {} -> {}", id, technician);
        Ok(AssignmentOutcome::Assigned(reservation))
    }

    pub async fn delete(&mut self, id: ReservationId) -> Result<(), DispatchError> {
        let mut reservation = self.find(id).await?;
        self.reservations.delete(&mut reservation).await.map_err(|e| {
            error!("予約の削除に失敗しました: {}: {}", id, e);
            e
        })?;
        info!("予約を削除しました: {}", id);
        Ok(())
    }

    async fn save(&mut self, reservation: &mut Reservation) -> Result<(), DispatchError> {
        if let Err(e) = self.reservations.save(reservation).await {
            error!("予約の保存に失敗しました: {}: {}", reservation.id(), e);
            return Err(e.into());
        }
        Ok(())
    }
}
