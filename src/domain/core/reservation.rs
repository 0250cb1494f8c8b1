use chrono::NaiveDate;
use derive_more::{Deref, Display, Error, From};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::{
    Aggregation, DataAccessError, Entity, Event, EventQueue, EventQueueIntoIter, Id,
};

use super::{Booking, TechnicianId, TimeSlot};

/// 予約リポジトリ
#[async_trait::async_trait]
pub trait ReservationRepository {
    /// IDで予約を検索する
    async fn find_by_id(&self, id: ReservationId) -> Result<Option<Reservation>, DataAccessError>;
    /// 予約を保存する
    async fn save(&mut self, entity: &mut Reservation) -> Result<bool, DataAccessError>;
    /// 予約を削除する
    async fn delete(&mut self, entity: &mut Reservation) -> Result<bool, DataAccessError>;
}

/// 予約番号
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Deref, Default,
)]
pub struct ReservationId(u64);

impl Id for ReservationId {
    type Inner = u64;
}

/// 予約ステータス
///
/// 外部とは数値コードでやり取りする。
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ReservationStatus {
    /// 新規
    #[default]
    New,
    /// 入金待ち
    AwaitingPayment,
    /// 入金済み
    Paid,
    /// 作業員割当済み
    Assigned,
    /// 完了
    Completed,
    /// キャンセル
    Canceled,
}

impl ReservationStatus {
    pub const ALL: [ReservationStatus; 6] = [
        ReservationStatus::New,
        ReservationStatus::AwaitingPayment,
        ReservationStatus::Paid,
        ReservationStatus::Assigned,
        ReservationStatus::Completed,
        ReservationStatus::Canceled,
    ];

    pub fn code(self) -> u8 {
        match self {
            ReservationStatus::New => 1,
            ReservationStatus::AwaitingPayment => 2,
            ReservationStatus::Paid => 3,
            ReservationStatus::Assigned => 4,
            ReservationStatus::Completed => 5,
            ReservationStatus::Canceled => 9,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ReservationStatus::New => "new",
            ReservationStatus::AwaitingPayment => "awaiting-payment",
            ReservationStatus::Paid => "paid",
            ReservationStatus::Assigned => "assigned",
            ReservationStatus::Completed => "completed",
            ReservationStatus::Canceled => "canceled",
        }
    }
}

impl From<ReservationStatus> for u8 {
    fn from(value: ReservationStatus) -> Self {
        value.code()
    }
}

impl TryFrom<u8> for ReservationStatus {
    type Error = StatusCodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|s| s.code() == value)
            .ok_or(StatusCodeError(value))
    }
}

/// 未定義のステータスコード
#[derive(Error, Display, Debug, PartialEq, Eq)]
#[display(fmt = "Unknown reservation status code: {}", _0)]
pub struct StatusCodeError(#[error(not(source))] pub u8);

/// 予約イベント
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReservationEvent {
    /// 予約が作成された
    ReservationCreated {
        id: ReservationId,
        service_date: NaiveDate,
        slot: TimeSlot,
        customer: ReservationCustomer,
    },
    /// ステータスが変更された
    ReservationStatusChanged {
        id: ReservationId,
        status: ReservationStatus,
    },
    /// 作業員が割り当てられた (ステータスも割当済みになる)
    TechnicianAssigned {
        id: ReservationId,
        technician: TechnicianId,
    },
    /// 予約が削除された
    ReservationDeleted { id: ReservationId },
}

impl Event for ReservationEvent {
    type Id = ReservationId;
}

impl ReservationEvent {
    pub fn id(&self) -> ReservationId {
        match self {
            ReservationEvent::ReservationCreated { id, .. }
            | ReservationEvent::ReservationStatusChanged { id, .. }
            | ReservationEvent::TechnicianAssigned { id, .. }
            | ReservationEvent::ReservationDeleted { id } => *id,
        }
    }
}

/// 予約エンティティ
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Reservation {
    id: ReservationId,
    service_date: NaiveDate,
    slot: TimeSlot,
    customer: ReservationCustomer,
    status: ReservationStatus,
    technician: Option<TechnicianId>,
    #[serde(skip)]
    events: EventQueue<ReservationEvent>,
}

impl Reservation {
    pub fn create(
        id: ReservationId,
        service_date: NaiveDate,
        slot: TimeSlot,
        customer: ReservationCustomer,
    ) -> Result<Self, ReservationError> {
        Self::validate_customer(&customer)?;
        let mut entity = Reservation {
            id,
            service_date,
            slot,
            customer: customer.clone(),
            ..Reservation::default()
        };
        entity.events.push(ReservationEvent::ReservationCreated {
            id,
            service_date,
            slot,
            customer,
        });
        Ok(entity)
    }

    /// ステータスを変更する
    ///
    /// 遷移の制限はないが、割当済みにするには作業員が決まっている必要がある。
    pub fn change_status(&mut self, status: ReservationStatus) -> Result<(), ReservationError> {
        self.validate_status_changed(&status)?;
        if self.status == status {
            return Ok(());
        }
        self.status = status;
        self.events.push(ReservationEvent::ReservationStatusChanged {
            id: self.id,
            status,
        });
        Ok(())
    }

    /// 作業員を割り当て、ステータスを割当済みにする
    pub fn assign(&mut self, technician: TechnicianId) {
        self.technician = Some(technician.clone());
        self.status = ReservationStatus::Assigned;
        self.events.push(ReservationEvent::TechnicianAssigned {
            id: self.id,
            technician,
        });
    }

    pub fn service_date(&self) -> NaiveDate {
        self.service_date
    }

    pub fn slot(&self) -> TimeSlot {
        self.slot
    }

    pub fn customer(&self) -> &ReservationCustomer {
        &self.customer
    }

    pub fn status(&self) -> ReservationStatus {
        self.status
    }

    pub fn technician(&self) -> Option<&TechnicianId> {
        self.technician.as_ref()
    }

    /// 重複判定用の予約枠
    pub fn booking(&self) -> Booking {
        Booking {
            reservation_id: self.id,
            service_date: self.service_date,
            slot: self.slot,
        }
    }

    fn validate_id(&self, id: &ReservationId) -> Result<(), ReservationError> {
        if self.id != *id {
            return Err(ReservationError::MismatchedId);
        }
        Ok(())
    }

    fn validate_status_changed(&self, status: &ReservationStatus) -> Result<(), ReservationError> {
        if *status == ReservationStatus::Assigned && self.technician.is_none() {
            return Err(ReservationError::AssignedWithoutTechnician);
        }
        Ok(())
    }

    fn validate_customer(customer: &ReservationCustomer) -> Result<(), ReservationError> {
        if customer.name.trim().is_empty() {
            return Err(ReservationError::CustomerNameRequired);
        }
        if customer.phone.trim().is_empty() {
            return Err(ReservationError::CustomerPhoneRequired);
        }
        Ok(())
    }
}

impl Entity for Reservation {
    type Id = ReservationId;

    const ENTITY_NAME: &'static str = "reservation";

    fn id(&self) -> Self::Id {
        self.id
    }
}

impl Aggregation for Reservation {
    type Event = ReservationEvent;
    type Error = ReservationError;

    fn validate(&self, event: &Self::Event) -> Result<(), Self::Error> {
        match event {
            ReservationEvent::ReservationCreated { customer, .. } => {
                Self::validate_customer(customer)?;
            }
            ReservationEvent::ReservationStatusChanged { id, status } => {
                self.validate_id(id)?;
                self.validate_status_changed(status)?;
            }
            ReservationEvent::TechnicianAssigned { id, .. } => {
                self.validate_id(id)?;
            }
            ReservationEvent::ReservationDeleted { id } => {
                self.validate_id(id)?;
            }
        }
        Ok(())
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            ReservationEvent::ReservationCreated {
                id,
                service_date,
                slot,
                customer,
            } => {
                if self.id != id {
                    if let Ok(entity) = Self::create(id, service_date, slot, customer) {
                        *self = entity;
                    }
                }
            }
            ReservationEvent::ReservationStatusChanged { id, status } => {
                if self.id == id {
                    if let Err(e) = self.change_status(status) {
                        warn!("ステータス変更イベントを適用できません: {}: {}", id, e);
                    }
                }
            }
            ReservationEvent::TechnicianAssigned { id, technician } => {
                if self.id == id {
                    self.assign(technician);
                }
            }
            ReservationEvent::ReservationDeleted { .. } => {}
        }
    }

    fn events(&self) -> &EventQueue<Self::Event> {
        &self.events
    }

    fn events_mut(&mut self) -> &mut EventQueue<Self::Event> {
        &mut self.events
    }
}

impl IntoIterator for Reservation {
    type Item = ReservationEvent;
    type IntoIter = EventQueueIntoIter<Self::Item>;
    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

impl PartialEq for Reservation {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.service_date == other.service_date
            && self.slot == other.slot
            && self.customer == other.customer
            && self.status == other.status
            && self.technician == other.technician
    }
}

impl Eq for Reservation {}

/// 予約エラー
#[derive(Error, Display, Debug, PartialEq, Eq)]
pub enum ReservationError {
    /// IDが一致しません
    #[display(fmt = "ID does not match")]
    MismatchedId,
    /// お客様の名前が指定されていません
    #[display(fmt = "Customer name is not specified")]
    CustomerNameRequired,
    /// お客様の電話番号が指定されていません
    #[display(fmt = "Customer phone is not specified")]
    CustomerPhoneRequired,
    /// 作業員なしで割当済みにはできません
    #[display(fmt = "Status assigned requires a technician")]
    AssignedWithoutTechnician,
}

/// 予約したお客様
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReservationCustomer {
    pub name: String,
    pub phone: String,
}

impl ReservationCustomer {
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: &str) -> NaiveDate {
        d.parse().unwrap()
    }

    fn reservation() -> Reservation {
        Reservation::create(
            100.into(),
            date("2024-06-01"),
            "10:00".parse().unwrap(),
            ReservationCustomer::new("山田", "090-0000-0000"),
        )
        .unwrap()
    }

    #[test]
    fn test_create() {
        let entity = reservation();
        assert_eq!(entity.id(), ReservationId::from(100));
        assert_eq!(entity.status(), ReservationStatus::New);
        assert_eq!(entity.technician(), None);
        assert!(matches!(
            entity.peek(),
            Some(ReservationEvent::ReservationCreated { .. })
        ));
    }

    #[test]
    fn test_create_requires_customer() {
        let result = Reservation::create(
            1.into(),
            date("2024-06-01"),
            TimeSlot::default(),
            ReservationCustomer::new("", "090"),
        );
        assert_eq!(result.err(), Some(ReservationError::CustomerNameRequired));
        let result = Reservation::create(
            1.into(),
            date("2024-06-01"),
            TimeSlot::default(),
            ReservationCustomer::new("山田", " "),
        );
        assert_eq!(result.err(), Some(ReservationError::CustomerPhoneRequired));
    }

    #[test]
    fn test_change_status_is_unrestricted() {
        let mut entity = reservation();
        entity.change_status(ReservationStatus::Completed).unwrap();
        entity.change_status(ReservationStatus::New).unwrap();
        entity.change_status(ReservationStatus::Canceled).unwrap();
        entity.change_status(ReservationStatus::Paid).unwrap();
        assert_eq!(entity.status(), ReservationStatus::Paid);
        assert_eq!(entity.events().len(), 5);
    }

    #[test]
    fn test_change_status_same_status_records_nothing() {
        let mut entity = reservation();
        entity.clear();
        entity.change_status(ReservationStatus::New).unwrap();
        assert!(entity.events().is_empty());
    }

    #[test]
    fn test_assigned_requires_technician() {
        let mut entity = reservation();
        assert_eq!(
            entity.change_status(ReservationStatus::Assigned),
            Err(ReservationError::AssignedWithoutTechnician)
        );
        assert_eq!(entity.status(), ReservationStatus::New);

        entity.assign("tech@x.com".parse().unwrap());
        entity.change_status(ReservationStatus::Completed).unwrap();
        entity.change_status(ReservationStatus::Assigned).unwrap();
        assert_eq!(entity.status(), ReservationStatus::Assigned);
    }

    #[test]
    fn test_assign_sets_technician_and_status() {
        let mut entity = reservation();
        entity.change_status(ReservationStatus::Paid).unwrap();
        entity.assign("tech@x.com".parse().unwrap());
        assert_eq!(entity.status(), ReservationStatus::Assigned);
        assert_eq!(entity.technician().map(|t| t.as_str()), Some("tech@x.com"));
    }

    #[test]
    fn test_replay_events() {
        let mut entity = reservation();
        entity.change_status(ReservationStatus::Paid).unwrap();
        entity.assign("tech@x.com".parse().unwrap());
        let events = entity.pop_all();

        let mut replayed = Reservation::default();
        for event in events {
            replayed.validate(&event).unwrap();
            replayed.apply(event);
        }
        assert_eq!(replayed, entity);
        assert_eq!(replayed.events().len(), 3);
    }

    #[test]
    fn test_replay_skips_assigned_without_technician() {
        let mut entity = reservation();
        entity.apply(ReservationEvent::ReservationStatusChanged {
            id: 100.into(),
            status: ReservationStatus::Assigned,
        });
        assert_eq!(entity.status(), ReservationStatus::New);
        assert_eq!(entity.events().len(), 1);
    }

    #[test]
    fn test_validate_mismatched_id() {
        let entity = reservation();
        let event = ReservationEvent::ReservationStatusChanged {
            id: 999.into(),
            status: ReservationStatus::Paid,
        };
        assert_eq!(entity.validate(&event), Err(ReservationError::MismatchedId));
    }

    #[test]
    fn test_status_code() {
        let codes = ReservationStatus::ALL.map(ReservationStatus::code);
        assert_eq!(codes, [1, 2, 3, 4, 5, 9]);
        assert_eq!(ReservationStatus::try_from(9), Ok(ReservationStatus::Canceled));
        assert_eq!(ReservationStatus::try_from(6), Err(StatusCodeError(6)));
        assert_eq!(ReservationStatus::Assigned.label(), "assigned");
    }

    #[test]
    fn test_status_serde_as_code() {
        assert_eq!(
            serde_json::to_string(&ReservationStatus::AwaitingPayment).unwrap(),
            "2"
        );
        assert_eq!(
            serde_json::from_str::<ReservationStatus>("4").unwrap(),
            ReservationStatus::Assigned
        );
        assert!(serde_json::from_str::<ReservationStatus>("7").is_err());
    }
}
