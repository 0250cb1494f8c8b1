use async_trait::async_trait;
use chrono::NaiveDate;
use meilisearch_sdk::Client;
use serde::{Deserialize, Serialize};

use crate::domain::core::{
    Booking, Reservation, ReservationId, ReservationStatus, ScheduleQuery, TechnicianId, TimeSlot,
};
use crate::domain::{DataAccessError, Entity};

/// 1日に1人の作業員へ割り当てられる件数の上限として十分な値
const SEARCH_LIMIT: usize = 100;

/// 検索インデックスで絞り込みに使う属性
pub const FILTERABLE_ATTRIBUTES: [&str; 3] = ["technician", "service_date", "status"];

/// 同期済みの予約インデックスから作業員の予定を引く
#[derive(Clone)]
pub struct MeiliSearchScheduleQuery {
    client: Client,
}

impl MeiliSearchScheduleQuery {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct AssignedDocument {
    id: ReservationId,
    service_date: NaiveDate,
    slot: TimeSlot,
}

impl From<AssignedDocument> for Booking {
    fn from(value: AssignedDocument) -> Self {
        Booking {
            reservation_id: value.id,
            service_date: value.service_date,
            slot: value.slot,
        }
    }
}

/// フィルタ式の二重引用符内に埋め込めるようにエスケープする
fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn assigned_filter(technician: &TechnicianId, date: NaiveDate) -> String {
    format!(
        "technician = \"{}\" AND service_date = \"{}\" AND status = {}",
        quote(technician.as_str()),
        date.format("%Y-%m-%d"),
        ReservationStatus::Assigned.code()
    )
}

#[async_trait]
impl ScheduleQuery for MeiliSearchScheduleQuery {
    async fn find_assigned(
        &self,
        technician: &TechnicianId,
        date: NaiveDate,
    ) -> Result<Vec<Booking>, DataAccessError> {
        let filter = assigned_filter(technician, date);
        let index = self.client.index(Reservation::ENTITY_NAME);
        let results = index
            .search()
            .with_filter(&filter)
            .with_limit(SEARCH_LIMIT)
            .execute::<AssignedDocument>()
            .await?;
        Ok(results
            .hits
            .into_iter()
            .map(|hit| Booking::from(hit.result))
            .collect())
    }
}
