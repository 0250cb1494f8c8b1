use std::ops::Range;

use async_trait::async_trait;
use bio::data_structures::interval_tree::IntervalTree;
use chrono::NaiveDate;
use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::domain::DataAccessError;

use super::{ReservationId, TechnicianId, TimeSlot};

/// 同じ作業員の予約同士に必要な間隔 (分)
pub const CONFLICT_WINDOW_MINUTES: i64 = 120;

/// 作業員の割当済み予約を検索するクエリ
#[async_trait]
pub trait ScheduleQuery {
    /// 指定日に作業員へ割当済みの予約枠を取得する
    async fn find_assigned(
        &self,
        technician: &TechnicianId,
        date: NaiveDate,
    ) -> Result<Vec<Booking>, DataAccessError>;
}

/// 重複判定に使う予約枠
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub reservation_id: ReservationId,
    pub service_date: NaiveDate,
    pub slot: TimeSlot,
}

impl Booking {
    /// 枠の開始から間隔分を占有する半開区間
    fn window(&self) -> Range<i64> {
        let start = self.slot.minute_of_day();
        start..start + CONFLICT_WINDOW_MINUTES
    }
}

/// 重複した既存の予約
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Display)]
#[display(
    fmt = "Conflicts with reservation {} at {} ({} minutes apart)",
    reservation_id,
    slot,
    gap_minutes
)]
pub struct Conflict {
    pub reservation_id: ReservationId,
    pub slot: TimeSlot,
    pub gap_minutes: i64,
}

/// 割当可否の判定結果
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    Permitted,
    Conflicted(Conflict),
}

impl Decision {
    pub fn is_permitted(&self) -> bool {
        matches!(self, Decision::Permitted)
    }
}

/// ある作業員のある日の割当状況
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TechnicianSchedule {
    technician: TechnicianId,
    date: NaiveDate,
    bookings: Vec<Booking>,
}

impl TechnicianSchedule {
    /// 他の日付の予約枠は取り除かれる
    pub fn new<T>(technician: TechnicianId, date: NaiveDate, bookings: T) -> Self
    where
        T: IntoIterator<Item = Booking>,
    {
        let bookings = bookings
            .into_iter()
            .filter(|b| b.service_date == date)
            .collect();
        Self {
            technician,
            date,
            bookings,
        }
    }

    pub fn technician(&self) -> &TechnicianId {
        &self.technician
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn bookings(&self) -> &[Booking] {
        &self.bookings
    }

    /// 候補の予約枠を割り当てられるか判定する
    ///
    /// 候補自身の予約は判定から除外する。重複が複数ある場合は最も近い枠を返す。
    pub fn check(&self, candidate: &Booking) -> Decision {
        if candidate.service_date != self.date {
            return Decision::Permitted;
        }
        let tree: IntervalTree<i64, &Booking> = self
            .bookings
            .iter()
            .filter(|b| b.reservation_id != candidate.reservation_id)
            .map(|b| (b.window(), b))
            .collect();
        let offset = candidate.slot.minute_of_day();
        tree.find(candidate.window())
            .map(|entry| {
                let booking = *entry.data();
                Conflict {
                    reservation_id: booking.reservation_id,
                    slot: booking.slot,
                    gap_minutes: (booking.slot.minute_of_day() - offset).abs(),
                }
            })
            .min_by_key(|c| (c.gap_minutes, c.slot))
            .map_or(Decision::Permitted, Decision::Conflicted)
    }
}
