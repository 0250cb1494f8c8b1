use std::{fmt, str::FromStr};

use chrono::{NaiveTime, Timelike};
use derive_more::{Display, Error};
use serde_with::{DeserializeFromStr, SerializeDisplay};

const LABEL_FORMAT: &str = "%H:%M";

/// 予約の時間枠
///
/// `HH:MM` 形式のラベルで表し、比較の際は0時からの経過分に変換する。
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, SerializeDisplay, DeserializeFromStr,
)]
pub struct TimeSlot(u16);

impl TimeSlot {
    /// 時と分から時間枠を作る
    pub fn from_hm(hour: u32, minute: u32) -> Result<Self, SlotError> {
        if hour >= 24 || minute >= 60 {
            return Err(SlotError::OutOfRange);
        }
        Ok(Self((hour * 60 + minute) as u16))
    }

    /// 通常営業の4枠 (10:00, 12:00, 14:00, 16:00)
    pub fn standard() -> [TimeSlot; 4] {
        [10, 12, 14, 16].map(|hour| Self(hour * 60))
    }

    pub fn is_standard(&self) -> bool {
        Self::standard().contains(self)
    }

    /// 0時からの経過分
    pub fn minute_of_day(&self) -> i64 {
        i64::from(self.0)
    }

    pub fn hour(&self) -> u32 {
        u32::from(self.0 / 60)
    }

    pub fn minute(&self) -> u32 {
        u32::from(self.0 % 60)
    }
}

impl Default for TimeSlot {
    fn default() -> Self {
        Self::standard()[0]
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for TimeSlot {
    type Err = SlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let time = NaiveTime::parse_from_str(s.trim(), LABEL_FORMAT)
            .map_err(|_| SlotError::InvalidLabel)?;
        Self::from_hm(time.hour(), time.minute())
    }
}

/// 時間枠のエラー
#[derive(Error, Display, Debug, PartialEq, Eq)]
pub enum SlotError {
    /// ラベルが `HH:MM` 形式ではありません
    #[display(fmt = "Time slot label must be HH:MM")]
    InvalidLabel,
    /// 時刻が範囲外です
    #[display(fmt = "Time slot is out of range")]
    OutOfRange,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_label() {
        let slot: TimeSlot = "10:00".parse().unwrap();
        assert_eq!(slot.minute_of_day(), 600);
        assert_eq!(slot.to_string(), "10:00");

        let slot: TimeSlot = "09:30".parse().unwrap();
        assert_eq!(slot.minute_of_day(), 570);
        assert_eq!(slot.to_string(), "09:30");
    }

    #[test]
    fn test_parse_invalid_label() {
        assert_eq!("".parse::<TimeSlot>(), Err(SlotError::InvalidLabel));
        assert_eq!("25:00".parse::<TimeSlot>(), Err(SlotError::InvalidLabel));
        assert_eq!("noon".parse::<TimeSlot>(), Err(SlotError::InvalidLabel));
        assert_eq!(TimeSlot::from_hm(24, 0), Err(SlotError::OutOfRange));
    }

    #[test]
    fn test_standard_slots() {
        let labels = TimeSlot::standard().map(|s| s.to_string());
        assert_eq!(labels, ["10:00", "12:00", "14:00", "16:00"]);
        assert!(TimeSlot::from_hm(14, 0).unwrap().is_standard());
        assert!(!TimeSlot::from_hm(11, 0).unwrap().is_standard());
        assert_eq!(TimeSlot::default().to_string(), "10:00");
    }

    #[test]
    fn test_serde_as_label() {
        let slot = TimeSlot::from_hm(16, 0).unwrap();
        assert_eq!(serde_json::to_string(&slot).unwrap(), "\"16:00\"");
        assert_eq!(
            serde_json::from_str::<TimeSlot>("\"12:00\"").unwrap(),
            TimeSlot::from_hm(12, 0).unwrap()
        );
        assert!(serde_json::from_str::<TimeSlot>("\"12\"").is_err());
    }
}
