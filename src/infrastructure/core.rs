mod reservation;
mod schedule;

use eventstore::ResolvedEvent;

use crate::domain::{
    core::{CoreEvent, Reservation},
    Entity,
};

pub use self::reservation::*;
pub use self::schedule::*;

use super::EventConvertError;

impl TryFrom<&ResolvedEvent> for CoreEvent {
    type Error = EventConvertError;

    fn try_from(value: &ResolvedEvent) -> Result<Self, Self::Error> {
        let x = value
            .get_original_stream_id()
            .split('-')
            .next()
            .ok_or(EventConvertError)?;
        match x {
            Reservation::ENTITY_NAME => Ok(CoreEvent::ReservationEvent(TryFrom::try_from(value)?)),
            _ => Err(EventConvertError),
        }
    }
}
