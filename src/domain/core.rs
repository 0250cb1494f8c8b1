mod reservation;
mod schedule;
mod slot;
mod technician;

pub use self::reservation::*;
pub use self::schedule::*;
pub use self::slot::*;
pub use self::technician::*;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CoreEvent {
    ReservationEvent(ReservationEvent),
}
