use async_trait::async_trait;
use eventstore::{AppendToStreamOptions, Client, EventData, ExpectedRevision, ResolvedEvent};

use crate::domain::core::{Reservation, ReservationEvent, ReservationId, ReservationRepository};
use crate::domain::{Aggregation, DataAccessError, Entity};
use crate::infrastructure::{from_event, try_from_resolved_event};
use crate::infrastructure::{stream_name, EventConvertError};

#[derive(Clone)]
pub struct EventStoreReservationRepository {
    client: Client,
}

impl EventStoreReservationRepository {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ReservationRepository for EventStoreReservationRepository {
    async fn find_by_id(&self, id: ReservationId) -> Result<Option<Reservation>, DataAccessError> {
        match self
            .client
            .read_stream(stream_name::<Reservation>(id), &Default::default())
            .await
        {
            Ok(mut stream) => {
                let mut entity = Reservation::default();
                loop {
                    match stream.next().await {
                        Ok(Some(e)) => entity.apply(TryFrom::try_from(&e)?),
                        Ok(_) => break,
                        Err(eventstore::Error::ResourceDeleted) => return Ok(None),
                        Err(eventstore::Error::ResourceNotFound) => return Ok(None),
                        Err(e) => return Err(e.into()),
                    }
                }
                if entity.peek().is_none() {
                    Ok(None)
                } else {
                    entity.clear();
                    Ok(Some(entity))
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&mut self, entity: &mut Reservation) -> Result<bool, DataAccessError> {
        let stream_name = stream_name::<Reservation>(entity.id());
        let rev = match entity.peek() {
            Some(ReservationEvent::ReservationCreated { .. }) => ExpectedRevision::NoStream,
            Some(_) => ExpectedRevision::StreamExists,
            None => return Ok(false),
        };
        let events = entity
            .iter()
            .cloned()
            .map(from_event)
            .collect::<Result<Vec<EventData>, _>>()?;
        self.client
            .append_to_stream(
                &stream_name,
                &AppendToStreamOptions::default().expected_revision(rev),
                events,
            )
            .await?;
        entity.clear();
        Ok(true)
    }

    async fn delete(&mut self, entity: &mut Reservation) -> Result<bool, DataAccessError> {
        let stream_name = stream_name::<Reservation>(entity.id());
        self.client
            .append_to_stream(
                &stream_name,
                &AppendToStreamOptions::default().expected_revision(ExpectedRevision::StreamExists),
                from_event(ReservationEvent::ReservationDeleted { id: entity.id() })?,
            )
            .await?;
        self.client
            .delete_stream(&stream_name, &Default::default())
            .await?;
        Ok(true)
    }
}

impl TryFrom<&ResolvedEvent> for ReservationEvent {
    type Error = EventConvertError;

    fn try_from(value: &ResolvedEvent) -> Result<Self, Self::Error> {
        try_from_resolved_event(value)
    }
}
