use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use cleanbook::domain::{
    core::{
        Reservation, ReservationCustomer, ReservationId, ReservationRepository,
        ReservationStatus, ScheduleQuery, TechnicianId, TimeSlot,
    },
    dispatch::{AssignmentOutcome, Dispatcher},
};
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiError;

pub fn router<R, Q>(dispatcher: Dispatcher<R, Q>) -> Router
where
    R: ReservationRepository + Clone + Send + Sync + 'static,
    Q: ScheduleQuery + Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/reservations", post(create::<R, Q>))
        .route(
            "/reservations/:id",
            get(find::<R, Q>).delete(delete::<R, Q>),
        )
        .route("/reservations/:id/status", put(change_status::<R, Q>))
        .route("/reservations/:id/assignment", post(assign::<R, Q>))
        .with_state(dispatcher)
}

#[derive(Deserialize)]
pub struct CreateRequest {
    service_date: NaiveDate,
    slot: TimeSlot,
    customer: ReservationCustomer,
}

#[derive(Deserialize)]
pub struct StatusRequest {
    status: ReservationStatus,
}

#[derive(Deserialize)]
pub struct AssignRequest {
    technician: TechnicianId,
}

async fn create<R, Q>(
    State(mut dispatcher): State<Dispatcher<R, Q>>,
    Json(payload): Json<CreateRequest>,
) -> Result<(StatusCode, Json<Reservation>), ApiError>
where
    R: ReservationRepository + Send + Sync,
    Q: ScheduleQuery + Send + Sync,
{
    let reservation = dispatcher
        .reserve(payload.service_date, payload.slot, payload.customer)
        .await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

async fn find<R, Q>(
    State(dispatcher): State<Dispatcher<R, Q>>,
    Path(id): Path<u64>,
) -> Result<Json<Reservation>, ApiError>
where
    R: ReservationRepository + Send + Sync,
    Q: ScheduleQuery + Send + Sync,
{
    Ok(Json(dispatcher.find(ReservationId::from(id)).await?))
}

async fn change_status<R, Q>(
    State(mut dispatcher): State<Dispatcher<R, Q>>,
    Path(id): Path<u64>,
    Json(payload): Json<StatusRequest>,
) -> Result<Json<Reservation>, ApiError>
where
    R: ReservationRepository + Send + Sync,
    Q: ScheduleQuery + Send + Sync,
{
    let reservation = dispatcher
        .change_status(ReservationId::from(id), payload.status)
        .await?;
    Ok(Json(reservation))
}

/// 重複で割当できなかった場合は409で重複した枠を返す
async fn assign<R, Q>(
    State(mut dispatcher): State<Dispatcher<R, Q>>,
    Path(id): Path<u64>,
    Json(payload): Json<AssignRequest>,
) -> Result<Response, ApiError>
where
    R: ReservationRepository + Send + Sync,
    Q: ScheduleQuery + Send + Sync,
{
    let response = match dispatcher
        .assign(ReservationId::from(id), payload.technician)
        .await?
    {
        AssignmentOutcome::Assigned(reservation) => Json(reservation).into_response(),
        AssignmentOutcome::Conflicted(conflict) => (
            StatusCode::CONFLICT,
            Json(json!({
                "message": conflict.to_string(),
                "conflict": conflict,
            })),
        )
            .into_response(),
    };
    Ok(response)
}

async fn delete<R, Q>(
    State(mut dispatcher): State<Dispatcher<R, Q>>,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError>
where
    R: ReservationRepository + Send + Sync,
    Q: ScheduleQuery + Send + Sync,
{
    dispatcher.delete(ReservationId::from(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
