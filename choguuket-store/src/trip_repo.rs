use async_trait::async_trait;
use chrono::{DateTime, Utc};
use choguuket_core::repository::TripStore;
use choguuket_core::{
    route_key, ChatId, MatchSet, RequestId, StoreError, StoreResult, StoredTrip, StoredTripRequest, Trip, TripId,
    TripRequest,
};
use sqlx::PgConnection;

use crate::database::{backend, Database};

#[derive(sqlx::FromRow)]
struct TripRow {
    id: i64,
    origin: String,
    destination: String,
    departure_time: DateTime<Utc>,
    seats: i32,
    chat_id: i64,
}

impl TryFrom<TripRow> for StoredTrip {
    type Error = StoreError;

    fn try_from(row: TripRow) -> Result<Self, Self::Error> {
        let seats = u32::try_from(row.seats)
            .map_err(|_| StoreError::Corrupt(format!("trip {} has {} seats", row.id, row.seats)))?;
        Ok(StoredTrip {
            id: TripId(row.id),
            trip: Trip {
                origin: row.origin,
                destination: row.destination,
                departure_time: row.departure_time,
                seats,
                chat_id: ChatId(row.chat_id),
            },
        })
    }
}

#[derive(sqlx::FromRow)]
struct TripRequestRow {
    id: i64,
    origin: String,
    destination: String,
    desired_time: DateTime<Utc>,
    chat_id: i64,
}

impl From<TripRequestRow> for StoredTripRequest {
    fn from(row: TripRequestRow) -> Self {
        StoredTripRequest {
            id: RequestId(row.id),
            request: TripRequest {
                origin: row.origin,
                destination: row.destination,
                desired_time: row.desired_time,
                chat_id: ChatId(row.chat_id),
            },
        }
    }
}

// Statements below take a bare connection so they can be composed into one transaction.

pub async fn upsert_chat(conn: &mut PgConnection, chat_id: ChatId, username: Option<&str>) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO chats (chat_id, username)
        VALUES ($1, $2)
        ON CONFLICT (chat_id) DO UPDATE SET username = COALESCE(EXCLUDED.username, chats.username)
        "#,
    )
    .bind(chat_id.0)
    .bind(username)
    .execute(conn)
    .await
    .map_err(backend)?;
    Ok(())
}

pub async fn insert_trip(conn: &mut PgConnection, trip: &Trip) -> StoreResult<TripId> {
    let seats = i32::try_from(trip.seats)
        .map_err(|_| StoreError::Backend(format!("seat count {} out of range", trip.seats)))?;
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO trips (origin, destination, origin_key, destination_key, departure_time, seats, chat_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id
        "#,
    )
    .bind(trip.origin.trim())
    .bind(trip.destination.trim())
    .bind(route_key(&trip.origin))
    .bind(route_key(&trip.destination))
    .bind(trip.departure_time)
    .bind(seats)
    .bind(trip.chat_id.0)
    .fetch_one(conn)
    .await
    .map_err(backend)?;
    Ok(TripId(id))
}

pub async fn insert_trip_request(conn: &mut PgConnection, request: &TripRequest) -> StoreResult<RequestId> {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO trip_requests (origin, destination, desired_time, chat_id)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(request.origin.trim())
    .bind(request.destination.trim())
    .bind(request.desired_time)
    .bind(request.chat_id.0)
    .fetch_one(conn)
    .await
    .map_err(backend)?;
    Ok(RequestId(id))
}

pub async fn search_trips(
    conn: &mut PgConnection,
    request: &TripRequest,
    window: chrono::Duration,
) -> StoreResult<MatchSet> {
    let rows: Vec<TripRow> = sqlx::query_as(
        r#"
        SELECT id, origin, destination, departure_time, seats, chat_id
        FROM trips
        WHERE origin_key = $1
          AND destination_key = $2
          AND departure_time BETWEEN $3 AND $4
        ORDER BY departure_time, id
        "#,
    )
    .bind(route_key(&request.origin))
    .bind(route_key(&request.destination))
    .bind(request.desired_time - window)
    .bind(request.desired_time + window)
    .fetch_all(conn)
    .await
    .map_err(backend)?;

    rows.into_iter().map(StoredTrip::try_from).collect()
}

pub async fn find_trip_request(conn: &mut PgConnection, id: RequestId) -> StoreResult<Option<StoredTripRequest>> {
    let row: Option<TripRequestRow> = sqlx::query_as(
        "SELECT id, origin, destination, desired_time, chat_id FROM trip_requests WHERE id = $1",
    )
    .bind(id.0)
    .fetch_optional(conn)
    .await
    .map_err(backend)?;
    Ok(row.map(StoredTripRequest::from))
}

pub async fn chat_exists(conn: &mut PgConnection, chat_id: ChatId) -> StoreResult<bool> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM chats WHERE chat_id = $1)")
        .bind(chat_id.0)
        .fetch_one(conn)
        .await
        .map_err(backend)
}

/// [`TripStore`] backed by Postgres; every operation is its own transaction.
pub struct PgTripStore {
    db: Database,
    search_window: chrono::Duration,
}

impl PgTripStore {
    pub fn new(db: Database, search_window: chrono::Duration) -> Self {
        Self { db, search_window }
    }
}

#[async_trait]
impl TripStore for PgTripStore {
    async fn insert_trip(&self, trip: &Trip, username: Option<&str>) -> StoreResult<TripId> {
        let trip = trip.clone();
        let username = username.map(str::to_owned);
        self.db
            .transact(move |conn| {
                Box::pin(async move {
                    upsert_chat(&mut *conn, trip.chat_id, username.as_deref()).await?;
                    insert_trip(&mut *conn, &trip).await
                })
            })
            .await
    }

    async fn insert_trip_request(&self, request: &TripRequest, username: Option<&str>) -> StoreResult<RequestId> {
        let request = request.clone();
        let username = username.map(str::to_owned);
        self.db
            .transact(move |conn| {
                Box::pin(async move {
                    upsert_chat(&mut *conn, request.chat_id, username.as_deref()).await?;
                    insert_trip_request(&mut *conn, &request).await
                })
            })
            .await
    }

    async fn search_trips(&self, request: &TripRequest) -> StoreResult<MatchSet> {
        let request = request.clone();
        let window = self.search_window;
        self.db
            .transact(move |conn| Box::pin(async move { search_trips(conn, &request, window).await }))
            .await
    }

    async fn find_trip_request(&self, id: RequestId) -> StoreResult<Option<StoredTripRequest>> {
        self.db
            .transact(move |conn| Box::pin(async move { find_trip_request(conn, id).await }))
            .await
    }

    async fn register_chat(&self, chat_id: ChatId, username: Option<&str>) -> StoreResult<()> {
        let username = username.map(str::to_owned);
        self.db
            .transact(move |conn| Box::pin(async move { upsert_chat(conn, chat_id, username.as_deref()).await }))
            .await
    }

    async fn chat_exists(&self, chat_id: ChatId) -> StoreResult<bool> {
        self.db
            .transact(move |conn| Box::pin(async move { chat_exists(conn, chat_id).await }))
            .await
    }
}
