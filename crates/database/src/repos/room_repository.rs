use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::entities::{NewRoom, Room};
use crate::timestamp;
use crate::types::{DatabaseError, DatabaseResult};

pub struct RoomRepository {
    pool: SqlitePool,
}

impl RoomRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, room: &NewRoom, now: DateTime<Utc>) -> DatabaseResult<Room> {
        let name = room.name.trim();
        if name.is_empty() {
            return Err(DatabaseError::ValidationError("room name is required".to_string()));
        }

        let room = sqlx::query_as::<_, Room>(
            "INSERT INTO rooms (name, description, created_at) VALUES (?, ?, ?) RETURNING *",
        )
        .bind(name)
        .bind(&room.description)
        .bind(timestamp::format(now))
        .fetch_one(&self.pool)
        .await?;
        Ok(room)
    }

    pub async fn list(&self) -> DatabaseResult<Vec<Room>> {
        let rooms = sqlx::query_as::<_, Room>("SELECT * FROM rooms ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rooms)
    }

    pub async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<Room>> {
        let room = sqlx::query_as::<_, Room>("SELECT * FROM rooms WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(room)
    }

    pub async fn find_by_name(&self, name: &str) -> DatabaseResult<Option<Room>> {
        let room = sqlx::query_as::<_, Room>("SELECT * FROM rooms WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(room)
    }
}
