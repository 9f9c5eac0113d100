//! Zone repository implementation.

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use agrimap_core::{Error, Result, ZoneRecord, ZoneRepository};

/// PostgreSQL implementation of [`ZoneRepository`].
pub struct PgZoneRepository {
    pool: Pool<Postgres>,
}

impl PgZoneRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ZoneRepository for PgZoneRepository {
    async fn save(&self, record: &ZoneRecord) -> Result<Uuid> {
        let zone_id = Uuid::now_v7();

        sqlx::query(
            "INSERT INTO zone (
                id, name, description, zone_code, province, district,
                map_type, zone_type, land_use, fill_color, stroke_color,
                fill_opacity, area_sqm, boundary, center_lat, center_lng,
                created_by, created_at, updated_at, source, verified
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                $12, $13, $14, $15, $16, $17, $18, $19, $20, $21
            )",
        )
        .bind(zone_id)
        .bind(&record.name)
        .bind(&record.description)
        .bind(&record.zone_code)
        .bind(&record.province)
        .bind(&record.district)
        .bind(&record.map_type)
        .bind(&record.zone_type)
        .bind(&record.land_use)
        .bind(&record.fill_color)
        .bind(&record.stroke_color)
        .bind(record.fill_opacity)
        .bind(record.area_sqm)
        .bind(&record.boundary)
        .bind(record.center_lat)
        .bind(record.center_lng)
        .bind(record.created_by)
        .bind(record.created_at)
        .bind(record.updated_at)
        .bind(&record.source)
        .bind(record.verified)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Storage(format!("Failed to insert zone: {}", e)))?;

        Ok(zone_id)
    }
}
