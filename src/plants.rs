use anyhow::Result;
use serde::Serialize;
use sqlx::{FromRow, PgPool};

/// Interval assumed for plants that never had one recorded.
pub const DEFAULT_INTERVAL_DAYS: i32 = 7;

/// key: plants-model -> collection rows
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Plant {
    pub id: i32,
    pub user_id: i64,
    pub custom_name: Option<String>,
    pub plant_name: Option<String>,
    pub plant_type: String,
    pub base_watering_interval: Option<i32>,
    pub watering_interval: Option<i32>,
    pub reminder_enabled: bool,
}

impl Plant {
    pub fn display_name(&self) -> String {
        self.custom_name
            .as_deref()
            .or(self.plant_name.as_deref())
            .map(|name| name.to_string())
            .unwrap_or_else(|| format!("Растение #{}", self.id))
    }

    /// Species name as identified from a photo. Empty or missing means the
    /// plant cannot be estimated per-species.
    pub fn species_name(&self) -> Option<&str> {
        self.plant_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    pub fn current_interval(&self) -> i32 {
        self.watering_interval.unwrap_or(DEFAULT_INTERVAL_DAYS)
    }

    /// Summer baseline, falling back to the current interval for rows the
    /// backfill has not reached yet.
    pub fn base_interval(&self) -> i32 {
        self.base_watering_interval
            .or(self.watering_interval)
            .unwrap_or(DEFAULT_INTERVAL_DAYS)
    }
}

/// Plants eligible for seasonal re-estimation, grouped per user for readable
/// job logs.
pub async fn fetch_for_seasonal_update(pool: &PgPool) -> Result<Vec<Plant>> {
    let plants = sqlx::query_as::<_, Plant>(
        r#"
        SELECT
            id,
            user_id,
            custom_name,
            plant_name,
            plant_type,
            base_watering_interval,
            watering_interval,
            reminder_enabled
        FROM plants
        WHERE plant_type = 'regular' AND reminder_enabled
        ORDER BY user_id, id
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(plants)
}

pub async fn fetch_by_id(pool: &PgPool, plant_id: i32) -> Result<Option<Plant>> {
    let plant = sqlx::query_as::<_, Plant>(
        r#"
        SELECT
            id,
            user_id,
            custom_name,
            plant_name,
            plant_type,
            base_watering_interval,
            watering_interval,
            reminder_enabled
        FROM plants
        WHERE id = $1
        "#,
    )
    .bind(plant_id)
    .fetch_optional(pool)
    .await?;
    Ok(plant)
}

pub async fn set_watering_interval(pool: &PgPool, plant_id: i32, days: i32) -> Result<()> {
    sqlx::query("UPDATE plants SET watering_interval = $1 WHERE id = $2")
        .bind(days)
        .bind(plant_id)
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plant(custom: Option<&str>, species: Option<&str>) -> Plant {
        Plant {
            id: 42,
            user_id: 1,
            custom_name: custom.map(String::from),
            plant_name: species.map(String::from),
            plant_type: "regular".to_string(),
            base_watering_interval: None,
            watering_interval: None,
            reminder_enabled: true,
        }
    }

    #[test]
    fn display_name_prefers_custom_then_species() {
        assert_eq!(plant(Some("Фил"), Some("Monstera")).display_name(), "Фил");
        assert_eq!(plant(None, Some("Monstera")).display_name(), "Monstera");
        assert_eq!(plant(None, None).display_name(), "Растение #42");
    }

    #[test]
    fn species_name_rejects_blank_values() {
        assert_eq!(plant(None, Some("  ")).species_name(), None);
        assert_eq!(plant(None, Some("Ficus")).species_name(), Some("Ficus"));
        assert_eq!(plant(None, None).species_name(), None);
    }

    #[test]
    fn base_interval_falls_back_to_current_then_default() {
        let mut p = plant(None, Some("Ficus"));
        assert_eq!(p.base_interval(), DEFAULT_INTERVAL_DAYS);
        p.watering_interval = Some(10);
        assert_eq!(p.base_interval(), 10);
        p.base_watering_interval = Some(8);
        assert_eq!(p.base_interval(), 8);
    }
}
