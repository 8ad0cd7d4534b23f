use bloom_backend::plants;
use bloom_backend::watering::{self, adjustment, IntervalEstimator, SeasonInfo};
use chrono::{DateTime, Duration, TimeZone, Utc};
use httpmock::prelude::*;
use serde_json::json;
use sqlx::PgPool;

// key: seasonal-adjustment-tests -> baseline recovery and monthly recalibration

async fn insert_plant(
    pool: &PgPool,
    user_id: i64,
    species: Option<&str>,
    base: Option<i32>,
    current: Option<i32>,
) -> i32 {
    sqlx::query_scalar(
        "INSERT INTO plants (user_id, plant_name, base_watering_interval, watering_interval) \
         VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(user_id)
    .bind(species)
    .bind(base)
    .bind(current)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn interval_of(pool: &PgPool, plant_id: i32) -> Option<i32> {
    sqlx::query_scalar("SELECT watering_interval FROM plants WHERE id = $1")
        .bind(plant_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

fn completion_with(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "created": 1,
        "model": "gpt-4o-mini",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL with Postgres server"]
async fn backfill_recovers_summer_baselines_once(pool: PgPool) {
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();

    let winter = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
    let stretched = insert_plant(&pool, 1, Some("Фикус"), None, Some(14)).await;
    let untracked = insert_plant(&pool, 1, None, None, None).await;
    let already_set = insert_plant(&pool, 2, Some("Монстера"), Some(9), Some(18)).await;

    let updated = watering::backfill_base_intervals(&pool, winter).await.unwrap();
    assert_eq!(updated, 2);

    let base: Option<i32> =
        sqlx::query_scalar("SELECT base_watering_interval FROM plants WHERE id = $1")
            .bind(stretched)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(base, Some(7));

    // No recorded interval falls back to the 7-day default before halving.
    let base: Option<i32> =
        sqlx::query_scalar("SELECT base_watering_interval FROM plants WHERE id = $1")
            .bind(untracked)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(base, Some(4));

    let base: Option<i32> =
        sqlx::query_scalar("SELECT base_watering_interval FROM plants WHERE id = $1")
            .bind(already_set)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(base, Some(9));

    let second_run = watering::backfill_base_intervals(&pool, winter).await.unwrap();
    assert_eq!(second_run, 0);
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL with Postgres server"]
async fn adjustment_tick_doubles_winter_intervals_and_reschedules(pool: PgPool) {
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();

    let winter = Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap();
    let monstera = insert_plant(&pool, 10, Some("Монстера"), Some(7), Some(7)).await;
    let unnamed = insert_plant(&pool, 10, None, Some(7), Some(7)).await;

    // Succulents and muted reminders never enter the batch.
    let cactus: i32 = sqlx::query_scalar(
        "INSERT INTO plants (user_id, plant_name, plant_type, watering_interval) \
         VALUES (11, 'Кактус', 'succulent', 7) RETURNING id",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    sqlx::query(
        "INSERT INTO plants (user_id, plant_name, watering_interval, reminder_enabled) \
         VALUES (11, 'Фикус', 7, FALSE)",
    )
    .execute(&pool)
    .await
    .unwrap();

    let stale_reminder: i32 = sqlx::query_scalar(
        "INSERT INTO reminders (user_id, plant_id, reminder_type, next_date) \
         VALUES (10, $1, 'watering', $2) RETURNING id",
    )
    .bind(monstera)
    .bind(winter + Duration::days(2))
    .fetch_one(&pool)
    .await
    .unwrap();

    let estimator = IntervalEstimator::disabled();
    let outcome = watering::run_seasonal_adjustment_tick(&pool, &estimator, winter)
        .await
        .unwrap();
    assert_eq!(outcome.processed, 2);
    assert_eq!(outcome.updated, 1);
    assert_eq!(outcome.skipped, 1);
    assert_eq!(outcome.errors, 0);

    assert_eq!(interval_of(&pool, monstera).await, Some(14));
    assert_eq!(interval_of(&pool, unnamed).await, Some(7));
    assert_eq!(interval_of(&pool, cactus).await, Some(7));

    let stale_active: bool = sqlx::query_scalar("SELECT is_active FROM reminders WHERE id = $1")
        .bind(stale_reminder)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(!stale_active);

    let next_date: DateTime<Utc> = sqlx::query_scalar(
        "SELECT next_date FROM reminders WHERE plant_id = $1 AND is_active",
    )
    .bind(monstera)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(next_date, winter + Duration::days(14));
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL with Postgres server"]
async fn adjustment_tick_leaves_matching_intervals_alone(pool: PgPool) {
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();

    // Spring keeps the baseline as-is, so nothing should be rewritten.
    let spring = Utc.with_ymd_and_hms(2025, 4, 10, 12, 0, 0).unwrap();
    insert_plant(&pool, 5, Some("Фиалка"), Some(7), Some(7)).await;

    let estimator = IntervalEstimator::disabled();
    let outcome = watering::run_seasonal_adjustment_tick(&pool, &estimator, spring)
        .await
        .unwrap();
    assert_eq!(outcome.processed, 1);
    assert_eq!(outcome.updated, 0);
    assert_eq!(outcome.skipped, 0);

    let reminders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reminders")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(reminders, 0);
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL with Postgres server"]
async fn manual_refresh_applies_the_model_interval(pool: PgPool) {
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();

    let server = MockServer::start_async().await;
    let completion = server.mock(|when, then| {
        when.method(POST).path("/chat/completions");
        then.status(200).json_body(completion_with("12"));
    });

    let winter = Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap();
    let plant_id = insert_plant(&pool, 3, Some("Фикус каучуконосный"), Some(7), Some(7)).await;
    let plant = plants::fetch_by_id(&pool, plant_id).await.unwrap().unwrap();
    let species = plant.species_name().unwrap().to_string();

    let estimator = IntervalEstimator::new(
        "test-key".to_string(),
        "gpt-4o-mini".to_string(),
        Some(server.base_url()),
    );
    let outcome = adjustment::refresh_plant(&pool, &estimator, &plant, &species, winter)
        .await
        .unwrap();
    assert!(outcome.changed);
    assert_eq!(outcome.old_interval, 7);
    assert_eq!(outcome.new_interval, 12);
    assert_eq!(outcome.season, "winter");

    assert_eq!(interval_of(&pool, plant_id).await, Some(12));

    let next_date: DateTime<Utc> = sqlx::query_scalar(
        "SELECT next_date FROM reminders WHERE plant_id = $1 AND is_active",
    )
    .bind(plant_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(next_date, winter + Duration::days(12));
    completion.assert();
}

#[tokio::test]
async fn estimator_prefers_the_model_answer() {
    let server = MockServer::start_async().await;
    let completion = server.mock(|when, then| {
        when.method(POST).path("/chat/completions");
        then.status(200).json_body(completion_with("10 дней"));
    });

    let estimator = IntervalEstimator::new(
        "test-key".to_string(),
        "gpt-4o-mini".to_string(),
        Some(server.base_url()),
    );
    let winter = Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap();
    let days = estimator.estimate("Монстера", 7, &SeasonInfo::at(winter)).await;
    assert_eq!(days, 10);
    completion.assert();
}

#[tokio::test]
async fn estimator_falls_back_to_formula_without_a_number() {
    let server = MockServer::start_async().await;
    let completion = server.mock(|when, then| {
        when.method(POST).path("/chat/completions");
        then.status(200)
            .json_body(completion_with("поливайте реже, чем летом"));
    });

    let estimator = IntervalEstimator::new(
        "test-key".to_string(),
        "gpt-4o-mini".to_string(),
        Some(server.base_url()),
    );
    let winter = Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap();
    let days = estimator.estimate("Кактус", 7, &SeasonInfo::at(winter)).await;
    // Winter formula over the 7-day baseline.
    assert_eq!(days, 14);
    completion.assert();
}

#[tokio::test]
async fn disabled_estimator_stays_on_the_formula() {
    let estimator = IntervalEstimator::disabled();
    let autumn = Utc.with_ymd_and_hms(2025, 10, 10, 12, 0, 0).unwrap();
    let days = estimator.estimate("Монстера", 7, &SeasonInfo::at(autumn)).await;
    assert_eq!(days, 10);
}
