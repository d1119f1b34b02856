use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use fw_reconcile::{DeliveryStatus, ExpectedDelivery, FeedType, NewDelivery};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};

pub const ENV_DB_URL: &str = "FW_DATABASE_URL";

/// Connect to Postgres using FW_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL).with_context(|| format!("missing env var {ENV_DB_URL}"))?;
    connect(&url).await
}

pub async fn connect(url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Connect from env and migrate. Used by DB-backed tests.
pub async fn testkit_db_pool() -> Result<PgPool> {
    let pool = connect_from_env().await?;
    migrate(&pool).await?;
    Ok(pool)
}

/// Simple status query (connectivity + schema presence).
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;
    let ok = one == 1;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema='public' and table_name='expected_deliveries'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok,
        has_deliveries_table: exists,
    })
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_deliveries_table: bool,
}

// ---------------------------------------------------------------------------
// Schedule generation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    /// Row already existed. Status untouched; filename filled only if it was null.
    Existing,
}

/// Idempotent upsert of one generated slot.
///
/// Never writes `status` on conflict, so a re-run cannot regress a row that
/// already moved past `expected`.
pub async fn upsert_expected(pool: &PgPool, slot: &NewDelivery) -> Result<UpsertOutcome> {
    let (inserted,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        insert into expected_deliveries (feed_type, ts_utc, status, filename)
        values ($1, $2, 'expected', $3)
        on conflict (feed_type, ts_utc) do update set
          filename = coalesce(expected_deliveries.filename, excluded.filename)
        returning (xmax = 0) as inserted
        "#,
    )
    .bind(slot.feed_type.as_str())
    .bind(slot.timestamp)
    .bind(&slot.filename)
    .fetch_one(pool)
    .await
    .with_context(|| {
        format!(
            "upsert_expected failed feed_type={} ts={}",
            slot.feed_type,
            slot.timestamp.to_rfc3339()
        )
    })?;

    Ok(if inserted {
        UpsertOutcome::Inserted
    } else {
        UpsertOutcome::Existing
    })
}

// ---------------------------------------------------------------------------
// Reconciliation reads / writes
// ---------------------------------------------------------------------------

/// Latest `received` slot per feed type.
pub async fn last_received_by_feed(pool: &PgPool) -> Result<Vec<(FeedType, DateTime<Utc>)>> {
    let rows: Vec<(String, DateTime<Utc>)> = sqlx::query_as(
        r#"
        select feed_type, max(ts_utc) as last_received
        from expected_deliveries
        where status = 'received'
        group by feed_type
        order by feed_type asc
        "#,
    )
    .fetch_all(pool)
    .await
    .context("last_received_by_feed failed")?;

    Ok(rows
        .into_iter()
        .map(|(feed, ts)| (FeedType::from(feed), ts))
        .collect())
}

/// Records due at `now` that still await arrival, oldest first.
///
/// Terminal rows are filtered here; the pass skips them regardless.
pub async fn fetch_due(pool: &PgPool, now: DateTime<Utc>) -> Result<Vec<ExpectedDelivery>> {
    let rows = sqlx::query(
        r#"
        select id, feed_type, ts_utc, status, filename, previous_ts_utc
        from expected_deliveries
        where ts_utc <= $1
          and status in ('expected', 'delayed')
        order by ts_utc asc, id asc
        "#,
    )
    .bind(now)
    .fetch_all(pool)
    .await
    .context("fetch_due failed")?;

    rows.iter().map(row_to_delivery).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionWrite {
    Applied,
    /// Row was no longer in the `from` status (another pass moved it first).
    /// Nothing was written.
    Superseded,
}

/// Persist one transition: new status plus the predecessor captured at
/// evaluation time.
///
/// Compare-and-set on the status the pass read, so a concurrent pass that
/// already committed a terminal status is never overwritten.
pub async fn record_transition(
    pool: &PgPool,
    id: i64,
    from: DeliveryStatus,
    to: DeliveryStatus,
    previous_ts: Option<DateTime<Utc>>,
) -> Result<TransitionWrite> {
    let res = sqlx::query(
        r#"
        update expected_deliveries
        set status = $3,
            previous_ts_utc = $4,
            updated_at_utc = now()
        where id = $1
          and status = $2
        "#,
    )
    .bind(id)
    .bind(from.as_str())
    .bind(to.as_str())
    .bind(previous_ts)
    .execute(pool)
    .await
    .with_context(|| format!("record_transition failed id={id}"))?;

    if res.rows_affected() == 1 {
        return Ok(TransitionWrite::Applied);
    }

    let current: Option<(String,)> = sqlx::query_as("select status from expected_deliveries where id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("record_transition status read failed id={id}"))?;

    match current {
        Some(_) => Ok(TransitionWrite::Superseded),
        None => Err(anyhow!("record_transition: no row for id={id}")),
    }
}

// ---------------------------------------------------------------------------
// Query endpoint
// ---------------------------------------------------------------------------

/// All records of `feed` within `[day 00:00, day + 24h)` UTC, ascending.
pub async fn fetch_day(pool: &PgPool, feed: &FeedType, day: NaiveDate) -> Result<Vec<ExpectedDelivery>> {
    let start = day.and_time(NaiveTime::MIN).and_utc();
    let end = start + Duration::hours(24);

    let rows = sqlx::query(
        r#"
        select id, feed_type, ts_utc, status, filename, previous_ts_utc
        from expected_deliveries
        where feed_type = $1
          and ts_utc >= $2
          and ts_utc < $3
        order by ts_utc asc
        "#,
    )
    .bind(feed.as_str())
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await
    .with_context(|| format!("fetch_day failed feed_type={feed} day={day}"))?;

    rows.iter().map(row_to_delivery).collect()
}

fn row_to_delivery(row: &PgRow) -> Result<ExpectedDelivery> {
    let status: String = row.try_get("status")?;
    Ok(ExpectedDelivery {
        id: row.try_get("id")?,
        feed_type: FeedType::from(row.try_get::<String, _>("feed_type")?),
        timestamp: row.try_get("ts_utc")?,
        status: DeliveryStatus::parse(&status)?,
        filename: row.try_get("filename")?,
        previous_timestamp: row.try_get("previous_ts_utc")?,
    })
}
