//! SQLite implementation of the assignment store
//!
//! Schema (timestamps are epoch milliseconds, ids are UUID text):
//!
//! ```sql
//! assign_jobs(id PK, service_code, location_code, status, created_at)
//! assign_job_offers(id PK, job_id, provider_id, status, expires_at, created_at,
//!                   UNIQUE(job_id, provider_id))
//! assign_job_assignments(job_id PK, provider_id, assigned_at)
//! assign_logs(id INTEGER PK AUTOINCREMENT, job_id, provider_id, event, meta, created_at)
//! ```
//!
//! SQLite admits a single writer, so the pool holds exactly one connection:
//! transactions run one after another, which is a serializable schedule, and
//! an in-memory database lives as long as the store.

use std::collections::BTreeSet;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use shared::{
    Assignment, EligibleProvider, Job, JobId, JobSnapshot, JobStatus, LogEntry, NewLogEntry, Offer, OfferStatus,
    Provider, ProviderId, ProviderStatus, SharedError,
};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tracing::{debug, instrument};

use crate::error::{EngineError, EngineResult};
use crate::traits::{AssignmentStore, ClaimOutcome, StoreTransaction};

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS providers (
        id TEXT PRIMARY KEY,
        company_name TEXT NOT NULL,
        contact_email TEXT,
        contact_phone TEXT,
        status TEXT NOT NULL,
        created_at INTEGER NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS provider_services (
        provider_id TEXT NOT NULL REFERENCES providers(id),
        service_code TEXT NOT NULL,
        PRIMARY KEY (provider_id, service_code)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS provider_locations (
        provider_id TEXT NOT NULL REFERENCES providers(id),
        location_code TEXT NOT NULL,
        PRIMARY KEY (provider_id, location_code)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS assign_jobs (
        id TEXT PRIMARY KEY,
        service_code TEXT NOT NULL,
        location_code TEXT NOT NULL,
        status TEXT NOT NULL,
        created_at INTEGER NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS assign_job_offers (
        id TEXT PRIMARY KEY,
        job_id TEXT NOT NULL REFERENCES assign_jobs(id),
        provider_id TEXT NOT NULL REFERENCES providers(id),
        status TEXT NOT NULL,
        expires_at INTEGER NOT NULL,
        created_at INTEGER NOT NULL,
        UNIQUE (job_id, provider_id)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS assign_job_assignments (
        job_id TEXT PRIMARY KEY REFERENCES assign_jobs(id),
        provider_id TEXT NOT NULL REFERENCES providers(id),
        assigned_at INTEGER NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS assign_logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        job_id TEXT,
        provider_id TEXT,
        event TEXT NOT NULL,
        meta TEXT NOT NULL DEFAULT '{}',
        created_at INTEGER NOT NULL
    )"#,
    "CREATE INDEX IF NOT EXISTS idx_provider_services_code ON provider_services(service_code)",
    "CREATE INDEX IF NOT EXISTS idx_provider_locations_code ON provider_locations(location_code)",
    "CREATE INDEX IF NOT EXISTS idx_offers_open_expiry ON assign_job_offers(status, expires_at)",
    "CREATE INDEX IF NOT EXISTS idx_logs_job ON assign_logs(job_id, id)",
];

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect and create the schema
    ///
    /// `database_url` is any sqlx SQLite URL, e.g. `sqlite::memory:` or
    /// `sqlite://assignments.db`.
    #[instrument(skip(database_url))]
    pub async fn open(database_url: &str) -> EngineResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| EngineError::store(format!("failed to connect SQLite: {e}")))?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub async fn in_memory() -> EngineResult<Self> {
        Self::open("sqlite::memory:").await
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl AssignmentStore for SqliteStore {
    type Tx = SqliteTransaction;

    async fn begin(&self) -> EngineResult<SqliteTransaction> {
        let tx = self.pool.begin().await?;
        Ok(SqliteTransaction { tx })
    }

    async fn migrate(&self) -> EngineResult<()> {
        let mut tx = self.pool.begin().await?;
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(|e| EngineError::store(format!("failed to apply schema: {e}")))?;
        }
        tx.commit().await?;
        debug!("SQLite schema ready");
        Ok(())
    }

    async fn find_assignment(&self, job_id: JobId) -> EngineResult<Option<Assignment>> {
        let mut conn = self.pool.acquire().await?;
        fetch_assignment(&mut conn, job_id).await
    }

    async fn job_logs(&self, job_id: JobId, limit: u32) -> EngineResult<Vec<LogEntry>> {
        let mut conn = self.pool.acquire().await?;
        let rows = sqlx::query(
            r#"SELECT id, job_id, provider_id, event, meta, created_at
               FROM assign_logs WHERE job_id = ?1
               ORDER BY id DESC LIMIT ?2"#,
        )
        .bind(job_id.to_string())
        .bind(limit as i64)
        .fetch_all(&mut *conn)
        .await?;
        rows.iter().map(log_from_row).collect()
    }

    async fn job_history(&self, job_id: JobId) -> EngineResult<Vec<LogEntry>> {
        let mut conn = self.pool.acquire().await?;
        let rows = sqlx::query(
            r#"SELECT id, job_id, provider_id, event, meta, created_at
               FROM assign_logs WHERE job_id = ?1
               ORDER BY id ASC"#,
        )
        .bind(job_id.to_string())
        .fetch_all(&mut *conn)
        .await?;
        rows.iter().map(log_from_row).collect()
    }

    async fn job_snapshot(&self, job_id: JobId) -> EngineResult<Option<JobSnapshot>> {
        // Read inside a transaction so the three tables agree with each other
        let mut tx = self.pool.begin().await?;
        let Some(job) = fetch_job(&mut tx, job_id).await? else {
            tx.rollback().await?;
            return Ok(None);
        };

        let rows = sqlx::query(
            r#"SELECT id, job_id, provider_id, status, expires_at, created_at
               FROM assign_job_offers WHERE job_id = ?1
               ORDER BY created_at, rowid"#,
        )
        .bind(job_id.to_string())
        .fetch_all(&mut *tx)
        .await?;
        let offers = rows.iter().map(offer_from_row).collect::<EngineResult<Vec<_>>>()?;
        let assignment = fetch_assignment(&mut tx, job_id).await?;
        tx.rollback().await?;

        Ok(Some(JobSnapshot { job, offers, assignment }))
    }

    async fn find_provider(&self, provider_id: ProviderId) -> EngineResult<Option<Provider>> {
        let mut conn = self.pool.acquire().await?;
        fetch_provider(&mut conn, provider_id).await
    }
}

/// An open SQLite transaction; dropped without commit means rolled back
pub struct SqliteTransaction {
    tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl StoreTransaction for SqliteTransaction {
    async fn insert_job(&mut self, job: &Job) -> EngineResult<()> {
        sqlx::query(
            r#"INSERT INTO assign_jobs (id, service_code, location_code, status, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5)"#,
        )
        .bind(job.id.to_string())
        .bind(&job.service_code)
        .bind(&job.location_code)
        .bind(job.status.as_str())
        .bind(job.created_at.timestamp_millis())
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn find_job(&mut self, job_id: JobId) -> EngineResult<Option<Job>> {
        fetch_job(&mut self.tx, job_id).await
    }

    async fn update_job_status(&mut self, job_id: JobId, from: JobStatus, to: JobStatus) -> EngineResult<bool> {
        from.transition_to(to)?;
        let result = sqlx::query("UPDATE assign_jobs SET status = ?1 WHERE id = ?2 AND status = ?3")
            .bind(to.as_str())
            .bind(job_id.to_string())
            .bind(from.as_str())
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn eligible_providers(
        &mut self,
        service_code: &str,
        location_code: &str,
        statuses: &[ProviderStatus],
    ) -> EngineResult<Vec<EligibleProvider>> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = (0..statuses.len())
            .map(|i| format!("?{}", i + 3))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            r#"SELECT p.id, p.company_name, p.status
               FROM providers p
               JOIN provider_services ps ON ps.provider_id = p.id
               JOIN provider_locations pl ON pl.provider_id = p.id
               WHERE ps.service_code = ?1
                 AND pl.location_code = ?2
                 AND p.status IN ({placeholders})
               GROUP BY p.id"#
        );

        let mut query = sqlx::query(&sql).bind(service_code).bind(location_code);
        for status in statuses {
            query = query.bind(status.as_str());
        }

        let rows = query.fetch_all(&mut *self.tx).await?;
        rows.iter()
            .map(|row| {
                Ok(EligibleProvider {
                    id: parse_text(row, "id")?,
                    company_name: row.try_get("company_name")?,
                    status: parse_text(row, "status")?,
                })
            })
            .collect()
    }

    async fn insert_offer(&mut self, offer: &Offer) -> EngineResult<bool> {
        let result = sqlx::query(
            r#"INSERT INTO assign_job_offers (id, job_id, provider_id, status, expires_at, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)
               ON CONFLICT (job_id, provider_id) DO NOTHING"#,
        )
        .bind(offer.id.to_string())
        .bind(offer.job_id.to_string())
        .bind(offer.provider_id.to_string())
        .bind(offer.status.as_str())
        .bind(offer.expires_at.timestamp_millis())
        .bind(offer.created_at.timestamp_millis())
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn find_offer(&mut self, job_id: JobId, provider_id: ProviderId) -> EngineResult<Option<Offer>> {
        let row = sqlx::query(
            r#"SELECT id, job_id, provider_id, status, expires_at, created_at
               FROM assign_job_offers WHERE job_id = ?1 AND provider_id = ?2"#,
        )
        .bind(job_id.to_string())
        .bind(provider_id.to_string())
        .fetch_optional(&mut *self.tx)
        .await?;
        row.as_ref().map(offer_from_row).transpose()
    }

    async fn update_offer_status(
        &mut self,
        job_id: JobId,
        provider_id: ProviderId,
        from: OfferStatus,
        to: OfferStatus,
    ) -> EngineResult<bool> {
        from.transition_to(to)?;
        let result = sqlx::query(
            r#"UPDATE assign_job_offers SET status = ?1
               WHERE job_id = ?2 AND provider_id = ?3 AND status = ?4"#,
        )
        .bind(to.as_str())
        .bind(job_id.to_string())
        .bind(provider_id.to_string())
        .bind(from.as_str())
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn close_open_offers(
        &mut self,
        job_id: JobId,
        except: Option<ProviderId>,
        to: OfferStatus,
    ) -> EngineResult<Vec<ProviderId>> {
        OfferStatus::Offered.transition_to(to)?;
        let rows = sqlx::query(
            r#"UPDATE assign_job_offers SET status = ?1
               WHERE job_id = ?2 AND status = ?3 AND (?4 IS NULL OR provider_id != ?4)
               RETURNING provider_id"#,
        )
        .bind(to.as_str())
        .bind(job_id.to_string())
        .bind(OfferStatus::Offered.as_str())
        .bind(except.map(|id| id.to_string()))
        .fetch_all(&mut *self.tx)
        .await?;

        let mut closed = rows
            .iter()
            .map(|row| parse_text(row, "provider_id"))
            .collect::<EngineResult<Vec<ProviderId>>>()?;
        closed.sort();
        Ok(closed)
    }

    async fn lapsed_offers(&mut self, now: DateTime<Utc>) -> EngineResult<Vec<Offer>> {
        let rows = sqlx::query(
            r#"SELECT id, job_id, provider_id, status, expires_at, created_at
               FROM assign_job_offers
               WHERE status = ?1 AND expires_at <= ?2
               ORDER BY expires_at, rowid"#,
        )
        .bind(OfferStatus::Offered.as_str())
        .bind(now.timestamp_millis())
        .fetch_all(&mut *self.tx)
        .await?;
        rows.iter().map(offer_from_row).collect()
    }

    async fn stranded_jobs(&mut self) -> EngineResult<Vec<JobId>> {
        let rows = sqlx::query(
            r#"SELECT j.id FROM assign_jobs j
               WHERE j.status = ?1
                 AND NOT EXISTS (
                   SELECT 1 FROM assign_job_offers o WHERE o.job_id = j.id AND o.status = ?2
                 )
                 AND NOT EXISTS (
                   SELECT 1 FROM assign_job_assignments a WHERE a.job_id = j.id
                 )
               ORDER BY j.created_at"#,
        )
        .bind(JobStatus::Offered.as_str())
        .bind(OfferStatus::Offered.as_str())
        .fetch_all(&mut *self.tx)
        .await?;
        rows.iter().map(|row| parse_text(row, "id")).collect()
    }

    async fn claim_assignment(&mut self, assignment: &Assignment) -> EngineResult<ClaimOutcome> {
        let result = sqlx::query(
            r#"INSERT INTO assign_job_assignments (job_id, provider_id, assigned_at)
               VALUES (?1, ?2, ?3)
               ON CONFLICT (job_id) DO NOTHING"#,
        )
        .bind(assignment.job_id.to_string())
        .bind(assignment.provider_id.to_string())
        .bind(assignment.assigned_at.timestamp_millis())
        .execute(&mut *self.tx)
        .await;

        match result {
            Ok(done) if done.rows_affected() == 1 => Ok(ClaimOutcome::Claimed),
            Ok(_) => Ok(ClaimOutcome::AlreadyClaimed),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Ok(ClaimOutcome::AlreadyClaimed),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_assignment(&mut self, job_id: JobId) -> EngineResult<Option<Assignment>> {
        fetch_assignment(&mut self.tx, job_id).await
    }

    async fn append_log(&mut self, entry: &NewLogEntry) -> EngineResult<i64> {
        let result = sqlx::query(
            r#"INSERT INTO assign_logs (job_id, provider_id, event, meta, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5)"#,
        )
        .bind(entry.job_id.map(|id| id.to_string()))
        .bind(entry.provider_id.map(|id| id.to_string()))
        .bind(entry.event.as_str())
        .bind(serde_json::to_string(&entry.meta)?)
        .bind(entry.created_at.timestamp_millis())
        .execute(&mut *self.tx)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn insert_provider(&mut self, provider: &Provider) -> EngineResult<()> {
        let id = provider.id.to_string();
        sqlx::query(
            r#"INSERT INTO providers (id, company_name, contact_email, contact_phone, status, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
        )
        .bind(&id)
        .bind(&provider.company_name)
        .bind(&provider.contact_email)
        .bind(&provider.contact_phone)
        .bind(provider.status.as_str())
        .bind(provider.created_at.timestamp_millis())
        .execute(&mut *self.tx)
        .await?;

        for service in &provider.services {
            sqlx::query("INSERT INTO provider_services (provider_id, service_code) VALUES (?1, ?2)")
                .bind(&id)
                .bind(service)
                .execute(&mut *self.tx)
                .await?;
        }
        for location in &provider.locations {
            sqlx::query("INSERT INTO provider_locations (provider_id, location_code) VALUES (?1, ?2)")
                .bind(&id)
                .bind(location)
                .execute(&mut *self.tx)
                .await?;
        }
        Ok(())
    }

    async fn find_provider(&mut self, provider_id: ProviderId) -> EngineResult<Option<Provider>> {
        fetch_provider(&mut self.tx, provider_id).await
    }

    async fn update_provider_status(&mut self, provider_id: ProviderId, status: ProviderStatus) -> EngineResult<bool> {
        let result = sqlx::query("UPDATE providers SET status = ?1 WHERE id = ?2")
            .bind(status.as_str())
            .bind(provider_id.to_string())
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn commit(self) -> EngineResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> EngineResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

async fn fetch_job(conn: &mut SqliteConnection, job_id: JobId) -> EngineResult<Option<Job>> {
    let row = sqlx::query("SELECT id, service_code, location_code, status, created_at FROM assign_jobs WHERE id = ?1")
        .bind(job_id.to_string())
        .fetch_optional(&mut *conn)
        .await?;

    row.map(|row| {
        Ok(Job {
            id: parse_text(&row, "id")?,
            service_code: row.try_get("service_code")?,
            location_code: row.try_get("location_code")?,
            status: parse_text(&row, "status")?,
            created_at: millis(&row, "created_at")?,
        })
    })
    .transpose()
}

async fn fetch_assignment(conn: &mut SqliteConnection, job_id: JobId) -> EngineResult<Option<Assignment>> {
    let row = sqlx::query("SELECT job_id, provider_id, assigned_at FROM assign_job_assignments WHERE job_id = ?1")
        .bind(job_id.to_string())
        .fetch_optional(&mut *conn)
        .await?;

    row.map(|row| {
        Ok(Assignment {
            job_id: parse_text(&row, "job_id")?,
            provider_id: parse_text(&row, "provider_id")?,
            assigned_at: millis(&row, "assigned_at")?,
        })
    })
    .transpose()
}

async fn fetch_provider(conn: &mut SqliteConnection, provider_id: ProviderId) -> EngineResult<Option<Provider>> {
    let id = provider_id.to_string();
    let Some(row) = sqlx::query(
        r#"SELECT id, company_name, contact_email, contact_phone, status, created_at
           FROM providers WHERE id = ?1"#,
    )
    .bind(&id)
    .fetch_optional(&mut *conn)
    .await?
    else {
        return Ok(None);
    };

    let services: BTreeSet<String> = sqlx::query("SELECT service_code FROM provider_services WHERE provider_id = ?1")
        .bind(&id)
        .fetch_all(&mut *conn)
        .await?
        .iter()
        .map(|r| r.try_get::<String, _>("service_code"))
        .collect::<Result<_, _>>()?;
    let locations: BTreeSet<String> = sqlx::query("SELECT location_code FROM provider_locations WHERE provider_id = ?1")
        .bind(&id)
        .fetch_all(&mut *conn)
        .await?
        .iter()
        .map(|r| r.try_get::<String, _>("location_code"))
        .collect::<Result<_, _>>()?;

    Ok(Some(Provider {
        id: parse_text(&row, "id")?,
        company_name: row.try_get("company_name")?,
        contact_email: row.try_get("contact_email")?,
        contact_phone: row.try_get("contact_phone")?,
        status: parse_text(&row, "status")?,
        services,
        locations,
        created_at: millis(&row, "created_at")?,
    }))
}

fn offer_from_row(row: &SqliteRow) -> EngineResult<Offer> {
    Ok(Offer {
        id: parse_text(row, "id")?,
        job_id: parse_text(row, "job_id")?,
        provider_id: parse_text(row, "provider_id")?,
        status: parse_text(row, "status")?,
        expires_at: millis(row, "expires_at")?,
        created_at: millis(row, "created_at")?,
    })
}

fn log_from_row(row: &SqliteRow) -> EngineResult<LogEntry> {
    let meta: String = row.try_get("meta")?;
    Ok(LogEntry {
        id: row.try_get("id")?,
        job_id: parse_optional_text(row, "job_id")?,
        provider_id: parse_optional_text(row, "provider_id")?,
        event: parse_text(row, "event")?,
        meta: serde_json::from_str(&meta)?,
        created_at: millis(row, "created_at")?,
    })
}

fn parse_text<T>(row: &SqliteRow, column: &str) -> EngineResult<T>
where
    T: FromStr<Err = SharedError>,
{
    let text: String = row.try_get(column)?;
    Ok(text.parse()?)
}

fn parse_optional_text<T>(row: &SqliteRow, column: &str) -> EngineResult<Option<T>>
where
    T: FromStr<Err = SharedError>,
{
    let text: Option<String> = row.try_get(column)?;
    Ok(text.map(|t| t.parse()).transpose()?)
}

fn millis(row: &SqliteRow, column: &str) -> EngineResult<DateTime<Utc>> {
    let value: i64 = row.try_get(column)?;
    Utc.timestamp_millis_opt(value)
        .single()
        .ok_or_else(|| EngineError::store(format!("{column} holds an invalid timestamp: {value}")))
}
