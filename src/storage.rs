use crate::schedule::{SchedulePayload, ScheduleRecord};
use crate::types::{EventKind, MessageRef, VoltageStats};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::{Pool, Runtime};
use serde_json::Value;
use tokio_postgres::NoTls;
use tracing::info;

/// Armazenamento chave-valor durável.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Log append-only de transições de energia.
#[async_trait]
pub trait EventLog: Send + Sync {
    async fn append(&self, kind: EventKind, at: DateTime<Utc>) -> Result<()>;
}

/// Leituras de tensão, marcadas com a mensagem de status ativa.
#[async_trait]
pub trait VoltageLog: Send + Sync {
    async fn append_voltage(
        &self,
        voltage: f64,
        message: Option<MessageRef>,
        at: DateTime<Utc>,
    ) -> Result<()>;

    /// `None` quando não há leituras desde `since`.
    async fn voltage_stats(&self, since: DateTime<Utc>) -> Result<Option<VoltageStats>>;
}

/// Histórico dos cronogramas aceitos; a linha mais recente é o cache.
#[async_trait]
pub trait ScheduleHistory: Send + Sync {
    async fn append_schedule(&self, record: &ScheduleRecord) -> Result<()>;
    async fn latest_schedule(&self) -> Result<Option<ScheduleRecord>>;
}

const SCHEMA: &str = r#"
DO $$ BEGIN
    CREATE TYPE power_event_kind AS ENUM ('on', 'off');
EXCEPTION
    WHEN duplicate_object THEN NULL;
END $$;

CREATE TABLE IF NOT EXISTS system_state (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS power_events (
    id BIGSERIAL PRIMARY KEY,
    kind power_event_kind NOT NULL,
    at TIMESTAMPTZ NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS voltage_measurements (
    id BIGSERIAL PRIMARY KEY,
    voltage DOUBLE PRECISION NOT NULL,
    at TIMESTAMPTZ NOT NULL,
    message_id BIGINT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE INDEX IF NOT EXISTS voltage_measurements_at_idx ON voltage_measurements (at);

CREATE TABLE IF NOT EXISTS schedule (
    id BIGSERIAL PRIMARY KEY,
    schedule_data JSONB NOT NULL,
    last_updated TEXT NOT NULL,
    update_message TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
"#;

pub struct Storage {
    pool: Pool,
}

impl Storage {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let mut cfg = deadpool_postgres::Config::new();
        cfg.url = Some(database_url.to_string());
        let pool = cfg.create_pool(Some(Runtime::Tokio1), NoTls)?;
        let storage = Self { pool };
        storage.init_tables().await?;
        Ok(storage)
    }

    async fn init_tables(&self) -> Result<()> {
        let client = self.pool.get().await?;
        client.batch_execute(SCHEMA).await?;
        info!("[STORAGE] Tabelas verificadas");
        Ok(())
    }
}

#[async_trait]
impl StateStore for Storage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt("SELECT value FROM system_state WHERE key = $1", &[&key])
            .await?;
        Ok(row.map(|r| r.get("value")))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let client = self.pool.get().await?;
        client
            .execute(
                r#"
                INSERT INTO system_state (key, value) VALUES ($1, $2)
                ON CONFLICT (key) DO UPDATE SET value = excluded.value
                "#,
                &[&key, &value],
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl EventLog for Storage {
    async fn append(&self, kind: EventKind, at: DateTime<Utc>) -> Result<()> {
        let client = self.pool.get().await?;
        client
            .execute(
                "INSERT INTO power_events (kind, at) VALUES ($1, $2)",
                &[&kind, &at],
            )
            .await?;
        info!("[STORAGE] Evento {:?} registrado em {}", kind, at);
        Ok(())
    }
}

#[async_trait]
impl VoltageLog for Storage {
    async fn append_voltage(
        &self,
        voltage: f64,
        message: Option<MessageRef>,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let client = self.pool.get().await?;
        let message_id: Option<i64> = message.map(|m| m.0);
        client
            .execute(
                "INSERT INTO voltage_measurements (voltage, at, message_id) VALUES ($1, $2, $3)",
                &[&voltage, &at, &message_id],
            )
            .await?;
        Ok(())
    }

    async fn voltage_stats(&self, since: DateTime<Utc>) -> Result<Option<VoltageStats>> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                r#"
                SELECT MIN(voltage) AS min_v, MAX(voltage) AS max_v, AVG(voltage) AS avg_v
                FROM voltage_measurements
                WHERE at >= $1
                "#,
                &[&since],
            )
            .await?;
        let min: Option<f64> = row.get("min_v");
        let max: Option<f64> = row.get("max_v");
        let avg: Option<f64> = row.get("avg_v");
        Ok(match (min, max, avg) {
            (Some(min), Some(max), Some(avg)) => Some(VoltageStats { min, max, avg }),
            _ => None,
        })
    }
}

#[async_trait]
impl ScheduleHistory for Storage {
    async fn append_schedule(&self, record: &ScheduleRecord) -> Result<()> {
        let client = self.pool.get().await?;
        client
            .execute(
                "INSERT INTO schedule (schedule_data, last_updated, update_message) VALUES ($1, $2, $3)",
                &[&record.data.0, &record.last_updated, &record.update_message],
            )
            .await?;
        info!("[STORAGE] Cronograma salvo, last_updated={}", record.last_updated);
        Ok(())
    }

    async fn latest_schedule(&self) -> Result<Option<ScheduleRecord>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                SELECT schedule_data, last_updated, update_message
                FROM schedule ORDER BY id DESC LIMIT 1
                "#,
                &[],
            )
            .await?;
        Ok(row.map(|r| ScheduleRecord {
            data: SchedulePayload(r.get::<_, Value>("schedule_data")),
            last_updated: r.get("last_updated"),
            update_message: r.get("update_message"),
        }))
    }
}
