// src/store/sqlite.rs
//! SQLite backend. Every replace runs delete + insert inside one transaction
//! while the connection mutex is held.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{CatalogStore, StoreError};
use crate::model::{ConfigUpdate, Configuration, Event, LocalizedText, Location, Source, Summary};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS admin_config (
    id             TEXT PRIMARY KEY,
    version        INTEGER NOT NULL,
    city           TEXT NOT NULL,
    categories     TEXT NOT NULL,
    start_date     TEXT NOT NULL,
    end_date       TEXT NOT NULL,
    openai_api_key TEXT NOT NULL,
    events_prompt  TEXT NOT NULL,
    summary_prompt TEXT NOT NULL,
    updated_at     TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS events (
    seq               INTEGER PRIMARY KEY,
    id                TEXT NOT NULL UNIQUE,
    title             TEXT NOT NULL,
    date              TEXT NOT NULL,
    location_name     TEXT,
    location_address  TEXT,
    location_district TEXT,
    description       TEXT NOT NULL,
    image_url         TEXT NOT NULL,
    source_url        TEXT,
    source_main_url   TEXT,
    source_provider   TEXT,
    created_at        TEXT
);
CREATE INDEX IF NOT EXISTS events_by_date ON events (date);
CREATE TABLE IF NOT EXISTS summaries (
    id          TEXT PRIMARY KEY,
    summary_en  TEXT NOT NULL,
    summary_es  TEXT,
    start_date  TEXT NOT NULL,
    end_date    TEXT NOT NULL,
    event_types TEXT NOT NULL,
    created_at  TEXT
);
"#;

const EVENT_COLUMNS: &str = "id, title, date, location_name, location_address, location_district, \
     description, image_url, source_url, source_main_url, source_provider, created_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut g = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        f(&mut g)
    }
}

fn json_column<T: serde::de::DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn config_from_row(row: &Row<'_>) -> rusqlite::Result<Configuration> {
    Ok(Configuration {
        id: row.get(0)?,
        version: row.get::<_, i64>(1)?.max(0) as u64,
        city: row.get(2)?,
        categories: json_column(row, 3)?,
        start_date: row.get(4)?,
        end_date: row.get(5)?,
        openai_api_key: row.get(6)?,
        events_prompt: row.get(7)?,
        summary_prompt: row.get(8)?,
        updated_at: row.get::<_, DateTime<Utc>>(9)?,
    })
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<Event> {
    Ok(Event {
        id: row.get(0)?,
        title: row.get(1)?,
        date: row.get(2)?,
        location: Location {
            name: row.get(3)?,
            address: row.get(4)?,
            district: row.get(5)?,
        },
        description: row.get(6)?,
        image_url: row.get(7)?,
        source: Source {
            url: row.get(8)?,
            main_url: row.get(9)?,
            provider: row.get(10)?,
        },
        created_at: row.get(11)?,
    })
}

fn summary_from_row(row: &Row<'_>) -> rusqlite::Result<Summary> {
    Ok(Summary {
        id: row.get(0)?,
        summary: LocalizedText {
            en: row.get(1)?,
            es: row.get(2)?,
        },
        start_date: row.get(3)?,
        end_date: row.get(4)?,
        event_types: json_column(row, 5)?,
        created_at: row.get(6)?,
    })
}

fn select_config(conn: &Connection) -> rusqlite::Result<Option<Configuration>> {
    conn.query_row(
        "SELECT id, version, city, categories, start_date, end_date, openai_api_key, \
         events_prompt, summary_prompt, updated_at FROM admin_config LIMIT 1",
        [],
        config_from_row,
    )
    .optional()
}

fn insert_config(conn: &Connection, cfg: &Configuration) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO admin_config (id, version, city, categories, start_date, end_date, \
         openai_api_key, events_prompt, summary_prompt, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            cfg.id,
            cfg.version as i64,
            cfg.city,
            serde_json::to_string(&cfg.categories)?,
            cfg.start_date,
            cfg.end_date,
            cfg.openai_api_key,
            cfg.events_prompt,
            cfg.summary_prompt,
            cfg.updated_at,
        ],
    )?;
    Ok(())
}

impl CatalogStore for SqliteStore {
    fn load_config(&self) -> Result<Option<Configuration>, StoreError> {
        self.with_conn(|conn| Ok(select_config(conn)?))
    }

    fn put_config(&self, update: ConfigUpdate) -> Result<Configuration, StoreError> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let previous = select_config(&tx)?;
            let next = Configuration::from_update(update, previous.as_ref());
            tx.execute("DELETE FROM admin_config", [])?;
            insert_config(&tx, &next)?;
            tx.commit()?;
            Ok(next)
        })
    }

    fn seed_config(&self, update: ConfigUpdate) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            if select_config(&tx)?.is_some() {
                return Ok(false);
            }
            insert_config(&tx, &Configuration::from_update(update, None))?;
            tx.commit()?;
            Ok(true)
        })
    }

    fn replace_events(&self, events: Vec<Event>) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM events", [])?;
            {
                let mut stmt = tx.prepare(&format!(
                    "INSERT INTO events (seq, {EVENT_COLUMNS}) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
                ))?;
                for (seq, ev) in events.iter().enumerate() {
                    stmt.execute(params![
                        seq as i64,
                        ev.id,
                        ev.title,
                        ev.date,
                        ev.location.name,
                        ev.location.address,
                        ev.location.district,
                        ev.description,
                        ev.image_url,
                        ev.source.url,
                        ev.source.main_url,
                        ev.source.provider,
                        ev.created_at,
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
    }

    fn list_events(&self) -> Result<Vec<Event>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("SELECT {EVENT_COLUMNS} FROM events ORDER BY seq"))?;
            let rows = stmt.query_map([], event_from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    fn event_by_id(&self, id: &str) -> Result<Option<Event>, StoreError> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    &format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1"),
                    params![id],
                    event_from_row,
                )
                .optional()?)
        })
    }

    fn events_on(&self, date: &str) -> Result<Vec<Event>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {EVENT_COLUMNS} FROM events WHERE date = ?1 ORDER BY seq"
            ))?;
            let rows = stmt.query_map(params![date], event_from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    fn replace_summary(&self, summary: Summary) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM summaries", [])?;
            tx.execute(
                "INSERT INTO summaries (id, summary_en, summary_es, start_date, end_date, \
                 event_types, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    summary.id,
                    summary.summary.en,
                    summary.summary.es,
                    summary.start_date,
                    summary.end_date,
                    serde_json::to_string(&summary.event_types)?,
                    summary.created_at,
                ],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    fn summaries(&self) -> Result<Vec<Summary>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, summary_en, summary_es, start_date, end_date, event_types, created_at \
                 FROM summaries ORDER BY created_at DESC",
            )?;
            let rows = stmt.query_map([], summary_from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }
}
