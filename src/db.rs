use crate::config::{ConfigSection, EngineConfig};
use crate::model::{CatalogEntry, Dataset, Student};
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use std::path::Path;
use uuid::Uuid;

const SESSION_KEY: &str = "dataset.session";
const RECENT_KEY: &str = "dataset.recent";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join("transcripts.sqlite3");
    let conn = Connection::open(db_path)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            payload_json TEXT NOT NULL,
            updated_at TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_name ON students(name)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS catalog(
            code TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            credits REAL NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS audit_log(
            id TEXT PRIMARY KEY,
            at TEXT NOT NULL,
            action TEXT NOT NULL,
            details_json TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_audit_log_at ON audit_log(at)",
        [],
    )?;

    Ok(conn)
}

pub fn settings_get_json(conn: &Connection, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?",
            [key],
            |r| r.get(0),
        )
        .optional()?;
    match raw {
        Some(text) => Ok(Some(serde_json::from_str(&text)?)),
        None => Ok(None),
    }
}

pub fn settings_set_json(conn: &Connection, key: &str, value: &serde_json::Value) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, serde_json::to_string(value)?),
    )?;
    Ok(())
}

/// Defaults overlaid with whatever sections the workspace saved. A saved
/// section that no longer validates is ignored.
pub fn load_config(conn: &Connection) -> anyhow::Result<EngineConfig> {
    let mut config = EngineConfig::default();
    for section in ConfigSection::ALL {
        if let Some(saved) = settings_get_json(conn, section.key())? {
            if let Err(e) = config.apply_section(section, &saved) {
                tracing::warn!(key = section.key(), error = %e, "ignoring saved config section");
            }
        }
    }
    Ok(config)
}

pub fn load_dataset(conn: &Connection) -> anyhow::Result<Dataset> {
    let mut dataset = Dataset::default();

    if let Some(v) = settings_get_json(conn, SESSION_KEY)? {
        dataset.session = v.as_str().unwrap_or_default().to_string();
    }
    if let Some(v) = settings_get_json(conn, RECENT_KEY)? {
        dataset.recent = serde_json::from_value(v)?;
    }

    let mut stmt = conn.prepare("SELECT payload_json FROM students ORDER BY id")?;
    let payloads = stmt
        .query_map([], |r| r.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    for payload in payloads {
        let student: Student = serde_json::from_str(&payload)?;
        dataset.students.insert(student.id.clone(), student);
    }

    let mut stmt = conn.prepare("SELECT code, title, credits FROM catalog ORDER BY code")?;
    let entries = stmt
        .query_map([], |r| {
            Ok(CatalogEntry {
                code: r.get(0)?,
                title: r.get(1)?,
                credits: r.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    for entry in entries {
        dataset.catalog.insert(entry.code.clone(), entry);
    }

    Ok(dataset)
}

/// Writes the whole dataset in one transaction.
pub fn save_dataset(conn: &Connection, dataset: &Dataset) -> anyhow::Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    let tx = conn.unchecked_transaction()?;

    tx.execute("DELETE FROM students", [])?;
    {
        let mut insert = tx.prepare(
            "INSERT INTO students(id, name, payload_json, updated_at) VALUES(?, ?, ?, ?)",
        )?;
        for student in dataset.students.values() {
            let payload = serde_json::to_string(student)?;
            insert.execute((&student.id, &student.name, payload, &now))?;
        }
    }

    tx.execute("DELETE FROM catalog", [])?;
    {
        let mut insert = tx.prepare("INSERT INTO catalog(code, title, credits) VALUES(?, ?, ?)")?;
        for entry in dataset.catalog.values() {
            insert.execute((&entry.code, &entry.title, entry.credits))?;
        }
    }

    settings_set_json(&tx, SESSION_KEY, &serde_json::json!(dataset.session))?;
    settings_set_json(&tx, RECENT_KEY, &serde_json::to_value(&dataset.recent)?)?;

    tx.commit()?;
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: String,
    pub at: String,
    pub action: String,
    pub details: serde_json::Value,
}

pub fn audit_append(conn: &Connection, action: &str, details: &serde_json::Value) -> anyhow::Result<String> {
    let id = Uuid::new_v4().to_string();
    let at = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true);
    conn.execute(
        "INSERT INTO audit_log(id, at, action, details_json) VALUES(?, ?, ?, ?)",
        (&id, &at, action, serde_json::to_string(details)?),
    )?;
    Ok(id)
}

pub fn audit_list(conn: &Connection, limit: usize) -> anyhow::Result<Vec<AuditEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, at, action, details_json
         FROM audit_log
         ORDER BY at DESC, rowid DESC
         LIMIT ?",
    )?;
    let rows = stmt
        .query_map([limit as i64], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter()
        .map(|(id, at, action, details)| {
            Ok(AuditEntry {
                id,
                at,
                action,
                details: serde_json::from_str(&details)?,
            })
        })
        .collect()
}
