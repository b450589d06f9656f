//! SQLite session journal.
//!
//! RULE: Only store.rs talks to the database.
//! The engine calls store methods; it never executes SQL directly.

use rusqlite::{Connection, OptionalExtension, params};
use crate::{
    error::GameResult,
    event::EventLogEntry,
    report::SessionReport,
    types::Tick,
};

pub struct SessionStore {
    conn: Connection,
}

impl SessionStore {
    /// Open (or create) the journal database at `path`.
    pub fn open(path: &str) -> GameResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode: better concurrent read performance.
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> GameResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> GameResult<()> {
        self.conn.execute_batch(include_str!("../migrations/001_foundation.sql"))?;
        Ok(())
    }

    // ── Session ────────────────────────────────────────────────

    pub fn insert_session(
        &self,
        session_id: &str,
        seed:       u64,
        version:    &str,
        company:    &str,
    ) -> GameResult<()> {
        self.conn.execute(
            "INSERT INTO session (session_id, seed, version, company, started_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                session_id,
                seed as i64,
                version,
                company,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn session_seed(&self, session_id: &str) -> GameResult<Option<u64>> {
        let seed = self.conn.query_row(
            "SELECT seed FROM session WHERE session_id = ?1",
            params![session_id],
            |row| row.get::<_, i64>(0),
        ).optional()?;
        Ok(seed.map(|s| s as u64))
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, entry: &EventLogEntry) -> GameResult<()> {
        self.conn.execute(
            "INSERT INTO event_log (session_id, tick, elapsed_ms, event_type, payload)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.session_id,
                entry.tick as i64,
                entry.elapsed_ms as i64,
                entry.event_type,
                entry.payload,
            ],
        )?;
        Ok(())
    }

    pub fn events_for_tick(&self, session_id: &str, tick: Tick) -> GameResult<Vec<EventLogEntry>> {
        self.query_events(
            "SELECT id, session_id, tick, elapsed_ms, event_type, payload
             FROM event_log WHERE session_id = ?1 AND tick = ?2
             ORDER BY id ASC",
            params![session_id, tick as i64],
        )
    }

    pub fn events_for_session(&self, session_id: &str) -> GameResult<Vec<EventLogEntry>> {
        self.query_events(
            "SELECT id, session_id, tick, elapsed_ms, event_type, payload
             FROM event_log WHERE session_id = ?1
             ORDER BY id ASC",
            params![session_id],
        )
    }

    pub fn event_count(&self, session_id: &str, event_type: &str) -> GameResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM event_log WHERE session_id = ?1 AND event_type = ?2",
            params![session_id, event_type],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn query_events(
        &self,
        sql:    &str,
        params: impl rusqlite::Params,
    ) -> GameResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(sql)?;
        let entries = stmt.query_map(params, |row| {
            Ok(EventLogEntry {
                id:         Some(row.get(0)?),
                session_id: row.get(1)?,
                tick:       row.get::<_, i64>(2)? as u64,
                elapsed_ms: row.get::<_, i64>(3)? as u64,
                event_type: row.get(4)?,
                payload:    row.get(5)?,
            })
        })?.collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    // ── Snapshot ───────────────────────────────────────────────

    pub fn save_snapshot(&self, session_id: &str, tick: Tick, state_json: &str) -> GameResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO snapshot (session_id, tick, state_json) VALUES (?1, ?2, ?3)",
            params![session_id, tick as i64, state_json],
        )?;
        Ok(())
    }

    pub fn latest_snapshot(&self, session_id: &str) -> GameResult<Option<(Tick, String)>> {
        let result = self.conn.query_row(
            "SELECT tick, state_json FROM snapshot
             WHERE session_id = ?1
             ORDER BY tick DESC LIMIT 1",
            params![session_id],
            |row| Ok((row.get::<_, i64>(0)? as u64, row.get::<_, String>(1)?)),
        ).optional()?;
        Ok(result)
    }

    // ── Report ─────────────────────────────────────────────────

    pub fn save_report(&self, report: &SessionReport) -> GameResult<()> {
        let outcome = match report.outcome.defeat_reason() {
            Some(reason) => reason.legacy_code(),
            None => "victory",
        };
        self.conn.execute(
            "INSERT INTO session_report (session_id, outcome, report_json) VALUES (?1, ?2, ?3)",
            params![report.session_id, outcome, serde_json::to_string(report)?],
        )?;
        Ok(())
    }

    pub fn load_report(&self, session_id: &str) -> GameResult<Option<SessionReport>> {
        let json: Option<String> = self.conn.query_row(
            "SELECT report_json FROM session_report WHERE session_id = ?1",
            params![session_id],
            |row| row.get(0),
        ).optional()?;
        json.map(|j| serde_json::from_str(&j)).transpose().map_err(Into::into)
    }
}
