//! SQL schema for the Roster SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS` / `OR IGNORE`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS members (
    member_id       TEXT PRIMARY KEY,
    external_id     TEXT NOT NULL UNIQUE,
    first_name      TEXT NOT NULL,
    last_name       TEXT NOT NULL,
    membership_type TEXT NOT NULL,   -- 'regular' | 'associate'
    contact         TEXT,
    search_first    TEXT NOT NULL,   -- accent-folded first_name
    search_last     TEXT NOT NULL    -- accent-folded last_name
);

CREATE TABLE IF NOT EXISTS actors (
    actor_id TEXT PRIMARY KEY,
    name     TEXT NOT NULL
);

-- One row per check-in. Checkout columns stay NULL while the session is open
-- and are written exactly once.
--
-- queue_number is unique across the whole table: numbers are never reused
-- within an event, and the table is purged between events.
CREATE TABLE IF NOT EXISTS attendance (
    session_id            TEXT PRIMARY KEY,
    member_id             TEXT NOT NULL REFERENCES members(member_id),
    queue_number          INTEGER NOT NULL UNIQUE CHECK (queue_number > 0),
    checkin_at            TEXT NOT NULL,   -- RFC 3339 UTC, fixed width
    checkin_by            TEXT NOT NULL REFERENCES actors(actor_id),
    checkout_at           TEXT,
    checkout_by           TEXT REFERENCES actors(actor_id),
    status                TEXT,            -- 'correct' | 'mismatch' | 'lost'
    checkout_number_given INTEGER,
    claimed_by            TEXT,
    stub_collected        INTEGER,
    CHECK ((checkout_at IS NULL) = (status IS NULL))
);

-- At most one open session per member.
CREATE UNIQUE INDEX IF NOT EXISTS attendance_open_member_idx
    ON attendance(member_id) WHERE checkout_at IS NULL;
CREATE INDEX IF NOT EXISTS attendance_given_idx   ON attendance(checkout_number_given);
CREATE INDEX IF NOT EXISTS attendance_checkin_idx ON attendance(checkin_at);

-- Single-row event gate. Both phases start closed.
CREATE TABLE IF NOT EXISTS event_config (
    id               INTEGER PRIMARY KEY CHECK (id = 1),
    title            TEXT NOT NULL DEFAULT 'Event',
    checkin_enabled  INTEGER NOT NULL DEFAULT 0,
    checkout_enabled INTEGER NOT NULL DEFAULT 0
);
INSERT OR IGNORE INTO event_config (id) VALUES (1);

PRAGMA user_version = 1;
";
