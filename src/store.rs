use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use crate::assign::sort_states;
use crate::error::{OccupancyError, Result};
use crate::status::{BookingRecord, BookingState, SlotState, SlotStatus, TimestampMs};
use crate::{open_db_connection, shared_memory_uri};

/// Result of a single status write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpsertOutcome {
    Applied,
    /// Incoming timestamp is older than the stored one.
    Stale,
    /// The row is booked; only a release may change it.
    BookingPreserved,
    /// Bookings go through `book`, never through a plain write.
    Rejected,
}

/// Last known status per (area, slot), plus the booking audit trail.
///
/// Implementations serialize writes per area. `book` and `release` change the
/// slot row and the booking records together or not at all.
pub trait StatusStore: Send + Sync {
    fn upsert(
        &self,
        area: &str,
        slot_id: &str,
        status: SlotStatus,
        ts: TimestampMs,
    ) -> Result<UpsertOutcome>;

    fn get(&self, area: &str, slot_id: &str) -> Result<Option<SlotState>>;

    /// Every known slot of `area`, in ascending numeric id order.
    fn list(&self, area: &str) -> Result<Vec<SlotState>>;

    /// Merge a whole scan in one transaction and return the resulting states.
    ///
    /// Booked rows are left alone; stale writes are skipped.
    fn apply_scan(
        &self,
        area: &str,
        observed: &[(String, SlotStatus)],
        ts: TimestampMs,
    ) -> Result<Vec<SlotState>>;

    /// Mark an available slot booked and append the booking record.
    fn book(
        &self,
        user_id: &str,
        area: &str,
        slot_id: &str,
        ts: TimestampMs,
    ) -> Result<BookingRecord>;

    /// Free a booked slot. Returns whether an active booking was released.
    fn release(&self, area: &str, slot_id: &str, ts: TimestampMs) -> Result<bool>;

    /// Booking records of `area` in creation order.
    fn bookings(&self, area: &str) -> Result<Vec<BookingRecord>>;
}

/// Shared write rule for both stores.
fn merge(current: Option<&SlotState>, incoming: SlotStatus, ts: TimestampMs) -> UpsertOutcome {
    match current {
        None if incoming == SlotStatus::Booked => UpsertOutcome::Rejected,
        None => UpsertOutcome::Applied,
        Some(cur) if ts < cur.updated_at_ms => UpsertOutcome::Stale,
        Some(cur) if cur.status == SlotStatus::Booked && incoming != SlotStatus::Booked => {
            UpsertOutcome::BookingPreserved
        }
        Some(cur) if cur.status != SlotStatus::Booked && incoming == SlotStatus::Booked => {
            UpsertOutcome::Rejected
        }
        Some(_) => UpsertOutcome::Applied,
    }
}

fn check_bookable(area: &str, slot_id: &str, current: Option<&SlotState>) -> Result<TimestampMs> {
    match current {
        Some(state) if state.status == SlotStatus::Available => Ok(state.updated_at_ms),
        Some(state) => Err(OccupancyError::SlotUnavailable {
            area: area.to_string(),
            slot_id: slot_id.to_string(),
            status: state.status.to_string(),
        }),
        None => Err(OccupancyError::SlotUnavailable {
            area: area.to_string(),
            slot_id: slot_id.to_string(),
            status: "unscanned".to_string(),
        }),
    }
}

// -------------------- SQLite --------------------

/// SQLite-backed store. One connection serves every area, so writes to
/// different areas queue behind each other for one short transaction.
pub struct SqliteStatusStore {
    conn: Mutex<Connection>,
}

impl SqliteStatusStore {
    /// Open (or create) the database. `:memory:` opens a private shared-cache
    /// in-memory database.
    pub fn open(db_path: &str) -> Result<Self> {
        let db_path = if db_path == ":memory:" {
            shared_memory_uri()
        } else {
            db_path.to_string()
        };
        let conn = open_db_connection(&db_path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    fn ensure_schema(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;

            CREATE TABLE IF NOT EXISTS slots (
              area TEXT NOT NULL,
              slot_id TEXT NOT NULL,
              status TEXT NOT NULL,
              updated_at INTEGER NOT NULL,
              PRIMARY KEY (area, slot_id)
            );

            CREATE TABLE IF NOT EXISTS bookings (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              user_id TEXT NOT NULL,
              area TEXT NOT NULL,
              slot_id TEXT NOT NULL,
              status TEXT NOT NULL,
              created_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_bookings_slot ON bookings(area, slot_id, status);
            "#,
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| OccupancyError::LockPoisoned)
    }
}

fn sql_get(conn: &Connection, area: &str, slot_id: &str) -> Result<Option<SlotState>> {
    let row: Option<(String, String, i64)> = conn
        .query_row(
            "SELECT slot_id, status, updated_at FROM slots WHERE area = ?1 AND slot_id = ?2",
            params![area, slot_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;
    row.map(|(slot_id, status, updated_at_ms)| {
        Ok(SlotState {
            slot_id,
            status: status.parse()?,
            updated_at_ms,
        })
    })
    .transpose()
}

fn sql_list(conn: &Connection, area: &str) -> Result<Vec<SlotState>> {
    let rows = {
        let mut stmt =
            conn.prepare("SELECT slot_id, status, updated_at FROM slots WHERE area = ?1")?;
        let mut rows = stmt.query(params![area])?;
        let mut out: Vec<(String, String, i64)> = Vec::new();
        while let Some(row) = rows.next()? {
            out.push((row.get(0)?, row.get(1)?, row.get(2)?));
        }
        out
    };
    let mut states = rows
        .into_iter()
        .map(|(slot_id, status, updated_at_ms)| {
            Ok(SlotState {
                slot_id,
                status: status.parse()?,
                updated_at_ms,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    sort_states(&mut states);
    Ok(states)
}

fn sql_write(
    conn: &Connection,
    area: &str,
    slot_id: &str,
    status: SlotStatus,
    ts: TimestampMs,
) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO slots(area, slot_id, status, updated_at) VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(area, slot_id) DO UPDATE SET
          status = excluded.status,
          updated_at = excluded.updated_at
        "#,
        params![area, slot_id, status.as_str(), ts],
    )?;
    Ok(())
}

fn sql_bookings(conn: &Connection, area: &str) -> Result<Vec<BookingRecord>> {
    let rows = {
        let mut stmt = conn.prepare(
            "SELECT id, user_id, area, slot_id, status, created_at FROM bookings WHERE area = ?1 ORDER BY id ASC",
        )?;
        let mut rows = stmt.query(params![area])?;
        let mut out: Vec<(i64, String, String, String, String, i64)> = Vec::new();
        while let Some(row) = rows.next()? {
            out.push((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
            ));
        }
        out
    };
    rows.into_iter()
        .map(|(id, user_id, area, slot_id, state, created_at_ms)| {
            Ok(BookingRecord {
                id,
                user_id,
                area,
                slot_id,
                state: state.parse()?,
                created_at_ms,
            })
        })
        .collect()
}

impl StatusStore for SqliteStatusStore {
    fn upsert(
        &self,
        area: &str,
        slot_id: &str,
        status: SlotStatus,
        ts: TimestampMs,
    ) -> Result<UpsertOutcome> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let current = sql_get(&tx, area, slot_id)?;
        let outcome = merge(current.as_ref(), status, ts);
        if outcome == UpsertOutcome::Applied {
            sql_write(&tx, area, slot_id, status, ts)?;
        }
        tx.commit()?;
        Ok(outcome)
    }

    fn get(&self, area: &str, slot_id: &str) -> Result<Option<SlotState>> {
        let conn = self.lock()?;
        sql_get(&conn, area, slot_id)
    }

    fn list(&self, area: &str) -> Result<Vec<SlotState>> {
        let conn = self.lock()?;
        sql_list(&conn, area)
    }

    fn apply_scan(
        &self,
        area: &str,
        observed: &[(String, SlotStatus)],
        ts: TimestampMs,
    ) -> Result<Vec<SlotState>> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        for (slot_id, status) in observed {
            let current = sql_get(&tx, area, slot_id)?;
            match merge(current.as_ref(), *status, ts) {
                UpsertOutcome::Applied => sql_write(&tx, area, slot_id, *status, ts)?,
                outcome => log::debug!("scan write to {}/{} skipped: {:?}", area, slot_id, outcome),
            }
        }
        let states = sql_list(&tx, area)?;
        tx.commit()?;
        Ok(states)
    }

    fn book(
        &self,
        user_id: &str,
        area: &str,
        slot_id: &str,
        ts: TimestampMs,
    ) -> Result<BookingRecord> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let current = sql_get(&tx, area, slot_id)?;
        let stored_ts = check_bookable(area, slot_id, current.as_ref())?;
        let ts = ts.max(stored_ts);
        sql_write(&tx, area, slot_id, SlotStatus::Booked, ts)?;
        tx.execute(
            r#"
            INSERT INTO bookings(user_id, area, slot_id, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![user_id, area, slot_id, BookingState::Booked.as_str(), ts],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(BookingRecord {
            id,
            user_id: user_id.to_string(),
            area: area.to_string(),
            slot_id: slot_id.to_string(),
            state: BookingState::Booked,
            created_at_ms: ts,
        })
    }

    fn release(&self, area: &str, slot_id: &str, ts: TimestampMs) -> Result<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if let Some(current) = sql_get(&tx, area, slot_id)? {
            if current.status == SlotStatus::Booked {
                let ts = ts.max(current.updated_at_ms);
                sql_write(&tx, area, slot_id, SlotStatus::Available, ts)?;
            }
        }
        let released = tx.execute(
            "UPDATE bookings SET status = ?1 WHERE area = ?2 AND slot_id = ?3 AND status = ?4",
            params![
                BookingState::Released.as_str(),
                area,
                slot_id,
                BookingState::Booked.as_str()
            ],
        )?;
        tx.commit()?;
        Ok(released > 0)
    }

    fn bookings(&self, area: &str) -> Result<Vec<BookingRecord>> {
        let conn = self.lock()?;
        sql_bookings(&conn, area)
    }
}

// -------------------- In-memory --------------------

#[derive(Debug, Default)]
struct AreaTable {
    slots: HashMap<String, SlotState>,
    bookings: Vec<BookingRecord>,
}

impl AreaTable {
    fn write(&mut self, slot_id: &str, status: SlotStatus, ts: TimestampMs) {
        self.slots.insert(
            slot_id.to_string(),
            SlotState {
                slot_id: slot_id.to_string(),
                status,
                updated_at_ms: ts,
            },
        );
    }

    fn sorted(&self) -> Vec<SlotState> {
        let mut states: Vec<SlotState> = self.slots.values().cloned().collect();
        sort_states(&mut states);
        states
    }
}

/// Store kept entirely in process memory. Each area has its own lock, so
/// scans of different areas never wait on each other.
#[derive(Debug)]
pub struct InMemoryStatusStore {
    areas: RwLock<HashMap<String, Arc<Mutex<AreaTable>>>>,
    next_booking_id: AtomicI64,
}

impl Default for InMemoryStatusStore {
    fn default() -> Self {
        Self {
            areas: RwLock::new(HashMap::new()),
            next_booking_id: AtomicI64::new(1),
        }
    }
}

impl InMemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn existing(&self, area: &str) -> Result<Option<Arc<Mutex<AreaTable>>>> {
        let areas = self.areas.read().map_err(|_| OccupancyError::LockPoisoned)?;
        Ok(areas.get(area).cloned())
    }

    fn table(&self, area: &str) -> Result<Arc<Mutex<AreaTable>>> {
        if let Some(table) = self.existing(area)? {
            return Ok(table);
        }
        let mut areas = self.areas.write().map_err(|_| OccupancyError::LockPoisoned)?;
        Ok(areas.entry(area.to_string()).or_default().clone())
    }
}

impl StatusStore for InMemoryStatusStore {
    fn upsert(
        &self,
        area: &str,
        slot_id: &str,
        status: SlotStatus,
        ts: TimestampMs,
    ) -> Result<UpsertOutcome> {
        let table = self.table(area)?;
        let mut table = table.lock().map_err(|_| OccupancyError::LockPoisoned)?;
        let outcome = merge(table.slots.get(slot_id), status, ts);
        if outcome == UpsertOutcome::Applied {
            table.write(slot_id, status, ts);
        }
        Ok(outcome)
    }

    fn get(&self, area: &str, slot_id: &str) -> Result<Option<SlotState>> {
        let Some(table) = self.existing(area)? else {
            return Ok(None);
        };
        let table = table.lock().map_err(|_| OccupancyError::LockPoisoned)?;
        Ok(table.slots.get(slot_id).cloned())
    }

    fn list(&self, area: &str) -> Result<Vec<SlotState>> {
        let Some(table) = self.existing(area)? else {
            return Ok(Vec::new());
        };
        let table = table.lock().map_err(|_| OccupancyError::LockPoisoned)?;
        Ok(table.sorted())
    }

    fn apply_scan(
        &self,
        area: &str,
        observed: &[(String, SlotStatus)],
        ts: TimestampMs,
    ) -> Result<Vec<SlotState>> {
        let table = self.table(area)?;
        let mut table = table.lock().map_err(|_| OccupancyError::LockPoisoned)?;
        for (slot_id, status) in observed {
            match merge(table.slots.get(slot_id), *status, ts) {
                UpsertOutcome::Applied => table.write(slot_id, *status, ts),
                outcome => log::debug!("scan write to {}/{} skipped: {:?}", area, slot_id, outcome),
            }
        }
        Ok(table.sorted())
    }

    fn book(
        &self,
        user_id: &str,
        area: &str,
        slot_id: &str,
        ts: TimestampMs,
    ) -> Result<BookingRecord> {
        let table = self.table(area)?;
        let mut table = table.lock().map_err(|_| OccupancyError::LockPoisoned)?;
        let stored_ts = check_bookable(area, slot_id, table.slots.get(slot_id))?;
        let ts = ts.max(stored_ts);
        table.write(slot_id, SlotStatus::Booked, ts);
        let record = BookingRecord {
            id: self.next_booking_id.fetch_add(1, Ordering::SeqCst),
            user_id: user_id.to_string(),
            area: area.to_string(),
            slot_id: slot_id.to_string(),
            state: BookingState::Booked,
            created_at_ms: ts,
        };
        table.bookings.push(record.clone());
        Ok(record)
    }

    fn release(&self, area: &str, slot_id: &str, ts: TimestampMs) -> Result<bool> {
        let Some(table) = self.existing(area)? else {
            return Ok(false);
        };
        let mut table = table.lock().map_err(|_| OccupancyError::LockPoisoned)?;
        let booked_since = table
            .slots
            .get(slot_id)
            .filter(|s| s.status == SlotStatus::Booked)
            .map(|s| s.updated_at_ms);
        if let Some(since) = booked_since {
            table.write(slot_id, SlotStatus::Available, ts.max(since));
        }
        let mut released = false;
        for record in table
            .bookings
            .iter_mut()
            .filter(|r| r.slot_id == slot_id && r.state == BookingState::Booked)
        {
            record.state = BookingState::Released;
            released = true;
        }
        Ok(released)
    }

    fn bookings(&self, area: &str) -> Result<Vec<BookingRecord>> {
        let Some(table) = self.existing(area)? else {
            return Ok(Vec::new());
        };
        let table = table.lock().map_err(|_| OccupancyError::LockPoisoned)?;
        Ok(table.bookings.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stores() -> Vec<(&'static str, Box<dyn StatusStore>)> {
        vec![
            ("memory", Box::new(InMemoryStatusStore::new())),
            ("sqlite", Box::new(SqliteStatusStore::open(":memory:").unwrap())),
        ]
    }

    fn observed(pairs: &[(&str, SlotStatus)]) -> Vec<(String, SlotStatus)> {
        pairs.iter().map(|(id, s)| (id.to_string(), *s)).collect()
    }

    #[test]
    fn last_writer_wins_by_timestamp() {
        for (name, store) in stores() {
            assert_eq!(
                store.upsert("A", "1", SlotStatus::Occupied, 20).unwrap(),
                UpsertOutcome::Applied,
                "{}",
                name
            );
            assert_eq!(
                store.upsert("A", "1", SlotStatus::Available, 10).unwrap(),
                UpsertOutcome::Stale,
                "{}",
                name
            );
            let state = store.get("A", "1").unwrap().unwrap();
            assert_eq!(state.status, SlotStatus::Occupied, "{}", name);
            assert_eq!(state.updated_at_ms, 20, "{}", name);

            assert_eq!(
                store.upsert("A", "1", SlotStatus::Available, 20).unwrap(),
                UpsertOutcome::Applied,
                "{}",
                name
            );
        }
    }

    #[test]
    fn plain_writes_cannot_book_or_unbook() {
        for (name, store) in stores() {
            assert_eq!(
                store.upsert("A", "1", SlotStatus::Booked, 1).unwrap(),
                UpsertOutcome::Rejected,
                "{}",
                name
            );
            store.upsert("A", "1", SlotStatus::Available, 1).unwrap();
            store.book("u1", "A", "1", 2).unwrap();
            assert_eq!(
                store.upsert("A", "1", SlotStatus::Available, 3).unwrap(),
                UpsertOutcome::BookingPreserved,
                "{}",
                name
            );
            assert_eq!(
                store.get("A", "1").unwrap().unwrap().status,
                SlotStatus::Booked,
                "{}",
                name
            );
        }
    }

    #[test]
    fn list_is_numeric_and_areas_are_separate() {
        for (name, store) in stores() {
            store
                .apply_scan(
                    "A",
                    &observed(&[
                        ("10", SlotStatus::Available),
                        ("2", SlotStatus::Occupied),
                        ("1", SlotStatus::Available),
                    ]),
                    5,
                )
                .unwrap();
            store.upsert("B", "1", SlotStatus::Occupied, 5).unwrap();
            let ids: Vec<String> = store
                .list("A")
                .unwrap()
                .into_iter()
                .map(|s| s.slot_id)
                .collect();
            assert_eq!(ids, vec!["1", "2", "10"], "{}", name);
            assert_eq!(store.list("B").unwrap().len(), 1, "{}", name);
            assert!(store.list("C").unwrap().is_empty(), "{}", name);
        }
    }

    #[test]
    fn scans_preserve_bookings() {
        for (name, store) in stores() {
            store
                .apply_scan("A", &observed(&[("1", SlotStatus::Available)]), 1)
                .unwrap();
            store.book("u1", "A", "1", 2).unwrap();
            let states = store
                .apply_scan(
                    "A",
                    &observed(&[("1", SlotStatus::Occupied), ("2", SlotStatus::Occupied)]),
                    3,
                )
                .unwrap();
            assert_eq!(states[0].status, SlotStatus::Booked, "{}", name);
            assert_eq!(states[1].status, SlotStatus::Occupied, "{}", name);
        }
    }

    #[test]
    fn concurrent_scans_of_different_areas_all_land() {
        for (name, store) in stores() {
            let store: Arc<dyn StatusStore> = Arc::from(store);
            std::thread::scope(|scope| {
                for area in ["A", "B", "C", "D"] {
                    let store = Arc::clone(&store);
                    scope.spawn(move || {
                        for ts in 1..=20 {
                            let status = if ts % 2 == 0 {
                                SlotStatus::Occupied
                            } else {
                                SlotStatus::Available
                            };
                            store
                                .apply_scan(area, &observed(&[("1", status), ("2", status)]), ts)
                                .unwrap();
                        }
                    });
                }
            });
            for area in ["A", "B", "C", "D"] {
                let states = store.list(area).unwrap();
                assert_eq!(states.len(), 2, "{} {}", name, area);
                assert!(
                    states.iter().all(|s| s.status == SlotStatus::Occupied && s.updated_at_ms == 20),
                    "{} {}",
                    name,
                    area
                );
            }
        }
    }

    #[test]
    fn booking_is_atomic_and_exclusive() {
        for (name, store) in stores() {
            store
                .apply_scan(
                    "A",
                    &observed(&[("1", SlotStatus::Available), ("2", SlotStatus::Occupied)]),
                    1,
                )
                .unwrap();

            let record = store.book("u1", "A", "1", 2).unwrap();
            assert_eq!(record.state, BookingState::Booked, "{}", name);
            assert_eq!(record.slot_id, "1", "{}", name);

            let again = store.book("u2", "A", "1", 3).unwrap_err();
            assert!(
                matches!(again, OccupancyError::SlotUnavailable { ref status, .. } if status == "booked"),
                "{}",
                name
            );
            assert!(matches!(
                store.book("u2", "A", "2", 3).unwrap_err(),
                OccupancyError::SlotUnavailable { .. }
            ));
            assert!(matches!(
                store.book("u2", "A", "99", 3).unwrap_err(),
                OccupancyError::SlotUnavailable { ref status, .. } if status == "unscanned"
            ));

            let bookings = store.bookings("A").unwrap();
            assert_eq!(bookings.len(), 1, "{}", name);
            assert_eq!(bookings[0].user_id, "u1", "{}", name);
        }
    }

    #[test]
    fn release_frees_slot_and_closes_bookings() {
        for (name, store) in stores() {
            store
                .apply_scan("A", &observed(&[("1", SlotStatus::Available)]), 1)
                .unwrap();
            store.book("u1", "A", "1", 2).unwrap();

            assert!(store.release("A", "1", 3).unwrap(), "{}", name);
            let state = store.get("A", "1").unwrap().unwrap();
            assert_eq!(state.status, SlotStatus::Available, "{}", name);
            assert_eq!(
                store.bookings("A").unwrap()[0].state,
                BookingState::Released,
                "{}",
                name
            );

            assert!(!store.release("A", "1", 4).unwrap(), "{}", name);
            assert!(!store.release("nowhere", "1", 4).unwrap(), "{}", name);

            // Rebooking after release appends a second record.
            store.book("u2", "A", "1", 5).unwrap();
            assert_eq!(store.bookings("A").unwrap().len(), 2, "{}", name);
        }
    }

    #[test]
    fn release_leaves_occupied_slot_alone() {
        for (name, store) in stores() {
            store.upsert("A", "1", SlotStatus::Occupied, 1).unwrap();
            assert!(!store.release("A", "1", 2).unwrap(), "{}", name);
            assert_eq!(
                store.get("A", "1").unwrap().unwrap().status,
                SlotStatus::Occupied,
                "{}",
                name
            );
        }
    }

    #[test]
    fn sqlite_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parkwatch.db");
        let path = path.to_str().unwrap();
        {
            let store = SqliteStatusStore::open(path).unwrap();
            store.upsert("A", "1", SlotStatus::Available, 1).unwrap();
            store.book("u1", "A", "1", 2).unwrap();
        }
        let store = SqliteStatusStore::open(path).unwrap();
        assert_eq!(
            store.get("A", "1").unwrap().unwrap().status,
            SlotStatus::Booked
        );
        assert_eq!(store.bookings("A").unwrap().len(), 1);
    }
}
