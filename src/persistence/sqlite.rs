use super::{AllocationSnapshot, AllocationStore, PersistenceResult};
use crate::allocation::AllocationId;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;

/// One row per allocation, the snapshot kept as JSON.
pub struct SqliteAllocationStore {
    connection: Mutex<Connection>,
}

impl SqliteAllocationStore {
    pub fn new<P: AsRef<Path>>(path: P) -> PersistenceResult<Self> {
        let connection = Connection::open(path)?;
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    pub fn in_memory() -> PersistenceResult<Self> {
        let connection = Connection::open_in_memory()?;
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn initialize_schema(connection: &Connection) -> PersistenceResult<()> {
        let ddl = r#"
            CREATE TABLE IF NOT EXISTS allocations (
                id INTEGER PRIMARY KEY,
                task_id INTEGER NOT NULL,
                snapshot_json TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS allocations_by_task ON allocations (task_id);
        "#;
        connection.execute_batch(ddl)?;
        Ok(())
    }

    pub fn delete_allocation(&self, id: AllocationId) -> PersistenceResult<bool> {
        let conn = self.connection.lock();
        let removed = conn.execute("DELETE FROM allocations WHERE id = ?1", params![id.0 as i64])?;
        Ok(removed > 0)
    }

    pub fn allocations_of_task(&self, task_id: u32) -> PersistenceResult<Vec<AllocationSnapshot>> {
        let conn = self.connection.lock();
        let mut stmt =
            conn.prepare("SELECT snapshot_json FROM allocations WHERE task_id = ?1 ORDER BY id ASC")?;
        let rows = stmt.query_map(params![task_id], |row| row.get::<_, String>(0))?;

        let mut snapshots = Vec::new();
        for json in rows {
            let json = json?;
            snapshots.push(serde_json::from_str(&json)?);
        }
        Ok(snapshots)
    }
}

impl AllocationStore for SqliteAllocationStore {
    fn save_allocation(&self, snapshot: &AllocationSnapshot) -> PersistenceResult<()> {
        snapshot.validate()?;
        let json = serde_json::to_string(snapshot)?;
        let mut conn = self.connection.lock();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM allocations WHERE id = ?1", params![snapshot.id.0 as i64])?;
        tx.execute(
            "INSERT INTO allocations (id, task_id, snapshot_json) VALUES (?1, ?2, ?3)",
            params![snapshot.id.0 as i64, snapshot.task_id.0, json],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn load_allocation(&self, id: AllocationId) -> PersistenceResult<Option<AllocationSnapshot>> {
        let conn = self.connection.lock();
        let mut stmt = conn.prepare("SELECT snapshot_json FROM allocations WHERE id = ?1")?;
        let json: Option<String> = stmt
            .query_row(params![id.0 as i64], |row| row.get(0))
            .optional()?;

        let Some(json) = json else {
            return Ok(None);
        };
        let snapshot: AllocationSnapshot = serde_json::from_str(&json)?;
        snapshot.validate()?;
        Ok(Some(snapshot))
    }

    fn allocation_ids(&self) -> PersistenceResult<Vec<AllocationId>> {
        let conn = self.connection.lock();
        let mut stmt = conn.prepare("SELECT id FROM allocations ORDER BY id ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, i64>(0))?;

        let mut ids = Vec::new();
        for id in rows {
            ids.push(AllocationId(id? as u64));
        }
        Ok(ids)
    }
}
