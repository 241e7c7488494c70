//! SQLite implementation of the FolderStore trait

use crate::error::StoreError;
use crate::folders::{Folder, FolderResult, FolderStore};
use log::info;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

/// SQLite-backed folder store
pub struct SqliteFolderStore {
    conn: Mutex<Connection>,
}

fn db_err(e: rusqlite::Error) -> StoreError {
    StoreError::Folder(e.to_string())
}

impl SqliteFolderStore {
    /// Open (or create) the folder database at `db_path`
    pub fn new(db_path: &str) -> FolderResult<Self> {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path).map_err(db_err)?;
        info!("Opened folder database at {}", db_path);
        Self::bootstrap(conn)
    }

    /// In-memory database, used by tests
    pub fn in_memory() -> FolderResult<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::bootstrap(conn)
    }

    fn bootstrap(conn: Connection) -> FolderResult<Self> {
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        conn.execute(
            "CREATE TABLE IF NOT EXISTS folders (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                parent INTEGER,
                path TEXT NOT NULL UNIQUE
            )",
            [],
        )
        .map_err(db_err)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS files (
                hash TEXT PRIMARY KEY,
                folder_path TEXT NOT NULL
            )",
            [],
        )
        .map_err(db_err)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn row_to_folder(row: &rusqlite::Row<'_>) -> rusqlite::Result<Folder> {
        Ok(Folder {
            id: row.get(0)?,
            name: row.get(1)?,
            parent: row.get(2)?,
            path: row.get(3)?,
        })
    }
}

impl FolderStore for SqliteFolderStore {
    fn folder(&self, id: i64) -> FolderResult<Option<Folder>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, name, parent, path FROM folders WHERE id = ?1",
            params![id],
            Self::row_to_folder,
        )
        .optional()
        .map_err(db_err)
    }

    fn folder_by_path(&self, path: &str) -> FolderResult<Option<Folder>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, name, parent, path FROM folders WHERE path = ?1",
            params![path],
            Self::row_to_folder,
        )
        .optional()
        .map_err(db_err)
    }

    fn child_folder_count(&self, id: i64) -> FolderResult<u64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM folders WHERE parent = ?1",
                params![id],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        Ok(count as u64)
    }

    fn file_count_in_folder(&self, path: &str, exclude_hash: &str) -> FolderResult<u64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM files WHERE folder_path = ?1 AND hash != ?2",
                params![path, exclude_hash],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        Ok(count as u64)
    }

    fn delete_folder(&self, id: i64) -> FolderResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM folders WHERE id = ?1", params![id])
            .map_err(db_err)?;
        Ok(())
    }

    fn folder_of_file(&self, hash: &str) -> FolderResult<Option<i64>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT f.id FROM folders f
             JOIN files x ON x.folder_path = f.path
             WHERE x.hash = ?1",
            params![hash],
            |row| row.get(0),
        )
        .optional()
        .map_err(db_err)
    }

    fn ensure_path(&self, segments: &[String]) -> FolderResult<Option<Folder>> {
        if segments.is_empty() {
            return Ok(None);
        }
        let conn = self.conn.lock().unwrap();
        let mut parent: Option<i64> = None;
        let mut path = String::new();
        let mut current: Option<Folder> = None;
        for name in segments {
            if !path.is_empty() {
                path.push('/');
            }
            path.push_str(name);
            let existing = conn
                .query_row(
                    "SELECT id, name, parent, path FROM folders WHERE path = ?1",
                    params![path],
                    Self::row_to_folder,
                )
                .optional()
                .map_err(db_err)?;
            let folder = match existing {
                Some(folder) => folder,
                None => {
                    conn.execute(
                        "INSERT INTO folders (name, parent, path) VALUES (?1, ?2, ?3)",
                        params![name, parent, path],
                    )
                    .map_err(db_err)?;
                    Folder {
                        id: conn.last_insert_rowid(),
                        name: name.clone(),
                        parent,
                        path: path.clone(),
                    }
                }
            };
            parent = Some(folder.id);
            current = Some(folder);
        }
        Ok(current)
    }

    fn record_file(&self, hash: &str, folder_path: &str) -> FolderResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO files (hash, folder_path) VALUES (?1, ?2)
             ON CONFLICT(hash) DO UPDATE SET folder_path = excluded.folder_path",
            params![hash, folder_path],
        )
        .map_err(db_err)?;
        Ok(())
    }

    fn forget_file(&self, hash: &str) -> FolderResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM files WHERE hash = ?1", params![hash])
            .map_err(db_err)?;
        Ok(())
    }
}
