//! digiKam SQLite backend.
//!
//! digiKam keeps its catalog in a SQLite file (digikam4.db). We open it
//! read-only and answer the database port by compiling selectors into SQL
//! over that schema.

mod query;

use anyhow::{anyhow, Context, Result};
use rusqlite::{params_from_iter, Connection, OpenFlags};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

use crate::db::Database;
use crate::types::{Photo, Query, Tag};

use query::{build_photo_query, tag_id_subquery};

/// How long a query waits on a locked database before erroring. digiKam
/// may hold write locks while we read; failing fast beats hanging the
/// filesystem caller.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct DigikamDb {
    // Option lets close() consume the connection behind &self; rusqlite's
    // close takes the connection by value.
    conn: Mutex<Option<Connection>>,
}

impl DigikamDb {
    /// Open a digiKam catalog read-only.
    pub fn open(file_path: &str) -> Result<DigikamDb> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(file_path, flags)
            .with_context(|| format!("failed to open digikam database {:?}", file_path))?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(DigikamDb {
            conn: Mutex::new(Some(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<Connection>>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database lock poisoned"))
    }

    fn tags(
        &self,
        parent_path: &[String],
        where_clause: &str,
        parameters: &[String],
    ) -> Result<Vec<Tag>> {
        let sql = format!("SELECT name FROM Tags WHERE {where_clause}");
        debug!(query = %sql, ?parameters, "db query");

        let guard = self.lock()?;
        let conn = guard.as_ref().context("database is closed")?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(parameters), |row| {
            row.get::<_, String>(0)
        })?;

        let mut tags = Vec::new();
        for name in rows {
            let name = name?;
            let mut path = Vec::with_capacity(parent_path.len() + 1);
            path.extend_from_slice(parent_path);
            path.push(name);
            tags.push(Tag { path });
        }
        debug!(?parent_path, result_count = tags.len(), "db tags query passed");
        Ok(tags)
    }
}

impl Database for DigikamDb {
    fn photos(&self, query: &Query) -> Result<Vec<Photo>> {
        debug!(?query, "db query photos");

        let compiled = build_photo_query(query)?;
        debug!(query = %compiled.query, parameters = ?compiled.parameters, "db query");

        let guard = self.lock()?;
        let conn = guard.as_ref().context("database is closed")?;
        let mut stmt = conn.prepare(&compiled.query)?;
        let rows = stmt.query_map(params_from_iter(&compiled.parameters), |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut photos = Vec::new();
        for row in rows {
            let (root, relative_path, name, unique_hash) = row?;

            // digiKam stores relativePath with a leading slash ("/" for the
            // album root itself); trim it so push() joins instead of
            // replacing the root.
            let mut path = PathBuf::from(root);
            let relative_path = relative_path.trim_matches('/');
            if !relative_path.is_empty() {
                path.push(relative_path);
            }
            path.push(&name);

            photos.push(Photo {
                path,
                id: unique_hash,
            });
        }

        debug!(?query, result_count = photos.len(), "db query photos passed");
        Ok(photos)
    }

    fn root_tags(&self) -> Result<Vec<Tag>> {
        debug!("db query root tags");
        self.tags(&[], "pid=0", &[])
    }

    fn children_tags(&self, parent: &Tag) -> Result<Vec<Tag>> {
        debug!(?parent, "db query children tags");
        let (parent_query, parameters) = tag_id_subquery(parent)?;
        let where_clause = format!("pid={parent_query}");
        self.tags(&parent.path, &where_clause, &parameters)
    }

    fn ratings(&self) -> Vec<f64> {
        // digiKam ratings are 0 to 5 stars
        vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]
    }

    fn close(&self) -> Result<()> {
        debug!("db close");
        match self.lock()?.take() {
            Some(conn) => conn
                .close()
                .map_err(|(_, err)| anyhow!(err).context("failed to close database")),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixture {
    //! Builds a minimal digiKam-shaped catalog in a temp file for tests.

    use rusqlite::{params, Connection};
    use std::path::Path;

    const SCHEMA: &str = r#"
        CREATE TABLE AlbumRoots (id INTEGER PRIMARY KEY, specificPath TEXT);
        CREATE TABLE Albums (id INTEGER PRIMARY KEY, albumRoot INTEGER, relativePath TEXT);
        CREATE TABLE Images (id INTEGER PRIMARY KEY, album INTEGER, name TEXT, uniqueHash TEXT);
        CREATE TABLE ImageInformation (imageid INTEGER, rating INTEGER);
        CREATE TABLE ImageTags (imageid INTEGER, tagid INTEGER);
        CREATE TABLE Tags (id INTEGER PRIMARY KEY, pid INTEGER, name TEXT);
    "#;

    pub struct FixtureDb {
        conn: Connection,
        next_image_id: i64,
        next_tag_id: i64,
    }

    impl FixtureDb {
        pub fn create(path: &Path, library_root: &str) -> FixtureDb {
            let conn = Connection::open(path).unwrap();
            conn.execute_batch(SCHEMA).unwrap();
            conn.execute(
                "INSERT INTO AlbumRoots (id, specificPath) VALUES (1, ?)",
                [library_root],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO Albums (id, albumRoot, relativePath) VALUES (1, 1, '/album')",
                [],
            )
            .unwrap();
            FixtureDb {
                conn,
                next_image_id: 1,
                next_tag_id: 1,
            }
        }

        pub fn add_tag(&mut self, parent_id: i64, name: &str) -> i64 {
            let id = self.next_tag_id;
            self.next_tag_id += 1;
            self.conn
                .execute(
                    "INSERT INTO Tags (id, pid, name) VALUES (?, ?, ?)",
                    params![id, parent_id, name],
                )
                .unwrap();
            id
        }

        pub fn add_photo(
            &mut self,
            name: &str,
            hash: &str,
            rating: Option<i64>,
            tag_ids: &[i64],
        ) -> i64 {
            let id = self.next_image_id;
            self.next_image_id += 1;
            self.conn
                .execute(
                    "INSERT INTO Images (id, album, name, uniqueHash) VALUES (?, 1, ?, ?)",
                    params![id, name, hash],
                )
                .unwrap();
            self.conn
                .execute(
                    "INSERT INTO ImageInformation (imageid, rating) VALUES (?, ?)",
                    params![id, rating],
                )
                .unwrap();
            for tag_id in tag_ids {
                self.conn
                    .execute(
                        "INSERT INTO ImageTags (imageid, tagid) VALUES (?, ?)",
                        params![id, tag_id],
                    )
                    .unwrap();
            }
            id
        }
    }
}
