//! SQLite-backed object store
//!
//! Objects land in an `objects` table keyed by hash with a kind
//! discriminator; tree entries and commit parents are associative rows
//! written in the same transaction as their parent row, so a node is never
//! persisted with only part of its edges. Branches and the HEAD indirection
//! are two small name/value tables.
//!
//! Content addresses are SHA-1 over the canonical JSON form, exactly as the
//! memory store computes them.

use crate::areas::store::{ObjectStore, RawObject};
use crate::artifacts::objects::canonical::canonical_bytes;
use crate::artifacts::objects::commit::{Author, CommitPayload};
use crate::artifacts::objects::entry_mode::EntryMode;
use crate::artifacts::objects::git_object::{ObjectContent, ObjectPayload};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_kind::ObjectKind;
use crate::artifacts::objects::tree::{sorted_by_name, TreeRecord};
use crate::errors::ObjectError;
use anyhow::Context;
use bytes::Bytes;
use rusqlite::{params, Connection, OptionalExtension};
use std::cell::RefCell;
use std::path::Path;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS objects (
    hash             TEXT PRIMARY KEY,
    kind             TEXT NOT NULL,
    size             INTEGER NOT NULL,
    blob_data        BLOB,
    commit_tree      TEXT,
    commit_author    TEXT,
    commit_committer TEXT,
    commit_subject   TEXT,
    cloned_from      TEXT
);
CREATE INDEX IF NOT EXISTS idx_objects_cloned_from ON objects (cloned_from);
CREATE TABLE IF NOT EXISTS tree_entries (
    tree_hash   TEXT NOT NULL REFERENCES objects (hash),
    position    INTEGER NOT NULL,
    name        TEXT NOT NULL,
    mode        TEXT NOT NULL,
    target_hash TEXT NOT NULL,
    UNIQUE (tree_hash, name)
);
CREATE TABLE IF NOT EXISTS commit_parents (
    commit_hash TEXT NOT NULL REFERENCES objects (hash),
    position    INTEGER NOT NULL,
    parent_hash TEXT NOT NULL,
    UNIQUE (commit_hash, position)
);
CREATE TABLE IF NOT EXISTS branches (
    name TEXT PRIMARY KEY,
    hash TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS refs (
    name   TEXT PRIMARY KEY,
    target TEXT NOT NULL
);
INSERT OR IGNORE INTO refs (name, target) VALUES ('HEAD', 'master');
";

pub struct RelationalStore {
    conn: RefCell<Connection>,
}

impl RelationalStore {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> anyhow::Result<Self> {
        conn.execute_batch(SCHEMA)
            .context("Unable to initialize object schema")?;

        Ok(RelationalStore {
            conn: RefCell::new(conn),
        })
    }

    pub fn set_head(&self, target: &str) -> anyhow::Result<()> {
        self.conn.borrow().execute(
            "INSERT INTO refs (name, target) VALUES ('HEAD', ?1)
             ON CONFLICT (name) DO UPDATE SET target = excluded.target",
            params![target],
        )?;
        Ok(())
    }

    fn load_tree_records(conn: &Connection, id: &ObjectId) -> anyhow::Result<Vec<TreeRecord>> {
        let mut stmt = conn.prepare(
            "SELECT name, mode, target_hash FROM tree_entries
             WHERE tree_hash = ?1 ORDER BY position",
        )?;
        let rows = stmt.query_map(params![id.as_ref()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (name, mode, target) = row?;
            let mode = EntryMode::try_parse(&mode, &name)?;
            records.push(TreeRecord::new(mode, name, ObjectId::try_parse(target)?));
        }

        Ok(records)
    }

    fn load_commit_payload(conn: &Connection, id: &ObjectId) -> anyhow::Result<CommitPayload> {
        let (tree, author, committer, subject) = conn
            .query_row(
                "SELECT commit_tree, commit_author, commit_committer, commit_subject
                 FROM objects WHERE hash = ?1",
                params![id.as_ref()],
                |row| {
                    Ok((
                        row.get::<_, Option<String>>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, Option<String>>(3)?,
                    ))
                },
            )
            .context("Unable to read commit row")?;

        let tree = tree.ok_or(ObjectError::MissingTreeInCommit { id: id.to_string() })?;
        let author = author.ok_or(ObjectError::MissingCommitData { label: "author" })?;

        let mut stmt = conn.prepare(
            "SELECT parent_hash FROM commit_parents WHERE commit_hash = ?1 ORDER BY position",
        )?;
        let parents = stmt
            .query_map(params![id.as_ref()], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?
            .into_iter()
            .map(ObjectId::try_parse)
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(CommitPayload {
            tree: ObjectId::try_parse(tree)?,
            parents,
            author: Author::try_from(author.as_str())?,
            committer: committer.as_deref().map(Author::try_from).transpose()?,
            subject,
        })
    }
}

impl ObjectStore for RelationalStore {
    fn load(&self, id: &ObjectId) -> anyhow::Result<RawObject> {
        let conn = self.conn.borrow();

        let row = conn
            .query_row(
                "SELECT kind, size, blob_data FROM objects WHERE hash = ?1",
                params![id.as_ref()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, u64>(1)?,
                        row.get::<_, Option<Vec<u8>>>(2)?,
                    ))
                },
            )
            .optional()?;

        let (kind, declared_size, blob_data) =
            row.ok_or_else(|| ObjectError::MissingObject { id: id.to_string() })?;
        let kind = ObjectKind::try_from(kind.as_str())?;

        let content = match kind {
            ObjectKind::Blob => ObjectContent::Blob(Bytes::from(blob_data.unwrap_or_default())),
            ObjectKind::Tree => ObjectContent::Tree(Self::load_tree_records(&conn, id)?),
            ObjectKind::Commit => ObjectContent::Commit(Self::load_commit_payload(&conn, id)?),
        };

        let canonical = canonical_bytes(&content);
        let payload = match content {
            ObjectContent::Blob(data) => ObjectPayload::Blob(Some(data)),
            ObjectContent::Tree(records) => ObjectPayload::Tree(records),
            ObjectContent::Commit(commit) => ObjectPayload::Commit(commit),
        };

        Ok(RawObject {
            kind,
            declared_size,
            actual_size: canonical.len() as u64,
            payload,
            content_id: ObjectId::digest_of(&canonical),
        })
    }

    fn store(&self, content: ObjectContent, origin: Option<&ObjectId>) -> anyhow::Result<ObjectId> {
        let content = match content {
            ObjectContent::Tree(records) => ObjectContent::Tree(sorted_by_name(&records)),
            other => other,
        };

        let canonical = canonical_bytes(&content);
        let id = ObjectId::digest_of(&canonical);
        let size = canonical.len() as u64;

        let mut conn = self.conn.borrow_mut();
        let tx = conn.transaction()?;

        let inserted = match &content {
            ObjectContent::Blob(data) => tx.execute(
                "INSERT OR IGNORE INTO objects (hash, kind, size, blob_data)
                 VALUES (?1, 'blob', ?2, ?3)",
                params![id.as_ref(), size, data.as_ref()],
            )?,
            ObjectContent::Tree(_) => tx.execute(
                "INSERT OR IGNORE INTO objects (hash, kind, size) VALUES (?1, 'tree', ?2)",
                params![id.as_ref(), size],
            )?,
            ObjectContent::Commit(commit) => tx.execute(
                "INSERT OR IGNORE INTO objects
                 (hash, kind, size, commit_tree, commit_author, commit_committer, commit_subject)
                 VALUES (?1, 'commit', ?2, ?3, ?4, ?5, ?6)",
                params![
                    id.as_ref(),
                    size,
                    commit.tree.as_ref(),
                    commit.author.display(),
                    commit.committer.as_ref().map(|c| c.display()),
                    commit.subject
                ],
            )?,
        };

        // Associative rows ride the same transaction as the object row.
        if inserted > 0 {
            match &content {
                ObjectContent::Tree(records) => {
                    for (position, record) in records.iter().enumerate() {
                        tx.execute(
                            "INSERT INTO tree_entries (tree_hash, position, name, mode, target_hash)
                             VALUES (?1, ?2, ?3, ?4, ?5)",
                            params![
                                id.as_ref(),
                                position as i64,
                                record.name,
                                record.mode.as_str(),
                                record.id.as_ref()
                            ],
                        )?;
                    }
                }
                ObjectContent::Commit(commit) => {
                    for (position, parent) in commit.parents.iter().enumerate() {
                        tx.execute(
                            "INSERT INTO commit_parents (commit_hash, position, parent_hash)
                             VALUES (?1, ?2, ?3)",
                            params![id.as_ref(), position as i64, parent.as_ref()],
                        )?;
                    }
                }
                ObjectContent::Blob(_) => {}
            }
        }

        if let Some(origin) = origin {
            tx.execute(
                "UPDATE objects SET cloned_from = COALESCE(cloned_from, ?1) WHERE hash = ?2",
                params![origin.as_ref(), id.as_ref()],
            )?;
        }

        tx.commit()?;

        Ok(id)
    }

    fn find_cloned(&self, origin: &ObjectId) -> anyhow::Result<Option<ObjectId>> {
        let cloned = self
            .conn
            .borrow()
            .query_row(
                "SELECT hash FROM objects WHERE cloned_from = ?1",
                params![origin.as_ref()],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        cloned.map(ObjectId::try_parse).transpose()
    }

    fn resolve_head(&self) -> anyhow::Result<Option<ObjectId>> {
        let conn = self.conn.borrow();

        let target = conn
            .query_row(
                "SELECT target FROM refs WHERE name = 'HEAD'",
                [],
                |row| row.get::<_, String>(0),
            )
            .optional()?
            .unwrap_or_else(|| "master".to_string());

        let branch_tip = conn
            .query_row(
                "SELECT hash FROM branches WHERE name = ?1",
                params![target],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        match branch_tip {
            Some(tip) => Ok(Some(ObjectId::try_parse(tip)?)),
            None => match ObjectId::try_parse(target) {
                Ok(id) => Ok(Some(id)),
                Err(_) => Ok(None),
            },
        }
    }

    fn update_branch(&self, name: &str, id: &ObjectId) -> anyhow::Result<()> {
        self.conn.borrow().execute(
            "INSERT INTO branches (name, hash) VALUES (?1, ?2)
             ON CONFLICT (name) DO UPDATE SET hash = excluded.hash",
            params![name, id.as_ref()],
        )?;
        Ok(())
    }

    fn branch_names(&self) -> anyhow::Result<Vec<String>> {
        let conn = self.conn.borrow();
        let mut stmt = conn.prepare("SELECT name FROM branches ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(names)
    }
}
