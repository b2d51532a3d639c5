//! SQL behind the store traits
//!
//! `SqliteScope` borrows either the store's own connection or an open
//! transaction (which derefs to a connection), so the same queries serve
//! both autocommit calls and `atomically` scopes.

use crate::StoreError;
use amity_domain::{EdgeId, EdgeStatus, EdgeStore, Relationship, UserDirectory, UserId};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::collections::BTreeSet;
use tracing::debug;

const NESTED_SAVEPOINT: &str = "amity_nested";

/// Values bound per `IN (...)` statement; SQLite caps host parameters
const IN_LIST_CHUNK: usize = 500;

/// Store operations bound to a borrowed connection
pub(crate) struct SqliteScope<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteScope<'c> {
    pub(crate) fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Every stored edge, ordered by id
    pub(crate) fn all_edges(&self) -> Result<Vec<Relationship>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, requester_id, target_id, status FROM relationships ORDER BY id",
        )?;

        let edges = stmt
            .query_map([], |row| {
                let status_str: String = row.get(3)?;
                let status = status_from_str(&status_str).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        3,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;

                Ok(Relationship {
                    id: EdgeId::from_value(row.get(0)?),
                    requester: UserId::from_value(row.get(1)?),
                    target: UserId::from_value(row.get(2)?),
                    status,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(edges)
    }

    fn query_ids<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<i64>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let ids = stmt
            .query_map(params, |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn query_user_set<P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
    ) -> Result<BTreeSet<UserId>, StoreError> {
        Ok(self
            .query_ids(sql, params)?
            .into_iter()
            .map(UserId::from_value)
            .collect())
    }

    fn query_edge_ids<P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
    ) -> Result<Vec<EdgeId>, StoreError> {
        Ok(self
            .query_ids(sql, params)?
            .into_iter()
            .map(EdgeId::from_value)
            .collect())
    }
}

impl UserDirectory for SqliteScope<'_> {
    type Error = StoreError;

    fn create_user(&mut self, email: &str) -> Result<UserId, Self::Error> {
        self.conn
            .execute("INSERT INTO users (email) VALUES (?1)", params![email])
            .map_err(map_write_error)?;

        let id = UserId::from_value(self.conn.last_insert_rowid());
        debug!("Created user {} ({})", id, email);
        Ok(id)
    }

    fn resolve_id(&self, email: &str) -> Result<Option<UserId>, Self::Error> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM users WHERE email = ?1 LIMIT 1",
                params![email],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;

        Ok(id.map(UserId::from_value))
    }

    fn resolve_ids(&self, emails: &[String]) -> Result<BTreeSet<UserId>, Self::Error> {
        if emails.is_empty() {
            return Ok(BTreeSet::new());
        }

        let mut found = BTreeSet::new();
        for chunk in emails.chunks(IN_LIST_CHUNK) {
            let sql = format!(
                "SELECT id FROM users WHERE email IN ({})",
                placeholders(chunk.len())
            );
            found.extend(self.query_user_set(&sql, params_from_iter(chunk.iter()))?);
        }

        Ok(found)
    }

    fn exists(&self, id: UserId) -> Result<bool, Self::Error> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM users WHERE id = ?1",
                params![id.value()],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);

        Ok(found)
    }

    fn emails_of(&self, ids: &BTreeSet<UserId>) -> Result<Vec<String>, Self::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        // Chunks follow the set's ascending order, so the concatenation
        // stays ordered by id
        let ids: Vec<i64> = ids.iter().map(|id| id.value()).collect();
        let mut emails = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(IN_LIST_CHUNK) {
            let sql = format!(
                "SELECT email FROM users WHERE id IN ({}) ORDER BY id",
                placeholders(chunk.len())
            );
            let mut stmt = self.conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(chunk.iter()), |row| {
                row.get::<_, String>(0)
            })?;
            for email in rows {
                emails.push(email?);
            }
        }

        Ok(emails)
    }

    fn all_emails(&self) -> Result<Vec<String>, Self::Error> {
        let mut stmt = self.conn.prepare("SELECT email FROM users ORDER BY id")?;
        let emails = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(emails)
    }
}

impl EdgeStore for SqliteScope<'_> {
    fn find_symmetric(
        &self,
        a: UserId,
        b: UserId,
        status: EdgeStatus,
    ) -> Result<Vec<EdgeId>, Self::Error> {
        self.query_edge_ids(
            "SELECT id FROM relationships
             WHERE status = ?3
               AND ((requester_id = ?1 AND target_id = ?2)
                 OR (requester_id = ?2 AND target_id = ?1))
             ORDER BY id",
            params![a.value(), b.value(), status.as_str()],
        )
    }

    fn find_directional(
        &self,
        from: UserId,
        to: UserId,
        status: EdgeStatus,
    ) -> Result<Vec<EdgeId>, Self::Error> {
        self.query_edge_ids(
            "SELECT id FROM relationships
             WHERE requester_id = ?1 AND target_id = ?2 AND status = ?3
             ORDER BY id",
            params![from.value(), to.value(), status.as_str()],
        )
    }

    fn insert(
        &mut self,
        requester: UserId,
        target: UserId,
        status: EdgeStatus,
    ) -> Result<EdgeId, Self::Error> {
        self.conn
            .execute(
                "INSERT INTO relationships (requester_id, target_id, status) VALUES (?1, ?2, ?3)",
                params![requester.value(), target.value(), status.as_str()],
            )
            .map_err(map_write_error)?;

        let id = EdgeId::from_value(self.conn.last_insert_rowid());
        debug!("Inserted {} edge {} ({} -> {})", status, id, requester, target);
        Ok(id)
    }

    fn delete_many(&mut self, ids: &[EdgeId]) -> Result<(), Self::Error> {
        if ids.is_empty() {
            return Ok(());
        }

        let mut deleted = 0;
        for chunk in ids.chunks(IN_LIST_CHUNK) {
            let sql = format!(
                "DELETE FROM relationships WHERE id IN ({})",
                placeholders(chunk.len())
            );
            deleted += self
                .conn
                .execute(&sql, params_from_iter(chunk.iter().map(|id| id.value())))?;
        }

        debug!("Deleted {} of {} requested edges", deleted, ids.len());
        Ok(())
    }

    fn friends_of(&self, user: UserId) -> Result<BTreeSet<UserId>, Self::Error> {
        self.query_user_set(
            "SELECT target_id FROM relationships
             WHERE requester_id = ?1 AND status = 'connected'
             UNION
             SELECT requester_id FROM relationships
             WHERE target_id = ?1 AND status = 'connected'",
            params![user.value()],
        )
    }

    fn subscribers_of(&self, user: UserId) -> Result<BTreeSet<UserId>, Self::Error> {
        self.query_user_set(
            "SELECT requester_id FROM relationships
             WHERE target_id = ?1 AND status = 'subscribed'",
            params![user.value()],
        )
    }

    /// Required by the trait so a scope can stand in for a store. The
    /// engine never calls it, since it only sees `&mut dyn EdgeStore`
    /// inside a transition; direct callers get savepoint nesting.
    fn atomically<T, E, F>(&mut self, f: F) -> Result<Result<T, E>, Self::Error>
    where
        F: FnOnce(&mut dyn EdgeStore<Error = Self::Error>) -> Result<T, E>,
    {
        self.conn
            .execute_batch(&format!("SAVEPOINT {NESTED_SAVEPOINT}"))?;

        match f(&mut *self) {
            Ok(value) => {
                self.conn
                    .execute_batch(&format!("RELEASE {NESTED_SAVEPOINT}"))?;
                Ok(Ok(value))
            }
            Err(err) => {
                self.conn.execute_batch(&format!(
                    "ROLLBACK TO {NESTED_SAVEPOINT}; RELEASE {NESTED_SAVEPOINT}"
                ))?;
                Ok(Err(err))
            }
        }
    }
}

/// `?, ?, ?` with `n` placeholders
fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn status_from_str(s: &str) -> Result<EdgeStatus, StoreError> {
    EdgeStatus::parse(s).ok_or_else(|| StoreError::InvalidData(format!("Unknown edge status: {}", s)))
}

/// Uniqueness violations become `StoreError::Duplicate`
fn map_write_error(err: rusqlite::Error) -> StoreError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            StoreError::Duplicate
        }
        _ => StoreError::Database(err),
    }
}
