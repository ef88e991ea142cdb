use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};

use super::code::{CodeKind, generate_unique_code};
use super::models::*;
use super::password::{hash_password, verify_password};
use crate::errors::TrackerError;

/// Async-safe handle to the tracker database.
///
/// Wraps `TrackerDb` behind `Arc<Mutex>` and runs all access on tokio's
/// blocking thread pool via `spawn_blocking`, keeping synchronous SQLite
/// I/O off the async worker threads. Holding the mutex for the whole
/// closure also serialises code generation with the insert that uses it.
#[derive(Clone)]
pub struct DbHandle {
    inner: Arc<std::sync::Mutex<TrackerDb>>,
}

impl DbHandle {
    pub fn new(db: TrackerDb) -> Self {
        Self {
            inner: Arc::new(std::sync::Mutex::new(db)),
        }
    }

    /// Run a closure with access to the database on a blocking thread.
    /// All data passed into `f` must be owned (`'static`).
    pub async fn call<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&TrackerDb) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let db = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = db.lock().map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
            f(&guard)
        })
        .await
        .context("DB task panicked")?
    }
}

pub struct TrackerDb {
    conn: Connection,
}

impl TrackerDb {
    /// Open (or create) a SQLite database at the given path and run migrations.
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to open SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Create an in-memory SQLite database (for testing).
    pub fn new_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        self.conn
            .execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        self.run_migrations().context("Failed to run migrations")?;
        Ok(())
    }

    fn run_migrations(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS users (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    racfid TEXT NOT NULL UNIQUE,
                    email TEXT NOT NULL UNIQUE COLLATE NOCASE,
                    name TEXT NOT NULL,
                    password_hash TEXT NOT NULL,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE TABLE IF NOT EXISTS projects (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    code TEXT NOT NULL UNIQUE,
                    name TEXT NOT NULL,
                    description TEXT NOT NULL DEFAULT '',
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE TABLE IF NOT EXISTS project_members (
                    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    PRIMARY KEY (project_id, user_id)
                );

                CREATE TABLE IF NOT EXISTS issues (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    code TEXT NOT NULL UNIQUE,
                    project_id INTEGER REFERENCES projects(id) ON DELETE CASCADE,
                    category TEXT NOT NULL DEFAULT 'task',
                    backlog INTEGER NOT NULL DEFAULT 1,
                    name TEXT NOT NULL,
                    description TEXT NOT NULL DEFAULT '',
                    story_points INTEGER,
                    assignee TEXT,
                    column_name TEXT NOT NULL DEFAULT 'todo',
                    position INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE INDEX IF NOT EXISTS idx_members_user ON project_members(user_id);
                CREATE INDEX IF NOT EXISTS idx_issues_project ON issues(project_id);
                CREATE INDEX IF NOT EXISTS idx_issues_lane ON issues(project_id, backlog, column_name, position);
                ",
            )
            .context("Failed to create tables")?;
        Ok(())
    }

    // ── Users ─────────────────────────────────────────────────────────

    /// Register a user under the next free RACFID. The password is hashed
    /// before it is written.
    pub fn create_user(&self, new: &NewUser) -> Result<User> {
        let email = normalize_email(&new.email);
        let password_hash = hash_password(&new.password)?;

        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;

        if email_owner(&tx, &email)?.is_some() {
            return Err(TrackerError::EmailTaken { email }.into());
        }

        let racfid = next_code(&tx, CodeKind::User)?;
        tx.execute(
            "INSERT INTO users (racfid, email, name, password_hash) VALUES (?1, ?2, ?3, ?4)",
            params![racfid, email, new.name.trim(), password_hash],
        )
        .context("Failed to insert user")?;
        tx.commit().context("Failed to commit user insert")?;

        self.get_user(&racfid)?.context("User not found after insert")
    }

    pub fn get_user(&self, racfid: &str) -> Result<Option<User>> {
        let row = self
            .conn
            .query_row(
                "SELECT racfid, email, name, created_at, updated_at FROM users WHERE racfid = ?1",
                params![racfid],
                UserRow::from_row,
            )
            .optional()
            .context("Failed to query user")?;
        match row {
            Some(r) => Ok(Some(self.user_with_projects(r)?)),
            None => Ok(None),
        }
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare("SELECT racfid, email, name, created_at, updated_at FROM users ORDER BY id")
            .context("Failed to prepare list_users")?;
        let rows = stmt
            .query_map([], UserRow::from_row)
            .context("Failed to query users")?;
        let mut users = Vec::new();
        for row in rows {
            let r = row.context("Failed to read user row")?;
            users.push(self.user_with_projects(r)?);
        }
        Ok(users)
    }

    /// Check a sign-in attempt. Unknown RACFIDs and wrong passwords fail
    /// the same way.
    pub fn authenticate(&self, racfid: &str, password: &str) -> Result<User> {
        let hash: Option<String> = self
            .conn
            .query_row(
                "SELECT password_hash FROM users WHERE racfid = ?1",
                params![racfid],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to query credentials")?;
        let Some(hash) = hash else {
            return Err(TrackerError::InvalidCredentials.into());
        };
        if !verify_password(password, &hash)? {
            return Err(TrackerError::InvalidCredentials.into());
        }
        self.get_user(racfid)?
            .ok_or_else(|| TrackerError::InvalidCredentials.into())
    }

    pub fn update_user(&self, racfid: &str, changes: &UserChanges) -> Result<User> {
        let password_hash = match &changes.password {
            Some(p) => Some(hash_password(p)?),
            None => None,
        };

        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;

        let user_id = user_id(&tx, racfid)?.ok_or_else(|| TrackerError::UserNotFound {
            racfid: racfid.to_string(),
        })?;

        if let Some(n) = &changes.name {
            tx.execute(
                "UPDATE users SET name = ?1, updated_at = datetime('now') WHERE id = ?2",
                params![n.trim(), user_id],
            )
            .context("Failed to update user name")?;
        }
        if let Some(e) = &changes.email {
            let email = normalize_email(e);
            if email_owner(&tx, &email)?.is_some_and(|owner| owner != user_id) {
                return Err(TrackerError::EmailTaken { email }.into());
            }
            tx.execute(
                "UPDATE users SET email = ?1, updated_at = datetime('now') WHERE id = ?2",
                params![email, user_id],
            )
            .context("Failed to update user email")?;
        }
        if let Some(h) = &password_hash {
            tx.execute(
                "UPDATE users SET password_hash = ?1, updated_at = datetime('now') WHERE id = ?2",
                params![h, user_id],
            )
            .context("Failed to update user password")?;
        }

        tx.commit().context("Failed to commit user update")?;
        self.get_user(racfid)?.context("User not found after update")
    }

    fn user_with_projects(&self, row: UserRow) -> Result<User> {
        let projects = self.string_column(
            "SELECT p.code FROM project_members m
             JOIN projects p ON p.id = m.project_id
             JOIN users u ON u.id = m.user_id
             WHERE u.racfid = ?1 ORDER BY p.id",
            &row.racfid,
        )?;
        Ok(User {
            racfid: row.racfid,
            email: row.email,
            name: row.name,
            projects,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    // ── Projects ──────────────────────────────────────────────────────

    pub fn create_project(&self, new: &NewProject) -> Result<Project> {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;

        let member_ids = resolve_members(&tx, &new.users)?;
        let code = next_code(&tx, CodeKind::Project)?;
        tx.execute(
            "INSERT INTO projects (code, name, description) VALUES (?1, ?2, ?3)",
            params![code, new.name.trim(), new.description],
        )
        .context("Failed to insert project")?;
        let project_id = tx.last_insert_rowid();
        insert_members(&tx, project_id, &member_ids)?;
        tx.commit().context("Failed to commit project insert")?;

        self.get_project(&code)?
            .context("Project not found after insert")
    }

    pub fn get_project(&self, code: &str) -> Result<Option<Project>> {
        let row = self
            .conn
            .query_row(
                "SELECT code, name, description, created_at, updated_at FROM projects WHERE code = ?1",
                params![code],
                ProjectRow::from_row,
            )
            .optional()
            .context("Failed to query project")?;
        match row {
            Some(r) => Ok(Some(self.project_with_refs(r)?)),
            None => Ok(None),
        }
    }

    pub fn list_projects(&self) -> Result<Vec<Project>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT code, name, description, created_at, updated_at FROM projects ORDER BY id",
            )
            .context("Failed to prepare list_projects")?;
        let rows = stmt
            .query_map([], ProjectRow::from_row)
            .context("Failed to query projects")?;
        let mut projects = Vec::new();
        for row in rows {
            let r = row.context("Failed to read project row")?;
            projects.push(self.project_with_refs(r)?);
        }
        Ok(projects)
    }

    pub fn update_project(&self, code: &str, changes: &ProjectChanges) -> Result<Project> {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;

        let project_id = project_id(&tx, code)?.ok_or_else(|| TrackerError::ProjectNotFound {
            code: code.to_string(),
        })?;

        if let Some(n) = &changes.name {
            tx.execute(
                "UPDATE projects SET name = ?1, updated_at = datetime('now') WHERE id = ?2",
                params![n.trim(), project_id],
            )
            .context("Failed to update project name")?;
        }
        if let Some(d) = &changes.description {
            tx.execute(
                "UPDATE projects SET description = ?1, updated_at = datetime('now') WHERE id = ?2",
                params![d, project_id],
            )
            .context("Failed to update project description")?;
        }
        if let Some(users) = &changes.users {
            let member_ids = resolve_members(&tx, users)?;
            tx.execute(
                "DELETE FROM project_members WHERE project_id = ?1",
                params![project_id],
            )
            .context("Failed to clear project members")?;
            insert_members(&tx, project_id, &member_ids)?;
            tx.execute(
                "UPDATE projects SET updated_at = datetime('now') WHERE id = ?1",
                params![project_id],
            )
            .context("Failed to touch project")?;
        }

        tx.commit().context("Failed to commit project update")?;
        self.get_project(code)?
            .context("Project not found after update")
    }

    /// Delete a project together with the issues filed under it.
    pub fn delete_project(&self, code: &str) -> Result<bool> {
        let count = self
            .conn
            .execute("DELETE FROM projects WHERE code = ?1", params![code])
            .context("Failed to delete project")?;
        Ok(count > 0)
    }

    fn project_with_refs(&self, row: ProjectRow) -> Result<Project> {
        let users = self.string_column(
            "SELECT u.racfid FROM project_members m
             JOIN users u ON u.id = m.user_id
             JOIN projects p ON p.id = m.project_id
             WHERE p.code = ?1 ORDER BY m.rowid",
            &row.code,
        )?;
        let issues = self.string_column(
            "SELECT i.code FROM issues i
             JOIN projects p ON p.id = i.project_id
             WHERE p.code = ?1 ORDER BY i.id",
            &row.code,
        )?;
        Ok(Project {
            code: row.code,
            name: row.name,
            description: row.description,
            users,
            issues,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    // ── Issues ────────────────────────────────────────────────────────

    pub fn create_issue(&self, new: &NewIssue) -> Result<Issue> {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;

        let project_id = match &new.project {
            Some(code) => Some(project_id(&tx, code)?.ok_or_else(|| {
                TrackerError::ProjectNotFound {
                    code: code.to_string(),
                }
            })?),
            None => None,
        };

        let code = next_code(&tx, CodeKind::Issue)?;
        let lane = Lane {
            project_id,
            backlog: new.backlog,
            column: new.column,
        };
        let position = lane.len(&tx, None)?;

        tx.execute(
            "INSERT INTO issues (code, project_id, category, backlog, name, description, story_points, assignee, column_name, position)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                code,
                project_id,
                new.category.as_str(),
                new.backlog,
                new.name.trim(),
                new.description,
                new.story_points,
                new.assignee,
                new.column.as_str(),
                position,
            ],
        )
        .context("Failed to insert issue")?;
        tx.commit().context("Failed to commit issue insert")?;

        self.get_issue(&code)?.context("Issue not found after insert")
    }

    pub fn get_issue(&self, code: &str) -> Result<Option<Issue>> {
        let row = self
            .conn
            .query_row(
                &format!("{} WHERE i.code = ?1", ISSUE_SELECT),
                params![code],
                IssueRow::from_row,
            )
            .optional()
            .context("Failed to query issue")?;
        row.map(IssueRow::into_issue).transpose()
    }

    pub fn list_issues(&self, filter: &IssueFilter) -> Result<Vec<Issue>> {
        if let Some(code) = &filter.project {
            if project_id(&self.conn, code)?.is_none() {
                return Err(TrackerError::ProjectNotFound { code: code.clone() }.into());
            }
        }

        let mut stmt = self
            .conn
            .prepare(&format!(
                "{} WHERE (?1 IS NULL OR p.code = ?1) AND (?2 IS NULL OR i.backlog = ?2) ORDER BY i.id",
                ISSUE_SELECT
            ))
            .context("Failed to prepare list_issues")?;
        let rows = stmt
            .query_map(params![filter.project, filter.backlog], IssueRow::from_row)
            .context("Failed to query issues")?;
        let mut issues = Vec::new();
        for row in rows {
            let r = row.context("Failed to read issue row")?;
            issues.push(r.into_issue()?);
        }
        Ok(issues)
    }

    pub fn update_issue(&self, code: &str, changes: &IssueChanges) -> Result<Issue> {
        // All field updates land atomically.
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;

        let (id, _) = issue_lane(&tx, code)?.ok_or_else(|| TrackerError::IssueNotFound {
            code: code.to_string(),
        })?;

        if let Some(c) = &changes.category {
            tx.execute(
                "UPDATE issues SET category = ?1, updated_at = datetime('now') WHERE id = ?2",
                params![c.as_str(), id],
            )
            .context("Failed to update issue category")?;
        }
        if let Some(n) = &changes.name {
            tx.execute(
                "UPDATE issues SET name = ?1, updated_at = datetime('now') WHERE id = ?2",
                params![n.trim(), id],
            )
            .context("Failed to update issue name")?;
        }
        if let Some(d) = &changes.description {
            tx.execute(
                "UPDATE issues SET description = ?1, updated_at = datetime('now') WHERE id = ?2",
                params![d, id],
            )
            .context("Failed to update issue description")?;
        }
        if let Some(sp) = &changes.story_points {
            tx.execute(
                "UPDATE issues SET story_points = ?1, updated_at = datetime('now') WHERE id = ?2",
                params![sp, id],
            )
            .context("Failed to update issue story points")?;
        }
        if let Some(a) = &changes.assignee {
            tx.execute(
                "UPDATE issues SET assignee = ?1, updated_at = datetime('now') WHERE id = ?2",
                params![a, id],
            )
            .context("Failed to update issue assignee")?;
        }

        tx.commit().context("Failed to commit issue update")?;
        self.get_issue(code)?.context("Issue not found after update")
    }

    /// Drag-and-drop: take the issue out of its lane and insert it at
    /// `position` in the target lane, shifting neighbours on both sides.
    /// The position is clamped to the target lane's bounds.
    pub fn move_issue(
        &self,
        code: &str,
        column: IssueColumn,
        position: i64,
        backlog: Option<bool>,
    ) -> Result<Issue> {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;

        let (id, (from, from_position)) =
            issue_lane(&tx, code)?.ok_or_else(|| TrackerError::IssueNotFound {
                code: code.to_string(),
            })?;

        from.close_gap(&tx, from_position)?;

        let to = Lane {
            project_id: from.project_id,
            backlog: backlog.unwrap_or(from.backlog),
            column,
        };
        let position = position.clamp(0, to.len(&tx, Some(id))?);
        to.open_slot(&tx, position, id)?;

        tx.execute(
            "UPDATE issues SET backlog = ?1, column_name = ?2, position = ?3, updated_at = datetime('now') WHERE id = ?4",
            params![to.backlog, to.column.as_str(), position, id],
        )
        .context("Failed to move issue")?;

        tx.commit().context("Failed to commit issue move")?;
        self.get_issue(code)?.context("Issue not found after move")
    }

    pub fn delete_issue(&self, code: &str) -> Result<bool> {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;

        let Some((id, (lane, position))) = issue_lane(&tx, code)? else {
            return Ok(false);
        };
        tx.execute("DELETE FROM issues WHERE id = ?1", params![id])
            .context("Failed to delete issue")?;
        lane.close_gap(&tx, position)?;

        tx.commit().context("Failed to commit issue delete")?;
        Ok(true)
    }

    // ── Board view ────────────────────────────────────────────────────

    pub fn get_board(&self, project_code: &str) -> Result<BoardView> {
        let project =
            self.get_project(project_code)?
                .ok_or_else(|| TrackerError::ProjectNotFound {
                    code: project_code.to_string(),
                })?;

        let all_issues = self.list_issues(&IssueFilter {
            project: Some(project_code.to_string()),
            backlog: None,
        })?;

        let column_index = |c: IssueColumn| IssueColumn::ALL.iter().position(|x| *x == c);

        let mut backlog: Vec<Issue> = all_issues.iter().filter(|i| i.backlog).cloned().collect();
        backlog.sort_by_key(|i| (column_index(i.column), i.position));

        let mut columns = Vec::new();
        for col in IssueColumn::ALL {
            let mut col_issues: Vec<Issue> = all_issues
                .iter()
                .filter(|i| !i.backlog && i.column == col)
                .cloned()
                .collect();
            col_issues.sort_by_key(|i| i.position);
            columns.push(ColumnView {
                name: col,
                issues: col_issues,
            });
        }

        Ok(BoardView {
            project,
            backlog,
            columns,
        })
    }

    fn string_column(&self, sql: &str, key: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(sql).context("Failed to prepare lookup")?;
        let rows = stmt
            .query_map(params![key], |row| row.get(0))
            .context("Failed to run lookup")?;
        let mut values = Vec::new();
        for row in rows {
            values.push(row.context("Failed to read lookup row")?);
        }
        Ok(values)
    }
}

// ── Helpers ───────────────────────────────────────────────────────────

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn count_rows(conn: &Connection, kind: CodeKind) -> Result<u64> {
    let sql = match kind {
        CodeKind::User => "SELECT COUNT(*) FROM users",
        CodeKind::Issue => "SELECT COUNT(*) FROM issues",
        CodeKind::Project => "SELECT COUNT(*) FROM projects",
    };
    let count: i64 = conn
        .query_row(sql, [], |row| row.get(0))
        .context("Failed to count rows")?;
    Ok(count as u64)
}

fn code_taken(conn: &Connection, kind: CodeKind, code: &str) -> Result<bool> {
    let sql = match kind {
        CodeKind::User => "SELECT COUNT(*) > 0 FROM users WHERE racfid = ?1",
        CodeKind::Issue => "SELECT COUNT(*) > 0 FROM issues WHERE code = ?1",
        CodeKind::Project => "SELECT COUNT(*) > 0 FROM projects WHERE code = ?1",
    };
    conn.query_row(sql, params![code], |row| row.get(0))
        .context("Failed to probe code")
}

/// Next free code of `kind`, seeded from the current row count.
fn next_code(conn: &Connection, kind: CodeKind) -> Result<String> {
    let count = count_rows(conn, kind)?;
    generate_unique_code(kind, count, |code| code_taken(conn, kind, code))
}

fn user_id(conn: &Connection, racfid: &str) -> Result<Option<i64>> {
    conn.query_row(
        "SELECT id FROM users WHERE racfid = ?1",
        params![racfid],
        |row| row.get(0),
    )
    .optional()
    .context("Failed to look up user")
}

fn email_owner(conn: &Connection, email: &str) -> Result<Option<i64>> {
    conn.query_row(
        "SELECT id FROM users WHERE email = ?1",
        params![email],
        |row| row.get(0),
    )
    .optional()
    .context("Failed to look up email")
}

fn project_id(conn: &Connection, code: &str) -> Result<Option<i64>> {
    conn.query_row(
        "SELECT id FROM projects WHERE code = ?1",
        params![code],
        |row| row.get(0),
    )
    .optional()
    .context("Failed to look up project")
}

/// Map RACFIDs to user ids, rejecting an empty list or unknown users.
/// Duplicates collapse to their first occurrence.
fn resolve_members(conn: &Connection, racfids: &[String]) -> Result<Vec<i64>> {
    if racfids.is_empty() {
        return Err(TrackerError::field("users", "A project needs at least one user").into());
    }
    let mut ids = Vec::with_capacity(racfids.len());
    for racfid in racfids {
        let id = user_id(conn, racfid)?
            .ok_or_else(|| TrackerError::field("users", format!("Unknown user {}", racfid)))?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

fn insert_members(conn: &Connection, project_id: i64, user_ids: &[i64]) -> Result<()> {
    for user_id in user_ids {
        conn.execute(
            "INSERT INTO project_members (project_id, user_id) VALUES (?1, ?2)",
            params![project_id, user_id],
        )
        .context("Failed to insert project member")?;
    }
    Ok(())
}

/// A board lane: issues sharing project, backlog flag and column.
/// Positions within a lane are dense from zero.
#[derive(Debug, Clone, Copy)]
struct Lane {
    project_id: Option<i64>,
    backlog: bool,
    column: IssueColumn,
}

impl Lane {
    /// Number of issues in the lane, optionally ignoring one issue.
    fn len(&self, conn: &Connection, excluding: Option<i64>) -> Result<i64> {
        conn.query_row(
            "SELECT COUNT(*) FROM issues
             WHERE project_id IS ?1 AND backlog = ?2 AND column_name = ?3 AND (?4 IS NULL OR id != ?4)",
            params![self.project_id, self.backlog, self.column.as_str(), excluding],
            |row| row.get(0),
        )
        .context("Failed to count lane")
    }

    fn close_gap(&self, conn: &Connection, position: i64) -> Result<()> {
        conn.execute(
            "UPDATE issues SET position = position - 1
             WHERE project_id IS ?1 AND backlog = ?2 AND column_name = ?3 AND position > ?4",
            params![self.project_id, self.backlog, self.column.as_str(), position],
        )
        .context("Failed to close lane gap")?;
        Ok(())
    }

    fn open_slot(&self, conn: &Connection, position: i64, moving: i64) -> Result<()> {
        conn.execute(
            "UPDATE issues SET position = position + 1
             WHERE project_id IS ?1 AND backlog = ?2 AND column_name = ?3 AND position >= ?4 AND id != ?5",
            params![self.project_id, self.backlog, self.column.as_str(), position, moving],
        )
        .context("Failed to open lane slot")?;
        Ok(())
    }
}

/// Row id, lane and position of an issue.
fn issue_lane(conn: &Connection, code: &str) -> Result<Option<(i64, (Lane, i64))>> {
    let row: Option<(i64, Option<i64>, bool, String, i64)> = conn
        .query_row(
            "SELECT id, project_id, backlog, column_name, position FROM issues WHERE code = ?1",
            params![code],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
        )
        .optional()
        .context("Failed to look up issue")?;
    let Some((id, project_id, backlog, column_name, position)) = row else {
        return Ok(None);
    };
    let column = IssueColumn::from_str(&column_name)
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to parse issue column")?;
    Ok(Some((
        id,
        (
            Lane {
                project_id,
                backlog,
                column,
            },
            position,
        ),
    )))
}

// ── Row types ─────────────────────────────────────────────────────────

struct UserRow {
    racfid: String,
    email: String,
    name: String,
    created_at: String,
    updated_at: String,
}

impl UserRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            racfid: row.get(0)?,
            email: row.get(1)?,
            name: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }
}

struct ProjectRow {
    code: String,
    name: String,
    description: String,
    created_at: String,
    updated_at: String,
}

impl ProjectRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            code: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }
}

const ISSUE_SELECT: &str = "SELECT i.code, p.code, i.category, i.backlog, i.name, i.description, i.story_points, i.assignee, i.column_name, i.position, i.created_at, i.updated_at
     FROM issues i LEFT JOIN projects p ON p.id = i.project_id";

/// Intermediate row struct for issues.
struct IssueRow {
    code: String,
    project: Option<String>,
    category: String,
    backlog: bool,
    name: String,
    description: String,
    story_points: Option<u32>,
    assignee: Option<String>,
    column_name: String,
    position: i64,
    created_at: String,
    updated_at: String,
}

impl IssueRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            code: row.get(0)?,
            project: row.get(1)?,
            category: row.get(2)?,
            backlog: row.get(3)?,
            name: row.get(4)?,
            description: row.get(5)?,
            story_points: row.get(6)?,
            assignee: row.get(7)?,
            column_name: row.get(8)?,
            position: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }

    fn into_issue(self) -> Result<Issue> {
        let column = IssueColumn::from_str(&self.column_name)
            .map_err(|e| anyhow::anyhow!(e))
            .context("Failed to parse issue column")?;
        let category = IssueCategory::from_str(&self.category)
            .map_err(|e| anyhow::anyhow!(e))
            .context("Failed to parse issue category")?;

        Ok(Issue {
            code: self.code,
            project: self.project,
            category,
            backlog: self.backlog,
            name: self.name,
            description: self.description,
            story_points: self.story_points,
            assignee: self.assignee,
            column,
            position: self.position,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
