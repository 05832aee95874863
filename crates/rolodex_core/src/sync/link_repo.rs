//! External-link repository contract and SQLite implementation.
//!
//! # Responsibility
//! - CRUD over `sync_links`, the engine-owned pairing table.
//!
//! # Invariants
//! - One link per interaction (unique index); link ids are synthetic.
//! - Read paths reject invalid persisted timestamps instead of masking
//!   them.

use crate::db::DbError;
use crate::model::relation::ExternalLink;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type LinkRepoResult<T> = Result<T, LinkRepoError>;

/// Repository error for sync-link persistence.
#[derive(Debug)]
pub enum LinkRepoError {
    Db(DbError),
    NotFound(String),
    InvalidData(String),
}

impl Display for LinkRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "sync link not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted sync link: {message}"),
        }
    }
}

impl Error for LinkRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for LinkRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for LinkRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository contract for engine-owned external links.
pub trait SyncLinkRepository {
    fn create_link(&self, link: &ExternalLink) -> LinkRepoResult<()>;
    fn update_link(&self, link: &ExternalLink) -> LinkRepoResult<()>;
    fn delete_link(&self, id: &str) -> LinkRepoResult<()>;
    fn get_link_for_interaction(&self, interaction_id: &str)
        -> LinkRepoResult<Option<ExternalLink>>;
    /// Lists every link in id order; the engine visits them one pass at a
    /// time.
    fn list_links(&self) -> LinkRepoResult<Vec<ExternalLink>>;
}

const LINK_SELECT_SQL: &str = "SELECT
    id,
    interaction_id,
    calendar_event_id,
    last_synced_at,
    last_external_modified_at,
    updated_at
FROM sync_links";

/// SQLite-backed sync-link repository.
pub struct SqliteSyncLinkRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSyncLinkRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl SyncLinkRepository for SqliteSyncLinkRepository<'_> {
    fn create_link(&self, link: &ExternalLink) -> LinkRepoResult<()> {
        self.conn.execute(
            "INSERT INTO sync_links (
                id,
                interaction_id,
                calendar_event_id,
                last_synced_at,
                last_external_modified_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                link.id.as_str(),
                link.interaction_id.as_str(),
                link.calendar_event_id.as_str(),
                link.last_synced_at.map(|t| t.to_rfc3339()),
                link.last_external_modified_at.map(|t| t.to_rfc3339()),
                link.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn update_link(&self, link: &ExternalLink) -> LinkRepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE sync_links
             SET
                interaction_id = ?1,
                calendar_event_id = ?2,
                last_synced_at = ?3,
                last_external_modified_at = ?4,
                updated_at = ?5
             WHERE id = ?6;",
            params![
                link.interaction_id.as_str(),
                link.calendar_event_id.as_str(),
                link.last_synced_at.map(|t| t.to_rfc3339()),
                link.last_external_modified_at.map(|t| t.to_rfc3339()),
                link.updated_at.to_rfc3339(),
                link.id.as_str(),
            ],
        )?;

        if changed == 0 {
            return Err(LinkRepoError::NotFound(link.id.clone()));
        }
        Ok(())
    }

    fn delete_link(&self, id: &str) -> LinkRepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM sync_links WHERE id = ?1;", params![id])?;
        if changed == 0 {
            return Err(LinkRepoError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn get_link_for_interaction(
        &self,
        interaction_id: &str,
    ) -> LinkRepoResult<Option<ExternalLink>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{LINK_SELECT_SQL} WHERE interaction_id = ?1;"))?;
        let link = stmt
            .query_row(params![interaction_id], parse_link_row)
            .optional()?;
        link.transpose()
    }

    fn list_links(&self) -> LinkRepoResult<Vec<ExternalLink>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{LINK_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut links = Vec::new();
        while let Some(row) = rows.next()? {
            links.push(parse_link_row(row).map_err(LinkRepoError::from)??);
        }
        Ok(links)
    }
}

fn parse_link_row(row: &Row<'_>) -> rusqlite::Result<LinkRepoResult<ExternalLink>> {
    let id: String = row.get("id")?;
    let interaction_id: String = row.get("interaction_id")?;
    let calendar_event_id: String = row.get("calendar_event_id")?;
    let last_synced_at: Option<String> = row.get("last_synced_at")?;
    let last_external_modified_at: Option<String> = row.get("last_external_modified_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(build_link(
        id,
        interaction_id,
        calendar_event_id,
        last_synced_at,
        last_external_modified_at,
        updated_at,
    ))
}

fn build_link(
    id: String,
    interaction_id: String,
    calendar_event_id: String,
    last_synced_at: Option<String>,
    last_external_modified_at: Option<String>,
    updated_at: String,
) -> LinkRepoResult<ExternalLink> {
    Ok(ExternalLink {
        last_synced_at: parse_optional_timestamp(&id, "last_synced_at", last_synced_at)?,
        last_external_modified_at: parse_optional_timestamp(
            &id,
            "last_external_modified_at",
            last_external_modified_at,
        )?,
        updated_at: parse_timestamp(&id, "updated_at", &updated_at)?,
        id,
        interaction_id,
        calendar_event_id,
    })
}

fn parse_timestamp(link_id: &str, column: &str, value: &str) -> LinkRepoResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|err| {
            LinkRepoError::InvalidData(format!(
                "link {link_id}: column {column} holds `{value}`: {err}"
            ))
        })
}

fn parse_optional_timestamp(
    link_id: &str,
    column: &str,
    value: Option<String>,
) -> LinkRepoResult<Option<DateTime<Utc>>> {
    value
        .map(|raw| parse_timestamp(link_id, column, &raw))
        .transpose()
}
