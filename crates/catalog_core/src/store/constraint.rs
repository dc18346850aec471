//! Constraint classifier for failed writes.
//!
//! # Responsibility
//! - Decide which constraint family a write failure belongs to.
//! - Confirm the specific invariant with follow-up existence lookups and
//!   return the matching sentinel.
//!
//! # Invariants
//! - Structured SQLite extended result codes are preferred; message text is
//!   only consulted when the error carries no constraint code.
//! - Classification is advisory: the lookups run after the failed write, so a
//!   concurrent writer can change the answer. A miss returns `None` and the
//!   caller keeps the original error.

use super::error::StoreError;
use log::{debug, warn};
use rusqlite::{ffi, Connection, ErrorCode};

/// Constraint family a failed write tripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConstraintKind {
    ForeignKey,
    Unique,
}

/// Classifies a write error by constraint family.
pub(crate) fn constraint_kind(err: &rusqlite::Error) -> Option<ConstraintKind> {
    if let rusqlite::Error::SqliteFailure(failure, _) = err {
        match failure.extended_code {
            ffi::SQLITE_CONSTRAINT_FOREIGNKEY => return Some(ConstraintKind::ForeignKey),
            ffi::SQLITE_CONSTRAINT_PRIMARYKEY | ffi::SQLITE_CONSTRAINT_UNIQUE => {
                return Some(ConstraintKind::Unique)
            }
            _ if failure.code == ErrorCode::ConstraintViolation => {}
            _ => return None,
        }
    }
    constraint_kind_from_message(&err.to_string())
}

/// Message heuristics for drivers that only report text.
pub(crate) fn constraint_kind_from_message(message: &str) -> Option<ConstraintKind> {
    let lowered = message.to_lowercase();
    if lowered.contains("foreign key") {
        return Some(ConstraintKind::ForeignKey);
    }
    if lowered.contains("unique") || lowered.contains("duplicate key") {
        return Some(ConstraintKind::Unique);
    }
    None
}

/// Which lookup outcome confirms a probe's sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConfirmWhen {
    RowExists,
    RowMissing,
}

/// One candidate explanation for a failed write.
pub(crate) struct Probe<'a> {
    /// `SELECT EXISTS(...)` taking a single key parameter.
    exists_sql: &'static str,
    key: &'a str,
    confirm_when: ConfirmWhen,
    sentinel: StoreError,
}

impl<'a> Probe<'a> {
    pub fn row_exists(exists_sql: &'static str, key: &'a str, sentinel: StoreError) -> Self {
        Self {
            exists_sql,
            key,
            confirm_when: ConfirmWhen::RowExists,
            sentinel,
        }
    }

    pub fn row_missing(exists_sql: &'static str, key: &'a str, sentinel: StoreError) -> Self {
        Self {
            exists_sql,
            key,
            confirm_when: ConfirmWhen::RowMissing,
            sentinel,
        }
    }
}

/// Runs probes in order and returns the first confirmed sentinel.
///
/// Stops at the first lookup failure: a broken lookup cannot confirm anything.
pub(crate) fn resolve<'a>(
    conn: &Connection,
    op: &'static str,
    probes: impl IntoIterator<Item = Probe<'a>>,
) -> Option<StoreError> {
    for probe in probes {
        let exists = match conn.query_row(probe.exists_sql, [probe.key], |row| {
            row.get::<_, i64>(0)
        }) {
            Ok(value) => value == 1,
            Err(err) => {
                warn!("event=constraint_classify module=store op=\"{op}\" status=error error={err}");
                return None;
            }
        };

        let confirmed = match probe.confirm_when {
            ConfirmWhen::RowExists => exists,
            ConfirmWhen::RowMissing => !exists,
        };
        if confirmed {
            debug!(
                "event=constraint_classify module=store op=\"{op}\" status=ok sentinel={:?}",
                probe.sentinel.kind()
            );
            return Some(probe.sentinel);
        }
    }

    warn!("event=constraint_classify module=store op=\"{op}\" status=unmatched");
    None
}

#[cfg(test)]
mod tests {
    use super::{constraint_kind, constraint_kind_from_message, ConstraintKind};
    use rusqlite::ffi;

    fn failure(code: i32, message: &str) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(ffi::Error::new(code), Some(message.to_string()))
    }

    #[test]
    fn extended_codes_are_preferred_over_text() {
        let fk = failure(ffi::SQLITE_CONSTRAINT_FOREIGNKEY, "constraint failed");
        assert_eq!(constraint_kind(&fk), Some(ConstraintKind::ForeignKey));

        let pk = failure(ffi::SQLITE_CONSTRAINT_PRIMARYKEY, "foreign key text is ignored");
        assert_eq!(constraint_kind(&pk), Some(ConstraintKind::Unique));

        let unique = failure(ffi::SQLITE_CONSTRAINT_UNIQUE, "constraint failed");
        assert_eq!(constraint_kind(&unique), Some(ConstraintKind::Unique));
    }

    #[test]
    fn generic_constraint_code_falls_back_to_text() {
        let err = failure(ffi::SQLITE_CONSTRAINT, "FOREIGN KEY constraint failed");
        assert_eq!(constraint_kind(&err), Some(ConstraintKind::ForeignKey));
    }

    #[test]
    fn non_constraint_failures_are_not_classified() {
        let busy = failure(ffi::SQLITE_BUSY, "database is locked by a unique writer");
        assert_eq!(constraint_kind(&busy), None);
        assert_eq!(constraint_kind(&rusqlite::Error::QueryReturnedNoRows), None);
    }

    #[test]
    fn text_heuristics_cover_common_dialects() {
        assert_eq!(
            constraint_kind_from_message(
                "insert or update on table violates foreign key constraint"
            ),
            Some(ConstraintKind::ForeignKey)
        );
        assert_eq!(
            constraint_kind_from_message("duplicate key value violates unique constraint"),
            Some(ConstraintKind::Unique)
        );
        assert_eq!(
            constraint_kind_from_message("UNIQUE constraint failed: catalog_items.id"),
            Some(ConstraintKind::Unique)
        );
        assert_eq!(constraint_kind_from_message("disk I/O error"), None);
    }
}
