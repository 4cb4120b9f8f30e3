use sqlx::error::DatabaseError;

use crate::application::repos::RepoError;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const INTEGRITY_CLASS: &str = "23";
const INVALID_TEXT_REPRESENTATION: &str = "22P02";
const STRING_DATA_RIGHT_TRUNCATION: &str = "22001";
const QUERY_CANCELED: &str = "57014";

/// Translate a sqlx failure into the repository error surface, keyed on the
/// Postgres SQLSTATE of database errors.
pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::PoolTimedOut => RepoError::Timeout,
        sqlx::Error::Database(db) => map_database_error(db.as_ref()),
        other => RepoError::from_persistence(other),
    }
}

fn map_database_error(db: &dyn DatabaseError) -> RepoError {
    let code = db.code().unwrap_or_default();
    match code.as_ref() {
        UNIQUE_VIOLATION => RepoError::Duplicate {
            constraint: db.constraint().unwrap_or("unknown").to_string(),
        },
        FOREIGN_KEY_VIOLATION | INVALID_TEXT_REPRESENTATION | STRING_DATA_RIGHT_TRUNCATION => {
            RepoError::InvalidInput {
                message: db.message().to_string(),
            }
        }
        QUERY_CANCELED => RepoError::Timeout,
        other if other.starts_with(INTEGRITY_CLASS) => RepoError::Integrity {
            message: db.message().to_string(),
        },
        _ => RepoError::from_persistence(db.message()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_rows_and_pool_timeouts() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::RowNotFound),
            RepoError::NotFound
        ));
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolTimedOut),
            RepoError::Timeout
        ));
    }

    #[test]
    fn other_failures_are_persistence_errors() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolClosed),
            RepoError::Persistence(_)
        ));
    }
}
