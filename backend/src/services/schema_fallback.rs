//! Degrade list reads when the database lags behind the code.
//!
//! A deployment whose migrations have not caught up reports missing tables or
//! columns as [`RepositoryError::SchemaError`]. For optional catalog data the
//! services answer with an empty list instead of failing the whole page.

use crate::db::repository::{RepositoryError, RepositoryResult};
use crate::error::AppResult;

/// `Ok(vec![])` on a schema error, the repository result otherwise.
pub fn or_empty<T>(result: RepositoryResult<Vec<T>>, what: &str) -> AppResult<Vec<T>> {
    or_default(result, what)
}

/// Like [`or_empty`] for any value with a meaningful default.
pub fn or_default<T: Default>(result: RepositoryResult<T>, what: &str) -> AppResult<T> {
    match result {
        Ok(value) => Ok(value),
        Err(RepositoryError::SchemaError { message, .. }) => {
            log::warn!(
                "Schema mismatch while listing {}, returning empty result: {}",
                what,
                message
            );
            Ok(T::default())
        }
        Err(e) => Err(e.into()),
    }
}
