//! Route handlers, grouped by resource.

pub mod catalog;
pub mod links;
pub mod recipes;
pub mod tokens;
pub mod users;

use crate::errors::{Error, Result};
use axum::extract::{Path, rejection::PathRejection};

/// Path parameters whose parse failure is turned into a JSON 404 by `?`.
pub(crate) type PathParam<T> = std::result::Result<Path<T>, PathRejection>;

/// Looks up a single query parameter.
pub(crate) fn query_value<'a>(pairs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

/// Parses `recipes_limit`, which must be a positive integer when present.
pub(crate) fn recipes_limit(pairs: &[(String, String)]) -> Result<Option<u64>> {
    query_value(pairs, "recipes_limit")
        .map(|raw| {
            raw.parse::<u64>()
                .ok()
                .filter(|limit| *limit >= 1)
                .ok_or_else(|| {
                    Error::validation("recipes_limit", "Ensure this value is a positive integer.")
                })
        })
        .transpose()
}
