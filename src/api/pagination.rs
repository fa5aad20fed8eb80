//! Page-number pagination with `page` and `limit` query parameters.

use crate::errors::{Error, Result};
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait, Select};
use serde::Serialize;
use url::Url;

/// Page size when `limit` is absent or unusable.
pub const DEFAULT_PAGE_SIZE: u64 = 6;
/// Largest page size a client may ask for.
pub const MAX_PAGE_SIZE: u64 = 30;

/// A validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    /// Reads `page` and `limit` from raw query pairs.
    ///
    /// A `limit` that is not a positive number falls back to the default and a
    /// larger one is capped.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] if `page` is present but not a positive number.
    pub fn from_query(pairs: &[(String, String)]) -> Result<Self> {
        let value = |name: &str| {
            pairs
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, v)| v.as_str())
        };

        let page = match value("page") {
            None => 1,
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|p| *p >= 1)
                .ok_or_else(|| invalid_page(raw))?,
        };
        let limit = value("limit")
            .and_then(|raw| raw.parse::<u64>().ok())
            .filter(|l| *l >= 1)
            .map_or(DEFAULT_PAGE_SIZE, |l| l.min(MAX_PAGE_SIZE));

        Ok(Self { page, limit })
    }
}

fn invalid_page(page: &str) -> Error {
    Error::NotFound {
        resource: "Page",
        id: page.to_string(),
    }
}

/// The paginated response envelope.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    /// Total number of matching rows.
    pub count: u64,
    /// Absolute URL of the next page, if any.
    pub next: Option<String>,
    /// Absolute URL of the previous page, if any.
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// Where a fetched page sits in the full result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageInfo {
    /// Total number of matching rows.
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
}

impl PageInfo {
    #[must_use]
    pub fn into_page<T>(self, results: Vec<T>) -> Page<T> {
        Page {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results,
        }
    }
}

/// Runs `select` for one page and works out the neighbouring page links.
///
/// `request_url` is the absolute URL of the current request; its other query
/// parameters are kept in the `next` and `previous` links.
///
/// # Errors
/// Returns [`Error::NotFound`] for a page past the end. The first page of an
/// empty result is still valid.
pub async fn fetch_page<E>(
    db: &DatabaseConnection,
    select: Select<E>,
    request: PageRequest,
    request_url: &Url,
) -> Result<(Vec<E::Model>, PageInfo)>
where
    E: EntityTrait,
    E::Model: Send + Sync + 'static,
{
    let paginator = select.paginate(db, request.limit);
    let count = paginator.num_items().await?;
    let pages = count.div_ceil(request.limit).max(1);
    if request.page > pages {
        return Err(invalid_page(&request.page.to_string()));
    }

    let items = paginator.fetch_page(request.page - 1).await?;
    let next = (request.page < pages).then(|| page_url(request_url, request.page + 1));
    let previous = (request.page > 1).then(|| page_url(request_url, request.page - 1));
    Ok((items, PageInfo { count, next, previous }))
}

/// Rewrites the `page` parameter of `base`, dropping it for the first page.
fn page_url(base: &Url, page: u64) -> String {
    let kept: Vec<(String, String)> = base
        .query_pairs()
        .filter(|(key, _)| key != "page")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut url = base.clone();
    url.set_query(None);
    if !kept.is_empty() || page > 1 {
        let mut query = url.query_pairs_mut();
        query.extend_pairs(kept);
        if page > 1 {
            query.append_pair("page", &page.to_string());
        }
    }
    url.to_string()
}
