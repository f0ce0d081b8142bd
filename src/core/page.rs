//! Page-by-page access to collections.
//!
//! [`paginate`] windows an in-memory slice without sorting it; [`fetch_page`]
//! does the same for a database query using `OFFSET`/`LIMIT`. Both produce the
//! same [`Page`] shape so callers cannot tell which one served them.

use crate::errors::Result;
use sea_orm::{ConnectionTrait, EntityTrait, PaginatorTrait, QuerySelect, Select};
use serde::Serialize;

/// Which page to return. A size of zero means "unpaged": everything in one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageRequest {
    page: u64,
    size: Option<u64>,
}

impl PageRequest {
    /// Requests page `page` (zero-based) of `size` elements.
    #[must_use]
    pub const fn of(page: u64, size: u64) -> Self {
        if size == 0 {
            Self::unpaged()
        } else {
            Self {
                page,
                size: Some(size),
            }
        }
    }

    /// Requests the whole collection as a single page.
    #[must_use]
    pub const fn unpaged() -> Self {
        Self {
            page: 0,
            size: None,
        }
    }

    /// Zero-based page number.
    #[must_use]
    pub const fn page(&self) -> u64 {
        self.page
    }

    /// Elements per page, `None` when unpaged.
    #[must_use]
    pub const fn size(&self) -> Option<u64> {
        self.size
    }

    /// Whether the request asks for a bounded page.
    #[must_use]
    pub const fn is_paged(&self) -> bool {
        self.size.is_some()
    }

    /// Index of the first element of the page, saturating on overflow.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        match self.size {
            Some(size) => self.page.saturating_mul(size),
            None => 0,
        }
    }
}

/// One page of a larger collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    /// Elements of this page, in collection order
    pub items: Vec<T>,
    /// The request that produced this page
    #[serde(skip)]
    pub request: PageRequest,
    /// Size of the whole collection
    pub total_items: u64,
    /// Number of pages the collection spans
    pub total_pages: u64,
}

impl<T> Page<T> {
    /// Builds a page from already-windowed items and the collection size.
    #[must_use]
    pub fn from_parts(items: Vec<T>, request: PageRequest, total_items: u64) -> Self {
        let total_pages = match request.size {
            Some(size) => total_items.div_ceil(size),
            None => u64::from(total_items > 0),
        };
        Self {
            items,
            request,
            total_items,
            total_pages,
        }
    }

    /// Whether this page holds no element.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Returns the requested window of `collection`.
///
/// Does not sort and does not touch the input. A page past the end is empty
/// but still reports the real page count.
#[must_use]
pub fn paginate<T: Clone>(collection: &[T], request: PageRequest) -> Page<T> {
    let total_items = collection.len() as u64;
    let items = match request.size {
        None => collection.to_vec(),
        Some(size) => {
            let skip = usize::try_from(request.offset()).unwrap_or(usize::MAX);
            let take = usize::try_from(size).unwrap_or(usize::MAX);
            collection.iter().skip(skip).take(take).cloned().collect()
        }
    };
    Page::from_parts(items, request, total_items)
}

/// Largest `OFFSET`/`LIMIT` the SQL drivers accept (signed 64-bit).
const MAX_SQL_BOUND: u64 = i64::MAX.unsigned_abs();

/// Runs `select` for one page, counting the full result set alongside.
///
/// A page past the end is answered without querying the rows.
pub(crate) async fn fetch_page<C, E>(
    db: &C,
    select: Select<E>,
    request: PageRequest,
) -> Result<Page<E::Model>>
where
    C: ConnectionTrait,
    E: EntityTrait,
    E::Model: Sync + 'static,
{
    let total_items = select.clone().count(db).await?;
    let items = match request.size {
        None => select.all(db).await?,
        Some(_) if request.offset() >= total_items => Vec::new(),
        Some(size) => {
            select
                .offset(request.offset())
                .limit(size.min(MAX_SQL_BOUND))
                .all(db)
                .await?
        }
    };
    Ok(Page::from_parts(items, request, total_items))
}
