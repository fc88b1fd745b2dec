//! Asset gallery: paginated, searchable listing over one catalog category.
//!
//! Every category or debounced-search change bumps an epoch. A fetch records
//! the epoch it was issued under and commits only if the epoch is unchanged
//! when the response arrives, so a slow response for an old selection can never
//! overwrite a newer one. Requests are never cancelled; stale ones are dropped.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::RwLock;

use crate::backend::Backend;
use crate::errors::AppError;
use crate::models::asset::{Asset, Category};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Results committed; `added` assets were appended or replaced.
    Committed { added: usize },
    /// The selection changed while the request was in flight.
    Stale,
    /// A newer keystroke superseded this search before the debounce elapsed.
    Debounced,
    /// Nothing to do (same selection, no more pages, or a fetch already running).
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct GallerySnapshot {
    pub category: Category,
    pub search: String,
    pub assets: Vec<Asset>,
    pub page: u32,
    pub has_more: bool,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug)]
struct GalleryState {
    category: Category,
    /// Raw search box contents.
    search_input: String,
    /// Search term actually sent to the backend.
    search: String,
    assets: Vec<Asset>,
    page: u32,
    has_more: bool,
    loading: bool,
    error: Option<String>,
    epoch: u64,
    keystroke: u64,
}

/// A page fetch claimed under the state lock, tagged with the epoch it belongs to.
struct PageRequest {
    category: Category,
    search: String,
    page: u32,
    epoch: u64,
}

impl GalleryState {
    fn begin(&mut self, page: u32) -> PageRequest {
        self.loading = true;
        PageRequest {
            category: self.category,
            search: self.search.clone(),
            page,
            epoch: self.epoch,
        }
    }
}

#[derive(Clone)]
pub struct AssetGallery {
    backend: Arc<dyn Backend>,
    debounce: Duration,
    state: Arc<RwLock<GalleryState>>,
}

impl AssetGallery {
    pub fn new(backend: Arc<dyn Backend>, category: Category, debounce: Duration) -> Self {
        Self {
            backend,
            debounce,
            state: Arc::new(RwLock::new(GalleryState {
                category,
                search_input: String::new(),
                search: String::new(),
                assets: Vec::new(),
                page: 0,
                has_more: false,
                loading: false,
                error: None,
                epoch: 0,
                keystroke: 0,
            })),
        }
    }

    pub async fn snapshot(&self) -> GallerySnapshot {
        let s = self.state.read().await;
        GallerySnapshot {
            category: s.category,
            search: s.search.clone(),
            assets: s.assets.clone(),
            page: s.page,
            has_more: s.has_more,
            loading: s.loading,
            error: s.error.clone(),
        }
    }

    /// Switch category: reset to page 1 and refetch.
    pub async fn select_category(&self, category: Category) -> Result<FetchOutcome, AppError> {
        let request = {
            let mut s = self.state.write().await;
            if s.category == category && s.page > 0 {
                return Ok(FetchOutcome::Skipped);
            }
            s.category = category;
            s.epoch += 1;
            s.assets.clear();
            s.page = 0;
            s.has_more = false;
            s.error = None;
            s.begin(1)
        };
        tracing::debug!(category = %category, "gallery category selected");
        self.fetch_page(request).await
    }

    /// Record a keystroke. After the debounce interval, if no newer keystroke
    /// arrived and the term changed, reset to page 1 and refetch.
    pub async fn set_search(&self, term: &str) -> Result<FetchOutcome, AppError> {
        let ticket = {
            let mut s = self.state.write().await;
            s.search_input = term.to_string();
            s.keystroke += 1;
            s.keystroke
        };

        tokio::time::sleep(self.debounce).await;

        let request = {
            let mut s = self.state.write().await;
            if s.keystroke != ticket {
                return Ok(FetchOutcome::Debounced);
            }
            let settled = s.search_input.trim().to_string();
            if settled == s.search && s.page > 0 {
                return Ok(FetchOutcome::Skipped);
            }
            s.search = settled;
            s.epoch += 1;
            s.page = 0;
            s.has_more = false;
            s.begin(1)
        };
        self.fetch_page(request).await
    }

    /// Refetch page 1 of the current selection.
    pub async fn refresh(&self) -> Result<FetchOutcome, AppError> {
        let request = self.state.write().await.begin(1);
        self.fetch_page(request).await
    }

    /// Append the next page, if the server reported one. At most one append
    /// is in flight at a time.
    pub async fn load_more(&self) -> Result<FetchOutcome, AppError> {
        let request = {
            let mut s = self.state.write().await;
            if !s.has_more || s.loading {
                return Ok(FetchOutcome::Skipped);
            }
            let next = s.page + 1;
            s.begin(next)
        };
        self.fetch_page(request).await
    }

    async fn fetch_page(&self, request: PageRequest) -> Result<FetchOutcome, AppError> {
        let PageRequest {
            category,
            search,
            page,
            epoch,
        } = request;

        let search = Some(search.as_str()).filter(|t| !t.is_empty());
        let result = self.backend.list_resources(category, page, search).await;

        let mut s = self.state.write().await;
        if s.epoch != epoch {
            tracing::debug!(
                category = %category,
                current = %s.category,
                page,
                "discarding stale gallery response"
            );
            return Ok(FetchOutcome::Stale);
        }
        s.loading = false;

        match result {
            Ok(listing) => {
                let assets: Vec<Asset> = listing
                    .data
                    .into_iter()
                    .map(|record| Asset::from_record(category, record))
                    .collect();
                let added = assets.len();
                if page <= 1 {
                    s.assets = assets;
                } else {
                    s.assets.extend(assets);
                }
                s.page = listing.meta.current_page;
                s.has_more = listing.meta.has_more();
                s.error = None;
                tracing::debug!(category = %category, page, added, has_more = s.has_more, "gallery page committed");
                Ok(FetchOutcome::Committed { added })
            }
            Err(e) => {
                tracing::warn!(category = %category, page, error = %e, "gallery fetch failed");
                s.error = Some(e.to_string());
                Err(e)
            }
        }
    }
}
