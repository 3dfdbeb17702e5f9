use std::path::Path;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::config::FetchConfig;
use crate::error::{FetchError, Result};
use crate::models::{ApiStats, PageResponse, Pagination, SosRecord};

/// Anything that can serve page `page` (1-based) of `limit` records.
///
/// A `success: false` payload is returned as-is; the fetch loop decides
/// what it means.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, page: u32, limit: u32) -> Result<PageResponse>;
}

#[async_trait]
impl<S: PageSource + ?Sized> PageSource for Box<S> {
    async fn fetch_page(&self, page: u32, limit: u32) -> Result<PageResponse> {
        (**self).fetch_page(page, limit).await
    }
}

pub struct HttpPageSource {
    config: FetchConfig,
    client: Client,
}

impl HttpPageSource {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("flood-sos-analytics/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch_page(&self, page: u32, limit: u32) -> Result<PageResponse> {
        let url = self.config.page_url(page, limit);
        debug!(%url, "requesting page");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                page,
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|source| FetchError::Malformed { page, source })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotFile {
    Records(Vec<SosRecord>),
    Page(PageResponse),
}

/// Serves a saved record list page by page, synthesising pagination.
#[derive(Debug, Clone, Default)]
pub struct SnapshotPageSource {
    records: Vec<SosRecord>,
    stats: Option<ApiStats>,
}

impl SnapshotPageSource {
    pub fn new(records: Vec<SosRecord>, stats: Option<ApiStats>) -> Self {
        Self { records, stats }
    }

    /// Read a snapshot holding either a bare record array or an API payload.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read(path)?;
        let file: SnapshotFile = serde_json::from_slice(&raw).map_err(FetchError::InvalidSnapshot)?;
        Ok(match file {
            SnapshotFile::Records(records) => Self::new(records, None),
            SnapshotFile::Page(page) => Self::new(page.data, page.stats),
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl PageSource for SnapshotPageSource {
    async fn fetch_page(&self, page: u32, limit: u32) -> Result<PageResponse> {
        let limit = limit.max(1);
        let total = self.records.len();
        let total_pages = u32::try_from(total.div_ceil(limit as usize))
            .unwrap_or(u32::MAX)
            .max(1);
        let start = (page.saturating_sub(1) as usize).saturating_mul(limit as usize);
        let data = self
            .records
            .iter()
            .skip(start)
            .take(limit as usize)
            .cloned()
            .collect();

        Ok(PageResponse {
            success: true,
            data,
            stats: if page == 1 { self.stats.clone() } else { None },
            pagination: Some(Pagination {
                current_page: page,
                total_pages,
                total_count: total as u64,
                limit,
                has_next_page: page < total_pages,
                has_prev_page: page > 1,
            }),
            error: None,
        })
    }
}

/// Write records as a pretty-printed JSON array readable by [`SnapshotPageSource::load`].
pub fn save_snapshot(path: &Path, records: &[SosRecord]) -> Result<()> {
    let json = serde_json::to_vec_pretty(records).map_err(FetchError::InvalidSnapshot)?;
    std::fs::write(path, json)?;
    Ok(())
}
