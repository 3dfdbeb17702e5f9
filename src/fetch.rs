use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::FetchConfig;
use crate::error::{FetchError, Result};
use crate::filters::{FilterOptions, RecordFilter};
use crate::models::{ApiStats, DistrictSummary, PageResponse, SosRecord};
use crate::source::PageSource;
use crate::summary::{calculate_totals, summarize_districts};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum FetchState {
    #[default]
    Idle,
    Fetching,
    Complete,
    Error {
        message: String,
        status: Option<u16>,
    },
}

impl FetchState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FetchState::Complete | FetchState::Error { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchProgress {
    pub fetched: usize,
    /// From the first page; not revised by later pages.
    pub total_expected: u64,
    pub current_page: u32,
    /// From the first page; not revised by later pages.
    pub total_pages: u32,
    pub complete: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub summaries: Vec<DistrictSummary>,
    pub totals: DistrictSummary,
    pub filtered_count: usize,
    pub total_count: usize,
}

impl DashboardView {
    pub fn build(records: &[SosRecord], filter: &RecordFilter) -> Self {
        let filtered = filter.apply(records);
        let summaries = summarize_districts(filtered.iter().copied());
        let totals = calculate_totals(&summaries);
        Self {
            summaries,
            totals,
            filtered_count: filtered.len(),
            total_count: records.len(),
        }
    }

    pub fn is_filtered(&self) -> bool {
        self.filtered_count != self.total_count && self.total_count > 0
    }
}

impl Default for DashboardView {
    fn default() -> Self {
        Self::build(&[], &RecordFilter::default())
    }
}

#[derive(Debug, Default)]
pub struct Dashboard {
    records: Vec<SosRecord>,
    filter: RecordFilter,
    state: FetchState,
    progress: FetchProgress,
    stats: Option<ApiStats>,
    fetched_at: Option<DateTime<Utc>>,
    view: DashboardView,
    generation: u64,
}

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[SosRecord] {
        &self.records
    }

    pub fn filter(&self) -> &RecordFilter {
        &self.filter
    }

    pub fn state(&self) -> &FetchState {
        &self.state
    }

    pub fn progress(&self) -> &FetchProgress {
        &self.progress
    }

    pub fn stats(&self) -> Option<&ApiStats> {
        self.stats.as_ref()
    }

    /// When the last refresh completed. A failed refresh leaves it alone.
    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }

    pub fn view(&self) -> &DashboardView {
        &self.view
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn filtered_records(&self) -> Vec<&SosRecord> {
        self.filter.apply(&self.records)
    }

    pub fn filter_options(&self) -> FilterOptions {
        FilterOptions::from_records(&self.records)
    }

    pub fn set_filter(&mut self, filter: RecordFilter) {
        self.filter = filter;
        self.recompute();
    }

    fn recompute(&mut self) {
        self.view = DashboardView::build(&self.records, &self.filter);
    }

    /// Start a new fetch generation: clear records and any previous error.
    pub fn begin_fetch(&mut self) -> u64 {
        self.generation += 1;
        self.records.clear();
        self.stats = None;
        self.progress = FetchProgress::default();
        self.state = FetchState::Fetching;
        self.recompute();
        self.generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation && self.state == FetchState::Fetching
    }

    /// Append one successful page. Returns true when it was the last page.
    pub fn apply_page(&mut self, page: u32, response: PageResponse) -> bool {
        let received = response.data.len();
        self.records.extend(response.data);

        // Without pagination the payload is the whole dataset.
        let reported_pages = response.pagination.map_or(page, |p| p.total_pages);
        if self.progress.current_page == 0 {
            self.progress.total_pages = reported_pages;
            self.progress.total_expected = response
                .pagination
                .map_or(received as u64, |p| p.total_count);
            self.stats = response.stats;
        }
        self.progress.current_page = page;
        self.progress.fetched = self.records.len();
        self.recompute();

        let done = page >= reported_pages;
        if done {
            self.state = FetchState::Complete;
            self.progress.complete = true;
            self.fetched_at = Some(Utc::now());
        }
        done
    }

    pub fn fail(&mut self, err: &FetchError) {
        self.state = FetchState::Error {
            message: err.to_string(),
            status: err.status(),
        };
        self.progress.error = Some(err.to_string());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Complete { records: usize, pages: u32 },
    /// A newer refresh started while this one was in flight.
    Superseded,
}

pub struct FetchLoop<S> {
    source: S,
    page_size: u32,
    page_timeout: Duration,
    dashboard: Arc<Mutex<Dashboard>>,
}

impl<S: PageSource> FetchLoop<S> {
    pub fn new(source: S, config: &FetchConfig) -> Self {
        Self::with_dashboard(source, config, Arc::new(Mutex::new(Dashboard::new())))
    }

    pub fn with_dashboard(source: S, config: &FetchConfig, dashboard: Arc<Mutex<Dashboard>>) -> Self {
        Self {
            source,
            page_size: config.page_size.max(1),
            page_timeout: config.page_timeout,
            dashboard,
        }
    }

    pub fn dashboard(&self) -> Arc<Mutex<Dashboard>> {
        Arc::clone(&self.dashboard)
    }

    async fn request(&self, page: u32) -> Result<PageResponse> {
        let response = tokio::time::timeout(
            self.page_timeout,
            self.source.fetch_page(page, self.page_size),
        )
        .await
        .map_err(|_| FetchError::Timeout {
            page,
            timeout: self.page_timeout,
        })??;

        if !response.success {
            return Err(FetchError::Rejected {
                page,
                message: response
                    .error
                    .unwrap_or_else(|| "no error message".to_string()),
            });
        }
        Ok(response)
    }

    /// Fetch every page, reporting progress after each one.
    pub async fn refresh<F>(&self, mut on_progress: F) -> Result<FetchOutcome>
    where
        F: FnMut(&FetchProgress),
    {
        let generation = self.dashboard.lock().await.begin_fetch();
        info!(generation, page_size = self.page_size, "refresh started");

        let mut page = 1u32;
        loop {
            let result = self.request(page).await;

            let mut dashboard = self.dashboard.lock().await;
            if !dashboard.is_current(generation) {
                debug!(generation, page, "discarding page from superseded refresh");
                return Ok(FetchOutcome::Superseded);
            }

            match result {
                Err(err) => {
                    warn!(generation, page, error = %err, "refresh failed");
                    dashboard.fail(&err);
                    let progress = dashboard.progress().clone();
                    drop(dashboard);
                    on_progress(&progress);
                    return Err(err);
                }
                Ok(response) => {
                    let done = dashboard.apply_page(page, response);
                    let progress = dashboard.progress().clone();
                    drop(dashboard);

                    debug!(
                        generation,
                        page,
                        fetched = progress.fetched,
                        total_pages = progress.total_pages,
                        "page applied"
                    );
                    on_progress(&progress);

                    if done {
                        info!(generation, records = progress.fetched, pages = page, "refresh complete");
                        return Ok(FetchOutcome::Complete {
                            records: progress.fetched,
                            pages: page,
                        });
                    }
                }
            }
            page += 1;
        }
    }
}
