use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://floodsupport.org/api/sos";
pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const DEFAULT_PAGE_TIMEOUT_SECS: u64 = 30;

/// Where and how to page through the SOS endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    pub base_url: String,
    pub page_size: u32,
    /// A page that takes longer than this ends the fetch in the error state.
    pub page_timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            page_timeout: Duration::from_secs(DEFAULT_PAGE_TIMEOUT_SECS),
        }
    }
}

impl FetchConfig {
    pub fn page_url(&self, page: u32, limit: u32) -> String {
        let separator = if self.base_url.contains('?') { '&' } else { '?' };
        format!(
            "{}{separator}page={page}&limit={limit}",
            self.base_url.trim_end_matches('/')
        )
    }
}
