//! Cached list of selectable businesses.

use crate::domain::{
    business::{filter_businesses, BusinessSummary},
    turn::DirectoryOutcome,
};

use super::contracts::BusinessDirectorySource;

const DIRECTORY_FETCH_FAILED: &str = "DIRECTORY_FETCH_FAILED";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BusinessDirectory {
    businesses: Vec<BusinessSummary>,
    loading: bool,
    fetched: bool,
}

impl BusinessDirectory {
    #[cfg(test)]
    pub fn businesses(&self) -> &[BusinessSummary] {
        &self.businesses
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    #[cfg(test)]
    pub fn is_fetched(&self) -> bool {
        self.fetched
    }

    /// Marks a fetch as started. Returns false when the list was already
    /// fetched or a fetch is running, so callers skip the network call.
    pub fn begin_fetch(&mut self) -> bool {
        if self.loading || self.fetched {
            return false;
        }

        self.loading = true;
        true
    }

    /// Like [`Self::begin_fetch`] but ignores a previous successful fetch.
    pub fn begin_refresh(&mut self) -> bool {
        if self.loading {
            return false;
        }

        self.loading = true;
        true
    }

    pub fn apply_fetch(&mut self, outcome: DirectoryOutcome) {
        self.loading = false;
        self.fetched = true;

        match outcome {
            Ok(businesses) => {
                tracing::debug!(count = businesses.len(), "business directory loaded");
                self.businesses = businesses;
            }
            Err(error) => {
                tracing::warn!(
                    code = DIRECTORY_FETCH_FAILED,
                    backend_code = error.code(),
                    error = %error,
                    "business directory fetch failed; directory stays empty"
                );
                self.businesses.clear();
            }
        }
    }

    /// One-shot fetch for callers that can await the source directly.
    pub async fn fetch_all(&mut self, source: &dyn BusinessDirectorySource) {
        if !self.begin_fetch() {
            return;
        }

        let outcome = source.fetch_businesses().await;
        self.apply_fetch(outcome);
    }

    pub fn filter(&self, query: &str) -> Vec<&BusinessSummary> {
        filter_businesses(&self.businesses, query)
    }
}
