use crate::crawler::FetchOptions;

/// Runtime settings for one interpreter instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub fetch: FetchOptions,
    /// Requests in flight during batch `open`/`collect`/`fetch_all`.
    pub concurrency: usize,
    pub debug: bool,
    /// Nested user function calls allowed before a runtime error.
    pub max_call_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self { fetch: FetchOptions::default(), concurrency: 4, debug: false, max_call_depth: 200 }
    }
}

impl Config {
    pub fn with_fetch_options(self, fetch: FetchOptions) -> Self {
        Self { fetch, ..self }
    }

    pub fn with_concurrency(self, concurrency: usize) -> Self {
        Self { concurrency, ..self }
    }

    pub fn with_debug(self, debug: bool) -> Self {
        Self { debug, ..self }
    }

    pub fn with_max_call_depth(self, max_call_depth: usize) -> Self {
        Self { max_call_depth, ..self }
    }
}
