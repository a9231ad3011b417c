mod crawl;
mod expr;
mod operators;
mod stmt;

use std::rc::Rc;
use std::sync::Arc;

use crate::config::Config;
use crate::crawler::{CancelToken, Extractor, FetchError, Fetcher, HtmlExtractor, HttpFetcher};
use crate::diagnostics::{DiagnosticSink, Diagnostics, StreamSink};
use crate::prelude::*;

pub use crawl::CrawlBridge;
pub(crate) use crawl::network_failure;

pub type EvalResult = Result<Object, RuntimeInterrupt>;

/// Tree-walking evaluator. One instance keeps its global scope across
/// programs, so definitions from an earlier `eval_program` stay visible.
pub struct Evaluator {
    pub globals: Shared<Environment>,
    environment: Shared<Environment>,
    crawler: CrawlBridge,
    diagnostics: Diagnostics,
    call_depth: usize,
    max_call_depth: usize,
}

impl Evaluator {
    pub fn new(fetcher: Arc<dyn Fetcher>, extractor: Rc<dyn Extractor>) -> Self {
        let config = Config::default();
        let globals = Environment::new().as_shared();
        let environment = globals.clone();

        for builtin in crate::native::builtins() {
            globals.borrow_mut().set(builtin.name, Object::Builtin(Rc::new(builtin)));
        }

        Self {
            globals,
            environment,
            crawler: CrawlBridge::new(fetcher, extractor, &config),
            diagnostics: Diagnostics::new(Box::new(StreamSink::stdout()), config.debug),
            call_depth: 0,
            max_call_depth: config.max_call_depth,
        }
    }

    /// An evaluator wired to the real HTTP client and CSS engine.
    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        let fetcher = Arc::new(HttpFetcher::new(&config.fetch)?);
        Ok(Self::new(fetcher, Rc::new(HtmlExtractor)).with_config(config))
    }

    pub fn with_config(self, config: &Config) -> Self {
        let crawler = self.crawler.reconfigure(config);
        let diagnostics = Diagnostics::new(self.diagnostics.into_sink(), config.debug);
        Self { crawler, diagnostics, max_call_depth: config.max_call_depth, ..self }
    }

    pub fn with_diagnostics(self, sink: Box<dyn DiagnosticSink>) -> Self {
        let debug = self.diagnostics.is_debug();
        Self { diagnostics: Diagnostics::new(sink, debug), ..self }
    }

    /// Token that aborts pending batch requests of this evaluator.
    pub fn cancel_token(&self) -> CancelToken {
        self.crawler.cancel_token()
    }

    /// Lets a cancelled evaluator fetch again. Returns the new token.
    pub fn reset_cancel_token(&mut self) -> CancelToken {
        self.crawler.reset_cancel()
    }

    pub fn diagnostics(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }
}
