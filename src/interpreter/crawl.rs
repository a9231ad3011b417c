use std::rc::Rc;
use std::sync::Arc;

use rustc_hash::FxHashSet;

use super::EvalResult;
use crate::config::Config;
use crate::crawler::{
    fetch_batch, fetch_with_retry, BatchStream, CancelToken, Extracted, Extractor, FetchError,
    Fetcher, Response, RetryPolicy,
};
use crate::prelude::*;

/// What the crawler operators need from the outside world.
pub struct CrawlBridge {
    fetcher: Arc<dyn Fetcher>,
    extractor: Rc<dyn Extractor>,
    retry: RetryPolicy,
    concurrency: usize,
    cancel: CancelToken,
}

impl CrawlBridge {
    pub fn new(fetcher: Arc<dyn Fetcher>, extractor: Rc<dyn Extractor>, config: &Config) -> Self {
        Self {
            fetcher,
            extractor,
            retry: config.fetch.retry_policy(),
            concurrency: config.concurrency,
            cancel: CancelToken::new(),
        }
    }

    pub(super) fn reconfigure(self, config: &Config) -> Self {
        Self { retry: config.fetch.retry_policy(), concurrency: config.concurrency, ..self }
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Swaps in a fresh token. Clones of the old one stay cancelled.
    pub(super) fn reset_cancel(&mut self) -> CancelToken {
        self.cancel = CancelToken::new();
        self.cancel.clone()
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn fetch(&self, url: &str) -> Result<Response, FetchError> {
        fetch_with_retry(self.fetcher.as_ref(), url, &self.retry, &self.cancel)
    }

    pub fn fetch_batch(&self, urls: Vec<String>, concurrency: usize) -> BatchStream {
        fetch_batch(self.fetcher.clone(), urls, concurrency, self.retry, self.cancel.clone())
    }
}

impl Evaluator {
    pub fn crawler(&self) -> &CrawlBridge {
        &self.crawler
    }

    pub(super) fn evaluate_open(
        &mut self,
        keyword: &Token,
        arguments: &[Expr],
        piped: Option<Object>,
    ) -> EvalResult {
        let args = self.evaluate_arguments(piped, arguments)?;
        expect_arguments(keyword, &args, Arity::Exact(1))?;

        let _span = tracing::debug_span!("open", line = keyword.line).entered();
        let position = keyword.position();
        match &args[0] {
            Object::String(url) => {
                let response = self.crawler.fetch(url).map_err(|e| network_failure(position, url, &e))?;
                Ok(Object::HtmlDocument(document_from(position, response)?))
            }
            Object::Array(items) => {
                let urls = url_list(keyword, items)?;
                let documents = self
                    .crawler
                    .fetch_batch(urls, self.crawler.concurrency)
                    .map(|response| match document_from(position, response) {
                        Ok(document) => Object::HtmlDocument(document),
                        Err(error) => Object::error(error),
                    })
                    .collect();
                Ok(Object::array(documents))
            }
            other => Err(ErrorObject::type_error(
                position,
                format!("open expects a URL STRING or an ARRAY of URLs, got {}", other.type_name()),
            )
            .into()),
        }
    }

    pub(super) fn evaluate_extract(
        &mut self,
        keyword: &Token,
        arguments: &[Expr],
        piped: Option<Object>,
    ) -> EvalResult {
        let args = self.evaluate_arguments(piped, arguments)?;
        expect_arguments(keyword, &args, Arity::Exact(2))?;

        let _span = tracing::debug_span!("extract", line = keyword.line).entered();
        let html = source_html(keyword, &args[0])?;
        let selector = selector_pattern(keyword, &args[1])?;

        let results = self
            .crawler
            .extractor
            .extract(html, selector)
            .map_err(|e| ErrorObject::selector(keyword.position(), e.to_string()))?;
        Ok(Object::array(results.iter().map(extracted_to_object).collect()))
    }

    pub(super) fn evaluate_collect(
        &mut self,
        keyword: &Token,
        arguments: &[Expr],
        piped: Option<Object>,
    ) -> EvalResult {
        let args = self.evaluate_arguments(piped, arguments)?;
        expect_arguments(keyword, &args, Arity::AtLeast(2))?;

        let _span = tracing::debug_span!("collect", line = keyword.line).entered();
        let position = keyword.position();
        let selectors = args[1..]
            .iter()
            .map(|s| selector_pattern(keyword, s).map(str::to_owned))
            .collect::<Result<Vec<_>, _>>()?;
        for selector in &selectors {
            self.crawler
                .extractor
                .validate(selector)
                .map_err(|e| ErrorObject::selector(position, e.to_string()))?;
        }

        match &args[0] {
            Object::Array(items) => self.collect_batch(keyword, items, &selectors),
            source => {
                let html = source_html(keyword, source)?;
                Ok(self.collect_document(position, html, &selectors)?)
            }
        }
    }

    pub(super) fn evaluate_at(&mut self, at: &Token, value: Object) -> EvalResult {
        let pattern = match value {
            Object::String(pattern) | Object::Selector(pattern) => pattern,
            other => {
                return Err(ErrorObject::type_error(
                    at.position(),
                    format!("selector must be a STRING, got {}", other.type_name()),
                )
                .into())
            }
        };

        if pattern.trim().is_empty() {
            return Err(ErrorObject::selector(at.position(), "empty selector").into());
        }
        self.crawler
            .extractor
            .validate(&pattern)
            .map_err(|e| ErrorObject::selector(at.position(), e.to_string()))?;

        Ok(Object::Selector(pattern))
    }

    /// One extraction pass over `html`, keyed by selector.
    fn collect_document(
        &self,
        position: Position,
        html: &str,
        selectors: &[String],
    ) -> Result<Object, ErrorObject> {
        let groups = self
            .crawler
            .extractor
            .extract_many(html, selectors)
            .map_err(|e| ErrorObject::selector(position, e.to_string()))?;

        let mut hash = HashObject::new();
        for (selector, results) in groups {
            hash.insert_str(&selector, Object::array(results.iter().map(extracted_to_object).collect()));
        }
        Ok(Object::hash(hash))
    }

    /// Collects over a mix of URLs and documents. Documents are handled in
    /// order first; fetched pages follow in completion order. Each URL is
    /// collected once: later duplicates, and URLs already covered by a
    /// document, are skipped.
    fn collect_batch(&mut self, keyword: &Token, items: &[Object], selectors: &[String]) -> EvalResult {
        let position = keyword.position();
        let mut urls = Vec::new();
        let mut documents = Vec::new();
        let mut document_urls = FxHashSet::default();
        for item in items {
            if let Object::HtmlDocument(document) = item {
                if document_urls.insert(document.url.clone()) {
                    documents.push(document.clone());
                } else {
                    tracing::warn!(url = %document.url, "duplicate document in collect, skipped");
                }
            }
        }

        let mut queued = FxHashSet::default();
        for item in items {
            match item {
                Object::String(url) => {
                    if document_urls.contains(url) || !queued.insert(url.clone()) {
                        tracing::warn!(url = %url, "duplicate URL in collect, skipped");
                    } else {
                        urls.push(url.clone());
                    }
                }
                Object::HtmlDocument(_) => {}
                other => {
                    return Err(ErrorObject::type_error(
                        position,
                        format!(
                            "collect expects URLs or HTML_DOC values, got {}",
                            other.type_name()
                        ),
                    )
                    .into())
                }
            }
        }

        let mut hash = HashObject::new();
        for document in documents {
            let value = self.collect_document(position, &document.content, selectors)?;
            hash.insert_str(&document.url, value);
        }

        for response in self.crawler.fetch_batch(urls, self.crawler.concurrency) {
            let url = response.url.clone();
            let value = match document_from(position, response) {
                Ok(document) => self.collect_document(position, &document.content, selectors)?,
                Err(error) => Object::error(error),
            };
            hash.insert_str(&url, value);
        }

        Ok(Object::hash(hash))
    }
}

fn expect_arguments(keyword: &Token, args: &[Object], arity: Arity) -> Result<(), ErrorObject> {
    if arity.accepts(args.len()) {
        return Ok(());
    }
    Err(ErrorObject::runtime(
        keyword.position(),
        format!(
            "wrong number of arguments to {}: expected {arity}, got {}",
            keyword.lexeme,
            args.len()
        ),
    ))
}

fn url_list(keyword: &Token, items: &[Object]) -> Result<Vec<String>, ErrorObject> {
    items
        .iter()
        .map(|item| match item {
            Object::String(url) => Ok(url.clone()),
            other => Err(ErrorObject::type_error(
                keyword.position(),
                format!("{} expects an ARRAY of URL strings, got {} in it", keyword.lexeme, other.type_name()),
            )),
        })
        .collect()
}

fn source_html<'a>(keyword: &Token, source: &'a Object) -> Result<&'a str, ErrorObject> {
    match source {
        Object::HtmlDocument(document) => Ok(&document.content),
        Object::String(html) => Ok(html),
        other => Err(ErrorObject::type_error(
            keyword.position(),
            format!("{} expects an HTML_DOC or STRING source, got {}", keyword.lexeme, other.type_name()),
        )),
    }
}

fn selector_pattern<'a>(keyword: &Token, selector: &'a Object) -> Result<&'a str, ErrorObject> {
    match selector {
        Object::Selector(pattern) | Object::String(pattern) => Ok(pattern),
        other => Err(ErrorObject::type_error(
            keyword.position(),
            format!("{} expects a SELECTOR or STRING, got {}", keyword.lexeme, other.type_name()),
        )),
    }
}

pub(crate) fn network_failure(position: Position, url: &str, error: &FetchError) -> ErrorObject {
    ErrorObject::network(position, format!("GET {url} failed: {error}"))
        .with_value(Object::String(url.to_owned()))
}

fn document_from(position: Position, response: Response) -> Result<Rc<HtmlDocument>, ErrorObject> {
    if let Some(error) = &response.error {
        return Err(network_failure(position, &response.url, error));
    }
    if !response.is_success() {
        return Err(ErrorObject::network(
            position,
            format!("GET {} returned status {}", response.url, response.status),
        )
        .with_value(Object::String(response.url)));
    }

    Ok(Rc::new(HtmlDocument { content: response.body, url: response.url }))
}

fn extracted_to_object(extracted: &Extracted) -> Object {
    let mut attr = HashObject::new();
    for (name, value) in &extracted.attr {
        attr.insert_str(name, Object::String(value.clone()));
    }

    let mut hash = HashObject::new();
    hash.insert_str("text", Object::String(extracted.text.clone()));
    hash.insert_str("html", Object::String(extracted.html.clone()));
    hash.insert_str("attr", Object::hash(attr));
    hash.insert_str("children", Object::array(extracted.children.iter().map(extracted_to_object).collect()));
    Object::hash(hash)
}

pub(super) fn response_field(
    position: Position,
    response: &Response,
    field: &str,
) -> Result<Object, ErrorObject> {
    let value = match field {
        "status" => Object::Integer(i64::from(response.status)),
        "body" => Object::String(response.body.clone()),
        "url" => Object::String(response.url.clone()),
        "headers" => {
            let mut headers = HashObject::new();
            for (name, value) in &response.headers {
                headers.insert_str(name, Object::String(value.clone()));
            }
            Object::hash(headers)
        }
        "error" => match &response.error {
            Some(error) => Object::String(error.to_string()),
            None => Object::Null,
        },
        _ => {
            return Err(ErrorObject::runtime(
                position,
                format!("{} has no field '{field}'", ObjectType::HttpResponse),
            ))
        }
    };
    Ok(value)
}

pub(super) fn document_field(
    position: Position,
    document: &HtmlDocument,
    field: &str,
) -> Result<Object, ErrorObject> {
    match field {
        "content" => Ok(Object::String(document.content.clone())),
        "url" => Ok(Object::String(document.url.clone())),
        _ => Err(ErrorObject::runtime(
            position,
            format!("{} has no field '{field}'", ObjectType::HtmlDocument),
        )),
    }
}
