use std::rc::Rc;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use harvest::config::Config;
use harvest::crawler::{FetchError, FetchOptions, Fetcher, HtmlExtractor, Response};
use harvest::diagnostics::MemorySink;
use harvest::prelude::Evaluator;
use harvest::Harvest;

/// Serves the same generated listing page for every URL.
struct ListingFetcher {
    body: String,
}

impl Fetcher for ListingFetcher {
    fn fetch(&self, url: &str) -> Result<Response, FetchError> {
        Ok(Response { status: 200, body: self.body.clone(), url: url.to_owned(), ..Default::default() })
    }
}

fn listing(items: usize) -> String {
    let rows: String = (0..items)
        .map(|i| format!(r#"<li class="item"><a href="/item/{i}">Item {i}</a><span>{i}</span></li>"#))
        .collect();
    format!("<html><body><ul>{rows}</ul></body></html>")
}

fn harvest() -> Harvest {
    let fetcher = Arc::new(ListingFetcher { body: listing(200) });
    let config = Config::default()
        .with_fetch_options(FetchOptions { max_retries: 0, ..FetchOptions::default() });
    let evaluator = Evaluator::new(fetcher, Rc::new(HtmlExtractor))
        .with_config(&config)
        .with_diagnostics(Box::new(MemorySink::new()));
    Harvest::with_evaluator(evaluator)
}

fn fibonacci() {
    let src = r#"
        function fib(n) {
            if n < 2 { return n; }
            return fib(n - 2) + fib(n - 1);
        }

        fib(20);
    "#;

    harvest().run(src).unwrap();
}

fn hashes() {
    let src = r#"
        let pages = {};
        for i in [1, 2, 3, 4, 5, 6, 7, 8, 9, 10] {
            for j in [1, 2, 3, 4, 5, 6, 7, 8, 9, 10] {
                let page = {url: "http://site/", depth: i, index: j, seen: true};
                let total = page.depth * page.index;
            }
        }
    "#;

    harvest().run(src).unwrap();
}

fn scrape() {
    let src = r#"
        let doc = open("http://site/");
        let found = collect(doc, @"li.item", @"a", @"span");
        for link in found.a { let href = link.attr.href; }
        doc | extract(@"ul > li");
    "#;

    harvest().run(src).unwrap();
}

fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("my-benchmark");
    group.sample_size(20);
    group.bench_function("fib 20", |b| b.iter(fibonacci));
    group.bench_function("hashes", |b| b.iter(hashes));
    group.bench_function("scrape", |b| b.iter(scrape));
    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
