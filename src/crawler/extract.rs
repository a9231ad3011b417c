use std::collections::BTreeMap;

use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

/// One element matched by a selector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extracted {
    pub text: String,
    pub html: String,
    pub attr: BTreeMap<String, String>,
    pub children: Vec<Extracted>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
}

pub trait Extractor {
    fn extract(&self, html: &str, selector: &str) -> Result<Vec<Extracted>, ExtractError>;

    /// Runs several selectors over one document. Results keep the order of
    /// `selectors`.
    fn extract_many(
        &self,
        html: &str,
        selectors: &[String],
    ) -> Result<Vec<(String, Vec<Extracted>)>, ExtractError> {
        selectors
            .iter()
            .map(|selector| Ok((selector.clone(), self.extract(html, selector)?)))
            .collect()
    }

    fn validate(&self, _selector: &str) -> Result<(), ExtractError> {
        Ok(())
    }
}

/// CSS selector extraction over parsed HTML.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlExtractor;

impl Extractor for HtmlExtractor {
    fn extract(&self, html: &str, selector: &str) -> Result<Vec<Extracted>, ExtractError> {
        let selector = parse_selector(selector)?;
        let document = Html::parse_document(html);
        Ok(document.select(&selector).map(to_extracted).collect())
    }

    fn extract_many(
        &self,
        html: &str,
        selectors: &[String],
    ) -> Result<Vec<(String, Vec<Extracted>)>, ExtractError> {
        let parsed = selectors
            .iter()
            .map(|s| parse_selector(s).map(|parsed| (s.clone(), parsed)))
            .collect::<Result<Vec<_>, _>>()?;

        let document = Html::parse_document(html);
        Ok(parsed
            .into_iter()
            .map(|(pattern, selector)| {
                (pattern, document.select(&selector).map(to_extracted).collect())
            })
            .collect())
    }

    fn validate(&self, selector: &str) -> Result<(), ExtractError> {
        parse_selector(selector).map(|_| ())
    }
}

fn parse_selector(selector: &str) -> Result<Selector, ExtractError> {
    Selector::parse(selector).map_err(|e| ExtractError::InvalidSelector {
        selector: selector.to_owned(),
        reason: e.to_string(),
    })
}

fn to_extracted(element: ElementRef<'_>) -> Extracted {
    Extracted {
        text: element.text().collect(),
        html: element.html(),
        attr: element.value().attrs().map(|(k, v)| (k.to_owned(), v.to_owned())).collect(),
        children: element.children().filter_map(ElementRef::wrap).map(to_extracted).collect(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const PAGE: &str = r#"<html><body>
        <h1 class="title">Hello <b>world</b></h1>
        <a href="/one">One</a><a href="/two">Two</a>
    </body></html>"#;

    #[test]
    fn extracts_text_html_and_attributes() {
        let results = HtmlExtractor.extract(PAGE, "h1").unwrap();
        assert_eq!(results.len(), 1);

        let h1 = &results[0];
        assert_eq!(h1.text, "Hello world");
        assert_eq!(h1.attr.get("class").map(String::as_str), Some("title"));
        assert!(h1.html.starts_with("<h1"));
        assert_eq!(h1.children.len(), 1);
        assert_eq!(h1.children[0].text, "world");
    }

    #[test]
    fn matches_in_document_order() {
        let links = HtmlExtractor.extract(PAGE, "a").unwrap();
        let hrefs: Vec<&str> = links.iter().map(|l| l.attr["href"].as_str()).collect();
        assert_eq!(hrefs, vec!["/one", "/two"]);
    }

    #[test]
    fn many_selectors_keep_their_order() {
        let selectors = vec!["a".to_owned(), "h1".to_owned(), "p".to_owned()];
        let results = HtmlExtractor.extract_many(PAGE, &selectors).unwrap();
        let summary: Vec<(&str, usize)> =
            results.iter().map(|(s, found)| (s.as_str(), found.len())).collect();
        assert_eq!(summary, vec![("a", 2), ("h1", 1), ("p", 0)]);
    }

    #[test]
    fn rejects_malformed_selectors() {
        assert!(matches!(
            HtmlExtractor.extract(PAGE, "h1[").unwrap_err(),
            ExtractError::InvalidSelector { .. }
        ));
        assert!(HtmlExtractor.validate("div > p.note").is_ok());
        assert!(HtmlExtractor.validate("").is_err());
    }
}
