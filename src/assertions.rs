//! Assertions evaluated against captured HTML.
//!
//! Each request is evaluated on its own; a failing or malformed assertion
//! never prevents the others from running. Selectors go through a real CSS
//! engine; only attribute selectors it rejects fall back to a substring check.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\[\s*([A-Za-z_:][A-Za-z0-9_:.-]*)\s*(?:=\s*["']?([^"'\]]*)["']?\s*)?\]$"#)
        .expect("static regex")
});

/// Which kind of check an assertion performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssertionKind {
    Text,
    Selector,
    Regex,
}

impl std::fmt::Display for AssertionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssertionKind::Text => write!(f, "text"),
            AssertionKind::Selector => write!(f, "selector"),
            AssertionKind::Regex => write!(f, "regex"),
        }
    }
}

/// One requested assertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionRequest {
    pub kind: AssertionKind,
    pub expected: String,
}

impl AssertionRequest {
    pub fn text(expected: impl Into<String>) -> Self {
        Self {
            kind: AssertionKind::Text,
            expected: expected.into(),
        }
    }

    pub fn selector(expected: impl Into<String>) -> Self {
        Self {
            kind: AssertionKind::Selector,
            expected: expected.into(),
        }
    }

    pub fn regex(expected: impl Into<String>) -> Self {
        Self {
            kind: AssertionKind::Regex,
            expected: expected.into(),
        }
    }
}

/// Outcome of one assertion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionResult {
    #[serde(rename = "type")]
    pub kind: AssertionKind,
    pub expected: String,
    pub passed: bool,
    pub message: String,
}

impl AssertionResult {
    pub fn new(
        kind: AssertionKind,
        expected: impl Into<String>,
        passed: bool,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            expected: expected.into(),
            passed,
            message: message.into(),
        }
    }
}

/// Attribute selector that the CSS engine rejected, e.g. `[data-label=two words]`.
/// Ids, classes and tags always parse, so this is the only shape the
/// substring fallback judges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSelector {
    pub name: String,
    pub value: Option<String>,
}

impl AttributeSelector {
    /// `[name]` or `[name=value]`, quoted or not; `None` for anything else
    pub fn parse(selector: &str) -> Option<Self> {
        let caps = ATTRIBUTE.captures(selector.trim())?;
        Some(Self {
            name: caps[1].to_string(),
            value: caps.get(2).map(|m| m.as_str().to_string()),
        })
    }

    /// Literal substring check against the raw HTML
    pub fn matches(&self, html: &str) -> bool {
        match &self.value {
            Some(v) => {
                html.contains(&format!("{}=\"{v}\"", self.name))
                    || html.contains(&format!("{}='{v}'", self.name))
            }
            None => html.contains(self.name.as_str()),
        }
    }
}

/// Evaluate every request against `html`, one result per request, in order
pub fn evaluate(html: &str, requests: &[AssertionRequest]) -> Vec<AssertionResult> {
    let mut document: Option<Html> = None;
    requests
        .iter()
        .map(|request| match request.kind {
            AssertionKind::Text => check_text(html, &request.expected),
            AssertionKind::Regex => check_regex(html, &request.expected),
            AssertionKind::Selector => {
                let doc = document.get_or_insert_with(|| Html::parse_document(html));
                check_selector(html, doc, &request.expected)
            }
        })
        .collect()
}

fn check_text(html: &str, expected: &str) -> AssertionResult {
    let passed = html.contains(expected);
    let message = if passed {
        format!("text \"{expected}\" found")
    } else {
        format!("text \"{expected}\" not found in page HTML")
    };
    AssertionResult::new(AssertionKind::Text, expected, passed, message)
}

fn check_regex(html: &str, pattern: &str) -> AssertionResult {
    match Regex::new(pattern) {
        Ok(re) => {
            let passed = re.is_match(html);
            let message = if passed {
                format!("pattern /{pattern}/ matched")
            } else {
                format!("pattern /{pattern}/ did not match page HTML")
            };
            AssertionResult::new(AssertionKind::Regex, pattern, passed, message)
        }
        Err(e) => AssertionResult::new(
            AssertionKind::Regex,
            pattern,
            false,
            format!("invalid regex: {e}"),
        ),
    }
}

fn check_selector(html: &str, document: &Html, selector: &str) -> AssertionResult {
    match Selector::parse(selector) {
        Ok(parsed) => {
            let count = document.select(&parsed).count();
            let passed = count > 0;
            let message = if passed {
                format!("selector `{selector}` matched {count} element(s)")
            } else {
                format!("selector `{selector}` matched no elements")
            };
            AssertionResult::new(AssertionKind::Selector, selector, passed, message)
        }
        Err(parse_err) => match AttributeSelector::parse(selector) {
            Some(attribute) => {
                let passed = attribute.matches(html);
                let outcome = if passed { "present" } else { "absent" };
                AssertionResult::new(
                    AssertionKind::Selector,
                    selector,
                    passed,
                    format!("selector `{selector}` {outcome} (substring match)"),
                )
            }
            None => AssertionResult::new(
                AssertionKind::Selector,
                selector,
                false,
                format!("unsupported selector `{selector}`: {parse_err}"),
            ),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PAGE: &str = r#"<!doctype html>
<html><head><title>Example Domain</title></head>
<body>
  <div id="main" class="container wide">
    <h1>Example Domain</h1>
    <a href="https://www.iana.org/domains/example" data-track="more">More information...</a>
  </div>
</body></html>"#;

    #[test]
    fn test_empty_request_list() {
        assert!(evaluate(PAGE, &[]).is_empty());
    }

    #[test]
    fn test_text_assertion() {
        let results = evaluate(
            PAGE,
            &[AssertionRequest::text("Example Domain"), AssertionRequest::text("Not Present XYZ")],
        );
        assert!(results[0].passed);
        assert!(!results[1].passed);
        assert_eq!(results[1].message, "text \"Not Present XYZ\" not found in page HTML");
    }

    #[test]
    fn test_selector_assertions() {
        let results = evaluate(
            PAGE,
            &[
                AssertionRequest::selector("#main"),
                AssertionRequest::selector(".wide"),
                AssertionRequest::selector("[data-track=\"more\"]"),
                AssertionRequest::selector("h1"),
                AssertionRequest::selector("div.container > h1"),
                AssertionRequest::selector("#missing"),
            ],
        );
        let passed: Vec<bool> = results.iter().map(|r| r.passed).collect();
        assert_eq!(passed, vec![true, true, true, true, true, false]);
    }

    #[test]
    fn test_class_requires_word_boundary() {
        let results = evaluate(PAGE, &[AssertionRequest::selector(".contain")]);
        assert!(!results[0].passed);
    }

    #[test]
    fn test_invalid_regex_is_failed_assertion() {
        let results = evaluate(PAGE, &[AssertionRequest::regex("(unclosed")]);
        assert_eq!(results.len(), 1);
        assert!(!results[0].passed);
        assert!(results[0].message.starts_with("invalid regex:"));
    }

    #[test]
    fn test_independence_and_order() {
        let requests = vec![
            AssertionRequest::regex("[bad"),
            AssertionRequest::text("Example"),
            AssertionRequest::selector("#nope"),
            AssertionRequest::regex(r"<h1>\w+ Domain</h1>"),
        ];
        let results = evaluate(PAGE, &requests);
        assert_eq!(results.len(), requests.len());
        for (req, res) in requests.iter().zip(&results) {
            assert_eq!(req.kind, res.kind);
            assert_eq!(req.expected, res.expected);
        }
        let passed: Vec<bool> = results.iter().map(|r| r.passed).collect();
        assert_eq!(passed, vec![false, true, false, true]);
    }

    #[test]
    fn test_parse_attribute_selector() {
        assert_eq!(
            AttributeSelector::parse("[data-id='7']"),
            Some(AttributeSelector {
                name: "data-id".to_string(),
                value: Some("7".to_string())
            })
        );
        assert_eq!(
            AttributeSelector::parse("[hidden]"),
            Some(AttributeSelector {
                name: "hidden".to_string(),
                value: None
            })
        );
        assert_eq!(AttributeSelector::parse("#main"), None);
        assert_eq!(AttributeSelector::parse("div.foo > span"), None);
    }

    #[test]
    fn test_rejected_attribute_selector_uses_substring_match() {
        let page = r#"<p data-label="two words">x</p>"#;
        let results = evaluate(
            page,
            &[
                AssertionRequest::selector("[data-label=two words]"),
                AssertionRequest::selector("[data-label=three words]"),
            ],
        );
        assert!(results[0].passed, "{}", results[0].message);
        assert!(results[0].message.ends_with("(substring match)"));
        assert!(!results[1].passed);
    }

    #[test]
    fn test_unparsable_compound_selector_fails() {
        let results = evaluate(PAGE, &[AssertionRequest::selector("div >> ??")]);
        assert!(!results[0].passed);
        assert!(results[0].message.starts_with("unsupported selector"));
    }

    #[test]
    fn test_result_serializes_type_field() {
        let result = AssertionResult::new(AssertionKind::Selector, "#a", true, "ok");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["type"], "selector");
        assert_eq!(json["passed"], true);
    }
}
