// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Source locator parsing (§4.3 step 1: "Parse the source").

use std::fmt;

/// A fetchable source locator with an optional evaluator hint.
///
/// `https://example.com/repo.git#python` parses to `fetch_url =
/// "https://example.com/repo.git"`, `evaluator = Some("python")`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub fetch_url: String,
    pub evaluator: Option<String>,
}

impl Source {
    /// Parse a raw source string, splitting off the `#evaluator` fragment.
    pub fn parse(src: &str) -> Self {
        match src.split_once('#') {
            Some((url, evaluator)) if !evaluator.is_empty() => {
                Source { fetch_url: url.to_string(), evaluator: Some(evaluator.to_string()) }
            }
            _ => Source { fetch_url: src.trim_end_matches('#').to_string(), evaluator: None },
        }
    }

    /// The raw source string as originally given, used for content-addressing
    /// the fetch cache (§4.3 step 2: "destination is content-addressed by the
    /// raw source string").
    pub fn raw(src: &str) -> &str {
        src
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.evaluator {
            Some(e) => write!(f, "{}#{}", self.fetch_url, e),
            None => write!(f, "{}", self.fetch_url),
        }
    }
}
