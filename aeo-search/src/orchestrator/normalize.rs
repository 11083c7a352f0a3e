//! Citation normalisation for heterogeneous provider payloads.
//!
//! Every [`ProviderPayload`] variant is reduced to the same ordered list of
//! [`Citation`]s: structured entries first, in provider order, followed by
//! URLs found in the free-form answer text. A URL appears at most once per
//! provider; the first occurrence wins. Structured entries missing a URL or
//! title are kept with empty fields so positions match the provider's list.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::types::{Citation, ProviderPayload};

/// Characters stripped from the end of a URL found in prose.
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':'];

/// Scheme, authority and path up to the first whitespace, quote, bracket
/// or parenthesis, so Markdown links yield the bare URL.
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    // The pattern is a literal; compilation cannot fail at runtime.
    Regex::new(r#"https?://[^\s<>"{}|\\^`\[\]()]+"#).expect("URL pattern is a valid regex")
});

/// Find URL-shaped substrings in `text`, in order of appearance.
///
/// Trailing `.`, `,`, `;` and `:` are removed from each match. Duplicates
/// are kept; [`normalize`] decides which occurrence survives.
pub fn extract_urls(text: &str) -> Vec<String> {
    URL_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(TRAILING_PUNCTUATION))
        .filter(|url| !url.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Reduce one provider payload to its ordered citation list.
///
/// # Algorithm
///
/// 1. Structured entries become citations numbered from 1 in provider
///    order. Missing URLs or titles become empty strings; an entry with
///    neither is still emitted.
/// 2. URLs extracted from the answer text are appended with the next
///    positions after the last structured entry.
/// 3. A URL already collected (exact, case-sensitive match) is skipped.
///
/// Error payloads and empty answers produce an empty list. This function
/// never fails.
pub fn normalize(payload: &ProviderPayload) -> Vec<Citation> {
    let mut citations = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut next_position: u32 = 1;

    if let ProviderPayload::Structured {
        citations: entries, ..
    } = payload
    {
        for entry in entries {
            let position = next_position;
            next_position = next_position.saturating_add(1);

            let url = entry.url.clone().unwrap_or_default();
            let title = entry.title.clone().unwrap_or_default();
            if !url.is_empty() && !seen.insert(url.clone()) {
                continue;
            }
            citations.push(Citation::new(position, url, title));
        }
    }

    for url in extract_urls(payload.answer()) {
        if seen.insert(url.clone()) {
            citations.push(Citation::new(next_position, url, ""));
            next_position = next_position.saturating_add(1);
        }
    }

    citations
}
