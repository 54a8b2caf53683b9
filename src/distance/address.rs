//! Address normalization.
//!
//! A Dutch postal code pins a location down better than any scraped street
//! string, so when one occurs anywhere in an address it becomes the whole
//! address. The normalized form is what the distance cache keys on and what
//! the geocoder is asked about, so lookups can never disagree with writes.

use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

use crate::utils::collapse_whitespace;

/// Four digits + two capitals, optionally spaced: "3531JB", "3531 JB".
static POSTCODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]{4}\s*[A-Z]{2}").expect("valid pattern"));

/// Listing-title noise that sends free-text geocoding to the wrong place.
static KEYWORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i:appartement|huis|kamer)").expect("valid pattern"));

/// An address reduced to canonical form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedAddress {
    /// Bare whitespace-stripped postal code.
    Postcode(String),
    /// No postal code found; the trimmed original survives.
    Street(String),
}

impl NormalizedAddress {
    pub fn parse(raw: &str) -> Self {
        match extract_postcode(raw) {
            Some(code) => NormalizedAddress::Postcode(code),
            None => NormalizedAddress::Street(raw.trim().to_string()),
        }
    }

    /// Cache identity for this address.
    pub fn key(&self) -> &str {
        match self {
            NormalizedAddress::Postcode(code) => code,
            NormalizedAddress::Street(s) => s,
        }
    }
}

/// Find a postal code in free text, stripping internal whitespace
/// ("3531 JB" → "3531JB"). The first match wins when several occur.
pub fn extract_postcode(s: &str) -> Option<String> {
    let mut matches = POSTCODE_RE.find_iter(s);
    let first = matches.next()?;
    if matches.next().is_some() {
        warn!("Multiple postal codes in {:?}; using the first", s);
    }
    Some(first.as_str().split_whitespace().collect())
}

/// Strip housing keywords ("Appartement Oudegracht 12" → "Oudegracht 12")
/// and collapse the leftover whitespace. Query preparation only; cache keys
/// never see this.
pub fn strip_housing_keywords(s: &str) -> String {
    collapse_whitespace(&KEYWORD_RE.replace_all(s, ""))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_postal_codes() {
        assert_eq!(extract_postcode("1234AB").as_deref(), Some("1234AB"));
        assert_eq!(extract_postcode("1234 AB").as_deref(), Some("1234AB"));
        assert_eq!(extract_postcode("1234   AB").as_deref(), Some("1234AB"));
        assert_eq!(extract_postcode("123AB"), None);
        assert_eq!(extract_postcode("foo"), None);
    }

    #[test]
    fn finds_postal_code_inside_longer_address() {
        assert_eq!(
            extract_postcode("Oudegracht 12, 3511AB Utrecht").as_deref(),
            Some("3511AB")
        );
    }

    #[test]
    fn lowercase_letters_are_not_a_postal_code() {
        assert_eq!(extract_postcode("3531jb"), None);
    }

    #[test]
    fn first_of_multiple_codes_wins() {
        assert_eq!(
            extract_postcode("1234AB en ook 5678CD").as_deref(),
            Some("1234AB")
        );
    }

    #[test]
    fn normalization_is_idempotent() {
        let spaced = NormalizedAddress::parse("3531   AB");
        assert_eq!(spaced.key(), "3531AB");
        assert_eq!(NormalizedAddress::parse(spaced.key()), spaced);

        let street = NormalizedAddress::parse("  Oudegracht 12  ");
        assert_eq!(street.key(), "Oudegracht 12");
        assert_eq!(NormalizedAddress::parse(street.key()), street);
    }

    #[test]
    fn strips_housing_keywords_case_insensitively() {
        assert_eq!(
            strip_housing_keywords("Appartement Laan van Nieuw-Guinea Utrecht"),
            "Laan van Nieuw-Guinea Utrecht"
        );
        assert_eq!(
            strip_housing_keywords("Mooi HUIS aan de gracht"),
            "Mooi aan de gracht"
        );
        assert_eq!(strip_housing_keywords("gewoon adres"), "gewoon adres");
    }
}
