//! The supported listing sites and their selector tables.
//!
//! Sites form a closed set: each variant binds a start URL and the CSS
//! selectors the walker and extractor need. Adding a site means adding a
//! variant and a profile here plus a cleaning arm in `scraper::cleaner`.

use clap::ValueEnum;
use std::fmt;

use crate::models::Field;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Site {
    Pararius,
    Jaap,
    Funda,
}

impl Site {
    /// Sites scraped when none are named on the command line. Funda stays
    /// opt-in: it fronts listings with bot detection that regularly eats the
    /// session.
    pub const DEFAULT: [Site; 2] = [Site::Pararius, Site::Jaap];

    pub const ALL: [Site; 3] = [Site::Pararius, Site::Jaap, Site::Funda];

    pub fn profile(self) -> &'static SiteProfile {
        match self {
            Site::Pararius => &PARARIUS,
            Site::Jaap => &JAAP,
            Site::Funda => &FUNDA,
        }
    }

    /// Short name used in snapshot file names and logs.
    pub fn key(self) -> &'static str {
        match self {
            Site::Pararius => "pararius",
            Site::Jaap => "jaap",
            Site::Funda => "funda",
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Everything the walker/extractor needs to know about one site.
pub struct SiteProfile {
    pub site: Site,
    pub start_url: &'static str,
    /// Host written into the `website` column; pagination must stay on it.
    pub host: &'static str,
    /// Selects one element per ad on a results page.
    pub ad_selector: &'static str,
    /// Per-field selectors, applied inside each ad element.
    pub field_selectors: &'static [(Field, &'static str)],
    pub next_selector: &'static str,
    /// Consent/cookie button to dismiss before the walk starts.
    pub consent_selector: Option<&'static str>,
    /// Long-description element on an ad's own page, for sites whose result
    /// list carries no description.
    pub detail_descr_selector: Option<&'static str>,
}

static PARARIUS: SiteProfile = SiteProfile {
    site: Site::Pararius,
    start_url: "https://www.pararius.nl/huurwoningen/utrecht/",
    host: "www.pararius.nl",
    ad_selector: ".listing-search-item.listing-search-item--list.listing-search-item--for-rent",
    field_selectors: &[
        (Field::Title, ".listing-search-item__link--title"),
        (Field::Descr, ".listing-search-item__description"),
        (Field::Address, ".listing-search-item__location"),
        (Field::Price, ".listing-search-item__price"),
        (Field::Specs, ".illustrated-features--list"),
        (Field::Url, ".listing-search-item__link--title"),
    ],
    next_selector: ".pagination__link--next",
    consent_selector: None,
    detail_descr_selector: None,
};

static JAAP: SiteProfile = SiteProfile {
    site: Site::Jaap,
    start_url: "https://www.jaap.nl/huurhuizen/utrecht/",
    host: "www.jaap.nl",
    ad_selector: ".property",
    field_selectors: &[
        (Field::Title, ".property-address-street"),
        (Field::Address, ".property-address-zipcity"),
        (Field::Price, ".property-price"),
        (Field::Specs, ".property-features"),
        (Field::Url, ".property-inner"),
    ],
    next_selector: ".navigation-button[rel='next']",
    consent_selector: None,
    detail_descr_selector: Some(".short-description"),
};

static FUNDA: SiteProfile = SiteProfile {
    site: Site::Funda,
    start_url: "https://www.funda.nl/huur/utrecht/",
    host: "www.funda.nl",
    ad_selector: ".search-result",
    field_selectors: &[
        (Field::Title, ".search-result__header-title"),
        (Field::Address, ".search-result__header-subtitle"),
        (Field::Price, ".search-result-price"),
        (Field::Specs, ".search-result-kenmerken"),
        (Field::Url, "[data-object-url-tracking='resultlist']"),
    ],
    next_selector: "[rel='next']",
    consent_selector: Some("#onetrust-accept-btn-handler"),
    detail_descr_selector: None,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_hosts_match_start_urls() {
        for site in Site::ALL {
            let p = site.profile();
            let parsed = url::Url::parse(p.start_url).unwrap();
            assert_eq!(parsed.host_str(), Some(p.host), "{site}");
        }
    }

    #[test]
    fn every_profile_extracts_title_and_url() {
        for site in Site::ALL {
            let fields: Vec<Field> = site
                .profile()
                .field_selectors
                .iter()
                .map(|(f, _)| *f)
                .collect();
            assert!(fields.contains(&Field::Title), "{site}");
            assert!(fields.contains(&Field::Url), "{site}");
        }
    }
}
