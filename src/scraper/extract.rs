//! Results-page extraction: page source → per-field columns.
//!
//! Runs over the raw page source with CSS selectors, so it is testable on
//! fixture HTML without a browser. The walker feeds it one page at a time.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::models::{ExtractError, Field, PageRows};
use crate::sites::SiteProfile;
use crate::utils::collapse_whitespace;

fn parse_selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::Selector {
        selector: css.to_string(),
        detail: format!("{e:?}"),
    })
}

/// Consent overlays and placeholder nodes match ad selectors on some sites
/// but render no text; they are not listings.
fn has_visible_text(el: &ElementRef<'_>) -> bool {
    el.text().any(|t| !t.trim().is_empty())
}

fn element_text(el: &ElementRef<'_>) -> Option<String> {
    let joined = el.text().collect::<Vec<_>>().join(" ");
    let collapsed = collapse_whitespace(&joined);
    if collapsed.is_empty() { None } else { Some(collapsed) }
}

/// `href` of the element (or its first linked descendant), resolved against
/// the page URL for sites that emit relative links.
fn element_href(el: &ElementRef<'_>, page_url: &Url, a_sel: &Selector) -> Option<String> {
    let href = el
        .value()
        .attr("href")
        .or_else(|| el.select(a_sel).find_map(|a| a.value().attr("href")))?;
    match page_url.join(href) {
        Ok(resolved) => Some(resolved.to_string()),
        Err(_) => Some(href.to_string()),
    }
}

/// Extract every configured field for every ad on the page.
///
/// One value slot per ad: a missing sub-element becomes a `None` cell, a page
/// with no (non-empty) ad elements is a fatal error, and `PageRows` enforces
/// that no column can disagree with the ad count.
pub fn extract_page(
    html: &str,
    page_url: &Url,
    profile: &SiteProfile,
) -> Result<PageRows, ExtractError> {
    let doc = Html::parse_document(html);
    let ad_sel = parse_selector(profile.ad_selector)?;
    let a_sel = parse_selector("a[href]")?;

    let ads: Vec<ElementRef<'_>> = doc.select(&ad_sel).filter(has_visible_text).collect();
    if ads.is_empty() {
        return Err(ExtractError::NoListings {
            selector: profile.ad_selector.to_string(),
        });
    }

    let mut page = PageRows::new(ads.len());
    for (field, css) in profile.field_selectors {
        let sel = parse_selector(css)?;
        let values: Vec<Option<String>> = ads
            .iter()
            .map(|ad| {
                let hit = ad.select(&sel).next();
                match field {
                    Field::Url => hit.and_then(|el| element_href(&el, page_url, &a_sel)),
                    _ => hit.and_then(|el| element_text(&el)),
                }
            })
            .collect();
        page.push_column(*field, values)?;
    }

    Ok(page)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sites::Site;

    fn page_url() -> Url {
        Url::parse("https://www.pararius.nl/huurwoningen/utrecht/").unwrap()
    }

    fn pararius_ad(title: &str, href: &str, descr: Option<&str>) -> String {
        let descr_html = descr
            .map(|d| format!(r#"<p class="listing-search-item__description">{d}</p>"#))
            .unwrap_or_default();
        format!(
            r#"<section class="listing-search-item listing-search-item--list listing-search-item--for-rent">
                 <h2><a class="listing-search-item__link listing-search-item__link--title" href="{href}">
                   {title}
                 </a></h2>
                 {descr_html}
                 <div class="listing-search-item__location">Nieuw Lauwerecht 55</div>
                 <div class="listing-search-item__price">&euro; 1.250 per maand</div>
                 <ul class="illustrated-features illustrated-features--list">
                   <li>woonopp. 75 m&#178;</li><li>kamers 3</li>
                 </ul>
               </section>"#
        )
    }

    fn wrap(body: &str) -> String {
        format!("<html><body>{body}</body></html>")
    }

    #[test]
    fn extracts_columns_from_fixture_page() {
        let html = wrap(&format!(
            "{}{}",
            pararius_ad("Appartement Oudegracht", "/appartement/1", Some("Mooi appartement")),
            pararius_ad("Huis Biltstraat", "https://www.pararius.nl/huis/2", Some("Ruim huis")),
        ));

        let page = extract_page(&html, &page_url(), Site::Pararius.profile()).unwrap();
        assert_eq!(page.len(), 2);

        let mut table = crate::models::RawTable::new();
        table.extend(page).unwrap();

        assert_eq!(table.cell(Field::Title, 0), Some("Appartement Oudegracht"));
        assert_eq!(table.cell(Field::Descr, 1), Some("Ruim huis"));
        // relative href resolved against the page URL
        assert_eq!(
            table.cell(Field::Url, 0),
            Some("https://www.pararius.nl/appartement/1")
        );
        assert_eq!(
            table.cell(Field::Url, 1),
            Some("https://www.pararius.nl/huis/2")
        );
        // rendered text is whitespace-collapsed
        assert_eq!(table.cell(Field::Specs, 0), Some("woonopp. 75 m² kamers 3"));
    }

    #[test]
    fn missing_sub_element_becomes_none_cell() {
        let html = wrap(&format!(
            "{}{}",
            pararius_ad("Met beschrijving", "/a", Some("tekst")),
            pararius_ad("Zonder beschrijving", "/b", None),
        ));

        let page = extract_page(&html, &page_url(), Site::Pararius.profile()).unwrap();
        let mut table = crate::models::RawTable::new();
        table.extend(page).unwrap();

        assert_eq!(table.cell(Field::Descr, 0), Some("tekst"));
        assert_eq!(table.cell(Field::Descr, 1), None);
        assert_eq!(table.cell(Field::Title, 1), Some("Zonder beschrijving"));
    }

    #[test]
    fn page_without_ads_is_fatal() {
        let html = wrap("<div class='totally-different-layout'>niets</div>");
        let err = extract_page(&html, &page_url(), Site::Pararius.profile()).unwrap_err();
        assert!(matches!(err, ExtractError::NoListings { .. }));
    }

    #[test]
    fn empty_ad_elements_are_skipped() {
        let html = wrap(&format!(
            r#"<section class="listing-search-item listing-search-item--list listing-search-item--for-rent">
               </section>{}"#,
            pararius_ad("Echte advertentie", "/echt", None)
        ));

        let page = extract_page(&html, &page_url(), Site::Pararius.profile()).unwrap();
        assert_eq!(page.len(), 1);
    }
}
