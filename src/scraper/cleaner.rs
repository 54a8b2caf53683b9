//! Raw page columns → typed listings.
//!
//! Every site decorates prices and crams size/rooms/year into one free-text
//! "specs" blob, each in its own dialect. The transforms here are pure
//! string work; anything that fails to parse stays `None` rather than
//! killing the run.

use chrono::NaiveDateTime;
use regex::Regex;

use crate::models::{Field, Listing, RawTable};
use crate::sites::Site;

// ── Shared parsers ────────────────────────────────────────────────────────────

/// Parse a euro amount by keeping digits only; thousands dots and currency
/// decorations vary per site ("€ 1.250 per maand", "€ 950 p/mnd", "€ 1.395 /mnd").
/// A decimal comma and anything after it is dropped.
pub fn parse_euro(s: &str) -> Option<u32> {
    let integer_part = match s.split_once(',') {
        Some((head, _)) => head,
        None => s,
    };
    let digits: String = integer_part
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() { None } else { digits.parse().ok() }
}

fn first_capture(re: &Regex, s: &str) -> Option<u32> {
    re.captures(s)?.get(1)?.as_str().parse().ok()
}

// ── Per-site cleaning ─────────────────────────────────────────────────────────

struct SiteCleaner {
    site: Site,
    size_re: Regex,
    rooms_re: Regex,
    year_re: Option<Regex>,
    nieuw_re: Regex,
}

impl SiteCleaner {
    fn new(site: Site) -> Self {
        let (size, rooms, year) = match site {
            // pararius: "woonopp. 75 m² kamers 3 bouwjaar 1906"
            Site::Pararius => (
                r"woonopp\.\s*([0-9]+)",
                r"kamers\s*([0-9]+)",
                Some(r"bouwjaar\s*([0-9]+)"),
            ),
            // jaap / funda: "75 m² 3 kamers"
            Site::Jaap | Site::Funda => (r"([0-9]+)\s*m²", r"([0-9]+)\s*kamers", None),
        };
        Self {
            site,
            size_re: Regex::new(size).expect("valid pattern"),
            rooms_re: Regex::new(rooms).expect("valid pattern"),
            year_re: year.map(|p| Regex::new(p).expect("valid pattern")),
            // "Nieuw" status badge glued onto pararius addresses; must not
            // touch street names like Nieuwegracht
            nieuw_re: Regex::new(r"(?i)^nieuw\s+").expect("valid pattern"),
        }
    }

    fn clean_row(&self, table: &RawTable, row: usize, now: NaiveDateTime) -> Listing {
        let get = |f: Field| table.cell(f, row).map(str::to_string);

        let ad_title = get(Field::Title);
        let mut address = get(Field::Address);
        let mut ad_url = get(Field::Url);
        let specs = table.cell(Field::Specs, row).unwrap_or("");

        match self.site {
            Site::Pararius => {
                address =
                    address.map(|a| self.nieuw_re.replace(&a, "").trim().to_string());
            }
            Site::Jaap => {
                // tracking query strings make identical ads look distinct
                ad_url = ad_url.map(|u| match u.split_once('?') {
                    Some((base, _)) => base.to_string(),
                    None => u,
                });
                // jaap renders some listings with the bare city as address;
                // the title carries the street in that case
                if address.as_deref().map(str::trim) == Some("Utrecht") {
                    address = ad_title.clone();
                }
            }
            Site::Funda => {}
        }

        Listing {
            ad_title,
            ad_descr: get(Field::Descr),
            address,
            price: table.cell(Field::Price, row).and_then(parse_euro),
            size_m2: first_capture(&self.size_re, specs),
            price_per_m2: None,
            nr_rooms: first_capture(&self.rooms_re, specs),
            dist_to_station: None,
            build_year: self
                .year_re
                .as_ref()
                .and_then(|re| first_capture(re, specs)),
            scrape_date: now,
            website: self.site.profile().host.to_string(),
            ad_url,
        }
    }
}

/// Clean every accumulated row for one site. `now` stamps the whole batch
/// with a single scrape time.
pub fn clean_table(site: Site, table: &RawTable, now: NaiveDateTime) -> Vec<Listing> {
    let cleaner = SiteCleaner::new(site);
    (0..table.len())
        .map(|row| cleaner.clean_row(table, row, now))
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PageRows;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn one_row(cells: &[(Field, &str)]) -> RawTable {
        let mut page = PageRows::new(1);
        for (field, value) in cells {
            page.push_column(*field, vec![Some(value.to_string())])
                .unwrap();
        }
        let mut table = RawTable::new();
        table.extend(page).unwrap();
        table
    }

    #[test]
    fn test_parse_euro() {
        assert_eq!(parse_euro("€ 1.250 per maand"), Some(1250));
        assert_eq!(parse_euro("€ 950"), Some(950));
        assert_eq!(parse_euro("€ 1.250,50"), Some(1250));
        assert_eq!(parse_euro("Prijs op aanvraag"), None);
        assert_eq!(parse_euro(""), None);
    }

    #[test]
    fn pararius_row_cleans_fully() {
        let table = one_row(&[
            (Field::Title, "Appartement Oudegracht"),
            (Field::Descr, "Mooi appartement in het centrum"),
            (Field::Address, "Nieuw Lauwerecht 55"),
            (Field::Price, "€ 1.250 per maand"),
            (Field::Specs, "woonopp. 75 m² kamers 3 bouwjaar 1906"),
            (Field::Url, "https://www.pararius.nl/appartement/1"),
        ]);

        let row = clean_table(Site::Pararius, &table, now()).remove(0);
        assert_eq!(row.address.as_deref(), Some("Lauwerecht 55"));
        assert_eq!(row.price, Some(1250));
        assert_eq!(row.size_m2, Some(75));
        assert_eq!(row.nr_rooms, Some(3));
        assert_eq!(row.build_year, Some(1906));
        assert_eq!(row.website, "www.pararius.nl");
        assert_eq!(row.price_per_m2, None);
    }

    #[test]
    fn pararius_keeps_streets_starting_with_nieuw() {
        let table = one_row(&[(Field::Address, "Nieuwegracht 12")]);
        let row = clean_table(Site::Pararius, &table, now()).remove(0);
        assert_eq!(row.address.as_deref(), Some("Nieuwegracht 12"));
    }

    #[test]
    fn jaap_row_strips_query_and_repairs_address() {
        let table = one_row(&[
            (Field::Title, "Oudegracht 12"),
            (Field::Address, "Utrecht"),
            (Field::Price, "€ 950 p/mnd"),
            (Field::Specs, "75 m² 3 kamers"),
            (
                Field::Url,
                "https://www.jaap.nl/huurhuizen/utrecht/1234?utm_source=overview",
            ),
        ]);

        let row = clean_table(Site::Jaap, &table, now()).remove(0);
        assert_eq!(
            row.ad_url.as_deref(),
            Some("https://www.jaap.nl/huurhuizen/utrecht/1234")
        );
        assert_eq!(row.address.as_deref(), Some("Oudegracht 12"));
        assert_eq!(row.price, Some(950));
        assert_eq!(row.size_m2, Some(75));
        assert_eq!(row.nr_rooms, Some(3));
        assert_eq!(row.website, "www.jaap.nl");
    }

    #[test]
    fn funda_row_parses_mnd_price() {
        let table = one_row(&[
            (Field::Title, "Biltstraat 100"),
            (Field::Price, "€ 1.395 /mnd"),
            (Field::Specs, "85 m² / 4 kamers"),
        ]);

        let row = clean_table(Site::Funda, &table, now()).remove(0);
        assert_eq!(row.price, Some(1395));
        assert_eq!(row.size_m2, Some(85));
        assert_eq!(row.nr_rooms, Some(4));
        assert_eq!(row.build_year, None);
    }

    #[test]
    fn unparsable_cells_stay_none() {
        let table = one_row(&[
            (Field::Title, "Kamer zonder details"),
            (Field::Price, "op aanvraag"),
            (Field::Specs, "gemeubileerd"),
        ]);

        let row = clean_table(Site::Pararius, &table, now()).remove(0);
        assert_eq!(row.price, None);
        assert_eq!(row.size_m2, None);
        assert_eq!(row.nr_rooms, None);
        assert_eq!(row.ad_descr, None);
        assert_eq!(row.address, None);
    }
}
