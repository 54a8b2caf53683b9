use crate::models::{Field, Listing, RawTable};
use crate::sites::Site;
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

// ── Layout ────────────────────────────────────────────────────────────────────

/// Where everything lives under the data directory:
///
/// ```text
/// data/
///   scrape_data.csv            accumulated dataset, deduplicated
///   scrape_data_filtered.csv   filtered report
///   cache_distances_data.csv   distance memo
///   raw/       <site>_<stamp>.csv   per-run snapshots, as extracted
///   cleaned/   <site>_<stamp>.csv   per-run snapshots, after cleaning
///   enriched/  <site>_<stamp>.csv   per-run snapshots, with distances
///   backups/   scrape_data_<stamp>.csv
/// ```
#[derive(Debug, Clone)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn dataset(&self) -> PathBuf {
        self.root.join("scrape_data.csv")
    }

    pub fn filtered(&self) -> PathBuf {
        self.root.join("scrape_data_filtered.csv")
    }

    pub fn distance_cache(&self) -> PathBuf {
        self.root.join("cache_distances_data.csv")
    }

    pub fn raw_snapshot(&self, site: Site, now: NaiveDateTime) -> PathBuf {
        self.root
            .join("raw")
            .join(format!("{}_{}.csv", site.key(), stamp(now)))
    }

    pub fn cleaned_snapshot(&self, site: Site, now: NaiveDateTime) -> PathBuf {
        self.root
            .join("cleaned")
            .join(format!("{}_{}.csv", site.key(), stamp(now)))
    }

    pub fn enriched_snapshot(&self, site: Site, now: NaiveDateTime) -> PathBuf {
        self.root
            .join("enriched")
            .join(format!("{}_{}.csv", site.key(), stamp(now)))
    }

    pub fn backup(&self, now: NaiveDateTime) -> PathBuf {
        self.root
            .join("backups")
            .join(format!("scrape_data_{}.csv", stamp(now)))
    }
}

fn stamp(now: NaiveDateTime) -> String {
    now.format("%Y%m%d_%H%M").to_string()
}

// ── Dataset ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct AppendStats {
    pub appended: usize,
    pub skipped: usize,
}

/// The accumulated listings file. Append-only from the caller's point of
/// view; duplicates of rows already on disk are dropped, first write wins.
pub struct Dataset {
    path: PathBuf,
}

impl Dataset {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Could not create dir {:?}", parent))?;
        }
        Ok(Self { path })
    }

    /// All rows currently on disk; a dataset that does not exist yet is empty.
    pub fn load(&self) -> Result<Vec<Listing>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.path)
            .with_context(|| format!("Failed to open dataset {:?}", self.path))?;
        let rows = reader
            .deserialize()
            .collect::<std::result::Result<Vec<Listing>, _>>()
            .with_context(|| format!("Malformed dataset {:?}", self.path))?;
        Ok(rows)
    }

    /// Merge freshly scraped rows into the dataset. The existing file is
    /// copied to `backup` first, then rewritten with the merged rows; a row
    /// whose identity already occurs keeps its original copy.
    pub fn append_dedup(&self, incoming: &[Listing], backup: Option<&Path>) -> Result<AppendStats> {
        let mut rows = self.load()?;

        if self.path.exists() {
            if let Some(backup) = backup {
                if let Some(parent) = backup.parent() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("Could not create dir {:?}", parent))?;
                }
                std::fs::copy(&self.path, backup)
                    .with_context(|| format!("Backup to {:?} failed", backup))?;
                debug!("Backed up dataset to {:?}", backup);
            }
        }

        let mut seen: HashSet<_> = rows.iter().map(owned_key).collect();

        let mut stats = AppendStats::default();
        for row in incoming {
            if seen.insert(owned_key(row)) {
                rows.push(row.clone());
                stats.appended += 1;
            } else {
                stats.skipped += 1;
            }
        }

        write_listings(&self.path, &rows)?;
        info!(
            "Dataset now {} rows ({} appended, {} duplicates skipped)",
            rows.len(),
            stats.appended,
            stats.skipped
        );
        Ok(stats)
    }
}

fn owned_key(row: &Listing) -> (Option<String>, Option<u32>, Option<String>, String) {
    let (title, price, url, website) = row.dedup_key();
    (
        title.map(str::to_string),
        price,
        url.map(str::to_string),
        website.to_string(),
    )
}

// ── Snapshot writers ──────────────────────────────────────────────────────────

pub fn write_listings(path: &Path, rows: &[Listing]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Could not create dir {:?}", parent))?;
    }
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("Failed to write {:?}", path))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Dump the raw column table exactly as extracted, absent cells left empty.
pub fn write_raw_table(path: &Path, table: &RawTable) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Could not create dir {:?}", parent))?;
    }
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("Failed to write {:?}", path))?;

    let fields: Vec<Field> = table.fields().collect();
    writer.write_record(fields.iter().map(|f| f.name()))?;
    for row in 0..table.len() {
        writer.write_record(fields.iter().map(|f| table.cell(*f, row).unwrap_or("")))?;
    }
    writer.flush()?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PageRows;
    use chrono::NaiveDate;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 8, 23)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn listing(title: &str, price: u32) -> Listing {
        Listing {
            ad_title: Some(title.to_string()),
            ad_descr: None,
            address: Some("3531JB".to_string()),
            price: Some(price),
            size_m2: Some(75),
            price_per_m2: None,
            nr_rooms: Some(3),
            dist_to_station: None,
            build_year: None,
            scrape_date: noon(),
            website: "www.pararius.nl".to_string(),
            ad_url: Some(format!("https://www.pararius.nl/{title}")),
        }
    }

    #[test]
    fn paths_follow_the_layout() {
        let paths = DataPaths::new("data");
        assert_eq!(paths.dataset(), PathBuf::from("data/scrape_data.csv"));
        assert_eq!(
            paths.raw_snapshot(Site::Jaap, noon()),
            PathBuf::from("data/raw/jaap_20260823_1200.csv")
        );
        assert_eq!(
            paths.backup(noon()),
            PathBuf::from("data/backups/scrape_data_20260823_1200.csv")
        );
    }

    #[test]
    fn missing_dataset_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = Dataset::open(dir.path().join("scrape_data.csv")).unwrap();
        assert!(dataset.load().unwrap().is_empty());
    }

    #[test]
    fn append_dedup_keeps_the_first_copy() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = Dataset::open(dir.path().join("scrape_data.csv")).unwrap();

        let first = dataset
            .append_dedup(&[listing("a", 1200), listing("b", 1300)], None)
            .unwrap();
        assert_eq!(first.appended, 2);
        assert_eq!(first.skipped, 0);

        // re-scrape sees one old ad and one new one
        let mut rescraped = listing("a", 1200);
        rescraped.ad_descr = Some("later description".to_string());
        let second = dataset
            .append_dedup(&[rescraped, listing("c", 1400)], None)
            .unwrap();
        assert_eq!(second.appended, 1);
        assert_eq!(second.skipped, 1);

        let rows = dataset.load().unwrap();
        assert_eq!(rows.len(), 3);
        // the duplicate kept its original (description-less) copy
        assert_eq!(rows[0].ad_title.as_deref(), Some("a"));
        assert_eq!(rows[0].ad_descr, None);
        assert_eq!(rows[2].ad_title.as_deref(), Some("c"));
    }

    #[test]
    fn price_change_is_a_new_row() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = Dataset::open(dir.path().join("scrape_data.csv")).unwrap();

        dataset.append_dedup(&[listing("a", 1200)], None).unwrap();
        let stats = dataset.append_dedup(&[listing("a", 1100)], None).unwrap();
        assert_eq!(stats.appended, 1);
        assert_eq!(dataset.load().unwrap().len(), 2);
    }

    #[test]
    fn backup_snapshots_the_pre_append_state() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = Dataset::open(dir.path().join("scrape_data.csv")).unwrap();
        let backup = dir.path().join("backups").join("scrape_data_x.csv");

        // nothing to back up on the very first write
        dataset
            .append_dedup(&[listing("a", 1200)], Some(&backup))
            .unwrap();
        assert!(!backup.exists());

        dataset
            .append_dedup(&[listing("b", 1300)], Some(&backup))
            .unwrap();
        assert!(backup.exists());

        let mut reader = csv::Reader::from_path(&backup).unwrap();
        let backed_up: Vec<Listing> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(backed_up.len(), 1);
        assert_eq!(dataset.load().unwrap().len(), 2);
    }

    #[test]
    fn listings_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = Dataset::open(dir.path().join("scrape_data.csv")).unwrap();

        let mut row = listing("a", 1200);
        row.price_per_m2 = Some(16.0);
        row.dist_to_station = Some(1.82);
        dataset.append_dedup(std::slice::from_ref(&row), None).unwrap();

        assert_eq!(dataset.load().unwrap(), vec![row]);
    }

    #[test]
    fn raw_snapshot_writes_all_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw").join("pararius.csv");

        let mut table = RawTable::new();
        let mut page = PageRows::new(2);
        page.push_column(
            Field::Title,
            vec![Some("a".into()), Some("b".into())],
        )
        .unwrap();
        page.push_column(Field::Price, vec![Some("€ 1.200".into()), None])
            .unwrap();
        table.extend(page).unwrap();

        write_raw_table(&path, &table).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("ad_title,price"));
        assert_eq!(lines.next(), Some("a,€ 1.200"));
        assert_eq!(lines.next(), Some("b,"));
    }
}
