pub mod split;
pub mod types;

pub use types::{FeatureRow, HEADER};

use std::path::Path;

use thiserror::Error;
use tracing::{debug, instrument};

use crate::harvest::PullRequestRecord;
use crate::persist;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;
const FEATURE_BRANCH_MARKER: &str = "feature/";

#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("Pull request {link} is missing required field {field}")]
    MissingField { link: String, field: &'static str },

    #[error("Pull request {link} has an unusable date range: created {created}, closed {closed}")]
    InvalidDates {
        link: String,
        created: i64,
        closed: i64,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// Flatten one merged pull request into a feature row.
///
/// Fails when the record has no self link, no close date, or dates whose
/// difference overflows; the remaining required fields were already enforced
/// when the record was decoded.
pub fn extract(record: &PullRequestRecord) -> Result<FeatureRow, FeatureError> {
    let link = record
        .self_link()
        .ok_or_else(|| FeatureError::MissingField {
            link: "<unknown>".to_string(),
            field: "links.self",
        })?
        .to_string();
    let closed = record.closed_date.ok_or_else(|| FeatureError::MissingField {
        link: link.clone(),
        field: "closedDate",
    })?;

    let elapsed = closed
        .checked_sub(record.created_date)
        .ok_or_else(|| FeatureError::InvalidDates {
            link: link.clone(),
            created: record.created_date,
            closed,
        })?;
    let hours = elapsed as f64 / MILLIS_PER_HOUR;
    let properties = record.properties.clone().unwrap_or_default();
    // UTF-16 code units, matching the length the data set was defined with.
    let description_length = record
        .description
        .as_deref()
        .map_or(0, |d| d.encode_utf16().count() as u64);

    Ok(FeatureRow {
        link,
        project: record.from_ref.repository.project.key.clone(),
        repo: record.from_ref.repository.slug.clone(),
        lifetime: hours.round_ties_even() as i64,
        author: record.author.user.name.clone(),
        reviewers_count: (record.reviewers.len() + record.participants.len()) as u64,
        comment_count: properties.comment_count.unwrap_or(0),
        resolved_tasks: properties.resolved_task_count.unwrap_or(0),
        description_length,
        branch: u8::from(record.from_ref.display_id.contains(FEATURE_BRANCH_MARKER)),
    })
}

/// Extract every record, in order. The first malformed record aborts.
pub fn extract_all(records: &[PullRequestRecord]) -> Result<Vec<FeatureRow>, FeatureError> {
    let rows = records.iter().map(extract).collect::<Result<Vec<_>, _>>()?;
    debug!(rows = rows.len(), "extracted feature rows");
    Ok(rows)
}

/// Write the header and rows to `path`, replacing any existing file.
#[instrument(skip(rows), fields(rows = rows.len(), path = %path.display()))]
pub fn write_csv(rows: &[FeatureRow], path: &Path) -> Result<(), FeatureError> {
    let staging = persist::staging_path(path);
    let result = write_rows(rows, &staging)
        .and_then(|()| persist::commit(&staging, path).map_err(|source| io_error(path, source)));
    if result.is_err() {
        persist::discard(&staging);
    }
    result?;
    debug!("wrote feature csv");
    Ok(())
}

fn write_rows(rows: &[FeatureRow], staging: &Path) -> Result<(), FeatureError> {
    let mut writer = csv::Writer::from_path(staging)?;
    if rows.is_empty() {
        writer.write_record(HEADER)?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush().map_err(|source| io_error(staging, source))
}

/// Read rows back from a file written by `write_csv`.
pub fn read_csv(path: &Path) -> Result<Vec<FeatureRow>, FeatureError> {
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader
        .deserialize::<FeatureRow>()
        .collect::<Result<Vec<_>, _>>()?;
    debug!(path = %path.display(), rows = rows.len(), "read feature csv");
    Ok(rows)
}

fn io_error(path: &Path, source: std::io::Error) -> FeatureError {
    FeatureError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harvest::tests::test_record;

    #[test]
    fn test_two_hours_lifetime() {
        let record = test_record("https://host/pr/1", "feature/login");
        let row = extract(&record).unwrap();
        assert_eq!(row.lifetime, 2);
        assert_eq!(row.project, "APP");
        assert_eq!(row.repo, "web");
        assert_eq!(row.author, "alice");
        assert_eq!(row.link, "https://host/pr/1");
    }

    #[test]
    fn test_lifetime_rounds_half_to_even() {
        let mut record = test_record("l", "main");
        record.closed_date = Some(9_000_000); // 2.5h
        assert_eq!(extract(&record).unwrap().lifetime, 2);
        record.closed_date = Some(12_600_000); // 3.5h
        assert_eq!(extract(&record).unwrap().lifetime, 4);
        record.closed_date = Some(6_000_000); // 1.67h
        assert_eq!(extract(&record).unwrap().lifetime, 2);
    }

    #[test]
    fn test_counts() {
        let record = test_record("l", "main");
        let row = extract(&record).unwrap();
        assert_eq!(row.reviewers_count, 3);
        assert_eq!(row.comment_count, 3);
        assert_eq!(row.resolved_tasks, 1);
        assert_eq!(row.description_length, "Adds login".len() as u64);
    }

    #[test]
    fn test_missing_optional_fields_default_to_zero() {
        let mut record = test_record("l", "main");
        record.properties = None;
        record.description = None;
        let row = extract(&record).unwrap();
        assert_eq!(row.comment_count, 0);
        assert_eq!(row.resolved_tasks, 0);
        assert_eq!(row.description_length, 0);

        record.properties = Some(Default::default());
        let row = extract(&record).unwrap();
        assert_eq!(row.comment_count, 0);
        assert_eq!(row.resolved_tasks, 0);
    }

    #[test]
    fn test_description_length_counts_utf16_units() {
        let mut record = test_record("l", "main");
        record.description = Some("Fix 😀".to_string());
        assert_eq!(extract(&record).unwrap().description_length, 6);

        record.description = Some("Größe".to_string());
        assert_eq!(extract(&record).unwrap().description_length, 5);
    }

    #[test]
    fn test_overflowing_date_range_fails() {
        let mut record = test_record("https://host/pr/3", "main");
        record.created_date = i64::MIN;
        record.closed_date = Some(i64::MAX);
        assert!(matches!(
            extract(&record),
            Err(FeatureError::InvalidDates { .. })
        ));
    }

    #[test]
    fn test_branch_flag() {
        let feature = extract(&test_record("l", "feature/foo")).unwrap();
        assert_eq!(feature.branch, 1);
        let release = extract(&test_record("l", "release/1.0")).unwrap();
        assert_eq!(release.branch, 0);
    }

    #[test]
    fn test_missing_closed_date_fails() {
        let mut record = test_record("https://host/pr/9", "main");
        record.closed_date = None;
        let err = extract(&record).unwrap_err();
        assert!(matches!(
            err,
            FeatureError::MissingField { field: "closedDate", .. }
        ));
    }

    #[test]
    fn test_missing_self_link_fails() {
        let mut record = test_record("l", "main");
        record.links.self_links.clear();
        assert!(matches!(
            extract(&record),
            Err(FeatureError::MissingField { field: "links.self", .. })
        ));
    }

    #[test]
    fn test_csv_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trainingdata.csv");
        let mut second = extract(&test_record("https://host/pr/2", "feature/x")).unwrap();
        second.author = "o'neil, jr".to_string();
        let rows = vec![extract(&test_record("https://host/pr/1", "main")).unwrap(), second];

        write_csv(&rows, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().next().unwrap(), HEADER.join(","));
        assert_eq!(read_csv(&path).unwrap(), rows);
    }

    #[test]
    fn test_failed_csv_write_leaves_no_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trainingdata.csv");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), "x").unwrap();

        let rows = vec![extract(&test_record("https://host/pr/1", "main")).unwrap()];
        assert!(write_csv(&rows, &path).is_err());
        assert!(!persist::staging_path(&path).exists());
    }

    #[test]
    fn test_empty_csv_still_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("testdata.csv");
        write_csv(&[], &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.trim_end(), HEADER.join(","));
        assert!(read_csv(&path).unwrap().is_empty());
    }
}
