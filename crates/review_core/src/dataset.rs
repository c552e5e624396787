//! Tabular dataset of review records, backed by CSV files.

use crate::error::{Result, ReviewError};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io;
use std::path::Path;
use tempfile::NamedTempFile;

pub const IMAGE_PATH: &str = "actual_image_path";
pub const FILENAME: &str = "Filename";
pub const PRED_READING: &str = "pred_readings";
pub const PRED_UNIT: &str = "pred_units";
pub const ACTUAL_READING: &str = "Actual reading";
pub const ACTUAL_UNIT: &str = "Actual Unit";
pub const REVIEWED_BY: &str = "Reviewed by";

/// Columns filled in by the reviewer. Always present after a load.
pub const HUMAN_COLUMNS: [&str; 3] = [ACTUAL_READING, ACTUAL_UNIT, REVIEWED_BY];

const INPUT_COLUMNS: [&str; 3] = [IMAGE_PATH, PRED_READING, PRED_UNIT];
const SAVED_COLUMNS: [&str; 1] = [IMAGE_PATH];

/// One reviewable row: an image, the model's prediction and the reviewer's correction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    pub image_reference: String,
    pub filename: Option<String>,
    pub predicted_reading: String,
    pub predicted_unit: String,
    pub actual_reading: String,
    pub actual_unit: String,
    pub reviewed_by: String,
    /// Columns this tool does not interpret, passed through on save.
    extra: BTreeMap<String, String>,
}

impl Record {
    pub fn new(
        image_reference: impl Into<String>,
        predicted_reading: impl Into<String>,
        predicted_unit: impl Into<String>,
    ) -> Self {
        Self {
            image_reference: image_reference.into(),
            predicted_reading: predicted_reading.into(),
            predicted_unit: predicted_unit.into(),
            ..Self::default()
        }
    }

    pub fn is_reviewed(&self) -> bool {
        !self.reviewed_by.trim().is_empty()
    }

    /// Label shown under the image.
    pub fn caption(&self) -> &str {
        match self.filename.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => "Image",
        }
    }

    pub fn field(&self, column: &str) -> Option<&str> {
        match column {
            IMAGE_PATH => Some(&self.image_reference),
            FILENAME => self.filename.as_deref(),
            PRED_READING => Some(&self.predicted_reading),
            PRED_UNIT => Some(&self.predicted_unit),
            ACTUAL_READING => Some(&self.actual_reading),
            ACTUAL_UNIT => Some(&self.actual_unit),
            REVIEWED_BY => Some(&self.reviewed_by),
            other => self.extra.get(other).map(String::as_str),
        }
    }

    fn set_field(&mut self, column: &str, value: String) {
        match column {
            IMAGE_PATH => self.image_reference = value,
            FILENAME => self.filename = Some(value),
            PRED_READING => self.predicted_reading = value,
            PRED_UNIT => self.predicted_unit = value,
            ACTUAL_READING => self.actual_reading = value,
            ACTUAL_UNIT => self.actual_unit = value,
            REVIEWED_BY => self.reviewed_by = value,
            other => {
                self.extra.insert(other.to_string(), value);
            }
        }
    }
}

/// Ordered collection of records keyed by `image_reference`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    columns: Vec<String>,
    records: Vec<Record>,
}

impl Dataset {
    /// Build a dataset in memory. Missing reviewer columns are appended.
    pub fn from_records(columns: &[&str], records: Vec<Record>) -> Self {
        let mut dataset = Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            records,
        };
        dataset.ensure_human_columns();
        dataset
    }

    /// Load an input file. The image, reading and unit columns are required.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::read(path.as_ref(), &INPUT_COLUMNS)
    }

    /// Load a previously saved output file; only the image column is required.
    pub fn load_saved(path: impl AsRef<Path>) -> Result<Self> {
        Self::read(path.as_ref(), &SAVED_COLUMNS)
    }

    fn read(path: &Path, required: &[&str]) -> Result<Self> {
        if !path.exists() {
            return Err(ReviewError::InputMissing(path.to_path_buf()));
        }
        let mut rdr = csv::Reader::from_path(path)?;
        let columns: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        for column in required {
            if !columns.iter().any(|c| c == column) {
                return Err(ReviewError::MissingColumn {
                    column: column.to_string(),
                    path: path.to_path_buf(),
                });
            }
        }

        let mut records = Vec::new();
        let mut seen = HashSet::new();
        for row in rdr.records() {
            let row = row?;
            let mut record = Record::default();
            for (column, value) in columns.iter().zip(row.iter()) {
                record.set_field(column, value.to_string());
            }
            if !seen.insert(record.image_reference.clone()) {
                tracing::warn!(
                    "duplicate image reference '{}' in {}; edits go to the first row",
                    record.image_reference,
                    path.display()
                );
            }
            records.push(record);
        }

        let mut dataset = Self { columns, records };
        dataset.ensure_human_columns();
        tracing::info!("loaded {} rows from {}", dataset.len(), path.display());
        Ok(dataset)
    }

    fn ensure_human_columns(&mut self) {
        for column in HUMAN_COLUMNS {
            if !self.has_column(column) {
                self.columns.push(column.to_string());
            }
        }
    }

    /// Write every record to `path`, replacing the file in one rename.
    ///
    /// Rows are written to a temporary file next to `path` first, so a failed
    /// attempt leaves any existing file untouched. Missing parent directories
    /// are created.
    pub fn save(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;
        let tmp = NamedTempFile::new_in(dir)?;
        {
            let mut wtr = csv::Writer::from_writer(tmp.as_file());
            wtr.write_record(&self.columns)?;
            for record in &self.records {
                wtr.write_record(
                    self.columns
                        .iter()
                        .map(|column| record.field(column).unwrap_or_default()),
                )?;
            }
            wtr.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Copy non-blank reviewer values from `saved` onto matching records.
    ///
    /// Returns the number of records that received at least one value.
    pub fn merge_saved(&mut self, saved: &Dataset) -> usize {
        let mut merged = 0;
        for saved_record in &saved.records {
            let Some(target) = self.record_mut(&saved_record.image_reference) else {
                continue;
            };
            let mut touched = false;
            for column in HUMAN_COLUMNS {
                if let Some(value) = saved_record.field(column)
                    && !value.trim().is_empty()
                {
                    target.set_field(column, value.to_string());
                    touched = true;
                }
            }
            if touched {
                merged += 1;
            }
        }
        merged
    }

    /// Record the reviewer's values on the row with `image_reference`.
    pub fn apply_review(
        &mut self,
        image_reference: &str,
        actual_reading: &str,
        actual_unit: &str,
        reviewer: &str,
    ) -> bool {
        match self.record_mut(image_reference) {
            Some(record) => {
                record.actual_reading = actual_reading.to_string();
                record.actual_unit = actual_unit.to_string();
                record.reviewed_by = reviewer.to_string();
                true
            }
            None => false,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record(&self, image_reference: &str) -> Option<&Record> {
        self.records
            .iter()
            .find(|r| r.image_reference == image_reference)
    }

    fn record_mut(&mut self, image_reference: &str) -> Option<&mut Record> {
        self.records
            .iter_mut()
            .find(|r| r.image_reference == image_reference)
    }

    /// Records nobody has signed off yet, in file order.
    pub fn unreviewed(&self) -> impl Iterator<Item = &Record> {
        self.records.iter().filter(|r| !r.is_reviewed())
    }

    pub fn reviewed_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_reviewed()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    fn write(path: &Path, contents: &str) -> Result<()> {
        fs::write(path, contents)?;
        Ok(())
    }

    #[test]
    fn load_backfills_reviewer_columns() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("in.csv");
        write(
            &path,
            "actual_image_path,pred_readings,pred_units\na.jpg,1.0,kg\nb.jpg,2.0,g\n",
        )?;

        let dataset = Dataset::load(&path)?;
        assert_eq!(dataset.len(), 2);
        for column in HUMAN_COLUMNS {
            assert!(dataset.has_column(column));
        }
        for record in dataset.records() {
            for column in HUMAN_COLUMNS {
                assert_eq!(record.field(column), Some(""));
            }
            assert!(!record.is_reviewed());
        }
        Ok(())
    }

    #[test]
    fn load_missing_file_is_reported() -> Result<()> {
        let dir = tempdir()?;
        let err = Dataset::load(dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, ReviewError::InputMissing(_)));
        Ok(())
    }

    #[test]
    fn load_requires_prediction_columns() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("in.csv");
        write(&path, "actual_image_path,pred_readings\na.jpg,1\n")?;

        match Dataset::load(&path) {
            Err(ReviewError::MissingColumn { column, .. }) => assert_eq!(column, PRED_UNIT),
            other => panic!("unexpected result: {other:?}"),
        }
        // the saved-file loader only needs the key column
        assert_eq!(Dataset::load_saved(&path)?.len(), 1);
        Ok(())
    }

    #[test]
    fn save_keeps_unknown_columns_in_order() -> Result<()> {
        let dir = tempdir()?;
        let input = dir.path().join("in.csv");
        let output = dir.path().join("out.csv");
        write(
            &input,
            "site,actual_image_path,Filename,pred_readings,pred_units\nnorth,a.jpg,A,3,l\n",
        )?;

        let mut dataset = Dataset::load(&input)?;
        assert!(dataset.apply_review("a.jpg", "3.5", "l", "carol"));
        dataset.save(&output)?;

        let mut rdr = csv::Reader::from_path(&output)?;
        let headers = rdr.headers()?.clone();
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            vec![
                "site",
                "actual_image_path",
                "Filename",
                "pred_readings",
                "pred_units",
                "Actual reading",
                "Actual Unit",
                "Reviewed by"
            ]
        );
        let row = rdr.records().next().unwrap()?;
        assert_eq!(
            row.iter().collect::<Vec<_>>(),
            vec!["north", "a.jpg", "A", "3", "l", "3.5", "l", "carol"]
        );
        Ok(())
    }

    #[test]
    fn save_creates_missing_directories() -> Result<()> {
        let dir = tempdir()?;
        let output = dir.path().join("reviews").join("nested").join("alice.csv");
        let dataset = Dataset::from_records(
            &[IMAGE_PATH, PRED_READING, PRED_UNIT],
            vec![Record::new("a.jpg", "1", "kg")],
        );

        dataset.save(&output)?;
        assert_eq!(Dataset::load(&output)?, dataset);
        Ok(())
    }

    #[test]
    fn failed_rename_leaves_target_and_no_temp_files() -> Result<()> {
        let dir = tempdir()?;
        // a directory where the output file should go makes the final rename fail
        let output = dir.path().join("out.csv");
        fs::create_dir(&output)?;
        fs::write(output.join("keep.txt"), "previous")?;
        let dataset = Dataset::from_records(
            &[IMAGE_PATH, PRED_READING, PRED_UNIT],
            vec![Record::new("a.jpg", "1", "kg")],
        );

        assert!(dataset.save(&output).is_err());
        assert!(output.is_dir());
        assert_eq!(fs::read_to_string(output.join("keep.txt"))?, "previous");
        let leftovers: Vec<_> = fs::read_dir(dir.path())?
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
        Ok(())
    }

    #[test]
    fn merge_only_copies_non_blank_values() -> Result<()> {
        let columns = [IMAGE_PATH, PRED_READING, PRED_UNIT];
        let mut fresh = Dataset::from_records(
            &columns,
            vec![
                Record::new("a.jpg", "1", "kg"),
                Record::new("b.jpg", "2", "kg"),
            ],
        );
        let mut saved = fresh.clone();
        saved.apply_review("b.jpg", "2.2", "g", "bob");
        saved.apply_review("a.jpg", "", "", "");
        saved.records.push(Record::new("gone.jpg", "9", "kg"));

        assert_eq!(fresh.merge_saved(&saved), 1);
        let b = fresh.record("b.jpg").unwrap();
        assert_eq!(
            (b.actual_reading.as_str(), b.actual_unit.as_str(), b.reviewed_by.as_str()),
            ("2.2", "g", "bob")
        );
        assert!(!fresh.record("a.jpg").unwrap().is_reviewed());
        assert!(fresh.record("gone.jpg").is_none());
        Ok(())
    }

    #[test]
    fn review_targets_first_duplicate() {
        let mut dataset = Dataset::from_records(
            &[IMAGE_PATH, PRED_READING, PRED_UNIT],
            vec![Record::new("dup.jpg", "1", "kg"), Record::new("dup.jpg", "2", "kg")],
        );
        assert!(dataset.apply_review("dup.jpg", "1", "kg", "alice"));
        assert!(dataset.records()[0].is_reviewed());
        assert!(!dataset.records()[1].is_reviewed());
        assert!(!dataset.apply_review("missing.jpg", "1", "kg", "alice"));
    }

    #[test]
    fn caption_falls_back_to_image() {
        let mut record = Record::new("a.jpg", "1", "kg");
        assert_eq!(record.caption(), "Image");
        record.filename = Some("meter-7.jpg".into());
        assert_eq!(record.caption(), "meter-7.jpg");
    }

    #[test]
    fn whitespace_reviewer_counts_as_unreviewed() {
        let mut record = Record::new("a.jpg", "1", "kg");
        record.reviewed_by = "   ".into();
        let dataset = Dataset::from_records(&[IMAGE_PATH, PRED_READING, PRED_UNIT], vec![record]);
        assert_eq!(dataset.unreviewed().count(), 1);
        assert_eq!(dataset.reviewed_count(), 0);
    }
}
