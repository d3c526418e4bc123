use anyhow::{Context, Result};
use csv::{Writer, WriterBuilder};
use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};

use super::{OutputRow, OUTPUT_HEADER};

/// Streams `OutputRow`s into a CSV file that always starts with `OUTPUT_HEADER`.
pub struct RowWriter {
    inner: Writer<File>,
    path: PathBuf,
    rows: u64,
}

impl RowWriter {
    /// Create (or truncate) `path`, creating parent directories, and write the header.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating output directory {}", parent.display()))?;
        }

        // header is written by hand so an empty dataset still gets one
        let mut inner = WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)
            .with_context(|| format!("creating {}", path.display()))?;
        inner
            .write_record(OUTPUT_HEADER)
            .with_context(|| format!("writing header to {}", path.display()))?;

        Ok(Self {
            inner,
            path,
            rows: 0,
        })
    }

    pub fn write(&mut self, row: &OutputRow) -> Result<()> {
        self.inner
            .serialize(row)
            .with_context(|| format!("writing row {} to {}", self.rows + 1, self.path.display()))?;
        self.rows += 1;
        Ok(())
    }

    /// Flush and return the number of data rows written.
    pub fn finish(mut self) -> Result<u64> {
        self.inner
            .flush()
            .with_context(|| format!("flushing {}", self.path.display()))?;
        Ok(self.rows)
    }
}

/// Write header + all `rows` to `path`, overwriting any existing file.
pub fn write_rows<'a, I>(path: impl AsRef<Path>, rows: I) -> Result<u64>
where
    I: IntoIterator<Item = &'a OutputRow>,
{
    let mut writer = RowWriter::create(path)?;
    for row in rows {
        writer.write(row)?;
    }
    writer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{WritingType, DEFAULT_SCORE};
    use tempfile::tempdir;

    #[test]
    fn empty_dataset_still_has_header() {
        let tmp = tempdir().unwrap();
        let out = tmp.path().join("empty.csv");

        let rows: Vec<OutputRow> = Vec::new();
        let written = write_rows(&out, &rows).unwrap();

        assert_eq!(written, 0);
        let text = fs::read_to_string(&out).unwrap();
        assert_eq!(text, "origin_id,img_url,target,writing_type,score\n");
    }

    #[test]
    fn rows_are_quoted_when_needed() {
        let tmp = tempdir().unwrap();
        let out = tmp.path().join("nested").join("rows.csv");
        let row = OutputRow {
            origin_id: "a1".to_string(),
            img_url: "https://e.com/a.jpg".to_string(),
            target: "line one, with comma".to_string(),
            writing_type: WritingType::NonUchen,
            score: DEFAULT_SCORE,
        };

        let written = write_rows(&out, [&row]).unwrap();

        assert_eq!(written, 1);
        let text = fs::read_to_string(&out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[1],
            "a1,https://e.com/a.jpg,\"line one, with comma\",Non_Uchen,15"
        );
    }

    #[test]
    fn overwrites_existing_file() {
        let tmp = tempdir().unwrap();
        let out = tmp.path().join("rows.csv");
        fs::write(&out, "stale content\nmore stale\nand more\n").unwrap();

        let rows: Vec<OutputRow> = Vec::new();
        write_rows(&out, &rows).unwrap();

        let text = fs::read_to_string(&out).unwrap();
        assert_eq!(text.lines().count(), 1);
    }
}
