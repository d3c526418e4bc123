use anyhow::{bail, Context, Result};
use glob::Pattern;
use rayon::prelude::*;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};
use tracing::{debug, info};

use super::fields::{convert_unicode_to_tibetan, get_writing_type, parse_image_url, review_codes};
use crate::record::{OutputRow, RowWriter, DEFAULT_SCORE};

/// One reviewed line from an annotation export. Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnnotationEntry {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub image: String,
    #[serde(deserialize_with = "null_as_default")]
    pub user_input: String,
    #[serde(deserialize_with = "null_as_default")]
    pub accept: Vec<Value>,
}

fn null_as_default<'de, D, T>(d: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

// ids are usually strings, but some exports carry numbers
fn id_as_string<'de, D>(d: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(d)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

/// Counts reported after a conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionSummary {
    pub files: usize,
    pub rows: u64,
}

pub fn process_jsonl_entry(entry: &AnnotationEntry) -> OutputRow {
    OutputRow {
        origin_id: entry.id.clone(),
        img_url: parse_image_url(&entry.image),
        target: convert_unicode_to_tibetan(&entry.user_input),
        writing_type: get_writing_type(&review_codes(&entry.accept)),
        score: DEFAULT_SCORE,
    }
}

pub fn parse_jsonl_line(line: &str) -> Result<AnnotationEntry> {
    Ok(serde_json::from_str(line)?)
}

/// Feed every line of `path` through `f`, failing on the first bad line.
fn for_each_row<F>(path: &Path, mut f: F) -> Result<()>
where
    F: FnMut(OutputRow) -> Result<()>,
{
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line_no = idx + 1;
        let line =
            line.with_context(|| format!("reading {} line {}", path.display(), line_no))?;
        let entry = parse_jsonl_line(&line)
            .with_context(|| format!("decoding {} line {}", path.display(), line_no))?;
        f(process_jsonl_entry(&entry))?;
    }
    Ok(())
}

fn read_jsonl_rows(path: &Path) -> Result<Vec<OutputRow>> {
    let mut rows = Vec::new();
    for_each_row(path, |row| {
        rows.push(row);
        Ok(())
    })?;
    Ok(rows)
}

/// Single-file variant: stream `jsonl_file` line by line into `csv_file`.
pub fn convert_jsonl_to_csv(jsonl_file: &Path, csv_file: &Path) -> Result<ConversionSummary> {
    let mut writer = RowWriter::create(csv_file)?;
    for_each_row(jsonl_file, |row| writer.write(&row))?;
    let rows = writer.finish()?;

    info!(input = %jsonl_file.display(), rows, "converted jsonl file");
    Ok(ConversionSummary { files: 1, rows })
}

/// Regular files directly inside `dir` whose name ends in `.jsonl`, sorted by path.
pub fn list_jsonl_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }
    let dir_str = dir
        .to_str()
        .with_context(|| format!("non UTF-8 directory name {:?}", dir))?;
    let pattern = format!("{}/*.jsonl", Pattern::escape(dir_str));

    let files = glob::glob(&pattern)
        .with_context(|| format!("Failed to read glob pattern '{}'", pattern))?
        .filter_map(|entry| entry.ok())
        .filter(|p| p.is_file())
        .collect();
    Ok(files)
}

/// Directory variant: every `.jsonl` file in `jsonl_dir` into one CSV.
///
/// Files are decoded in parallel; rows are written in listing order, lines in
/// file order. Nothing is written if any file fails to decode.
pub fn convert_jsonl_dir_to_csv(jsonl_dir: &Path, csv_file: &Path) -> Result<ConversionSummary> {
    let files = list_jsonl_files(jsonl_dir)?;
    info!(dir = %jsonl_dir.display(), files = files.len(), "found jsonl files");

    let per_file: Vec<Vec<OutputRow>> = files
        .par_iter()
        .map(|path| -> Result<Vec<OutputRow>> {
            let rows = read_jsonl_rows(path)?;
            debug!(file = %path.display(), rows = rows.len(), "decoded");
            Ok(rows)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut writer = RowWriter::create(csv_file)?;
    for row in per_file.iter().flatten() {
        writer.write(row)?;
    }
    let rows = writer.finish()?;

    info!(dir = %jsonl_dir.display(), rows, "converted jsonl directory");
    Ok(ConversionSummary {
        files: files.len(),
        rows,
    })
}

/// Directory input → combined conversion, anything else → single-file conversion.
pub fn convert_path(input: &Path, csv_file: &Path) -> Result<ConversionSummary> {
    if input.is_dir() {
        convert_jsonl_dir_to_csv(input, csv_file)
    } else {
        convert_jsonl_to_csv(input, csv_file)
    }
}
