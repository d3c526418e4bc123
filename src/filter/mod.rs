// src/filter/mod.rs

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::{
    collections::{HashMap, HashSet},
    fs::{self, File},
    io::{BufWriter, Read, Write},
    path::Path,
};
use tracing::{debug, info};

/// One row of the manuscript metadata CSV.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkRecord {
    pub work_id: String,
    pub category: String,
}

/// work_id → distinct categories, iterated in order of first appearance.
#[derive(Debug, Default)]
pub struct WorkCategories {
    order: Vec<String>,
    by_work: HashMap<String, HashSet<String>>,
}

impl WorkCategories {
    pub fn insert(&mut self, work_id: String, category: String) {
        match self.by_work.get_mut(&work_id) {
            Some(set) => {
                set.insert(category);
            }
            None => {
                self.order.push(work_id.clone());
                self.by_work.insert(work_id, HashSet::from([category]));
            }
        }
    }

    pub fn get(&self, work_id: &str) -> Option<&HashSet<String>> {
        self.by_work.get(work_id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HashSet<String>)> {
        self.order
            .iter()
            .filter_map(|id| self.by_work.get(id).map(|cats| (id.as_str(), cats)))
    }
}

/// Counts reported after a filter run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterSummary {
    pub works_seen: usize,
    pub works_kept: usize,
}

/// Group categories per work from any CSV source with `work_id,category` headers.
pub fn read_categories<R: Read>(source: R) -> Result<WorkCategories> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(source);
    let mut works = WorkCategories::default();
    for (idx, result) in rdr.deserialize::<WorkRecord>().enumerate() {
        // idx + 2: one for the header, one for 1-based numbering
        let rec = result.with_context(|| format!("parsing work record on line {}", idx + 2))?;
        works.insert(rec.work_id, rec.category);
    }
    Ok(works)
}

pub fn read_csv(input_csv: &Path) -> Result<WorkCategories> {
    let file = File::open(input_csv).with_context(|| format!("opening {}", input_csv.display()))?;
    read_categories(file).with_context(|| format!("reading {}", input_csv.display()))
}

/// Works whose every category is allowed. A work with no categories passes.
pub fn filter_valid_work_ids(works: &WorkCategories, allowed: &HashSet<String>) -> Vec<String> {
    works
        .iter()
        .filter(|(_, cats)| cats.is_subset(allowed))
        .map(|(id, _)| id.to_string())
        .collect()
}

/// One id per line, newline-terminated, no header.
pub fn write_work_ids(output_txt: &Path, work_ids: &[String]) -> Result<()> {
    if let Some(parent) = output_txt.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory {}", parent.display()))?;
    }
    let file =
        File::create(output_txt).with_context(|| format!("creating {}", output_txt.display()))?;
    let mut out = BufWriter::new(file);
    for id in work_ids {
        writeln!(out, "{}", id)?;
    }
    out.flush()
        .with_context(|| format!("writing {}", output_txt.display()))?;
    Ok(())
}

pub fn filter_work_ids(
    input_csv: &Path,
    output_txt: &Path,
    allowed: &HashSet<String>,
) -> Result<FilterSummary> {
    let works = read_csv(input_csv)?;
    debug!(works = works.len(), "grouped categories");

    let valid = filter_valid_work_ids(&works, allowed);
    write_work_ids(output_txt, &valid)?;

    info!(
        seen = works.len(),
        kept = valid.len(),
        output = %output_txt.display(),
        "wrote filtered work ids"
    );
    Ok(FilterSummary {
        works_seen: works.len(),
        works_kept: valid.len(),
    })
}
