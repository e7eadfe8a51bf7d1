//! Translate heterogeneous tagger vocabularies onto a shared target tagset.
//!
//! A map file is a two-column TSV (`source_tag TAB target_tag`); a directory
//! of such files is the set of candidate maps. To standardize a tagged stream
//! the distinct tags it uses are collected, each candidate map is tried in
//! order, and the first map that knows at least 90% of those tags is used.
//! Order is meaningful: the first sufficient map wins even if a later one
//! would cover more.
//!
//! Which columns hold tags depends on the stream's [`Columns`] layout: only
//! the second column of token records (`form pos [lemma [score]]`), or every
//! odd column of lookup lines (`form pos lemma pos lemma ...`). Each
//! alternative of a `|`-delimited tag is translated on its own;
//! alternatives the map does not know are dropped, so a column whose tags are
//! all unknown becomes empty.
//!
//! ```rust
//! use ofl_tagset::{Columns, Standardizer, TagsetMap};
//!
//! let cattex = TagsetMap::parse("cattex", "NOMcom\tNOUN\nVERcjg\tVERB\n");
//! let std = Standardizer::new(vec![cattex]);
//! let out = std
//!     .standardize_text("chevalier\tNOMcom\nvait\tVERcjg|NOMcom\n", Columns::Token)
//!     .unwrap();
//! assert_eq!(out, "chevalier\tNOUN\nvait\tVERB|NOUN\n");
//! ```

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use ofl_types::{join_alternatives, split_alternatives, trim_newline};
use thiserror::Error;
use tracing::{debug, info};

/// Name of the pass-through map appended after the loaded candidates.
pub const IDENTITY_MAP: &str = "identity";

/// Errors raised while standardizing a tagged stream.
#[derive(Debug, Error)]
pub enum StandardizeError {
    /// No candidate map covers enough of the observed tags. Callers treat
    /// the input as already standardized.
    #[error("no tagset map covers 90% of the {distinct} observed tags")]
    MapNotFound { distinct: usize },
    #[error("failed to read or write tagged stream: {0}")]
    Io(#[from] std::io::Error),
}

/// Layout of a tagged stream: which tab-separated columns carry tags.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Columns {
    /// `form pos [lemma [score]]`; only the second column is a tag.
    #[default]
    Token,
    /// Lookup lines `form pos lemma [pos lemma ...]`; every odd column.
    Lookup,
}

impl Columns {
    pub fn is_tag(self, index: usize) -> bool {
        match self {
            Columns::Token => index == 1,
            Columns::Lookup => index % 2 == 1,
        }
    }
}

/// Mapping from one source tagset onto the target tagset.
#[derive(Clone, Debug, Default)]
pub struct TagsetMap {
    name: String,
    entries: HashMap<String, String>,
}

impl TagsetMap {
    /// Parse a map; lines without exactly two fields are skipped.
    pub fn parse(name: impl Into<String>, text: &str) -> Self {
        let name = name.into();
        let mut entries = HashMap::new();
        let mut skipped = 0usize;
        for line in text.lines() {
            let fields: Vec<&str> = trim_newline(line).split('\t').collect();
            match fields.as_slice() {
                [source, target] => {
                    entries.insert((*source).to_string(), (*target).to_string());
                }
                _ => skipped += 1,
            }
        }
        if skipped > 0 {
            debug!("tagset map {name}: {skipped} malformed lines skipped");
        }
        Self { name, entries }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text =
            fs::read_to_string(path).with_context(|| format!("read map {}", path.display()))?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::parse(name, &text))
    }

    /// Map every tag onto itself.
    pub fn identity<I, S>(name: impl Into<String>, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            entries: tags
                .into_iter()
                .map(|t| {
                    let t = t.into();
                    (t.clone(), t)
                })
                .collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, tag: &str) -> Option<&str> {
        self.entries.get(tag).map(String::as_str)
    }

    /// Target tags this map can produce.
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(String::as_str)
    }

    /// Number of observed tags missing from this map's domain.
    pub fn unmapped(&self, observed: &BTreeSet<String>) -> usize {
        observed
            .iter()
            .filter(|t| !self.entries.contains_key(t.as_str()))
            .count()
    }

    /// True when fewer than a tenth of the observed tags are unmapped.
    pub fn covers(&self, observed: &BTreeSet<String>) -> bool {
        self.unmapped(observed) * 10 < observed.len()
    }

    /// Translate one tag column alternative by alternative.
    pub fn translate_field(&self, field: &str) -> String {
        let mut out: Vec<&str> = Vec::new();
        for tag in split_alternatives(field) {
            if let Some(target) = self.get(tag)
                && !target.is_empty()
                && !out.contains(&target)
            {
                out.push(target);
            }
        }
        join_alternatives(out)
    }

    /// Translate the tag columns of a line, leaving the others as they are.
    pub fn translate_line(&self, line: &str, columns: Columns) -> String {
        trim_newline(line)
            .split('\t')
            .enumerate()
            .map(|(i, col)| {
                if columns.is_tag(i) {
                    self.translate_field(col)
                } else {
                    col.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("\t")
    }
}

/// Distinct tags used in the tag columns of a stream.
pub fn observed_tags<'a, I>(lines: I, columns: Columns) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut tags = BTreeSet::new();
    for line in lines {
        for (_, col) in trim_newline(line)
            .split('\t')
            .enumerate()
            .filter(|(i, _)| columns.is_tag(*i))
        {
            tags.extend(split_alternatives(col).map(str::to_string));
        }
    }
    tags
}

/// Ordered list of candidate maps with first-match selection.
#[derive(Clone, Debug, Default)]
pub struct Standardizer {
    maps: Vec<TagsetMap>,
}

impl Standardizer {
    /// Use the given maps in order, followed by an identity map over every
    /// target tag they produce, so that already standardized input passes
    /// through unchanged.
    pub fn new(mut maps: Vec<TagsetMap>) -> Self {
        let targets: BTreeSet<String> = maps
            .iter()
            .flat_map(|m| m.targets())
            .flat_map(split_alternatives)
            .map(str::to_string)
            .collect();
        if !targets.is_empty() {
            maps.push(TagsetMap::identity(IDENTITY_MAP, targets));
        }
        Self { maps }
    }

    /// Load every `*.tsv` map in a directory, ordered by file name.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir).with_context(|| format!("list maps in {}", dir.display()))? {
            let path = entry
                .with_context(|| format!("list maps in {}", dir.display()))?
                .path();
            if path.extension().is_some_and(|ext| ext == "tsv") {
                paths.push(path);
            }
        }
        paths.sort();
        let maps = paths
            .iter()
            .map(TagsetMap::load)
            .collect::<Result<Vec<_>>>()?;
        info!("{} tagset maps loaded from {}", maps.len(), dir.display());
        Ok(Self::new(maps))
    }

    pub fn maps(&self) -> &[TagsetMap] {
        &self.maps
    }

    /// First map clearing the coverage threshold for the observed tags.
    pub fn select(&self, observed: &BTreeSet<String>) -> Result<&TagsetMap, StandardizeError> {
        for map in &self.maps {
            let unmapped = map.unmapped(observed);
            debug!(
                "map {}: {} of {} observed tags unmapped",
                map.name(),
                unmapped,
                observed.len()
            );
            if map.covers(observed) {
                info!("using tagset map {}", map.name());
                return Ok(map);
            }
        }
        Err(StandardizeError::MapNotFound {
            distinct: observed.len(),
        })
    }

    /// Standardize a whole tagged stream held in memory.
    pub fn standardize_text(
        &self,
        text: &str,
        columns: Columns,
    ) -> Result<String, StandardizeError> {
        let observed = observed_tags(text.lines(), columns);
        let map = self.select(&observed)?;
        let mut out = String::with_capacity(text.len());
        for line in text.lines() {
            out.push_str(&map.translate_line(line, columns));
            out.push('\n');
        }
        Ok(out)
    }

    /// Standardize `input` into `output`.
    pub fn standardize_file(
        &self,
        input: &Path,
        output: &Path,
        columns: Columns,
    ) -> Result<(), StandardizeError> {
        let text = fs::read_to_string(input)?;
        let out = self.standardize_text(&text, columns)?;
        fs::write(output, out)?;
        Ok(())
    }
}
