//! Load form-to-lemma lexicons and answer per-token lookups.
//!
//! A lexicon file holds one `lemma TAB pos TAB form[|form...]` record per
//! line. One (lemma, pos) pair may list many surface forms and one surface form
//! may belong to many pairs; [`Lexicon`] inverts the records into a
//! form-keyed index whose lemma and POS lists stay index-aligned.
//!
//! Files can be memory-mapped or read into owned buffers ([`LoadMode`]).
//! Malformed records are skipped. Forms are keyed through a [`Normalizer`]
//! whose options are sniffed from the lexicon itself, and the same normalizer
//! is applied to incoming tokens at lookup time.
//!
//! # Example
//! ```no_run
//! use ofl_lexicon::{Lexicon, LoadMode};
//!
//! # fn main() -> anyhow::Result<()> {
//! let lex = Lexicon::load_with_mode("/path/to/lexicon.tsv", LoadMode::Mmap, true)?;
//! let hit = lex.lookup("Chevaliers");
//! println!("{hit}");
//! # Ok(()) }
//! ```
//!
//! For a runnable demo, see `cargo run -p ofl-lexicon --example lookup -- <lexicon> <token>...`.

mod normalize;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use memmap2::Mmap;
use ofl_types::{LookupCandidates, strip_homograph_number, trim_newline};
use tracing::{debug, info};

pub use normalize::{Normalizer, NormalizerOptions, PLACEHOLDER};

/// Strategy for reading lexicon files.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LoadMode {
    /// Memory-map the file.
    Mmap,
    /// Read the file into an owned buffer.
    Owned,
}

impl LoadMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "mmap" => Some(LoadMode::Mmap),
            "owned" => Some(LoadMode::Owned),
            _ => None,
        }
    }
}

enum Buffer {
    Mmap(Mmap),
    Owned(Vec<u8>),
}

impl Buffer {
    fn as_slice(&self) -> &[u8] {
        match self {
            Buffer::Mmap(m) => m.as_ref(),
            Buffer::Owned(v) => v.as_slice(),
        }
    }
}

/// One well-formed lexicon record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LexiconRecord<'a> {
    pub lemma: &'a str,
    pub pos: &'a str,
    pub forms: Vec<&'a str>,
}

impl<'a> LexiconRecord<'a> {
    /// Parse `lemma TAB pos TAB forms`; any other field count yields `None`.
    pub fn parse(line: &'a str) -> Option<Self> {
        let fields: Vec<&str> = trim_newline(line).split('\t').collect();
        let [lemma, pos, forms] = fields.as_slice() else {
            return None;
        };
        Some(Self {
            lemma: *lemma,
            pos: *pos,
            forms: forms.split('|').filter(|f| !f.is_empty()).collect(),
        })
    }
}

#[derive(Clone, Debug, Default)]
struct FormEntries {
    lemmas: Vec<String>,
    poss: Vec<String>,
}

/// Counters reported after parsing.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ParseStats {
    pub records: usize,
    pub skipped: usize,
}

/// Form-keyed lexicon index.
#[derive(Clone, Debug)]
pub struct Lexicon {
    normalizer: Normalizer,
    forms: HashMap<String, FormEntries>,
    stats: ParseStats,
}

impl Lexicon {
    /// Load a lexicon file, memory-mapping it.
    pub fn load(path: impl AsRef<Path>, strip_numbers: bool) -> Result<Self> {
        Self::load_with_mode(path, LoadMode::Mmap, strip_numbers)
    }

    /// Load a lexicon file choosing between mmap and an owned buffer.
    ///
    /// With `strip_numbers`, trailing homograph numbers are removed from
    /// lemmas before indexing (`bank1`, `bank2` both index as `bank`).
    pub fn load_with_mode(
        path: impl AsRef<Path>,
        mode: LoadMode,
        strip_numbers: bool,
    ) -> Result<Self> {
        let path = path.as_ref();
        let buffer = load_file(path, mode)?;
        let text = std::str::from_utf8(buffer.as_slice())
            .with_context(|| format!("{} is not valid utf-8", path.display()))?;
        let lexicon = Self::parse(text, strip_numbers);
        info!(
            "lexicon {}: {} records, {} forms, {} malformed lines skipped",
            path.display(),
            lexicon.stats.records,
            lexicon.form_count(),
            lexicon.stats.skipped
        );
        Ok(lexicon)
    }

    /// Build an index from lexicon text.
    pub fn parse(text: &str, strip_numbers: bool) -> Self {
        let mut stats = ParseStats::default();
        let mut records = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match LexiconRecord::parse(line) {
                Some(record) => records.push(record),
                None => {
                    debug!("lexicon line {} skipped: wrong field count", lineno + 1);
                    stats.skipped += 1;
                }
            }
        }
        stats.records = records.len();

        let options =
            NormalizerOptions::sniff(records.iter().flat_map(|r| r.forms.iter().copied()));
        let mut lexicon = Self {
            normalizer: Normalizer::new(options),
            forms: HashMap::new(),
            stats,
        };
        for record in &records {
            let lemma = if strip_numbers {
                strip_homograph_number(record.lemma)
            } else {
                record.lemma
            };
            for form in &record.forms {
                lexicon.insert(form, lemma, record.pos);
            }
        }
        lexicon
    }

    fn insert(&mut self, form: &str, lemma: &str, pos: &str) {
        let key = self.normalizer.normalize(form);
        let entry = self.forms.entry(key).or_default();
        entry.lemmas.push(lemma.to_string());
        entry.poss.push(pos.to_string());
    }

    /// Fold another lexicon into this one.
    ///
    /// Candidate lists are concatenated per form without deduplication; the
    /// other lexicon's forms are re-keyed with this lexicon's normalizer.
    pub fn merge(&mut self, other: Lexicon) {
        for (form, entries) in other.forms {
            for (lemma, pos) in entries.lemmas.iter().zip(&entries.poss) {
                self.insert(&form, lemma, pos);
            }
        }
        self.stats.records += other.stats.records;
        self.stats.skipped += other.stats.skipped;
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn stats(&self) -> ParseStats {
        self.stats
    }

    pub fn form_count(&self) -> usize {
        self.forms.len()
    }

    /// Lemmas recorded for an already-normalized form, or an empty slice.
    pub fn lemmas_for(&self, form: &str) -> &[String] {
        self.forms
            .get(form)
            .map(|e| e.lemmas.as_slice())
            .unwrap_or(&[])
    }

    /// POS tags recorded for an already-normalized form, index-aligned with
    /// [`lemmas_for`](Self::lemmas_for).
    pub fn poss_for(&self, form: &str) -> &[String] {
        self.forms
            .get(form)
            .map(|e| e.poss.as_slice())
            .unwrap_or(&[])
    }

    /// Deduplicated `(pos, lemma)` candidates for an already-normalized form.
    pub fn candidates(&self, form: &str) -> LookupCandidates {
        LookupCandidates::from_pairs(
            self.poss_for(form)
                .iter()
                .map(String::as_str)
                .zip(self.lemmas_for(form).iter().map(String::as_str)),
        )
    }

    /// Look up a raw token.
    ///
    /// The token is normalized first; when that misses, the lowercased form
    /// is tried. A miss yields the normalized form with no candidates.
    pub fn lookup(&self, raw: &str) -> Lookup {
        let form = self.normalizer.normalize(raw);
        if self.forms.contains_key(&form) {
            let candidates = self.candidates(&form);
            return Lookup { form, candidates };
        }
        let lower = form.to_lowercase();
        if lower != form && self.forms.contains_key(&lower) {
            let candidates = self.candidates(&lower);
            return Lookup {
                form: lower,
                candidates,
            };
        }
        Lookup {
            form,
            candidates: LookupCandidates::new(),
        }
    }

    /// Every lemma in the index, for building an attestation set.
    pub fn lemmas(&self) -> impl Iterator<Item = &str> {
        self.forms
            .values()
            .flat_map(|e| e.lemmas.iter().map(String::as_str))
    }
}

/// Result of [`Lexicon::lookup`], rendered as a lookup line.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Lookup {
    pub form: String,
    pub candidates: LookupCandidates,
}

impl Lookup {
    pub fn is_hit(&self) -> bool {
        !self.candidates.is_empty()
    }
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.form)?;
        if self.is_hit() {
            write!(f, "\t{}", self.candidates.to_fields())?;
        }
        Ok(())
    }
}

/// Set of lemmas known to occur in a reference lexicon.
#[derive(Clone, Debug, Default)]
pub struct AttestedLemmas {
    lemmas: HashSet<String>,
    strip_numbers: bool,
}

impl AttestedLemmas {
    pub fn new(strip_numbers: bool) -> Self {
        Self {
            lemmas: HashSet::new(),
            strip_numbers,
        }
    }

    /// Collect the lemma of every well-formed record in the given lexicon files.
    pub fn load<P: AsRef<Path>>(paths: &[P], strip_numbers: bool) -> Result<Self> {
        let mut set = Self::new(strip_numbers);
        for path in paths {
            let path = path.as_ref();
            let buffer = load_file(path, LoadMode::Owned)?;
            let text = std::str::from_utf8(buffer.as_slice())
                .with_context(|| format!("{} is not valid utf-8", path.display()))?;
            for record in text.lines().filter_map(LexiconRecord::parse) {
                set.insert(record.lemma);
            }
        }
        info!("{} attested lemmas loaded", set.len());
        Ok(set)
    }

    pub fn insert(&mut self, lemma: &str) {
        let key = self.key(lemma);
        self.lemmas.insert(key.to_string());
    }

    pub fn contains(&self, lemma: &str) -> bool {
        self.lemmas.contains(self.key(lemma))
    }

    pub fn len(&self) -> usize {
        self.lemmas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lemmas.is_empty()
    }

    fn key<'a>(&self, lemma: &'a str) -> &'a str {
        if self.strip_numbers {
            strip_homograph_number(lemma)
        } else {
            lemma
        }
    }
}

impl<'a> Extend<&'a str> for AttestedLemmas {
    fn extend<I: IntoIterator<Item = &'a str>>(&mut self, iter: I) {
        for lemma in iter {
            self.insert(lemma);
        }
    }
}

fn load_file(path: &Path, mode: LoadMode) -> Result<Buffer> {
    match mode {
        LoadMode::Mmap => {
            let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
            // Zero-length files cannot be mapped on every platform.
            if file.metadata().map(|m| m.len() == 0).unwrap_or(false) {
                return Ok(Buffer::Owned(Vec::new()));
            }
            unsafe { Mmap::map(&file) }
                .map(Buffer::Mmap)
                .with_context(|| format!("mmap {}", path.display()))
        }
        LoadMode::Owned => {
            let mut file = File::open(path).with_context(|| format!("open {}", path.display()))?;
            let mut buf = Vec::new();
            file.read_to_end(&mut buf)
                .with_context(|| format!("read {}", path.display()))?;
            Ok(Buffer::Owned(buf))
        }
    }
}
