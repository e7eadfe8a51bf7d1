//! End-to-end run from a token file and existing tagger outputs.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use ofl_compare::Corrector;
use ofl_lexicon::{AttestedLemmas, LoadMode};
use ofl_tagset::{Columns, StandardizeError, Standardizer};
use tempfile::TempDir;
use tracing::{info, warn};

use crate::compare::{Compare, RunOptions, SourceConfig};
use crate::lookup::{load_lexicons, lookup_stream};

/// Standardize `input` into `output`, or hand back `input` unchanged when no
/// map fits or no standardizer is configured.
pub fn standardize_or_passthrough(
    standardizer: Option<&Standardizer>,
    input: &Path,
    output: &Path,
    columns: Columns,
) -> Result<PathBuf> {
    let Some(std) = standardizer else {
        return Ok(input.to_path_buf());
    };
    match std.standardize_file(input, output, columns) {
        Ok(()) => Ok(output.to_path_buf()),
        Err(StandardizeError::MapNotFound { distinct }) => {
            warn!(
                "no tagset map fits the {distinct} tags of {}; using it as is",
                input.display()
            );
            Ok(input.to_path_buf())
        }
        Err(StandardizeError::Io(e)) => {
            Err(e).with_context(|| format!("standardize {}", input.display()))
        }
    }
}

/// Widest line of a tab-separated file, in columns.
fn column_count(path: &Path) -> Result<usize> {
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    Ok(text
        .lines()
        .map(|l| l.split('\t').count())
        .max()
        .unwrap_or(0))
}

/// Inputs of `ofl lemmatize`.
#[derive(Clone, Debug, Default)]
pub struct Workflow {
    /// One token per line, optionally followed by gold `pos` or `pos lemma`.
    pub tokens: PathBuf,
    /// Tagger outputs, `form pos` or `form pos lemma`, aligned on the tokens.
    pub taggers: Vec<PathBuf>,
    /// Lexicons used for lookup and attestation.
    pub lexicons: Vec<PathBuf>,
    pub maps_dir: Option<PathBuf>,
    pub load_mode: Option<LoadMode>,
    pub options: RunOptions,
}

impl Workflow {
    /// Run every stage and write the reconciled stream to `out`, applying
    /// `corrector` last when given.
    pub fn run<W: Write>(&self, corrector: Option<&Corrector>, out: W) -> Result<()> {
        let start = Instant::now();
        let scratch = TempDir::new().context("create scratch directory")?;
        let tmp = scratch.path();

        let standardizer = self
            .maps_dir
            .as_deref()
            .map(Standardizer::load_dir)
            .transpose()?;
        let mut config = SourceConfig::default();

        match column_count(&self.tokens)? {
            0 | 1 => {}
            n => {
                let gold = standardize_or_passthrough(
                    standardizer.as_ref(),
                    &self.tokens,
                    &tmp.join("gold.tsv"),
                    Columns::Token,
                )?;
                if n == 2 {
                    config.gold_pos = Some(gold);
                } else {
                    config.gold_pos_lemma = Some(gold);
                }
            }
        }

        for (i, tagger) in self.taggers.iter().enumerate() {
            let out = tmp.join(format!("tagger-{i}.tsv"));
            let standardized =
                standardize_or_passthrough(standardizer.as_ref(), tagger, &out, Columns::Token)?;
            if column_count(tagger)? >= 3 {
                config.auto_pos_lemma.push(standardized);
            } else {
                config.auto_pos.push(standardized);
            }
        }

        let mut attested = AttestedLemmas::new(self.options.ignore_numbers);
        if !self.lexicons.is_empty() {
            let lexicon = load_lexicons(
                &self.lexicons,
                self.load_mode.unwrap_or(LoadMode::Mmap),
                self.options.ignore_numbers,
            )?;
            let raw = tmp.join("lookup.tsv");
            let input = File::open(&self.tokens)
                .with_context(|| format!("open {}", self.tokens.display()))?;
            let output =
                File::create(&raw).with_context(|| format!("create {}", raw.display()))?;
            lookup_stream(BufReader::new(input), &lexicon, BufWriter::new(output))?;
            let lookup = standardize_or_passthrough(
                standardizer.as_ref(),
                &raw,
                &tmp.join("lookup-std.tsv"),
                Columns::Lookup,
            )?;
            config.lookup.push(lookup);
            attested = AttestedLemmas::load(&self.lexicons, self.options.ignore_numbers)?;
        }

        let compare = Compare::new(config, self.options)?.with_attested(attested);
        match corrector {
            None => {
                compare.run(out)?;
            }
            Some(corrector) => {
                let compared = tmp.join("compare.tsv");
                let file = File::create(&compared)
                    .with_context(|| format!("create {}", compared.display()))?;
                compare.run(file)?;
                let text = fs::read_to_string(&compared)
                    .with_context(|| format!("read {}", compared.display()))?;
                let mut out = BufWriter::new(out);
                let mut pass = corrector.pass();
                for line in text.lines() {
                    writeln!(out, "{}", pass.apply_line(line))?;
                }
                out.flush()?;
                info!("post-processing corrected {} lemmas", pass.corrected());
            }
        }
        info!("lemmatize finished in {} ms", start.elapsed().as_millis());
        Ok(())
    }
}
