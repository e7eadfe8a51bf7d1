//! The compare stage: one streaming pass over every annotation source.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use ofl_compare::{Disambiguator, Evidence, attestation_filter, vote, vote_options};
use ofl_lexicon::AttestedLemmas;
use ofl_types::{
    Annotation, LookupCandidates, PosSet, Score, TokenLine, split_alternatives, strip_digits,
    strip_homograph_number,
};
use thiserror::Error;
use tracing::info;

use crate::align::{AlignedSource, Alignment};

/// Raised before any token is read when the sources cannot produce output.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum SourceDataError {
    #[error("no source for lemmas provided: give a lookup or an automatic pos-lemma file")]
    NoLemmaSource,
    #[error("no source for part-of-speech tags provided")]
    NoPosSource,
    #[error("gold annotation given both as a pos file and as a pos-lemma file")]
    ConflictingGold,
}

/// The annotation files feeding one compare run. All files are
/// tab-separated, one token per line.
#[derive(Clone, Debug, Default)]
pub struct SourceConfig {
    /// Gold `form pos`.
    pub gold_pos: Option<PathBuf>,
    /// Gold `form pos lemma`.
    pub gold_pos_lemma: Option<PathBuf>,
    /// Lexicon lookup lines `form pos lemma [pos lemma ...]`.
    pub lookup: Vec<PathBuf>,
    /// Tagger `form pos`.
    pub auto_pos: Vec<PathBuf>,
    /// Tagger `form pos lemma`.
    pub auto_pos_lemma: Vec<PathBuf>,
}

impl SourceConfig {
    pub fn validate(&self) -> Result<(), SourceDataError> {
        if self.lookup.is_empty() && self.auto_pos_lemma.is_empty() {
            return Err(SourceDataError::NoLemmaSource);
        }
        if self.gold().is_none() && self.auto_pos.is_empty() && self.auto_pos_lemma.is_empty() {
            return Err(SourceDataError::NoPosSource);
        }
        if self.gold_pos.is_some() && self.gold_pos_lemma.is_some() {
            return Err(SourceDataError::ConflictingGold);
        }
        Ok(())
    }

    fn gold(&self) -> Option<&Path> {
        self.gold_pos.as_deref().or(self.gold_pos_lemma.as_deref())
    }
}

/// Knobs of a compare run.
#[derive(Clone, Copy, Debug, Default)]
pub struct RunOptions {
    /// Drop homograph numbers from tagger, gold, and attested lemmas.
    pub ignore_numbers: bool,
    pub alignment: Alignment,
}

/// Final POS for a token from the voted tagger tags and an optional gold tag.
///
/// A gold tag wins unless the voted tag is one of its alternatives, in which
/// case the voted tag narrows it.
pub fn reconcile_pos(auto_tags: &[&str], gold: Option<&str>) -> String {
    let voted = vote(auto_tags, false);
    match gold {
        Some(gold) if !gold.is_empty() && !split_alternatives(gold).any(|g| g == voted) => {
            gold.to_string()
        }
        _ => voted,
    }
}

/// Vote over `(pos, lemma)` tagger outputs. The POS returned is that of the
/// first tagger whose lemma equals the voted lemma, or the voted POS when no
/// tagger proposed exactly that lemma.
pub fn combine_auto(outputs: &[(&str, &str)], ignore_numbers: bool) -> (String, String) {
    let lemmas: Vec<&str> = outputs.iter().map(|(_, lemma)| *lemma).collect();
    let lemma = vote(&lemmas, ignore_numbers);
    let pos = outputs
        .iter()
        .find(|(_, candidate)| {
            if ignore_numbers {
                strip_digits(candidate) == lemma
            } else {
                *candidate == lemma
            }
        })
        .map(|(pos, _)| pos.to_string())
        .unwrap_or_else(|| {
            let tags: Vec<&str> = outputs.iter().map(|(pos, _)| *pos).collect();
            vote(&tags, false)
        });
    (pos, lemma)
}

/// Counters reported at the end of a run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CompareStats {
    pub tokens: usize,
    pub gold: usize,
    pub ambiguous: usize,
    pub unknown: usize,
    pub unattested: usize,
}

impl CompareStats {
    fn record(&mut self, score: Score) {
        self.tokens += 1;
        match score {
            Score::Gold => self.gold += 1,
            Score::Ambiguous => self.ambiguous += 1,
            Score::Unknown => self.unknown += 1,
            Score::Unattested => self.unattested += 1,
            _ => {}
        }
    }
}

type Reader = BufReader<File>;

fn open(path: &Path) -> Result<Reader> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    Ok(BufReader::new(file))
}

fn aligned(path: &Path, alignment: Alignment) -> Result<AlignedSource<Reader>> {
    Ok(AlignedSource::new(
        path.display().to_string(),
        open(path)?,
        alignment,
    ))
}

/// Reconciles every source into `form TAB pos TAB lemma TAB score` lines.
pub struct Compare {
    config: SourceConfig,
    options: RunOptions,
    engine: Disambiguator,
    attested: Option<AttestedLemmas>,
}

impl Compare {
    /// Fails with [`SourceDataError`] when the configuration is unusable.
    pub fn new(config: SourceConfig, options: RunOptions) -> Result<Self, SourceDataError> {
        config.validate()?;
        Ok(Self {
            config,
            options,
            engine: Disambiguator::default(),
            attested: None,
        })
    }

    pub fn with_engine(mut self, engine: Disambiguator) -> Self {
        self.engine = engine;
        self
    }

    /// Check `config`, then read the attested lemmas of `lexicons`.
    pub fn with_lexicons<P: AsRef<Path>>(
        config: SourceConfig,
        options: RunOptions,
        lexicons: &[P],
    ) -> Result<Self> {
        let compare = Self::new(config, options)?;
        let attested = AttestedLemmas::load(lexicons, options.ignore_numbers)?;
        Ok(compare.with_attested(attested))
    }

    /// Demote lemmas absent from `attested`. An empty set disables the check.
    pub fn with_attested(mut self, attested: AttestedLemmas) -> Self {
        self.attested = (!attested.is_empty()).then_some(attested);
        self
    }

    /// Run over the configured files, writing to `out`.
    pub fn run<W: Write>(&self, out: W) -> Result<CompareStats> {
        let start = Instant::now();
        let alignment = self.options.alignment;
        let auto_paths: Vec<&PathBuf> = self
            .config
            .auto_pos
            .iter()
            .chain(&self.config.auto_pos_lemma)
            .collect();

        // Gold is the primary stream when present, else the first tagger.
        let (primary_path, rest, primary_is_auto) = match self.config.gold() {
            Some(gold) => (gold, &auto_paths[..], false),
            None => match auto_paths.split_first() {
                Some((first, rest)) => (first.as_path(), rest, true),
                None => return Err(SourceDataError::NoPosSource.into()),
            },
        };
        let mut auto = rest
            .iter()
            .map(|p| aligned(p, alignment))
            .collect::<Result<Vec<_>>>()?;
        let mut lookups = self
            .config
            .lookup
            .iter()
            .map(|p| aligned(p, alignment))
            .collect::<Result<Vec<_>>>()?;

        let mut out = io::BufWriter::new(out);
        let mut stats = CompareStats::default();
        let primary = open(primary_path)?;
        for line in primary.lines() {
            let line = line.with_context(|| format!("read {}", primary_path.display()))?;
            let row = TokenLine::parse(&line);

            let mut auto_lines: Vec<Option<String>> = Vec::with_capacity(auto.len() + 1);
            if primary_is_auto {
                auto_lines.push(Some(line.clone()));
            }
            for source in &mut auto {
                auto_lines.push(source.next_for(row.form)?);
            }
            let gold_line = (!primary_is_auto).then_some(line.as_str());
            let mut lookup = LookupCandidates::new();
            for source in &mut lookups {
                if let Some(l) = source.next_for(row.form)? {
                    lookup.extend(&LookupCandidates::from_line(&l));
                }
            }

            let ann = self.reconcile(row.form, gold_line, &auto_lines, &lookup);
            stats.record(ann.score);
            writeln!(out, "{ann}")?;
        }
        out.flush()?;

        info!(
            "compare: {} tokens ({} gold, {} ambiguous, {} unknown, {} unattested) in {} ms",
            stats.tokens,
            stats.gold,
            stats.ambiguous,
            stats.unknown,
            stats.unattested,
            start.elapsed().as_millis()
        );
        Ok(stats)
    }

    /// Settle one token from its aligned source lines.
    ///
    /// `auto_lines` lists the `auto_pos` lines first, then the
    /// `auto_pos_lemma` lines; `None` marks a tagger with nothing for this
    /// token.
    pub fn reconcile(
        &self,
        form: &str,
        gold_line: Option<&str>,
        auto_lines: &[Option<String>],
        lookup: &LookupCandidates,
    ) -> Annotation {
        let gold = gold_line.map(TokenLine::parse);
        let autos: Vec<TokenLine<'_>> = auto_lines
            .iter()
            .map(|l| l.as_deref().map(TokenLine::parse).unwrap_or_default())
            .collect();

        let gold_pos = gold.and_then(|g| g.pos);
        let pos = if autos.is_empty() {
            gold_pos.unwrap_or("").to_string()
        } else {
            let tags: Vec<&str> = autos.iter().map(|a| a.pos.unwrap_or("")).collect();
            reconcile_pos(&tags, gold_pos)
        };
        let pos = PosSet::parse(&pos);

        let lemma_taggers = &autos[self.config.auto_pos.len().min(autos.len())..];
        let auto: Vec<String> = if lemma_taggers.is_empty() {
            Vec::new()
        } else {
            let outputs: Vec<&str> = lemma_taggers.iter().map(|a| a.lemma.unwrap_or("")).collect();
            vote_options(&outputs, self.options.ignore_numbers)
        };

        let gold_lemmas: Vec<String> = match (&self.config.gold_pos_lemma, gold) {
            (Some(_), Some(g)) => g
                .lemma_options()
                .into_iter()
                .map(|l| {
                    if self.options.ignore_numbers {
                        strip_homograph_number(l).to_string()
                    } else {
                        l.to_string()
                    }
                })
                .collect(),
            _ => Vec::new(),
        };

        let resolution = self.engine.resolve(&Evidence {
            pos: &pos,
            gold: &gold_lemmas,
            auto: &auto,
            lookup,
        });
        let resolution = match &self.attested {
            Some(attested) => attestation_filter(resolution, |l| attested.contains(l)),
            None => resolution,
        };

        Annotation {
            form: form.to_string(),
            pos,
            lemma: resolution.lemma,
            score: resolution.score,
        }
    }
}

/// Merge tagger `form pos lemma` files into one `form pos lemma` stream
/// aligned on the first file, using [`combine_auto`] per token.
pub fn combine_files<W: Write>(paths: &[PathBuf], options: RunOptions, out: W) -> Result<usize> {
    let Some((first, rest)) = paths.split_first() else {
        return Err(SourceDataError::NoLemmaSource.into());
    };
    let mut others = rest
        .iter()
        .map(|p| aligned(p, options.alignment))
        .collect::<Result<Vec<_>>>()?;

    let mut out = io::BufWriter::new(out);
    let mut tokens = 0usize;
    for line in open(first)?.lines() {
        let line = line.with_context(|| format!("read {}", first.display()))?;
        let row = TokenLine::parse(&line);
        let mut lines = vec![Some(line.clone())];
        for source in &mut others {
            lines.push(source.next_for(row.form)?);
        }
        let rows: Vec<TokenLine<'_>> = lines
            .iter()
            .map(|l| l.as_deref().map(TokenLine::parse).unwrap_or_default())
            .collect();
        let outputs: Vec<(&str, &str)> = rows
            .iter()
            .map(|r| (r.pos.unwrap_or(""), r.lemma.unwrap_or("")))
            .collect();
        let (pos, lemma) = combine_auto(&outputs, options.ignore_numbers);
        writeln!(out, "{}\t{}\t{}", row.form, pos, lemma)?;
        tokens += 1;
    }
    out.flush()?;
    info!("combined {} taggers over {} tokens", paths.len(), tokens);
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_is_checked_before_lexicons_are_read() {
        let lexicons = ["/nonexistent/ofl/lexicon.tsv"];
        let err = match Compare::with_lexicons(SourceConfig::default(), RunOptions::default(), &lexicons) {
            Ok(_) => panic!("empty configuration accepted"),
            Err(e) => e,
        };
        assert_eq!(
            err.downcast_ref::<SourceDataError>(),
            Some(&SourceDataError::NoLemmaSource)
        );
    }

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn source_checks_run_before_anything_is_read() {
        let mut config = SourceConfig {
            gold_pos: Some("gold.tsv".into()),
            ..SourceConfig::default()
        };
        assert_eq!(config.validate(), Err(SourceDataError::NoLemmaSource));

        config.lookup = paths(&["lookup.tsv"]);
        assert_eq!(config.validate(), Ok(()));

        config.gold_pos_lemma = Some("gold-lemma.tsv".into());
        assert_eq!(config.validate(), Err(SourceDataError::ConflictingGold));

        let config = SourceConfig {
            lookup: paths(&["lookup.tsv"]),
            ..SourceConfig::default()
        };
        assert_eq!(config.validate(), Err(SourceDataError::NoPosSource));

        let config = SourceConfig {
            auto_pos_lemma: paths(&["tagger.tsv"]),
            ..SourceConfig::default()
        };
        assert_eq!(config.validate(), Ok(()));
        assert!(Compare::new(config, RunOptions::default()).is_ok());
    }

    #[test]
    fn gold_pos_yields_unless_taggers_pick_one_of_its_options() {
        assert_eq!(reconcile_pos(&["NOUN", "NOUN"], None), "NOUN");
        assert_eq!(reconcile_pos(&["NOUN", "VERB"], Some("ADJ")), "ADJ");
        assert_eq!(reconcile_pos(&["VERB", "NOUN"], Some("NOUN|VERB")), "VERB");
        assert_eq!(reconcile_pos(&["", ""], Some("NOUN|VERB")), "NOUN|VERB");
        assert_eq!(reconcile_pos(&["ADV"], Some("")), "ADV");
    }

    #[test]
    fn combined_pos_follows_the_winning_lemma() {
        let outputs = [("VERB", "estre1"), ("AUX", "estre2"), ("AUX", "estre1")];
        assert_eq!(
            combine_auto(&outputs, false),
            ("VERB".to_string(), "estre1".to_string())
        );
        let outputs = [("NOUN", "estre2"), ("AUX", "estre1")];
        assert_eq!(
            combine_auto(&outputs, true),
            ("NOUN".to_string(), "estre".to_string())
        );
        // A tie matches no single tagger, so the POS is voted too.
        let outputs = [("NOUN", "a|b"), ("VERB", "c")];
        assert_eq!(
            combine_auto(&outputs, false),
            ("NOUN".to_string(), "a|b".to_string())
        );
    }

    fn lines(items: &[&str]) -> Vec<Option<String>> {
        items
            .iter()
            .map(|l| (!l.is_empty()).then(|| l.to_string()))
            .collect()
    }

    #[test]
    fn reconcile_merges_taggers_lookup_and_gold() {
        let config = SourceConfig {
            auto_pos: paths(&["pos.tsv"]),
            auto_pos_lemma: paths(&["a.tsv", "b.tsv"]),
            lookup: paths(&["lookup.tsv"]),
            ..SourceConfig::default()
        };
        let compare = Compare::new(config, RunOptions::default()).unwrap();
        let lookup = LookupCandidates::from_line("rois\tNOUN\troi\tVERB\troire");

        let ann = compare.reconcile(
            "rois",
            None,
            &lines(&["rois\tNOUN", "rois\tNOUN\troi", "rois\tVERB\troire"]),
            &lookup,
        );
        assert_eq!(ann.to_string(), "rois\tNOUN\troi\t8");

        // Missing tagger lines count as no opinion.
        let ann = compare.reconcile("rois", None, &lines(&["", "", ""]), &lookup);
        assert_eq!(ann.to_string(), "rois\t\troi|roire\t-1");
    }

    #[test]
    fn gold_lemmas_win_and_lose_homograph_numbers() {
        let config = SourceConfig {
            gold_pos_lemma: Some("gold.tsv".into()),
            lookup: paths(&["lookup.tsv"]),
            ..SourceConfig::default()
        };
        let options = RunOptions {
            ignore_numbers: true,
            ..RunOptions::default()
        };
        let mut attested = AttestedLemmas::new(true);
        attested.insert("roi");
        let compare = Compare::new(config, options).unwrap().with_attested(attested);

        let ann = compare.reconcile("est", Some("est\tVERB\testre1"), &[], &LookupCandidates::new());
        assert_eq!(ann.to_string(), "est\tVERB\testre\t10");

        let lookup = LookupCandidates::from_line("rois\tNOUN\trei");
        let ann = compare.reconcile("rois", Some("rois\tNOUN"), &[], &lookup);
        assert_eq!(ann.to_string(), "rois\tNOUN\trei\t-10");
    }
}
