use std::io::{BufRead, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use ofl_lexicon::{Lexicon, LoadMode};
use ofl_types::TokenLine;
use tracing::info;

/// Load and merge lexicons in order; forms are keyed with the first one's
/// normalizer.
pub fn load_lexicons<P: AsRef<Path>>(
    paths: &[P],
    mode: LoadMode,
    strip_numbers: bool,
) -> Result<Lexicon> {
    let mut merged: Option<Lexicon> = None;
    for path in paths {
        let path = path.as_ref();
        let lexicon = Lexicon::load_with_mode(path, mode, strip_numbers)
            .with_context(|| format!("loading lexicon from {}", path.display()))?;
        match &mut merged {
            Some(m) => m.merge(lexicon),
            None => merged = Some(lexicon),
        }
    }
    match merged {
        Some(lexicon) => Ok(lexicon),
        None => bail!("no lexicon given"),
    }
}

/// Counters for one lookup run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct LookupStats {
    pub tokens: usize,
    pub hits: usize,
}

/// Write one lookup line per input line.
///
/// Only the first column of the input is looked up, so token files that
/// already carry gold columns can be passed as they are.
pub fn lookup_stream<R: BufRead, W: Write>(
    input: R,
    lexicon: &Lexicon,
    mut out: W,
) -> Result<LookupStats> {
    let mut stats = LookupStats::default();
    for line in input.lines() {
        let line = line.context("read token stream")?;
        let hit = lexicon.lookup(TokenLine::parse(&line).form);
        stats.tokens += 1;
        if hit.is_hit() {
            stats.hits += 1;
        }
        writeln!(out, "{hit}")?;
    }
    out.flush()?;
    info!("lookup: {} of {} tokens found", stats.hits, stats.tokens);
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_output_line_per_token() {
        let lex = Lexicon::parse("roi\tNOUN\troi|rois\nestre\tVERB\test\nestre\tNOUN\test\n", false);
        let input = "Li\tDET\nrois\nest\n\n";
        let mut out = Vec::new();
        let stats = lookup_stream(input.as_bytes(), &lex, &mut out).unwrap();
        assert_eq!(stats, LookupStats { tokens: 4, hits: 2 });
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "li\nrois\tNOUN\troi\nest\tVERB\testre\tNOUN\testre\n\n"
        );
    }
}
