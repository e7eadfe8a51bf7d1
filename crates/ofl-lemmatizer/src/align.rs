//! Keep auxiliary annotation streams in step with the primary token stream.
//!
//! Taggers sometimes drop or add lines. Rather than trusting line positions,
//! every auxiliary line is checked against the primary form: the first column
//! of both is reduced to a form key (lowercased, diacritics folded,
//! punctuation removed) and compared.

use std::collections::VecDeque;
use std::io::{self, BufRead, Lines};

use ofl_lexicon::{Normalizer, NormalizerOptions};
use thiserror::Error;
use tracing::{debug, warn};

/// Lines searched ahead for the primary form before giving up.
pub const DEFAULT_WINDOW: usize = 16;

/// What to do when an auxiliary line does not carry the primary form.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Alignment {
    /// Look up to `window` lines ahead for the form and skip what precedes
    /// it. If the form is not found the token gets no candidate from this
    /// stream and nothing is consumed.
    Resync { window: usize },
    /// Fail on the first divergence.
    Strict,
}

impl Default for Alignment {
    fn default() -> Self {
        Alignment::Resync {
            window: DEFAULT_WINDOW,
        }
    }
}

#[derive(Debug, Error)]
pub enum AlignmentError {
    #[error("{source_name} line {line}: expected form {expected:?}, found {found:?}")]
    Diverged {
        source_name: String,
        line: usize,
        expected: String,
        found: String,
    },
    #[error("failed to read {source_name}: {source}")]
    Io {
        source_name: String,
        #[source]
        source: io::Error,
    },
}

/// Reduces forms to the key used for alignment checks.
#[derive(Clone, Debug)]
pub struct FormKey {
    normalizer: Normalizer,
}

impl Default for FormKey {
    fn default() -> Self {
        Self {
            normalizer: Normalizer::new(NormalizerOptions {
                uppercase: false,
                is_ascii: true,
                pnc_in_tok: false,
                pnc_in_tok_except: Vec::new(),
            }),
        }
    }
}

impl FormKey {
    pub fn key(&self, form: &str) -> String {
        self.normalizer.normalize(form)
    }

    /// Key of a line's first column.
    pub fn line_key(&self, line: &str) -> String {
        self.key(line.split('\t').next().unwrap_or(""))
    }
}

/// One auxiliary stream read in step with the primary stream.
pub struct AlignedSource<R> {
    name: String,
    lines: Lines<R>,
    buffer: VecDeque<String>,
    exhausted: bool,
    consumed: usize,
    skipped: usize,
    alignment: Alignment,
    key: FormKey,
}

impl<R: BufRead> AlignedSource<R> {
    pub fn new(name: impl Into<String>, reader: R, alignment: Alignment) -> Self {
        Self {
            name: name.into(),
            lines: reader.lines(),
            buffer: VecDeque::new(),
            exhausted: false,
            consumed: 0,
            skipped: 0,
            alignment,
            key: FormKey::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lines dropped while resynchronizing.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn fill(&mut self, want: usize) -> Result<(), AlignmentError> {
        while !self.exhausted && self.buffer.len() < want {
            match self.lines.next() {
                Some(Ok(line)) => self.buffer.push_back(line),
                Some(Err(source)) => {
                    return Err(AlignmentError::Io {
                        source_name: self.name.clone(),
                        source,
                    });
                }
                None => self.exhausted = true,
            }
        }
        Ok(())
    }

    fn take(&mut self, skip: usize) -> Option<String> {
        if skip > 0 {
            warn!(
                "{}: skipped {} lines after line {} to stay aligned",
                self.name, skip, self.consumed
            );
            self.buffer.drain(..skip);
            self.skipped += skip;
            self.consumed += skip;
        }
        self.consumed += 1;
        self.buffer.pop_front()
    }

    /// The line for the primary token `form`, or `None` when this stream has
    /// nothing for it.
    pub fn next_for(&mut self, form: &str) -> Result<Option<String>, AlignmentError> {
        self.fill(1)?;
        let Some(front) = self.buffer.front() else {
            debug!("{}: exhausted before {form:?}", self.name);
            return Ok(None);
        };
        let expected = self.key.key(form);
        if self.key.line_key(front) == expected {
            return Ok(self.take(0));
        }

        match self.alignment {
            Alignment::Strict => Err(AlignmentError::Diverged {
                source_name: self.name.clone(),
                line: self.consumed + 1,
                expected: form.to_string(),
                found: front.split('\t').next().unwrap_or("").to_string(),
            }),
            Alignment::Resync { window } => {
                self.fill(window.max(1))?;
                let found = self
                    .buffer
                    .iter()
                    .take(window.max(1))
                    .position(|line| self.key.line_key(line) == expected);
                match found {
                    Some(skip) => Ok(self.take(skip)),
                    None => {
                        warn!(
                            "{}: no line for {form:?} within {window} lines of line {}",
                            self.name,
                            self.consumed + 1
                        );
                        Ok(None)
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn source(text: &str, alignment: Alignment) -> AlignedSource<Cursor<Vec<u8>>> {
        AlignedSource::new("aux", Cursor::new(text.as_bytes().to_vec()), alignment)
    }

    #[test]
    fn form_keys_ignore_case_accents_and_punctuation() {
        let key = FormKey::default();
        assert_eq!(key.key("Çà,"), key.key("ca"));
        assert_eq!(key.line_key("Li\tDET\tle"), "li");
        assert_eq!(key.key("..."), "...");
    }

    #[test]
    fn aligned_streams_read_in_step() {
        let mut aux = source("Li\tDET\nrois\tNOUN\n", Alignment::Strict);
        assert_eq!(aux.next_for("Li").unwrap().as_deref(), Some("Li\tDET"));
        assert_eq!(aux.next_for("rois").unwrap().as_deref(), Some("rois\tNOUN"));
        assert_eq!(aux.next_for("vint").unwrap(), None);
    }

    #[test]
    fn resync_skips_extra_lines() {
        let mut aux = source("Li\tDET\n<junk>\t\nrois\tNOUN\n", Alignment::default());
        assert!(aux.next_for("Li").unwrap().is_some());
        assert_eq!(aux.next_for("rois").unwrap().as_deref(), Some("rois\tNOUN"));
        assert_eq!(aux.skipped(), 1);
    }

    #[test]
    fn resync_leaves_stream_alone_when_token_is_missing() {
        let mut aux = source("Li\tDET\nvint\tVERB\n", Alignment::default());
        assert!(aux.next_for("Li").unwrap().is_some());
        assert_eq!(aux.next_for("rois").unwrap(), None);
        assert_eq!(aux.next_for("vint").unwrap().as_deref(), Some("vint\tVERB"));
    }

    #[test]
    fn resync_window_bounds_the_search() {
        let mut aux = source("a\nb\nc\nrois\tNOUN\n", Alignment::Resync { window: 2 });
        assert_eq!(aux.next_for("rois").unwrap(), None);
        assert_eq!(aux.next_for("a").unwrap().as_deref(), Some("a"));
    }

    #[test]
    fn strict_alignment_reports_divergence() {
        let mut aux = source("Li\tDET\nvint\tVERB\n", Alignment::Strict);
        aux.next_for("Li").unwrap();
        let err = aux.next_for("rois").unwrap_err();
        match err {
            AlignmentError::Diverged {
                line,
                expected,
                found,
                ..
            } => {
                assert_eq!(line, 2);
                assert_eq!(expected, "rois");
                assert_eq!(found, "vint");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
