//! Table-driven lemma corrections applied to the final annotation stream.
//!
//! A rule is `(form pattern, pos, lemma pattern, replacement)`. Patterns are
//! regular expressions that must match the whole field; the form is matched
//! lowercased, the POS field compared exactly. Every matching rule rewrites
//! the lemma in table order, so a later rule sees the lemma an earlier one
//! produced. Rewritten lines are scored [`Score::ManualRule`]; the old score
//! is never parsed, so any numbering scheme passes through.
//!
//! One contextual rule follows the table: a pronoun `en` right after a
//! determiner `le` is the impersonal `on` (`l'en` is `l'on`).

use std::fs;
use std::path::Path;

use ofl_types::{Score, trim_newline};
use regex::Regex;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum CorrectorError {
    #[error("invalid pattern {pattern:?} in correction rule: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("failed to read correction table {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Built-in corrections for Old French taggers and lexicons.
const OLD_FRENCH_RULES: &[(&str, &str, &str, &str)] = &[
    // preposition + determiner contractions
    (".*", "ADP.DET", "au", "à.le"),
    (".*", "ADP.DET", "des", "de.le"),
    (".*", "ADP.DET", "du", "de.le"),
    (".*", "ADP.DET", "del", "de.le"),
    (".*", "ADP.DET", "ès", "en.le"),
    (".*", "ADP.DET", "ou", "en.le"),
    (".*", "ADP.DET", "dudit", "de.ledit"),
    (".*", "ADP.PRON", "èsquel", "en.lequel"),
    (".*", "ADP.PRON", "duquel", "de.lequel"),
    // demonstratives
    (".*", "DET", "celui", "cil"),
    (".*", "PRON", "celui", "cil"),
    (".*", "DET", "icel", "cil"),
    (".*", "PRON", "icel", "cil"),
    (".*", "DET", "icest", "cist"),
    (".*", "PRON", "ice", "ce"),
    (".*", "PRON", "icelui", "cil"),
    (".*", "DET", "icelui", "cil"),
    // je: moi / me
    (".*m.*i", "PRON", "je", "moi"),
    (".*m[^i]*", "PRON", "je", "me"),
    // il: eux / le
    ("[^i][ul].+", "PRON", "il", "eux"),
    ("l.*", "PRON", "il", "le"),
    (".*", "PRON", "tous", "tout"),
    (".*", "DET", "tous", "tout"),
    (".*", "PRON", "trèstous", "trèstout"),
    (".*", "DET", "trèstous", "trèstout"),
    // uns unless the form ends in s or z
    (".*[^sz]", "DET", r"(.*\|)?uns(\|.*)?", "un"),
    (".*", "DET", "itel", "tel"),
    (".*", "PRON", "cui", "qui"),
    (".*", "NOUN", "gens", "gent"),
    // halves of split contracted tags
    ("es", "DET", ".*", "le"),
    ("e", "ADP", ".*", "en"),
    ("[Dd][e']?", "DET", ".*", "de"),
    (".*", "ADV.PRON", "ne.il", "ne.le"),
    (".*", "ADV.PRON", "si.il", "si.le"),
    ("en", "ADV", "an", "en"),
    ("[Ll]i", "PRON", "il", "li"),
    // Anglo-Norman vu
    ("[Vv]us", "PRON", "vu", "vous"),
    ("[Ss]ire", "NOUN", "seigneur", "sire"),
    // mors NOUN defeats POS disambiguation
    ("[Mm]ort", "NOUN", "mourir", "mort"),
    (".*", "PROPN", r"(.*\|)?saint(\|.*)?", "saint"),
];

/// One compiled correction rule.
#[derive(Clone, Debug)]
pub struct CorrectionRule {
    form: Regex,
    pos: String,
    lemma: Regex,
    replacement: String,
}

impl CorrectionRule {
    pub fn new(
        form: &str,
        pos: &str,
        lemma: &str,
        replacement: &str,
    ) -> Result<Self, CorrectorError> {
        Ok(Self {
            form: full_match(form)?,
            pos: pos.to_string(),
            lemma: full_match(lemma)?,
            replacement: replacement.to_string(),
        })
    }

    /// `form` must already be lowercased.
    pub fn matches(&self, form: &str, pos: &str, lemma: &str) -> bool {
        self.pos == pos && self.lemma.is_match(lemma) && self.form.is_match(form)
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }
}

fn full_match(pattern: &str) -> Result<Regex, CorrectorError> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|source| CorrectorError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// Ordered correction table plus the `l'en` lookback.
#[derive(Clone, Debug, Default)]
pub struct Corrector {
    rules: Vec<CorrectionRule>,
}

impl Corrector {
    pub fn new(rules: Vec<CorrectionRule>) -> Self {
        Self { rules }
    }

    pub fn old_french() -> Result<Self, CorrectorError> {
        let rules = OLD_FRENCH_RULES
            .iter()
            .map(|(form, pos, lemma, replacement)| CorrectionRule::new(form, pos, lemma, replacement))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(rules))
    }

    /// Read `form_pattern TAB pos TAB lemma_pattern TAB replacement` rows.
    ///
    /// Blank lines, lines starting with `#`, and rows with another field
    /// count are skipped; an invalid pattern is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CorrectorError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| CorrectorError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, CorrectorError> {
        let mut rules = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = trim_newline(line);
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            let [form, pos, lemma, replacement] = fields.as_slice() else {
                debug!("correction table line {} skipped: wrong field count", lineno + 1);
                continue;
            };
            rules.push(CorrectionRule::new(form, pos, lemma, replacement)?);
        }
        Ok(Self::new(rules))
    }

    pub fn rules(&self) -> &[CorrectionRule] {
        &self.rules
    }

    /// Apply the table and the lookback to one record's raw fields.
    ///
    /// `previous` is the `(pos, lemma)` of the preceding record as already
    /// corrected. Returns the rewritten lemma, or `None` when nothing matched.
    pub fn correct_lemma(
        &self,
        form: &str,
        pos: &str,
        lemma: &str,
        previous: Option<(&str, &str)>,
    ) -> Option<String> {
        let form = form.to_lowercase();
        let mut rewritten: Option<String> = None;
        for rule in &self.rules {
            let current = rewritten.as_deref().unwrap_or(lemma);
            if rule.matches(&form, pos, current) {
                rewritten = Some(rule.replacement.clone());
            }
        }
        let current = rewritten.as_deref().unwrap_or(lemma);
        if let Some((prev_pos, prev_lemma)) = previous
            && prev_pos.ends_with("DET")
            && prev_lemma == "le"
            && pos == "PRON"
            && current == "en"
        {
            rewritten = Some("on".to_string());
        }
        rewritten
    }

    /// Start a line-by-line pass that carries the lookback state.
    pub fn pass(&self) -> CorrectionPass<'_> {
        CorrectionPass {
            corrector: self,
            previous: None,
            corrected: 0,
        }
    }

    pub fn correct_text(&self, text: &str) -> String {
        let mut pass = self.pass();
        let mut out = String::with_capacity(text.len());
        for line in text.lines() {
            out.push_str(&pass.apply_line(line));
            out.push('\n');
        }
        out
    }
}

/// Stateful walk over an annotation stream.
pub struct CorrectionPass<'a> {
    corrector: &'a Corrector,
    /// `(pos, lemma)` of the last four-column line.
    previous: Option<(String, String)>,
    corrected: usize,
}

impl CorrectionPass<'_> {
    /// Rewrite one `form pos lemma score` line.
    ///
    /// Only form, POS, and lemma are matched; a rewritten line gets score
    /// [`Score::ManualRule`] whatever it had before. Lines left alone come
    /// back byte for byte, and lines without four columns also leave the
    /// lookback state as it was.
    pub fn apply_line(&mut self, line: &str) -> String {
        let line = trim_newline(line);
        let fields: Vec<&str> = line.split('\t').collect();
        let [form, pos, lemma, _score] = fields.as_slice() else {
            return line.to_string();
        };
        let previous = self
            .previous
            .as_ref()
            .map(|(p, l)| (p.as_str(), l.as_str()));
        match self.corrector.correct_lemma(form, pos, lemma, previous) {
            Some(fixed) => {
                self.corrected += 1;
                let out = format!("{form}\t{pos}\t{fixed}\t{}", Score::ManualRule);
                self.previous = Some((pos.to_string(), fixed));
                out
            }
            None => {
                self.previous = Some((pos.to_string(), lemma.to_string()));
                line.to_string()
            }
        }
    }

    pub fn corrected(&self) -> usize {
        self.corrected
    }
}
