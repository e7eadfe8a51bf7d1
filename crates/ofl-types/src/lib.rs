//! Shared types for the tab-separated token streams exchanged between
//! lemmatization stages.
//!
//! Every stage reads and writes one token per line:
//! `form [TAB] pos[|pos...] [TAB] lemma[|lemma...] [TAB] score`, with trailing
//! fields optional depending on the stage. A `|` inside a field is an
//! alternation: the source could not decide between the listed options.
//!
//! Use [`TokenLine`] to read such a line without copying, [`Annotation`] for
//! the final four-column record, [`PosSet`] for tag alternations,
//! [`LookupCandidates`] for index-aligned (pos, lemma) pairs coming from a
//! lexicon, and [`Score`] for the confidence ladder.
//!
//! ```rust
//! use ofl_types::{Annotation, PosSet, Score, TokenLine};
//!
//! let line = TokenLine::parse("au\tADP.DET\tau\t6");
//! assert_eq!(line.form, "au");
//! assert_eq!(line.pos_set(), PosSet::parse("ADP.DET"));
//!
//! let ann = Annotation::parse("au\tADP.DET\tà.le\t11").unwrap();
//! assert_eq!(ann.score, Score::ManualRule);
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Separator between alternative options inside one field.
pub const ALTERNATION: char = '|';

/// Lemma emitted when no source offers anything.
pub const UNKNOWN_LEMMA: &str = "UNKNOWN";

/// Iterate the non-empty options of a `|`-delimited field.
pub fn split_alternatives(field: &str) -> impl Iterator<Item = &str> {
    field.split(ALTERNATION).filter(|opt| !opt.is_empty())
}

/// Join options back into a `|`-delimited field.
pub fn join_alternatives<I, S>(options: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for (i, opt) in options.into_iter().enumerate() {
        if i > 0 {
            out.push(ALTERNATION);
        }
        out.push_str(opt.as_ref());
    }
    out
}

/// Remove every digit, wherever it occurs.
pub fn strip_digits(text: &str) -> String {
    text.chars().filter(|c| !c.is_numeric()).collect()
}

/// Remove the trailing homograph number from a lemma (`bank2` -> `bank`).
///
/// A lemma made only of digits is returned unchanged.
pub fn strip_homograph_number(lemma: &str) -> &str {
    let stripped = lemma.trim_end_matches(char::is_numeric);
    if stripped.is_empty() { lemma } else { stripped }
}

/// Confidence attached to a reconciled lemma.
///
/// The value is not a probability: each variant names one disjoint outcome of
/// the reconciliation, and a higher value always means more independent
/// corroboration.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum Score {
    /// Overwritten by a hand-verified correction rule.
    ManualRule,
    /// Gold annotation.
    Gold,
    /// Single lookup lemma, confirmed by the taggers, POS agrees.
    LookupAutoPos,
    /// Several lookup lemmas, exactly one agrees with the POS (exact tagset).
    UniquePos,
    /// Several lookup lemmas, exactly one agrees with a simplified POS.
    UniqueSimplifiedPos,
    /// Single lookup lemma, POS agrees but the taggers proposed something else.
    LookupPos,
    /// Unique POS match among lookup lemmas, contradicted by the taggers.
    PosAgainstAuto,
    /// Single lookup lemma confirmed by the taggers despite a POS mismatch.
    LookupAutoNoPos,
    /// The taggers picked one lemma among several lookup candidates.
    AutoAmongLookup,
    /// Single lookup lemma, taggers disagree and POS mismatches.
    LookupOnly,
    /// One tagger lemma that no dictionary could corroborate.
    AutoOnly,
    /// Several options remain; needs review.
    Ambiguous,
    /// No source offered a lemma.
    Unknown,
    /// Lemma is missing from the reference lexicon.
    Unattested,
}

impl Score {
    pub const ALL: [Score; 14] = [
        Score::ManualRule,
        Score::Gold,
        Score::LookupAutoPos,
        Score::UniquePos,
        Score::UniqueSimplifiedPos,
        Score::LookupPos,
        Score::PosAgainstAuto,
        Score::LookupAutoNoPos,
        Score::AutoAmongLookup,
        Score::LookupOnly,
        Score::AutoOnly,
        Score::Ambiguous,
        Score::Unknown,
        Score::Unattested,
    ];

    /// Numeric value written to the score column.
    pub const fn value(self) -> i32 {
        match self {
            Score::ManualRule => 11,
            Score::Gold => 10,
            Score::LookupAutoPos => 9,
            Score::UniquePos => 8,
            Score::UniqueSimplifiedPos => 7,
            Score::LookupPos => 6,
            Score::PosAgainstAuto => 5,
            Score::LookupAutoNoPos => 4,
            Score::AutoAmongLookup => 3,
            Score::LookupOnly => 2,
            Score::AutoOnly => 0,
            Score::Ambiguous => -1,
            Score::Unknown => -2,
            Score::Unattested => -10,
        }
    }

    pub fn from_value(value: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.value() == value)
    }

    /// `AutoOnly` for a single option, `Ambiguous` otherwise.
    pub fn by_cardinality(options: usize) -> Self {
        if options == 1 {
            Score::AutoOnly
        } else {
            Score::Ambiguous
        }
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value().cmp(&other.value())
    }
}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<Score> for i32 {
    fn from(score: Score) -> Self {
        score.value()
    }
}

impl TryFrom<i32> for Score {
    type Error = ParseScoreError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Score::from_value(value).ok_or(ParseScoreError)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Returned when a score column holds something off the scale.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ParseScoreError;

impl fmt::Display for ParseScoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("not a known lemma score")
    }
}

impl std::error::Error for ParseScoreError {}

impl FromStr for Score {
    type Err = ParseScoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: i32 = s.trim().parse().map_err(|_| ParseScoreError)?;
        Score::try_from(value)
    }
}

/// Ordered, duplicate-free set of POS tags for one token.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct PosSet {
    tags: Vec<String>,
}

impl PosSet {
    /// Parse a `|`-delimited tag field. Empty options are dropped.
    pub fn parse(field: &str) -> Self {
        split_alternatives(field).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    pub fn insert(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if !tag.is_empty() && !self.contains(&tag) {
            self.tags.push(tag);
        }
    }

    /// True when the two sets share at least one tag.
    pub fn intersects(&self, other: &PosSet) -> bool {
        self.iter().any(|t| other.contains(t))
    }

    /// Rewrite each tag through `f`, collapsing duplicates.
    pub fn map<F>(&self, f: F) -> PosSet
    where
        F: Fn(&str) -> String,
    {
        self.iter().map(f).collect()
    }
}

impl<S: Into<String>> FromIterator<S> for PosSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = PosSet::default();
        for tag in iter {
            set.insert(tag);
        }
        set
    }
}

impl fmt::Display for PosSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&join_alternatives(&self.tags))
    }
}

/// Lexicon candidates for one token as index-aligned `(pos, lemma)` pairs.
///
/// Pairs are deduplicated on insertion, so two lexicons offering the same
/// analysis only contribute it once.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LookupCandidates {
    poss: Vec<String>,
    lemmas: Vec<String>,
}

impl LookupCandidates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from pairs, keeping the first occurrence of each pair.
    pub fn from_pairs<I, P, L>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (P, L)>,
        P: Into<String>,
        L: Into<String>,
    {
        let mut out = Self::new();
        for (pos, lemma) in pairs {
            out.push(pos, lemma);
        }
        out
    }

    /// Read the `pos TAB lemma` pairs that follow the form on a lookup line.
    ///
    /// A dangling pos without its lemma is ignored.
    pub fn from_line(line: &str) -> Self {
        let fields: Vec<&str> = trim_newline(line).split('\t').skip(1).collect();
        Self::from_pairs(
            fields
                .chunks_exact(2)
                .map(|pair| (pair[0], pair[1]))
                .filter(|(_, lemma)| !lemma.is_empty()),
        )
    }

    pub fn push(&mut self, pos: impl Into<String>, lemma: impl Into<String>) {
        let (pos, lemma) = (pos.into(), lemma.into());
        if self.iter().any(|(p, l)| p == pos && l == lemma) {
            return;
        }
        self.poss.push(pos);
        self.lemmas.push(lemma);
    }

    /// Append every pair of `other`, skipping duplicates.
    pub fn extend(&mut self, other: &LookupCandidates) {
        for (pos, lemma) in other.iter() {
            self.push(pos, lemma);
        }
    }

    pub fn len(&self) -> usize {
        self.lemmas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lemmas.is_empty()
    }

    pub fn lemmas(&self) -> &[String] {
        &self.lemmas
    }

    pub fn poss(&self) -> &[String] {
        &self.poss
    }

    /// `(pos, lemma)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.poss
            .iter()
            .map(String::as_str)
            .zip(self.lemmas.iter().map(String::as_str))
    }

    /// Render as the tail of a lookup line: `pos TAB lemma [TAB ...]`.
    pub fn to_fields(&self) -> String {
        let mut out = String::new();
        for (i, (pos, lemma)) in self.iter().enumerate() {
            if i > 0 {
                out.push('\t');
            }
            out.push_str(pos);
            out.push('\t');
            out.push_str(lemma);
        }
        out
    }
}

/// Borrowed view of a token line with up to four meaningful columns.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TokenLine<'a> {
    pub form: &'a str,
    pub pos: Option<&'a str>,
    pub lemma: Option<&'a str>,
    pub score: Option<&'a str>,
}

impl<'a> TokenLine<'a> {
    pub fn parse(line: &'a str) -> Self {
        let mut fields = trim_newline(line).split('\t');
        Self {
            form: fields.next().unwrap_or(""),
            pos: fields.next(),
            lemma: fields.next(),
            score: fields.next(),
        }
    }

    pub fn pos_set(&self) -> PosSet {
        self.pos.map(PosSet::parse).unwrap_or_default()
    }

    /// Non-empty lemma options, in column order.
    pub fn lemma_options(&self) -> Vec<&'a str> {
        self.lemma.map(|l| split_alternatives(l).collect()).unwrap_or_default()
    }
}

/// Final reconciled record: `form TAB pos TAB lemma TAB score`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Annotation {
    pub form: String,
    pub pos: PosSet,
    pub lemma: String,
    pub score: Score,
}

impl Annotation {
    /// Parse a line with exactly four columns and a known score.
    pub fn parse(line: &str) -> Option<Self> {
        let fields: Vec<&str> = trim_newline(line).split('\t').collect();
        let [form, pos, lemma, score] = fields.as_slice() else {
            return None;
        };
        Some(Self {
            form: (*form).to_string(),
            pos: PosSet::parse(pos),
            lemma: (*lemma).to_string(),
            score: score.parse().ok()?,
        })
    }

    /// True when the lemma still lists several options.
    pub fn is_ambiguous(&self) -> bool {
        self.lemma.contains(ALTERNATION)
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.form, self.pos, self.lemma, self.score
        )
    }
}

/// Strip a trailing `\n` or `\r\n`.
pub fn trim_newline(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_values_round_trip_through_text() {
        for score in Score::ALL {
            assert_eq!(score.to_string().parse::<Score>(), Ok(score));
        }
        assert!("1".parse::<Score>().is_err());
        assert!("high".parse::<Score>().is_err());
    }

    #[test]
    fn scores_serialize_as_numbers() {
        assert_eq!(serde_json::to_string(&Score::Unattested).unwrap(), "-10");
        assert_eq!(serde_json::from_str::<Score>("11").unwrap(), Score::ManualRule);
        assert!(serde_json::from_str::<Score>("1").is_err());
    }

    #[test]
    fn scores_order_by_value() {
        assert!(Score::ManualRule > Score::Gold);
        assert!(Score::Unknown > Score::Unattested);
        let mut scores = vec![Score::Ambiguous, Score::Gold, Score::Unattested];
        scores.sort();
        assert_eq!(
            scores,
            vec![Score::Unattested, Score::Ambiguous, Score::Gold]
        );
    }

    #[test]
    fn homograph_numbers() {
        assert_eq!(strip_homograph_number("bank2"), "bank");
        assert_eq!(strip_homograph_number("bank12"), "bank");
        assert_eq!(strip_homograph_number("bank"), "bank");
        assert_eq!(strip_homograph_number("12"), "12");
        assert_eq!(strip_digits("a1b2|c3"), "ab|c");
    }

    #[test]
    fn pos_set_dedups_and_intersects() {
        let set = PosSet::parse("NOUN|VERB|NOUN||");
        assert_eq!(set.len(), 2);
        assert_eq!(set.to_string(), "NOUN|VERB");
        assert!(set.intersects(&PosSet::parse("ADJ|VERB")));
        assert!(!set.intersects(&PosSet::parse("ADJ")));
        assert!(!set.intersects(&PosSet::default()));
    }

    #[test]
    fn lookup_candidates_stay_aligned() {
        let cands = LookupCandidates::from_line("est\tVERB\testre\tAUX\testre\tVERB\testre\tNOUN\n");
        assert_eq!(cands.len(), 2);
        assert_eq!(cands.poss(), ["VERB", "AUX"]);
        assert_eq!(cands.lemmas(), ["estre", "estre"]);
        assert_eq!(cands.to_fields(), "VERB\testre\tAUX\testre");

        assert!(LookupCandidates::from_line("xyz").is_empty());
    }

    #[test]
    fn token_lines_with_missing_columns() {
        let line = TokenLine::parse("li\tDET\r\n");
        assert_eq!(line.form, "li");
        assert_eq!(line.pos, Some("DET"));
        assert_eq!(line.lemma, None);
        assert!(line.lemma_options().is_empty());

        let line = TokenLine::parse("sire\tNOUN\tsire|seigneur");
        assert_eq!(line.lemma_options(), vec!["sire", "seigneur"]);
    }

    #[test]
    fn annotation_requires_four_columns() {
        assert!(Annotation::parse("au\tADP.DET\tau").is_none());
        assert!(Annotation::parse("au\tADP.DET\tau\tx").is_none());
        let ann = Annotation::parse("au\tADP.DET\tau\t6\n").unwrap();
        assert_eq!(ann.to_string(), "au\tADP.DET\tau\t6");
        assert!(!ann.is_ambiguous());
    }
}
