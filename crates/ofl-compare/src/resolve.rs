//! Lemma disambiguation as an ordered list of resolver strategies.
//!
//! Each [`Resolver`] looks at the evidence collected for one token and either
//! settles it or passes. A [`Disambiguator`] tries its resolvers in order and
//! keeps the first answer, falling back to `UNKNOWN` when every resolver
//! passes. The POS-matching passes are parameterized by [`Simplification`]
//! tables, so coarser tagset levels are added as data rather than code.

use std::collections::HashMap;

use ofl_types::{LookupCandidates, PosSet, Score, UNKNOWN_LEMMA, join_alternatives};

/// Everything known about one token when its lemma is chosen.
#[derive(Clone, Copy, Debug)]
pub struct Evidence<'a> {
    /// POS tag(s) assigned to the token.
    pub pos: &'a PosSet,
    /// Gold lemma options; authoritative when present.
    pub gold: &'a [String],
    /// Voted automatic lemma options.
    pub auto: &'a [String],
    /// Lexicon `(pos, lemma)` candidates.
    pub lookup: &'a LookupCandidates,
}

impl Evidence<'_> {
    fn auto_contains(&self, lemma: &str) -> bool {
        self.auto.iter().any(|a| a == lemma)
    }

    /// Automatic lemmas also present in `lemmas`, deduplicated in auto order.
    fn auto_among<'b>(&'b self, lemmas: &[&str]) -> Vec<&'b str> {
        let mut out: Vec<&str> = Vec::new();
        for auto in self.auto {
            if lemmas.contains(&auto.as_str()) && !out.contains(&auto.as_str()) {
                out.push(auto);
            }
        }
        out
    }
}

/// Chosen lemma (possibly a `|`-joined alternation) and its confidence.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Resolution {
    pub lemma: String,
    pub score: Score,
}

impl Resolution {
    pub fn new(lemma: impl Into<String>, score: Score) -> Self {
        Self {
            lemma: lemma.into(),
            score,
        }
    }

    pub fn unknown() -> Self {
        Self::new(UNKNOWN_LEMMA, Score::Unknown)
    }

    /// Several options joined, scored by how many there are.
    fn options<S: AsRef<str>>(options: &[S]) -> Self {
        Self::new(join_alternatives(options), Score::by_cardinality(options.len()))
    }
}

/// One step of the decision ladder.
pub trait Resolver: Send + Sync {
    fn name(&self) -> &str;

    /// Settle the token, or return `None` to let the next resolver try.
    fn resolve(&self, evidence: &Evidence<'_>) -> Option<Resolution>;
}

/// A tag-to-tag rewrite applied before comparing POS sets. Tags missing from
/// the table are kept as they are.
#[derive(Clone, Debug, Default)]
pub struct Simplification {
    name: String,
    table: HashMap<String, String>,
}

impl Simplification {
    pub fn new<I, S, T>(name: impl Into<String>, pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            name: name.into(),
            table: pairs
                .into_iter()
                .map(|(s, t)| (s.into(), t.into()))
                .collect(),
        }
    }

    /// Compare tags as written.
    pub fn exact() -> Self {
        Self::new("exact", std::iter::empty::<(&str, &str)>())
    }

    /// Collapse UD tags into nine classes: PROPN into NOUN, AUX into VERB,
    /// DET and NUM into ADJ, INTJ and PART into ADV, SYM into PUNCT.
    pub fn ud_simplified() -> Self {
        Self::new(
            "ud-simplified",
            [
                ("ADJ", "ADJ"),
                ("ADV", "ADV"),
                ("INTJ", "ADV"),
                ("NOUN", "NOUN"),
                ("PROPN", "NOUN"),
                ("VERB", "VERB"),
                ("ADP", "ADP"),
                ("AUX", "VERB"),
                ("CCONJ", "CCONJ"),
                ("DET", "ADJ"),
                ("NUM", "ADJ"),
                ("PART", "ADV"),
                ("PRON", "PRON"),
                ("SCONJ", "SCONJ"),
                ("PUNCT", "PUNCT"),
                ("SYM", "PUNCT"),
                ("X", "X"),
            ],
        )
    }

    /// Split UD tags into content words (LEX) and function words (FNC).
    pub fn lexical_functional() -> Self {
        Self::new(
            "lex-fnc",
            [
                ("ADJ", "LEX"),
                ("ADV", "LEX"),
                ("INTJ", "LEX"),
                ("NOUN", "LEX"),
                ("PROPN", "LEX"),
                ("VERB", "LEX"),
                ("AUX", "LEX"),
                ("ADP", "FNC"),
                ("CCONJ", "FNC"),
                ("DET", "FNC"),
                ("NUM", "FNC"),
                ("PART", "FNC"),
                ("PRON", "FNC"),
                ("SCONJ", "FNC"),
                ("PUNCT", "PUNCT"),
                ("SYM", "PUNCT"),
                ("X", "X"),
            ],
        )
    }

    /// The three levels used by default, finest first.
    pub fn ud_levels() -> Vec<Self> {
        vec![Self::exact(), Self::ud_simplified(), Self::lexical_functional()]
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn apply<'a>(&'a self, tag: &'a str) -> &'a str {
        self.table.get(tag).map(String::as_str).unwrap_or(tag)
    }

    pub fn simplify(&self, set: &PosSet) -> PosSet {
        set.map(|t| self.apply(t).to_string())
    }
}

/// Gold lemmas short-circuit everything else.
pub struct GoldResolver;

impl Resolver for GoldResolver {
    fn name(&self) -> &str {
        "gold"
    }

    fn resolve(&self, ev: &Evidence<'_>) -> Option<Resolution> {
        if ev.gold.is_empty() {
            return None;
        }
        Some(Resolution::new(join_alternatives(ev.gold), Score::Gold))
    }
}

/// A single lexicon candidate checked against the taggers and the POS.
///
/// Only applies when automatic lemmas exist; a lone lookup lemma without them
/// goes through the POS passes like any other candidate list.
pub struct SingleLookupResolver;

impl Resolver for SingleLookupResolver {
    fn name(&self) -> &str {
        "single-lookup"
    }

    fn resolve(&self, ev: &Evidence<'_>) -> Option<Resolution> {
        if ev.lookup.len() != 1 || ev.auto.is_empty() {
            return None;
        }
        let (pos, lemma) = ev.lookup.iter().next()?;
        let pos_agrees = PosSet::parse(pos).intersects(ev.pos);
        let score = match (ev.auto_contains(lemma), pos_agrees) {
            (true, true) => Score::LookupAutoPos,
            (true, false) => Score::LookupAutoNoPos,
            (false, true) => Score::LookupPos,
            (false, false) => Score::LookupOnly,
        };
        Some(Resolution::new(lemma, score))
    }
}

/// Keep the lexicon candidates whose POS agrees with the token after both
/// sides are passed through one [`Simplification`].
pub struct PosPassResolver {
    simplification: Simplification,
    unique: Score,
}

impl PosPassResolver {
    /// `unique` is the score given when exactly one lemma agrees.
    pub fn new(simplification: Simplification, unique: Score) -> Self {
        Self {
            simplification,
            unique,
        }
    }

    /// Distinct lemmas of the candidates whose simplified POS agrees.
    fn matching<'a>(&self, ev: &Evidence<'a>) -> Vec<&'a str> {
        let token = self.simplification.simplify(ev.pos);
        let mut lemmas: Vec<&str> = Vec::new();
        for (pos, lemma) in ev.lookup.iter() {
            let candidate = self.simplification.simplify(&PosSet::parse(pos));
            if candidate.intersects(&token) && !lemmas.contains(&lemma) {
                lemmas.push(lemma);
            }
        }
        lemmas
    }
}

impl Resolver for PosPassResolver {
    fn name(&self) -> &str {
        self.simplification.name()
    }

    fn resolve(&self, ev: &Evidence<'_>) -> Option<Resolution> {
        let matched = self.matching(ev);
        match matched.as_slice() {
            [] => None,
            [lemma] => {
                let score = if !ev.auto.is_empty() && !ev.auto_contains(lemma) {
                    Score::PosAgainstAuto
                } else {
                    self.unique
                };
                Some(Resolution::new(*lemma, score))
            }
            _ if ev.auto.is_empty() => Some(Resolution::new(
                join_alternatives(&matched),
                Score::Ambiguous,
            )),
            _ => {
                let picked = ev.auto_among(&matched);
                Some(match picked.as_slice() {
                    [] => Resolution::options(ev.auto),
                    [lemma] => Resolution::new(*lemma, Score::AutoAmongLookup),
                    _ => Resolution::new(join_alternatives(&picked), Score::Ambiguous),
                })
            }
        }
    }
}

/// Lexicon candidates exist but none agrees with the POS at any level.
pub struct LookupFallbackResolver;

impl Resolver for LookupFallbackResolver {
    fn name(&self) -> &str {
        "lookup-fallback"
    }

    fn resolve(&self, ev: &Evidence<'_>) -> Option<Resolution> {
        if ev.lookup.is_empty() {
            return None;
        }
        let mut lookup: Vec<&str> = Vec::new();
        for lemma in ev.lookup.lemmas() {
            if !lookup.contains(&lemma.as_str()) {
                lookup.push(lemma);
            }
        }
        if ev.auto.is_empty() {
            return Some(Resolution::new(join_alternatives(&lookup), Score::Ambiguous));
        }
        let picked = ev.auto_among(&lookup);
        Some(match picked.as_slice() {
            [] => Resolution::options(ev.auto),
            [lemma] => Resolution::new(*lemma, Score::AutoAmongLookup),
            _ => Resolution::new(join_alternatives(&picked), Score::Ambiguous),
        })
    }
}

/// Tagger lemmas with nothing to check them against.
pub struct AutoOnlyResolver;

impl Resolver for AutoOnlyResolver {
    fn name(&self) -> &str {
        "auto-only"
    }

    fn resolve(&self, ev: &Evidence<'_>) -> Option<Resolution> {
        (!ev.auto.is_empty()).then(|| Resolution::options(ev.auto))
    }
}

/// Ordered resolver list; the first resolver to answer wins.
pub struct Disambiguator {
    resolvers: Vec<Box<dyn Resolver>>,
}

impl Default for Disambiguator {
    fn default() -> Self {
        Self::with_simplifications(Simplification::ud_levels())
    }
}

impl Disambiguator {
    /// Build from an explicit resolver list.
    pub fn new(resolvers: Vec<Box<dyn Resolver>>) -> Self {
        Self { resolvers }
    }

    /// The standard ladder with one POS pass per simplification level. The
    /// first level scores a unique match as [`Score::UniquePos`], later levels
    /// as [`Score::UniqueSimplifiedPos`].
    pub fn with_simplifications(levels: Vec<Simplification>) -> Self {
        let mut resolvers: Vec<Box<dyn Resolver>> =
            vec![Box::new(GoldResolver), Box::new(SingleLookupResolver)];
        for (i, level) in levels.into_iter().enumerate() {
            let unique = if i == 0 {
                Score::UniquePos
            } else {
                Score::UniqueSimplifiedPos
            };
            resolvers.push(Box::new(PosPassResolver::new(level, unique)));
        }
        resolvers.push(Box::new(LookupFallbackResolver));
        resolvers.push(Box::new(AutoOnlyResolver));
        Self::new(resolvers)
    }

    pub fn resolver_names(&self) -> Vec<&str> {
        self.resolvers.iter().map(|r| r.name()).collect()
    }

    pub fn resolve(&self, evidence: &Evidence<'_>) -> Resolution {
        self.resolvers
            .iter()
            .find_map(|r| r.resolve(evidence))
            .unwrap_or_else(Resolution::unknown)
    }

    /// Resolve from plain lists; `lookup_lemmas` and `lookup_poss` are read
    /// pairwise and must have the same length.
    pub fn score_lemmas(
        &self,
        pos: &[&str],
        gold: &[&str],
        auto: &[&str],
        lookup_lemmas: &[&str],
        lookup_poss: &[&str],
    ) -> Resolution {
        let pos: PosSet = pos.iter().copied().collect();
        let gold: Vec<String> = gold.iter().map(|s| s.to_string()).collect();
        let auto: Vec<String> = auto.iter().map(|s| s.to_string()).collect();
        let lookup = LookupCandidates::from_pairs(
            lookup_poss.iter().copied().zip(lookup_lemmas.iter().copied()),
        );
        self.resolve(&Evidence {
            pos: &pos,
            gold: &gold,
            auto: &auto,
            lookup: &lookup,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(
        pos: &[&str],
        gold: &[&str],
        auto: &[&str],
        lemmas: &[&str],
        poss: &[&str],
    ) -> (String, Score) {
        let r = Disambiguator::default().score_lemmas(pos, gold, auto, lemmas, poss);
        (r.lemma, r.score)
    }

    fn s(lemma: &str, score: Score) -> (String, Score) {
        (lemma.to_string(), score)
    }

    #[test]
    fn default_ladder_order() {
        assert_eq!(
            Disambiguator::default().resolver_names(),
            vec![
                "gold",
                "single-lookup",
                "exact",
                "ud-simplified",
                "lex-fnc",
                "lookup-fallback",
                "auto-only"
            ]
        );
    }

    #[test]
    fn gold_always_wins() {
        let cases: [(&[&str], &[&str], &[&str], &[&str]); 4] = [
            (&[], &[], &[], &[]),
            (&["NOUN"], &["cat"], &["cat", "dog"], &["NOUN", "VERB"]),
            (&["VERB"], &["dog"], &["dog"], &["VERB"]),
            (&["X"], &[], &["a", "b"], &["X", "X"]),
        ];
        for (pos, auto, lemmas, poss) in cases {
            assert_eq!(score(pos, &["seigneur"], auto, lemmas, poss), s("seigneur", Score::Gold));
        }
        assert_eq!(score(&[], &["a", "b"], &[], &[], &[]), s("a|b", Score::Gold));
    }

    #[test]
    fn nothing_is_unknown() {
        assert_eq!(score(&[], &[], &[], &[], &[]), s("UNKNOWN", Score::Unknown));
        assert_eq!(score(&["NOUN"], &[], &[], &[], &[]), s("UNKNOWN", Score::Unknown));
    }

    #[test]
    fn single_lookup_against_taggers() {
        let n = &["NOUN"];
        assert_eq!(score(n, &[], &["cat"], &["cat"], &["NOUN"]), s("cat", Score::LookupAutoPos));
        assert_eq!(score(n, &[], &["cat"], &["cat"], &["VERB"]), s("cat", Score::LookupAutoNoPos));
        assert_eq!(score(n, &[], &["dog"], &["cat"], &["NOUN|VERB"]), s("cat", Score::LookupPos));
        assert_eq!(score(n, &[], &["dog"], &["cat"], &["VERB"]), s("cat", Score::LookupOnly));
    }

    #[test]
    fn single_lookup_without_taggers_uses_pos_passes() {
        assert_eq!(score(&["NOUN"], &[], &[], &["cat"], &["NOUN"]), s("cat", Score::UniquePos));
        assert_eq!(
            score(&["PROPN"], &[], &[], &["cat"], &["NOUN"]),
            s("cat", Score::UniqueSimplifiedPos)
        );
        assert_eq!(score(&["NOUN"], &[], &[], &["cat"], &["ADP"]), s("cat", Score::Ambiguous));
    }

    #[test]
    fn unique_pos_match_on_exact_tags() {
        assert_eq!(
            score(&["NOUN"], &[], &[], &["cat", "dog"], &["NOUN", "VERB"]),
            s("cat", Score::UniquePos)
        );
        // Same lemma under two agreeing tags is still one candidate.
        assert_eq!(
            score(&["NOUN", "VERB"], &[], &[], &["cat", "cat", "dog"], &["NOUN", "VERB", "ADP"]),
            s("cat", Score::UniquePos)
        );
    }

    #[test]
    fn coarser_passes_score_lower() {
        // AUX only meets VERB once simplified.
        assert_eq!(
            score(&["AUX"], &[], &[], &["avoir", "a"], &["VERB", "ADP"]),
            s("avoir", Score::UniqueSimplifiedPos)
        );
        // DET and PRON are both function words.
        assert_eq!(
            score(&["DET"], &[], &[], &["il", "chien"], &["PRON", "NOUN"]),
            s("il", Score::UniqueSimplifiedPos)
        );
    }

    #[test]
    fn unique_match_contradicted_by_taggers() {
        assert_eq!(
            score(&["NOUN"], &[], &["dog"], &["cat", "dog"], &["NOUN", "VERB"]),
            s("cat", Score::PosAgainstAuto)
        );
        assert_eq!(
            score(&["NOUN"], &[], &["cat"], &["cat", "dog"], &["NOUN", "VERB"]),
            s("cat", Score::UniquePos)
        );
    }

    #[test]
    fn several_matches_with_taggers() {
        let pos = &["NOUN"];
        let lemmas = &["sire", "seigneur", "signor"];
        let poss = &["NOUN", "NOUN", "NOUN"];
        assert_eq!(score(pos, &[], &["seigneur"], lemmas, poss), s("seigneur", Score::AutoAmongLookup));
        assert_eq!(
            score(pos, &[], &["signor", "sire"], lemmas, poss),
            s("signor|sire", Score::Ambiguous)
        );
        assert_eq!(score(pos, &[], &["baron"], lemmas, poss), s("baron", Score::AutoOnly));
        assert_eq!(
            score(pos, &[], &["baron", "conte"], lemmas, poss),
            s("baron|conte", Score::Ambiguous)
        );
    }

    #[test]
    fn several_matches_without_taggers_stay_ambiguous() {
        assert_eq!(
            score(&["NOUN"], &[], &[], &["sire", "seigneur", "aler"], &["NOUN", "NOUN", "VERB"]),
            s("sire|seigneur", Score::Ambiguous)
        );
    }

    #[test]
    fn no_pos_agreement_falls_back_to_taggers() {
        let lemmas = &["cat", "dog"];
        let poss = &["NOUN", "NOUN"];
        assert_eq!(score(&["ADP"], &[], &["dog"], lemmas, poss), s("dog", Score::AutoAmongLookup));
        assert_eq!(
            score(&["ADP"], &[], &["dog", "cat"], lemmas, poss),
            s("dog|cat", Score::Ambiguous)
        );
        assert_eq!(score(&["ADP"], &[], &["a"], lemmas, poss), s("a", Score::AutoOnly));
        assert_eq!(score(&["ADP"], &[], &[], lemmas, poss), s("cat|dog", Score::Ambiguous));
        assert_eq!(score(&[], &[], &[], lemmas, poss), s("cat|dog", Score::Ambiguous));
    }

    #[test]
    fn taggers_alone() {
        assert_eq!(score(&["NOUN"], &[], &["cat"], &[], &[]), s("cat", Score::AutoOnly));
        assert_eq!(score(&["NOUN"], &[], &["cat", "dog"], &[], &[]), s("cat|dog", Score::Ambiguous));
    }

    #[test]
    fn extra_simplification_levels_are_data() {
        let coarse = Simplification::new("anything", [("NOUN", "W"), ("ADP", "W")]);
        let d = Disambiguator::with_simplifications(vec![Simplification::exact(), coarse]);
        let r = d.score_lemmas(&["ADP"], &[], &[], &["cat", "de"], &["NOUN", "CCONJ"]);
        assert_eq!(r, Resolution::new("cat", Score::UniqueSimplifiedPos));
        let r = Disambiguator::default().score_lemmas(
            &["ADP"],
            &[],
            &[],
            &["cat", "de"],
            &["NOUN", "CCONJ"],
        );
        assert_eq!(r, Resolution::new("de", Score::UniqueSimplifiedPos));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    const TAGS: &[&str] = &["NOUN", "VERB", "DET", "PRON", "ADP", "PROPN", "AUX", "X"];

    fn arb_tags() -> impl Strategy<Value = Vec<&'static str>> {
        prop::collection::vec(prop::sample::select(TAGS), 0..3)
    }

    fn arb_lemmas(min: usize) -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("[a-z]{1,6}", min..4)
    }

    proptest! {
        #[test]
        fn gold_wins_whatever_else_is_offered(
            pos in arb_tags(),
            gold in arb_lemmas(1),
            auto in arb_lemmas(0),
            lookup in prop::collection::vec(("[a-z]{1,6}", prop::sample::select(TAGS)), 0..4),
        ) {
            let gold_refs: Vec<&str> = gold.iter().map(String::as_str).collect();
            let auto_refs: Vec<&str> = auto.iter().map(String::as_str).collect();
            let lemmas: Vec<&str> = lookup.iter().map(|(l, _)| l.as_str()).collect();
            let poss: Vec<&str> = lookup.iter().map(|(_, p)| *p).collect();
            let r = Disambiguator::default()
                .score_lemmas(&pos, &gold_refs, &auto_refs, &lemmas, &poss);
            prop_assert_eq!(r, Resolution::new(gold.join("|"), Score::Gold));
        }
    }
}
