use ofl_types::{ALTERNATION, Score};

use crate::Resolution;

/// Demote a settled lemma that the reference lexicon never lists.
///
/// Gold lemmas and lemmas still holding several options are left alone; any
/// other lemma for which `is_attested` returns false is scored
/// [`Score::Unattested`]. Numeral handling belongs to the predicate.
pub fn attestation_filter<F>(resolution: Resolution, is_attested: F) -> Resolution
where
    F: Fn(&str) -> bool,
{
    if resolution.score == Score::Gold
        || resolution.lemma.contains(ALTERNATION)
        || is_attested(&resolution.lemma)
    {
        return resolution;
    }
    Resolution {
        score: Score::Unattested,
        ..resolution
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known(lemma: &str) -> bool {
        matches!(lemma, "estre" | "chevalier")
    }

    #[test]
    fn unattested_single_lemma_is_demoted() {
        let out = attestation_filter(Resolution::new("foo", Score::LookupPos), known);
        assert_eq!(out, Resolution::new("foo", Score::Unattested));
        let out = attestation_filter(Resolution::new("UNKNOWN", Score::Unknown), known);
        assert_eq!(out.score, Score::Unattested);
    }

    #[test]
    fn gold_ambiguous_and_attested_lemmas_pass() {
        for r in [
            Resolution::new("foo", Score::Gold),
            Resolution::new("foo|bar", Score::Ambiguous),
            Resolution::new("estre", Score::AutoOnly),
        ] {
            assert_eq!(attestation_filter(r.clone(), known), r);
        }
    }
}
