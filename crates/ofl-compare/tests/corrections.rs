use std::fs;

use ofl_compare::{
    Corrector, CorrectorError, Disambiguator, Resolution, Score, attestation_filter, vote,
};
use tempfile::tempdir;

#[test]
fn loads_correction_table_from_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("rules.tsv");
    fs::write(
        &path,
        "# form\tpos\tlemma\treplacement\n\
         [Ss]ire\tNOUN\tseigneur\tsire\n\
         .*\tVERB\taveir\tavoir\n",
    )
    .unwrap();

    let corrector = Corrector::load(&path).unwrap();
    assert_eq!(corrector.rules().len(), 2);
    let out = corrector.correct_text("Sire\tNOUN\tseigneur\t8\nout\tVERB\taveir\t0\nout\tVERB\tavoir\t9\n");
    assert_eq!(out, "Sire\tNOUN\tsire\t11\nout\tVERB\tavoir\t11\nout\tVERB\tavoir\t9\n");
}

#[test]
fn missing_table_is_an_io_error() {
    let dir = tempdir().unwrap();
    let err = Corrector::load(dir.path().join("absent.tsv")).unwrap_err();
    assert!(matches!(err, CorrectorError::Io { .. }));
}

#[test]
fn voted_taggers_feed_the_ladder_and_filter() {
    let engine = Disambiguator::default();
    let auto: Vec<String> = vote(&["seigneur", "sire|seigneur", "signor"], false)
        .split('|')
        .map(str::to_string)
        .collect();
    assert_eq!(auto, ["seigneur"]);

    let auto: Vec<&str> = auto.iter().map(String::as_str).collect();
    let r = engine.score_lemmas(&["NOUN"], &[], &auto, &["sire", "seigneur"], &["NOUN", "NOUN"]);
    assert_eq!(r, Resolution::new("seigneur", Score::AutoAmongLookup));

    let attested = |lemma: &str| lemma == "sire";
    let r = attestation_filter(r, attested);
    assert_eq!(r.score, Score::Unattested);
}
