use std::path::PathBuf;

use ofl_lexicon::{AttestedLemmas, Lexicon, LoadMode};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn loads_with_both_modes() {
    for mode in [LoadMode::Mmap, LoadMode::Owned] {
        let lex = Lexicon::load_with_mode(fixture("lexicon.tsv"), mode, true).expect("load fixture");
        assert_eq!(lex.stats().records, 14);
        assert_eq!(lex.stats().skipped, 1);
        assert_eq!(lex.lemmas_for("li"), ["le", "il"]);
        assert_eq!(lex.poss_for("li"), ["DET", "PRON"]);
    }
}

#[test]
fn lookup_lines_list_deduplicated_pairs() {
    let lex = Lexicon::load(fixture("lexicon.tsv"), true).expect("load fixture");
    assert_eq!(
        lex.lookup("Est").to_string(),
        "est\tVERB\testre\tNOUN\testre"
    );
    assert_eq!(lex.lookup("l'").to_string(), "l'\tDET\tle\tPRON\til");
    assert_eq!(lex.lookup("Roland").to_string(), "roland");
}

#[test]
fn empty_lexicon_file_loads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.tsv");
    std::fs::write(&path, b"").unwrap();
    let lex = Lexicon::load(&path, false).expect("load empty lexicon");
    assert_eq!(lex.form_count(), 0);
    assert!(!lex.lookup("li").is_hit());
}

#[test]
fn attested_lemmas_from_files() {
    let set = AttestedLemmas::load(&[fixture("lexicon.tsv")], true).expect("load attested");
    assert!(set.contains("estre"));
    assert!(set.contains("seignor"));
    assert!(!set.contains("seigneur"));
    assert!(!set.contains("this line is malformed"));
}
