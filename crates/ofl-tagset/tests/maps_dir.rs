use std::fs;
use std::path::PathBuf;

use ofl_tagset::{Columns, IDENTITY_MAP, StandardizeError, Standardizer};

fn maps_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("maps")
}

#[test]
fn loads_tsv_maps_in_name_order() {
    let std = Standardizer::load_dir(maps_dir()).expect("load maps");
    let names: Vec<&str> = std.maps().iter().map(|m| m.name()).collect();
    assert_eq!(names, vec!["10-cattex", "20-stts", IDENTITY_MAP]);
    assert_eq!(std.maps()[1].len(), 12);
}

#[test]
fn standardizes_tagger_output_file() {
    let std = Standardizer::load_dir(maps_dir()).expect("load maps");
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("tagger.txt");
    let output = dir.path().join("tagger.std.txt");
    fs::write(
        &input,
        "Li\tART\tle\nchevaliers\tNN\tchevalier\nvait\tVVFIN\taler\nau\tAPPRART\tà.le\n.\t$.\t.\n",
    )
    .unwrap();

    std.standardize_file(&input, &output, Columns::Token).expect("standardize");
    let out = fs::read_to_string(&output).unwrap();
    assert_eq!(
        out,
        "Li\tDET\tle\nchevaliers\tNOUN\tchevalier\nvait\tVERB\taler\nau\tADP.DET\tà.le\n.\tPUNCT\t.\n"
    );

    // Running the output through again changes nothing.
    let again = dir.path().join("tagger.std2.txt");
    std.standardize_file(&output, &again, Columns::Token).expect("restandardize");
    assert_eq!(fs::read_to_string(&again).unwrap(), out);
}

#[test]
fn unknown_tagset_reports_map_not_found() {
    let std = Standardizer::load_dir(maps_dir()).expect("load maps");
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("odd.txt");
    fs::write(&input, "a\tQ1\nb\tQ2\nc\tQ3\n").unwrap();
    let err = std
        .standardize_file(&input, &dir.path().join("out.txt"), Columns::Token)
        .unwrap_err();
    assert!(matches!(err, StandardizeError::MapNotFound { distinct: 3 }));
}
