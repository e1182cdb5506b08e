//! End-to-end runs against real files.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use fastaselect_rs::{
    FileOpener, FragmentMode, OutputTemplate, SelectConfig, SelectError, run_fragmented,
    run_select,
};
use tempfile::TempDir;

const RECORDS: &str = "\
>seq1 first entry
ACGTACGT
ACGT
>seq2\tsecond entry
GGGG
>seq3 third entry
TTTT
TT
>seq4
CCCC
";

fn write(dir: &TempDir, name: &str, text: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, text).unwrap();
    path
}

fn open(path: &Path) -> BufReader<File> {
    BufReader::new(File::open(path).unwrap())
}

fn template(dir: &TempDir) -> OutputTemplate {
    OutputTemplate::parse(dir.path().join("part_%s.fa").to_str().unwrap()).unwrap()
}

fn read(dir: &TempDir, name: &str) -> String {
    fs::read_to_string(dir.path().join(name)).unwrap()
}

#[test]
fn test_select_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let records = write(&dir, "in.fa", RECORDS);
    let selection = write(&dir, "sel.txt", "seq3\nseq1|extra\n");
    let out_path = dir.path().join("out.fa");

    let report = run_select(
        &SelectConfig::default(),
        open(&selection),
        open(&records),
        BufWriter::new(File::create(&out_path).unwrap()),
    )
    .unwrap();

    assert_eq!(
        fs::read_to_string(&out_path).unwrap(),
        ">seq3 third entry\nTTTT\nTT\n>seq1 first entry\nACGTACGT\nACGT\n"
    );
    assert_eq!(report.selectors, 2);
    assert_eq!(report.records_emitted, 2);
    assert!(report.stopped_early);
}

#[test]
fn test_fragment_exclusive_contiguous_groups() {
    let dir = tempfile::tempdir().unwrap();
    let records = write(&dir, "in.fa", RECORDS);
    let selection = write(&dir, "sel.txt", "seq4 left\nseq2 left\nseq1 right\n");
    let config = SelectConfig::default().with_fragment(FragmentMode::CreateExclusive);

    let report = run_fragmented(
        &config,
        open(&selection),
        open(&records),
        FileOpener::new(template(&dir)),
    )
    .unwrap();

    assert_eq!(report.records_emitted, 3);
    assert_eq!(read(&dir, "part_left.fa"), ">seq4\nCCCC\n>seq2\tsecond entry\nGGGG\n");
    assert_eq!(read(&dir, "part_right.fa"), ">seq1 first entry\nACGTACGT\nACGT\n");
}

#[test]
fn test_fragment_exclusive_split_group_fails() {
    let dir = tempfile::tempdir().unwrap();
    let records = write(&dir, "in.fa", RECORDS);
    let selection = write(&dir, "sel.txt", "seq1 a\nseq2 b\nseq3 a\n");
    let config = SelectConfig::default().with_fragment(FragmentMode::CreateExclusive);

    let err = run_fragmented(
        &config,
        open(&selection),
        open(&records),
        FileOpener::new(template(&dir)),
    )
    .unwrap_err();

    assert!(matches!(err, SelectError::GroupContiguity { .. }));
    // Output written before the failure stays.
    assert_eq!(read(&dir, "part_a.fa"), ">seq1 first entry\nACGTACGT\nACGT\n");
    assert_eq!(read(&dir, "part_b.fa"), ">seq2\tsecond entry\nGGGG\n");
}

#[test]
fn test_fragment_exclusive_existing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let records = write(&dir, "in.fa", RECORDS);
    let selection = write(&dir, "sel.txt", "seq1 a\n");
    write(&dir, "part_a.fa", "old\n");
    let config = SelectConfig::default().with_fragment(FragmentMode::CreateExclusive);

    let err = run_fragmented(
        &config,
        open(&selection),
        open(&records),
        FileOpener::new(template(&dir)),
    )
    .unwrap_err();
    assert!(matches!(err, SelectError::GroupContiguity { .. }));
    assert_eq!(read(&dir, "part_a.fa"), "old\n");
}

#[test]
fn test_fragment_append_recurring_group() {
    let dir = tempfile::tempdir().unwrap();
    let records = write(&dir, "in.fa", RECORDS);
    let selection = write(&dir, "sel.txt", "seq1 a\nseq2 b\nseq3 a\n");
    write(&dir, "part_a.fa", ">seq0\nNNNN\n");
    let config = SelectConfig::default().with_fragment(FragmentMode::Append);

    run_fragmented(
        &config,
        open(&selection),
        open(&records),
        FileOpener::new(template(&dir)),
    )
    .unwrap();

    assert_eq!(
        read(&dir, "part_a.fa"),
        ">seq0\nNNNN\n>seq1 first entry\nACGTACGT\nACGT\n>seq3 third entry\nTTTT\nTT\n"
    );
    assert_eq!(read(&dir, "part_b.fa"), ">seq2\tsecond entry\nGGGG\n");
}

#[test]
fn test_fragment_selector_without_group() {
    let dir = tempfile::tempdir().unwrap();
    let records = write(&dir, "in.fa", RECORDS);
    let selection = write(&dir, "sel.txt", "seq1 a\nseq2\n");
    let config = SelectConfig::default().with_fragment(FragmentMode::Append);

    let err = run_fragmented(
        &config,
        open(&selection),
        open(&records),
        FileOpener::new(template(&dir)),
    )
    .unwrap_err();
    assert!(matches!(err, SelectError::MissingGroup { .. }));
    assert!(!dir.path().join("part_a.fa").exists());
}
