use std::fs;
use std::io::{Cursor, Read};
use std::path::PathBuf;

use md2docx::{run_batch, ConvertOptions};
use zip::ZipArchive;

fn document_xml(path: &std::path::Path) -> String {
    let bytes = fs::read(path).unwrap();
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .unwrap()
        .read_to_string(&mut xml)
        .unwrap();
    xml
}

#[test]
fn missing_file_does_not_stop_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.md");
    let missing = dir.path().join("second.md");
    let third = dir.path().join("third.md");
    fs::write(&first, "# First\n\nhello\n").unwrap();
    fs::write(&third, "# Third\n\n- a\n- b\n").unwrap();

    let inputs: Vec<PathBuf> = vec![first, missing.clone(), third];
    let mut seen = Vec::new();
    let report = run_batch(&inputs, None, &ConvertOptions::default(), |o| {
        seen.push(o.result.is_ok())
    });

    assert_eq!(seen, vec![true, false, true]);
    assert_eq!(report.succeeded(), 2);
    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, missing.as_path());
    assert_ne!(report.exit_code(), 0);

    assert!(dir.path().join("first.docx").is_file());
    assert!(!dir.path().join("second.docx").exists());
    assert!(dir.path().join("third.docx").is_file());
}

#[test]
fn broken_image_still_converts() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("pics.md");
    fs::write(&input, "Before\n\n![gone](missing.png)\n\nAfter\n").unwrap();

    let report = run_batch(
        &[input],
        None,
        &ConvertOptions::default(),
        |_| {},
    );
    assert_eq!(report.exit_code(), 0);

    let xml = document_xml(&dir.path().join("pics.docx"));
    assert!(xml.contains("Before"));
    assert!(xml.contains("missing.png"));
    assert!(xml.contains("After"));
    assert!(!xml.contains("<w:drawing>"));
}

#[test]
fn extended_markdown_lands_in_the_package() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("rich.md");
    fs::write(
        &input,
        "# Report\n\nH~2~O is ==wet== and ~~dry~~.\n\n| k | v |\n|---|---|\n| a | 1 |\n\n<!-- pagebreak -->\n\nEnd\n",
    )
    .unwrap();

    let report = run_batch(&[input], None, &ConvertOptions::default(), |_| {});
    assert_eq!(report.exit_code(), 0);

    let xml = document_xml(&dir.path().join("rich.docx"));
    assert!(xml.contains("<w:pStyle w:val=\"Heading1\"/>"));
    assert!(xml.contains("<w:vertAlign w:val=\"subscript\"/>"));
    assert!(xml.contains("<w:highlight w:val=\"yellow\"/>"));
    assert!(xml.contains("<w:strike/>"));
    assert!(xml.contains("<w:tbl>"));
    assert!(xml.contains("<w:br w:type=\"page\"/>"));
}
