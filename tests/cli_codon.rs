use assert_cmd::Command;
use std::fs;
use tempfile::TempDir;

#[test]
fn command_codon() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let protein = temp.path().join("1.faa.aln");
    let cds = temp.path().join("1.fna");

    fs::write(&protein, ">X\nMA-K\n>Y\nMAQK\n>Z\nM--K\n")?;
    fs::write(&cds, ">X\nATGGCAAAATAA\n>Y\nATGGCACAAAAA\n>Z\nATGAAAC\n")?;

    let mut cmd = Command::cargo_bin("ogr")?;
    let output = cmd.arg("codon").arg(&protein).arg(&cds).output()?;
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout)?;
    assert_eq!(stdout.lines().count(), 4);
    assert!(stdout.contains(">X\nATGGCA---AAA\n"));
    assert!(stdout.contains(">Y\nATGGCACAAAAA\n"));
    assert!(!stdout.contains(">Z"));

    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.contains("FrameMismatch"));

    Ok(())
}

#[test]
fn command_codon_wrap() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let protein = temp.path().join("1.faa.aln");
    let cds = temp.path().join("1.fna");
    let outfile = temp.path().join("1.fna.aln");

    fs::write(&protein, format!(">X\n{}\n", "M".repeat(30)))?;
    fs::write(&cds, format!(">X\n{}\n", "ATG".repeat(30)))?;

    let mut cmd = Command::cargo_bin("ogr")?;
    cmd.arg("codon")
        .arg(&protein)
        .arg(&cds)
        .arg("-o")
        .arg(&outfile)
        .assert()
        .success();

    let text = fs::read_to_string(&outfile)?;
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[1].len(), 60);
    assert_eq!(lines[2].len(), 30);

    Ok(())
}

#[test]
fn command_codon_mismatch() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let protein = temp.path().join("1.faa.aln");
    let cds = temp.path().join("1.fna");

    fs::write(&protein, ">X\nMK\n>Y\nMK\n")?;
    fs::write(&cds, ">X\nATGAAA\n>W\nATGAAA\n")?;

    let mut cmd = Command::cargo_bin("ogr")?;
    cmd.arg("codon")
        .arg(&protein)
        .arg(&cds)
        .assert()
        .failure()
        .stderr(predicates::str::contains("Identifier mismatch"));

    Ok(())
}
