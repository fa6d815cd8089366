use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn command_graph() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("orthotree")?;
    let output = cmd.arg("graph").arg("tests/orthofinder").output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert!(stdout.starts_with("(mclheader\nmcltype matrix\ndimensions 12x12\n)"));
    // a1 is joined to b1, c1 and d1, both directions summed
    assert!(stdout.contains("\n0    3:200.000 6:200.000 9:200.000 $\n"));
    // d3 has no hits
    assert!(stdout.contains("\n11    $\n"));
    assert!(stdout.ends_with("$\n)\n"));
    assert_eq!(stdout.lines().filter(|l| l.ends_with('$')).count(), 12);

    Ok(())
}

#[test]
fn command_graph_parallel_is_identical() -> anyhow::Result<()> {
    let single = Command::cargo_bin("orthotree")?
        .arg("graph")
        .arg("tests/orthofinder")
        .output()?;
    let multi = Command::cargo_bin("orthotree")?
        .arg("graph")
        .arg("tests/orthofinder")
        .arg("-p")
        .arg("3")
        .output()?;

    assert_eq!(single.stdout, multi.stdout);

    Ok(())
}

#[test]
fn command_graph_missing_scores() -> anyhow::Result<()> {
    let tempdir = tempfile::TempDir::new()?;
    for file in ["SpeciesIDs.txt", "SequenceIDs.txt", "Scores0_0.tsv"] {
        std::fs::copy(
            format!("tests/orthofinder/{}", file),
            tempdir.path().join(file),
        )?;
    }

    let mut cmd = Command::cargo_bin("orthotree")?;
    cmd.arg("graph")
        .arg(tempdir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));

    Ok(())
}
