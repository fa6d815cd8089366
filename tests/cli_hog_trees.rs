use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn command_hog_trees() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;

    let mut cmd = Command::cargo_bin("orthotree")?;
    cmd.arg("hog-trees")
        .arg("tests/hog/Phylogenetic_Hierarchical_Orthogroups")
        .arg("--gene-trees")
        .arg("tests/hog/Resolved_Gene_Trees")
        .arg("-o")
        .arg(tempdir.path())
        .assert()
        .success()
        .stderr(predicate::str::contains(
            "N1.HOG0000001: parent clade n9 not found in the gene tree of OG0000000",
        ))
        .stderr(predicate::str::contains(
            "N1.HOG0000003: 1 genes are not in clade n2",
        ));

    assert_eq!(
        std::fs::read_to_string(tempdir.path().join("N1.HOG0000000_tree.txt"))?,
        "((a1,a2)n2,b1)n1;\n"
    );
    // c1 is not in the HOG
    assert_eq!(
        std::fs::read_to_string(tempdir.path().join("N0.HOG0000000_tree.txt"))?,
        "(((a1,a2)n2,b1)n1,d1)n0;\n"
    );
    assert!(!tempdir.path().join("N1.HOG0000001_tree.txt").exists());
    assert!(!tempdir.path().join("N1.HOG0000002_tree.txt").exists());

    Ok(())
}

#[test]
fn command_hog_trees_idempotent() -> anyhow::Result<()> {
    let first = TempDir::new()?;
    let second = TempDir::new()?;

    for dir in [&first, &second] {
        Command::cargo_bin("orthotree")?
            .arg("hog-trees")
            .arg("tests/hog/Phylogenetic_Hierarchical_Orthogroups")
            .arg("--gene-trees")
            .arg("tests/hog/Resolved_Gene_Trees")
            .arg("-o")
            .arg(dir.path())
            .assert()
            .success();
    }

    let name = "N0.HOG0000000_tree.txt";
    assert_eq!(
        std::fs::read_to_string(first.path().join(name))?,
        std::fs::read_to_string(second.path().join(name))?
    );

    Ok(())
}
