use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn command_root_with_duplications() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;

    let mut cmd = Command::cargo_bin("orthotree")?;
    cmd.arg("root")
        .arg("tests/orthofinder")
        .arg("--tree")
        .arg("tests/stride/SpeciesTree_unrooted.txt")
        .arg("--gene-trees")
        .arg("tests/stride/Gene_Trees")
        .arg("-o")
        .arg(tempdir.path())
        .arg("-v")
        .assert()
        .success()
        .stderr(predicate::str::contains(
            "Observed 2 well-supported, non-terminal duplications. 2 support the best root and 0 contradict it.",
        ))
        .stderr(predicate::str::contains("Best outgroup(s) for species tree: C, D"));

    let dir = tempdir.path().join("Species_Tree");
    assert_eq!(
        std::fs::read_to_string(dir.join("SpeciesTree_rooted.txt"))?,
        "((C,D),(A,B));\n"
    );
    assert_eq!(
        std::fs::read_to_string(dir.join("SpeciesTree_rooted_ids.txt"))?,
        "((2,3),(0,1));\n"
    );
    assert_eq!(
        std::fs::read_to_string(dir.join("SpeciesTree_rooted_node_labels.txt"))?,
        "((C,D)N1,(A,B)N2)N0;\n"
    );

    let roots = std::fs::read_to_string(dir.join("STRIDE_Roots.tsv"))?;
    assert_eq!(roots.lines().count(), 6);
    assert!(roots.contains("2\tC, D\t2\t0\ttrue\n"));
    assert_eq!(roots.matches("true").count(), 1);

    Ok(())
}

#[test]
fn command_root_ties() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;

    // a single speciation-only gene tree gives no evidence
    let mut cmd = Command::cargo_bin("orthotree")?;
    cmd.arg("root")
        .arg("tests/orthofinder")
        .arg("--tree")
        .arg("tests/orthofinder/SpeciesTree_unrooted.txt")
        .arg("--gene-trees")
        .arg("tests/orthofinder/Gene_Trees")
        .arg("-o")
        .arg(tempdir.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("only the first is analysed"));

    let dir = tempdir.path().join("Species_Tree");
    assert_eq!(
        std::fs::read_to_string(dir.join("SpeciesTree_rooted.txt"))?,
        "((A,B),(C,D));\n"
    );
    for k in 0..5 {
        assert!(dir
            .join(format!("SpeciesTree_rooted_at_outgroup_{}.txt", k))
            .is_file());
    }

    Ok(())
}

#[test]
fn command_root_needs_a_tree() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("orthotree")?;
    cmd.arg("root")
        .arg("tests/orthofinder")
        .arg("--gene-trees")
        .arg("tests/orthofinder/Gene_Trees")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--tree"));

    Ok(())
}

#[test]
fn command_root_rejects_duplicated_species() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;
    let tree = tempdir.path().join("unrooted.nwk");
    std::fs::write(&tree, "((0,1),2,3,3);\n")?;
    let outdir = tempdir.path().join("Results");

    let mut cmd = Command::cargo_bin("orthotree")?;
    cmd.arg("root")
        .arg("tests/orthofinder")
        .arg("--tree")
        .arg(&tree)
        .arg("--gene-trees")
        .arg("tests/stride/Gene_Trees")
        .arg("-o")
        .arg(&outdir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("duplicate species: 3"));

    assert!(!outdir.join("Species_Tree").exists());

    Ok(())
}
