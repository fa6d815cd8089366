use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn command_run_with_unrooted_tree() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;

    let mut cmd = Command::cargo_bin("orthotree")?;
    cmd.arg("run")
        .arg("tests/orthofinder")
        .arg("--tree")
        .arg("tests/orthofinder/SpeciesTree_unrooted.txt")
        .arg("-o")
        .arg(tempdir.path())
        .assert()
        .success();

    let out = tempdir.path();
    assert!(out.join("Orthogroups/Orthogroups.tsv").is_file());
    assert_eq!(
        std::fs::read_to_string(out.join("Species_Tree/SpeciesTree_rooted.txt"))?,
        "((A,B),(C,D));\n"
    );
    assert_eq!(
        std::fs::read_to_string(out.join("Orthologues/Orthologues_A/A__v__B.tsv"))?,
        "Orthogroup\tA\tB\tType\n\
         OG0000000\ta1\tb1\t1:1\n\
         OG0000001\ta2\tb2\t1:1\n\
         OG0000002\ta3\tb3\t1:1\n"
    );
    assert!(out
        .join("Phylogenetic_Hierarchical_Orthogroups/N0.tsv")
        .is_file());
    assert!(out
        .join("Comparative_Genomics_Statistics/Duplications_per_Orthogroup.tsv")
        .is_file());

    Ok(())
}

#[test]
fn command_run_with_rooted_tree() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;

    let mut cmd = Command::cargo_bin("orthotree")?;
    cmd.arg("run")
        .arg("tests/orthofinder")
        .arg("--species-tree")
        .arg("tests/orthofinder/SpeciesTree_rooted.txt")
        .arg("--fewer-open-files")
        .arg("-p")
        .arg("2")
        .arg("-o")
        .arg(tempdir.path())
        .assert()
        .success();

    let out = tempdir.path();
    // the user tree is taken as is, no rooting
    assert!(!out.join("Species_Tree/STRIDE_Roots.tsv").exists());
    let a = std::fs::read_to_string(out.join("Orthologues/A.tsv"))?;
    assert!(a.contains("OG0000000\tA\ta1\tB\tb1\t1:1\n"));

    Ok(())
}

#[test]
fn command_run_needs_a_tree() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;

    let mut cmd = Command::cargo_bin("orthotree")?;
    cmd.arg("run")
        .arg("tests/orthofinder")
        .arg("-o")
        .arg(tempdir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("--tree or --species-tree"));

    assert!(!tempdir.path().join("Orthogroups").exists());

    Ok(())
}

#[test]
fn command_run_rejects_bad_tree_before_clustering() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;
    let tree = tempdir.path().join("unrooted.nwk");
    std::fs::write(&tree, "((0,1),2);\n")?;
    let outdir = tempdir.path().join("Results");

    let mut cmd = Command::cargo_bin("orthotree")?;
    cmd.arg("run")
        .arg("tests/orthofinder")
        .arg("--tree")
        .arg(&tree)
        .arg("-o")
        .arg(&outdir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("species tree is missing species: 3"));

    assert!(!outdir.join("Orthogroups").exists());
    assert!(!outdir.join("Species_Tree").exists());

    Ok(())
}
