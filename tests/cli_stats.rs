use assert_cmd::Command;
use tempfile::TempDir;

#[test]
fn command_stats() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;

    let mut cmd = Command::cargo_bin("orthotree")?;
    cmd.arg("stats")
        .arg("tests/hog/Duplications.tsv")
        .arg("--species-tree")
        .arg("tests/hog/SpeciesTree_rooted_node_labels.txt")
        .arg("-o")
        .arg(tempdir.path())
        .assert()
        .success();

    let per_node =
        std::fs::read_to_string(tempdir.path().join("Duplications_per_Species_Tree_Node.tsv"))?;
    assert_eq!(
        per_node,
        "Species Tree Node\tDuplications (all)\tDuplications (50% support)\n\
         N0\t1\t0\n\
         N1\t1\t1\n\
         A\t1\t1\n\
         B\t0\t0\n\
         N2\t0\t0\n\
         C\t0\t0\n\
         D\t0\t0\n"
    );

    let per_og = std::fs::read_to_string(tempdir.path().join("Duplications_per_Orthogroup.tsv"))?;
    assert_eq!(per_og.lines().count(), 5);
    assert!(per_og.contains("OG0000001\t2\t2\n"));
    assert!(per_og.contains("OG0000002\t0\t0\n"));

    let tree = std::fs::read_to_string(
        tempdir
            .path()
            .join("SpeciesTree_Gene_Duplications_0.5_Support.txt"),
    )?;
    assert_eq!(tree, "((A_1,B_0)N1_1,(C_0,D_0)N2_0)N0_0;\n");

    Ok(())
}

#[test]
fn command_stats_skips_other_tables() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;

    let mut cmd = Command::cargo_bin("orthotree")?;
    cmd.arg("stats")
        .arg("tests/orthofinder/SpeciesIDs.txt")
        .arg("--species-tree")
        .arg("tests/hog/SpeciesTree_rooted_node_labels.txt")
        .arg("-o")
        .arg(tempdir.path())
        .assert()
        .success();

    assert!(!tempdir
        .path()
        .join("Duplications_per_Orthogroup.tsv")
        .exists());

    Ok(())
}
