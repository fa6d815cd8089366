use assert_cmd::Command;
use tempfile::TempDir;

#[test]
fn command_cluster() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;

    let mut cmd = Command::cargo_bin("orthotree")?;
    cmd.arg("cluster")
        .arg("tests/orthofinder")
        .arg("-o")
        .arg(tempdir.path())
        .assert()
        .success();

    let og_dir = tempdir.path().join("Orthogroups");
    let tsv = std::fs::read_to_string(og_dir.join("Orthogroups.tsv"))?;
    assert_eq!(
        tsv,
        "Orthogroup\tA\tB\tC\tD\n\
         OG0000000\ta1\tb1\tc1\td1\n\
         OG0000001\ta2\tb2\tc2\t\n\
         OG0000002\ta3\tb3\t\t\n\
         OG0000003\t\t\tc3\td2\n"
    );

    let unassigned = std::fs::read_to_string(og_dir.join("Orthogroups_UnassignedGenes.tsv"))?;
    assert!(unassigned.contains("OG0000004\t\t\t\td3\n"));

    let ids = std::fs::read_to_string(og_dir.join("Orthogroups_SequenceIDs.txt"))?;
    assert_eq!(
        ids,
        std::fs::read_to_string("tests/orthofinder/Orthogroups_SequenceIDs.txt")?
    );

    let counts = std::fs::read_to_string(og_dir.join("Orthogroups.GeneCount.tsv"))?;
    assert!(counts.starts_with("Orthogroup\tA\tB\tC\tD\tTotal\n"));
    assert!(counts.contains("OG0000000\t1\t1\t1\t1\t4\n"));

    assert!(og_dir.join("Orthogroups.txt").is_file());
    assert!(og_dir.join("Orthogroups_SpeciesOverlaps.tsv").is_file());
    assert!(og_dir.join("clusters_I1.2.txt").is_file());
    assert!(tempdir
        .path()
        .join("Comparative_Genomics_Statistics/Statistics_PerSpecies.tsv")
        .is_file());
    assert!(!tempdir.path().join("WorkingDirectory").exists());

    Ok(())
}

#[test]
fn command_cluster_keep_graph() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;

    let mut cmd = Command::cargo_bin("orthotree")?;
    cmd.arg("cluster")
        .arg("tests/orthofinder")
        .arg("--graph")
        .arg("--order")
        .arg("insertion")
        .arg("-o")
        .arg(tempdir.path())
        .assert()
        .success();

    let graph = std::fs::read_to_string(tempdir.path().join("WorkingDirectory/graph.txt"))?;
    assert!(graph.contains("dimensions 12x12"));
    assert!(!tempdir.path().join("WorkingDirectory/graph.txt_0").exists());

    // every gene lands in exactly one orthogroup
    let ids = std::fs::read_to_string(tempdir.path().join("Orthogroups/Orthogroups_SequenceIDs.txt"))?;
    let mut genes: Vec<&str> = ids
        .lines()
        .flat_map(|l| l.split_once(": ").map(|(_, g)| g).unwrap_or("").split(' '))
        .collect();
    genes.sort_unstable();
    let n = genes.len();
    genes.dedup();
    assert_eq!(n, 12);
    assert_eq!(genes.len(), 12);

    Ok(())
}
