use super::*;

fn leaf(tree: &Tree, name: &str) -> NodeId {
    tree.get_node_by_name(name).unwrap()
}

#[test]
fn test_traversals() {
    //      0
    //     / \
    //    1   4
    //   / \   \
    //  2   3   5
    let tree = Tree::from_newick("((A,B),(C));").unwrap();
    let root = tree.get_root().unwrap();
    assert_eq!(tree.preorder(root), vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(tree.postorder(root), vec![2, 3, 1, 5, 4, 0]);
}

#[test]
fn test_mrca() {
    let tree = Tree::from_newick("(((A,B)x,C)y,(D,E)z)r;").unwrap();
    let (a, b, c, d) = (
        leaf(&tree, "A"),
        leaf(&tree, "B"),
        leaf(&tree, "C"),
        leaf(&tree, "D"),
    );

    assert_eq!(tree.mrca(&[a, b]).unwrap(), leaf(&tree, "x"));
    assert_eq!(tree.mrca(&[a, b, c]).unwrap(), leaf(&tree, "y"));
    assert_eq!(tree.mrca(&[a, d]).unwrap(), leaf(&tree, "r"));
    assert_eq!(tree.mrca(&[c]).unwrap(), c);
    assert!(tree.mrca(&[]).is_err());
}

#[test]
fn test_root_on_edge_unrooted() {
    // trifurcating root
    let mut tree = Tree::from_newick("(A:1,B:1,(C:1,D:1):2);").unwrap();
    let c = leaf(&tree, "C");
    let cd = tree.get_node(c).unwrap().parent.unwrap();

    tree.root_on_edge(cd).unwrap();
    assert!(tree.is_rooted());
    assert_eq!(tree.to_newick(), "((C:1,D:1):1,(A:1,B:1):1);");
}

#[test]
fn test_root_on_edge_rooted() {
    let mut tree = Tree::from_newick("((A,B),(C,D));").unwrap();
    let a = leaf(&tree, "A");
    tree.root_on_edge(a).unwrap();
    assert!(tree.is_rooted());
    assert_eq!(tree.to_newick(), "(A,(B,(C,D)));");

    // already rooted on this edge
    let mut tree = Tree::from_newick("((A,B),(C,D));").unwrap();
    let root = tree.get_root().unwrap();
    let ab = tree.get_node(root).unwrap().children[0];
    assert_eq!(tree.root_on_edge(ab).unwrap(), root);
    assert_eq!(tree.to_newick(), "((A,B),(C,D));");
}

#[test]
fn test_deroot() {
    let mut tree = Tree::from_newick("((A,B),(C,(D,E)));").unwrap();
    tree.deroot().unwrap();
    assert!(!tree.is_rooted());
    assert_eq!(tree.to_newick(), "((A,B),C,(D,E));");

    let mut pair = Tree::from_newick("(A,B);").unwrap();
    assert!(pair.deroot().is_err());
}

#[test]
fn test_prune_to() {
    let mut tree = Tree::from_newick("(((A:1,B:1):1,C:1):1,(D:1,E:1):1);").unwrap();
    tree.prune_to(|n| matches!(n.name.as_deref(), Some("A") | Some("D") | Some("E")))
        .unwrap();
    assert_eq!(tree.to_newick(), "(A:3,(D:1,E:1):1);");

    let mut tree = Tree::from_newick("((A,B),(C,D));").unwrap();
    tree.prune_to(|n| matches!(n.name.as_deref(), Some("C") | Some("D")))
        .unwrap();
    assert_eq!(tree.to_newick(), "(C,D);");

    let mut tree = Tree::from_newick("(A,B);").unwrap();
    assert!(tree.prune_to(|_| false).is_err());
}

#[test]
fn test_label_internal_preorder() {
    let mut tree = Tree::from_newick("((A,B),((C,D),E));").unwrap();
    tree.label_internal("N").unwrap();
    assert_eq!(tree.to_newick(), "((A,B)N1,((C,D)N3,E)N2)N0;");
}

#[test]
fn test_compact_after_rooting() {
    let mut tree = Tree::from_newick("((A,B),(C,D));").unwrap();
    let c = leaf(&tree, "C");
    tree.root_on_edge(c).unwrap();
    let before = tree.to_newick();

    tree.compact();
    assert_eq!(tree.capacity(), tree.len());
    assert_eq!(tree.to_newick(), before);
    assert!(tree.get_leaves().iter().all(|&l| tree.get_node(l).is_some()));
}

#[test]
fn test_extract_subtree() {
    let tree = Tree::from_newick("((A:1,B:2)x:3,C:4)r;").unwrap();
    let sub = tree.extract_subtree(leaf(&tree, "x")).unwrap();
    assert_eq!(sub.to_newick(), "(A:1,B:2)x;");
}

#[test]
fn test_clade_bitsets_and_splits() {
    let tree = Tree::from_newick("((0,1),2,(3,4));").unwrap();
    let clades =
        split::clade_bitsets(&tree, 5, |name| name.parse::<usize>().ok()).unwrap();
    let root = tree.get_root().unwrap();
    assert_eq!(clades[root].count_ones(..), 5);

    let splits = split::edge_splits(&tree, &clades);
    // five leaf edges and two internal edges
    assert_eq!(splits.len(), 7);
    let first: Vec<usize> = splits[0].1.ones().collect();
    assert_eq!(first, vec![0, 1]);

    let rest: Vec<usize> = split::complement(&splits[0].1, 5).ones().collect();
    assert_eq!(rest, vec![2, 3, 4]);

    assert!(split::clade_bitsets(&tree, 4, |name| name.parse::<usize>().ok()).is_err());
}
