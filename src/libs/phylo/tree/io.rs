use super::Tree;
use crate::libs::phylo::node::NodeId;

enum Step {
    Open(NodeId),
    Close(NodeId),
    Comma,
}

/// Compact Newick of the whole tree
pub fn to_newick(tree: &Tree) -> String {
    match tree.get_root() {
        Some(root) => to_newick_subtree(tree, root),
        None => ";".to_string(),
    }
}

/// Compact Newick of the clade below `root`. The clade's own edge length is kept.
pub fn to_newick_subtree(tree: &Tree, root: NodeId) -> String {
    let mut out = String::new();
    let mut stack = vec![Step::Open(root)];

    while let Some(step) = stack.pop() {
        match step {
            Step::Open(id) => {
                let Some(node) = tree.get_node(id) else {
                    continue;
                };
                if node.is_leaf() {
                    push_info(tree, id, &mut out);
                } else {
                    out.push('(');
                    stack.push(Step::Close(id));
                    for (i, &child) in node.children.iter().enumerate().rev() {
                        stack.push(Step::Open(child));
                        if i > 0 {
                            stack.push(Step::Comma);
                        }
                    }
                }
            }
            Step::Close(id) => {
                out.push(')');
                push_info(tree, id, &mut out);
            }
            Step::Comma => out.push(','),
        }
    }

    out.push(';');
    out
}

fn push_info(tree: &Tree, id: NodeId, out: &mut String) {
    let node = &tree.nodes[id];
    if let Some(name) = &node.name {
        out.push_str(&quote_label(name));
    }
    if let Some(len) = node.length {
        out.push_str(&format!(":{}", len));
    }
    if let Some(props) = node.properties.as_ref().filter(|p| !p.is_empty()) {
        out.push_str("[&&NHX");
        for (k, v) in props {
            out.push_str(&format!(":{}={}", k, v));
        }
        out.push(']');
    }
}

pub fn quote_label(label: &str) -> String {
    if label.chars().any(|c| "(),:;[] \t\n'".contains(c)) {
        format!("'{}'", label.replace('\'', "''"))
    } else {
        label.to_string()
    }
}
