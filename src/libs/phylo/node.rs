use std::collections::BTreeMap;

/// NodeId is an index into the Tree's node vector.
pub type NodeId = usize;

#[derive(Debug, Clone)]
pub struct Node {
    /// Index in the arena
    pub id: NodeId,

    /// Parent node ID (None for root)
    pub parent: Option<NodeId>,

    /// Child node IDs, in input order
    pub children: Vec<NodeId>,

    /// Leaf: gene or species label. Internal: clade label (`n3`, `N1`) or a support value.
    pub name: Option<String>,

    /// Branch length to parent
    pub length: Option<f64>,

    /// NHX properties, e.g. `[&&NHX:D=Y]`
    pub properties: Option<BTreeMap<String, String>>,

    /// Soft deletion flag. `Tree::compact()` reclaims deleted slots.
    pub deleted: bool,
}

impl Node {
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            parent: None,
            children: Vec::new(),
            name: None,
            length: None,
            properties: None,
            deleted: false,
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Internal labels that parse as numbers are branch supports.
    pub fn support(&self) -> Option<f64> {
        if self.is_leaf() {
            return None;
        }
        self.name.as_deref().and_then(|s| s.parse::<f64>().ok())
    }
}
