use crate::prop::{Property, PropertyError};
use alloc::{boxed::Box, collections::btree_map::BTreeMap, string::String, vec::Vec};

/// An owned, parsed device tree.
///
/// Nodes live in [DeviceTree::container] and are identified by their index, assigned in
/// document order. The root always has id 0 and is its own parent.
#[derive(Debug)]
pub struct DeviceTree {
    pub root_id: usize,
    pub container: Vec<Node>,
    pub phandle_map: BTreeMap<u32, usize>,
}

#[derive(Debug)]
pub struct Node {
    pub node_id: usize,
    pub parent_id: usize,
    pub full_name: Box<str>,
    pub node_name: Box<str>,
    pub unit_addr: Box<str>,
    pub children: Vec<usize>,
    pub props: Vec<Property>,
    pub node_type: NodeType,
}

/// Whether a node describes hardware or only carries information for software
/// (`/aliases`, `/chosen`, `/memory`, `/reserved-memory`).
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum NodeType {
    Device,
    Description,
}

impl DeviceTree {
    pub fn root(&self) -> &Node {
        &self.container[self.root_id]
    }
    pub fn get(&self, node_id: usize) -> Option<&Node> {
        self.container.get(node_id)
    }
    pub fn is_root(&self, node: &Node) -> bool {
        node.parent_id == node.node_id
    }
    fn full_path(&self, node: &Node) -> String {
        if self.is_root(node) {
            String::new()
        } else {
            self.full_path(&self.container[node.parent_id]) + "/" + node.full_name.as_ref()
        }
    }
    pub fn get_full_path(&self, node: &Node) -> Box<str> {
        if self.is_root(node) {
            return Box::from("/");
        }
        self.full_path(node).into_boxed_str()
    }
    pub fn get_parent(&self, node: &Node) -> Option<&Node> {
        if self.is_root(node) {
            None
        } else {
            Some(&self.container[node.parent_id])
        }
    }
    pub fn get_children<'b>(&'b self, node: &Node) -> impl Iterator<Item = &'b Node> {
        node.children.iter().map(|x| &self.container[*x])
    }
    pub fn get_property<'b>(&self, node: &'b Node, name: impl AsRef<str>) -> Option<&'b Property> {
        let name = name.as_ref();
        node.props.iter().find(|prop| prop.name.as_ref().eq(name))
    }
    /// Resolve an absolute path. A path section without a unit address also matches a node
    /// whose name carries one, e.g. `/ahb/apb/lpc` finds `/ahb/apb/lpc@1e789000`.
    pub fn get_node(&self, path: impl AsRef<str>) -> Option<&Node> {
        let path_str = path.as_ref();
        let mut node = self.root();
        for section in path_str.split('/') {
            if section.trim().is_empty() {
                continue;
            }
            let found = self.get_children(node).find(|subnode| {
                subnode.full_name.as_ref().eq(section)
                    || (!section.contains('@') && subnode.node_name.as_ref().eq(section))
            });
            node = found?;
        }
        Some(node)
    }
    /// Look up `name` in `/aliases`.
    pub fn get_alias(&self, name: &str) -> Result<Option<&str>, PropertyError> {
        let Some(aliases) = self.get_node("/aliases") else {
            return Ok(None);
        };
        match self.get_property(aliases, name) {
            Some(prop) => prop.value_as_str().map(Some),
            None => Ok(None),
        }
    }
    pub fn get_node_by_phandle(&self, phandle: u32) -> Option<&Node> {
        self.phandle_map
            .get(&phandle)
            .and_then(|id| self.container.get(*id))
    }
    /// Check `compat` against the node's `compatible` list.
    ///
    /// A node without a `compatible` property is simply not compatible.
    pub fn check_compatible(&self, node: &Node, compat: &str) -> Result<bool, PropertyError> {
        match self.get_property(node, "compatible") {
            Some(prop) => Ok(prop.stringlist_search(compat)?.is_some()),
            None => Ok(false),
        }
    }
    /// First node after `after` (or from the root, inclusive, if `None`) in document order
    /// that is compatible with `compat`.
    pub fn find_compatible(
        &self,
        after: Option<usize>,
        compat: &str,
    ) -> Result<Option<&Node>, PropertyError> {
        let start = after.map_or(0, |x| x + 1);
        for node in self.container.iter().skip(start) {
            if self.check_compatible(node, compat)? {
                return Ok(Some(node));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use crate::fdt::writer::{FdtWriter, NodeBuilder};
    use crate::parse;

    fn sample() -> alloc::vec::Vec<u8> {
        let root = NodeBuilder::new("")
            .prop_strlist("compatible", &["aspeed,ast2500"])
            .child(
                NodeBuilder::new("aliases")
                    .prop_str("lpc", "/ahb/apb/lpc@1e789000")
                    .prop_cells("broken", &[1]),
            )
            .child(
                NodeBuilder::new("ahb").prop_strlist("compatible", &["simple-bus"]).child(
                    NodeBuilder::new("apb")
                        .prop_strlist("compatible", &["simple-bus"])
                        .child(
                            NodeBuilder::new("lpc@1e789000")
                                .prop_strlist("compatible", &["aspeed,ast2500-lpc-v2", "simple-mfd"])
                                .prop_u32("phandle", 3),
                        )
                        .child(NodeBuilder::new("lpc@1e78a000").prop_cells("reg", &[0x1e78a000, 0x100])),
                ),
            );
        FdtWriter::write(&root)
    }

    #[test]
    fn paths_render_and_resolve() {
        let tree = parse(&sample()).unwrap();
        let lpc = tree.get_node("/ahb/apb/lpc@1e789000").unwrap();
        assert_eq!(&*tree.get_full_path(lpc), "/ahb/apb/lpc@1e789000");
        assert_eq!(&*tree.get_full_path(tree.root()), "/");
        assert_eq!(tree.get_node("/ahb/apb/lpc").unwrap().node_id, lpc.node_id);
        assert_eq!(tree.get_node("/").unwrap().node_id, tree.root_id);
        assert!(tree.get_node("/ahb/nothing").is_none());
        assert_eq!(tree.get_parent(lpc).unwrap().full_name.as_ref(), "apb");
        assert!(tree.get_parent(tree.root()).is_none());
    }

    #[test]
    fn aliases_and_phandles() {
        let tree = parse(&sample()).unwrap();
        assert_eq!(tree.get_alias("lpc").unwrap(), Some("/ahb/apb/lpc@1e789000"));
        assert_eq!(tree.get_alias("uart1").unwrap(), None);
        assert!(tree.get_alias("broken").is_err());
        let by_phandle = tree.get_node_by_phandle(3).unwrap();
        assert_eq!(by_phandle.full_name.as_ref(), "lpc@1e789000");
        assert!(tree.get_node_by_phandle(4).is_none());
    }

    #[test]
    fn compatible_search_follows_document_order() {
        let tree = parse(&sample()).unwrap();
        let bus = tree.find_compatible(None, "simple-bus").unwrap().unwrap();
        assert_eq!(bus.full_name.as_ref(), "ahb");
        let next = tree.find_compatible(Some(bus.node_id), "simple-bus").unwrap().unwrap();
        assert_eq!(next.full_name.as_ref(), "apb");
        assert!(tree.find_compatible(Some(next.node_id), "simple-bus").unwrap().is_none());
        let root = tree.find_compatible(None, "aspeed,ast2500").unwrap().unwrap();
        assert_eq!(root.node_id, tree.root_id);
    }

    #[test]
    fn nodes_without_compatible_never_match() {
        let tree = parse(&sample()).unwrap();
        let plain = tree.get_node("/ahb/apb/lpc@1e78a000").unwrap();
        assert!(!tree.check_compatible(plain, "simple-mfd").unwrap());
    }
}
