use dom::Document;
use indextree::NodeId;

/// Pair every node of `source_root`'s subtree with the node at the same
/// position in `mirror_root`'s subtree, root pair first, in document order.
///
/// `mirror_root` must be a structural copy of `source_root`. Where the two
/// trees disagree, each level is paired up to the shorter child list.
pub fn zip_subtrees(
    source: &Document,
    source_root: NodeId,
    mirror: &Document,
    mirror_root: NodeId,
) -> Vec<(NodeId, NodeId)> {
    let mut pairs = Vec::new();
    let mut stack = vec![(source_root, mirror_root)];
    while let Some((source_node, mirror_node)) = stack.pop() {
        pairs.push((source_node, mirror_node));
        let source_children: Vec<NodeId> = source.children(source_node).collect();
        let mirror_children: Vec<NodeId> = mirror.children(mirror_node).collect();
        stack.extend(source_children.into_iter().zip(mirror_children).rev());
    }
    pairs
}
