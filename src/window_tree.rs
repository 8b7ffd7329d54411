use serde::Deserialize;

use crate::wm_ipc::WindowId;

/// One node of the GET_TREE snapshot.
///
/// Only the fields needed to locate the focused window are decoded; the rest
/// of the (large) tree payload is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WindowNode {
    pub id: WindowId,
    #[serde(default)]
    pub focused: bool,
    #[serde(default)]
    pub nodes: Vec<WindowNode>,
    #[serde(default)]
    pub floating_nodes: Vec<WindowNode>,
}

impl WindowNode {
    fn children(&self) -> impl Iterator<Item = &WindowNode> {
        self.nodes.iter().chain(self.floating_nodes.iter())
    }
}

/// Find the focused node in a tree snapshot.
///
/// Uses an explicit stack over borrowed nodes so every subtree, tiled and
/// floating, is visited and the returned reference points into `root`.
#[must_use]
pub fn find_focused(root: &WindowNode) -> Option<&WindowNode> {
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        if node.focused {
            return Some(node);
        }
        // Reverse so children are visited in document order
        let start = stack.len();
        stack.extend(node.children());
        stack[start..].reverse();
    }

    None
}
