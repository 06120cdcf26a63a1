//! Document outline (headings or bookmarks).

use serde::{Deserialize, Serialize};

/// One flat outline entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineNode {
    /// Nesting level (1 = top level)
    pub level: u32,
    /// Entry title
    pub title: String,
}

impl OutlineNode {
    /// Create a new outline node. Levels below 1 are clamped to 1.
    pub fn new(level: u32, title: impl Into<String>) -> Self {
        Self {
            level: level.max(1),
            title: title.into(),
        }
    }
}

/// Where an extraction's outline came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutlineSource {
    /// Derived from heading blocks; recoverable from the Markdown headings.
    #[default]
    Headings,
    /// Supplied by the source format (PDF bookmarks).
    Bookmarks,
}

/// A node of the materialized outline tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineItem {
    /// Item title
    pub title: String,

    /// Level as given by the flat outline
    pub level: u32,

    /// Child items
    pub children: Vec<OutlineItem>,
}

impl OutlineItem {
    /// Create a new outline item.
    pub fn new(title: impl Into<String>, level: u32) -> Self {
        Self {
            title: title.into(),
            level,
            children: Vec::new(),
        }
    }
}

/// Hierarchical view over a flat outline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineTree {
    /// Top-level items
    pub roots: Vec<OutlineItem>,
}

impl OutlineTree {
    /// Build the tree from a flat outline.
    ///
    /// A node becomes a child of the nearest preceding open node whose level
    /// is strictly lower, so `[1, 4]` nests the level-4 node under the
    /// level-1 node. Nodes without such a predecessor are roots.
    pub fn build(nodes: &[OutlineNode]) -> Self {
        // Path from the current root down to the most recent node, as
        // (level, index into parent's children / roots).
        let mut roots: Vec<OutlineItem> = Vec::new();
        let mut stack: Vec<(u32, usize)> = Vec::new();

        for node in nodes {
            while stack.last().is_some_and(|(level, _)| *level >= node.level) {
                stack.pop();
            }

            let item = OutlineItem::new(node.title.clone(), node.level);
            let siblings = Self::children_at(&mut roots, &stack);
            siblings.push(item);
            let index = siblings.len() - 1;
            stack.push((node.level, index));
        }

        Self { roots }
    }

    fn children_at<'a>(
        roots: &'a mut Vec<OutlineItem>,
        path: &[(u32, usize)],
    ) -> &'a mut Vec<OutlineItem> {
        let mut current = roots;
        for (_, index) in path {
            current = &mut current[*index].children;
        }
        current
    }

    /// Check if the tree is empty.
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Get the total number of items (including nested).
    pub fn total_items(&self) -> usize {
        fn count_items(items: &[OutlineItem]) -> usize {
            items
                .iter()
                .map(|item| 1 + count_items(&item.children))
                .sum()
        }
        count_items(&self.roots)
    }

    /// Flatten back into (depth, title) pairs in document order.
    /// Depth is the tree depth starting at 1, not the source level.
    pub fn flatten(&self) -> Vec<(usize, &str)> {
        fn walk<'a>(items: &'a [OutlineItem], depth: usize, out: &mut Vec<(usize, &'a str)>) {
            for item in items {
                out.push((depth, item.title.as_str()));
                walk(&item.children, depth + 1, out);
            }
        }
        let mut out = Vec::new();
        walk(&self.roots, 1, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes(levels: &[u32]) -> Vec<OutlineNode> {
        levels
            .iter()
            .enumerate()
            .map(|(i, l)| OutlineNode::new(*l, format!("n{}", i)))
            .collect()
    }

    #[test]
    fn test_outline_nesting() {
        let tree = OutlineTree::build(&nodes(&[1, 2, 2, 3, 1]));

        assert_eq!(tree.roots.len(), 2);
        let first = &tree.roots[0];
        assert_eq!(first.children.len(), 2);
        assert!(first.children[0].children.is_empty());
        assert_eq!(first.children[1].children.len(), 1);
        assert_eq!(first.children[1].children[0].title, "n3");
        assert!(tree.roots[1].children.is_empty());
        assert_eq!(tree.total_items(), 5);
    }

    #[test]
    fn test_level_skip_attaches_to_nearest_lower() {
        let tree = OutlineTree::build(&nodes(&[1, 4, 2]));
        assert_eq!(tree.roots.len(), 1);
        let root = &tree.roots[0];
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].level, 4);
        assert_eq!(root.children[1].level, 2);
    }

    #[test]
    fn test_orphan_becomes_root() {
        let tree = OutlineTree::build(&nodes(&[3, 1, 2]));
        assert_eq!(tree.roots.len(), 2);
        assert_eq!(tree.roots[0].level, 3);
        assert_eq!(tree.roots[1].children.len(), 1);
    }

    #[test]
    fn test_closed_branch_is_not_reused() {
        // The level-2 node under the first root must not adopt the level-3 node
        // that follows the second root.
        let tree = OutlineTree::build(&nodes(&[1, 2, 1, 3]));
        assert_eq!(tree.roots.len(), 2);
        assert_eq!(tree.roots[0].children[0].children.len(), 0);
        assert_eq!(tree.roots[1].children.len(), 1);
        assert_eq!(tree.roots[1].children[0].title, "n3");
    }

    #[test]
    fn test_flatten() {
        let tree = OutlineTree::build(&nodes(&[1, 2, 1]));
        assert_eq!(tree.flatten(), vec![(1, "n0"), (2, "n1"), (1, "n2")]);
    }

    #[test]
    fn test_level_clamped() {
        assert_eq!(OutlineNode::new(0, "x").level, 1);
    }
}
