//! Document outline (bookmarks) as an arena of linked nodes.
//!
//! Nodes live in one vector and refer to each other through [`OutlineId`]
//! handles, mirroring the `Parent/First/Last/Prev/Next/Count` shape of a PDF
//! outline dictionary. Node 0 is the root; it has no title and no target.

pub mod transform;

pub use transform::{OutlineOptions, OutlineTransformer, PageRefPolicy};

use serde::{Deserialize, Serialize};
use std::ops::Index;

/// Handle of a node inside an [`Outline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutlineId(usize);

impl OutlineId {
    /// Position of the node in the arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A single outline node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlineNode {
    /// Entry title
    pub title: String,

    /// Zero-based target page; `None` only for the root
    pub target_page: Option<u32>,

    pub parent: Option<OutlineId>,
    pub first_child: Option<OutlineId>,
    pub last_child: Option<OutlineId>,
    pub prev_sibling: Option<OutlineId>,
    pub next_sibling: Option<OutlineId>,

    /// Number of children appended so far
    pub child_count: u32,
}

impl OutlineNode {
    fn new(title: String, target_page: Option<u32>, parent: Option<OutlineId>) -> Self {
        Self {
            title,
            target_page,
            parent,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            child_count: 0,
        }
    }
}

/// Outline tree built incrementally by appending children.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outline {
    nodes: Vec<OutlineNode>,
}

impl Outline {
    /// Create an outline holding only the root.
    pub fn new() -> Self {
        Self {
            nodes: vec![OutlineNode::new(String::new(), None, None)],
        }
    }

    /// Handle of the root node.
    pub fn root(&self) -> OutlineId {
        OutlineId(0)
    }

    /// Get a node by handle.
    pub fn get(&self, id: OutlineId) -> Option<&OutlineNode> {
        self.nodes.get(id.0)
    }

    /// Append a new last child under `parent` and return its handle.
    ///
    /// # Panics
    /// Panics if `parent` does not belong to this outline.
    pub fn append(&mut self, parent: OutlineId, title: impl Into<String>, page: u32) -> OutlineId {
        let id = OutlineId(self.nodes.len());
        let mut node = OutlineNode::new(title.into(), Some(page), Some(parent));

        let previous = self.nodes[parent.0].last_child;
        match previous {
            Some(last) => {
                node.prev_sibling = Some(last);
                self.nodes[last.0].next_sibling = Some(id);
            }
            None => self.nodes[parent.0].first_child = Some(id),
        }
        self.nodes.push(node);

        let parent_node = &mut self.nodes[parent.0];
        parent_node.last_child = Some(id);
        parent_node.child_count += 1;
        id
    }

    /// Iterate over the children of `id` in order.
    pub fn children(&self, id: OutlineId) -> Children<'_> {
        Children {
            outline: self,
            next: self.get(id).and_then(|node| node.first_child),
        }
    }

    /// Check if the outline has no entries besides the root.
    pub fn is_empty(&self) -> bool {
        self.nodes[0].child_count == 0
    }

    /// Number of entries, the root excluded.
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    /// Iterate over all entries (root excluded) in creation order.
    ///
    /// A parent always comes before its children.
    pub fn entries(&self) -> impl Iterator<Item = (OutlineId, &OutlineNode)> {
        self.nodes
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, node)| (OutlineId(i), node))
    }

    /// Rebuild the outline with every target passed through `map`.
    ///
    /// Entries mapped to `None` are dropped together with their children,
    /// like entries whose page could not be resolved in the first place.
    pub fn remap_pages<F>(&self, mut map: F) -> Outline
    where
        F: FnMut(u32) -> Option<u32>,
    {
        let mut remapped = Outline::new();
        let mut stack = vec![(self.root(), remapped.root())];
        while let Some((source, target)) = stack.pop() {
            for (child, node) in self.children(source) {
                let Some(page) = node.target_page.and_then(&mut map) else {
                    continue;
                };
                let id = remapped.append(target, node.title.clone(), page);
                stack.push((child, id));
            }
        }
        remapped
    }

    /// Convert to a nested item tree for JSON output and display.
    pub fn to_items(&self) -> Vec<OutlineItem> {
        self.items_under(self.root(), 0)
    }

    fn items_under(&self, id: OutlineId, level: u8) -> Vec<OutlineItem> {
        self.children(id)
            .map(|(child, node)| OutlineItem {
                title: node.title.clone(),
                page: node.target_page.map(|p| p + 1),
                level,
                children: self.items_under(child, level.saturating_add(1)),
            })
            .collect()
    }
}

impl Default for Outline {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<OutlineId> for Outline {
    type Output = OutlineNode;

    fn index(&self, id: OutlineId) -> &OutlineNode {
        &self.nodes[id.0]
    }
}

/// Iterator over siblings following `next_sibling` links.
pub struct Children<'a> {
    outline: &'a Outline,
    next: Option<OutlineId>,
}

impl<'a> Iterator for Children<'a> {
    type Item = (OutlineId, &'a OutlineNode);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        let node = self.outline.get(id)?;
        self.next = node.next_sibling;
        Some((id, node))
    }
}

/// A single outline item (bookmark) in nested form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineItem {
    /// Item title
    pub title: String,

    /// Target page number (1-indexed)
    pub page: Option<u32>,

    /// Nesting level (0 = top level)
    pub level: u8,

    /// Child items
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<OutlineItem>,
}

impl OutlineItem {
    /// Get the total number of items in this subtree, itself included.
    pub fn total_items(&self) -> usize {
        1 + self.children.iter().map(OutlineItem::total_items).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_len(outline: &Outline, id: OutlineId) -> u32 {
        outline.children(id).count() as u32
    }

    #[test]
    fn test_new_outline_is_empty() {
        let outline = Outline::new();
        let root = &outline[outline.root()];

        assert!(outline.is_empty());
        assert_eq!(outline.len(), 0);
        assert_eq!(root.child_count, 0);
        assert!(root.first_child.is_none());
        assert!(root.last_child.is_none());
        assert!(root.target_page.is_none());
    }

    #[test]
    fn test_append_links_siblings() {
        let mut outline = Outline::new();
        let root = outline.root();
        let a = outline.append(root, "A", 0);
        let b = outline.append(root, "B", 1);
        let c = outline.append(root, "C", 2);

        assert_eq!(outline[root].first_child, Some(a));
        assert_eq!(outline[root].last_child, Some(c));
        assert_eq!(outline[root].child_count, 3);
        assert_eq!(chain_len(&outline, root), 3);

        assert_eq!(outline[a].prev_sibling, None);
        assert_eq!(outline[a].next_sibling, Some(b));
        assert_eq!(outline[b].prev_sibling, Some(a));
        assert_eq!(outline[b].next_sibling, Some(c));
        assert_eq!(outline[c].next_sibling, None);
        assert_eq!(outline[c].parent, Some(root));
    }

    #[test]
    fn test_nested_append() {
        let mut outline = Outline::new();
        let root = outline.root();
        let chapter = outline.append(root, "Chapter", 4);
        let section = outline.append(chapter, "Section", 5);

        assert_eq!(outline[chapter].child_count, 1);
        assert_eq!(outline[section].parent, Some(chapter));
        assert_eq!(outline.len(), 2);

        let titles: Vec<_> = outline.entries().map(|(_, n)| n.title.as_str()).collect();
        assert_eq!(titles, vec!["Chapter", "Section"]);
    }

    #[test]
    fn test_to_items() {
        let mut outline = Outline::new();
        let root = outline.root();
        let chapter = outline.append(root, "Chapter 1", 0);
        outline.append(chapter, "Section 1.1", 1);
        outline.append(chapter, "Section 1.2", 4);
        outline.append(root, "Chapter 2", 9);

        let items = outline.to_items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].page, Some(1));
        assert_eq!(items[0].children[1].page, Some(5));
        assert_eq!(items[0].children[1].level, 1);
        assert_eq!(items.iter().map(OutlineItem::total_items).sum::<usize>(), 4);
    }

    #[test]
    fn test_remap_pages_drops_unmapped_subtrees() {
        let mut outline = Outline::new();
        let root = outline.root();
        let front = outline.append(root, "Front", 0);
        outline.append(front, "Cover", 0);
        let body = outline.append(root, "Body", 4);
        outline.append(body, "Part 1", 5);
        outline.append(body, "Part 2", 7);

        let remapped = outline.remap_pages(|page| page.checked_sub(4));
        let items = remapped.to_items();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Body");
        assert_eq!(items[0].page, Some(1));
        let children: Vec<_> = items[0].children.iter().map(|i| (i.title.as_str(), i.page)).collect();
        assert_eq!(children, vec![("Part 1", Some(2)), ("Part 2", Some(4))]);
        assert_eq!(remapped[remapped.root()].child_count, 1);
    }
}
