//! Text rendering of allocation trees.

use termtree::Tree;

use crate::domain::allocator::LandAllocator;
use crate::domain::item::AllocationItem;

/// Conversion into a `termtree` for display.
pub trait TreeRender {
    fn to_tree_string(&self, period: Option<usize>) -> Tree<String>;
}

fn label(item: &dyn AllocationItem, period: Option<usize>) -> String {
    let mut text = format!("{} [{}", item.name(), item.kind());
    if let Some(sigma) = item.sigma() {
        text.push_str(&format!(" sigma={sigma}"));
    }
    text.push(']');
    if let Some(p) = period {
        text.push_str(&format!(
            " land={:.3} share={:.4}",
            item.land_allocation(p),
            item.share(p)
        ));
    }
    text
}

impl TreeRender for dyn AllocationItem {
    fn to_tree_string(&self, period: Option<usize>) -> Tree<String> {
        let leaves: Vec<_> = self
            .children()
            .iter()
            .map(|child| child.to_tree_string(period))
            .collect();
        Tree::new(label(self, period)).with_leaves(leaves)
    }
}

impl TreeRender for LandAllocator {
    fn to_tree_string(&self, period: Option<usize>) -> Tree<String> {
        let root: &(dyn AllocationItem + 'static) = self.root();
        let mut tree = root.to_tree_string(period);
        tree.root = format!("{} :: {}", self.region(), tree.root);
        tree
    }
}
