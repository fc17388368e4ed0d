/// Uniform access to the children of a recursive structure.
pub trait Tree: Sized {
    fn children(&self) -> &[Self];

    fn children_mut(&mut self) -> &mut [Self];

    /// Number of nodes in the tree.
    fn size(&self) -> usize {
        1 + self.children().iter().map(Tree::size).sum::<usize>()
    }

    /// Length of the longest path from the root to a leaf, counted in nodes.
    fn depth(&self) -> usize {
        1 + self.children().iter().map(Tree::depth).max().unwrap_or(0)
    }

    /// Visits every node, parents before their children.
    fn preorder<'a>(&'a self, f: &mut impl FnMut(&'a Self)) {
        f(self);
        for child in self.children() {
            child.preorder(f);
        }
    }

    fn preorder_mut(&mut self, f: &mut impl FnMut(&mut Self)) {
        f(self);
        for child in self.children_mut() {
            child.preorder_mut(f);
        }
    }
}
