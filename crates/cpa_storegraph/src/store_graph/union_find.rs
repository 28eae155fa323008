use id_collections::{Id, IdVec};

/// A node that can be redirected to a representative once it is found to alias another node.
/// Stored references are never invalidated by a merge, only forwarded, so holders always resolve
/// through `find` before trusting a node's contents.
pub trait Mergable<I> {
    fn forward(&self) -> Option<I>;

    fn forward_mut(&mut self) -> &mut Option<I>;
}

/// Resolves `id` to its representative, compressing the path so that every node visited points
/// straight at the representative afterwards.
pub fn find<I: Id + Copy + Eq, N: Mergable<I>>(nodes: &mut IdVec<I, N>, id: I) -> I {
    let mut root = id;
    while let Some(next) = nodes[root].forward() {
        root = next;
    }

    let mut current = id;
    while let Some(next) = nodes[current].forward() {
        if next != root {
            *nodes[current].forward_mut() = Some(root);
        }
        current = next;
    }

    root
}

pub fn find_readonly<I: Id + Copy + Eq, N: Mergable<I>>(nodes: &IdVec<I, N>, id: I) -> I {
    let mut root = id;
    while let Some(next) = nodes[root].forward() {
        root = next;
    }
    root
}

/// Points the representative `loser` at the representative `survivor`.
pub fn set_forward<I: Id + Copy + Eq, N: Mergable<I>>(
    nodes: &mut IdVec<I, N>,
    loser: I,
    survivor: I,
) {
    assert!(nodes[loser].forward().is_none());
    assert!(nodes[survivor].forward().is_none());
    assert!(loser != survivor);
    *nodes[loser].forward_mut() = Some(survivor);
}
