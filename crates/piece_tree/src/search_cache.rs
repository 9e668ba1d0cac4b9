use crate::rb_tree::{NodeId, RbTree};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CacheEntry {
    pub(crate) node: NodeId,
    pub(crate) node_start_offset: usize,
    /// 1-based line the node starts on, when the lookup that produced the
    /// entry knew it.
    pub(crate) node_start_line: Option<usize>,
}

/// Most-recently-resolved nodes, consulted before walking the tree.
///
/// Entries hold arena ids; a deleted node is dropped through
/// [`SearchCache::forget`] before its slot can be handed out again.
#[derive(Debug, Clone)]
pub(crate) struct SearchCache {
    limit: usize,
    entries: Vec<CacheEntry>,
}

impl SearchCache {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            entries: Vec::with_capacity(limit.max(1)),
        }
    }

    /// Entry whose node covers `offset`, including its end boundary.
    pub(crate) fn get(&self, offset: usize, tree: &RbTree) -> Option<CacheEntry> {
        self.entries.iter().rev().copied().find(|entry| {
            entry.node_start_offset <= offset
                && entry.node_start_offset + tree.piece(entry.node).length >= offset
        })
    }

    /// Entry whose node contains the start of `line_number` strictly after its
    /// first line.
    pub(crate) fn get_by_line(&self, line_number: usize, tree: &RbTree) -> Option<CacheEntry> {
        self.entries.iter().rev().copied().find(|entry| {
            entry.node_start_line.is_some_and(|start| {
                start < line_number && start + tree.piece(entry.node).line_feed_cnt >= line_number
            })
        })
    }

    pub(crate) fn set(&mut self, entry: CacheEntry) {
        if self.entries.len() >= self.limit {
            self.entries.remove(0);
        }
        self.entries.push(entry);
    }

    /// Drop every entry starting at or after `offset`, and any whose node has
    /// left the tree.
    pub(crate) fn validate(&mut self, offset: usize, tree: &RbTree) {
        self.entries
            .retain(|entry| tree.is_attached(entry.node) && entry.node_start_offset < offset);
    }

    pub(crate) fn forget(&mut self, node: NodeId) {
        self.entries.retain(|entry| entry.node != node);
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::{BufferCursor, Piece};
    use crate::rb_tree::SENTINEL;

    fn tree_with(lengths: &[(usize, usize)]) -> (RbTree, Vec<NodeId>) {
        let mut tree = RbTree::new();
        let mut last = SENTINEL;
        let mut ids = Vec::new();
        for &(len, lf) in lengths {
            let piece = Piece::new(0, BufferCursor::new(0, 0), BufferCursor::new(lf, 0), len, lf);
            last = tree.insert_right(last, piece);
            ids.push(last);
        }
        (tree, ids)
    }

    #[test]
    fn get_matches_inclusive_end() {
        let (tree, ids) = tree_with(&[(10, 1), (5, 0)]);
        let mut cache = SearchCache::new(4);
        cache.set(CacheEntry {
            node: ids[1],
            node_start_offset: 10,
            node_start_line: Some(2),
        });
        assert_eq!(cache.get(10, &tree).map(|e| e.node), Some(ids[1]));
        assert_eq!(cache.get(15, &tree).map(|e| e.node), Some(ids[1]));
        assert!(cache.get(16, &tree).is_none());
        assert!(cache.get(9, &tree).is_none());
    }

    #[test]
    fn get_by_line_needs_known_start_line() {
        let (tree, ids) = tree_with(&[(10, 3)]);
        let mut cache = SearchCache::new(2);
        cache.set(CacheEntry {
            node: ids[0],
            node_start_offset: 0,
            node_start_line: None,
        });
        assert!(cache.get_by_line(2, &tree).is_none());
        cache.set(CacheEntry {
            node: ids[0],
            node_start_offset: 0,
            node_start_line: Some(1),
        });
        assert!(cache.get_by_line(1, &tree).is_none());
        assert!(cache.get_by_line(4, &tree).is_some());
        assert!(cache.get_by_line(5, &tree).is_none());
    }

    #[test]
    fn set_evicts_oldest_at_limit() {
        let (_, ids) = tree_with(&[(1, 0), (1, 0), (1, 0)]);
        let mut cache = SearchCache::new(2);
        for (i, id) in ids.iter().enumerate() {
            cache.set(CacheEntry {
                node: *id,
                node_start_offset: i,
                node_start_line: None,
            });
        }
        assert_eq!(cache.len(), 2);
        assert!(cache.entries.iter().all(|e| e.node != ids[0]));
    }

    #[test]
    fn validate_drops_later_and_detached_entries() {
        let (mut tree, ids) = tree_with(&[(4, 0), (4, 0), (4, 0)]);
        let mut cache = SearchCache::new(3);
        for (i, id) in ids.iter().enumerate() {
            cache.set(CacheEntry {
                node: *id,
                node_start_offset: i * 4,
                node_start_line: None,
            });
        }
        cache.validate(8, &tree);
        assert_eq!(cache.len(), 2);

        tree.delete(ids[0]);
        cache.validate(100, &tree);
        assert_eq!(cache.len(), 1);

        cache.forget(ids[1]);
        assert_eq!(cache.len(), 0);
    }
}
