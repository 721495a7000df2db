//! Persistent ordered map with structural sharing.
//!
//! [`PersistentMap`] is the copy-on-write engine underneath every table, the
//! singleton registry, and the event log. It is a balanced binary search
//! tree (AVL) whose nodes are shared through [`Arc`]: a mutation copies only
//! the nodes on the path from the root to the affected key and reuses every
//! other subtree of the previous version. That bounds the cost of an insert,
//! update, or removal to O(log n) regardless of map size, and makes `clone`
//! an O(1) pointer copy.
//!
//! # Design
//!
//! - **Ordered, not hashed**: keys are compared through [`Ord`], so in-order
//!   iteration is deterministic for a given key set. No hasher state can
//!   leak nondeterminism into a simulation tick.
//! - **Immutable**: no method takes `&mut self`. Mutations return a new map;
//!   the old one stays valid and unchanged for as long as it is held.
//! - **Panic-free**: lookups and rebalancing never index, unwrap, or
//!   overflow; heights are recomputed bottom-up on every path copy.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::sync::Arc;

type Link<K, V> = Option<Arc<Node<K, V>>>;

/// A single tree node. Nodes are immutable once constructed; rebalancing
/// builds new nodes rather than editing existing ones.
struct Node<K, V> {
    key: K,
    value: V,
    height: u8,
    left: Link<K, V>,
    right: Link<K, V>,
}

/// An immutable ordered map from `K` to `V` with O(log n) copy-on-write
/// mutations and O(1) clone.
pub struct PersistentMap<K, V> {
    root: Link<K, V>,
    len: usize,
}

impl<K, V> Clone for PersistentMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            len: self.len,
        }
    }
}

impl<K, V> Default for PersistentMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> PersistentMap<K, V> {
    /// Create an empty map. Allocates nothing.
    pub const fn new() -> Self {
        Self { root: None, len: 0 }
    }

    /// Number of entries in the map.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the map holds no entries.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// In-order iterator over `(key, value)` pairs.
    pub fn iter(&self) -> Iter<'_, K, V> {
        let mut iter = Iter { stack: Vec::new() };
        iter.push_left(self.root.as_deref());
        iter
    }

    /// Look up a value by key. Pure; no side effects.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut current = self.root.as_deref();
        while let Some(node) = current {
            match key.cmp(node.key.borrow()) {
                Ordering::Less => current = node.left.as_deref(),
                Ordering::Greater => current = node.right.as_deref(),
                Ordering::Equal => return Some(&node.value),
            }
        }
        None
    }

    /// Whether the map contains the given key.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get(key).is_some()
    }
}

impl<K: Ord + Clone, V: Clone> PersistentMap<K, V> {
    /// Insert or replace the value under `key`.
    ///
    /// Returns the new map and the previous value, if any. The receiver is
    /// untouched; unaffected subtrees are shared between both versions.
    pub fn insert(&self, key: K, value: V) -> (Self, Option<V>) {
        let (root, previous) = insert_rec(&self.root, key, value);
        let len = if previous.is_some() {
            self.len
        } else {
            self.len.saturating_add(1)
        };
        (
            Self {
                root: Some(root),
                len,
            },
            previous,
        )
    }

    /// Remove the entry under `key`.
    ///
    /// Returns `None` if the key is absent; otherwise the new map and the
    /// removed value. The receiver is untouched.
    pub fn remove<Q>(&self, key: &Q) -> Option<(Self, V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let (root, removed) = remove_rec(&self.root, key)?;
        Some((
            Self {
                root,
                len: self.len.saturating_sub(1),
            },
            removed,
        ))
    }
}

impl<K: PartialEq, V: PartialEq> PartialEq for PersistentMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<K: Eq, V: Eq> Eq for PersistentMap<K, V> {}

impl<K: core::fmt::Debug, V: core::fmt::Debug> core::fmt::Debug for PersistentMap<K, V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a, K, V> IntoIterator for &'a PersistentMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// In-order iterator over a [`PersistentMap`].
pub struct Iter<'a, K, V> {
    stack: Vec<&'a Node<K, V>>,
}

impl<'a, K, V> Iter<'a, K, V> {
    /// Descend along the left spine of `link`, stacking every node passed.
    fn push_left(&mut self, link: Option<&'a Node<K, V>>) {
        let mut current = link;
        while let Some(node) = current {
            self.stack.push(node);
            current = node.left.as_deref();
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.push_left(node.right.as_deref());
        Some((&node.key, &node.value))
    }
}

/// Height of a subtree; an empty link has height 0.
fn height<K, V>(link: &Link<K, V>) -> i32 {
    link.as_deref().map_or(0, |node| i32::from(node.height))
}

/// Construct a node from parts, recomputing its height from the children.
fn make<K, V>(key: K, value: V, left: Link<K, V>, right: Link<K, V>) -> Arc<Node<K, V>> {
    let height = u8::try_from(height(&left).max(height(&right)).saturating_add(1))
        .unwrap_or(u8::MAX);
    Arc::new(Node {
        key,
        value,
        height,
        left,
        right,
    })
}

/// Construct a node from parts, rotating if the children's heights differ by
/// more than one. One `rebuild` per path level restores the AVL invariant
/// after both insertion and removal.
fn rebuild<K: Clone, V: Clone>(
    key: K,
    value: V,
    left: Link<K, V>,
    right: Link<K, V>,
) -> Arc<Node<K, V>> {
    let balance = height(&left).saturating_sub(height(&right));
    if balance > 1 {
        if let Some(l) = &left {
            if height(&l.left) >= height(&l.right) {
                // Single right rotation.
                return make(
                    l.key.clone(),
                    l.value.clone(),
                    l.left.clone(),
                    Some(make(key, value, l.right.clone(), right)),
                );
            }
            if let Some(lr) = &l.right {
                // Left-right double rotation.
                return make(
                    lr.key.clone(),
                    lr.value.clone(),
                    Some(make(l.key.clone(), l.value.clone(), l.left.clone(), lr.left.clone())),
                    Some(make(key, value, lr.right.clone(), right)),
                );
            }
        }
    } else if balance < -1 {
        if let Some(r) = &right {
            if height(&r.right) >= height(&r.left) {
                // Single left rotation.
                return make(
                    r.key.clone(),
                    r.value.clone(),
                    Some(make(key, value, left, r.left.clone())),
                    r.right.clone(),
                );
            }
            if let Some(rl) = &r.left {
                // Right-left double rotation.
                return make(
                    rl.key.clone(),
                    rl.value.clone(),
                    Some(make(key, value, left, rl.left.clone())),
                    Some(make(r.key.clone(), r.value.clone(), rl.right.clone(), r.right.clone())),
                );
            }
        }
    }
    make(key, value, left, right)
}

/// Path-copying insert. Returns the new subtree root and the replaced value.
fn insert_rec<K: Ord + Clone, V: Clone>(
    link: &Link<K, V>,
    key: K,
    value: V,
) -> (Arc<Node<K, V>>, Option<V>) {
    let Some(node) = link.as_deref() else {
        return (make(key, value, None, None), None);
    };
    match key.cmp(&node.key) {
        Ordering::Equal => {
            let previous = node.value.clone();
            (
                make(node.key.clone(), value, node.left.clone(), node.right.clone()),
                Some(previous),
            )
        }
        Ordering::Less => {
            let (new_left, previous) = insert_rec(&node.left, key, value);
            (
                rebuild(node.key.clone(), node.value.clone(), Some(new_left), node.right.clone()),
                previous,
            )
        }
        Ordering::Greater => {
            let (new_right, previous) = insert_rec(&node.right, key, value);
            (
                rebuild(node.key.clone(), node.value.clone(), node.left.clone(), Some(new_right)),
                previous,
            )
        }
    }
}

/// Path-copying removal. Returns `None` if the key is absent.
fn remove_rec<K, V, Q>(link: &Link<K, V>, key: &Q) -> Option<(Link<K, V>, V)>
where
    K: Ord + Clone + Borrow<Q>,
    V: Clone,
    Q: Ord + ?Sized,
{
    let node = link.as_deref()?;
    match key.cmp(node.key.borrow()) {
        Ordering::Less => {
            let (new_left, removed) = remove_rec(&node.left, key)?;
            Some((
                Some(rebuild(node.key.clone(), node.value.clone(), new_left, node.right.clone())),
                removed,
            ))
        }
        Ordering::Greater => {
            let (new_right, removed) = remove_rec(&node.right, key)?;
            Some((
                Some(rebuild(node.key.clone(), node.value.clone(), node.left.clone(), new_right)),
                removed,
            ))
        }
        Ordering::Equal => {
            let removed = node.value.clone();
            let merged = match (&node.left, &node.right) {
                (None, right) => right.clone(),
                (left, None) => left.clone(),
                (left, Some(right)) => {
                    // Replace this node with the smallest key of the right
                    // subtree, keeping the search order intact.
                    let ((successor_key, successor_value), remainder) = take_min(right);
                    Some(rebuild(successor_key, successor_value, left.clone(), remainder))
                }
            };
            Some((merged, removed))
        }
    }
}

/// Detach the minimum entry of a non-empty subtree, returning the entry and
/// the rebalanced remainder.
fn take_min<K: Ord + Clone, V: Clone>(node: &Arc<Node<K, V>>) -> ((K, V), Link<K, V>) {
    match &node.left {
        None => ((node.key.clone(), node.value.clone()), node.right.clone()),
        Some(left) => {
            let (min, new_left) = take_min(left);
            (
                min,
                Some(rebuild(node.key.clone(), node.value.clone(), new_left, node.right.clone())),
            )
        }
    }
}
