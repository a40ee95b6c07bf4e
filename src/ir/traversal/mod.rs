//! Graph traversals
//!
//! An [OpTraversal] computes one value per reachable node, visiting every node after its
//! parents, with an explicit stack (deep graphs do not overflow the call stack). What is
//! computed is given by an [OpVisitor].
//!
//! Three refinements:
//! * visitors whose value is a list of findings; [OpTraversal::unique_values] flattens them
//! * [Gc], which wraps a visitor and drops each cached value once its last consumer has read it
//! * [PostOrderIter], a plain post-order walk with no values

use fxhash::{FxHashMap, FxHashSet};
use log::trace;

use crate::ir::error::Result;
use crate::ir::op::Op;
use crate::util::once::OnceList;

use std::hash::Hash;

pub mod kinds;

/// The per-node computation of a traversal.
pub trait OpVisitor {
    /// The value computed per node.
    type Value: Clone;
    /// Compute the value of `op` from its parents' values, given in operand order.
    fn visit(&mut self, op: &Op, parents: Vec<Self::Value>) -> Result<Self::Value>;
    /// Called each time the value of `op` is read (including when it is first computed).
    fn consume(&mut self, _op: &Op) {}
    /// Should the value of `op` stay cached after being read?
    fn cache(&self, _op: &Op) -> bool {
        true
    }
}

/// A memoizing, explicit-stack, post-order traversal.
pub struct OpTraversal<V: OpVisitor> {
    visitor: V,
    values: FxHashMap<Op, V::Value>,
    order: OnceList<Op>,
}

impl<V: OpVisitor> OpTraversal<V> {
    /// A traversal that has visited nothing.
    pub fn new(visitor: V) -> Self {
        Self {
            visitor,
            values: FxHashMap::default(),
            order: OnceList::new(),
        }
    }

    /// Visit everything reachable from `roots`.
    pub fn traverse<'a, I: IntoIterator<Item = &'a Op>>(mut self, roots: I) -> Result<Self> {
        for r in roots {
            self.get(r)?;
        }
        Ok(self)
    }

    /// The value of `root`, visiting whatever it depends on that is not cached.
    pub fn get(&mut self, root: &Op) -> Result<V::Value> {
        let mut tasks = vec![(true, root.clone())];
        let mut results: Vec<V::Value> = Vec::new();

        while let Some((is_start, node)) = tasks.pop() {
            if let Some(v) = self.values.get(&node) {
                results.push(v.clone());
                self.visitor.consume(&node);
                if !self.visitor.cache(&node) {
                    self.values.remove(&node);
                }
                continue;
            }

            if is_start {
                tasks.push((false, node.clone()));
                tasks.extend(node.parents().iter().map(|p| (true, p.clone())));
            } else {
                // parents were pushed in order, so their values were produced in reverse
                let n = node.parents().len();
                let mut parent_values = results.split_off(results.len() - n);
                parent_values.reverse();

                trace!("visit {}", node);
                let value = self.visitor.visit(&node, parent_values)?;
                results.push(value.clone());

                self.visitor.consume(&node);
                if self.visitor.cache(&node) {
                    self.values.insert(node.clone(), value);
                    self.order.push(node);
                }
            }
        }

        debug_assert_eq!(results.len(), 1);
        Ok(results.pop().expect("a traversal yields one value per root"))
    }

    /// The cached value of `op`, if any.
    pub fn value(&self, op: &Op) -> Option<&V::Value> {
        self.values.get(op)
    }

    /// Cached nodes and values, in the order they were first computed.
    pub fn iter(&self) -> impl Iterator<Item = (&Op, &V::Value)> {
        self.order
            .iter()
            .filter_map(move |op| self.values.get(op).map(|v| (op, v)))
    }

    /// Number of cached values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Is the cache empty?
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The visitor.
    pub fn visitor(&self) -> &V {
        &self.visitor
    }

    /// Cached nodes and values, ordered by value.
    pub fn sorted_items(&self) -> Vec<(&Op, &V::Value)>
    where
        V::Value: Ord,
    {
        let mut items: Vec<_> = self.iter().collect();
        items.sort_by(|a, b| a.1.cmp(b.1));
        items
    }

    /// Drop the traversal, keeping the cached values.
    pub fn into_values(self) -> FxHashMap<Op, V::Value> {
        self.values
    }
}

impl<V, X> OpTraversal<V>
where
    V: OpVisitor<Value = Vec<X>>,
    X: Clone + Eq + Hash,
{
    /// All findings, deduplicated, in the order they were found.
    pub fn unique_values(&self) -> Vec<X> {
        self.iter()
            .flat_map(|(_, v)| v.iter().cloned())
            .collect::<OnceList<X>>()
            .into_vec()
    }
}

/// Counts, per node, the edges from its consumers.
#[derive(Default)]
pub struct Consumers {
    counts: FxHashMap<Op, usize>,
}

impl OpVisitor for Consumers {
    type Value = ();
    fn visit(&mut self, op: &Op, _: Vec<()>) -> Result<()> {
        for p in op.parents() {
            *self.counts.entry(p.clone()).or_default() += 1;
        }
        Ok(())
    }
}

impl Consumers {
    /// Consumer edge counts of everything reachable from `roots`.
    pub fn count<'a, I: IntoIterator<Item = &'a Op>>(roots: I) -> Result<FxHashMap<Op, usize>> {
        Ok(OpTraversal::new(Consumers::default())
            .traverse(roots)?
            .into_visitor()
            .counts)
    }
}

impl<V: OpVisitor> OpTraversal<V> {
    /// Drop the traversal, keeping the visitor.
    pub fn into_visitor(self) -> V {
        self.visitor
    }
}

/// A garbage-collecting wrapper: a node's value is dropped once every consumer has read it.
/// Root values stay cached.
pub struct Gc<V> {
    inner: V,
    consumers: FxHashMap<Op, usize>,
    roots: FxHashSet<Op>,
}

impl<V: OpVisitor> Gc<V> {
    /// Wrap `inner` for a traversal from exactly `roots`.
    pub fn new(inner: V, roots: &[Op]) -> Result<Self> {
        Ok(Gc {
            inner,
            consumers: Consumers::count(roots)?,
            roots: roots.iter().cloned().collect(),
        })
    }
    /// The wrapped visitor.
    pub fn inner(&self) -> &V {
        &self.inner
    }
}

impl<V: OpVisitor> OpVisitor for Gc<V> {
    type Value = V::Value;
    fn visit(&mut self, op: &Op, parents: Vec<V::Value>) -> Result<V::Value> {
        self.inner.visit(op, parents)
    }
    fn consume(&mut self, op: &Op) {
        if let Some(n) = self.consumers.get_mut(op) {
            *n = n.saturating_sub(1);
        }
    }
    fn cache(&self, op: &Op) -> bool {
        self.roots.contains(op) || self.consumers.get(op).map_or(false, |n| *n > 0)
    }
}

/// Run `visitor` over `roots`, dropping intermediate values as soon as possible.
pub fn traverse_gc<V: OpVisitor>(visitor: V, roots: &[Op]) -> Result<OpTraversal<Gc<V>>> {
    OpTraversal::new(Gc::new(visitor, roots)?).traverse(roots)
}

/// Iterator over the descendents of a node, parents before children.
pub struct PostOrderIter {
    // (parents stacked, node)
    stack: Vec<(bool, Op)>,
    visited: FxHashSet<Op>,
}

impl PostOrderIter {
    /// Walk everything reachable from `root`.
    pub fn new(root: Op) -> Self {
        Self {
            stack: vec![(false, root)],
            visited: FxHashSet::default(),
        }
    }
}

impl std::iter::Iterator for PostOrderIter {
    type Item = Op;
    fn next(&mut self) -> Option<Op> {
        while let Some((parents_pushed, t)) = self.stack.last_mut() {
            if self.visited.contains(t) {
                self.stack.pop();
            } else if !*parents_pushed {
                *parents_pushed = true;
                let last = t.clone();
                self.stack
                    .extend(last.parents().iter().map(|c| (false, c.clone())));
            } else {
                break;
            }
        }
        self.stack.pop().map(|(_, t)| {
            self.visited.insert(t.clone());
            t
        })
    }
}

#[cfg(test)]
mod test;
