//! A sequence which does not contain duplicates.
//!
//! A "once list".

use fxhash::FxHashSet;
use std::hash::Hash;

/// A "once list", which contains any element at most once.
///
/// Elements keep the order of their first insertion; later insertions of an element already
/// present are ignored.
#[derive(Clone, Debug)]
pub struct OnceList<T> {
    items: Vec<T>,
    set: FxHashSet<T>,
}

impl<T: Eq + Hash + Clone> Default for OnceList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Eq + Hash + Clone> OnceList<T> {
    /// Add to the end of the list. If `t` is already present, it is dropped.
    ///
    /// Returns whether `t` was added.
    pub fn push(&mut self, t: T) -> bool {
        if self.set.insert(t.clone()) {
            self.items.push(t);
            true
        } else {
            false
        }
    }
    /// Is `t` in the list?
    pub fn contains(&self, t: &T) -> bool {
        self.set.contains(t)
    }
    /// Number of (distinct) elements.
    pub fn len(&self) -> usize {
        self.items.len()
    }
    /// Is the list empty?
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
    /// Iterate in first-insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
    /// Make an empty list.
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            set: FxHashSet::default(),
        }
    }
    /// The elements, in first-insertion order.
    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<A: Eq + Hash + Clone> std::iter::FromIterator<A> for OnceList<A> {
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = A>,
    {
        iter.into_iter().fold(Self::new(), |mut q, i| {
            q.push(i);
            q
        })
    }
}

impl<A: Eq + Hash + Clone> std::iter::Extend<A> for OnceList<A> {
    fn extend<T>(&mut self, iter: T)
    where
        T: IntoIterator<Item = A>,
    {
        for i in iter.into_iter() {
            self.push(i);
        }
    }
}

impl<'a, T> IntoIterator for &'a OnceList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;
    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn keeps_first_insertion_order() {
        let l: OnceList<u32> = vec![3, 1, 3, 2, 1, 4].into_iter().collect();
        assert_eq!(l.into_vec(), vec![3, 1, 2, 4]);
    }

    #[test]
    fn push_reports_novelty() {
        let mut l = OnceList::new();
        assert!(l.push("a"));
        assert!(!l.push("a"));
        assert!(l.contains(&"a"));
        assert_eq!(l.len(), 1);
    }

    #[test]
    fn extend_keeps_earlier_positions() {
        let mut l: OnceList<&str> = ["y", "x"].into_iter().collect();
        l.extend(["z", "x", "y", "w"]);
        assert_eq!(l.into_vec(), vec!["y", "x", "z", "w"]);
    }
}
