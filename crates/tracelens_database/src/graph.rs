//! Wait-for graph used to refuse waits that would deadlock.
//!
//! An edge `a -> b` means the resolution of `a` is waiting on `b`.

use std::collections::{HashMap, HashSet};
use tracelens_core::Fingerprint;

#[derive(Debug, Default)]
pub(crate) struct WaitGraph {
    edges: HashMap<Fingerprint, Vec<Fingerprint>>,
}

impl WaitGraph {
    pub(crate) fn add(&mut self, from: Fingerprint, to: Fingerprint) {
        self.edges.entry(from).or_default().push(to);
    }

    pub(crate) fn remove(&mut self, from: Fingerprint, to: Fingerprint) {
        if let Some(targets) = self.edges.get_mut(&from) {
            if let Some(pos) = targets.iter().position(|t| *t == to) {
                targets.swap_remove(pos);
            }
            if targets.is_empty() {
                self.edges.remove(&from);
            }
        }
    }

    /// The cycle `from` waiting on `to` would close, if any.
    ///
    /// Returned as `[from, to, ..., from]`.
    pub(crate) fn cycle(&self, from: Fingerprint, to: Fingerprint) -> Option<Vec<Fingerprint>> {
        if from == to {
            return Some(vec![from, to]);
        }

        let mut came_from = HashMap::new();
        let mut visited = HashSet::from([to]);
        let mut stack = vec![to];

        while let Some(node) = stack.pop() {
            for &next in self.edges.get(&node).into_iter().flatten() {
                if !visited.insert(next) {
                    continue;
                }
                came_from.insert(next, node);
                if next == from {
                    let mut back = vec![from];
                    let mut cur = from;
                    while cur != to {
                        match came_from.get(&cur) {
                            Some(&prev) => cur = prev,
                            None => break,
                        }
                        back.push(cur);
                    }
                    back.reverse();
                    let mut chain = vec![from];
                    chain.extend(back);
                    return Some(chain);
                }
                stack.push(next);
            }
        }

        None
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracelens_core::Hash;

    fn fp(n: u8) -> Fingerprint {
        Fingerprint::from_hash(Hash::compute(&[n]))
    }

    #[test]
    fn test_self_wait_is_cycle() {
        let graph = WaitGraph::default();
        assert_eq!(graph.cycle(fp(1), fp(1)), Some(vec![fp(1), fp(1)]));
    }

    #[test]
    fn test_no_cycle_on_chain() {
        let mut graph = WaitGraph::default();
        graph.add(fp(1), fp(2));
        graph.add(fp(2), fp(3));
        assert_eq!(graph.cycle(fp(1), fp(3)), None);
        assert_eq!(graph.cycle(fp(4), fp(1)), None);
    }

    #[test]
    fn test_cycle_chain() {
        let mut graph = WaitGraph::default();
        graph.add(fp(1), fp(2));
        graph.add(fp(2), fp(3));
        assert_eq!(
            graph.cycle(fp(3), fp(1)),
            Some(vec![fp(3), fp(1), fp(2), fp(3)])
        );
    }

    #[test]
    fn test_remove_edges() {
        let mut graph = WaitGraph::default();
        graph.add(fp(1), fp(2));
        graph.add(fp(1), fp(2));
        graph.remove(fp(1), fp(2));
        assert!(!graph.is_empty());
        assert!(graph.cycle(fp(2), fp(1)).is_some());
        graph.remove(fp(1), fp(2));
        assert!(graph.is_empty());
        assert_eq!(graph.cycle(fp(2), fp(1)), None);
    }
}
