//! Loop detection over the rule graph.
//!
//! Adding the edge `source -> target` is refused when it would close a loop. The check walks
//! forward from `target` through an immutable [`RuleGraph`] snapshot, so it never observes a
//! half-written rule set.

use shift_core::ChatId;
use std::collections::HashSet;
use std::fmt;
use storage::RuleGraph;

/// Result of checking one prospective edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleCheck {
    Clear,
    /// `source == target`.
    SelfLoop(ChatId),
    /// `target` already relays straight back to `source`.
    Direct { source: ChatId, target: ChatId },
    /// Walking from `target` came back to a visited node; the full chain, start to repeat.
    Loop(Vec<ChatId>),
    /// The walk exceeded the hop bound without reaching an end.
    TooLong,
}

impl CycleCheck {
    pub fn is_cycle(&self) -> bool {
        !matches!(self, CycleCheck::Clear)
    }
}

impl fmt::Display for CycleCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleCheck::Clear => f.write_str("no loop"),
            CycleCheck::SelfLoop(id) => write!(f, "{} cannot relay to itself", id),
            CycleCheck::Direct { source, target } => {
                write!(f, "{} already relays to {}", target, source)
            }
            CycleCheck::Loop(chain) => f.write_str(&render_chain(chain)),
            CycleCheck::TooLong => f.write_str("relay chain too long, possible loop"),
        }
    }
}

/// `a -> b -> c`
pub fn render_chain(chain: &[ChatId]) -> String {
    chain
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Decides whether adding `source -> target` to `graph` creates a loop.
pub fn would_create_cycle(
    graph: &RuleGraph,
    source: ChatId,
    target: ChatId,
    max_hops: usize,
) -> CycleCheck {
    if source == target {
        return CycleCheck::SelfLoop(source);
    }
    if graph.next_hop(target) == Some(source) {
        return CycleCheck::Direct { source, target };
    }

    let mut visited: HashSet<ChatId> = HashSet::from([source]);
    let mut chain = vec![source, target];
    let mut current = target;

    loop {
        let Some(next) = graph.next_hop(current) else {
            return CycleCheck::Clear;
        };
        if visited.contains(&next) {
            chain.push(next);
            return CycleCheck::Loop(chain);
        }
        if visited.len() > max_hops {
            return CycleCheck::TooLong;
        }
        visited.insert(next);
        chain.push(next);
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX_HOPS: usize = 50;

    #[test]
    fn test_self_loop_always_rejected() {
        let graph = RuleGraph::default();
        for id in [-1001, 0, 42] {
            let check = would_create_cycle(&graph, id, id, MAX_HOPS);
            assert!(check.is_cycle());
            assert_eq!(check, CycleCheck::SelfLoop(id));
        }
    }

    #[test]
    fn test_direct_two_cycle() {
        let graph = RuleGraph::from_edges([(2, 1)]);
        let check = would_create_cycle(&graph, 1, 2, MAX_HOPS);
        assert_eq!(check, CycleCheck::Direct { source: 1, target: 2 });
        assert_eq!(check.to_string(), "2 already relays to 1");
    }

    #[test]
    fn test_indirect_cycle_reports_full_chain() {
        // A -> B -> C exists; adding C -> A closes the loop.
        let (a, b, c) = (-1, -2, -3);
        let graph = RuleGraph::from_edges([(a, b), (b, c)]);

        let check = would_create_cycle(&graph, c, a, MAX_HOPS);
        assert_eq!(check, CycleCheck::Loop(vec![c, a, b, c]));
        assert_eq!(check.to_string(), "-3 -> -1 -> -2 -> -3");
    }

    #[test]
    fn test_open_chain_is_clear() {
        let graph = RuleGraph::from_edges([(2, 3), (3, 4)]);
        assert_eq!(would_create_cycle(&graph, 1, 2, MAX_HOPS), CycleCheck::Clear);
        assert_eq!(would_create_cycle(&graph, 9, 7, MAX_HOPS), CycleCheck::Clear);
    }

    #[test]
    fn test_chain_longer_than_bound_is_too_long() {
        let graph = RuleGraph::from_edges((1..=60).map(|n| (n, n + 1)));
        let check = would_create_cycle(&graph, 0, 1, MAX_HOPS);
        assert_eq!(check, CycleCheck::TooLong);
        assert!(check.is_cycle());
    }

    #[test]
    fn test_chain_within_bound_is_clear() {
        let graph = RuleGraph::from_edges((1..=20).map(|n| (n, n + 1)));
        assert_eq!(would_create_cycle(&graph, 0, 1, MAX_HOPS), CycleCheck::Clear);
    }
}
