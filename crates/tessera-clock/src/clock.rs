//! Merkle clock head maintenance
//!
//! A head is the set of events with no known descendant. [`advance`] folds
//! one more event into a head; folding a set of events gives the same head
//! whatever order they arrive in.

use crate::errors::{ClockError, Result};
use serde::Deserialize;
use std::collections::{HashSet, VecDeque};
use tessera_blocks::BlockFetcher;
use tessera_core::Cid;

// Only the links matter for ancestry, so the operation is never decoded.
#[derive(Deserialize)]
struct Ancestry {
    parents: Vec<Cid>,
}

async fn parents_of(blocks: &dyn BlockFetcher, cid: &Cid) -> Result<Vec<Cid>> {
    let block = blocks
        .get(cid)
        .await?
        .ok_or(ClockError::MissingEvent { cid: *cid })?;
    let ancestry: Ancestry = block.decode().map_err(|e| ClockError::MalformedEvent {
        cid: *cid,
        reason: e.to_string(),
    })?;
    Ok(ancestry.parents)
}

/// Whether `b` is `a` or one of its ancestors.
pub async fn contains(blocks: &dyn BlockFetcher, a: &Cid, b: &Cid) -> Result<bool> {
    if a == b {
        return Ok(true);
    }
    let mut seen = HashSet::new();
    let mut queue = VecDeque::from([*a]);
    while let Some(cid) = queue.pop_front() {
        for parent in parents_of(blocks, &cid).await? {
            if parent == *b {
                return Ok(true);
            }
            if seen.insert(parent) {
                queue.push_back(parent);
            }
        }
    }
    Ok(false)
}

/// Fold `event` into `head`, returning the new head.
///
/// - already a head: unchanged
/// - descends from some heads: those are replaced by `event`
/// - ancestor of some head: unchanged
/// - otherwise concurrent: `event` joins the head
pub async fn advance(blocks: &dyn BlockFetcher, head: &[Cid], event: Cid) -> Result<Vec<Cid>> {
    if head.contains(&event) {
        return Ok(head.to_vec());
    }

    let mut kept = Vec::with_capacity(head.len() + 1);
    let mut replaced = false;
    for h in head {
        if contains(blocks, &event, h).await? {
            replaced = true;
        } else {
            kept.push(*h);
        }
    }
    if replaced {
        kept.push(event);
        return Ok(kept);
    }

    for h in head {
        if contains(blocks, h, &event).await? {
            return Ok(head.to_vec());
        }
    }

    let mut next = head.to_vec();
    next.push(event);
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::revision::EventBlock;
    use tessera_blocks::MemoryBlockstore;

    struct Dag {
        store: MemoryBlockstore,
    }

    impl Dag {
        fn new() -> Self {
            Self {
                store: MemoryBlockstore::new(),
            }
        }

        fn event(&self, label: &str, parents: &[Cid]) -> Cid {
            let event = EventBlock::new(label.to_string(), parents.iter().copied()).unwrap();
            self.store.insert(event.block().clone());
            *event.cid()
        }
    }

    fn sorted(mut cids: Vec<Cid>) -> Vec<Cid> {
        cids.sort();
        cids
    }

    #[tokio::test]
    async fn test_linear_history_replaces_head() {
        let dag = Dag::new();
        let r0 = dag.event("r0", &[]);
        let r1 = dag.event("r1", &[r0]);

        let head = advance(&dag.store, &[], r0).await.unwrap();
        assert_eq!(head, vec![r0]);
        let head = advance(&dag.store, &head, r1).await.unwrap();
        assert_eq!(head, vec![r1]);
        // Seeing the ancestor again changes nothing.
        let head = advance(&dag.store, &head, r0).await.unwrap();
        assert_eq!(head, vec![r1]);
    }

    #[tokio::test]
    async fn test_concurrent_events_and_merge() {
        let dag = Dag::new();
        let r0 = dag.event("r0", &[]);
        let a = dag.event("a", &[r0]);
        let b = dag.event("b", &[r0]);
        let m = dag.event("m", &[a, b]);

        let head = advance(&dag.store, &[a], b).await.unwrap();
        assert_eq!(sorted(head.clone()), sorted(vec![a, b]));

        let head = advance(&dag.store, &head, m).await.unwrap();
        assert_eq!(head, vec![m]);
    }

    #[tokio::test]
    async fn test_contains_walks_deep_ancestry() {
        let dag = Dag::new();
        let mut tip = dag.event("0", &[]);
        let root = tip;
        for i in 1..20 {
            tip = dag.event(&i.to_string(), &[tip]);
        }
        assert!(contains(&dag.store, &tip, &root).await.unwrap());
        assert!(!contains(&dag.store, &root, &tip).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_event_is_reported() {
        let dag = Dag::new();
        let r0 = dag.event("r0", &[]);
        let orphan = EventBlock::new("orphan".to_string(), [r0]).unwrap();
        let missing = *orphan.cid();
        let child = dag.event("child", &[missing]);

        match advance(&dag.store, &[r0], child).await {
            Err(ClockError::MissingEvent { cid }) => assert_eq!(cid, missing),
            other => panic!("expected MissingEvent, got {other:?}"),
        }
    }
}
