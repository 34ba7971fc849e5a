//! Order independence of head merging

#![allow(clippy::unwrap_used, clippy::expect_used)]

use proptest::prelude::*;
use tessera_blocks::MemoryBlockstore;
use tessera_clock::{clock, EventBlock};
use tessera_core::Cid;

/// Events of a random DAG; event `i` takes as parents the earlier events
/// selected by the bits of `masks[i - 1]`.
fn build_dag(masks: &[u8], store: &MemoryBlockstore) -> Vec<Cid> {
    let mut cids: Vec<Cid> = Vec::with_capacity(masks.len() + 1);
    for i in 0..=masks.len() {
        let parents: Vec<Cid> = match i {
            0 => Vec::new(),
            _ => (0..i)
                .filter(|j| masks[i - 1] & (1 << j) != 0)
                .map(|j| cids[j])
                .collect(),
        };
        let event = EventBlock::new(format!("event-{i}"), parents).unwrap();
        store.insert(event.block().clone());
        cids.push(*event.cid());
    }
    cids
}

/// Events nothing else names as a parent
fn maximal(masks: &[u8], cids: &[Cid]) -> Vec<Cid> {
    let mut heads: Vec<Cid> = (0..cids.len())
        .filter(|&j| {
            !masks
                .iter()
                .enumerate()
                .any(|(child, mask)| j <= child && mask & (1 << j) != 0)
        })
        .map(|j| cids[j])
        .collect();
    heads.sort();
    heads
}

fn fold(store: &MemoryBlockstore, events: impl IntoIterator<Item = Cid>) -> Vec<Cid> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    runtime.block_on(async {
        let mut head = Vec::new();
        for event in events {
            head = clock::advance(store, &head, event).await.unwrap();
        }
        head.sort();
        head
    })
}

fn dag_and_order() -> impl Strategy<Value = (Vec<u8>, Vec<usize>)> {
    prop::collection::vec(any::<u8>(), 1..8).prop_flat_map(|masks| {
        let order: Vec<usize> = (0..=masks.len()).collect();
        (Just(masks), Just(order).prop_shuffle())
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_merge_is_order_independent((masks, order) in dag_and_order()) {
        let store = MemoryBlockstore::new();
        let cids = build_dag(&masks, &store);

        let in_order = fold(&store, cids.iter().copied());
        let shuffled = fold(&store, order.iter().map(|&i| cids[i]));

        prop_assert_eq!(&in_order, &shuffled);
        prop_assert_eq!(in_order, maximal(&masks, &cids));
    }

    #[test]
    fn prop_refolding_a_head_is_idempotent((masks, order) in dag_and_order()) {
        let store = MemoryBlockstore::new();
        let cids = build_dag(&masks, &store);
        let head = fold(&store, order.iter().map(|&i| cids[i]));

        let again = fold(&store, order.iter().map(|&i| cids[i]).chain(head.iter().copied()));
        prop_assert_eq!(head, again);
    }
}
