//! Property tests for the container stack: CAR framing, archives and
//! envelopes composed the way the clock crate uses them.

use proptest::prelude::*;
use tessera_core::{archive, envelope, Block, Car};

// ============================================================================
// Strategies
// ============================================================================

fn payloads() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(prop::collection::vec(any::<u8>(), 0..256), 1..8)
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// A CAR decodes to the same blocks, in the same order, with every
    /// duplicate collapsed.
    #[test]
    fn prop_car_round_trip(payloads in payloads()) {
        let blocks: Vec<Block> = payloads
            .into_iter()
            .map(|p| Block::raw(p).unwrap())
            .collect();
        let mut car = Car::new(vec![*blocks[0].cid()]);
        for block in &blocks {
            car.push(block.clone());
        }

        let decoded = Car::decode(&car.encode().unwrap()).unwrap();
        prop_assert_eq!(decoded.roots(), car.roots());
        prop_assert_eq!(decoded.blocks(), car.blocks());
    }

    /// Encoding the same archive twice yields identical text.
    #[test]
    fn prop_archive_encoding_is_deterministic(body in ".{0,64}") {
        let block = Block::encode(&body).unwrap();
        let first = archive::archive("prop@1", *block.cid(), [block.clone()]).unwrap();
        let second = archive::archive("prop@1", *block.cid(), [block.clone()]).unwrap();
        prop_assert_eq!(envelope::format(&first), envelope::format(&second));

        let text = envelope::format(&first);
        let extracted = archive::extract("prop@1", &envelope::parse(&text).unwrap()).unwrap();
        prop_assert_eq!(extracted.root_block().unwrap(), &block);
    }
}
