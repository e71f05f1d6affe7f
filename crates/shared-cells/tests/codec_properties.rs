//! # Codec Property Tests
//!
//! Round-trip and bound properties of the cell codec, checked over random
//! inputs.

use proptest::prelude::*;
use shared_cells::prelude::*;
use shared_cells::{bytes_cell, parse_bytes_cell, MAX_BITS};

fn arb_address() -> impl Strategy<Value = MsgAddress> {
    prop_oneof![
        Just(MsgAddress::None),
        (any::<i8>(), any::<[u8; 32]>()).prop_map(|(wc, hash)| MsgAddress::std(wc, hash)),
    ]
}

proptest! {
    #[test]
    fn uint_round_trips_at_any_width(value in any::<u64>(), bits in 1usize..=64) {
        let value = if bits == 64 { value } else { value & ((1u64 << bits) - 1) };
        let cell = CellBuilder::new().store_uint(value, bits).unwrap().build();
        prop_assert_eq!(cell.bit_len(), bits);
        let mut slice = cell.parse();
        prop_assert_eq!(slice.load_uint(bits).unwrap(), value);
        prop_assert!(slice.end_parse().is_ok());
    }

    #[test]
    fn int_round_trips_at_any_width(value in any::<i64>(), bits in 1usize..=64) {
        let value = if bits == 64 {
            value
        } else {
            let shift = 64 - bits;
            (value << shift) >> shift
        };
        let cell = CellBuilder::new().store_int(value, bits).unwrap().build();
        prop_assert_eq!(cell.parse().load_int(bits).unwrap(), value);
    }

    #[test]
    fn coins_round_trip_and_stay_minimal(nano in 0u128..(1u128 << 120)) {
        let coins = Coins::from_nano(nano);
        let cell = coins.to_cell().unwrap();
        let expected_len = (128 - nano.leading_zeros() as usize).div_ceil(8);
        prop_assert_eq!(cell.bit_len(), 4 + expected_len * 8);
        prop_assert_eq!(Coins::from_cell(&cell).unwrap(), coins);
    }

    #[test]
    fn coins_text_round_trips(nano in 0u128..(1u128 << 100)) {
        let coins = Coins::from_nano(nano);
        prop_assert_eq!(coins.to_string().parse::<Coins>().unwrap(), coins);
    }

    #[test]
    fn address_round_trips(addr in arb_address()) {
        let cell = addr.to_cell().unwrap();
        prop_assert_eq!(MsgAddress::from_cell(&cell).unwrap(), addr);
    }

    #[test]
    fn snake_bytes_round_trip(bytes in proptest::collection::vec(any::<u8>(), 0..600)) {
        let cell = bytes_cell(&bytes).unwrap();
        prop_assert_eq!(parse_bytes_cell(&cell).unwrap(), bytes);
    }

    #[test]
    fn overflowing_writes_always_fail(prefix in (MAX_BITS - 63)..=MAX_BITS, extra in 1usize..64) {
        let remaining = MAX_BITS - prefix;
        prop_assume!(remaining + extra <= 64);
        let mut builder = CellBuilder::new();
        for _ in 0..prefix {
            builder.store_bit(false).unwrap();
        }
        let result = builder.store_uint(0, remaining + extra);
        prop_assert!(result.unwrap_err().is_capacity());
        prop_assert_eq!(builder.bit_len(), prefix);
    }

    #[test]
    fn reads_past_end_always_truncate(len in 0usize..200, extra in 1usize..64) {
        let mut builder = CellBuilder::new();
        for i in 0..len {
            builder.store_bit(i % 3 == 0).unwrap();
        }
        let cell = builder.build();
        let mut slice = cell.parse();
        slice.skip_bits(len).unwrap();
        prop_assert!(slice.load_uint(extra).unwrap_err().is_truncation());
    }

    #[test]
    fn equal_content_means_equal_hash(bytes in proptest::collection::vec(any::<u8>(), 0..127)) {
        let a = bytes_cell(&bytes).unwrap();
        let b = bytes_cell(&bytes).unwrap();
        prop_assert_eq!(a.hash(), b.hash());
    }
}
