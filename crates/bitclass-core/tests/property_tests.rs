//! Property-based tests using proptest
//!
//! These tests verify the algebraic laws and layout invariants that must hold
//! for every bit-vector, whatever its size or contents.

use bitclass_core::reduction::{and_linear, and_tree};
use bitclass_core::scalar::{self, BitOp};
use bitclass_core::simd_intrinsics::combine_into_with;
use bitclass_core::{capacity_for, BitVector, LaneWidth, SimdStrategy};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn lane_strategy() -> impl Strategy<Value = LaneWidth> {
    prop_oneof![Just(LaneWidth::W128), Just(LaneWidth::W256)]
}

// Bit pattern of a fixed logical size
fn bits_strategy(size: usize) -> impl Strategy<Value = Vec<bool>> {
    prop::collection::vec(any::<bool>(), size)
}

// Size plus three patterns of that size
fn triple_strategy() -> impl Strategy<Value = (Vec<bool>, Vec<bool>, Vec<bool>)> {
    (1usize..600).prop_flat_map(|size| {
        (bits_strategy(size), bits_strategy(size), bits_strategy(size))
    })
}

// Size plus 1..=20 patterns of that size
fn operands_strategy() -> impl Strategy<Value = Vec<Vec<bool>>> {
    (1usize..400, 1usize..=20)
        .prop_flat_map(|(size, count)| prop::collection::vec(bits_strategy(size), count))
}

fn to_vector(bits: &[bool]) -> BitVector {
    let mut bv = BitVector::new(bits.len()).unwrap();
    for (i, &bit) in bits.iter().enumerate() {
        if bit {
            bv.set(i, true).unwrap();
        }
    }
    bv
}

fn ones(bv: &BitVector) -> Vec<usize> {
    bv.iter_ones().collect()
}

// ============================================================================
// Layout
// ============================================================================

proptest! {
    // Property: capacity is a positive lane multiple covering every bit
    #[test]
    fn test_capacity_covers_size(size in 0usize..100_000, lane in lane_strategy()) {
        let bv = BitVector::with_lane(size, lane).unwrap();
        prop_assert!(bv.allocated() > 0);
        prop_assert_eq!(bv.allocated() % lane.bytes(), 0);
        prop_assert!(bv.allocated() * 8 >= size);
        prop_assert_eq!(bv.allocated(), capacity_for(size, lane));
        prop_assert_eq!(bv.as_bytes().as_ptr() as usize % lane.bytes(), 0);
    }

    // Property: setting one bit leaves every other bit untouched
    #[test]
    fn test_set_get_isolation(
        bits in (1usize..500).prop_flat_map(bits_strategy),
        pick in any::<prop::sample::Index>(),
    ) {
        let mut bv = to_vector(&bits);
        let i = pick.index(bits.len());
        bv.set(i, !bits[i]).unwrap();
        for (j, &bit) in bits.iter().enumerate() {
            let expected = if j == i { !bit } else { bit };
            prop_assert_eq!(bv.get(j).unwrap(), expected);
        }
    }

    // Property: first_set_bit is the lowest index of the pattern
    #[test]
    fn test_first_set_bit_is_lowest(bits in (1usize..700).prop_flat_map(bits_strategy)) {
        let bv = to_vector(&bits);
        prop_assert_eq!(bv.first_set_bit(), bits.iter().position(|&b| b));
    }

    // Property: NOT complements logical bits only
    #[test]
    fn test_not_stays_within_size(bits in (1usize..700).prop_flat_map(bits_strategy)) {
        let bv = to_vector(&bits);
        let inverted = bv.not().unwrap();
        prop_assert_eq!(inverted.count_ones(), bits.len() - bv.count_ones());
        if let Some(first) = inverted.first_set_bit() {
            prop_assert!(first < bits.len());
        }
    }
}

// ============================================================================
// Algebra
// ============================================================================

proptest! {
    // Property: AND, OR and XOR are commutative
    #[test]
    fn test_commutativity((a, b, _) in triple_strategy()) {
        let (a, b) = (to_vector(&a), to_vector(&b));
        for op in [BitOp::And, BitOp::Or, BitOp::Xor] {
            let ab = scalar::combine(op, &a, &b).unwrap();
            let ba = scalar::combine(op, &b, &a).unwrap();
            prop_assert_eq!(ab, ba);
        }
    }

    // Property: AND, OR and XOR are associative
    #[test]
    fn test_associativity((a, b, c) in triple_strategy()) {
        let (a, b, c) = (to_vector(&a), to_vector(&b), to_vector(&c));
        for op in [BitOp::And, BitOp::Or, BitOp::Xor] {
            let left = scalar::combine(op, &scalar::combine(op, &a, &b).unwrap(), &c).unwrap();
            let right = scalar::combine(op, &a, &scalar::combine(op, &b, &c).unwrap()).unwrap();
            prop_assert_eq!(left, right);
        }
    }

    // Property: !(a & b) == !a | !b and !(a | b) == !a & !b
    #[test]
    fn test_de_morgan((a, b, _) in triple_strategy()) {
        let (a, b) = (to_vector(&a), to_vector(&b));
        let (na, nb) = (a.not().unwrap(), b.not().unwrap());

        let lhs = scalar::and(&a, &b).unwrap().not().unwrap();
        let rhs = scalar::or(&na, &nb).unwrap();
        prop_assert_eq!(lhs, rhs);

        let lhs = scalar::or(&a, &b).unwrap().not().unwrap();
        let rhs = scalar::and(&na, &nb).unwrap();
        prop_assert_eq!(lhs, rhs);
    }

    // Property: v ^ v is all zero
    #[test]
    fn test_xor_self_zero(bits in (0usize..700).prop_flat_map(bits_strategy)) {
        let v = to_vector(&bits);
        let zero = scalar::xor(&v, &v).unwrap();
        prop_assert!(zero.is_zero());
        prop_assert_eq!(zero.first_set_bit(), None);
    }

    // Property: AND of the set bits matches set intersection
    #[test]
    fn test_and_is_intersection((a, b, _) in triple_strategy()) {
        let expected: Vec<usize> = a.iter().zip(&b)
            .enumerate()
            .filter(|(_, (&x, &y))| x && y)
            .map(|(i, _)| i)
            .collect();
        let r = scalar::and(&to_vector(&a), &to_vector(&b)).unwrap();
        prop_assert_eq!(ones(&r), expected);
    }

    // Property: every lane strategy matches the scalar destination form
    #[test]
    fn test_simd_equals_scalar((a, b, _) in triple_strategy()) {
        let (a, b) = (to_vector(&a), to_vector(&b));
        for strategy in [SimdStrategy::Portable, SimdStrategy::Lane128, SimdStrategy::Lane256] {
            for op in [BitOp::And, BitOp::Or, BitOp::Xor] {
                let mut expected = BitVector::new(a.size()).unwrap();
                scalar::combine_into(op, &mut expected, &a, &b).unwrap();
                let mut actual = BitVector::new(a.size()).unwrap();
                combine_into_with(strategy, op, &mut actual, &a, &b).unwrap();
                prop_assert_eq!(actual.as_bytes(), expected.as_bytes());
            }
        }
    }

    // Property: tree reduction equals linear reduction byte for byte
    #[test]
    fn test_tree_equals_linear(patterns in operands_strategy()) {
        let owned: Vec<BitVector> = patterns.iter().map(|p| to_vector(p)).collect();
        let srcs: Vec<&BitVector> = owned.iter().collect();
        let size = owned[0].size();

        let mut linear = BitVector::new(size).unwrap();
        and_linear(&mut linear, &srcs).unwrap();
        let mut tree = BitVector::new(size).unwrap();
        and_tree(&mut tree, &srcs).unwrap();
        prop_assert_eq!(linear.as_bytes(), tree.as_bytes());

        let expected: Vec<usize> = (0..size)
            .filter(|&i| patterns.iter().all(|p| p[i]))
            .collect();
        prop_assert_eq!(ones(&tree), expected);
    }
}
