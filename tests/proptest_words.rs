//! Property suites: decode round-trips and arithmetic closure.

use proptest::prelude::*;
use vm16_core::{
    decode_image, encode_image, ExecContext, Machine, MemoryImage, Operand, RunExit, VmError,
    MODULUS,
};

const R0: u16 = 32768;

fn run_binary_op(opcode: u16, lhs: u16, rhs: u16) -> vm16_core::Result<u16> {
    let mut machine = Machine::new(MemoryImage::from_words(vec![opcode, R0, lhs, rhs, 0]));
    let mut output = Vec::new();
    let exit = machine.run(&mut ExecContext::new(&mut output))?;
    assert_eq!(exit, RunExit::Halted);
    Ok(machine.state().register(0))
}

proptest! {
    #[test]
    fn decode_round_trips_any_word_sequence(words in proptest::collection::vec(any::<u16>(), 0..256)) {
        prop_assert_eq!(decode_image(&encode_image(&words)), words);
    }

    #[test]
    fn decode_halves_even_byte_streams(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
        let words = decode_image(&bytes);
        prop_assert_eq!(words.len(), bytes.len() / 2);
    }

    #[test]
    fn add_stays_within_the_modulus(lhs in 0u16..MODULUS, rhs in 0u16..MODULUS) {
        let result = run_binary_op(9, lhs, rhs).unwrap();
        prop_assert!(result < MODULUS);
        prop_assert_eq!(result as u32, (lhs as u32 + rhs as u32) % MODULUS as u32);
    }

    #[test]
    fn mult_stays_within_the_modulus(lhs in 0u16..MODULUS, rhs in 0u16..MODULUS) {
        let result = run_binary_op(10, lhs, rhs).unwrap();
        prop_assert!(result < MODULUS);
        prop_assert_eq!(result as u32, (lhs as u32 * rhs as u32) % MODULUS as u32);
    }

    #[test]
    fn mod_is_bounded_by_its_divisor(lhs in 0u16..MODULUS, rhs in 1u16..MODULUS) {
        let result = run_binary_op(11, lhs, rhs).unwrap();
        prop_assert!(result < rhs);
        prop_assert_eq!(result, lhs % rhs);
    }

    #[test]
    fn mod_by_zero_is_always_fatal(lhs in 0u16..MODULUS) {
        let err = run_binary_op(11, lhs, 0).unwrap_err();
        prop_assert!(
            matches!(err, VmError::InvalidOperand { opcode: "MOD", .. }),
            "expected InvalidOperand for MOD"
        );
    }

    #[test]
    fn classification_partitions_the_word_space(word in any::<u16>()) {
        match Operand::classify(word) {
            Some(Operand::Literal(value)) => prop_assert!(value < 32768 && value == word),
            Some(Operand::Register(index)) => {
                prop_assert!((32768..32776).contains(&word));
                prop_assert_eq!(index as u16, word - 32768);
            }
            None => prop_assert!(word >= 32776),
        }
    }
}
