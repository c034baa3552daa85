//! Address alignment helpers.

/// The platform's maximum natural alignment.
///
/// Two machine words, which is what the system allocator guarantees for
/// every allocation (`alignof(max_align_t)` on the usual 64-bit targets).
/// Standard arena sizes must be a multiple of this value.
pub const MAX_ALIGN: usize = 2 * std::mem::size_of::<usize>();

/// Returns `true` if `n` is a non-zero power of two.
#[inline]
pub const fn is_power_of_two(n: usize) -> bool {
    n > 0 && n & (n - 1) == 0
}

/// Round `addr` up to the next multiple of `align`.
///
/// Returns `None` if the rounded address does not fit in a `usize`.
/// `align` must be a power of two.
#[inline]
pub fn align_up(addr: usize, align: usize) -> Option<usize> {
    debug_assert!(is_power_of_two(align), "alignment {align} is not a power of two");
    let mask = align - 1;
    addr.checked_add(mask).map(|a| a & !mask)
}

/// Bytes of padding needed to bring `addr` up to `align`.
#[inline]
pub fn padding_for(addr: usize, align: usize) -> Option<usize> {
    align_up(addr, align).map(|aligned| aligned - addr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn powers_of_two_are_recognised() {
        for shift in 0..usize::BITS {
            assert!(is_power_of_two(1usize << shift));
        }
        assert!(!is_power_of_two(0));
        assert!(!is_power_of_two(3));
        assert!(!is_power_of_two(24));
        assert!(!is_power_of_two(usize::MAX));
    }

    #[test]
    fn align_up_rounds_to_next_multiple() {
        assert_eq!(align_up(0, 8), Some(0));
        assert_eq!(align_up(1, 8), Some(8));
        assert_eq!(align_up(8, 8), Some(8));
        assert_eq!(align_up(9, 16), Some(16));
        assert_eq!(align_up(4097, 4096), Some(8192));
    }

    #[test]
    fn align_up_with_unit_alignment_is_identity() {
        assert_eq!(align_up(12345, 1), Some(12345));
    }

    #[test]
    fn align_up_overflow_is_none() {
        assert_eq!(align_up(usize::MAX, 16), None);
        assert_eq!(padding_for(usize::MAX - 2, 8), None);
    }

    #[test]
    fn padding_matches_distance_to_boundary() {
        assert_eq!(padding_for(0x1001, 16), Some(15));
        assert_eq!(padding_for(0x1010, 16), Some(0));
    }

    #[test]
    fn max_align_covers_primitive_types() {
        assert!(is_power_of_two(MAX_ALIGN));
        assert!(MAX_ALIGN >= std::mem::align_of::<u64>());
        assert!(MAX_ALIGN >= std::mem::align_of::<f64>());
        assert!(MAX_ALIGN >= std::mem::align_of::<usize>());
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn aligned_address_is_multiple_and_minimal(
                addr in 0usize..(1 << 40),
                shift in 0u32..16,
            ) {
                let align = 1usize << shift;
                let aligned = align_up(addr, align).unwrap();
                prop_assert_eq!(aligned % align, 0);
                prop_assert!(aligned >= addr);
                prop_assert!(aligned - addr < align);
            }
        }
    }
}
