//! Integer helpers.

/// Round an offset or address to a power-of-two boundary.
pub trait AlignableTo: Sized {
    fn align_up(self, align: Self) -> Self;
    fn align_down(self, align: Self) -> Self;
    fn is_aligned_to(self, align: Self) -> bool;
}

impl AlignableTo for usize {
    #[inline(always)]
    fn align_up(self, align: usize) -> usize {
        debug_assert!(align.is_power_of_two());
        (self + align - 1) & !(align - 1)
    }

    #[inline(always)]
    fn align_down(self, align: usize) -> usize {
        debug_assert!(align.is_power_of_two());
        self & !(align - 1)
    }

    #[inline(always)]
    fn is_aligned_to(self, align: usize) -> bool {
        self & (align - 1) == 0
    }
}
