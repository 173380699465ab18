//! Stream position arithmetic. Positions are byte offsets into a stream; a fragment is addressed
//! by the position immediately after its aligned frame.

/// Length of the header the transport prepends to every frame.
pub const DATA_HEADER_LENGTH: u64 = 32;

/// Every frame starts on a multiple of this.
pub const FRAME_ALIGNMENT: u64 = 32;

/// Round `value` up to the next multiple of `alignment`, which must be a power of two.
pub fn align(value: u64, alignment: u64) -> u64 {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}

/// The position a frame of `length` bytes ends at when written at `position`.
pub fn next_position(position: u64, length: usize) -> u64 {
    align(position + DATA_HEADER_LENGTH + length as u64, FRAME_ALIGNMENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_rounds_up_to_boundary() {
        assert_eq!(align(0, 32), 0);
        assert_eq!(align(1, 32), 32);
        assert_eq!(align(32, 32), 32);
        assert_eq!(align(33, 32), 64);
    }

    #[test]
    fn next_position_includes_header() {
        assert_eq!(next_position(0, 50), 96);
        assert_eq!(next_position(96, 0), 128);
        assert_eq!(next_position(96, 32), 160);
        assert_eq!(next_position(160, 33), 256);
    }
}
