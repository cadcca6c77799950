// Structural byte swap of foreign-order VFST images.
//
// A byte swap cannot be done blindly over the whole file: symbol strings are
// byte sequences and stay as they are, the table start depends on where the
// strings end, and an overflow cell has a different layout from the
// transition record it replaces. The walk below mirrors the parser.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::VfstError;
use crate::format::{HEADER_SIZE, TRANSITION_SIZE, align_to_transition};
use crate::transition::OVERFLOW_MARKER;

/// Reverses the three bytes of a 24-bit target state packed in the low bits
/// of a 32-bit field.
#[inline]
pub fn swap_target_state(ts: u32) -> u32 {
    ((ts << 16) & 0x00FF_0000) | (ts & 0x0000_FF00) | ((ts >> 16) & 0x0000_00FF)
}

/// Produces a canonical-order copy of a foreign-order image.
///
/// The returned buffer has the same length as `src`. The 16-byte header is
/// copied verbatim; its cookies have already served their purpose.
pub fn byte_swap_image(src: &[u8]) -> Result<Vec<u8>, VfstError> {
    if src.len() < HEADER_SIZE + 2 {
        return Err(VfstError::TooShort {
            expected: HEADER_SIZE + 2,
            actual: src.len(),
        });
    }

    let mut dst = vec![0u8; src.len()];
    dst[..HEADER_SIZE].copy_from_slice(&src[..HEADER_SIZE]);

    let mut pos = HEADER_SIZE;
    let symbol_count = BigEndian::read_u16(&src[pos..pos + 2]);
    LittleEndian::write_u16(&mut dst[pos..pos + 2], symbol_count);
    pos += 2;

    for i in 0..symbol_count {
        let len = src[pos..]
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| {
                VfstError::InvalidSymbolTable(format!("unterminated symbol string {i}"))
            })?;
        let end = pos + len + 1;
        dst[pos..end].copy_from_slice(&src[pos..end]);
        pos = end;
    }

    // Padding bytes before the table stay zeroed.
    let table_start = align_to_transition(pos);
    if table_start > src.len() {
        return Err(VfstError::TooShort {
            expected: table_start,
            actual: src.len(),
        });
    }

    let mut next_is_overflow = false;
    let mut offset = table_start;
    while offset + TRANSITION_SIZE <= src.len() {
        let from = &src[offset..offset + TRANSITION_SIZE];
        let to = &mut dst[offset..offset + TRANSITION_SIZE];
        if next_is_overflow {
            swap_overflow_cell(from, to);
            next_is_overflow = false;
        } else {
            next_is_overflow = swap_transition(from, to) == OVERFLOW_MARKER;
        }
        offset += TRANSITION_SIZE;
    }
    dst[offset..].copy_from_slice(&src[offset..]);

    log::debug!(
        "byte-swapped transducer image: {} symbols, {} table bytes",
        symbol_count,
        src.len() - table_start
    );
    Ok(dst)
}

/// Swaps one transition record and returns its `more_transitions` byte.
fn swap_transition(from: &[u8], to: &mut [u8]) -> u8 {
    LittleEndian::write_u16(&mut to[0..2], BigEndian::read_u16(&from[0..2]));
    LittleEndian::write_u16(&mut to[2..4], BigEndian::read_u16(&from[2..4]));
    let packed = LittleEndian::read_u32(&from[4..8]);
    let more = (packed >> 24) as u8;
    let target = swap_target_state(packed & 0x00FF_FFFF);
    LittleEndian::write_u32(&mut to[4..8], target | (u32::from(more) << 24));
    more
}

fn swap_overflow_cell(from: &[u8], to: &mut [u8]) {
    to[0..4].copy_from_slice(&from[0..4]);
    LittleEndian::write_u32(&mut to[4..8], BigEndian::read_u32(&from[4..8]));
}
