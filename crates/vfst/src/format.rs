// VFST binary format: header cookies, byte order detection, table alignment.
//
// The canonical layout stores every multi-byte integer little-endian. Images
// written on a big-endian host carry the cookies byte-reversed and have to be
// run through `swap::byte_swap_image` before parsing.

use byteorder::{BigEndian, ByteOrder as _, LittleEndian};

use crate::VfstError;

/// VFST header magic constants.
pub const COOKIE1: u32 = 0x0001_3A6E;
pub const COOKIE2: u32 = 0x0003_51FA;

/// Size of the VFST binary header in bytes.
pub const HEADER_SIZE: usize = 16;

/// Size of one transition table record (and of an overflow cell).
pub const TRANSITION_SIZE: usize = 8;

/// Byte order of a VFST image relative to the canonical layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Cookies match directly; the image can be parsed in place.
    Native,
    /// Cookies are byte-reversed; the image must be swapped first.
    Swapped,
}

/// Inspects the cookie pair at the start of `data`.
///
/// Anything other than the exact pair, or its exact byte reversal, is
/// rejected as an unknown file type.
pub fn detect_byte_order(data: &[u8]) -> Result<ByteOrder, VfstError> {
    if data.len() < HEADER_SIZE {
        return Err(VfstError::TooShort {
            expected: HEADER_SIZE,
            actual: data.len(),
        });
    }

    let cookies = (&data[0..4], &data[4..8]);
    if LittleEndian::read_u32(cookies.0) == COOKIE1 && LittleEndian::read_u32(cookies.1) == COOKIE2
    {
        return Ok(ByteOrder::Native);
    }
    if BigEndian::read_u32(cookies.0) == COOKIE1 && BigEndian::read_u32(cookies.1) == COOKIE2 {
        return Ok(ByteOrder::Swapped);
    }
    Err(VfstError::InvalidMagic)
}

/// Rounds `offset` up to the next transition record boundary.
#[inline]
pub fn align_to_transition(offset: usize) -> usize {
    let partial = offset % TRANSITION_SIZE;
    if partial > 0 {
        offset + (TRANSITION_SIZE - partial)
    } else {
        offset
    }
}
