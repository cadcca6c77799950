// Transition records and the flat transition table view.
//
// The table is addressed by record index, never by address: a state is the
// index of its head record and every access goes through a bounds-checked
// slice of the backing buffer.

use bytemuck::{Pod, Zeroable};
use byteorder::{ByteOrder, LittleEndian};

use crate::VfstError;
use crate::format::TRANSITION_SIZE;

/// Input symbol marking a final state.
pub const FINAL_SYM: u16 = 0xFFFF;

/// `more_transitions` value announcing an overflow cell after the head.
pub const OVERFLOW_MARKER: u8 = 0xFF;

/// Raw 8-byte transition record.
///
/// `trans_info` packs the 24-bit target state (bits 0-23) and the 8-bit
/// `more_transitions` count (bits 24-31).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct Transition {
    pub sym_in: u16,
    pub sym_out: u16,
    pub trans_info: u32,
}

impl Transition {
    /// Decodes one little-endian record. `bytes` must hold at least
    /// [`TRANSITION_SIZE`] bytes; alignment does not matter.
    #[inline]
    pub fn from_le_bytes(bytes: &[u8]) -> Self {
        let raw: Transition = bytemuck::pod_read_unaligned(&bytes[..TRANSITION_SIZE]);
        Self {
            sym_in: u16::from_le(raw.sym_in),
            sym_out: u16::from_le(raw.sym_out),
            trans_info: u32::from_le(raw.trans_info),
        }
    }

    /// Packs the fields into a record value.
    pub fn new(sym_in: u16, sym_out: u16, target_state: u32, more_transitions: u8) -> Self {
        Self {
            sym_in,
            sym_out,
            trans_info: (target_state & 0x00FF_FFFF) | (u32::from(more_transitions) << 24),
        }
    }

    /// Encodes the record in the canonical little-endian layout.
    pub fn to_le_bytes(&self) -> [u8; TRANSITION_SIZE] {
        let mut out = [0u8; TRANSITION_SIZE];
        LittleEndian::write_u16(&mut out[0..2], self.sym_in);
        LittleEndian::write_u16(&mut out[2..4], self.sym_out);
        LittleEndian::write_u32(&mut out[4..8], self.trans_info);
        out
    }

    #[inline]
    pub fn target_state(&self) -> u32 {
        self.trans_info & 0x00FF_FFFF
    }

    #[inline]
    pub fn more_transitions(&self) -> u8 {
        (self.trans_info >> 24) as u8
    }

    #[inline]
    pub fn is_final(&self) -> bool {
        self.sym_in == FINAL_SYM
    }
}

/// Overflow cell stored directly after a head whose `more_transitions` is 255.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct OverflowCell {
    pub _padding: u32,
    pub more_transitions: u32,
}

impl OverflowCell {
    #[inline]
    pub fn from_le_bytes(bytes: &[u8]) -> Self {
        let raw: OverflowCell = bytemuck::pod_read_unaligned(&bytes[..TRANSITION_SIZE]);
        Self {
            _padding: u32::from_le(raw._padding),
            more_transitions: u32::from_le(raw.more_transitions),
        }
    }

    pub fn to_le_bytes(&self) -> [u8; TRANSITION_SIZE] {
        let mut out = [0u8; TRANSITION_SIZE];
        LittleEndian::write_u32(&mut out[0..4], self._padding);
        LittleEndian::write_u32(&mut out[4..8], self.more_transitions);
        out
    }
}

const _: () = assert!(size_of::<Transition>() == TRANSITION_SIZE);
const _: () = assert!(size_of::<OverflowCell>() == TRANSITION_SIZE);

/// Read-only view of the transition table region of a loaded image.
#[derive(Clone, Copy)]
pub struct TransitionTable<'a> {
    bytes: &'a [u8],
}

impl<'a> TransitionTable<'a> {
    /// Wraps the bytes from `transitionStart` to the end of the image.
    /// A trailing partial record is ignored.
    pub fn new(bytes: &'a [u8]) -> Self {
        let whole = bytes.len() - bytes.len() % TRANSITION_SIZE;
        Self {
            bytes: &bytes[..whole],
        }
    }

    /// Number of 8-byte slots, overflow cells included.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len() / TRANSITION_SIZE
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The record at `index`. Panics if `index` is past the table end.
    #[inline]
    pub fn record(&self, index: u32) -> Transition {
        let start = index as usize * TRANSITION_SIZE;
        Transition::from_le_bytes(&self.bytes[start..start + TRANSITION_SIZE])
    }

    #[inline]
    pub fn get(&self, index: u32) -> Option<Transition> {
        ((index as usize) < self.len()).then(|| self.record(index))
    }

    /// Last valid position (relative to the head) in the run of `state`.
    ///
    /// Positions `0..=max_tc` belong to the state. When the head announces an
    /// overflow, position 1 is the overflow cell and the count it stores is
    /// one less than the last position. A count of `u32::MAX` saturates;
    /// [`validate`](Self::validate) rejects such tables.
    #[inline]
    pub fn max_tc(&self, state: u32) -> u32 {
        self.checked_max_tc(state).unwrap_or(u32::MAX)
    }

    fn checked_max_tc(&self, state: u32) -> Option<u32> {
        let head = self.record(state);
        let more = head.more_transitions();
        if more == OVERFLOW_MARKER {
            let start = (state as usize + 1) * TRANSITION_SIZE;
            let cell = OverflowCell::from_le_bytes(&self.bytes[start..start + TRANSITION_SIZE]);
            cell.more_transitions.checked_add(1)
        } else {
            Some(u32::from(more))
        }
    }

    /// Walks every state reachable from state 0 the way traversal does and
    /// checks that each run lies within the table, that each non-final
    /// record uses symbols below `symbol_count` and that its target is a
    /// valid state, so traversal never reads out of bounds.
    pub fn validate(&self, symbol_count: usize) -> Result<(), VfstError> {
        let len = self.len();
        if len == 0 {
            return Err(VfstError::CorruptTransitionTable(
                "empty transition table".to_string(),
            ));
        }
        if len > u32::MAX as usize {
            return Err(VfstError::CorruptTransitionTable(format!(
                "{len} records exceed the addressable range"
            )));
        }

        let mut visited = vec![false; len];
        let mut pending = vec![0u32];
        visited[0] = true;
        while let Some(state) = pending.pop() {
            let max_tc = self.check_state(state)?;
            for position in 0..=max_tc {
                if position == 1 && max_tc >= 255 {
                    continue;
                }
                let index = state + position;
                let t = self.record(index);
                if t.is_final() {
                    continue;
                }
                if usize::from(t.sym_in.max(t.sym_out)) >= symbol_count {
                    return Err(VfstError::CorruptTransitionTable(format!(
                        "record {index}: symbol out of range ({} -> {})",
                        t.sym_in, t.sym_out
                    )));
                }
                let target = t.target_state();
                if target as usize >= len {
                    return Err(VfstError::CorruptTransitionTable(format!(
                        "record {index}: state {target} is past the table end"
                    )));
                }
                if !visited[target as usize] {
                    visited[target as usize] = true;
                    pending.push(target);
                }
            }
        }
        Ok(())
    }

    /// Checks the run of `state` and returns its `max_tc`.
    fn check_state(&self, state: u32) -> Result<u32, VfstError> {
        let len = self.len() as u64;
        let head = self.get(state).ok_or_else(|| {
            VfstError::CorruptTransitionTable(format!("state {state} is past the table end"))
        })?;
        if head.more_transitions() == OVERFLOW_MARKER && u64::from(state) + 1 >= len {
            return Err(VfstError::CorruptTransitionTable(format!(
                "state {state} is missing its overflow cell"
            )));
        }
        let max_tc = self.checked_max_tc(state).ok_or_else(|| {
            VfstError::CorruptTransitionTable(format!(
                "state {state} has an out-of-range overflow count"
            ))
        })?;
        if u64::from(state) + u64::from(max_tc) >= len {
            return Err(VfstError::CorruptTransitionTable(format!(
                "state {state} runs past the table end"
            )));
        }
        Ok(max_tc)
    }
}

impl std::fmt::Debug for TransitionTable<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionTable")
            .field("len", &self.len())
            .finish()
    }
}
