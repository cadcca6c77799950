// Backing storage of a loaded transducer.
//
// A file in canonical byte order is used straight from its read-only memory
// map. A foreign-order file is swapped into a heap copy and the map is dropped
// as soon as the copy exists. Either way the transducer owns exactly one
// buffer and releases it when dropped.

use std::fs::File;
use std::ops::Deref;
use std::path::Path;

use memmap2::Mmap;

use crate::VfstError;
use crate::format::{self, ByteOrder, HEADER_SIZE};
use crate::swap;

pub enum TransducerBuffer {
    /// Read-only map of a canonical-order file.
    Mapped(Mmap),
    /// Canonical-order copy of a foreign-order image.
    Swapped(Box<[u8]>),
    /// Copy of caller-provided canonical-order bytes.
    Copied(Box<[u8]>),
}

impl TransducerBuffer {
    /// Maps `path` and normalizes its byte order.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, VfstError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let len = file.metadata()?.len() as usize;
        if len < HEADER_SIZE {
            return Err(VfstError::TooShort {
                expected: HEADER_SIZE,
                actual: len,
            });
        }

        // Safety: the map is read-only. Dictionary files are not expected to
        // be modified while a transducer built from them is alive.
        let map = unsafe { Mmap::map(&file)? };
        log::debug!("mapped {} ({} bytes)", path.display(), map.len());

        match format::detect_byte_order(&map)? {
            ByteOrder::Native => Ok(TransducerBuffer::Mapped(map)),
            ByteOrder::Swapped => {
                let swapped = swap::byte_swap_image(&map)?;
                drop(map);
                Ok(TransducerBuffer::Swapped(swapped.into_boxed_slice()))
            }
        }
    }

    /// Copies an in-memory image, swapping it if needed.
    pub fn from_bytes(data: &[u8]) -> Result<Self, VfstError> {
        let buffer = match format::detect_byte_order(data)? {
            ByteOrder::Native => TransducerBuffer::Copied(data.into()),
            ByteOrder::Swapped => {
                TransducerBuffer::Swapped(swap::byte_swap_image(data)?.into_boxed_slice())
            }
        };
        Ok(buffer)
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self, TransducerBuffer::Mapped(_))
    }

    pub fn is_byte_swapped(&self) -> bool {
        matches!(self, TransducerBuffer::Swapped(_))
    }
}

impl Deref for TransducerBuffer {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        match self {
            TransducerBuffer::Mapped(map) => &map[..],
            TransducerBuffer::Swapped(bytes) | TransducerBuffer::Copied(bytes) => &bytes[..],
        }
    }
}

impl std::fmt::Debug for TransducerBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            TransducerBuffer::Mapped(_) => "Mapped",
            TransducerBuffer::Swapped(_) => "Swapped",
            TransducerBuffer::Copied(_) => "Copied",
        };
        f.debug_struct("TransducerBuffer")
            .field("kind", &kind)
            .field("len", &self.len())
            .finish()
    }
}
