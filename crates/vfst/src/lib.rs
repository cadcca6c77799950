//! VFST (Voikko Finite State Transducer) runtime engine.
//!
//! This crate loads unweighted VFST binary transducers and enumerates the
//! outputs of every accepting path for a given input, honouring the flag
//! diacritic constraints encoded in the transducer alphabet.
//!
//! # Architecture
//!
//! - [`format`] -- Header cookies, byte order detection and table alignment
//! - [`swap`] -- Structural byte swap of foreign-order images
//! - [`buffer`] -- Owned backing storage (memory map or swapped copy)
//! - [`transition`] -- Transition record layout and state run lengths
//! - [`symbols`] -- Symbol table (string-to-id and id-to-string mapping)
//! - [`flags`] -- Flag diacritic operations (P, C, U, R, D)
//! - [`config`] -- Per-query traversal state (explicit DFS stack) and lookup options
//! - [`transducer`] -- Loading and `prepare`/`next` traversal
//!
//! # Example
//!
//! ```no_run
//! use vfst::{LookupOptions, Transducer};
//!
//! let transducer = Transducer::load("mor.vfst")?;
//! let options = LookupOptions::default();
//! let mut config = transducer.new_config(options.stack_capacity);
//! for output in transducer.analyses(&mut config, "koira", &options) {
//!     println!("{}", output?);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod buffer;
pub mod config;
pub mod flags;
pub mod format;
pub mod swap;
pub mod symbols;
pub mod transducer;
pub mod transition;

pub use config::{Configuration, LookupOptions};
pub use symbols::{SymbolClass, SymbolTable};
pub use transducer::{Analyses, Transducer};

/// Error raised while loading a transducer.
///
/// [`VfstError::Io`] covers files that cannot be opened or mapped; every
/// other variant means the data itself is not a usable VFST image.
#[derive(Debug, thiserror::Error)]
pub enum VfstError {
    #[error("transducer file could not be read: {0}")]
    Io(#[from] std::io::Error),
    #[error("unknown byte order or file type")]
    InvalidMagic,
    #[error("file too short: expected at least {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },
    #[error("invalid symbol table: {0}")]
    InvalidSymbolTable(String),
    #[error("invalid flag diacritic: {0}")]
    InvalidFlagDiacritic(String),
    #[error("corrupt transition table: {0}")]
    CorruptTransitionTable(String),
}

impl VfstError {
    /// `true` when the file could not be read at all.
    pub fn is_file_error(&self) -> bool {
        matches!(self, VfstError::Io(_))
    }

    /// `true` when the file was read but its contents are malformed.
    pub fn is_format_error(&self) -> bool {
        !self.is_file_error()
    }
}

/// Call-scoped failure of [`Transducer::next`].
///
/// These never invalidate the configuration: the caller may retry with a
/// larger output capacity or configuration, or give up on the word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// The accepted output plus its terminator does not fit the capacity.
    #[error("output needs {needed} bytes but capacity is {capacity}")]
    OutputOverflow { needed: usize, capacity: usize },
    /// Descending would exceed the configuration's fixed stack capacity.
    #[error("search depth exceeds configuration capacity of {capacity}")]
    StackOverflow { capacity: usize },
}
