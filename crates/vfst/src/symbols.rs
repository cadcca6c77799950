// Symbol table: id-to-string and string-to-id mapping plus id classification.

use hashbrown::HashMap;

use crate::VfstError;
use crate::flags::{FlagDiacriticEncoder, OpFeatureValue};

/// Id of the epsilon symbol.
pub const EPSILON: u16 = 0;

/// Which part of the alphabet a symbol id belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolClass {
    Epsilon,
    /// `@...@` control symbol; never consumes input.
    FlagDiacritic,
    /// Ordinary symbol, usually a single character.
    Normal,
    /// `[...]` tag symbol.
    MultiChar,
}

/// Parsed symbol table of a VFST image.
///
/// Symbols are stored in the order epsilon, flag diacritics, normal
/// symbols, multi-character symbols. The two thresholds mark where the
/// latter two groups begin; either is 0 when the group is absent.
pub struct SymbolTable {
    strings: Vec<Box<str>>,
    string_to_symbol: HashMap<Box<str>, u16>,
    /// Flag diacritic for id `i` lives at index `i - 1`.
    diacritics: Vec<OpFeatureValue>,
    first_normal_char: u16,
    first_multi_char: u16,
    flag_feature_count: u16,
}

impl SymbolTable {
    /// Parses the symbol count and strings starting at `offset`.
    ///
    /// Returns the table and the offset just past the last terminator. The
    /// caller aligns that offset to find the transition table.
    pub fn parse(data: &[u8], offset: usize) -> Result<(Self, usize), VfstError> {
        if offset + 2 > data.len() {
            return Err(VfstError::TooShort {
                expected: offset + 2,
                actual: data.len(),
            });
        }

        let symbol_count = u16::from_le_bytes([data[offset], data[offset + 1]]);
        let mut pos = offset + 2;

        let mut strings: Vec<Box<str>> = Vec::with_capacity(symbol_count as usize);
        let mut string_to_symbol: HashMap<Box<str>, u16> =
            HashMap::with_capacity(symbol_count as usize);
        let mut diacritics = Vec::new();
        let mut first_normal_char: u16 = 0;
        let mut first_multi_char: u16 = 0;
        let mut encoder = FlagDiacriticEncoder::new();

        for i in 0..symbol_count {
            let len = data[pos..].iter().position(|&b| b == 0).ok_or_else(|| {
                VfstError::InvalidSymbolTable(format!("unterminated symbol string {i}"))
            })?;
            let text = std::str::from_utf8(&data[pos..pos + len])
                .map_err(|_| VfstError::InvalidSymbolTable(format!("invalid UTF-8 in symbol {i}")))?;
            pos += len + 1;

            if first_normal_char == 0 && i > 0 && !text.starts_with('@') {
                first_normal_char = i;
            }
            if first_normal_char != 0 && first_multi_char == 0 && text.starts_with('[') {
                first_multi_char = i;
            }
            if first_normal_char == 0 && i > 0 {
                diacritics.push(encoder.parse(text)?);
            }

            string_to_symbol.entry(Box::from(text)).or_insert(i);
            strings.push(Box::from(text));
        }

        let table = SymbolTable {
            strings,
            string_to_symbol,
            diacritics,
            first_normal_char,
            first_multi_char,
            flag_feature_count: encoder.feature_count(),
        };
        log::debug!(
            "read {} symbols: first normal {}, first multi-char {}, {} flag features",
            symbol_count,
            first_normal_char,
            first_multi_char,
            table.flag_feature_count
        );
        Ok((table, pos))
    }

    pub fn symbol_count(&self) -> usize {
        self.strings.len()
    }

    /// Text of `id`, or `None` past the end of the table.
    #[inline]
    pub fn text(&self, id: u16) -> Option<&str> {
        self.strings.get(id as usize).map(|s| &**s)
    }

    /// Id whose text is exactly `text`. When a text occurs twice the
    /// lower id wins.
    #[inline]
    pub fn id(&self, text: &str) -> Option<u16> {
        self.string_to_symbol.get(text).copied()
    }

    /// Parsed flag diacritic for a flag symbol id.
    #[inline]
    pub fn diacritic(&self, id: u16) -> Option<&OpFeatureValue> {
        if id == EPSILON {
            return None;
        }
        self.diacritics.get(id as usize - 1)
    }

    pub fn classify(&self, id: u16) -> Option<SymbolClass> {
        if id as usize >= self.strings.len() {
            return None;
        }
        let class = if id == EPSILON {
            SymbolClass::Epsilon
        } else if self.first_normal_char == 0 || id < self.first_normal_char {
            SymbolClass::FlagDiacritic
        } else if self.first_multi_char != 0 && id >= self.first_multi_char {
            SymbolClass::MultiChar
        } else {
            SymbolClass::Normal
        };
        Some(class)
    }

    #[inline]
    pub fn first_normal_char(&self) -> u16 {
        self.first_normal_char
    }

    #[inline]
    pub fn first_multi_char(&self) -> u16 {
        self.first_multi_char
    }

    #[inline]
    pub fn flag_feature_count(&self) -> u16 {
        self.flag_feature_count
    }
}

impl std::fmt::Debug for SymbolTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymbolTable")
            .field("symbol_count", &self.strings.len())
            .field("first_normal_char", &self.first_normal_char)
            .field("first_multi_char", &self.first_multi_char)
            .field("flag_feature_count", &self.flag_feature_count)
            .finish()
    }
}
