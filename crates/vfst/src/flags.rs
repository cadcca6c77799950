// Flag diacritics: symbol syntax, feature/value interning and the
// constraint check applied whenever traversal follows a transition.

use hashbrown::HashMap;

use crate::VfstError;

/// Value of a feature that has not been set on the current path.
pub const FLAG_VALUE_NEUTRAL: u16 = 0;

/// Wildcard value: "any non-neutral value" for require/disallow.
pub const FLAG_VALUE_ANY: u16 = 1;

/// Flag diacritic operation, from the character after the leading `@`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FlagOp {
    /// `P`: set the feature to the value.
    Set,
    /// `C`: reset the feature to neutral.
    Clear,
    /// `U`: set if neutral, pass if equal, fail otherwise.
    Unify,
    /// `R`: fail unless the feature holds the value (or any value).
    Require,
    /// `D`: fail if the feature holds the value (or any value).
    Disallow,
}

impl FlagOp {
    /// Maps an operator character, or `None` for anything else.
    pub fn from_byte(op: u8) -> Option<Self> {
        match op {
            b'P' => Some(FlagOp::Set),
            b'C' => Some(FlagOp::Clear),
            b'U' => Some(FlagOp::Unify),
            b'R' => Some(FlagOp::Require),
            b'D' => Some(FlagOp::Disallow),
            _ => None,
        }
    }
}

/// A parsed flag diacritic with interned feature and value ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OpFeatureValue {
    pub op: FlagOp,
    pub feature: u16,
    pub value: u16,
}

/// Outcome of checking one flag diacritic against the current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagCheck {
    /// Constraint violated; the transition must not be followed.
    Reject,
    /// Allowed, feature unchanged.
    Accept,
    /// Allowed, feature takes the given value on the new level.
    Update(u16),
}

impl OpFeatureValue {
    /// Applies the operation to `current`, the feature's value on the path.
    pub fn check(&self, current: u16) -> FlagCheck {
        match self.op {
            FlagOp::Set => FlagCheck::Update(self.value),
            FlagOp::Clear => FlagCheck::Update(FLAG_VALUE_NEUTRAL),
            FlagOp::Unify => {
                if current == FLAG_VALUE_NEUTRAL {
                    FlagCheck::Update(self.value)
                } else if current == self.value {
                    FlagCheck::Accept
                } else {
                    FlagCheck::Reject
                }
            }
            FlagOp::Require => {
                let satisfied = if self.value == FLAG_VALUE_ANY {
                    current != FLAG_VALUE_NEUTRAL
                } else {
                    current == self.value
                };
                if satisfied {
                    FlagCheck::Accept
                } else {
                    FlagCheck::Reject
                }
            }
            FlagOp::Disallow => {
                if (self.value == FLAG_VALUE_ANY && current != FLAG_VALUE_NEUTRAL)
                    || current == self.value
                {
                    FlagCheck::Reject
                } else {
                    FlagCheck::Accept
                }
            }
        }
    }
}

/// Interning tables for flag diacritic features and values, filled while
/// the symbol table is read.
pub struct FlagDiacriticEncoder {
    features: HashMap<Box<[u8]>, u16>,
    values: HashMap<Box<[u8]>, u16>,
}

impl Default for FlagDiacriticEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FlagDiacriticEncoder {
    pub fn new() -> Self {
        let mut values = HashMap::new();
        values.insert(Box::from(&b""[..]), FLAG_VALUE_NEUTRAL);
        values.insert(Box::from(&b"@"[..]), FLAG_VALUE_ANY);
        Self {
            features: HashMap::new(),
            values,
        }
    }

    pub fn feature_count(&self) -> u16 {
        self.features.len() as u16
    }

    pub fn value_count(&self) -> u16 {
        self.values.len() as u16
    }

    /// Parses `@OP.FEATURE.VALUE@` or `@OP.FEATURE@`.
    ///
    /// A missing value means [`FLAG_VALUE_ANY`], not neutral: `@C.CASE@`
    /// and `@R.CASE@` both refer to "any value of CASE".
    pub fn parse(&mut self, symbol: &str) -> Result<OpFeatureValue, VfstError> {
        let bytes = symbol.as_bytes();
        if bytes.len() <= 4 {
            return Err(VfstError::InvalidFlagDiacritic(format!(
                "too short: {symbol:?}"
            )));
        }

        let op = FlagOp::from_byte(bytes[1]).unwrap_or_else(|| {
            log::warn!(
                "unknown flag diacritic operation {:?} in {symbol:?}, treating as disallow",
                bytes[1] as char
            );
            FlagOp::Disallow
        });

        // Names are byte ranges; byte 3 need not start a character.
        let inner = &bytes[3..bytes.len() - 1];
        let (feature_name, value_name) = match inner.iter().position(|&b| b == b'.') {
            Some(dot) => (&inner[..dot], &inner[dot + 1..]),
            None => (inner, &b"@"[..]),
        };

        let feature = intern(&mut self.features, feature_name);
        let value = intern(&mut self.values, value_name);

        Ok(OpFeatureValue { op, feature, value })
    }
}

fn intern(table: &mut HashMap<Box<[u8]>, u16>, name: &[u8]) -> u16 {
    if let Some(&id) = table.get(name) {
        return id;
    }
    let id = table.len() as u16;
    table.insert(Box::from(name), id);
    id
}
