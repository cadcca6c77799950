// Transducer loading and `prepare`/`next` traversal.

use std::iter::FusedIterator;
use std::path::Path;

use crate::buffer::TransducerBuffer;
use crate::config::{Configuration, LookupOptions};
use crate::flags::FlagCheck;
use crate::format::{HEADER_SIZE, align_to_transition};
use crate::symbols::SymbolTable;
use crate::transition::{Transition, TransitionTable};
use crate::{LookupError, VfstError};

/// Position in a state's run occupied by the overflow cell.
const OVERFLOW_SLOT: u32 = 1;

/// Unweighted VFST transducer.
///
/// Immutable once loaded; share it by reference across threads and give each
/// thread its own [`Configuration`].
pub struct Transducer {
    buffer: TransducerBuffer,
    symbols: SymbolTable,
    transition_start: usize,
}

impl std::fmt::Debug for Transducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transducer")
            .field("buffer", &self.buffer)
            .field("symbols", &self.symbols)
            .field("transition_count", &self.transition_count())
            .finish()
    }
}

impl Transducer {
    /// Maps the file at `path` and parses it.
    ///
    /// A missing or unreadable file yields [`VfstError::Io`]; anything else
    /// wrong with the contents is a format error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, VfstError> {
        Self::from_buffer(TransducerBuffer::open(path)?)
    }

    /// Parses an in-memory image. The bytes are copied.
    pub fn from_bytes(data: &[u8]) -> Result<Self, VfstError> {
        Self::from_buffer(TransducerBuffer::from_bytes(data)?)
    }

    fn from_buffer(buffer: TransducerBuffer) -> Result<Self, VfstError> {
        let (symbols, symbols_end) = SymbolTable::parse(&buffer, HEADER_SIZE)?;
        let transition_start = align_to_transition(symbols_end);
        if transition_start > buffer.len() {
            return Err(VfstError::TooShort {
                expected: transition_start,
                actual: buffer.len(),
            });
        }

        let table = TransitionTable::new(&buffer[transition_start..]);
        table.validate(symbols.symbol_count())?;
        log::debug!(
            "loaded transducer: {} symbols, {} transition slots, byte-swapped: {}",
            symbols.symbol_count(),
            table.len(),
            buffer.is_byte_swapped()
        );

        Ok(Self {
            buffer,
            symbols,
            transition_start,
        })
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn flag_feature_count(&self) -> u16 {
        self.symbols.flag_feature_count()
    }

    /// Number of 8-byte slots in the transition table, overflow cells included.
    pub fn transition_count(&self) -> usize {
        self.transitions().len()
    }

    /// `true` if the image was stored in foreign byte order.
    pub fn is_byte_swapped(&self) -> bool {
        self.buffer.is_byte_swapped()
    }

    #[inline]
    pub fn transitions(&self) -> TransitionTable<'_> {
        TransitionTable::new(&self.buffer[self.transition_start..])
    }

    /// Creates a configuration sized for this transducer's flag features.
    pub fn new_config(&self, capacity: usize) -> Configuration {
        Configuration::new(self.symbols.flag_feature_count(), capacity)
    }

    /// Resets `config` and tokenizes `input` one character at a time.
    ///
    /// Returns `false` at the first character with no symbol. The
    /// configuration is then left exhausted, so [`next`](Self::next) yields
    /// nothing until the next `prepare`.
    pub fn prepare(&self, config: &mut Configuration, input: &str) -> bool {
        config.reset(self.symbols.flag_feature_count());
        for (start, ch) in input.char_indices() {
            let span = &input[start..start + ch.len_utf8()];
            match self.symbols.id(span) {
                Some(id) => config.input_symbol_stack.push(id),
                None => {
                    log::trace!("no symbol for {span:?} in {input:?}");
                    config.current_transition_stack[0] = self.transitions().max_tc(0) + 1;
                    return false;
                }
            }
        }
        true
    }

    /// Returns the output of the next accepting path, or `None` once the
    /// search is exhausted.
    ///
    /// `output_capacity` counts a terminator byte, as the analyzers store
    /// outputs in NUL-terminated buffers. When the output does not fit, the
    /// call fails and the cursor stays on the accepting transition.
    pub fn next(
        &self,
        config: &mut Configuration,
        output_capacity: usize,
    ) -> Result<Option<String>, LookupError> {
        let table = self.transitions();
        let first_normal = self.symbols.first_normal_char();

        loop {
            // Scan the remaining transitions of the state at this level.
            let depth = config.stack_depth;
            let state = config.state_index_stack[depth];
            let max_tc = table.max_tc(state);
            let mut index = config.current_transition_stack[depth];
            let mut followed = None;

            while index - state <= max_tc {
                if index - state == OVERFLOW_SLOT && max_tc >= 255 {
                    index += 1;
                    continue;
                }
                let transition = table.record(index);
                if transition.is_final() {
                    if config.input_depth == config.input_length() {
                        let output = self.collect_output(config, output_capacity)?;
                        config.current_transition_stack[depth] = index + 1;
                        return Ok(Some(output));
                    }
                } else if let Some(update) = self.followable(config, &transition) {
                    followed = Some((index, transition, update));
                    break;
                }
                index += 1;
            }

            match followed {
                // Descend.
                Some((index, transition, update)) => {
                    if depth + 2 >= config.capacity() {
                        return Err(LookupError::StackOverflow {
                            capacity: config.capacity(),
                        });
                    }
                    config.output_symbol_stack[depth] = if transition.sym_out >= first_normal {
                        transition.sym_out
                    } else {
                        0
                    };
                    config.current_transition_stack[depth] = index;
                    config.push_flags(update);
                    config.stack_depth += 1;
                    let target = transition.target_state();
                    config.state_index_stack[depth + 1] = target;
                    config.current_transition_stack[depth + 1] = target;
                    if transition.sym_in >= first_normal {
                        config.input_depth += 1;
                    }
                    log::trace!(
                        "descend {} -> {} via {}:{} (depth {})",
                        state,
                        target,
                        transition.sym_in,
                        transition.sym_out,
                        depth + 1
                    );
                }
                // Ascend.
                None => {
                    if depth == 0 {
                        config.current_transition_stack[0] = index;
                        return Ok(None);
                    }
                    let parent = depth - 1;
                    config.stack_depth = parent;
                    let led_here = table.record(config.current_transition_stack[parent]);
                    if led_here.sym_in >= first_normal {
                        config.input_depth -= 1;
                    }
                    config.current_transition_stack[parent] += 1;
                    log::trace!("ascend from {} (depth {})", state, parent);
                }
            }
        }
    }

    /// Decides whether `transition` may be followed from the current level.
    ///
    /// `None` means blocked. Otherwise the inner value is the flag update to
    /// apply on descent.
    fn followable(
        &self,
        config: &Configuration,
        transition: &Transition,
    ) -> Option<Option<(u16, u16)>> {
        let sym_in = transition.sym_in;
        let consumes = config.input_depth < config.input_length()
            && config.input_symbol_stack[config.input_depth] == sym_in;
        if !consumes && sym_in >= self.symbols.first_normal_char() {
            return None;
        }
        self.flag_diacritic_check(config, sym_in)
    }

    fn flag_diacritic_check(
        &self,
        config: &Configuration,
        symbol: u16,
    ) -> Option<Option<(u16, u16)>> {
        if self.symbols.flag_feature_count() == 0 {
            return Some(None);
        }
        let Some(ofv) = self.symbols.diacritic(symbol) else {
            return Some(None);
        };
        match ofv.check(config.flag_value(ofv.feature)) {
            FlagCheck::Reject => None,
            FlagCheck::Accept => Some(None),
            FlagCheck::Update(value) => Some(Some((ofv.feature, value))),
        }
    }

    fn collect_output(
        &self,
        config: &Configuration,
        capacity: usize,
    ) -> Result<String, LookupError> {
        let mut output = String::new();
        for &symbol in &config.output_symbol_stack[..config.stack_depth] {
            output.push_str(self.symbols.text(symbol).unwrap_or_default());
        }
        let needed = output.len() + 1;
        if needed > capacity {
            return Err(LookupError::OutputOverflow { needed, capacity });
        }
        Ok(output)
    }

    /// Prepares `config` for `input` and iterates over its outputs.
    ///
    /// Stops after `options.max_results` outputs, at exhaustion, or after the
    /// first error. An input with unknown characters yields nothing.
    pub fn analyses<'t, 'c>(
        &'t self,
        config: &'c mut Configuration,
        input: &str,
        options: &LookupOptions,
    ) -> Analyses<'t, 'c> {
        let done = !self.prepare(config, input);
        Analyses {
            transducer: self,
            config,
            output_capacity: options.output_capacity,
            remaining: options.max_results,
            done,
        }
    }

    /// Collects every output for `input` using a fresh configuration.
    pub fn lookup(
        &self,
        input: &str,
        options: &LookupOptions,
    ) -> Result<Vec<String>, LookupError> {
        let mut config = self.new_config(options.stack_capacity);
        self.analyses(&mut config, input, options).collect()
    }
}

/// Iterator returned by [`Transducer::analyses`].
pub struct Analyses<'t, 'c> {
    transducer: &'t Transducer,
    config: &'c mut Configuration,
    output_capacity: usize,
    remaining: usize,
    done: bool,
}

impl Iterator for Analyses<'_, '_> {
    type Item = Result<String, LookupError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.remaining == 0 {
            return None;
        }
        match self.transducer.next(self.config, self.output_capacity) {
            Ok(Some(output)) => {
                self.remaining -= 1;
                Some(Ok(output))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

impl FusedIterator for Analyses<'_, '_> {}

const _: () = {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Transducer>();
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{COOKIE1, COOKIE2};
    use crate::transition::{FINAL_SYM, OVERFLOW_MARKER, OverflowCell};

    fn build_image(symbols: &[&str], records: &[[u8; 8]]) -> Vec<u8> {
        let mut data = vec![0u8; HEADER_SIZE];
        data[..4].copy_from_slice(&COOKIE1.to_le_bytes());
        data[4..8].copy_from_slice(&COOKIE2.to_le_bytes());
        data.extend_from_slice(&(symbols.len() as u16).to_le_bytes());
        for sym in symbols {
            data.extend_from_slice(sym.as_bytes());
            data.push(0);
        }
        data.resize(align_to_transition(data.len()), 0);
        for record in records {
            data.extend_from_slice(record);
        }
        data
    }

    fn t(sym_in: u16, sym_out: u16, target: u32, more: u8) -> [u8; 8] {
        Transition::new(sym_in, sym_out, target, more).to_le_bytes()
    }

    fn fin() -> [u8; 8] {
        t(FINAL_SYM, 0, 0, 0)
    }

    /// Accepts "ab" with output "xy".
    fn simple() -> Transducer {
        Transducer::from_bytes(&build_image(
            &["", "a", "b", "x", "y"],
            &[t(1, 3, 1, 0), t(2, 4, 2, 0), fin()],
        ))
        .unwrap()
    }

    #[test]
    fn simple_path() {
        let fst = simple();
        let mut config = fst.new_config(100);
        assert!(fst.prepare(&mut config, "ab"));
        assert_eq!(config.input_symbols(), &[1, 2]);
        assert_eq!(fst.next(&mut config, 64), Ok(Some("xy".to_string())));
        assert_eq!(fst.next(&mut config, 64), Ok(None));
        assert_eq!(fst.next(&mut config, 64), Ok(None));
    }

    #[test]
    fn partial_input_does_not_accept() {
        let fst = simple();
        let mut config = fst.new_config(100);
        assert!(fst.prepare(&mut config, "a"));
        assert_eq!(fst.next(&mut config, 64), Ok(None));
    }

    #[test]
    fn unknown_character() {
        let fst = simple();
        let mut config = fst.new_config(100);
        assert!(!fst.prepare(&mut config, "az"));
        assert_eq!(config.input_symbols(), &[1]);
        assert_eq!(fst.next(&mut config, 64), Ok(None));

        assert!(fst.prepare(&mut config, "ab"));
        assert_eq!(fst.next(&mut config, 64), Ok(Some("xy".to_string())));
    }

    #[test]
    fn output_overflow_keeps_cursor() {
        let fst = simple();
        let mut config = fst.new_config(100);
        assert!(fst.prepare(&mut config, "ab"));
        assert_eq!(
            fst.next(&mut config, 1),
            Err(LookupError::OutputOverflow {
                needed: 3,
                capacity: 1
            })
        );
        assert_eq!(fst.next(&mut config, 3), Ok(Some("xy".to_string())));
        assert_eq!(fst.next(&mut config, 3), Ok(None));
    }

    #[test]
    fn epsilon_branch() {
        // State 0: epsilon -> 2, 'a' -> 3. State 2: 'a' -> 3. State 3: final.
        let fst = Transducer::from_bytes(&build_image(
            &["", "a"],
            &[t(0, 0, 2, 1), t(1, 1, 3, 0), t(1, 1, 3, 0), fin()],
        ))
        .unwrap();
        let outputs = fst.lookup("a", &LookupOptions::default()).unwrap();
        assert_eq!(outputs, vec!["a".to_string(), "a".to_string()]);
    }

    #[test]
    fn flag_outputs_are_dropped() {
        // '@P.X.Y@' on the way to 'a'; its output symbol never appears.
        let fst = Transducer::from_bytes(&build_image(
            &["", "@P.X.Y@", "a"],
            &[t(1, 1, 1, 0), t(2, 2, 2, 0), fin()],
        ))
        .unwrap();
        assert_eq!(fst.flag_feature_count(), 1);
        assert_eq!(
            fst.lookup("a", &LookupOptions::default()).unwrap(),
            vec!["a".to_string()]
        );
    }

    #[test]
    fn overflow_slot_skipped() {
        // State 0 has 300 transitions; only the last one matches 'b'.
        let mut records = vec![t(1, 1, 301, OVERFLOW_MARKER)];
        records.push(
            OverflowCell {
                _padding: 0,
                more_transitions: 299,
            }
            .to_le_bytes(),
        );
        for _ in 0..298 {
            records.push(t(1, 1, 301, 0));
        }
        records.push(t(2, 2, 301, 0));
        records.push(fin());
        let fst = Transducer::from_bytes(&build_image(&["", "a", "b"], &records)).unwrap();

        let mut config = fst.new_config(10);
        assert!(fst.prepare(&mut config, "b"));
        assert_eq!(fst.next(&mut config, 64), Ok(Some("b".to_string())));
        assert_eq!(fst.next(&mut config, 64), Ok(None));

        let outputs = fst
            .lookup("a", &LookupOptions::default().with_max_results(1000))
            .unwrap();
        assert_eq!(outputs.len(), 299);
    }

    #[test]
    fn stack_capacity_exceeded() {
        let fst = simple();
        let mut config = fst.new_config(2);
        assert!(fst.prepare(&mut config, "ab"));
        assert_eq!(
            fst.next(&mut config, 64),
            Err(LookupError::StackOverflow { capacity: 2 })
        );
    }

    #[test]
    fn max_results_bounds_iteration() {
        let fst = Transducer::from_bytes(&build_image(
            &["", "a"],
            &[t(0, 0, 2, 1), t(1, 1, 3, 0), t(1, 1, 3, 0), fin()],
        ))
        .unwrap();
        let options = LookupOptions::default().with_max_results(1);
        assert_eq!(fst.lookup("a", &options).unwrap().len(), 1);
    }

    #[test]
    fn load_rejects_garbage() {
        let err = Transducer::from_bytes(&[0u8; 32]).unwrap_err();
        assert!(matches!(err, VfstError::InvalidMagic));
        assert!(err.is_format_error());
    }

    #[test]
    fn load_rejects_bad_target() {
        let err = Transducer::from_bytes(&build_image(&["", "a"], &[t(1, 1, 5, 0), fin()]))
            .unwrap_err();
        assert!(matches!(err, VfstError::CorruptTransitionTable(_)));
    }

    #[test]
    fn accessors() {
        let fst = simple();
        assert_eq!(fst.transition_count(), 3);
        assert_eq!(fst.symbols().symbol_count(), 5);
        assert!(!fst.is_byte_swapped());
        assert_eq!(fst.flag_feature_count(), 0);
    }
}
