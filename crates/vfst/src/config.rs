// Per-query traversal state and lookup options.
//
// A `Configuration` holds the explicit DFS stack used by
// `Transducer::next`. Flag values are kept as one snapshot row per stack
// level: descending copies the parent row into the next slot and applies the
// update there, so backtracking is a plain depth decrement.

/// Default stack capacity and output capacity used by the analyzers.
pub const DEFAULT_BUFFER_SIZE: usize = 2000;

/// Default cap on the number of outputs collected per word.
pub const DEFAULT_MAX_RESULTS: usize = 100;

/// Caller-owned, reusable traversal state.
///
/// The capacity is fixed at construction. A search that would go deeper
/// fails with [`LookupError::StackOverflow`](crate::LookupError) instead of
/// growing the stacks.
pub struct Configuration {
    capacity: usize,
    feature_count: usize,

    pub(crate) stack_depth: usize,
    /// Number of input symbols consumed on the current path.
    pub(crate) input_depth: usize,

    /// Head record index of the state at each level.
    pub(crate) state_index_stack: Vec<u32>,
    /// Resumption cursor at each level (absolute record index).
    pub(crate) current_transition_stack: Vec<u32>,
    /// Tokenized input, filled by `prepare`.
    pub(crate) input_symbol_stack: Vec<u16>,
    /// Output symbol recorded at each level (0 for epsilon and flags).
    pub(crate) output_symbol_stack: Vec<u16>,
    /// Flattened `[level * feature_count + feature]` flag snapshots.
    flag_value_stack: Vec<u16>,
}

impl Configuration {
    /// Creates a configuration for a transducer with `feature_count` flag
    /// features and room for `capacity` stack levels.
    pub fn new(feature_count: u16, capacity: usize) -> Self {
        let rows = capacity.max(1);
        let fc = feature_count as usize;
        Self {
            capacity,
            feature_count: fc,
            stack_depth: 0,
            input_depth: 0,
            state_index_stack: vec![0; rows],
            current_transition_stack: vec![0; rows],
            input_symbol_stack: Vec::new(),
            output_symbol_stack: vec![0; rows],
            flag_value_stack: vec![0; rows * fc],
        }
    }

    /// Rewinds to the root of the search and clears the input.
    ///
    /// The flag stack is re-shaped when `feature_count` differs from the
    /// count the configuration was built for.
    pub fn reset(&mut self, feature_count: u16) {
        let fc = feature_count as usize;
        if fc != self.feature_count {
            self.feature_count = fc;
            self.flag_value_stack = vec![0; self.capacity.max(1) * fc];
        } else {
            self.flag_value_stack[..fc].fill(0);
        }
        self.stack_depth = 0;
        self.input_depth = 0;
        self.state_index_stack[0] = 0;
        self.current_transition_stack[0] = 0;
        self.input_symbol_stack.clear();
    }

    /// Maximum number of stack levels.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn stack_depth(&self) -> usize {
        self.stack_depth
    }

    /// Symbol ids of the prepared input.
    #[inline]
    pub fn input_symbols(&self) -> &[u16] {
        &self.input_symbol_stack
    }

    #[inline]
    pub fn input_length(&self) -> usize {
        self.input_symbol_stack.len()
    }

    /// Value of `feature` on the current path.
    #[inline]
    pub(crate) fn flag_value(&self, feature: u16) -> u16 {
        self.flag_value_stack[self.stack_depth * self.feature_count + feature as usize]
    }

    /// Copies the current flag row into the next level and applies `update`.
    pub(crate) fn push_flags(&mut self, update: Option<(u16, u16)>) {
        let fc = self.feature_count;
        if fc == 0 {
            return;
        }
        let from = self.stack_depth * fc;
        self.flag_value_stack.copy_within(from..from + fc, from + fc);
        if let Some((feature, value)) = update {
            self.flag_value_stack[from + fc + feature as usize] = value;
        }
    }
}

impl std::fmt::Debug for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Configuration")
            .field("capacity", &self.capacity)
            .field("feature_count", &self.feature_count)
            .field("stack_depth", &self.stack_depth)
            .field("input_depth", &self.input_depth)
            .field("input_symbols", &self.input_symbol_stack)
            .finish()
    }
}

/// Buffer sizes and result limits for a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LookupOptions {
    /// Stack levels of the configuration.
    pub stack_capacity: usize,
    /// Output capacity in bytes, terminator included.
    pub output_capacity: usize,
    /// Outputs returned per word before enumeration stops.
    pub max_results: usize,
}

impl Default for LookupOptions {
    fn default() -> Self {
        Self {
            stack_capacity: DEFAULT_BUFFER_SIZE,
            output_capacity: DEFAULT_BUFFER_SIZE,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

impl LookupOptions {
    pub fn with_stack_capacity(mut self, capacity: usize) -> Self {
        self.stack_capacity = capacity;
        self
    }

    pub fn with_output_capacity(mut self, capacity: usize) -> Self {
        self.output_capacity = capacity;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }
}
