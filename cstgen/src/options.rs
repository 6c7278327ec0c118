/// Knobs for a synthesis run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SynthesisOptions {
    /// Largest numeric range that gets expanded into one variant per value.
    /// Larger ranges are rejected as unsupported.
    pub max_range_len: u32,
    /// Whether prose values become opaque terminals. When false they are
    /// rejected.
    pub allow_prose: bool,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        SynthesisOptions {
            max_range_len: 65_536,
            allow_prose: true,
        }
    }
}

impl SynthesisOptions {
    pub fn max_range_len(mut self, len: u32) -> Self {
        self.max_range_len = len;
        self
    }

    pub fn allow_prose(mut self, allow: bool) -> Self {
        self.allow_prose = allow;
        self
    }
}
