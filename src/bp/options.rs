//! Decoder configuration.

/// What to do when a block fails to decode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DecodeMode {
    /// Abort the whole file on the first error.
    #[default]
    Strict,
    /// Record the error, skip what cannot be understood and resume at the
    /// next plausible block boundary.
    Forensic,
}

/// How a variable block's 8-byte length is counted.
///
/// Writers disagree by exactly 8 bytes across format revisions, so the
/// convention is an explicit choice rather than a fixed formula.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum VmdLengthConvention {
    /// Length counts from the length field itself (excludes the opening tag).
    #[default]
    FromLengthField,
    /// Length counts the bytes after the length field.
    AfterLengthField,
}

impl VmdLengthConvention {
    /// Absolute end of a block whose length field starts at `length_offset`.
    ///
    /// Returns `None` if the end does not fit in a `u64`.
    pub const fn block_end(self, length_offset: u64, declared: u64) -> Option<u64> {
        match self {
            Self::FromLengthField => length_offset.checked_add(declared),
            Self::AfterLengthField => match length_offset.checked_add(8) {
                Some(start) => start.checked_add(declared),
                None => None,
            },
        }
    }
}

/// Options shared by every decoder in a pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DecodeOptions {
    pub mode: DecodeMode,
    pub vmd_length: VmdLengthConvention,
    /// Variable blocks are followed by their payload (data files).
    pub expect_payload: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            mode: DecodeMode::Strict,
            vmd_length: VmdLengthConvention::FromLengthField,
            expect_payload: true,
        }
    }
}

impl DecodeOptions {
    pub fn strict() -> Self {
        Self::default()
    }

    pub fn forensic() -> Self {
        Self::default().with_mode(DecodeMode::Forensic)
    }

    pub fn with_mode(mut self, mode: DecodeMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_vmd_length(mut self, convention: VmdLengthConvention) -> Self {
        self.vmd_length = convention;
        self
    }

    pub fn with_payload(mut self, expect_payload: bool) -> Self {
        self.expect_payload = expect_payload;
        self
    }

    #[inline]
    pub fn is_forensic(&self) -> bool {
        self.mode == DecodeMode::Forensic
    }
}
