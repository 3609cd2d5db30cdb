//! Text accumulated from decoded streams.
//!
//! Decoders append fragments while the directory walk runs; the buffer is
//! read exactly once after the walk, with carriage returns turned into line
//! feeds (PowerPoint stores paragraph breaks as `\r`).

/// Ordered, append-only collection of extracted text fragments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextAccumulator {
    fragments: Vec<String>,
}

impl TextAccumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment.
    pub fn append(&mut self, fragment: impl Into<String>) {
        let fragment = fragment.into();
        log::trace!("accumulated {} chars of text", fragment.len());
        self.fragments.push(fragment);
    }

    /// Number of fragments appended so far.
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Fragments in append order.
    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    /// Raw concatenation of every fragment.
    pub fn contents(&self) -> String {
        self.fragments.concat()
    }

    /// Contents with every `\r` replaced by `\n`.
    pub fn normalized(&self) -> String {
        self.contents().replace('\r', "\n")
    }
}
