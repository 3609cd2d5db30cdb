//! Dump configuration resolved from the command line.

/// Flags that shape a single dump session.
///
/// The configuration is built once before the directory walk starts and is
/// only read afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DumpConfig {
    /// Verbose diagnostics in the decoders.
    pub debug: bool,

    /// Print sector chain diagnostics along with the container header.
    pub show_sector_chain: bool,

    /// Suppress the structural dump (mutes the output sink).
    pub no_struct_output: bool,

    /// Emit the accumulated text once the walk is over.
    pub dump_text: bool,
}

impl DumpConfig {
    /// Create a configuration with every flag off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable verbose diagnostics.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Enable or disable sector chain diagnostics.
    pub fn with_show_sector_chain(mut self, show: bool) -> Self {
        self.show_sector_chain = show;
        self
    }

    /// Enable or disable suppression of the structural output.
    pub fn with_no_struct_output(mut self, suppress: bool) -> Self {
        self.no_struct_output = suppress;
        self
    }

    /// Enable or disable the final text dump.
    pub fn with_dump_text(mut self, dump: bool) -> Self {
        self.dump_text = dump;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_all_off() {
        let config = DumpConfig::new();
        assert!(!config.debug);
        assert!(!config.show_sector_chain);
        assert!(!config.no_struct_output);
        assert!(!config.dump_text);
    }

    #[test]
    fn test_builder_sets_flags() {
        let config = DumpConfig::new()
            .with_debug(true)
            .with_show_sector_chain(true)
            .with_no_struct_output(true)
            .with_dump_text(true);

        assert!(config.debug);
        assert!(config.show_sector_chain);
        assert!(config.no_struct_output);
        assert!(config.dump_text);
    }
}
