//! Core error types, dump configuration, output sink and text accumulation
//! shared by the PowerPoint structure dumper.

pub mod binary;
pub mod config;
pub mod error;
pub mod output;
pub mod text;

pub use config::DumpConfig;
pub use error::{Error, Result};
pub use output::{encode_name, Output};
pub use text::TextAccumulator;
