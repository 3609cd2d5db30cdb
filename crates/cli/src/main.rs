//! CLI tool for dumping the internal structure of PowerPoint 97-2003 files.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use ppt_dump_core::{DumpConfig, Output};
use ppt_dump_ole::CfbContainer;
use ppt_dump_ppt::{emit_text, PptDumper};
use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

/// Dump the records, directory and property sets of a .ppt file.
#[derive(Parser, Debug)]
#[command(name = "ppt-dump")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input PowerPoint file (.ppt)
    input: PathBuf,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Print the FAT sector list and the directory and mini FAT chains
    #[arg(long)]
    show_sector_chain: bool,

    /// Suppress the structure dump
    #[arg(long)]
    no_struct_output: bool,

    /// Print the text found in text atoms after the dump
    #[arg(long)]
    dump_text: bool,
}

impl Args {
    fn config(&self) -> DumpConfig {
        DumpConfig::new()
            .with_debug(self.debug)
            .with_show_sector_chain(self.show_sector_chain)
            .with_no_struct_output(self.no_struct_output)
            .with_dump_text(self.dump_text)
    }
}

fn main() -> Result<ExitCode> {
    let (argv, dropped) = filter_args(std::env::args_os());
    let args = Args::parse_from(argv);

    // Initialize logging
    if args.debug {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    for option in &dropped {
        log::warn!("Ignoring unknown option {}", option.to_string_lossy());
    }

    let config = args.config();
    log::debug!("Dumping {} with {:?}", args.input.display(), config);

    let data = std::fs::read(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let mut container = CfbContainer::from_bytes(data, &config)
        .with_context(|| format!("Failed to open {}", args.input.display()))?;

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    let outcome = {
        let mut out = Output::new(&mut handle).with_muted(config.no_struct_output);
        let outcome = PptDumper::new(config).dump(&mut container, &mut out)?;
        out.flush()?;
        outcome
    };

    emit_text(&outcome, &config, &mut handle)?;
    handle.flush()?;

    if outcome.succeeded() {
        Ok(ExitCode::SUCCESS)
    } else {
        log::error!("FAILURE");
        Ok(ExitCode::FAILURE)
    }
}

/// Split the command line into what [`Args`] understands and unknown options.
///
/// Everything after `--` and every positional argument is kept.
fn filter_args<I>(args: I) -> (Vec<OsString>, Vec<OsString>)
where
    I: IntoIterator<Item = OsString>,
{
    let command = Args::command();
    let mut longs: Vec<String> = vec!["help".to_string(), "version".to_string()];
    let mut shorts: Vec<char> = vec!['h', 'V'];
    for arg in command.get_arguments() {
        longs.extend(arg.get_long().map(str::to_string));
        shorts.extend(arg.get_short());
    }

    let mut kept = Vec::new();
    let mut dropped = Vec::new();
    let mut args = args.into_iter();

    // Program name.
    kept.extend(args.next());

    let mut passthrough = false;
    for arg in args {
        let known = match arg.to_str() {
            _ if passthrough => true,
            Some("--") => {
                passthrough = true;
                true
            }
            Some(s) if s.starts_with("--") => {
                let name = s[2..].split('=').next().unwrap_or_default();
                longs.iter().any(|long| long == name)
            }
            Some(s) if s.len() > 1 && s.starts_with('-') => {
                s[1..].chars().all(|c| shorts.contains(&c))
            }
            _ => true,
        };

        if known {
            kept.push(arg);
        } else {
            dropped.push(arg);
        }
    }

    (kept, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(args: &[&str]) -> (Vec<String>, Vec<String>) {
        let (kept, dropped) = filter_args(args.iter().map(OsString::from));
        let strings = |v: Vec<OsString>| {
            v.into_iter()
                .map(|s| s.into_string().unwrap())
                .collect::<Vec<_>>()
        };
        (strings(kept), strings(dropped))
    }

    #[test]
    fn test_known_options_kept() {
        let (kept, dropped) = split(&[
            "ppt-dump",
            "--debug",
            "--show-sector-chain",
            "--no-struct-output",
            "--dump-text",
            "slides.ppt",
        ]);
        assert_eq!(kept.len(), 6);
        assert!(dropped.is_empty());
    }

    #[test]
    fn test_unknown_options_dropped() {
        let (kept, dropped) = split(&["ppt-dump", "--verbose", "-x", "--debug", "slides.ppt"]);
        assert_eq!(kept, vec!["ppt-dump", "--debug", "slides.ppt"]);
        assert_eq!(dropped, vec!["--verbose", "-x"]);
    }

    #[test]
    fn test_help_and_passthrough() {
        let (kept, dropped) = split(&["ppt-dump", "-h", "--", "--not-an-option"]);
        assert_eq!(kept, vec!["ppt-dump", "-h", "--", "--not-an-option"]);
        assert!(dropped.is_empty());

        let (kept, _) = split(&["ppt-dump", "--help"]);
        assert_eq!(kept, vec!["ppt-dump", "--help"]);
    }

    #[test]
    fn test_filtered_args_parse() {
        let (kept, _) = filter_args(
            ["ppt-dump", "--bogus", "--dump-text", "slides.ppt"]
                .iter()
                .map(OsString::from),
        );
        let args = Args::try_parse_from(kept).unwrap();
        assert!(args.dump_text);
        assert!(!args.debug);
        assert_eq!(args.input, PathBuf::from("slides.ppt"));

        let config = args.config();
        assert!(config.dump_text);
        assert!(!config.no_struct_output);
    }

    #[test]
    fn test_lone_dash_is_positional() {
        let (kept, dropped) = split(&["ppt-dump", "-"]);
        assert_eq!(kept, vec!["ppt-dump", "-"]);
        assert!(dropped.is_empty());
    }

    #[test]
    fn verify_cli() {
        Args::command().debug_assert();
    }
}
