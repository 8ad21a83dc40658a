//! The invocation surface (§6 "Invocation surface"). Treated as an ambient
//! concern built with `clap`'s derive API.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// The three output artifacts selectable at invocation (§6).
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Header mode: struct layouts and entry-point prototypes only.
    H,
    /// Implementation mode: parser tables, dispatcher, registry, help text.
    C,
    /// Structured-manual documentation mode.
    Pod,
}

/// Generates C headers, implementations, and man-page source from a
/// declarative XML command grammar.
#[derive(Parser, Debug)]
#[command(name = "cmdgen", version, about)]
pub struct Cli {
    /// Which artifact to emit.
    pub mode: Mode,

    /// Path to the XML declarations file.
    pub path: PathBuf,

    /// Raise the log level to DEBUG.
    #[arg(long)]
    pub debug: bool,

    /// Seed the definitions set used to gate `ifdef`/`ifndef` blocks.
    /// Repeatable.
    #[arg(short = 'D', long = "define", value_name = "NAME")]
    pub define: Vec<String>,

    /// Reserved for build-rule compatibility; accepted but unused (§9 Open
    /// Questions).
    #[arg(long, value_name = "PATH")]
    pub includes: Option<PathBuf>,
}
