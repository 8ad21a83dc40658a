pub mod cli;
pub mod docwalker;
pub mod emit_header;
pub mod emit_impl;
pub mod emit_pod;
pub mod error;
pub mod formatter;
pub mod ident;
pub mod ingest;
pub mod quoting;
pub mod reader;
pub mod types;
pub mod writer;

pub use cli::{Cli, Mode};
pub use types::{Argument, Command, Ir, Opt, OptGroup};

use ecow::EcoString;
use foldhash::fast::RandomState;
use std::collections::HashSet;

/// Runs the full `mode`-selected pipeline against `cli.path` and writes
/// the chosen artifact to `out` (§2 "Emit").
pub fn run<W: std::io::Write>(cli: &Cli, out: &mut W) -> anyhow::Result<()> {
    let defs: HashSet<EcoString, RandomState> = cli.define.iter().map(EcoString::from).collect();
    let source = std::fs::read_to_string(&cli.path)
        .map_err(|e| error::io_error(format!("cannot read {}: {e}", cli.path.display())))?;
    let doc = roxmltree::Document::parse(&source)
        .map_err(|e| error::io_error(format!("malformed XML in {}: {e}", cli.path.display())))?;
    let ir = ingest::ingest(&doc, &defs)?;

    match cli.mode {
        Mode::H => {
            let mut w = writer::Writer::new(out);
            emit_header::emit(&mut w, &ir)
        }
        Mode::C => {
            let mut w = writer::Writer::new(out);
            emit_impl::emit(&mut w, &ir, &doc, &defs)
        }
        Mode::Pod => emit_pod::emit(out, &ir, &doc, &defs),
    }
}
