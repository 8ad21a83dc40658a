//! Structured-manual emission (§4.4, §6 "Structured-manual output"): the
//! `pod` mode writes the documentation walker's sections verbatim to
//! standard output, with no external formatter in the loop (that only
//! happens when the `c` emitter embeds compiled help text).

use crate::types::Ir;
use ecow::EcoString;
use foldhash::fast::RandomState;
use std::collections::HashSet;
use std::io::Write;

pub fn emit<W: Write>(
    out: &mut W,
    ir: &Ir,
    doc: &roxmltree::Document,
    defs: &HashSet<EcoString, RandomState>,
) -> anyhow::Result<()> {
    let mut doc_defs = defs.clone();
    doc_defs.insert(EcoString::from("DOC"));

    // man-page pass: `optgroup-reference` is a no-op, back-references cover it.
    let sections = crate::docwalker::walk(doc, ir, &doc_defs, false)?;

    writeln!(out, "=encoding utf8")?;
    writeln!(out)?;
    write!(out, "{}", crate::docwalker::render_document(&sections))?;
    Ok(())
}
