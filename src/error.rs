use std::fmt::Display;

/// A declaration violates one of the schema invariants in §3/§4.1: bad
/// identifiers, conflicting option keys, duplicate names, ordering
/// violations, a dangling `optgroup-reference`.
pub fn schema_error(msg: impl Display) -> anyhow::Error {
    anyhow::anyhow!("schema error: {msg}")
}

/// An element was opened where it is not legal, or the conditional stack
/// is malformed (unknown PI target, unmatched `endif`, mismatched `ifdef`
/// nesting depth).
pub fn context_error(msg: impl Display) -> anyhow::Error {
    anyhow::anyhow!("context error: {msg}")
}

/// The external structured-manual-to-text formatter could not be spawned
/// or exited non-zero.
pub fn external_tool_error(msg: impl Display) -> anyhow::Error {
    anyhow::anyhow!("external tool error: {msg}")
}

/// The declarations file could not be read from disk.
pub fn io_error(msg: impl Display) -> anyhow::Error {
    anyhow::anyhow!("I/O error: {msg}")
}
