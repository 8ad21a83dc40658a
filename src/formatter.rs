//! Invokes the external structured-manual-to-text formatter (§4.4, §5: the
//! only place this crate leaves its own process).

use crate::error::external_tool_error;
use std::io::Write;
use std::process::{Command, Stdio};

pub fn pod_to_text(pod: &str, indent: u32, add_encoding: bool) -> anyhow::Result<String> {
    let mut child = Command::new("pod2text")
        .arg("-c")
        .arg(format!("-i{indent}"))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| external_tool_error(format!("failed to spawn pod2text: {e}")))?;

    // Write stdin from a side thread, same as Python's Popen.communicate():
    // pod2text can start filling its stdout pipe before it has read all of
    // its input, and that pipe has a bounded OS buffer, so writing stdin to
    // completion on this thread before touching stdout risks a deadlock.
    let mut stdin = child.stdin.take().expect("stdin was piped");
    let payload = pod.to_string();
    let writer = std::thread::spawn(move || -> std::io::Result<()> {
        if add_encoding {
            stdin.write_all(b"=encoding utf8\n\n")?;
        }
        stdin.write_all(payload.as_bytes())
    });

    let output = child
        .wait_with_output()
        .map_err(|e| external_tool_error(format!("failed to wait for pod2text: {e}")))?;

    writer
        .join()
        .map_err(|_| external_tool_error("pod2text stdin writer thread panicked"))?
        .map_err(|e| external_tool_error(format!("failed to write to pod2text: {e}")))?;

    if !output.status.success() {
        return Err(external_tool_error(format!(
            "pod2text exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    String::from_utf8(output.stdout).map_err(|e| external_tool_error(format!("pod2text produced non-UTF-8 output: {e}")))
}
