use crate::damper::{IterationState, SignalDamper};
use anyhow::{Context, Result};
use std::io::{BufRead, Write};

/// Feed JSON-lines iteration states through the damper, writing one damped
/// state per input line. Blank lines are skipped. Returns the number of states
/// processed.
pub fn replay<R: BufRead, W: Write>(
    damper: &mut SignalDamper,
    input: R,
    mut output: W,
) -> Result<usize> {
    let mut count = 0;
    for (lineno, line) in input.lines().enumerate() {
        let line = line.with_context(|| format!("reading line {}", lineno + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let state: IterationState = serde_json::from_str(trimmed)
            .with_context(|| format!("parsing iteration state on line {}", lineno + 1))?;
        let damped = damper.protect(state);
        serde_json::to_writer(&mut output, &damped)?;
        output.write_all(b"\n")?;
        count += 1;
    }
    output.flush()?;
    Ok(count)
}
