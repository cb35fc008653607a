//! `calfeed expand`: turn saved events into occurrences.

use std::path::{Path, PathBuf};

use tracing::info;

use calfeed_core::{Expansion, MalformedPolicy, expand};

use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::store;

/// Reads events from `input`, expands them and writes the occurrences to
/// `output`. Nothing is written when expansion fails.
pub fn expand_file(input: &Path, output: &Path, policy: MalformedPolicy) -> ClientResult<Expansion> {
    let events = store::load_events(input)?;
    let expansion = expand(&events, policy)?;
    store::save_json(output, &expansion.events)?;

    info!(
        input = %input.display(),
        output = %output.display(),
        occurrences = expansion.events.len(),
        "Saved expanded events"
    );
    Ok(expansion)
}

pub fn run(
    config: &ClientConfig,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    policy: Option<MalformedPolicy>,
) -> ClientResult<()> {
    let input = input.unwrap_or_else(|| config.paths.calendar.clone());
    let output = output.unwrap_or_else(|| config.paths.expanded.clone());
    let policy = policy.unwrap_or(config.expand.on_malformed);

    let expansion = expand_file(&input, &output, policy)?;
    print_summary(&expansion, &output);
    Ok(())
}

/// Prints the expansion outcome to stdout.
pub(crate) fn print_summary(expansion: &Expansion, output: &Path) {
    println!(
        "Saved {} occurrences from {} recurring events to {}",
        expansion.events.len(),
        expansion.recurring,
        output.display()
    );
    if !expansion.skipped.is_empty() {
        println!(
            "Skipped {} malformed events: {}",
            expansion.skipped.len(),
            expansion.skipped.join(", ")
        );
    }
}
