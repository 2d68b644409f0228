//! Policy command: shows the policy `costs` would apply.

use std::io::Write;

use anyhow::{Context, Result};

use crate::Config;
use crate::cli::PolicyArgs;

pub fn run<W: Write>(
    writer: &mut W,
    config: &Config,
    overrides: &PolicyArgs,
    json: bool,
) -> Result<()> {
    let policy = overrides.apply(config.policy);
    policy.validate().context("invalid pricing policy")?;

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&policy)?)?;
    } else {
        write!(writer, "{}", policy.formula())?;
    }
    Ok(())
}
