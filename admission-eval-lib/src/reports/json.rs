use crate::Result;
use core::fmt::Write;
use serde::Serialize;

pub fn generate<W: Write, T: Serialize>(report: &T, pretty: bool, writer: &mut W) -> Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(report)?
    } else {
        serde_json::to_string(report)?
    };

    writeln!(writer, "{text}")?;
    Ok(())
}
