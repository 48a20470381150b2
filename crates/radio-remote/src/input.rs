//! Line protocol read from stdin.

use anyhow::{Result, anyhow, bail};
use station_player::ButtonId;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputCommand {
    /// Button went down.
    Down(ButtonId),
    /// Button came up; the held time decides short or long.
    Up(ButtonId),
    /// Press already judged long by the sender.
    Long(ButtonId),
    /// Down and up in one line.
    Click(ButtonId),
    Stop,
    Status,
    Quit,
}

/// Parse one input line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Result<Option<InputCommand>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let mut parts = line.split_whitespace();
    let verb = parts.next().unwrap_or_default().to_ascii_lowercase();
    let arg = parts.next();
    if let Some(extra) = parts.next() {
        bail!("unexpected argument '{extra}'");
    }

    let button = || {
        arg.map(ButtonId::from)
            .ok_or_else(|| anyhow!("'{verb}' needs a button id"))
    };
    let command = match verb.as_str() {
        "down" => InputCommand::Down(button()?),
        "up" => InputCommand::Up(button()?),
        "long" => InputCommand::Long(button()?),
        "click" => InputCommand::Click(button()?),
        "stop" => InputCommand::Stop,
        "status" => InputCommand::Status,
        "quit" | "exit" => InputCommand::Quit,
        other => bail!("unknown command '{other}'"),
    };
    Ok(Some(command))
}
