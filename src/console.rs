//! Line-oriented prompt for submitting alerts, listing them and starting the
//! monitor.

use std::fmt::Write as _;
use std::io::BufRead;

use tokio::sync::mpsc;
use tracing::warn;

use crate::model::{Alert, DEFAULT_SYMBOL, DEFAULT_TARGET, Direction, NewAlert};

pub const USAGE: &str = "\
commands:
  add [SYMBOL] [TARGET] [above|below]   add an alert (defaults: BTCUSDT 70000 above)
  list                                  show all alerts
  start                                 start monitoring
  help                                  show this message
  quit                                  exit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Add(NewAlert),
    List,
    Start,
    Help,
    Quit,
    Empty,
}

/// Parse one input line. Omitted `add` arguments take the form defaults.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(Command::Empty);
    };

    match verb.to_ascii_lowercase().as_str() {
        "add" => parse_add(words.collect()),
        "list" | "ls" => Ok(Command::List),
        "start" => Ok(Command::Start),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(format!("unknown command \"{other}\"; type \"help\"")),
    }
}

fn parse_add(args: Vec<&str>) -> Result<Command, String> {
    if args.len() > 3 {
        return Err("usage: add [SYMBOL] [TARGET] [above|below]".into());
    }

    let symbol = args.first().copied().unwrap_or(DEFAULT_SYMBOL).to_owned();
    let target = match args.get(1) {
        Some(raw) => raw
            .replace('_', "")
            .parse::<f64>()
            .map_err(|_| format!("target price \"{raw}\" is not a number"))?,
        None => DEFAULT_TARGET,
    };
    let direction = match args.get(2) {
        Some(raw) => Direction::from_str(raw)
            .ok_or_else(|| format!("direction \"{raw}\" must be \"above\" or \"below\""))?,
        None => Direction::Above,
    };

    Ok(Command::Add(NewAlert {
        symbol,
        target,
        direction,
    }))
}

/// Read lines from `reader` on a dedicated OS thread and forward them.
///
/// A blocking stdin read cannot be cancelled; it must stay off the runtime's
/// blocking pool or runtime shutdown waits for the next line of input. The
/// channel closes on EOF, on a read error, or once the receiver is dropped.
pub fn spawn_line_reader<R>(reader: R) -> mpsc::Receiver<String>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in reader.lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    warn!(error = %e, "failed to read console input");
                    break;
                }
            };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Render alerts as a fixed-width table in insertion order.
pub fn render_table(alerts: &[Alert]) -> String {
    if alerts.is_empty() {
        return "no alerts yet; use \"add\"".into();
    }

    let symbol_width = alerts
        .iter()
        .map(|a| a.symbol.len())
        .max()
        .unwrap_or(0)
        .max("symbol".len());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>3}  {:<symbol_width$}  {:>14}  {:<9}  {:<8}  {}",
        "#", "symbol", "target", "direction", "added", "triggered"
    );
    for (i, alert) in alerts.iter().enumerate() {
        let triggered = match alert.triggered_at {
            Some(at) => format!("yes ({})", at.format("%H:%M:%S")),
            None => "no".into(),
        };
        let _ = writeln!(
            out,
            "{:>3}  {:<symbol_width$}  {:>14}  {:<9}  {:<8}  {}",
            i,
            alert.symbol,
            alert.target,
            alert.direction,
            alert.created_at.format("%H:%M:%S"),
            triggered
        );
    }
    out.truncate(out.trim_end().len());
    out
}
