//! Line-based command entry.
//!
//! One command per line as `<tick> <dataId> <x> <y>`, separated by spaces,
//! tabs or commas. `sample` swaps in the built-in sample attack. An empty
//! line or end of input finishes entry.

use std::io::{self, BufRead, Write};

use raid_core::prelude::*;

/// The built-in sample attack.
pub fn sample_commands() -> Vec<BattleCommand> {
    vec![
        BattleCommand::new(63, 1_000_001, 56, 38),
        BattleCommand::new(126, 1_000_002, 47, 49),
        BattleCommand::new(189, 1_000_000, 40, 42),
        BattleCommand::new(252, 500_000_001, 50, 40),
    ]
}

/// A parsed input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    /// Blank line.
    Finish,
    /// Load the sample attack.
    Sample,
    /// A well-formed command.
    Command(BattleCommand),
    /// Not four fields.
    WrongFieldCount,
    /// A field is not an integer.
    InvalidNumber,
}

/// Parse one input line.
pub fn parse_entry(line: &str) -> Entry {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Entry::Finish;
    }
    if trimmed.eq_ignore_ascii_case("sample") {
        return Entry::Sample;
    }

    let fields: Vec<&str> = trimmed
        .split([' ', '\t', ','])
        .filter(|f| !f.is_empty())
        .collect();
    if fields.len() != 4 {
        return Entry::WrongFieldCount;
    }

    let mut values = [0i32; 4];
    for (value, field) in values.iter_mut().zip(&fields) {
        match field.parse() {
            Ok(v) => *value = v,
            Err(_) => return Entry::InvalidNumber,
        }
    }
    let [tick, data_id, x, y] = values;
    Entry::Command(BattleCommand::new(tick, data_id, x, y))
}

/// Read commands from `input`, prompting on `output`.
///
/// Starts from `initial` (e.g. a preloaded command file). Falls back to the
/// sample attack if nothing was entered.
pub fn read_commands<R, W>(
    input: R,
    output: &mut W,
    initial: Vec<BattleCommand>,
) -> io::Result<Vec<BattleCommand>>
where
    R: BufRead,
    W: Write,
{
    let mut commands = initial;

    writeln!(output)?;
    writeln!(output, "Enter one command per line: <tick> <dataId> <x> <y>")?;
    writeln!(output, "Empty line to finish, 'sample' for the sample attack.")?;
    writeln!(output, "Example: 63 1000001 56 38")?;
    writeln!(output)?;

    let mut lines = input.lines();
    loop {
        write!(output, "> ")?;
        output.flush()?;

        let Some(line) = lines.next().transpose()? else {
            break;
        };

        match parse_entry(&line) {
            Entry::Finish => break,
            Entry::Sample => {
                commands = sample_commands();
                writeln!(
                    output,
                    "Loaded {} sample commands. Empty line to run, or keep adding.",
                    commands.len()
                )?;
            }
            Entry::Command(command) => commands.push(command),
            Entry::WrongFieldCount => {
                writeln!(output, "Expected four numbers: <tick> <dataId> <x> <y>")?;
            }
            Entry::InvalidNumber => writeln!(output, "Invalid number, try again.")?,
        }
    }

    if commands.is_empty() {
        writeln!(output, "No commands entered, using the sample attack.")?;
        return Ok(sample_commands());
    }
    Ok(commands)
}
