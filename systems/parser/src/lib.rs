#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that turns raw snapshot text into a classified [`Grid`].
//!
//! Snapshots are line-delimited rows of whitespace-delimited tokens. Rows are
//! validated for rectangularity before any token is classified, so a ragged
//! snapshot always reports [`ParseError::RaggedGrid`] and never yields a
//! partial grid.

use sweepview_core::{
    CellCoord, CellKind, Grid, ParseError, StackCount, OBSTACLE_MARKER, ROBOT_MARKER,
    TRASHCAN_MARKER,
};

/// Characters stripped from rows when no explicit configuration is provided.
///
/// Covers the quoting and list brackets emitted by Python list dumps.
pub const DEFAULT_QUOTE_CHARS: [char; 5] = ['\'', '"', '[', ']', ','];

const ESCAPED_NEWLINE: &str = "\\n";

/// Configuration parameters required to construct the parser.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    quote_chars: Vec<char>,
}

impl Config {
    /// Creates a configuration that strips the provided characters from rows.
    #[must_use]
    pub fn new(quote_chars: impl IntoIterator<Item = char>) -> Self {
        Self {
            quote_chars: quote_chars.into_iter().collect(),
        }
    }

    /// Characters treated as quoting artifacts.
    #[must_use]
    pub fn quote_chars(&self) -> &[char] {
        &self.quote_chars
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_QUOTE_CHARS)
    }
}

/// Snapshot parser holding the artifact-stripping configuration.
#[derive(Clone, Debug, Default)]
pub struct Parser {
    config: Config,
}

impl Parser {
    /// Creates a parser using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Parses a raw snapshot into a rectangular grid of classified cells.
    pub fn parse(&self, raw: &str) -> Result<Grid, ParseError> {
        let rows: Vec<(usize, Vec<String>)> = split_rows(raw)
            .enumerate()
            .map(|(line, row)| (line, self.tokenize(row)))
            .filter(|(_, tokens)| !tokens.is_empty())
            .collect();

        let Some((_, first)) = rows.first() else {
            return Err(ParseError::EmptyInput);
        };
        let expected = first.len();
        if let Some((line, row)) = rows.iter().find(|(_, row)| row.len() != expected) {
            return Err(ParseError::RaggedGrid {
                row: to_u32(*line),
                expected: to_u32(expected),
                found: to_u32(row.len()),
            });
        }

        let mut classified = Vec::with_capacity(rows.len());
        for (row_index, (_, tokens)) in rows.iter().enumerate() {
            let mut cells = Vec::with_capacity(tokens.len());
            for (column_index, token) in tokens.iter().enumerate() {
                let cell = CellCoord::new(to_u32(column_index), to_u32(row_index));
                cells.push(classify(token, cell)?);
            }
            classified.push(cells);
        }

        Grid::from_rows(classified)
    }

    fn tokenize(&self, row: &str) -> Vec<String> {
        let cleaned: String = row
            .chars()
            .map(|c| {
                if self.config.quote_chars.contains(&c) {
                    ' '
                } else {
                    c
                }
            })
            .collect();
        cleaned.split_whitespace().map(str::to_owned).collect()
    }
}

/// Parses a snapshot using the default configuration.
pub fn parse(raw: &str) -> Result<Grid, ParseError> {
    Parser::default().parse(raw)
}

/// Classifies a single token.
///
/// Precedence is fixed: obstacle marker, robot marker, trashcan marker, then
/// unsigned integers. `0` is empty floor, `1..=8` is stacked trash and larger
/// values are reported as [`ParseError::OutOfRangeStack`]. Anything else,
/// including zero-padded numbers such as `08`, is [`CellKind::Invalid`].
pub fn classify(token: &str, cell: CellCoord) -> Result<CellKind, ParseError> {
    match token {
        OBSTACLE_MARKER => return Ok(CellKind::Obstacle),
        ROBOT_MARKER => return Ok(CellKind::RobotSpawn),
        TRASHCAN_MARKER => return Ok(CellKind::TrashcanSpawn),
        _ => {}
    }

    let zero_padded = token.len() > 1 && token.starts_with('0');
    if token.is_empty() || zero_padded || !token.bytes().all(|byte| byte.is_ascii_digit()) {
        return Ok(CellKind::Invalid(token.to_owned()));
    }

    // All-digit tokens too long for u64 are still stacks, just absurd ones.
    let value = token.parse::<u64>().unwrap_or(u64::MAX);
    if value == 0 {
        return Ok(CellKind::Empty);
    }

    u8::try_from(value)
        .ok()
        .and_then(StackCount::new)
        .map(CellKind::Trash)
        .ok_or(ParseError::OutOfRangeStack { cell, value })
}

/// Checks a parsed grid against server-declared dimensions.
pub fn verify_dimensions(grid: &Grid, rows: u32, columns: u32) -> Result<(), ParseError> {
    if grid.rows() == rows && grid.columns() == columns {
        return Ok(());
    }

    Err(ParseError::DimensionMismatch {
        expected_rows: rows,
        expected_columns: columns,
        rows: grid.rows(),
        columns: grid.columns(),
    })
}

fn split_rows(raw: &str) -> Box<dyn Iterator<Item = &str> + '_> {
    if !raw.trim().contains('\n') && raw.contains(ESCAPED_NEWLINE) {
        Box::new(raw.split(ESCAPED_NEWLINE))
    } else {
        Box::new(raw.lines())
    }
}

fn to_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
