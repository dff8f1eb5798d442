//! A1-style addressing: 1-based (column, row) pairs to `"AA12"` and back, plus the
//! handful of range shapes the logger asks a store for.

use std::fmt;

use crate::error::{Result, SheetError};

/// Convert a 1-based column index to bijective base-26 letters (1 -> A, 27 -> AA).
pub fn column_letters(col: u32) -> Result<String> {
    if col == 0 {
        return Err(SheetError::InvalidArgument { col, row: 1 });
    }
    let mut letters = Vec::new();
    let mut rest = col;
    while rest > 0 {
        let rem = ((rest - 1) % 26) as u8;
        letters.push((b'A' + rem) as char);
        rest = (rest - 1) / 26;
    }
    Ok(letters.into_iter().rev().collect())
}

/// `to_address(27, 1) == "AA1"`.
pub fn to_address(col: u32, row: u32) -> Result<String> {
    if col == 0 || row == 0 {
        return Err(SheetError::InvalidArgument { col, row });
    }
    Ok(format!("{}{}", column_letters(col)?, row))
}

/// Inverse of [`to_address`].
pub fn parse_address(address: &str) -> Result<(u32, u32)> {
    match parse_ref(address)? {
        A1Ref {
            col: Some(col),
            row: Some(row),
        } => Ok((col, row)),
        _ => Err(SheetError::format("cell address", address)),
    }
}

fn letters_to_column(letters: &str) -> Option<u32> {
    let mut col: u32 = 0;
    for c in letters.chars() {
        let digit = c.to_ascii_uppercase() as u32 - 'A' as u32 + 1;
        col = col.checked_mul(26)?.checked_add(digit)?;
    }
    Some(col)
}

/// One side of a range: a column, a row, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct A1Ref {
    col: Option<u32>,
    row: Option<u32>,
}

fn parse_ref(text: &str) -> Result<A1Ref> {
    let bad = || SheetError::format("cell address", text);

    let split = text
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(text.len());
    let (letters, digits) = text.split_at(split);

    if letters.is_empty() && digits.is_empty() {
        return Err(bad());
    }
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(bad());
    }

    let col = if letters.is_empty() {
        None
    } else {
        Some(letters_to_column(letters).ok_or_else(bad)?)
    };
    let row = if digits.is_empty() {
        None
    } else {
        let row: u32 = digits.parse().map_err(|_| bad())?;
        if row == 0 {
            return Err(bad());
        }
        Some(row)
    };

    Ok(A1Ref { col, row })
}

/// A rectangular block of the grid; an unbounded end extends to the last populated
/// cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub first_col: u32,
    pub first_row: u32,
    pub last_col: Option<u32>,
    pub last_row: Option<u32>,
}

impl CellRange {
    pub fn cell(col: u32, row: u32) -> Self {
        Self {
            first_col: col,
            first_row: row,
            last_col: Some(col),
            last_row: Some(row),
        }
    }

    /// Whole columns, e.g. `B:B`.
    pub fn columns(first: u32, last: u32) -> Self {
        Self {
            first_col: first,
            first_row: 1,
            last_col: Some(last),
            last_row: None,
        }
    }

    /// Whole rows, e.g. `1:1`.
    pub fn rows(first: u32, last: u32) -> Self {
        Self {
            first_col: 1,
            first_row: first,
            last_col: None,
            last_row: Some(last),
        }
    }

    /// Parse `B3`, `B3:C5`, `A:B` or `1:1`.
    pub fn parse(text: &str) -> Result<Self> {
        let bad = || SheetError::format("cell range", text);

        let (start, end) = match text.split_once(':') {
            Some((start, end)) => (parse_ref(start)?, parse_ref(end)?),
            None => {
                let single = parse_ref(text)?;
                (single, single)
            }
        };

        let range = match (start, end) {
            (
                A1Ref {
                    col: Some(c1),
                    row: Some(r1),
                },
                A1Ref {
                    col: Some(c2),
                    row: Some(r2),
                },
            ) => Self {
                first_col: c1,
                first_row: r1,
                last_col: Some(c2),
                last_row: Some(r2),
            },
            (
                A1Ref {
                    col: Some(c1),
                    row: None,
                },
                A1Ref {
                    col: Some(c2),
                    row: None,
                },
            ) => Self::columns(c1, c2),
            (
                A1Ref {
                    col: None,
                    row: Some(r1),
                },
                A1Ref {
                    col: None,
                    row: Some(r2),
                },
            ) => Self::rows(r1, r2),
            _ => return Err(bad()),
        };

        if range.last_col.is_some_and(|c| c < range.first_col)
            || range.last_row.is_some_and(|r| r < range.first_row)
        {
            return Err(bad());
        }
        Ok(range)
    }

    pub fn contains(&self, col: u32, row: u32) -> bool {
        col >= self.first_col
            && row >= self.first_row
            && self.last_col.map_or(true, |last| col <= last)
            && self.last_row.map_or(true, |last| row <= last)
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letters = |col: u32| column_letters(col).map_err(|_| fmt::Error);
        match (self.last_col, self.last_row) {
            (Some(last_col), Some(last_row)) => write!(
                f,
                "{}{}:{}{}",
                letters(self.first_col)?,
                self.first_row,
                letters(last_col)?,
                last_row
            ),
            (Some(last_col), None) => {
                write!(f, "{}:{}", letters(self.first_col)?, letters(last_col)?)
            }
            (None, Some(last_row)) => write!(f, "{}:{}", self.first_row, last_row),
            (None, None) => write!(f, "{}{}:", letters(self.first_col)?, self.first_row),
        }
    }
}
