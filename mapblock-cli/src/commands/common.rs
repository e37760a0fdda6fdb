//! Argument parsers shared across commands.

use std::str::FromStr;

use mapblock::cell::{Cell, TILE_REFERENCE_MASK};

/// Parse a tile reference written in decimal or with a `0x`, `0o` or `0b`
/// prefix.
///
/// Values above 1023 are rejected rather than masked to the 10-bit
/// reference field, so a mistyped id never lands on an unrelated metatile.
pub fn parse_tile_reference(s: &str) -> Result<u16, String> {
    let s = s.trim();
    let lower = s.to_ascii_lowercase();
    let (digits, radix) = match lower.get(..2) {
        Some("0x") => (&lower[2..], 16),
        Some("0o") => (&lower[2..], 8),
        Some("0b") => (&lower[2..], 2),
        _ => (lower.as_str(), 10),
    };
    let value = u16::from_str_radix(digits, radix)
        .map_err(|e| format!("'{}' is not a tile reference: {}", s, e))?;

    if value > TILE_REFERENCE_MASK {
        return Err(format!(
            "tile reference {} exceeds the maximum {}",
            value, TILE_REFERENCE_MASK
        ));
    }
    Ok(value)
}

/// Rectangular window given as `X,Y,W,H`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split(',')
            .map(|part| part.trim().parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("invalid region '{}': {}", s, e))?;

        match values[..] {
            [x, y, width, height] => Ok(Region {
                x,
                y,
                width,
                height,
            }),
            _ => Err(format!("invalid region '{}', expected X,Y,W,H", s)),
        }
    }
}

/// One-line field breakdown used by `analyze` and `inspect`.
pub fn describe_cell(cell: Cell) -> String {
    format!(
        "{} ref={:>4} col={} elev={:>2}",
        cell,
        cell.tile_reference(),
        cell.collision(),
        cell.elevation()
    )
}
