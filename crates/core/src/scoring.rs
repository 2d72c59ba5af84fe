//! Scoring module - points, attack strength and gravity per level
//!
//! Points per lock are quadratic in the number of lines cleared at once, with
//! no level multiplier. Attack strength uses a fixed lookup table so a single
//! clear sends nothing and a four-line clear sends four rows.

use crate::types::{
    ATTACK_TABLE, DROP_INTERVAL_FLOOR_MS, DROP_INTERVAL_STEP_MS, INITIAL_DROP_INTERVAL_MS,
    LINE_CLEAR_BASE, START_LEVEL,
};

/// Points for clearing `lines` rows with one lock
pub fn line_clear_score(lines: usize) -> u32 {
    let lines = lines as u32;
    lines.saturating_mul(lines).saturating_mul(LINE_CLEAR_BASE)
}

/// Garbage rows sent to the target for a clear of `lines` rows
///
/// Counts beyond the table (impossible on a 4-tall piece) use its last entry.
pub fn attack_lines(lines: usize) -> u32 {
    attack_lines_with(&ATTACK_TABLE, lines)
}

/// [`attack_lines`] against a custom table
pub fn attack_lines_with(table: &[u32], lines: usize) -> u32 {
    match table.get(lines) {
        Some(&n) => n,
        None => table.last().copied().unwrap_or(0),
    }
}

/// Gravity interval for a level
///
/// The starting level uses the initial interval; every later level uses
/// `max(floor, initial - step * level)`.
pub fn drop_interval_ms(level: u32) -> u32 {
    if level <= START_LEVEL {
        return INITIAL_DROP_INTERVAL_MS;
    }
    INITIAL_DROP_INTERVAL_MS
        .saturating_sub(DROP_INTERVAL_STEP_MS.saturating_mul(level))
        .max(DROP_INTERVAL_FLOOR_MS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_clear_score() {
        assert_eq!(line_clear_score(0), 0);
        assert_eq!(line_clear_score(1), 100);
        assert_eq!(line_clear_score(2), 400);
        assert_eq!(line_clear_score(3), 900);
        assert_eq!(line_clear_score(4), 1600);
    }

    #[test]
    fn test_attack_table() {
        assert_eq!(attack_lines(1), 0);
        assert_eq!(attack_lines(2), 1);
        assert_eq!(attack_lines(3), 2);
        assert_eq!(attack_lines(4), 4);
        assert_eq!(attack_lines(9), 4);
        assert_eq!(attack_lines_with(&[], 2), 0);
    }

    #[test]
    fn test_drop_interval_floor() {
        assert_eq!(drop_interval_ms(1), 500);
        assert_eq!(drop_interval_ms(2), 400);
        assert_eq!(drop_interval_ms(5), 250);
        assert_eq!(drop_interval_ms(7), 150);
        assert_eq!(drop_interval_ms(40), 150);
    }
}
