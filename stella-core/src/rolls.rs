//! Display rounding and the substat roll solver.
//!
//! The game truncates stat values for display: percentage stats to one
//! decimal, flat stats to an integer. Two values are considered equal when
//! their displayed forms match. The leveler and the batch importers share
//! these helpers.

/// Absorbs f64 accumulation error (3.8 + 3.4 + 3.0 = 10.199999...) before truncation.
const TRUNCATION_EPSILON: f64 = 1e-9;

/// No substat in the game rolls anywhere near this often; bounds the search
/// on corrupted input.
const MAX_ROLLS: usize = 32;

/// Displayed value in its smallest unit: tenths for percentage stats,
/// whole numbers for flat stats.
pub fn display_units(value: f64, display_percentage: bool) -> i64 {
    let scaled = if display_percentage { value * 10.0 } else { value };
    (scaled + TRUNCATION_EPSILON).floor() as i64
}

/// Value as shown in game.
pub fn display_value(value: f64, display_percentage: bool) -> f64 {
    let units = display_units(value, display_percentage) as f64;
    if display_percentage { units / 10.0 } else { units }
}

pub fn approximately_equal(a: f64, b: f64, display_percentage: bool) -> bool {
    display_units(a, display_percentage) == display_units(b, display_percentage)
}

/// Decompose `target` into a sequence of rolls drawn (with repetition) from
/// `rolls`.
///
/// Candidates are tried largest first with depth-first backtracking and the
/// first sequence whose sum displays as `target` wins, so the result is
/// always in descending order and reproducible for the same inputs.
/// Returns `None` when no sequence matches.
pub fn solve_rolls(rolls: &[f64], target: f64, display_percentage: bool) -> Option<Vec<f64>> {
    let mut numbers: Vec<f64> = rolls
        .iter()
        .copied()
        .filter(|v| v.is_finite() && *v > 0.0)
        .collect();
    numbers.sort_by(|a, b| b.total_cmp(a));

    let mut combination = Vec::new();
    if backtrack(&numbers, 0, 0.0, target, display_percentage, &mut combination) {
        Some(combination)
    } else {
        None
    }
}

fn backtrack(
    numbers: &[f64],
    start_index: usize,
    current_sum: f64,
    target: f64,
    display_percentage: bool,
    combination: &mut Vec<f64>,
) -> bool {
    if approximately_equal(current_sum, target, display_percentage) {
        return true;
    }

    if current_sum > target || start_index >= numbers.len() || combination.len() >= MAX_ROLLS {
        return false;
    }

    for (i, &num) in numbers.iter().enumerate().skip(start_index) {
        combination.push(num);
        if backtrack(numbers, i, current_sum + num, target, display_percentage, combination) {
            return true;
        }
        combination.pop();
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len(), "{actual:?} vs {expected:?}");
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-9, "{actual:?} vs {expected:?}");
        }
    }

    #[test]
    fn test_display_value_truncates() {
        assert_eq!(display_value(5.508, true), 5.5);
        assert_eq!(display_value(6.9, false), 6.0);
        assert_eq!(display_value(64.8, true), 64.8);
    }

    #[test]
    fn test_display_units_absorbs_float_noise() {
        assert_eq!(display_units(3.8 + 3.4 + 3.0, true), 102);
        assert_eq!(display_units(10.199999999999999, true), 102);
    }

    #[test]
    fn test_approximately_equal() {
        assert!(approximately_equal(5.508, 5.5, true));
        assert!(!approximately_equal(5.49, 5.5, true));
        assert!(approximately_equal(33.87, 33.0, false));
    }

    #[test]
    fn test_solve_rolls_prefers_descending_first_match() {
        // [3.4, 3.4, 3.4] also sums to 10.2 but is found later
        let combo = solve_rolls(&[3.0, 3.4, 3.8], 10.2, true).unwrap();
        assert_close(&combo, &[3.8, 3.4, 3.0]);
    }

    #[test]
    fn test_solve_rolls_single_roll() {
        let combo = solve_rolls(&[3.456, 3.888, 4.32], 3.8, true).unwrap();
        assert_close(&combo, &[3.888]);
    }

    #[test]
    fn test_solve_rolls_flat_stat() {
        let combo = solve_rolls(&[2.0, 2.3, 2.6], 6.0, false).unwrap();
        assert_close(&combo, &[2.6, 2.3, 2.0]);
    }

    #[test]
    fn test_solve_rolls_no_decomposition() {
        assert!(solve_rolls(&[42.33751, 38.103755, 33.87], 27.0, false).is_none());
        assert!(solve_rolls(&[], 5.0, true).is_none());
    }

    #[test]
    fn test_solve_rolls_ignores_non_positive_rolls() {
        let combo = solve_rolls(&[0.0, -1.0, 2.0], 4.0, false).unwrap();
        assert_close(&combo, &[2.0, 2.0]);
    }

    #[test]
    fn test_solve_rolls_sum_matches_target() {
        let rolls = [2.592, 2.916, 3.24];
        for target in [2.5, 5.5, 5.8, 8.7, 9.0, 12.3] {
            if let Some(combo) = solve_rolls(&rolls, target, true) {
                let sum: f64 = combo.iter().sum();
                assert!(approximately_equal(sum, target, true), "{target}: {combo:?}");
            }
        }
    }
}
