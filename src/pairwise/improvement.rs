// Per-case improvement rate and value ratio
//
// Metrics follow a lower-is-better convention: a compare value below the base
// value is a positive improvement. Both functions are total over finite
// inputs. A zero base value is handled piecewise instead of dividing by zero.

/// Improvement of `compare` over `base` in percent
///
/// - base == 0, compare == 0 → 0
/// - base == 0, compare != 0 → -100 (compare > 0) or +100 (compare < 0)
/// - otherwise `(base - compare) / base * 100`
///
/// # Example
/// ```
/// use qorcompare::pairwise::improvement_rate;
///
/// assert_eq!(improvement_rate(200.0, 150.0), 25.0);
/// assert_eq!(improvement_rate(0.0, 5.0), -100.0);
/// ```
pub fn improvement_rate(base: f64, compare: f64) -> f64 {
    if base == 0.0 {
        if compare == 0.0 {
            0.0
        } else if compare > 0.0 {
            -100.0
        } else {
            100.0
        }
    } else {
        (base - compare) / base * 100.0
    }
}

/// Ratio `compare / base`; 1 when both are zero, 2 when only base is zero
pub fn value_ratio(base: f64, compare: f64) -> f64 {
    if base == 0.0 {
        if compare == 0.0 {
            1.0
        } else {
            2.0
        }
    } else {
        compare / base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_values_are_neutral() {
        for v in [0.0, 1.0, 42.5, 1e9] {
            assert_eq!(improvement_rate(v, v), 0.0);
            assert_eq!(value_ratio(v, v), 1.0);
        }
    }

    #[test]
    fn test_zero_base() {
        assert_eq!(improvement_rate(0.0, 3.0), -100.0);
        assert_eq!(improvement_rate(0.0, -3.0), 100.0);
        assert_eq!(value_ratio(0.0, 3.0), 2.0);
        assert_eq!(value_ratio(0.0, -3.0), 2.0);
    }

    #[test]
    fn test_regression_is_negative() {
        assert_eq!(improvement_rate(100.0, 120.0), -20.0);
        assert_eq!(value_ratio(100.0, 120.0), 1.2);
    }

    #[test]
    fn test_approaches_but_never_exceeds_100() {
        let mut previous = f64::NEG_INFINITY;
        for compare in [50.0, 10.0, 1.0, 1e-3, 1e-9] {
            let imp = improvement_rate(100.0, compare);
            assert!(imp > previous);
            assert!(imp < 100.0);
            previous = imp;
        }
    }
}
