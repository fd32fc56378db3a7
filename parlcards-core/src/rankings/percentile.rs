//! Anchored percentile rank
//!
//! Values tied at the population maximum rank 100 and values tied at the
//! minimum rank 0, however large those tied groups are. Everything in
//! between is scaled over 1-99 by its rank among the non-maximum values.

/// Percentile rank (0-100) of `value` within `population`
///
/// An empty population yields 50. Scaling rounds half away from zero.
pub fn percentile(value: f64, population: &[f64]) -> u8 {
    if population.is_empty() {
        return 50;
    }

    let count_below = population.iter().filter(|&&v| v < value).count();
    let count_above = population.iter().filter(|&&v| v > value).count();
    if count_above == 0 {
        return 100;
    }
    if count_below == 0 {
        return 0;
    }

    let max = population.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let non_top = population.iter().filter(|&&v| v == max).count();
    let non_top = population.len() - non_top;

    // Small shares of a large population would otherwise round to 0
    let scaled = (count_below as f64 / non_top as f64 * 99.0).round() as u8;
    scaled.clamp(1, 99)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchored_extremes() {
        let population = [10.0, 10.0, 10.0, 5.0, 5.0, 0.0];
        assert_eq!(percentile(10.0, &population), 100);
        assert_eq!(percentile(0.0, &population), 0);
        // 1 below, 3 non-maximum values
        assert_eq!(percentile(5.0, &population), 33);
    }

    #[test]
    fn test_empty_population_is_midpoint() {
        assert_eq!(percentile(42.0, &[]), 50);
    }

    #[test]
    fn test_single_value_population() {
        assert_eq!(percentile(3.0, &[3.0]), 100);
        assert_eq!(percentile(1.0, &[3.0]), 0);
    }

    #[test]
    fn test_value_outside_population() {
        let population = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(9.0, &population), 100);
        assert_eq!(percentile(-1.0, &population), 0);
        // 3 below, 3 non-maximum values
        assert_eq!(percentile(3.5, &population), 99);
    }

    #[test]
    fn test_rank_never_decreases_with_value() {
        let population = [3.0, 7.0, 7.0, 12.0, 0.0, 25.0, 25.0, 4.0, 9.0];
        let mut last = 0u8;
        for step in -10..=300 {
            let rank = percentile(step as f64 / 10.0, &population);
            assert!(rank >= last, "rank dropped at {}", step as f64 / 10.0);
            assert!(rank <= 100);
            last = rank;
        }
        assert_eq!(last, 100);
    }

    #[test]
    fn test_above_minimum_never_ranks_zero() {
        // 1 below of 300 non-maximum values scales to 0.33
        let mut population = vec![0.0];
        population.extend(std::iter::repeat(5.0).take(299));
        population.push(10.0);

        assert_eq!(percentile(0.0, &population), 0);
        assert_eq!(percentile(5.0, &population), 1);
        assert_eq!(percentile(10.0, &population), 100);
    }

    #[test]
    fn test_half_rounds_up() {
        // 1 below of 2 non-maximum: 49.5 -> 50
        let population = [0.0, 1.0, 2.0];
        assert_eq!(percentile(1.0, &population), 50);
    }
}
