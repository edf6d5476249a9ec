use std::collections::HashMap;
use std::hash::Hash;

/// Arithmetic mean, or `None` for empty input.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Tallies occurrences of each key.
pub fn tally<K, I>(keys: I) -> HashMap<K, usize>
where
    K: Eq + Hash,
    I: IntoIterator<Item = K>,
{
    let mut counts = HashMap::new();
    for key in keys {
        *counts.entry(key).or_insert(0) += 1;
    }
    counts
}

/// Sorts counts by descending frequency, ties by ascending key.
pub fn ranked<K: Ord>(counts: HashMap<K, usize>) -> Vec<(K, usize)> {
    let mut entries: Vec<(K, usize)> = counts.into_iter().collect();
    entries.sort_by(|(ka, ca), (kb, cb)| cb.cmp(ca).then_with(|| ka.cmp(kb)));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_empty() {
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn test_mean_values() {
        assert_eq!(mean(&[30.0]), Some(30.0));
        assert_eq!(mean(&[10.0, 20.0, 60.0]), Some(30.0));
    }

    #[test]
    fn test_ranked_breaks_ties_by_key() {
        let counts = tally(["Rain", "Fair", "Snow", "Fair", "Rain", "Cloudy"]);
        let ranked = ranked(counts);

        assert_eq!(
            ranked,
            vec![("Fair", 2), ("Rain", 2), ("Cloudy", 1), ("Snow", 1)]
        );
    }
}
