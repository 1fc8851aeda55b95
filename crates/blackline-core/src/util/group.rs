/// Splits an ordered stream into runs of adjacent items sharing a key.
/// Order inside and across runs is the input order; nothing is re-sorted.
pub fn group_adjacent<T, K, F>(items: impl Iterator<Item = T>, key_of: F) -> Vec<(K, Vec<T>)>
where
    K: Eq,
    F: Fn(&T) -> K,
{
    let mut runs: Vec<(K, Vec<T>)> = Vec::new();
    for item in items {
        let key = key_of(&item);
        match runs.last_mut() {
            Some((last, run)) if *last == key => run.push(item),
            _ => runs.push((key, vec![item])),
        }
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjacent_equal_keys_share_a_run() {
        let runs = group_adjacent([1, 1, 2, 2, 2, 1].into_iter(), |&x| x);
        let shapes: Vec<(i32, usize)> = runs.iter().map(|(k, v)| (*k, v.len())).collect();
        assert_eq!(shapes, [(1, 2), (2, 3), (1, 1)]);
    }

    #[test]
    fn empty_input_yields_no_runs() {
        let runs = group_adjacent(std::iter::empty::<u8>(), |&x| x);
        assert!(runs.is_empty());
    }

    #[test]
    fn keys_are_not_merged_across_distance() {
        let runs = group_adjacent(["a", "b", "a"].into_iter(), |s| s.to_string());
        assert_eq!(runs.len(), 3);
    }
}
