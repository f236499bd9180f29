use rand::Rng;

/// Uniform in-place permutation: walk from the last index down to 1 and swap
/// each slot with a uniformly chosen index in `[0, i]`.
pub fn shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}

/// Split at `len / 2`: the lower half trains, the rest tests. Odd counts give
/// the test half the extra row.
pub fn split_half<T>(mut items: Vec<T>) -> (Vec<T>, Vec<T>) {
    let test = items.split_off(items.len() / 2);
    (items, test)
}

/// Shuffle then split, the way the harvest stage builds its datasets.
pub fn shuffle_and_split<T, R: Rng + ?Sized>(mut items: Vec<T>, rng: &mut R) -> (Vec<T>, Vec<T>) {
    shuffle(&mut items, rng);
    split_half(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_split_sizes() {
        for n in 0..12usize {
            let items: Vec<usize> = (0..n).collect();
            let (train, test) = split_half(items);
            assert_eq!(train.len() + test.len(), n);
            assert_eq!(train.len(), n / 2);
            if n % 2 == 0 {
                assert_eq!(train.len(), test.len());
            }
        }
    }

    #[test]
    fn test_split_is_disjoint_and_complete() {
        let mut rng = StdRng::seed_from_u64(3);
        let items: Vec<usize> = (0..21).collect();
        let (train, test) = shuffle_and_split(items, &mut rng);
        assert!(train.iter().all(|x| !test.contains(x)));
        let mut all: Vec<usize> = train.into_iter().chain(test).collect();
        all.sort_unstable();
        assert_eq!(all, (0..21).collect::<Vec<_>>());
    }

    #[test]
    fn test_shuffle_is_permutation() {
        let mut rng = StdRng::seed_from_u64(42);
        let original = vec!["a", "b", "b", "c", "d", "e", "e", "e"];
        let mut shuffled = original.clone();
        shuffle(&mut shuffled, &mut rng);

        let mut left = original.clone();
        let mut right = shuffled.clone();
        left.sort_unstable();
        right.sort_unstable();
        assert_eq!(left, right);
    }

    #[test]
    fn test_shuffle_is_deterministic_for_a_seed() {
        let mut a: Vec<u32> = (0..50).collect();
        let mut b = a.clone();
        shuffle(&mut a, &mut StdRng::seed_from_u64(9));
        shuffle(&mut b, &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
        assert_ne!(a, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_shuffle_handles_tiny_inputs() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut empty: Vec<u8> = Vec::new();
        shuffle(&mut empty, &mut rng);
        assert!(empty.is_empty());

        let mut one = vec![7];
        shuffle(&mut one, &mut rng);
        assert_eq!(one, vec![7]);
    }
}
