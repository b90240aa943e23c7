use num_bigint::BigUint;

/// All `k`-element subsets of `0..n`, as sorted index lists in lexicographic order.
///
/// ```
/// use faultflow::utils::k_subsets;
///
/// assert_eq!(k_subsets(3, 2), vec![vec![0, 1], vec![0, 2], vec![1, 2]]);
/// ```
///
/// Returns no subsets when `k > n`, and the single empty subset when `k == 0`.
pub fn k_subsets(n: usize, k: usize) -> Vec<Vec<usize>> {
    let mut result = Vec::new();
    if k > n {
        return result;
    }

    let mut indices: Vec<usize> = (0..k).collect();
    loop {
        result.push(indices.clone());

        // Find the rightmost index that can still move right.
        let mut i = k;
        loop {
            if i == 0 {
                return result;
            }
            i -= 1;
            if indices[i] != i + n - k {
                break;
            }
        }
        indices[i] += 1;
        for j in i + 1..k {
            indices[j] = indices[j - 1] + 1;
        }
    }
}

/// [Binomial coefficient][binomial] `C(n, k)` without overflow.
///
/// [binomial]: https://en.wikipedia.org/wiki/Binomial_coefficient
pub fn binomial(n: u64, k: u64) -> BigUint {
    if k > n {
        return BigUint::ZERO;
    }
    let k = k.min(n - k);
    let mut acc = BigUint::from(1u32);
    for i in 0..k {
        acc *= n - i;
        acc /= i + 1;
    }
    acc
}

/// Formats a probability without floating-point noise (`1 - 0.7` prints as `0.3`).
pub fn format_probability(p: f64) -> String {
    let s = format!("{:.12}", p);
    let s = s.trim_end_matches('0');
    let s = s.strip_suffix('.').unwrap_or(s);
    s.to_string()
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_k_subsets_small() {
        assert_eq!(k_subsets(3, 0), vec![Vec::<usize>::new()]);
        assert_eq!(k_subsets(3, 1), vec![vec![0], vec![1], vec![2]]);
        assert_eq!(k_subsets(3, 3), vec![vec![0, 1, 2]]);
        assert!(k_subsets(2, 3).is_empty());
        assert_eq!(
            k_subsets(4, 2),
            vec![
                vec![0, 1],
                vec![0, 2],
                vec![0, 3],
                vec![1, 2],
                vec![1, 3],
                vec![2, 3]
            ]
        );
    }

    #[test]
    fn test_k_subsets_match_binomial() {
        for n in 0..=7 {
            for k in 0..=n {
                let subsets = k_subsets(n, k);
                assert_eq!(BigUint::from(subsets.len()), binomial(n as u64, k as u64));
                for subset in &subsets {
                    assert_eq!(subset.len(), k);
                    assert!(subset.windows(2).all(|w| w[0] < w[1]));
                }
                let mut dedup = subsets.clone();
                dedup.dedup();
                assert_eq!(dedup.len(), subsets.len());
            }
        }
    }

    #[test]
    fn test_binomial() {
        assert_eq!(binomial(5, 2), BigUint::from(10u32));
        assert_eq!(binomial(10, 0), BigUint::from(1u32));
        assert_eq!(binomial(3, 4), BigUint::ZERO);
        assert_eq!(binomial(60, 30), BigUint::from(118264581564861424u64));
    }

    #[test]
    fn test_format_probability() {
        assert_eq!(format_probability(0.3), "0.3");
        assert_eq!(format_probability(1.0 - 0.7), "0.3");
        assert_eq!(format_probability(1.0), "1");
        assert_eq!(format_probability(0.125), "0.125");
    }
}
