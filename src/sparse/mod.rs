use crate::{NRError, NRResult};
use ndarray::{Array1, ArrayView1};

/// Bound on the pairwise-equality intermediate of batched COO membership.
pub const COO_FIND_LIMIT: i64 = 150_000_000;

/// Membership mask over `queries`: `true` where the query value occurs
/// anywhere in `haystack`.
pub fn coo_find(haystack: &Array1<i64>, queries: ArrayView1<i64>) -> Vec<bool> {
    queries
        .iter()
        .map(|q| haystack.iter().any(|h| h == q))
        .collect()
}

/// Batched COO membership: indices into `queries` whose value equals some
/// element of `haystack`, sorted descending.
///
/// `queries` is processed in chunks of `batch_size` so the pairwise equality
/// work stays bounded by `len(haystack) * batch_size` per chunk.
pub fn coo_find_batch(
    haystack: &Array1<i64>,
    queries: &Array1<i64>,
    batch_size: usize,
) -> NRResult<Vec<usize>> {
    if batch_size == 0 {
        return Err(NRError::InvalidArgument(
            "batch_size must be nonzero".to_string(),
        ));
    }
    let total = queries.len();
    let mut found = Vec::new();
    let mut start = 0;
    while start < total {
        let end = (start + batch_size).min(total);
        let mask = coo_find(haystack, queries.slice(ndarray::s![start..end]));
        for (offset, hit) in mask.into_iter().enumerate() {
            if hit {
                found.push(start + offset);
            }
        }
        start = end;
    }
    found.sort_unstable_by(|a, b| b.cmp(a));
    Ok(found)
}

/// Bitmap unique: marks each value in a boolean table of length
/// `domain_size` and returns the set positions in ascending order.
/// O(len + domain) and stable.
pub fn find_unique(arr: &Array1<i64>, domain_size: usize) -> NRResult<Array1<i64>> {
    let mut table = vec![false; domain_size];
    for &v in arr.iter() {
        if v < 0 || v as usize >= domain_size {
            return Err(NRError::InvalidArgument(format!(
                "value {v} outside domain [0, {domain_size})"
            )));
        }
        table[v as usize] = true;
    }
    let unique: Vec<i64> = table
        .iter()
        .enumerate()
        .filter_map(|(i, &set)| set.then_some(i as i64))
        .collect();
    Ok(Array1::from_vec(unique))
}

/// Deduplicates and sorts `(row, col)` index pairs through one hash-key
/// reduction: `h = row * (max_col + 1) + col`, sorted-unique, then recovered
/// by division and remainder. The modulus strictly exceeds every observed
/// column, so no two pairs alias.
pub fn dedup_and_sort(
    rows: &Array1<i64>,
    cols: &Array1<i64>,
) -> NRResult<(Array1<i64>, Array1<i64>)> {
    if rows.len() != cols.len() {
        return Err(NRError::LengthMismatch {
            expected: rows.len(),
            found: cols.len(),
        });
    }
    if rows.is_empty() {
        return Ok((Array1::zeros(0), Array1::zeros(0)));
    }
    if rows.iter().any(|&r| r < 0) || cols.iter().any(|&c| c < 0) {
        return Err(NRError::InvalidArgument(
            "COO indices must be non-negative".to_string(),
        ));
    }

    let modulus = cols.iter().copied().max().expect("nonempty cols") + 1;
    let mut hashes: Vec<i64> = rows
        .iter()
        .zip(cols.iter())
        .map(|(&r, &c)| r * modulus + c)
        .collect();
    hashes.sort_unstable();
    hashes.dedup();

    let out_rows: Vec<i64> = hashes.iter().map(|h| h / modulus).collect();
    let out_cols: Vec<i64> = hashes.iter().map(|h| h % modulus).collect();
    Ok((Array1::from_vec(out_rows), Array1::from_vec(out_cols)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn coo_find_masks_queries() {
        let haystack = array![3i64, 7, 7, 1];
        let queries = array![0i64, 1, 2, 7];
        assert_eq!(
            coo_find(&haystack, queries.view()),
            vec![false, true, false, true]
        );
    }

    #[test]
    fn coo_find_batch_is_batch_invariant() {
        let haystack = array![5i64, 9, 2];
        let queries = array![2i64, 4, 9, 9, 0, 5];
        let whole = coo_find_batch(&haystack, &queries, 100).unwrap();
        let chunked = coo_find_batch(&haystack, &queries, 2).unwrap();
        assert_eq!(whole, vec![5, 3, 2, 0]);
        assert_eq!(whole, chunked);
    }

    #[test]
    fn find_unique_is_ascending() {
        let arr = array![4i64, 1, 4, 0, 1];
        let unique = find_unique(&arr, 6).unwrap();
        assert_eq!(unique, array![0i64, 1, 4]);
        assert!(find_unique(&array![6i64], 6).is_err());
    }
}
