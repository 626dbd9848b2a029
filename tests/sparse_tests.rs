use ndarray::array;
use neuroray::sparse;

#[test]
fn test_dedup_and_sort_round_trip() {
    let rows = array![0i64, 9, 0, 1, 2, 0, 1, 2];
    let cols = array![9i64, 9, 1, 2, 3, 1, 2, 3];

    let (out_rows, out_cols) = sparse::dedup_and_sort(&rows, &cols).unwrap();
    assert_eq!(out_rows, array![0i64, 0, 1, 2, 9]);
    assert_eq!(out_cols, array![1i64, 9, 2, 3, 9]);
}

#[test]
fn test_dedup_and_sort_empty() {
    let empty = ndarray::Array1::<i64>::zeros(0);
    let (rows, cols) = sparse::dedup_and_sort(&empty, &empty).unwrap();
    assert!(rows.is_empty());
    assert!(cols.is_empty());
}

#[test]
fn test_dedup_and_sort_rejects_mismatched_lengths() {
    let rows = array![0i64, 1];
    let cols = array![0i64];
    assert!(sparse::dedup_and_sort(&rows, &cols).is_err());
}

#[test]
fn test_coo_find_batch_descending_indices() {
    let haystack = array![4i64, 8, 15];
    let queries = array![15i64, 1, 8, 2, 4, 4];
    // values 15, 8, 4, 4 match, at query positions 0, 2, 4, 5
    let hits = sparse::coo_find_batch(&haystack, &queries, 2).unwrap();
    assert_eq!(hits, vec![5, 4, 2, 0]);

    let unbatched = sparse::coo_find_batch(&haystack, &queries, 1000).unwrap();
    assert_eq!(hits, unbatched);
}

#[test]
fn test_find_unique_bitmap() {
    let arr = array![3i64, 0, 3, 5, 0, 5, 5];
    let unique = sparse::find_unique(&arr, 8).unwrap();
    assert_eq!(unique, array![0i64, 3, 5]);
}

#[test]
fn test_find_unique_rejects_out_of_domain() {
    let arr = array![3i64, 9];
    assert!(sparse::find_unique(&arr, 8).is_err());
    assert!(sparse::find_unique(&array![-1i64], 8).is_err());
}
