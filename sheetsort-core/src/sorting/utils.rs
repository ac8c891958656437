//! Helpers for reordering a row sequence in place.

use std::cmp::Ordering;

use tokio_util::sync::CancellationToken;

/// Why [`try_stable_sort_indices`] stopped before producing an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortInterrupt<E> {
    Cancelled,
    Failed(E),
}

/// Stable bottom-up merge sort over the positions `0..len`.
///
/// `compare(a, b)` orders the elements at positions `a` and `b`. The first
/// comparison error aborts the sort, and cancellation is checked before every
/// merge pass. On success the returned vector holds, for each output
/// position, the input position that belongs there.
pub fn try_stable_sort_indices<E, F>(
    len: usize,
    mut compare: F,
    cancel: &CancellationToken,
) -> Result<Vec<usize>, SortInterrupt<E>>
where
    F: FnMut(usize, usize) -> Result<Ordering, E>,
{
    let mut src: Vec<usize> = (0..len).collect();
    let mut dst = vec![0usize; len];
    let mut width = 1;

    while width < len {
        if cancel.is_cancelled() {
            return Err(SortInterrupt::Cancelled);
        }

        let mut start = 0;
        while start < len {
            let mid = (start + width).min(len);
            let end = (start + 2 * width).min(len);
            let (mut i, mut j, mut k) = (start, mid, start);

            while i < mid && j < end {
                // Take from the right run only when strictly smaller: ties keep input order.
                let right_first = compare(src[j], src[i]).map_err(SortInterrupt::Failed)?
                    == Ordering::Less;
                if right_first {
                    dst[k] = src[j];
                    j += 1;
                } else {
                    dst[k] = src[i];
                    i += 1;
                }
                k += 1;
            }

            let left_rest = mid - i;
            dst[k..k + left_rest].copy_from_slice(&src[i..mid]);
            k += left_rest;
            dst[k..k + (end - j)].copy_from_slice(&src[j..end]);

            start = end;
        }

        std::mem::swap(&mut src, &mut dst);
        width *= 2;
    }

    Ok(src)
}

/// Reorder `items` in place so that position `k` holds the element that was
/// at `order[k]`. Elements are swapped, never cloned, and the slice keeps its
/// identity.
pub fn apply_permutation<T>(items: &mut [T], order: &[usize]) {
    debug_assert_eq!(
        items.len(),
        order.len(),
        "Permutation length must match items length"
    );

    let mut placed = vec![false; items.len()];
    for start in 0..items.len() {
        if placed[start] {
            continue;
        }
        let mut current = start;
        loop {
            placed[current] = true;
            let next = order[current];
            if next == start {
                break;
            }
            items.swap(current, next);
            current = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sort_indices(values: &[i32]) -> Vec<usize> {
        try_stable_sort_indices::<(), _>(
            values.len(),
            |a, b| Ok(values[a].cmp(&values[b])),
            &CancellationToken::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_apply_permutation() {
        let mut items = vec!["a", "b", "c", "d"];
        apply_permutation(&mut items, &[3, 1, 0, 2]);
        assert_eq!(items, vec!["d", "b", "a", "c"]);
    }

    #[test]
    fn test_merge_sort_orders_odd_lengths() {
        let values = [5, 3, 9, 1, 7, 2, 8];
        let order = sort_indices(&values);
        let sorted: Vec<i32> = order.iter().map(|&i| values[i]).collect();
        assert_eq!(sorted, vec![1, 2, 3, 5, 7, 8, 9]);
    }

    #[test]
    fn test_merge_sort_is_stable() {
        // (key, original position)
        let pairs = [(2, 0), (1, 1), (2, 2), (1, 3), (2, 4), (0, 5)];
        let order = try_stable_sort_indices::<(), _>(
            pairs.len(),
            |a, b| Ok(pairs[a].0.cmp(&pairs[b].0)),
            &CancellationToken::new(),
        )
        .unwrap();
        assert_eq!(order, vec![5, 1, 3, 0, 2, 4]);
    }

    #[test]
    fn test_sorted_input_keeps_identity_order() {
        assert_eq!(sort_indices(&[1, 1, 2, 3, 5]), vec![0, 1, 2, 3, 4]);
        assert!(sort_indices(&[]).is_empty());
        assert_eq!(sort_indices(&[4]), vec![0]);
    }

    #[test]
    fn test_first_error_aborts() {
        let mut calls = 0;
        let result = try_stable_sort_indices(
            8,
            |_, _| {
                calls += 1;
                Err::<Ordering, _>("boom")
            },
            &CancellationToken::new(),
        );
        assert_eq!(result, Err(SortInterrupt::Failed("boom")));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_cancelled_token_stops_before_merging() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result =
            try_stable_sort_indices::<(), _>(3, |_, _| Ok(Ordering::Equal), &cancel);
        assert_eq!(result, Err(SortInterrupt::Cancelled));
    }
}
