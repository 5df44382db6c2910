//! In-place heapsort (spec section 4.2).
//!
//! Comparison-based, O(n log n) worst case, O(1) extra space. The original
//! (`task1/Array.c`'s `heapify`/`heapSort`) swaps elements with a three-step
//! XOR dance: `a ^= b; b ^= a; a ^= b;`. That corrupts the slot whenever `a`
//! and `b` alias the same element (`a ^ a == 0`), which happens on every
//! call from `heapSort`'s top-level loop once the heap has shrunk to a
//! single surviving element (`heapify(array, 1, 0)`'s internal recursion
//! can still reach `largest == i`). Spec section 4.2 and Design Notes (a)
//! flag this explicitly rather than asking for it to be reproduced: this
//! implementation swaps through a temporary (`slice::swap`), which can
//! never corrupt a self-aliased element.

/// Sorts `data` into non-decreasing order in place.
pub fn heap_sort(data: &mut [i32]) {
    let n = data.len();
    if n < 2 {
        return;
    }

    for start in (0..n / 2).rev() {
        sift_down(data, start, n);
    }

    for end in (1..n).rev() {
        data.swap(0, end);
        sift_down(data, 0, end);
    }
}

/// Restores the max-heap property for the subtree rooted at `i`, over the
/// logical heap `data[..len]`.
fn sift_down(data: &mut [i32], mut i: usize, len: usize) {
    loop {
        let left = 2 * i + 1;
        let right = left + 1;
        let mut largest = i;

        if left < len && data[left] > data[largest] {
            largest = left;
        }
        if right < len && data[right] > data[largest] {
            largest = right;
        }
        if largest == i {
            return;
        }
        data.swap(i, largest);
        i = largest;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_singleton_are_no_ops() {
        let mut empty: Vec<i32> = vec![];
        heap_sort(&mut empty);
        assert_eq!(empty, Vec::<i32>::new());

        let mut one = vec![42];
        heap_sort(&mut one);
        assert_eq!(one, vec![42]);
    }

    #[test]
    fn sorts_into_non_decreasing_order() {
        let mut v = vec![5, 3, 8, 1, 9, 2, 7];
        heap_sort(&mut v);
        assert_eq!(v, vec![1, 2, 3, 5, 7, 8, 9]);
    }

    #[test]
    fn handles_duplicates() {
        let mut v = vec![1, 1, 2, 1, 3];
        heap_sort(&mut v);
        assert_eq!(v, vec![1, 1, 1, 2, 3]);
    }

    #[test]
    fn is_a_permutation_of_the_input() {
        let input = vec![9, -3, 0, 17, -3, 4, 4, 2];
        let mut sorted = input.clone();
        heap_sort(&mut sorted);

        let mut expected = input;
        expected.sort();
        assert_eq!(sorted, expected);
    }

    /// Regression for the self-swap bug described in spec.md section 4.2:
    /// a heap of size 1 must never corrupt its sole element. Exercised
    /// directly via the tail of `heap_sort`'s extraction loop, which swaps
    /// the root with the last surviving element and re-heapifies a
    /// residual heap of length 1.
    #[test]
    fn single_residual_heap_does_not_zero_the_value() {
        let mut v = vec![3, 3];
        heap_sort(&mut v);
        assert_eq!(v, vec![3, 3], "XOR-swap-with-self would zero an element here");
    }

    #[test]
    fn already_sorted_input_is_stable_in_value() {
        let mut v: Vec<i32> = (0..50).collect();
        let expected = v.clone();
        heap_sort(&mut v);
        assert_eq!(v, expected);
    }
}
