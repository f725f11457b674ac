//! Longest common subsequence over key sequences

/// Returns the longest common subsequence of `a` and `b`, in order.
///
/// Builds an O(n·m) table of suffix LCS lengths and traces it from the front; no
/// back-pointers are stored. On equal lengths the trace advances in `a` first, so
/// among several maximal subsequences the result is deterministic.
pub fn longest_common_subsequence<T: PartialEq + Clone>(a: &[T], b: &[T]) -> Vec<T> {
    let rows = a.len() + 1;
    let cols = b.len() + 1;
    // table[i * cols + j] = LCS length of a[i..] and b[j..]
    let mut table = vec![0usize; rows * cols];
    for i in (0..a.len()).rev() {
        for j in (0..b.len()).rev() {
            table[i * cols + j] = if a[i] == b[j] {
                table[(i + 1) * cols + j + 1] + 1
            } else {
                table[(i + 1) * cols + j].max(table[i * cols + j + 1])
            };
        }
    }

    let mut out = Vec::with_capacity(table[0]);
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if a[i] == b[j] {
            out.push(a[i].clone());
            i += 1;
            j += 1;
        } else if table[(i + 1) * cols + j] >= table[i * cols + j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }
    out
}
