//! Fill-forward alignment of independently sized axes.
//!
//! Axes of different lengths are paired positionally; an axis that runs out
//! keeps repeating its last element, and an empty axis contributes
//! `T::default()` at every position. Output order always follows input order.

use crate::config::Alignment;
use crate::error::SpecError;

/// Element `index` of `seq`, or its last element once exhausted, or the
/// default for an empty sequence.
pub(crate) fn fill_forward_get<T: Clone + Default>(seq: &[T], index: usize) -> T {
    seq.get(index).or_else(|| seq.last()).cloned().unwrap_or_default()
}

/// Length of the aligned output, checking the policy first.
///
/// Under [`Alignment::Strict`] every axis must have length 1 or the maximum
/// length.
pub(crate) fn aligned_len(lengths: &[usize], alignment: Alignment) -> Result<usize, SpecError> {
    let max = lengths.iter().copied().max().unwrap_or(0);
    if alignment == Alignment::Strict && lengths.iter().any(|&len| len != 1 && len != max) {
        return Err(SpecError::MismatchedAxisLengths {
            lengths: lengths.to_vec(),
        });
    }
    Ok(max)
}

/// Zip any number of same-typed sequences, padding the short ones.
///
/// Returns `max(len)` rows, each holding one element per input sequence.
///
/// # Examples
///
/// ```
/// use reqsweep::expand::fill_forward_zip;
///
/// let rows = fill_forward_zip(&[vec![1, 2], vec![10, 20, 30], vec![7]]);
/// assert_eq!(rows, vec![vec![1, 10, 7], vec![2, 20, 7], vec![2, 30, 7]]);
/// ```
pub fn fill_forward_zip<T: Clone + Default>(sequences: &[Vec<T>]) -> Vec<Vec<T>> {
    let len = sequences.iter().map(Vec::len).max().unwrap_or(0);
    (0..len)
        .map(|i| {
            sequences
                .iter()
                .map(|seq| fill_forward_get(seq, i))
                .collect()
        })
        .collect()
}

/// Strict or fill-forward variant of [`fill_forward_zip`].
pub fn align<T: Clone + Default>(
    sequences: &[Vec<T>],
    alignment: Alignment,
) -> Result<Vec<Vec<T>>, SpecError> {
    let lengths: Vec<usize> = sequences.iter().map(Vec::len).collect();
    aligned_len(&lengths, alignment)?;
    Ok(fill_forward_zip(sequences))
}

/// Two-way fill-forward zip for sequences of different element types.
///
/// # Examples
///
/// ```
/// use reqsweep::expand::fill_forward_pair;
///
/// assert_eq!(
///     fill_forward_pair(&[1, 2], &[1, 2, 3]),
///     vec![(1, 1), (2, 2), (2, 3)]
/// );
/// ```
pub fn fill_forward_pair<A, B>(a: &[A], b: &[B]) -> Vec<(A, B)>
where
    A: Clone + Default,
    B: Clone + Default,
{
    let len = a.len().max(b.len());
    (0..len)
        .map(|i| (fill_forward_get(a, i), fill_forward_get(b, i)))
        .collect()
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_repeats_last_of_shorter_side() {
        assert_eq!(
            fill_forward_pair(&[1, 2], &[1, 2, 3]),
            vec![(1, 1), (2, 2), (2, 3)]
        );
    }

    #[test]
    fn three_axes_of_lengths_two_three_one() {
        let rows = fill_forward_zip(&[
            vec!["a1", "a2"],
            vec!["b1", "b2", "b3"],
            vec!["c1"],
        ]);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], vec!["a1", "b1", "c1"]);
        assert_eq!(rows[1], vec!["a2", "b2", "c1"]);
        assert_eq!(
            rows[2],
            vec!["a2", "b3", "c1"],
            "short axes repeat their last element in the final position"
        );
    }

    #[test]
    fn empty_axis_is_padded_with_default() {
        let rows = fill_forward_zip(&[vec![String::from("x"), String::from("y")], vec![]]);
        assert_eq!(
            rows,
            vec![
                vec![String::from("x"), String::new()],
                vec![String::from("y"), String::new()],
            ]
        );
    }

    #[test]
    fn no_sequences_or_all_empty_yield_nothing() {
        assert!(fill_forward_zip::<i32>(&[]).is_empty());
        assert!(fill_forward_zip::<i32>(&[vec![], vec![]]).is_empty());
    }

    #[test]
    fn output_is_deterministic() {
        let input = vec![vec![3, 1, 2], vec![9]];
        assert_eq!(fill_forward_zip(&input), fill_forward_zip(&input));
    }

    #[test]
    fn strict_allows_broadcasting_singletons() {
        let rows = align(&[vec![1, 2, 3], vec![7], vec![4, 5, 6]], Alignment::Strict).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2], vec![3, 7, 6]);
    }

    #[test]
    fn strict_rejects_mismatched_lengths() {
        let err = align(&[vec![1, 2], vec![1, 2, 3]], Alignment::Strict).unwrap_err();
        assert_eq!(
            err,
            SpecError::MismatchedAxisLengths {
                lengths: vec![2, 3]
            }
        );
    }

    #[test]
    fn fill_forward_policy_never_fails() {
        let rows = align(&[vec![1, 2], vec![1, 2, 3]], Alignment::FillForward).unwrap();
        assert_eq!(rows.len(), 3);
    }
}
