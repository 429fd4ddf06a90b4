//! Helpers for time-ordered feature sequences: frame averaging, early fusion
//! by concatenation, and length reconciliation between two modalities.

use crate::error::{Error, Result};
use crate::stats;
use ndarray::{aview1, Array1};

/// Average each consecutive block of `size` vectors.
///
/// An incomplete trailing block is dropped.
pub fn average_buckets(xs: &[Vec<f64>], size: usize) -> Result<Vec<Vec<f64>>> {
    if size == 0 {
        return Err(Error::InvalidParameter {
            name: "size",
            message: "bucket size must be at least 1",
        });
    }
    let mut out = Vec::with_capacity(xs.len() / size);
    for bucket in xs.chunks_exact(size) {
        let mut sum = Array1::zeros(bucket[0].len());
        for x in bucket {
            stats::add(sum.view_mut(), aview1(x))?;
        }
        stats::scale(sum.view_mut(), 1.0 / size as f64);
        out.push(sum.to_vec());
    }
    Ok(out)
}

/// Concatenate paired vectors of two equal-length sequences.
pub fn concat_features(a: &[Vec<f64>], b: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
    if a.len() != b.len() {
        return Err(Error::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    Ok(a.iter()
        .zip(b)
        .map(|(x, y)| x.iter().chain(y).copied().collect())
        .collect())
}

/// Truncate the longer of two sequences to the length of the shorter.
pub fn align_lengths<'a, 'b, T>(a: &'a [T], b: &'b [T]) -> (&'a [T], &'b [T]) {
    let n = a.len().min(b.len());
    (&a[..n], &b[..n])
}

/// Average a dense sequence down to about `target_len` vectors, then
/// truncate to exactly that length.
///
/// A sequence already shorter than `target_len` is returned unchanged.
pub fn downsample_to(xs: &[Vec<f64>], target_len: usize) -> Result<Vec<Vec<f64>>> {
    if target_len == 0 {
        return Err(Error::InvalidParameter {
            name: "target_len",
            message: "must be at least 1",
        });
    }
    let size = (xs.len() / target_len).max(1);
    let mut out = average_buckets(xs, size)?;
    out.truncate(target_len);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_buckets_drops_tail() {
        let xs = vec![vec![1.0, 10.0], vec![3.0, 20.0], vec![5.0, 0.0], vec![7.0, 2.0], vec![100.0, 100.0]];
        let avg = average_buckets(&xs, 2).unwrap();
        assert_eq!(avg, vec![vec![2.0, 15.0], vec![6.0, 1.0]]);
        assert!(average_buckets(&xs, 0).is_err());
        assert!(average_buckets(&xs, 6).unwrap().is_empty());
    }

    #[test]
    fn test_average_buckets_rejects_ragged_rows() {
        let xs = vec![vec![1.0, 2.0], vec![3.0]];
        assert_eq!(
            average_buckets(&xs, 2),
            Err(Error::LengthMismatch { left: 2, right: 1 })
        );
    }

    #[test]
    fn test_concat_features() {
        let a = vec![vec![1.0], vec![2.0]];
        let b = vec![vec![3.0, 4.0], vec![5.0, 6.0]];
        assert_eq!(
            concat_features(&a, &b).unwrap(),
            vec![vec![1.0, 3.0, 4.0], vec![2.0, 5.0, 6.0]]
        );
        assert!(concat_features(&a, &b[..1]).is_err());
    }

    #[test]
    fn test_align_lengths_truncates_longer() {
        let a = [1, 2, 3, 4];
        let b = [9, 8];
        let (a2, b2) = align_lengths(&a, &b);
        assert_eq!(a2, &[1, 2]);
        assert_eq!(b2, &[9, 8]);
    }

    #[test]
    fn test_downsample_to_matches_target() {
        let xs: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let down = downsample_to(&xs, 3).unwrap();
        assert_eq!(down, vec![vec![1.0], vec![4.0], vec![7.0]]);

        let short = downsample_to(&xs[..2], 5).unwrap();
        assert_eq!(short.len(), 2);
    }
}
