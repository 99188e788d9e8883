// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Data-movement kernels: reshape, strided slice, pack and fill.
//!
//! These never look at element values, so they work on raw bytes and take
//! the element width where it matters.

use crate::{Shape, TensorError};

/// Begin/end/stride triples for [`strided_slice`], one entry per input axis.
///
/// Negative `begin`/`end` values count from the end of the axis. Indices are
/// clamped to the axis bounds after wrapping.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SliceParams {
    pub begin: Vec<i64>,
    pub end: Vec<i64>,
    pub strides: Vec<i64>,
}

/// Copies `input` into `output` unchanged; only the shape metadata differs.
///
/// # Errors
/// Returns [`TensorError::BufferSizeMismatch`] if the byte lengths differ.
pub fn reshape(input: &[u8], output: &mut [u8]) -> Result<(), TensorError> {
    if input.len() != output.len() {
        return Err(TensorError::BufferSizeMismatch {
            expected: output.len(),
            actual: input.len(),
        });
    }
    output.copy_from_slice(input);
    Ok(())
}

/// Extracts a strided sub-tensor.
///
/// The output must hold exactly the selected elements. Its shape may drop
/// unit axes (shrink) as long as the element count agrees.
///
/// # Errors
/// Returns [`TensorError::InvalidArgument`] for rank mismatches or
/// non-positive strides and [`TensorError::BufferSizeMismatch`] if `output`
/// has the wrong length.
pub fn strided_slice(
    input: &[u8],
    in_shape: &Shape,
    elem_size: usize,
    params: &SliceParams,
    output: &mut [u8],
) -> Result<(), TensorError> {
    const OP: &str = "strided_slice";
    let rank = in_shape.rank();
    if params.begin.len() != rank || params.end.len() != rank || params.strides.len() != rank {
        return Err(TensorError::InvalidArgument {
            op: OP,
            detail: format!("slice parameters do not match input rank {rank}"),
        });
    }
    if let Some(s) = params.strides.iter().find(|&&s| s <= 0) {
        return Err(TensorError::InvalidArgument {
            op: OP,
            detail: format!("stride {s} is not supported (must be positive)"),
        });
    }

    // Per-axis list of selected source indices.
    let mut axes: Vec<Vec<usize>> = Vec::with_capacity(rank);
    for (axis, &dim) in in_shape.dims().iter().enumerate() {
        let begin = wrap_index(params.begin[axis], dim);
        let end = wrap_index(params.end[axis], dim);
        let step = params.strides[axis] as usize;
        axes.push((begin..end.max(begin)).step_by(step).collect());
    }

    let count: usize = axes.iter().map(Vec::len).product();
    if output.len() != count * elem_size {
        return Err(TensorError::BufferSizeMismatch {
            expected: count * elem_size,
            actual: output.len(),
        });
    }
    if count == 0 {
        return Ok(());
    }

    let strides = in_shape.strides();
    let mut cursor = vec![0usize; rank];
    for chunk in output.chunks_exact_mut(elem_size) {
        let src: usize = cursor
            .iter()
            .zip(&axes)
            .zip(&strides)
            .map(|((&c, sel), &st)| sel[c] * st)
            .sum();
        let at = src * elem_size;
        chunk.copy_from_slice(&input[at..at + elem_size]);

        // Odometer increment, last axis fastest.
        for axis in (0..rank).rev() {
            cursor[axis] += 1;
            if cursor[axis] < axes[axis].len() {
                break;
            }
            cursor[axis] = 0;
        }
    }
    Ok(())
}

fn wrap_index(index: i64, dim: usize) -> usize {
    let dim = dim as i64;
    let wrapped = if index < 0 { index + dim } else { index };
    wrapped.clamp(0, dim) as usize
}

/// Stacks equally shaped tensors along a new `axis`.
///
/// The output shape is `in_shape` with `inputs.len()` inserted at `axis`.
///
/// # Errors
/// Returns [`TensorError::InvalidArgument`] if `axis > rank` and
/// [`TensorError::BufferSizeMismatch`] if any buffer has the wrong length.
pub fn pack(
    inputs: &[&[u8]],
    in_shape: &Shape,
    elem_size: usize,
    axis: usize,
    output: &mut [u8],
) -> Result<(), TensorError> {
    if axis > in_shape.rank() {
        return Err(TensorError::InvalidArgument {
            op: "pack",
            detail: format!("axis {axis} out of range for rank {}", in_shape.rank()),
        });
    }
    let in_len = in_shape.num_elements() * elem_size;
    if let Some(bad) = inputs.iter().find(|b| b.len() != in_len) {
        return Err(TensorError::BufferSizeMismatch {
            expected: in_len,
            actual: bad.len(),
        });
    }
    if output.len() != in_len * inputs.len() {
        return Err(TensorError::BufferSizeMismatch {
            expected: in_len * inputs.len(),
            actual: output.len(),
        });
    }

    let inner: usize = in_shape.dims()[axis..].iter().product::<usize>() * elem_size;
    if inner == 0 {
        return Ok(());
    }
    let outer = in_len / inner;
    let mut dst = output.chunks_exact_mut(inner);
    for o in 0..outer {
        for src in inputs {
            if let Some(chunk) = dst.next() {
                chunk.copy_from_slice(&src[o * inner..(o + 1) * inner]);
            }
        }
    }
    Ok(())
}

/// Broadcasts a single element (`value`, `elem_size` bytes) over `output`.
///
/// # Errors
/// Returns [`TensorError::InvalidArgument`] if `value` is empty or `output`
/// is not a whole number of elements.
pub fn fill(value: &[u8], output: &mut [u8]) -> Result<(), TensorError> {
    if value.is_empty() || output.len() % value.len() != 0 {
        return Err(TensorError::InvalidArgument {
            op: "fill",
            detail: format!(
                "cannot tile a {}-byte value over {} bytes",
                value.len(),
                output.len()
            ),
        });
    }
    for chunk in output.chunks_exact_mut(value.len()) {
        chunk.copy_from_slice(value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reshape_copies() {
        let mut out = [0u8; 3];
        reshape(&[1, 2, 3], &mut out).unwrap();
        assert_eq!(out, [1, 2, 3]);
        assert!(reshape(&[1, 2], &mut out).is_err());
    }

    #[test]
    fn test_strided_slice_last_column() {
        // [1, 2] → take column 1, the positive-class probability.
        let shape = Shape::new(vec![1, 2]);
        let params = SliceParams {
            begin: vec![0, 1],
            end: vec![1, 2],
            strides: vec![1, 1],
        };
        let mut out = [0u8; 1];
        strided_slice(&[10, 20], &shape, 1, &params, &mut out).unwrap();
        assert_eq!(out, [20]);
    }

    #[test]
    fn test_strided_slice_negative_and_step() {
        let shape = Shape::new(vec![2, 5]);
        let input: Vec<u8> = (0..10).collect();
        let params = SliceParams {
            begin: vec![-1, 0],
            end: vec![2, 5],
            strides: vec![1, 2],
        };
        let mut out = [0u8; 3];
        strided_slice(&input, &shape, 1, &params, &mut out).unwrap();
        assert_eq!(out, [5, 7, 9]);
    }

    #[test]
    fn test_strided_slice_wide_elements() {
        let shape = Shape::vector(3);
        let input: Vec<u8> = [1i32, 2, 3].iter().flat_map(|v| v.to_le_bytes()).collect();
        let params = SliceParams {
            begin: vec![1],
            end: vec![3],
            strides: vec![1],
        };
        let mut out = [0u8; 8];
        strided_slice(&input, &shape, 4, &params, &mut out).unwrap();
        assert_eq!(&out[..4], &2i32.to_le_bytes());
        assert_eq!(&out[4..], &3i32.to_le_bytes());
    }

    #[test]
    fn test_strided_slice_rejects_reverse_stride() {
        let shape = Shape::vector(3);
        let params = SliceParams {
            begin: vec![2],
            end: vec![0],
            strides: vec![-1],
        };
        let mut out = [0u8; 2];
        assert!(strided_slice(&[1, 2, 3], &shape, 1, &params, &mut out).is_err());
    }

    #[test]
    fn test_pack_axis0_and_axis1() {
        let shape = Shape::vector(2);
        let a = [1u8, 2];
        let b = [3u8, 4];

        let mut out = [0u8; 4];
        pack(&[&a, &b], &shape, 1, 0, &mut out).unwrap();
        assert_eq!(out, [1, 2, 3, 4]);

        pack(&[&a, &b], &shape, 1, 1, &mut out).unwrap();
        assert_eq!(out, [1, 3, 2, 4]);

        assert!(pack(&[&a, &b], &shape, 1, 2, &mut out).is_err());
    }

    #[test]
    fn test_fill_tiles_value() {
        let mut out = [0u8; 8];
        fill(&7i32.to_le_bytes(), &mut out).unwrap();
        assert_eq!(&out[4..], &7i32.to_le_bytes());
        assert!(fill(&[1, 2, 3], &mut out).is_err());
    }
}
