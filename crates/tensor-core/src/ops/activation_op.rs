// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Standalone activation kernels.

use crate::{QuantTensor, QuantTensorMut, TensorError};

/// Element-wise `min(max(x, 0), 6)`, requantized into the output's parameters.
///
/// # Errors
/// Returns [`TensorError::BufferSizeMismatch`] if the element counts differ.
pub fn relu6(input: &QuantTensor<'_>, output: &mut QuantTensorMut<'_>) -> Result<(), TensorError> {
    let n = input.shape().num_elements();
    if output.shape().num_elements() != n {
        return Err(TensorError::BufferSizeMismatch {
            expected: n,
            actual: output.shape().num_elements(),
        });
    }
    let in_q = input.quant();
    let out_q = output.quant();
    for (d, &s) in output.data_mut().iter_mut().zip(input.data()) {
        *d = out_q.quantize(in_q.dequantize(s).clamp(0.0, 6.0)).value;
    }
    Ok(())
}
