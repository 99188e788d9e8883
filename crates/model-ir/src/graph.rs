// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Model graph: the parsed image with its validation state.
//!
//! # Type-State Pattern
//!
//! ```text
//! ModelGraph<Loaded>    : image parsed, nothing checked.
//!       │  .validate()
//!       ▼
//! ModelGraph<Validated> : indices, arity, ordering and quantization verified.
//! ```
//!
//! The runtime only accepts `ModelGraph<Validated>`, so the interpreter never
//! sees a dangling tensor index or an operator reading a value before it is
//! produced.

use crate::{ModelError, ModelImage, OpCode, Operator, OperatorDef, TensorDef};
use std::collections::BTreeSet;
use std::fmt;
use tensor_core::DType;

// ── Type-state markers ─────────────────────────────────────────────

/// Marker: image has been parsed but not validated.
#[derive(Debug, Clone)]
pub struct Loaded;

/// Marker: graph has been validated and may be executed.
#[derive(Debug, Clone)]
pub struct Validated;

/// Sealed trait for graph states.
pub trait GraphState: fmt::Debug + Clone {}
impl GraphState for Loaded {}
impl GraphState for Validated {}

/// Inclusive range of execution steps during which a tensor must stay live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TensorLifetime {
    pub first: usize,
    pub last: usize,
}

// ── ModelGraph ─────────────────────────────────────────────────────

/// A model image plus a compile-time validation state.
#[derive(Debug, Clone)]
pub struct ModelGraph<S: GraphState = Loaded> {
    image: ModelImage,
    _state: std::marker::PhantomData<S>,
}

impl ModelGraph<Loaded> {
    /// Wraps a freshly parsed image.
    pub fn new(image: ModelImage) -> Self {
        Self {
            image,
            _state: std::marker::PhantomData,
        }
    }

    /// Validates the graph and transitions to the `Validated` state.
    ///
    /// # Checks
    /// - At least one operator; exactly one graph input and one output, both `i8`.
    /// - Every `i8` tensor has quantization with `scale > 0`.
    /// - Constant data matches the declared dtype and element count.
    /// - Every operator index is in range and the arity fits the operator.
    /// - Each tensor is written at most once, never a constant, and read only
    ///   after it is produced (constants and the graph input are available
    ///   from the start).
    /// - Offload sub-graphs do not nest and produce every declared output.
    pub fn validate(self) -> Result<ModelGraph<Validated>, ModelError> {
        let image = &self.image;
        if image.operators.is_empty() {
            return Err(ModelError::InvalidGraph("model contains no operators".into()));
        }

        for (index, t) in image.tensors.iter().enumerate() {
            check_tensor(index, t)?;
        }

        let input = single_io(image, &image.inputs, "input")?;
        let output = single_io(image, &image.outputs, "output")?;

        let mut defined: Vec<bool> = image.tensors.iter().map(TensorDef::is_constant).collect();
        defined[input] = true;

        for (index, def) in image.operators.iter().enumerate() {
            check_operator(image, index, def, &mut defined)?;
            if let Operator::NpuOffload { operators } = &def.op {
                // The offload node's own outputs are produced by its children.
                for &o in &def.outputs {
                    defined[o] = false;
                }
                for sub in operators {
                    if sub.op.code() == OpCode::NpuOffload {
                        return Err(ModelError::InvalidOperator {
                            index,
                            op: OpCode::NpuOffload,
                            detail: "offload sub-graphs cannot nest".into(),
                        });
                    }
                    check_operator(image, index, sub, &mut defined)?;
                }
                if let Some(&o) = def.outputs.iter().find(|&&o| !defined[o]) {
                    return Err(ModelError::InvalidOperator {
                        index,
                        op: OpCode::NpuOffload,
                        detail: format!("declared output {o} is not produced by the sub-graph"),
                    });
                }
            }
        }

        if !defined[output] {
            return Err(ModelError::InvalidGraph(format!(
                "graph output {output} is never produced"
            )));
        }

        tracing::debug!(
            operators = image.operators.len(),
            tensors = image.tensors.len(),
            "model graph validated"
        );

        Ok(ModelGraph {
            image: self.image,
            _state: std::marker::PhantomData,
        })
    }
}

fn check_tensor(index: usize, t: &TensorDef) -> Result<(), ModelError> {
    let invalid = |detail: String| ModelError::InvalidTensor {
        index,
        name: t.name.clone(),
        detail,
    };
    if t.dtype == DType::I8 {
        let q = t
            .quant
            .ok_or_else(|| invalid("i8 tensor has no quantization parameters".into()))?;
        q.validate().map_err(|e| invalid(e.to_string()))?;
    }
    if let Some(data) = &t.data {
        if data.dtype() != t.dtype {
            return Err(invalid(format!(
                "data is {} but tensor is declared {}",
                data.dtype(),
                t.dtype
            )));
        }
        if data.len() != t.shape.num_elements() {
            return Err(invalid(format!(
                "{} values for shape {}",
                data.len(),
                t.shape
            )));
        }
    }
    Ok(())
}

fn single_io(image: &ModelImage, list: &[usize], role: &str) -> Result<usize, ModelError> {
    let &[index] = list else {
        return Err(ModelError::InvalidGraph(format!(
            "expected exactly one graph {role}, found {}",
            list.len()
        )));
    };
    let t = image.tensors.get(index).ok_or_else(|| {
        ModelError::InvalidGraph(format!("graph {role} {index} is out of range"))
    })?;
    if t.dtype != DType::I8 || t.is_constant() {
        return Err(ModelError::InvalidGraph(format!(
            "graph {role} '{}' must be a variable i8 tensor",
            t.name
        )));
    }
    Ok(index)
}

fn check_operator(
    image: &ModelImage,
    index: usize,
    def: &OperatorDef,
    defined: &mut [bool],
) -> Result<(), ModelError> {
    let op = def.op.code();
    let invalid = |detail: String| ModelError::InvalidOperator { index, op, detail };

    if !op.input_arity().contains(&def.inputs.len()) {
        return Err(invalid(format!("{} inputs", def.inputs.len())));
    }
    if !op.output_arity().contains(&def.outputs.len()) {
        return Err(invalid(format!("{} outputs", def.outputs.len())));
    }
    for &i in def.inputs.iter().chain(&def.outputs) {
        if i >= image.tensors.len() {
            return Err(invalid(format!("tensor index {i} out of range")));
        }
    }
    for &i in &def.inputs {
        if !defined[i] {
            return Err(invalid(format!(
                "reads tensor {i} '{}' before it is produced",
                image.tensors[i].name
            )));
        }
    }
    for &o in &def.outputs {
        if image.tensors[o].is_constant() {
            return Err(invalid(format!("writes constant tensor {o}")));
        }
        if defined[o] {
            return Err(invalid(format!("tensor {o} has more than one producer")));
        }
        defined[o] = true;
    }
    Ok(())
}

// ── Shared accessors ───────────────────────────────────────────────

impl<S: GraphState> ModelGraph<S> {
    /// Schema version recorded in the image.
    pub fn version(&self) -> u32 {
        self.image.version
    }

    pub fn description(&self) -> &str {
        &self.image.description
    }

    pub fn image(&self) -> &ModelImage {
        &self.image
    }
}

// ── Validated state ────────────────────────────────────────────────

impl ModelGraph<Validated> {
    pub fn tensors(&self) -> &[TensorDef] {
        &self.image.tensors
    }

    pub fn tensor(&self, index: usize) -> Option<&TensorDef> {
        self.image.tensors.get(index)
    }

    /// Top-level operators in execution order.
    pub fn operators(&self) -> &[OperatorDef] {
        &self.image.operators
    }

    /// Index of the single graph input.
    pub fn input(&self) -> usize {
        self.image.inputs[0]
    }

    /// Index of the single graph output.
    pub fn output(&self) -> usize {
        self.image.outputs[0]
    }

    pub fn input_tensor(&self) -> &TensorDef {
        &self.image.tensors[self.input()]
    }

    pub fn output_tensor(&self) -> &TensorDef {
        &self.image.tensors[self.output()]
    }

    /// Every operator kind used, including those nested in offload nodes.
    pub fn opcodes(&self) -> BTreeSet<OpCode> {
        self.image
            .operators
            .iter()
            .flat_map(|def| std::iter::once(def).chain(def.offloaded()))
            .map(|def| def.op.code())
            .collect()
    }

    /// Number of operators executed on the accelerator.
    pub fn offloaded_count(&self) -> usize {
        self.image.operators.iter().map(|d| d.offloaded().len()).sum()
    }

    /// Number of execution steps once offload nodes are expanded.
    pub fn num_steps(&self) -> usize {
        self.image
            .operators
            .iter()
            .map(|d| match d.op {
                Operator::NpuOffload { .. } => d.offloaded().len(),
                _ => 1,
            })
            .sum()
    }

    /// Live ranges of every variable tensor over the expanded step sequence.
    ///
    /// Constants get `None`. The graph input is live from step 0 and the
    /// graph output until the last step, since both are accessed outside
    /// of operator execution.
    pub fn tensor_lifetimes(&self) -> Vec<Option<TensorLifetime>> {
        let mut lifetimes: Vec<Option<TensorLifetime>> = vec![None; self.image.tensors.len()];
        let mut touch = |t: usize, step: usize| {
            let slot = &mut lifetimes[t];
            match slot {
                Some(l) => {
                    l.first = l.first.min(step);
                    l.last = l.last.max(step);
                }
                None => *slot = Some(TensorLifetime { first: step, last: step }),
            }
        };

        let mut step = 0;
        for def in &self.image.operators {
            let leaves: &[OperatorDef] = match def.op {
                Operator::NpuOffload { .. } => def.offloaded(),
                _ => std::slice::from_ref(def),
            };
            for leaf in leaves {
                for &t in leaf.inputs.iter().chain(&leaf.outputs) {
                    if !self.image.tensors[t].is_constant() {
                        touch(t, step);
                    }
                }
                step += 1;
            }
        }
        let last_step = step.saturating_sub(1);
        touch(self.input(), 0);
        touch(self.output(), last_step);
        lifetimes
    }

    /// Total bytes of constant tensor data.
    pub fn constant_bytes(&self) -> usize {
        self.image
            .tensors
            .iter()
            .filter(|t| t.is_constant())
            .map(TensorDef::size_bytes)
            .sum()
    }

    /// Returns a summary string describing the model.
    pub fn summary(&self) -> String {
        format!(
            "Model '{}' (schema v{}): {} operators ({} offloaded), {} tensors, {} bytes of constants",
            self.image.description,
            self.image.version,
            self.image.operators.len(),
            self.offloaded_count(),
            self.image.tensors.len(),
            self.constant_bytes(),
        )
    }
}

impl<S: GraphState> fmt::Display for ModelGraph<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "ModelGraph '{}' ({} operators):",
            self.image.description,
            self.image.operators.len()
        )?;
        for def in &self.image.operators {
            writeln!(f, "  {}", def.summary())?;
            for sub in def.offloaded() {
                writeln!(f, "    {}", sub.summary())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TensorData;
    use tensor_core::{QuantParams, Shape};

    fn i8_tensor(name: &str, len: usize) -> TensorDef {
        TensorDef {
            name: name.into(),
            shape: Shape::new(vec![1, len]),
            dtype: DType::I8,
            quant: Some(QuantParams::new(0.1, 0).unwrap()),
            data: None,
        }
    }

    fn op(op: Operator, inputs: &[usize], outputs: &[usize]) -> OperatorDef {
        OperatorDef {
            op,
            inputs: inputs.to_vec(),
            outputs: outputs.to_vec(),
        }
    }

    /// input(0) -relu6-> 1 -offload[relu6]-> 2 -reshape-> 3
    fn chain() -> ModelImage {
        ModelImage {
            version: 3,
            description: "chain".into(),
            tensors: (0..4).map(|i| i8_tensor(&format!("t{i}"), 4)).collect(),
            operators: vec![
                op(Operator::Relu6, &[0], &[1]),
                op(
                    Operator::NpuOffload {
                        operators: vec![op(Operator::Relu6, &[1], &[2])],
                    },
                    &[1],
                    &[2],
                ),
                op(Operator::Reshape, &[2], &[3]),
            ],
            inputs: vec![0],
            outputs: vec![3],
        }
    }

    #[test]
    fn test_validate_ok() {
        let g = ModelGraph::new(chain()).validate().unwrap();
        assert_eq!(g.input(), 0);
        assert_eq!(g.output(), 3);
        assert_eq!(g.num_steps(), 3);
        assert_eq!(g.offloaded_count(), 1);
        let codes: Vec<_> = g.opcodes().into_iter().collect();
        assert_eq!(codes, vec![OpCode::Relu6, OpCode::Reshape, OpCode::NpuOffload]);
    }

    #[test]
    fn test_validate_empty() {
        let mut img = chain();
        img.operators.clear();
        assert!(ModelGraph::new(img).validate().is_err());
    }

    #[test]
    fn test_read_before_write_rejected() {
        let mut img = chain();
        img.operators.swap(0, 2);
        let err = ModelGraph::new(img).validate().unwrap_err();
        assert!(matches!(err, ModelError::InvalidOperator { index: 0, .. }));
    }

    #[test]
    fn test_double_producer_rejected() {
        let mut img = chain();
        img.operators.push(op(Operator::Relu6, &[0], &[3]));
        assert!(ModelGraph::new(img).validate().is_err());
    }

    #[test]
    fn test_index_out_of_range() {
        let mut img = chain();
        img.operators[2].outputs = vec![99];
        assert!(ModelGraph::new(img).validate().is_err());
    }

    #[test]
    fn test_bad_arity() {
        let mut img = chain();
        img.operators[0].inputs = vec![0, 0];
        let err = ModelGraph::new(img).validate().unwrap_err();
        assert!(matches!(err, ModelError::InvalidOperator { op: OpCode::Relu6, .. }));
    }

    #[test]
    fn test_i8_requires_quant() {
        let mut img = chain();
        img.tensors[2].quant = None;
        assert!(matches!(
            ModelGraph::new(img).validate(),
            Err(ModelError::InvalidTensor { index: 2, .. })
        ));
    }

    #[test]
    fn test_zero_scale_rejected() {
        let mut img = chain();
        img.tensors[1].quant = Some(QuantParams {
            scale: 0.0,
            zero_point: 0,
        });
        assert!(ModelGraph::new(img).validate().is_err());
    }

    #[test]
    fn test_constant_length_checked() {
        let mut img = chain();
        img.tensors.push(TensorDef {
            name: "c".into(),
            shape: Shape::vector(3),
            dtype: DType::I32,
            quant: None,
            data: Some(TensorData::I32(vec![1, 2])),
        });
        assert!(ModelGraph::new(img).validate().is_err());
    }

    #[test]
    fn test_nested_offload_rejected() {
        let mut img = chain();
        let inner = img.operators[1].clone();
        img.operators[1] = op(
            Operator::NpuOffload {
                operators: vec![inner],
            },
            &[1],
            &[2],
        );
        assert!(ModelGraph::new(img).validate().is_err());
    }

    #[test]
    fn test_offload_must_produce_outputs() {
        let mut img = chain();
        img.operators[1] = op(
            Operator::NpuOffload {
                operators: vec![op(Operator::Relu6, &[1], &[3])],
            },
            &[1],
            &[2],
        );
        assert!(ModelGraph::new(img).validate().is_err());
    }

    #[test]
    fn test_two_outputs_rejected() {
        let mut img = chain();
        img.outputs = vec![2, 3];
        assert!(ModelGraph::new(img).validate().is_err());
    }

    #[test]
    fn test_lifetimes() {
        let g = ModelGraph::new(chain()).validate().unwrap();
        let l = g.tensor_lifetimes();
        assert_eq!(l[0], Some(TensorLifetime { first: 0, last: 0 }));
        assert_eq!(l[1], Some(TensorLifetime { first: 0, last: 1 }));
        assert_eq!(l[2], Some(TensorLifetime { first: 1, last: 2 }));
        assert_eq!(l[3], Some(TensorLifetime { first: 2, last: 2 }));
    }

    #[test]
    fn test_summary_and_display() {
        let g = ModelGraph::new(chain()).validate().unwrap();
        assert!(g.summary().contains("3 operators (1 offloaded)"));
        let shown = format!("{g}");
        assert!(shown.contains("npu_offload"));
        assert!(shown.contains("    relu6"));
    }
}
