// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Graph interpreter over a single tensor arena.
//!
//! Variable tensors are planned into the arena once, using their live
//! ranges over the expanded step sequence, so tensors that are never live
//! together share bytes. Constants are decoded from the image once and
//! read in place. Operators run in graph order; an offload node hands its
//! sub-graph to the accelerator as one [`NpuJob`] and blocks until the
//! completion interrupt.

use crate::{ExecError, InitError};
use accelerator::{AcceleratorAdapter, JobFault, NpuJob};
use memory_manager::{ArenaCapacity, ArenaPlan, ArenaSlot, ArenaStats, TensorArena, TensorRequest};
use model_ir::{graph::Validated, ModelGraph, OpCode, Operator, OperatorDef, TensorDef};
use tensor_core::{as_i8, as_i8_mut, decode_i32_le, QuantParams, QuantTensor, QuantTensorMut};

/// Arena slots and constant data the kernels read and write.
struct TensorStore {
    arena: TensorArena,
    slots: Vec<Option<ArenaSlot>>,
    constants: Vec<Option<Vec<u8>>>,
}

/// Executes a validated graph.
pub struct Interpreter {
    graph: ModelGraph<Validated>,
    store: TensorStore,
    plan_peak: usize,
}

impl Interpreter {
    /// Plans every variable tensor into an arena of `capacity` bytes.
    ///
    /// # Errors
    /// [`InitError::ArenaExhausted`] if the plan needs more than `capacity`.
    pub fn new(graph: ModelGraph<Validated>, capacity: ArenaCapacity) -> Result<Self, InitError> {
        let lifetimes = graph.tensor_lifetimes();
        let mut planned = Vec::new();
        let mut requests = Vec::new();
        for (index, lifetime) in lifetimes.iter().enumerate() {
            if let Some(l) = lifetime {
                planned.push(index);
                requests.push(TensorRequest {
                    size: graph.tensors()[index].size_bytes(),
                    first_use: l.first,
                    last_use: l.last,
                });
            }
        }

        let plan = ArenaPlan::greedy(&requests)?;
        let mut arena = TensorArena::new(capacity);
        arena.commit(&plan)?;

        let mut slots = vec![None; graph.tensors().len()];
        for (&index, &slot) in planned.iter().zip(plan.slots()) {
            slots[index] = Some(slot);
        }
        let constants = graph
            .tensors()
            .iter()
            .map(|t| t.data.as_ref().map(|d| d.to_le_bytes()))
            .collect();

        tracing::debug!(
            tensors = planned.len(),
            peak = plan.peak(),
            capacity = arena.capacity(),
            "tensor arena planned"
        );

        Ok(Self {
            graph,
            store: TensorStore {
                arena,
                slots,
                constants,
            },
            plan_peak: plan.peak(),
        })
    }

    pub fn graph(&self) -> &ModelGraph<Validated> {
        &self.graph
    }

    /// Bytes of arena the plan uses.
    pub fn arena_used(&self) -> usize {
        self.plan_peak
    }

    pub fn arena_stats(&self) -> &ArenaStats {
        self.store.arena.stats()
    }

    /// Number of `i8` elements in the graph input.
    pub fn input_len(&self) -> usize {
        self.graph.input_tensor().shape.num_elements()
    }

    /// Number of `i8` elements in the graph output.
    pub fn output_len(&self) -> usize {
        self.graph.output_tensor().shape.num_elements()
    }

    /// Mutable view of the graph input.
    pub fn input_mut(&mut self) -> Result<&mut [i8], ExecError> {
        let slot = self.store.slot(self.graph.input())?;
        Ok(as_i8_mut(self.store.arena.slot_mut(slot)?))
    }

    /// View of the graph output after [`invoke`](Self::invoke).
    pub fn output(&self) -> Result<&[i8], ExecError> {
        let slot = self.store.slot(self.graph.output())?;
        Ok(as_i8(self.store.arena.slot(slot)?))
    }

    /// Runs every operator once.
    ///
    /// # Errors
    /// The first kernel, arena or accelerator failure, as an [`ExecError`].
    pub fn invoke(&mut self, npu: &mut AcceleratorAdapter) -> Result<(), ExecError> {
        let tensors = self.graph.tensors();
        for def in self.graph.operators() {
            match &def.op {
                Operator::NpuOffload { operators } => {
                    let mut job = OffloadJob {
                        store: &mut self.store,
                        tensors,
                        operators,
                        fault: None,
                    };
                    let submitted = npu.invoke(&mut job);
                    if let Some(fault) = job.fault {
                        return Err(fault);
                    }
                    submitted?;
                }
                _ => self.store.run(tensors, def)?,
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("operators", &self.graph.operators().len())
            .field("arena_used", &self.plan_peak)
            .field("arena_capacity", &self.store.arena.capacity())
            .finish()
    }
}

/// An offloaded sub-graph, executed by the NPU when it picks the job up.
struct OffloadJob<'a> {
    store: &'a mut TensorStore,
    tensors: &'a [TensorDef],
    operators: &'a [OperatorDef],
    fault: Option<ExecError>,
}

impl NpuJob for OffloadJob<'_> {
    fn name(&self) -> &str {
        "npu_offload"
    }

    fn run(&mut self) -> Result<(), JobFault> {
        for def in self.operators {
            if let Err(e) = self.store.run(self.tensors, def) {
                let fault = JobFault(e.to_string());
                self.fault = Some(e);
                return Err(fault);
            }
        }
        Ok(())
    }
}

fn quant(tensors: &[TensorDef], index: usize) -> Result<QuantParams, ExecError> {
    tensors[index]
        .quant
        .ok_or(ExecError::MissingQuant { tensor: index })
}

fn view<'t>(
    op: OpCode,
    bytes: &'t [u8],
    tensors: &'t [TensorDef],
    index: usize,
) -> Result<QuantTensor<'t>, ExecError> {
    QuantTensor::new(as_i8(bytes), &tensors[index].shape, quant(tensors, index)?)
        .map_err(|source| ExecError::Kernel { op, source })
}

fn view_mut<'t>(
    op: OpCode,
    bytes: &'t mut [u8],
    tensors: &'t [TensorDef],
    index: usize,
) -> Result<QuantTensorMut<'t>, ExecError> {
    QuantTensorMut::new(as_i8_mut(bytes), &tensors[index].shape, quant(tensors, index)?)
        .map_err(|source| ExecError::Kernel { op, source })
}

fn bias(op: OpCode, bytes: Option<&[u8]>) -> Result<Option<Vec<i32>>, ExecError> {
    bytes
        .map(decode_i32_le)
        .transpose()
        .map_err(|source| ExecError::Kernel { op, source })
}

impl TensorStore {
    fn slot(&self, tensor: usize) -> Result<ArenaSlot, ExecError> {
        self.slots[tensor].ok_or(ExecError::Unplanned { tensor })
    }

    /// Executes one non-offload operator.
    fn run(&mut self, tensors: &[TensorDef], def: &OperatorDef) -> Result<(), ExecError> {
        let code = def.op.code();
        let out_index = def.outputs[0];
        let out_slot = self.slot(out_index)?;
        let variable: Vec<ArenaSlot> = def.inputs.iter().filter_map(|&t| self.slots[t]).collect();
        let (views, out) = self.arena.split_io(&variable, out_slot)?;

        let mut views = views.into_iter();
        let mut inputs: Vec<&[u8]> = Vec::with_capacity(def.inputs.len());
        for &t in &def.inputs {
            match &self.constants[t] {
                Some(bytes) => inputs.push(bytes),
                None => inputs.push(views.next().ok_or(ExecError::Unplanned { tensor: t })?),
            }
        }

        let kernel = |source| ExecError::Kernel { op: code, source };
        let in_def = &tensors[def.inputs[0]];

        let result = match &def.op {
            Operator::Conv2d(params) => {
                let input = view(code, inputs[0], tensors, def.inputs[0])?;
                let filter = view(code, inputs[1], tensors, def.inputs[1])?;
                let bias = bias(code, inputs.get(2).copied())?;
                let mut output = view_mut(code, out, tensors, out_index)?;
                tensor_core::conv2d(&input, &filter, bias.as_deref(), params, &mut output)
                    .map_err(kernel)
            }
            Operator::DepthwiseConv2d(params) => {
                let input = view(code, inputs[0], tensors, def.inputs[0])?;
                let filter = view(code, inputs[1], tensors, def.inputs[1])?;
                let bias = bias(code, inputs.get(2).copied())?;
                let mut output = view_mut(code, out, tensors, out_index)?;
                tensor_core::depthwise_conv2d(&input, &filter, bias.as_deref(), params, &mut output)
                    .map_err(kernel)
            }
            Operator::Relu6 => {
                let input = view(code, inputs[0], tensors, def.inputs[0])?;
                let mut output = view_mut(code, out, tensors, out_index)?;
                tensor_core::relu6(&input, &mut output).map_err(kernel)
            }
            Operator::AveragePool2d(params) => {
                let input = view(code, inputs[0], tensors, def.inputs[0])?;
                let mut output = view_mut(code, out, tensors, out_index)?;
                tensor_core::avg_pool2d(&input, params, &mut output).map_err(kernel)
            }
            Operator::Softmax { beta } => {
                let input = view(code, inputs[0], tensors, def.inputs[0])?;
                let mut output = view_mut(code, out, tensors, out_index)?;
                tensor_core::softmax(&input, *beta, &mut output).map_err(kernel)
            }
            Operator::Dequantize => {
                let input = view(code, inputs[0], tensors, def.inputs[0])?;
                tensor_core::dequantize(&input, out).map_err(kernel)
            }
            Operator::Reshape => tensor_core::reshape(inputs[0], out).map_err(kernel),
            Operator::StridedSlice(params) => tensor_core::strided_slice(
                inputs[0],
                &in_def.shape,
                in_def.dtype.size_bytes(),
                params,
                out,
            )
            .map_err(kernel),
            Operator::Pack { axis } => tensor_core::pack(
                &inputs,
                &in_def.shape,
                in_def.dtype.size_bytes(),
                *axis,
                out,
            )
            .map_err(kernel),
            // The fill value is the last input; a leading dims input only
            // restates the output shape.
            Operator::Fill => {
                let value = inputs.last().copied().unwrap_or_default();
                tensor_core::fill(value, out).map_err(kernel)
            }
            Operator::NpuOffload { .. } => Err(ExecError::NestedOffload),
        };
        result.inspect_err(|e| tracing::debug!(op = %code, error = %e, "operator failed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accelerator::{sim, NpuConfig};
    use model_ir::ModelImage;

    /// input [1,4] → reshape [1,4,1,1] → offload{relu6} → [1,4,1,1] → reshape [1,4].
    const SMALL: &str = r#"{
      "version": 3,
      "tensors": [
        { "name": "in",  "shape": [1, 4],       "dtype": "i8", "quant": { "scale": 0.1, "zero_point": 0 } },
        { "name": "r",   "shape": [1, 4, 1, 1], "dtype": "i8", "quant": { "scale": 0.1, "zero_point": 0 } },
        { "name": "act", "shape": [1, 4, 1, 1], "dtype": "i8", "quant": { "scale": 0.1, "zero_point": 0 } },
        { "name": "out", "shape": [1, 4],       "dtype": "i8", "quant": { "scale": 0.1, "zero_point": 0 } }
      ],
      "operators": [
        { "op": "reshape", "inputs": [0], "outputs": [1] },
        { "op": { "npu_offload": { "operators": [
            { "op": "relu6", "inputs": [1], "outputs": [2] }
        ] } }, "inputs": [1], "outputs": [2] },
        { "op": "reshape", "inputs": [2], "outputs": [3] }
      ],
      "inputs": [0],
      "outputs": [3]
    }"#;

    fn graph(json: &str) -> ModelGraph<Validated> {
        ModelGraph::new(ModelImage::from_slice(json.as_bytes()).unwrap())
            .validate()
            .unwrap()
    }

    fn adapter(npu: sim::SimulatedNpu, nvic: &sim::SimInterruptController) -> AcceleratorAdapter {
        let mut a = AcceleratorAdapter::new(Box::new(npu), NpuConfig::default());
        a.initialize(nvic).unwrap();
        a
    }

    #[test]
    fn test_runs_offloaded_relu6() {
        let (npu, nvic) = sim::simulated(0);
        let mut npu = adapter(npu, &nvic);
        let mut interp = Interpreter::new(graph(SMALL), ArenaCapacity::from_kb(1)).unwrap();
        interp.input_mut().unwrap().copy_from_slice(&[-20, 5, 70, 127]);
        interp.invoke(&mut npu).unwrap();
        // ReLU6 at scale 0.1 clamps to [0, 60].
        assert_eq!(interp.output().unwrap(), &[0, 5, 60, 60]);
        assert_eq!(npu.jobs_completed(), 1);
    }

    #[test]
    fn test_arena_too_small() {
        let err = Interpreter::new(graph(SMALL), ArenaCapacity::from_bytes(16)).unwrap_err();
        match err {
            InitError::ArenaExhausted { required, capacity } => {
                assert_eq!(capacity, 16);
                assert!(required > 16);
            }
            other => panic!("expected arena exhaustion, got {other:?}"),
        }
    }

    #[test]
    fn test_disjoint_lifetimes_share_bytes() {
        let interp = Interpreter::new(graph(SMALL), ArenaCapacity::from_kb(1)).unwrap();
        // Four 4-byte tensors, at most three live at once, each padded to 16.
        assert!(interp.arena_used() <= 48);
        assert_eq!(interp.input_len(), 4);
        assert_eq!(interp.output_len(), 4);
    }

    #[test]
    fn test_rejected_job_is_accelerator_error() {
        let (npu, nvic) = sim::simulated(0);
        let mut npu = adapter(npu.fail_invocation(1), &nvic);
        let mut interp = Interpreter::new(graph(SMALL), ArenaCapacity::from_kb(1)).unwrap();
        assert!(matches!(
            interp.invoke(&mut npu),
            Err(ExecError::Accelerator(accelerator::AcceleratorError::JobFailed { .. }))
        ));
        // The next invocation goes through.
        interp.invoke(&mut npu).unwrap();
    }

    #[test]
    fn test_kernel_fault_inside_offload_keeps_detail() {
        // Pool input and output quantization differ, which the kernel rejects.
        let json = SMALL
            .replace(
                r#""name": "act", "shape": [1, 4, 1, 1], "dtype": "i8", "quant": { "scale": 0.1"#,
                r#""name": "act", "shape": [1, 1, 1, 1], "dtype": "i8", "quant": { "scale": 0.2"#,
            )
            .replace(
                r#"{ "op": "relu6", "inputs": [1], "outputs": [2] }"#,
                r#"{ "op": { "average_pool2d": { "filter_h": 4, "filter_w": 1, "stride_h": 4, "stride_w": 1 } }, "inputs": [1], "outputs": [2] }"#,
            )
            .replace(r#""name": "out", "shape": [1, 4]"#, r#""name": "out", "shape": [1, 1]"#);
        let (npu, nvic) = sim::simulated(0);
        let mut npu = adapter(npu, &nvic);
        let mut interp = Interpreter::new(graph(&json), ArenaCapacity::from_kb(1)).unwrap();
        match interp.invoke(&mut npu) {
            Err(ExecError::Kernel { op, .. }) => assert_eq!(op, OpCode::AveragePool2d),
            other => panic!("expected kernel error, got {other:?}"),
        }
    }

    #[test]
    fn test_uninitialized_npu() {
        let (npu, _nvic) = sim::simulated(0);
        let mut npu = AcceleratorAdapter::new(Box::new(npu), NpuConfig::default());
        let mut interp = Interpreter::new(graph(SMALL), ArenaCapacity::from_kb(1)).unwrap();
        assert!(matches!(
            interp.invoke(&mut npu),
            Err(ExecError::Accelerator(accelerator::AcceleratorError::NotInitialized))
        ));
    }
}
