// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The model runtime with a type-state-enforced lifecycle.
//!
//! ```text
//! ModelRuntime<Uninitialized>
//!     │  .initialize(interrupts)
//!     ▼
//! ModelRuntime<Ready>
//!     │  .run_inference(sample)   (repeatable)
//!     ▼
//!   InferenceOutput
//! ```
//!
//! Initialization consumes the uninitialized runtime, so inference on a
//! runtime whose accelerator or arena was never set up does not compile.

use crate::interpreter::Interpreter;
use crate::model_params::ModelParams;
use crate::resolver::OpResolver;
use crate::{InitError, RuntimeConfig, RuntimeError};
use accelerator::{AcceleratorAdapter, InterruptController, NpuDriver};
use dataset::Sample;
use memory_manager::ArenaStats;
use model_ir::{graph::Validated, ModelGraph, ModelLoader};
use std::time::{Duration, Instant};
use tensor_core::as_i8_mut;

/// Score at or above which a sample is classified as AF.
pub const DETECTION_THRESHOLD: f32 = 0.5;

// ── Type-state markers ─────────────────────────────────────────

/// Created, nothing initialized yet.
#[derive(Debug)]
pub struct Uninitialized;

/// Accelerator up, model loaded and planned into the arena.
#[derive(Debug)]
pub struct Ready {
    interpreter: Interpreter,
}

/// Sealed trait for runtime states.
pub trait RuntimeState: std::fmt::Debug {}
impl RuntimeState for Uninitialized {}
impl RuntimeState for Ready {}

// ── Inference output ───────────────────────────────────────────

/// Thresholded reading of the first output value.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Detection {
    /// Dequantized output clamped to `[0, 1]`.
    pub score: f32,
    /// `score >= DETECTION_THRESHOLD`.
    pub detected: bool,
}

impl Detection {
    /// Dequantizes `raw` with `quant` and applies the fixed threshold.
    pub fn from_raw(raw: i8, quant: tensor_core::QuantParams) -> Self {
        let score = quant.dequantize(raw).clamp(0.0, 1.0);
        Self {
            score,
            detected: score >= DETECTION_THRESHOLD,
        }
    }
}

/// The result of one inference.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceOutput {
    /// Raw output values, copied out of the arena.
    pub raw: Vec<i8>,
    pub detection: Detection,
    /// Input features that had to be clamped during quantization.
    pub saturated: usize,
    /// Wall time of quantize, invoke and copy-out.
    pub duration: Duration,
}

// ── Runtime ────────────────────────────────────────────────────

/// One model instance bound to one accelerator.
///
/// # Example
/// ```
/// use accelerator::sim;
/// use dataset::Sample;
/// use runtime::{ModelRuntime, RuntimeConfig};
///
/// let (npu, nvic) = sim::simulated(0);
/// let mut rt = ModelRuntime::new(RuntimeConfig::default(), Box::new(npu))
///     .initialize(nvic.as_ref())
///     .unwrap();
/// let out = rt.run_inference(&Sample::from_features(vec![60.0; 40])).unwrap();
/// assert_eq!(out.raw.len(), 1);
/// ```
pub struct ModelRuntime<S: RuntimeState = Uninitialized> {
    config: RuntimeConfig,
    adapter: AcceleratorAdapter,
    state: S,
}

// ── Uninitialized → Ready ──────────────────────────────────────

impl ModelRuntime<Uninitialized> {
    /// Creates a runtime that will drive `driver`.
    pub fn new(config: RuntimeConfig, driver: Box<dyn NpuDriver>) -> Self {
        let adapter = AcceleratorAdapter::new(driver, config.npu);
        Self {
            config,
            adapter,
            state: Uninitialized,
        }
    }

    /// Brings up the accelerator, loads and checks the model, and plans the
    /// arena with every built-in operator registered. Transitions to the
    /// `Ready` state.
    ///
    /// # Errors
    /// Every failure is fatal; see [`InitError`].
    pub fn initialize(
        self,
        interrupts: &dyn InterruptController,
    ) -> Result<ModelRuntime<Ready>, InitError> {
        let resolver = OpResolver::with_builtin_ops()?;
        self.initialize_with_resolver(interrupts, &resolver)
    }

    /// Like [`initialize`](Self::initialize), but only the operators held by
    /// `resolver` may appear in the graph.
    ///
    /// Steps:
    /// 1. Parse the arena size and check the quantization constants.
    /// 2. Register the NPU interrupt and initialize the driver.
    /// 3. Load the model image and check its schema version.
    /// 4. Validate the graph and check every operator against the resolver.
    /// 5. Plan all variable tensors into the arena.
    ///
    /// # Errors
    /// Every failure is fatal; see [`InitError`].
    pub fn initialize_with_resolver(
        mut self,
        interrupts: &dyn InterruptController,
        resolver: &OpResolver,
    ) -> Result<ModelRuntime<Ready>, InitError> {
        let capacity = self
            .config
            .arena_capacity()
            .map_err(|e| InitError::Config(e.to_string()))?;
        self.config
            .quant
            .validate()
            .map_err(|e| InitError::Config(format!("invalid model parameters: {e}")))?;

        self.adapter.initialize(interrupts)?;

        let source = self.config.model_source();
        tracing::info!(source = %source.describe(), "loading model");
        let graph = ModelLoader::open(&source)?;
        ModelLoader::check_version(graph.version())?;
        let graph = graph.validate()?;
        tracing::info!("{}", graph.summary());
        warn_on_quant_drift(&graph, &self.config.quant);

        resolver.check(&graph)?;

        let interpreter = Interpreter::new(graph, capacity)?;
        tracing::info!(
            arena_used = interpreter.arena_used(),
            arena_capacity = capacity.as_bytes(),
            "model runtime ready"
        );

        Ok(ModelRuntime {
            config: self.config,
            adapter: self.adapter,
            state: Ready { interpreter },
        })
    }
}

/// The runtime quantizes with its build-time constants; differing image
/// parameters usually mean the wrong variant was flashed.
fn warn_on_quant_drift(graph: &ModelGraph<Validated>, params: &ModelParams) {
    let pairs = [
        ("input", graph.input_tensor().quant, params.input),
        ("output", graph.output_tensor().quant, params.output),
    ];
    for (role, image, configured) in pairs {
        if image != Some(configured) {
            tracing::warn!(
                role,
                image = ?image,
                configured = %configured,
                "model image quantization differs from the configured constants"
            );
        }
    }
}

// ── Ready ──────────────────────────────────────────────────────

impl ModelRuntime<Ready> {
    /// Quantizes `sample`, runs the graph and reads the output.
    ///
    /// Only the first [`input_len`](Self::input_len) features are used.
    ///
    /// # Errors
    /// - [`RuntimeError::InputMismatch`] if the sample is shorter than the input.
    /// - [`RuntimeError::InferenceFailed`] if any operator or the NPU failed.
    pub fn run_inference(&mut self, sample: &Sample) -> Result<InferenceOutput, RuntimeError> {
        let start = Instant::now();
        let interpreter = &mut self.state.interpreter;
        let width = interpreter.input_len();
        if sample.features.len() < width {
            return Err(RuntimeError::InputMismatch {
                expected: width,
                actual: sample.features.len(),
            });
        }

        let input = interpreter.input_mut()?;
        let saturated = self
            .config
            .quant
            .input
            .quantize_slice(&sample.features[..width], input)
            .map_err(|e| RuntimeError::Config(e.to_string()))?;
        if saturated > 0 {
            tracing::warn!(saturated, "input features clamped during quantization");
        }

        interpreter.invoke(&mut self.adapter)?;

        let raw = interpreter.output()?.to_vec();
        let first = raw.first().copied().unwrap_or(i8::MIN);
        let detection = Detection::from_raw(first, self.config.quant.output);
        tracing::debug!(
            "AF: raw={}, score={}%, {}",
            first,
            (detection.score * 100.0).round() as i32,
            if detection.detected { "DETECTED" } else { "normal" }
        );

        Ok(InferenceOutput {
            raw,
            detection,
            saturated,
            duration: start.elapsed(),
        })
    }

    /// Number of input features the model consumes.
    pub fn input_len(&self) -> usize {
        self.state.interpreter.input_len()
    }

    /// Number of raw output values per inference.
    pub fn output_len(&self) -> usize {
        self.state.interpreter.output_len()
    }

    pub fn graph(&self) -> &ModelGraph<Validated> {
        self.state.interpreter.graph()
    }

    pub fn arena_stats(&self) -> &ArenaStats {
        self.state.interpreter.arena_stats()
    }

    /// Bytes of the arena the tensor plan occupies.
    pub fn arena_used(&self) -> usize {
        self.state.interpreter.arena_used()
    }

    /// NPU jobs completed so far.
    pub fn npu_jobs(&self) -> u64 {
        self.adapter.jobs_completed()
    }

    /// Teardown hook. Nothing is released yet; the arena and driver live as
    /// long as the runtime.
    pub fn deinit(&mut self) {
        tracing::debug!("model runtime deinit");
    }
}

impl<S: RuntimeState> ModelRuntime<S> {
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn quant(&self) -> ModelParams {
        self.config.quant
    }
}

impl<S: RuntimeState> std::fmt::Debug for ModelRuntime<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRuntime")
            .field("config", &self.config)
            .field("adapter", &self.adapter)
            .field("state", &self.state)
            .finish()
    }
}
