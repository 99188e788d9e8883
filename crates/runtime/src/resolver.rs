// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Fixed-capacity operator registry.

use crate::InitError;
use model_ir::{graph::Validated, ModelGraph, OpCode};

/// Number of operators the resolver can hold.
pub const RESOLVER_CAPACITY: usize = 12;

/// The set of operator kinds this build can execute.
#[derive(Debug, Clone, Default)]
pub struct OpResolver {
    ops: Vec<OpCode>,
}

impl OpResolver {
    /// Creates an empty resolver.
    pub fn new() -> Self {
        Self {
            ops: Vec::with_capacity(RESOLVER_CAPACITY),
        }
    }

    /// Creates a resolver holding every operator in [`OpCode::ALL`].
    ///
    /// Image parsing already rejects unknown operator tags, so a graph never
    /// fails [`check`](Self::check) against this resolver. Hand-built
    /// resolvers are what narrow the accepted set.
    pub fn with_builtin_ops() -> Result<Self, InitError> {
        let mut resolver = Self::new();
        for op in OpCode::ALL {
            resolver.add(op)?;
        }
        Ok(resolver)
    }

    /// Registers `op`. Registering an operator twice is a no-op.
    ///
    /// # Errors
    /// [`InitError::ResolverFull`] once [`RESOLVER_CAPACITY`] operators are registered.
    pub fn add(&mut self, op: OpCode) -> Result<(), InitError> {
        if self.contains(op) {
            return Ok(());
        }
        if self.ops.len() == RESOLVER_CAPACITY {
            return Err(InitError::ResolverFull {
                capacity: RESOLVER_CAPACITY,
            });
        }
        self.ops.push(op);
        Ok(())
    }

    pub fn contains(&self, op: OpCode) -> bool {
        self.ops.contains(&op)
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Fails on the first operator `graph` uses that is not registered.
    pub fn check(&self, graph: &ModelGraph<Validated>) -> Result<(), InitError> {
        match graph.opcodes().into_iter().find(|&op| !self.contains(op)) {
            Some(op) => Err(InitError::UnsupportedOperator { op }),
            None => Ok(()),
        }
    }
}
