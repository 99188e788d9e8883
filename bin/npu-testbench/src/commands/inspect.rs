// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `npu-tb inspect`: display the model image and its arena plan.

use model_ir::{ModelLoader, OperatorDef};
use runtime::{OpResolver, TestbenchConfig};

pub fn execute(config: &TestbenchConfig) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║              npu-tb · Model Inspector                ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let source = config.runtime.model_source();
    let graph = ModelLoader::load(&source)
        .map_err(|e| anyhow::anyhow!("failed to load model from {}: {e}", source.describe()))?;

    // ── Summary ────────────────────────────────────────────────
    println!("  {}", graph.summary());
    println!("  Variant constants: {} ({})",
        runtime::model_params::ACTIVE_VARIANT, config.runtime.quant.input);
    println!();

    // ── Tensors ────────────────────────────────────────────────
    println!(
        "  {:<4} {:<32} {:<16} {:<5} {:>8}  {}",
        "Idx", "Name", "Shape", "Type", "Bytes", "Quant",
    );
    println!("  {}", "-".repeat(88));
    for (i, t) in graph.tensors().iter().enumerate() {
        let quant = t.quant.map_or_else(|| "-".to_string(), |q| q.to_string());
        println!(
            "  {:<4} {:<32} {:<16} {:<5} {:>8}  {}{}",
            i,
            truncate(&t.name, 32),
            t.shape.to_string(),
            t.dtype.as_str(),
            t.size_bytes(),
            quant,
            if t.is_constant() { "  (const)" } else { "" },
        );
    }
    println!();

    // ── Operators ──────────────────────────────────────────────
    println!("  Operators:");
    for (i, def) in graph.operators().iter().enumerate() {
        print_op(i.to_string(), def, 1);
    }
    println!();

    // ── Resolver / Arena ───────────────────────────────────────
    let resolver = OpResolver::with_builtin_ops()?;
    resolver.check(&graph)?;
    println!(
        "  Resolver: {} of {} entries used, all operators registered",
        resolver.len(),
        runtime::RESOLVER_CAPACITY
    );

    let rt = super::ready_runtime(&config.runtime)?;
    let capacity = config.runtime.arena_capacity()?;
    println!(
        "  Arena:    {} of {capacity} planned ({})",
        rt.arena_used(),
        rt.arena_stats().summary()
    );
    println!();
    Ok(())
}

fn print_op(label: String, def: &OperatorDef, depth: usize) {
    println!("  {}{:<6} {}", "  ".repeat(depth), label, def.summary());
    for (j, inner) in def.offloaded().iter().enumerate() {
        print_op(format!("{label}.{j}"), inner, depth + 1);
    }
}

/// Truncates a string to `max_len` with ellipsis if needed.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    }
}
