// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

// Allowed: This is a CLI code generation tool, not server code.
// Using println! for progress output is appropriate here.
#![allow(clippy::disallowed_macros)]

use flowkit_core::{BufferStrategy, ErrorStrategy, GraphConfig, NodeControlMessage, NodeDefinition, NodeStatus};
use std::fs;
use std::path::Path;
use ts_rs::TS;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let declarations = vec![
        // flowkit-core
        format!("// flowkit-core\nexport {}", NodeStatus::decl()),
        format!("export {}", BufferStrategy::decl()),
        format!("export {}", ErrorStrategy::decl()),
        format!("export {}", NodeControlMessage::decl()),
        format!("export {}", GraphConfig::decl()),
        format!("export {}", NodeDefinition::decl()),
        // flowkit-api: the declarative graph-document schema
        format!("\n// flowkit-api\nexport {}", flowkit_api::NodeDoc::decl()),
        format!("export {}", flowkit_api::EdgeDoc::decl()),
        format!("export {}", flowkit_api::GraphDocument::decl()),
    ];

    let output = declarations.join("\n\n");
    let content = format!("// This file is auto-generated. Do not edit it manually.\n\n{output}");

    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let workspace_root = manifest_dir
        .parent()
        .and_then(|parent| parent.parent())
        .ok_or("Failed to find workspace root from CARGO_MANIFEST_DIR")?;
    let output_path = workspace_root.join("crates/api/bindings/graph-document.ts");

    println!("Writing TypeScript bindings to: {}", output_path.display());

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&output_path, content)?;

    println!("TypeScript bindings generated successfully.");

    Ok(())
}
