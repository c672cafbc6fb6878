//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::config::AppConfig;
use nodewire_core::{
    ConnectionRequest, FlatGraph, LinkBatch, LinkId, LinkTopology, NodeId, NodewireError,
    SlotResolver, Workflow, system::WorkflowMetrics, workflow_from_json_with_limit,
    workflow_to_json,
};
use std::path::{Path, PathBuf};

/// Inputs shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    pub workflow: PathBuf,
    pub output: Option<PathBuf>,
    pub json_mode: bool,
    pub config: AppConfig,
}

impl Context {
    fn resolver(&self) -> SlotResolver {
        SlotResolver::new(self.config.resolver.clone())
    }
}

// =============================================================================
// FILE VALIDATION
// =============================================================================

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), NodewireError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| NodewireError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(NodewireError::DeserializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Canonicalize an input path and require a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, NodewireError> {
    let canonical = path.canonicalize().map_err(|e| {
        NodewireError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(NodewireError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Canonicalize an output path's parent and require it to be a directory.
fn validate_output_path(path: &Path) -> Result<PathBuf, NodewireError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        NodewireError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(NodewireError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| NodewireError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

/// Read a size-checked file from a validated path.
fn read_checked(path: &Path, max_bytes: usize) -> Result<Vec<u8>, NodewireError> {
    let validated = validate_file_path(path)?;
    validate_file_size(&validated, max_bytes as u64)?;
    std::fs::read(&validated).map_err(|e| NodewireError::IoError(format!("Read file: {}", e)))
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show workflow metrics.
pub fn cmd_status(ctx: &Context) -> Result<(), NodewireError> {
    let flat = load_workflow(ctx)?;
    let metrics = WorkflowMetrics::from_graph(&flat);

    if ctx.json_mode {
        let output = serde_json::json!({
            "workflow": ctx.workflow.to_string_lossy(),
            "node_count": metrics.node_count,
            "link_count": metrics.link_count,
            "connected_inputs": metrics.connected_inputs,
            "open_inputs": metrics.open_inputs,
            "wired_percent": metrics.wired_percent(),
            "max_fan_out": metrics.max_fan_out,
            "last_link_id": metrics.last_link_id,
        });
        print_json(&output);
        return Ok(());
    }

    println!("Nodewire Workflow Status");
    println!("========================");
    println!("Workflow: {:?}", ctx.workflow);
    println!();
    println!("Nodes:            {}", metrics.node_count);
    println!("Links:            {}", metrics.link_count);
    println!(
        "Connected Inputs: {} ({}%)",
        metrics.connected_inputs,
        metrics.wired_percent()
    );
    println!("Open Inputs:      {}", metrics.open_inputs);
    println!("Max Fan-out:      {}", metrics.max_fan_out);
    println!("Last Link ID:     {}", metrics.last_link_id);

    Ok(())
}

// =============================================================================
// RESOLVER COMMANDS
// =============================================================================

/// Rank the slot pairs that could link `source` to `target`.
pub fn cmd_suggest(ctx: &Context, source: u64, target: u64) -> Result<(), NodewireError> {
    let workflow = Workflow::from_flat(load_workflow(ctx)?);
    let (source, target) = (NodeId(source), NodeId(target));

    for node in [source, target] {
        if workflow.find_node_by_id(node).is_none() {
            return Err(NodewireError::NodeNotFound(node));
        }
    }
    let report = workflow
        .suggest(&ctx.resolver(), source, target)
        .ok_or(NodewireError::NodeNotFound(source))?;

    if ctx.json_mode {
        let output = serde_json::to_value(&report)
            .map_err(|e| NodewireError::SerializationError(e.to_string()))?;
        print_json(&output);
        return Ok(());
    }

    if !report.is_compatible {
        println!("No compatible slots from node {} to node {}", source, target);
        return Ok(());
    }

    println!("Candidates from node {} to node {}:", source, target);
    for candidate in &report.candidates {
        println!(
            "  out {} '{}' ({}) -> in {} '{}' ({}){}",
            candidate.output_slot,
            candidate.output_name,
            candidate.output_type,
            candidate.input_slot,
            candidate.input_name,
            candidate.input_type,
            if candidate.names_match { "  [name match]" } else { "" }
        );
    }

    Ok(())
}

/// List every input that could accept `node`'s output `slot`.
pub fn cmd_targets(ctx: &Context, node: u64, slot: usize) -> Result<(), NodewireError> {
    let workflow = Workflow::from_flat(load_workflow(ctx)?);
    let node = NodeId(node);
    let output = workflow.runtime().output_slot(node, slot)?.clone();
    let targets = workflow.targets_for_output(&ctx.resolver(), node, slot);

    if ctx.json_mode {
        let output = serde_json::json!({
            "source_node": node,
            "output_slot": slot,
            "output_type": output.slot_type,
            "targets": targets,
        });
        print_json(&output);
        return Ok(());
    }

    println!(
        "Targets for node {} output {} '{}' ({}):",
        node, slot, output.name, output.slot_type
    );
    if targets.is_empty() {
        println!("  (none)");
    }
    for target in &targets {
        println!(
            "  node {} in {} '{}' ({}){}",
            target.node,
            target.input_slot,
            target.input_name,
            target.input_type,
            if target.occupied { "  [occupied]" } else { "" }
        );
    }

    Ok(())
}

// =============================================================================
// MUTATION COMMANDS
// =============================================================================

/// Link an output to an input, replacing whatever occupied the input.
pub fn cmd_connect(
    ctx: &Context,
    source: u64,
    source_slot: usize,
    target: u64,
    target_slot: usize,
    force: bool,
) -> Result<(), NodewireError> {
    let mut workflow = Workflow::from_flat(load_workflow(ctx)?);
    let request = ConnectionRequest::new(NodeId(source), source_slot, NodeId(target), target_slot);

    match ctx.resolver().check_request(workflow.runtime(), &request) {
        Err(NodewireError::IncompatibleTypes { output, input }) if force => {
            tracing::warn!("Forcing link from {} output into {} input", output, input);
        }
        result => result?,
    }

    let attachment = workflow.connect(request)?;
    tracing::info!(
        "Created link {} ({} replaced)",
        attachment.link_id,
        attachment.replaced.len()
    );
    let saved = save_workflow(ctx, workflow.flat())?;

    if ctx.json_mode {
        let output = serde_json::json!({
            "link_id": attachment.link_id,
            "replaced": attachment.replaced,
            "saved_to": saved.to_string_lossy(),
        });
        print_json(&output);
        return Ok(());
    }

    println!("Created link {}", attachment.link_id);
    for replaced in &attachment.replaced {
        println!("  replaced link {}", replaced);
    }
    println!("Saved to {:?}", saved);

    Ok(())
}

/// Remove a link. An unknown id leaves the file untouched.
pub fn cmd_disconnect(ctx: &Context, link: u64) -> Result<(), NodewireError> {
    let mut workflow = Workflow::from_flat(load_workflow(ctx)?);
    let removed = workflow.disconnect(LinkId(link));

    let saved = match &removed {
        Some(link) => {
            tracing::info!("Removed link {}", link.id);
            Some(save_workflow(ctx, workflow.flat())?)
        }
        None => None,
    };

    if ctx.json_mode {
        let output = serde_json::json!({
            "link_id": link,
            "removed": removed.is_some(),
            "saved_to": saved.map(|path| path.to_string_lossy().into_owned()),
        });
        print_json(&output);
        return Ok(());
    }

    match removed {
        Some(link) => println!(
            "Removed link {} (node {} out {} -> node {} in {})",
            link.id, link.source_node, link.source_slot, link.target_node, link.target_slot
        ),
        None => println!("Link {} not found; nothing to do", link),
    }

    Ok(())
}

/// Apply removals then additions from a batch file.
///
/// `rewire` (comma-separated node ids) adds the removal of every link
/// touching those nodes. Without `atomic`, steps applied before a failing
/// addition are saved before the error is returned.
pub fn cmd_batch(
    ctx: &Context,
    file: &Path,
    atomic: bool,
    rewire: Option<&str>,
) -> Result<(), NodewireError> {
    let mut workflow = Workflow::from_flat(load_workflow(ctx)?);

    let data = read_checked(file, ctx.config.limits.max_workflow_bytes)?;
    let mut batch: LinkBatch = serde_json::from_slice(&data).map_err(|e| {
        NodewireError::DeserializationError(format!("Failed to parse batch: {}", e))
    })?;
    if let Some(nodes) = rewire {
        let node_ids = parse_node_ids(nodes)?;
        require_nodes(&workflow, &node_ids)?;
        batch = workflow.rewire_batch(&node_ids, batch);
    }
    batch.validate(ctx.config.limits.max_batch_operations)?;
    tracing::info!(
        "Applying batch: {} removals, {} additions",
        batch.to_remove.len(),
        batch.to_add.len()
    );

    let result = if atomic {
        workflow.apply_batch_atomic(&batch)
    } else {
        workflow.apply_batch(&batch)
    };

    let summary = match result {
        Ok(summary) => summary,
        Err(error) => {
            tracing::error!("{}", error);
            let applied = error.applied.removed.len() + error.applied.added.len();
            if !atomic && applied > 0 {
                let saved = save_workflow(ctx, workflow.flat())?;
                tracing::warn!(
                    "Saved {} steps applied before the failure to {:?}",
                    applied,
                    saved
                );
            }
            return Err(error.source);
        }
    };
    let saved = save_workflow(ctx, workflow.flat())?;

    if ctx.json_mode {
        let output = serde_json::json!({
            "removed": summary.removed,
            "added": summary.added,
            "replaced": summary.replaced,
            "saved_to": saved.to_string_lossy(),
        });
        print_json(&output);
        return Ok(());
    }

    println!("Batch applied");
    println!("  Removed:  {}", join_ids(&summary.removed));
    println!("  Added:    {}", join_ids(&summary.added));
    println!("  Replaced: {}", join_ids(&summary.replaced));
    println!("Saved to {:?}", saved);

    Ok(())
}

/// Remove every link touching `nodes` (comma-separated ids).
pub fn cmd_detach(ctx: &Context, nodes: &str) -> Result<(), NodewireError> {
    let node_ids = parse_node_ids(nodes)?;

    let mut workflow = Workflow::from_flat(load_workflow(ctx)?);
    require_nodes(&workflow, &node_ids)?;

    let summary = workflow
        .detach_nodes(&node_ids)
        .map_err(|error| error.source)?;
    tracing::info!("Detached {} links", summary.removed.len());
    let saved = if summary.removed.is_empty() {
        None
    } else {
        Some(save_workflow(ctx, workflow.flat())?)
    };

    if ctx.json_mode {
        let output = serde_json::json!({
            "nodes": node_ids,
            "removed": summary.removed,
            "saved_to": saved.map(|path| path.to_string_lossy().into_owned()),
        });
        print_json(&output);
        return Ok(());
    }

    println!(
        "Detached nodes {}: removed {}",
        join_ids(&node_ids),
        join_ids(&summary.removed)
    );

    Ok(())
}

// =============================================================================
// VERIFY COMMAND
// =============================================================================

/// Check link bookkeeping. Divergences are an error.
pub fn cmd_verify(ctx: &Context) -> Result<(), NodewireError> {
    let workflow = Workflow::from_flat(load_workflow(ctx)?);
    let report = workflow.verify();

    for divergence in &report.divergences {
        tracing::warn!("{}", divergence);
    }

    if ctx.json_mode {
        let output = serde_json::json!({
            "consistent": report.is_consistent(),
            "divergences": report.divergences,
        });
        print_json(&output);
    } else if report.is_consistent() {
        println!("Workflow is consistent");
    } else {
        println!("Found {} divergences:", report.divergences.len());
        for divergence in &report.divergences {
            println!("  {}", divergence);
        }
    }

    if report.is_consistent() {
        Ok(())
    } else {
        Err(NodewireError::Inconsistent(report.divergences.len()))
    }
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Load and parse the workflow named by `ctx`.
pub fn load_workflow(ctx: &Context) -> Result<FlatGraph, NodewireError> {
    let max_bytes = ctx.config.limits.max_workflow_bytes;
    let data = read_checked(&ctx.workflow, max_bytes)?;
    let flat = workflow_from_json_with_limit(&data, max_bytes)?;
    tracing::debug!(
        "Loaded {:?}: {} nodes, {} links",
        ctx.workflow,
        flat.node_count(),
        flat.link_count()
    );
    Ok(flat)
}

/// Save `flat` to `--output`, or back over `--workflow`.
pub fn save_workflow(ctx: &Context, flat: &FlatGraph) -> Result<PathBuf, NodewireError> {
    let target = ctx.output.as_deref().unwrap_or(ctx.workflow.as_path());
    let validated = validate_output_path(target)?;
    let text = workflow_to_json(flat, ctx.config.output.pretty)?;
    std::fs::write(&validated, text.as_bytes())
        .map_err(|e| NodewireError::IoError(format!("Write file: {}", e)))?;
    tracing::info!("Saved workflow to {:?}", validated);
    Ok(validated)
}

/// Parse comma-separated node ids, skipping blanks and junk.
fn parse_node_ids(nodes: &str) -> Result<Vec<NodeId>, NodewireError> {
    let node_ids: Vec<NodeId> = nodes
        .split(',')
        .filter_map(|s: &str| s.trim().parse::<u64>().ok().map(NodeId))
        .collect();
    if node_ids.is_empty() {
        return Err(NodewireError::InvalidBatch(format!("No node IDs in '{}'", nodes)));
    }
    Ok(node_ids)
}

fn require_nodes(workflow: &Workflow, node_ids: &[NodeId]) -> Result<(), NodewireError> {
    for &node in node_ids {
        if workflow.find_node_by_id(node).is_none() {
            return Err(NodewireError::NodeNotFound(node));
        }
    }
    Ok(())
}

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

fn join_ids<T: std::fmt::Display>(ids: &[T]) -> String {
    if ids.is_empty() {
        return "-".to_string();
    }
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
