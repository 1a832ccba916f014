//! # CLI Command Implementations

use concord::api::{self, AppState, parse_concepts};
use concord::config::{Backend, Config};
use concord::store::{open_service, save_snapshot, write_with_retry};
use concord_core::{ConceptKind, ConcordError, graph_to_bytes};
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum input file size for `write` (100 MB).
const MAX_WRITE_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Canonicalize an input path and require a regular file within the size limit.
fn validate_input_file(path: &Path, max_size: u64) -> Result<PathBuf, ConcordError> {
    let canonical = path.canonicalize().map_err(|e| {
        ConcordError::Store(format!("Invalid file path '{}': {}", path.display(), e))
    })?;
    if !canonical.is_file() {
        return Err(ConcordError::Store(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }
    let metadata = std::fs::metadata(&canonical)
        .map_err(|e| ConcordError::Store(format!("Cannot read file metadata: {}", e)))?;
    if metadata.len() > max_size {
        return Err(ConcordError::Serialization(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(canonical)
}

/// Resolve an output path against its canonical parent directory.
fn validate_output_path(path: &Path) -> Result<PathBuf, ConcordError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let canonical_parent = parent.canonicalize().map_err(|e| {
        ConcordError::Store(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;
    let filename = path
        .file_name()
        .ok_or_else(|| ConcordError::Store("Output path has no filename".to_string()))?;
    Ok(canonical_parent.join(filename))
}

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

pub async fn cmd_server(config: &Config) -> Result<(), ConcordError> {
    let service = open_service(&config.storage)?;

    println!("Concord Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Address:  {}", config.server.addr());
    println!("  Backend:  {}", config.storage.backend);
    println!("  Database: {:?}", config.storage.database);
    println!("  Attempts: {}", config.writer.max_attempts);
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let mut state = AppState::new(service).with_max_attempts(config.writer.max_attempts);
    if config.storage.backend == Backend::File {
        state = state.with_snapshot(config.storage.database.clone());
    }
    api::run_server(&config.server.addr(), state).await
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

pub fn cmd_status(config: &Config, json_mode: bool) -> Result<(), ConcordError> {
    let service = open_service(&config.storage)?;
    let metrics = service.metrics()?;

    if json_mode {
        print_json(&serde_json::json!({
            "database": config.storage.database.to_string_lossy(),
            "backend": config.storage.backend.to_string(),
            "node_count": metrics.node_count,
            "edge_count": metrics.edge_count,
            "organisations": metrics.organisation_count,
            "roles": metrics.role_count,
        }));
        return Ok(());
    }

    println!("Concord Store Status");
    println!("====================");
    println!("Database: {:?}", config.storage.database);
    println!("Backend:  {}", config.storage.backend);
    println!();
    println!("Nodes:         {}", metrics.node_count);
    println!("Edges:         {}", metrics.edge_count);
    println!("Organisations: {}", metrics.organisation_count);
    println!("Roles:         {}", metrics.role_count);

    Ok(())
}

// =============================================================================
// WRITE / READ / DELETE / COUNT
// =============================================================================

/// Write every record of the file, stopping at the first failure.
pub fn cmd_write(
    config: &Config,
    json_mode: bool,
    kind: ConceptKind,
    file: &Path,
) -> Result<(), ConcordError> {
    let path = validate_input_file(file, MAX_WRITE_FILE_SIZE)?;
    let data = std::fs::read(&path)
        .map_err(|e| ConcordError::Store(format!("Read file: {}", e)))?;
    let concepts = parse_concepts(kind, &data)?;

    let mut service = open_service(&config.storage)?;
    let mut summaries = Vec::with_capacity(concepts.len());
    let mut outcome = Ok(());
    for concept in &concepts {
        match write_with_retry(&mut service, concept, config.writer.max_attempts) {
            Ok(summary) => summaries.push(summary),
            Err(e) => {
                outcome = Err(e);
                break;
            }
        }
    }
    // Records written before a failure are kept.
    save_snapshot(&service, &config.storage.database)?;

    if json_mode {
        let written: Vec<_> = summaries
            .iter()
            .map(|s| serde_json::json!({ "uuid": s.uuid, "absorbed": s.absorbed }))
            .collect();
        print_json(&serde_json::json!({ "kind": kind.to_string(), "written": written }));
    } else {
        for summary in &summaries {
            if summary.absorbed.is_empty() {
                println!("Wrote {} {}", kind, summary.uuid);
            } else {
                println!(
                    "Wrote {} {} (absorbed {})",
                    kind,
                    summary.uuid,
                    summary.absorbed.join(", ")
                );
            }
        }
        println!("{} of {} record(s) written", summaries.len(), concepts.len());
    }

    outcome
}

pub fn cmd_read(config: &Config, kind: ConceptKind, uuid: &str) -> Result<(), ConcordError> {
    let service = open_service(&config.storage)?;
    match service.read(kind, uuid)? {
        Some(concept) => {
            let value = serde_json::to_value(&concept)
                .map_err(|e| ConcordError::Serialization(e.to_string()))?;
            print_json(&value);
        }
        None => println!("{} {} not found", kind, uuid),
    }
    Ok(())
}

pub fn cmd_delete(
    config: &Config,
    json_mode: bool,
    kind: ConceptKind,
    uuid: &str,
) -> Result<(), ConcordError> {
    let mut service = open_service(&config.storage)?;
    let deleted = service.delete(kind, uuid)?;
    save_snapshot(&service, &config.storage.database)?;

    if json_mode {
        print_json(&serde_json::json!({ "uuid": uuid, "deleted": deleted }));
    } else if deleted {
        println!("Deleted {} {}", kind, uuid);
    } else {
        println!("{} {} not found", kind, uuid);
    }
    Ok(())
}

pub fn cmd_count(config: &Config, json_mode: bool, kind: ConceptKind) -> Result<(), ConcordError> {
    let service = open_service(&config.storage)?;
    let count = service.count(kind)?;
    if json_mode {
        print_json(&serde_json::json!({ "kind": kind.to_string(), "count": count }));
    } else {
        println!("{}: {}", kind.collection(), count);
    }
    Ok(())
}

// =============================================================================
// EXPORT COMMAND
// =============================================================================

/// Write a snapshot of the graph, whichever backend holds it.
pub fn cmd_export(config: &Config, output: &Path) -> Result<(), ConcordError> {
    let validated_output = validate_output_path(output)?;
    let service = open_service(&config.storage)?;
    let data = graph_to_bytes(service.graph())?;

    std::fs::write(&validated_output, &data)
        .map_err(|e| ConcordError::Store(format!("Write file: {}", e)))?;

    println!("Exported {} bytes to {:?}", data.len(), validated_output);
    Ok(())
}

// =============================================================================
// COMPACT COMMAND
// =============================================================================

/// Compact the redb file. The file backend rewrites its snapshot on every
/// save and has nothing to compact.
pub fn cmd_compact(config: &Config, json_mode: bool) -> Result<(), ConcordError> {
    if config.storage.backend != Backend::Redb {
        return Err(ConcordError::Validation(format!(
            "compact needs the redb backend, not '{}'",
            config.storage.backend
        )));
    }
    let mut service = open_service(&config.storage)?;
    let compacted = service.compact()?;
    tracing::info!(compacted, "compaction finished");

    if json_mode {
        print_json(&serde_json::json!({ "compacted": compacted }));
    } else if compacted {
        println!("Compacted {:?}", config.storage.database);
    } else {
        println!("Nothing to compact in {:?}", config.storage.database);
    }
    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

pub fn cmd_init(config: &Config, force: bool) -> Result<(), ConcordError> {
    let path = &config.storage.database;
    if path.exists() {
        if !force {
            return Err(ConcordError::Validation(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(path)
            .map_err(|e| ConcordError::Store(format!("Remove existing database: {}", e)))?;
    }

    let service = match config.storage.backend {
        Backend::Redb => concord_core::ConcordService::with_redb(path)?,
        Backend::File => concord_core::ConcordService::new(),
    };
    save_snapshot(&service, path)?;
    println!(
        "Initialized new {} database at {:?}",
        config.storage.backend, path
    );
    Ok(())
}
