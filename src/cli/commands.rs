//! CLI command implementations
//!
//! All commands run offline. `demo` wires the full pipeline against
//! in-memory backends: plan service, partitioned channel, index workers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{json, Value};

use crate::channel::PartitionedChannel;
use crate::config::PlanStoreConfig;
use crate::etag::{compute_etag, MatchCondition};
use crate::flat::decompose;
use crate::indexer::{index_documents, IndexSynchronizer, IndexWorker, MemorySearchEngine};
use crate::observability::MetricsRegistry;
use crate::plan::{PlanService, ReadOutcome};
use crate::store::MemoryStore;

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{read_document, write_error, write_response};

/// Parse arguments, run the command and report the outcome
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    match run_command(cli.command) {
        Ok(data) => write_response(data),
        Err(e) => {
            write_error(e.code(), &e.to_string())?;
            Err(e)
        }
    }
}

/// Run one command and return its JSON result
pub fn run_command(command: Command) -> CliResult<Value> {
    match command {
        Command::Etag { file } => etag(&file),
        Command::Decompose { file, config } => decompose_cmd(&file, load_config(config)?),
        Command::IndexDocs { file, config } => index_docs(&file, load_config(config)?),
        Command::Demo { file, config } => demo(&file, load_config(config)?),
    }
}

fn load_config(path: Option<PathBuf>) -> CliResult<PlanStoreConfig> {
    let config = match path {
        Some(path) => PlanStoreConfig::load(&path)?,
        None => PlanStoreConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

/// ETag of a document
pub fn etag(file: &Path) -> CliResult<Value> {
    let doc = read_document(file)?;
    Ok(json!({ "etag": compute_etag(&doc).as_str() }))
}

/// Flat records and reference sets of a document
pub fn decompose_cmd(file: &Path, config: PlanStoreConfig) -> CliResult<Value> {
    let doc = read_document(file)?;
    Ok(decompose(&doc, config.max_depth)?.to_json())
}

/// Search index documents of a document
pub fn index_docs(file: &Path, config: PlanStoreConfig) -> CliResult<Value> {
    let doc = read_document(file)?;
    let docs = index_documents(&doc, config.max_depth)?;
    Ok(serde_json::to_value(docs)?)
}

/// Create, conditionally read back and index a document
pub fn demo(file: &Path, config: PlanStoreConfig) -> CliResult<Value> {
    let doc = read_document(file)?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let metrics = Arc::new(MetricsRegistry::new());
        let engine = Arc::new(MemorySearchEngine::new());
        let (channel, receivers) = PartitionedChannel::new(config.channel_partitions)
            .map_err(|e| CliError::Demo(e.to_string()))?;

        let synchronizer = Arc::new(
            IndexSynchronizer::new(engine.clone(), &config).with_metrics(metrics.clone()),
        );
        let worker = Arc::new(IndexWorker::new(synchronizer, &config).with_metrics(metrics.clone()));
        let handles = worker.spawn(receivers);

        let service = PlanService::new(Arc::new(MemoryStore::new()), Arc::new(channel), &config)
            .with_metrics(metrics.clone());

        let created = service.create(&doc)?;
        let conditional = service.get(&created.key, &MatchCondition::of(&[created.etag.clone()]))?;
        let body = match service.get(&created.key, &MatchCondition::Empty)? {
            ReadOutcome::Found { body, .. } => body,
            ReadOutcome::NotModified { .. } => Value::Null,
        };

        // Closes the channel so the workers drain and stop
        drop(service);

        let mut workers = Vec::new();
        for handle in handles {
            let stats = handle.await.map_err(|e| CliError::Demo(e.to_string()))?;
            workers.push(stats);
        }

        Ok::<Value, CliError>(json!({
            "key": created.key.to_string(),
            "etag": created.etag.as_str(),
            "not_modified": conditional.is_not_modified(),
            "body": body,
            "indexed_documents": engine.document_count(&config.index_name),
            "workers": workers,
            "metrics": metrics.snapshot(),
        }))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn doc_file(doc: &Value) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", doc).unwrap();
        file
    }

    fn plan() -> Value {
        json!({
            "objectId": "p1",
            "objectType": "plan",
            "planCostShares": {"objectId": "c1", "objectType": "membercostshare", "copay": 20}
        })
    }

    #[test]
    fn test_etag_command() {
        let file = doc_file(&plan());
        let out = etag(file.path()).unwrap();
        assert_eq!(out["etag"], compute_etag(&plan()).as_str());
    }

    #[test]
    fn test_decompose_command() {
        let file = doc_file(&plan());
        let out = decompose_cmd(file.path(), PlanStoreConfig::default()).unwrap();
        assert_eq!(out["root"], "plan:p1");
    }

    #[test]
    fn test_index_docs_command() {
        let file = doc_file(&plan());
        let out = index_docs(file.path(), PlanStoreConfig::default()).unwrap();
        assert_eq!(out.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_demo_command() {
        let file = doc_file(&plan());
        let out = demo(file.path(), PlanStoreConfig::default()).unwrap();
        assert_eq!(out["key"], "plan:p1");
        assert_eq!(out["not_modified"], true);
        assert_eq!(out["indexed_documents"], 2);
        assert_eq!(out["body"], plan());
    }

    #[test]
    fn test_invalid_document_reported() {
        let file = doc_file(&json!({"objectId": "p1"}));
        let err = decompose_cmd(file.path(), PlanStoreConfig::default()).unwrap_err();
        assert!(matches!(err, CliError::Document(_)));
    }
}
