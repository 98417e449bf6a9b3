//! Enumerates a directory of per-version dumps and folds them, oldest first,
//! into one union tree.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use tracing::{info, warn};

use crate::config::BuildConfig;
use crate::dump_file::DumpFile;
use crate::errors::{Error, Result};
use crate::packager;
use crate::string_table::GlobalStrings;
use crate::union::UnionTree;
use crate::versions::{VersionKey, version_key};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusEntry {
    pub label: String,
    pub key: VersionKey,
    pub path: PathBuf,
}

/// Lists the dump files of the corpus sorted by version key.
///
/// Every label is parsed before anything is ingested, so a bad file name
/// aborts the run up front.
pub fn enumerate(config: &BuildConfig) -> Result<Vec<CorpusEntry>> {
    let mut entries = Vec::new();

    for dir_entry in fs::read_dir(&config.dumps_dir)? {
        let path = dir_entry?.path();
        if !config.is_dump_file(&path) {
            continue;
        }
        let Some(label) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };

        entries.push(CorpusEntry {
            key: version_key(label)?,
            label: label.to_string(),
            path,
        });
    }

    if entries.is_empty() {
        return Err(Error::EmptyCorpus(config.dumps_dir.display().to_string()));
    }

    entries.sort_by_key(|e| e.key);
    Ok(entries)
}

/// Folds one dump into `union`.
pub fn ingest_dump(
    union: &mut UnionTree,
    entry: &CorpusEntry,
    bytes: &[u8],
    strings: &GlobalStrings,
) -> Result<()> {
    let dump = DumpFile::from_bytes(bytes, strings.as_bytes()).map_err(|source| Error::Decode {
        label: entry.label.clone(),
        source,
    })?;

    if dump.engine_version != entry.label {
        warn!(
            file = %entry.label,
            header = %dump.engine_version,
            "dump header version differs from file name, using file name"
        );
    }

    let class_count = dump.trees.len();
    let stats = union.ingest(entry.key, dump.trees)?;
    info!(
        version = %entry.label,
        key = entry.key.as_u32(),
        classes = class_count,
        created = stats.classes_created,
        events = stats.events_emitted,
        "ingested"
    );
    Ok(())
}

/// Builds the union tree of the whole corpus. Any failure aborts the run.
pub fn build_union(config: &BuildConfig) -> Result<UnionTree> {
    let started = Instant::now();
    let entries = enumerate(config)?;
    let strings = GlobalStrings::load(&config.strings_path)?;

    info!(
        versions = entries.len(),
        dumps = %config.dumps_dir.display(),
        "comparing trees"
    );

    let mut union = UnionTree::new();
    for entry in &entries {
        let bytes = fs::read(&entry.path)?;
        ingest_dump(&mut union, entry, &bytes, &strings)?;
    }

    info!(
        classes = union.len(),
        duration_ms = started.elapsed().as_millis() as u64,
        "corpus folded"
    );
    Ok(union)
}

/// Builds the union tree and, if an output path is configured, writes the
/// packaged artifact there.
pub fn run(config: &BuildConfig) -> Result<UnionTree> {
    let union = build_union(config)?;

    if let Some(output) = &config.output {
        let bytes = packager::pack_to_vec(&union)?;
        fs::write(output, &bytes)?;
        info!(path = %output.display(), bytes = bytes.len(), "artifact written");
    }

    Ok(union)
}
