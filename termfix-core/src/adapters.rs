//! Default port implementations: an in-memory terminology server, its file-backed variant,
//! report sinks and filesystem writes.

use crate::ports::{ReportSink, TerminologyClient, WritePort};
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use std::collections::{BTreeMap, BTreeSet};
use std::io::{BufWriter, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use termfix_edit::ClientError;
use termfix_snapshot::Snapshot;
use termfix_types::{Concept, ConceptId, ReportRow};
use tracing::debug;

/// Terminology server held in memory. Branches are accepted but not modelled: every branch
/// sees the same concepts.
#[derive(Debug, Default)]
pub struct InMemoryTerminologyServer {
    concepts: Mutex<BTreeMap<ConceptId, Concept>>,
    fail_load: BTreeSet<ConceptId>,
    fail_update: BTreeSet<ConceptId>,
    next_component: AtomicUsize,
    loads: AtomicUsize,
    updates: AtomicUsize,
    deletes: AtomicUsize,
}

impl InMemoryTerminologyServer {
    pub fn new(concepts: impl IntoIterator<Item = Concept>) -> Self {
        Self {
            concepts: Mutex::new(concepts.into_iter().map(|c| (c.id, c)).collect()),
            ..Default::default()
        }
    }

    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self::new(snapshot.all_concepts().iter().cloned())
    }

    /// Make every load of `id` fail with a transport error.
    pub fn failing_load(mut self, id: ConceptId) -> Self {
        self.fail_load.insert(id);
        self
    }

    /// Make every update of `id` rejected by the server.
    pub fn failing_update(mut self, id: ConceptId) -> Self {
        self.fail_update.insert(id);
        self
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    /// Current server-side copy of a concept.
    pub fn concept(&self, id: ConceptId) -> Option<Concept> {
        self.lock().ok()?.get(&id).cloned()
    }

    /// All concepts in id order.
    pub fn concepts(&self) -> Vec<Concept> {
        match self.lock() {
            Ok(map) => map.values().cloned().collect(),
            Err(_) => vec![],
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<ConceptId, Concept>>, ClientError> {
        self.concepts
            .lock()
            .map_err(|_| ClientError::Transport("server state poisoned".to_string()))
    }

    fn assign_ids(&self, concept: &mut Concept) {
        for rel in concept.relationships.iter_mut().filter(|r| r.id.is_none()) {
            let n = self.next_component.fetch_add(1, Ordering::SeqCst) + 1;
            rel.id = Some(format!("rel-{}", n));
        }
        for desc in concept.descriptions.iter_mut().filter(|d| d.id.is_none()) {
            let n = self.next_component.fetch_add(1, Ordering::SeqCst) + 1;
            desc.id = Some(format!("desc-{}", n));
        }
    }
}

impl TerminologyClient for InMemoryTerminologyServer {
    fn load_concept(&self, id: ConceptId, branch: &str) -> Result<Concept, ClientError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail_load.contains(&id) {
            return Err(ClientError::Transport(format!("connection reset loading {}", id)));
        }
        self.lock()?
            .get(&id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound {
                id,
                branch: branch.to_string(),
            })
    }

    fn update_concept(&self, concept: &Concept, branch: &str) -> Result<Concept, ClientError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if self.fail_update.contains(&concept.id) {
            return Err(ClientError::Rejected(format!(
                "update of {} refused on {}",
                concept.id, branch
            )));
        }
        let mut saved = concept.clone();
        self.assign_ids(&mut saved);
        let mut map = self.lock()?;
        if !map.contains_key(&saved.id) {
            return Err(ClientError::NotFound {
                id: saved.id,
                branch: branch.to_string(),
            });
        }
        debug!(concept = %saved.id, branch, "concept updated");
        map.insert(saved.id, saved.clone());
        Ok(saved)
    }

    fn delete_component(&self, component_id: &str, branch: &str) -> Result<(), ClientError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        let mut map = self.lock()?;
        for concept in map.values_mut() {
            let before = concept.relationships.len() + concept.descriptions.len();
            concept
                .relationships
                .retain(|r| r.id.as_deref() != Some(component_id));
            concept
                .descriptions
                .retain(|d| d.id.as_deref() != Some(component_id));
            if concept.relationships.len() + concept.descriptions.len() < before {
                debug!(concept = %concept.id, component = component_id, branch, "component deleted");
                return Ok(());
            }
        }
        Err(ClientError::Rejected(format!(
            "component {} not found on {}",
            component_id, branch
        )))
    }
}

/// [`InMemoryTerminologyServer`] persisted to a JSON file after every write.
#[derive(Debug)]
pub struct FileTerminologyServer {
    path: Utf8PathBuf,
    inner: InMemoryTerminologyServer,
    persist: Mutex<()>,
}

impl FileTerminologyServer {
    /// Open a server file holding a JSON array of concepts.
    pub fn open(path: impl Into<Utf8PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let bytes = fs::read(&path).with_context(|| format!("read server file {}", path))?;
        let concepts: Vec<Concept> = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse server file {}", path))?;
        debug!(path = %path, concepts = concepts.len(), "server file opened");
        Ok(Self {
            path,
            inner: InMemoryTerminologyServer::new(concepts),
            persist: Mutex::new(()),
        })
    }

    /// Create (or overwrite) a server file seeded from a snapshot.
    pub fn create(path: impl Into<Utf8PathBuf>, snapshot: &Snapshot) -> anyhow::Result<Self> {
        let server = Self {
            path: path.into(),
            inner: InMemoryTerminologyServer::from_snapshot(snapshot),
            persist: Mutex::new(()),
        };
        server.save()?;
        Ok(server)
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn inner(&self) -> &InMemoryTerminologyServer {
        &self.inner
    }

    fn save(&self) -> anyhow::Result<()> {
        let _guard = self
            .persist
            .lock()
            .map_err(|_| anyhow::anyhow!("persist lock poisoned"))?;
        let json = serde_json::to_vec_pretty(&self.inner.concepts())
            .context("serialize server state")?;
        fs::write(&self.path, json).with_context(|| format!("write server file {}", self.path))
    }

    fn persist(&self) -> Result<(), ClientError> {
        self.save()
            .map_err(|e| ClientError::Transport(format!("{:#}", e)))
    }
}

impl TerminologyClient for FileTerminologyServer {
    fn load_concept(&self, id: ConceptId, branch: &str) -> Result<Concept, ClientError> {
        self.inner.load_concept(id, branch)
    }

    fn update_concept(&self, concept: &Concept, branch: &str) -> Result<Concept, ClientError> {
        let saved = self.inner.update_concept(concept, branch)?;
        self.persist()?;
        Ok(saved)
    }

    fn delete_component(&self, component_id: &str, branch: &str) -> Result<(), ClientError> {
        self.inner.delete_component(component_id, branch)?;
        self.persist()
    }
}

/// Collects rows in memory.
#[derive(Debug, Default)]
pub struct MemReportSink {
    rows: Mutex<Vec<ReportRow>>,
}

impl MemReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> Vec<ReportRow> {
        match self.rows.lock() {
            Ok(rows) => rows.clone(),
            Err(_) => vec![],
        }
    }
}

impl ReportSink for MemReportSink {
    fn record(&self, row: &ReportRow) -> anyhow::Result<()> {
        self.rows
            .lock()
            .map_err(|_| anyhow::anyhow!("report sink poisoned"))?
            .push(row.clone());
        Ok(())
    }
}

/// Writes one JSON row per line.
#[derive(Debug)]
pub struct JsonLinesReportSink {
    path: Utf8PathBuf,
    out: Mutex<BufWriter<fs::File>>,
}

impl JsonLinesReportSink {
    pub fn create(path: impl Into<Utf8PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("create parent dir for {}", path))?;
        }
        let file = fs::File::create(&path).with_context(|| format!("create report {}", path))?;
        Ok(Self {
            path,
            out: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl ReportSink for JsonLinesReportSink {
    fn record(&self, row: &ReportRow) -> anyhow::Result<()> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| anyhow::anyhow!("report sink poisoned"))?;
        serde_json::to_writer(&mut *out, row).context("serialize report row")?;
        out.write_all(b"\n")
            .with_context(|| format!("write {}", self.path))
    }

    fn flush(&self) -> anyhow::Result<()> {
        self.out
            .lock()
            .map_err(|_| anyhow::anyhow!("report sink poisoned"))?
            .flush()
            .with_context(|| format!("flush {}", self.path))
    }
}

/// Filesystem write operations.
#[derive(Debug, Clone, Default)]
pub struct FsWritePort;

impl WritePort for FsWritePort {
    fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("create parent dir for {}", path))?;
        }
        fs::write(path, contents).with_context(|| format!("write {}", path))
    }

    fn create_dir_all(&self, path: &Utf8Path) -> anyhow::Result<()> {
        fs::create_dir_all(path).with_context(|| format!("create_dir_all {}", path))
    }
}
