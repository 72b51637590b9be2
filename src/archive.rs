//! Persistent memory of chains already evaluated for closability.
//!
//! The index file holds one line per chain: `<chain id> <id> <T|F>`. Ids are
//! sequential from zero and lines are only ever appended. For closable chains
//! the conformations that close the ring are written to `<id>.json` in the
//! blob folder. Several processes may share one index; writers hold an
//! exclusive file lock for the duration of one append and first catch up with
//! the lines others appended since the last read.

use std::{
    fs::{self, File, OpenOptions},
    io::{self, ErrorKind, Write},
    path::{Path, PathBuf},
    sync::Mutex,
    thread,
    time::Duration,
};

use dashmap::DashMap;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    chain::ClosableChain,
    error::{Error, Result},
};

const LOCK_BACKOFF: Duration = Duration::from_millis(20);
const MAX_LOCK_BACKOFF: Duration = Duration::from_millis(500);

/// Dihedral vectors that close the ring of one chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RingClosingConformations {
    chain_id: String,
    conformations: Vec<Vec<f64>>,
}

impl RingClosingConformations {
    pub fn new(chain_id: impl Into<String>, conformations: Vec<Vec<f64>>) -> Self {
        Self {
            chain_id: chain_id.into(),
            conformations,
        }
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    pub fn conformations(&self) -> &[Vec<f64>] {
        &self.conformations
    }

    pub fn is_empty(&self) -> bool {
        self.conformations.is_empty()
    }
}

/// An archived verdict.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ArchiveHit {
    pub id: usize,
    pub closable: bool,
}

#[derive(Debug, Default)]
struct WriterState {
    next_id: usize,
    /// Index lines already loaded into memory.
    ingested: usize,
}

#[derive(Debug, Default)]
pub struct ClosureArchive {
    index: Option<PathBuf>,
    folder: Option<PathBuf>,
    records: DashMap<String, ArchiveHit>,
    by_turning_point: DashMap<usize, Vec<String>>,
    blobs: DashMap<usize, RingClosingConformations>,
    writer: Mutex<WriterState>,
}

impl ClosureArchive {
    /// An archive that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the index file, if it exists, and remember where to append.
    pub fn open(index: impl AsRef<Path>, folder: Option<&Path>) -> Result<Self> {
        let mut archive = Self {
            index: Some(index.as_ref().to_path_buf()),
            folder: folder.map(Path::to_path_buf),
            ..Default::default()
        };
        if index.as_ref().exists() {
            let file = File::open(index.as_ref())?;
            let mut state = WriterState::default();
            archive.catch_up(&file, &mut state)?;
            info!(entries = state.ingested, "loaded ring-closure archive");
            archive.writer = Mutex::new(state);
        }
        Ok(archive)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First archived verdict among equivalent chain ids.
    pub fn lookup<S: AsRef<str>>(&self, chain_ids: &[S]) -> Option<ArchiveHit> {
        chain_ids
            .iter()
            .find_map(|id| self.records.get(id.as_ref()).map(|hit| *hit))
    }

    /// Closing conformations of an archived closable chain.
    pub fn conformations(&self, hit: &ArchiveHit) -> Result<Option<RingClosingConformations>> {
        if !hit.closable {
            return Ok(None);
        }
        if let Some(rcc) = self.blobs.get(&hit.id) {
            return Ok(Some(rcc.clone()));
        }
        let Some(folder) = &self.folder else {
            return Ok(None);
        };
        let path = blob_path(folder, hit.id);
        if !path.exists() {
            warn!(path = %path.display(), "missing conformations of archived chain");
            return Ok(None);
        }
        let rcc: RingClosingConformations = serde_json::from_str(&fs::read_to_string(&path)?)?;
        self.blobs.insert(hit.id, rcc.clone());
        Ok(Some(rcc))
    }

    /// Closable chains whose turning point is building block `bb_id`.
    pub fn closable_chains_with_turning_point(&self, bb_id: usize) -> Vec<ClosableChain> {
        self.by_turning_point
            .get(&bb_id)
            .map(|ids| ids.iter().filter_map(|id| id.parse().ok()).collect())
            .unwrap_or_default()
    }

    /// Archive the verdict of a chain and return its id. Chains that are
    /// already known keep their original entry.
    pub fn store_entry(
        &self,
        chain_id: &str,
        closable: bool,
        conformations: &RingClosingConformations,
    ) -> Result<usize> {
        let mut state = self.lock_writer()?;
        if let Some(hit) = self.records.get(chain_id) {
            return Ok(hit.id);
        }

        let id = match &self.index {
            None => {
                let id = state.next_id;
                self.ingest(chain_id, id, closable)?;
                state.next_id += 1;
                id
            }
            Some(path) => {
                let file = OpenOptions::new()
                    .read(true)
                    .append(true)
                    .create(true)
                    .open(path)?;
                lock_exclusive(&file)?;
                let appended = self.append_locked(&file, &mut state, chain_id, closable);
                FileExt::unlock(&file)?;
                match appended? {
                    Some(id) => id,
                    None => {
                        // Another process archived it first.
                        return Ok(self.records.get(chain_id).map_or(0, |hit| hit.id));
                    }
                }
            }
        };

        if closable {
            if let Some(folder) = &self.folder {
                fs::write(blob_path(folder, id), serde_json::to_string(conformations)?)?;
            }
            self.blobs.insert(id, conformations.clone());
        }
        debug!(chain_id, id, closable, "archived chain");
        Ok(id)
    }

    fn lock_writer(&self) -> Result<std::sync::MutexGuard<'_, WriterState>> {
        self.writer
            .lock()
            .map_err(|_| Error::corruption("archive writer poisoned by a panicking thread"))
    }

    fn append_locked(
        &self,
        file: &File,
        state: &mut WriterState,
        chain_id: &str,
        closable: bool,
    ) -> Result<Option<usize>> {
        self.catch_up(file, state)?;
        if self.records.contains_key(chain_id) {
            return Ok(None);
        }
        let id = state.next_id;
        let mut out = file;
        writeln!(out, "{chain_id} {id} {}", if closable { 'T' } else { 'F' })?;
        out.flush()?;
        file.sync_data()?;
        self.ingest(chain_id, id, closable)?;
        state.next_id += 1;
        state.ingested += 1;
        Ok(Some(id))
    }

    /// Load index lines appended since the last read.
    fn catch_up(&self, file: &File, state: &mut WriterState) -> Result<()> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b' ')
            .has_headers(false)
            .from_reader(file);
        for (line, record) in reader.deserialize::<(String, usize, String)>().enumerate() {
            if line < state.ingested {
                continue;
            }
            let (chain_id, id, flag) =
                record.map_err(|e| Error::corruption(format!("line {}: {e}", line + 1)))?;
            if id != line {
                return Err(Error::corruption(format!(
                    "line {} carries id {id}, expected {line}",
                    line + 1
                )));
            }
            let closable = match flag.as_str() {
                "T" => true,
                "F" => false,
                other => {
                    return Err(Error::corruption(format!(
                        "line {}: closability flag {other:?} is not T or F",
                        line + 1
                    )))
                }
            };
            self.ingest(&chain_id, id, closable)?;
            state.ingested = line + 1;
            state.next_id = line + 1;
        }
        Ok(())
    }

    fn ingest(&self, chain_id: &str, id: usize, closable: bool) -> Result<()> {
        if self.records.contains_key(chain_id) {
            return Err(Error::corruption(format!("duplicate chain {chain_id}")));
        }
        self.records.insert(chain_id.to_owned(), ArchiveHit { id, closable });
        if closable {
            if let Some(tp) = chain_id
                .parse::<ClosableChain>()
                .ok()
                .and_then(|c| c.turning_point_bb_id())
            {
                self.by_turning_point
                    .entry(tp)
                    .or_default()
                    .push(chain_id.to_owned());
            }
        }
        Ok(())
    }
}

fn blob_path(folder: &Path, id: usize) -> PathBuf {
    folder.join(format!("{id}.json"))
}

/// Take the exclusive lock, waiting for as long as another writer holds it.
/// Only errors other than contention are returned.
fn lock_exclusive(file: &File) -> Result<()> {
    let mut attempts = 0usize;
    let mut backoff = LOCK_BACKOFF;
    loop {
        match file.try_lock_exclusive() {
            Ok(()) => return Ok(()),
            Err(e) if is_contended(&e) => {
                attempts += 1;
                debug!(attempts, error = %e, "archive index is locked, retrying");
                thread::sleep(backoff);
                backoff = (backoff * 2).min(MAX_LOCK_BACKOFF);
            }
            Err(e) => return Err(e.into()),
        }
    }
}

fn is_contended(e: &io::Error) -> bool {
    matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted)
        || e.raw_os_error().is_some_and(|code| fs2::lock_contended_error().raw_os_error() == Some(code))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAIN: &str = "4/FRAGMENT/ap0ap1_7/SCAFFOLD/ap2ap0_%1";

    fn confs(id: &str) -> RingClosingConformations {
        RingClosingConformations::new(id, vec![vec![0.0, 60.0, 0.0]])
    }

    #[test]
    fn in_memory_store_and_lookup() {
        let archive = ClosureArchive::in_memory();
        assert!(archive.lookup(&[CHAIN]).is_none());
        let id = archive.store_entry(CHAIN, true, &confs(CHAIN)).unwrap();
        assert_eq!(id, 0);
        let again = archive.store_entry(CHAIN, false, &confs(CHAIN)).unwrap();
        assert_eq!(again, 0);

        let hit = archive.lookup(&["nope", CHAIN]).unwrap();
        assert!(hit.closable);
        let stored = archive.conformations(&hit).unwrap().unwrap();
        assert_eq!(stored.conformations(), &[vec![0.0, 60.0, 0.0]]);

        let chains = archive.closable_chains_with_turning_point(7);
        assert_eq!(chains.len(), 1);
        assert!(archive.closable_chains_with_turning_point(4).is_empty());
    }

    #[test]
    fn persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let index = dir.path().join("rcc.index");
        let blobs = dir.path().join("blobs");
        fs::create_dir_all(&blobs).unwrap();

        let first = ClosureArchive::open(&index, Some(&blobs)).unwrap();
        first.store_entry(CHAIN, true, &confs(CHAIN)).unwrap();
        first.store_entry("%-1", false, &confs("%-1")).unwrap();

        let second = ClosureArchive::open(&index, Some(&blobs)).unwrap();
        assert_eq!(second.len(), 2);
        let hit = second.lookup(&[CHAIN]).unwrap();
        assert_eq!(hit, ArchiveHit { id: 0, closable: true });
        assert_eq!(second.conformations(&hit).unwrap(), Some(confs(CHAIN)));
        let miss = second.lookup(&["%-1"]).unwrap();
        assert_eq!(second.conformations(&miss).unwrap(), None);

        let text = fs::read_to_string(&index).unwrap();
        assert_eq!(text, format!("{CHAIN} 0 T\n%-1 1 F\n"));
    }

    #[test]
    fn writers_catch_up_with_each_other() {
        let dir = tempfile::tempdir().unwrap();
        let index = dir.path().join("rcc.index");
        let a = ClosureArchive::open(&index, None).unwrap();
        let b = ClosureArchive::open(&index, None).unwrap();

        assert_eq!(a.store_entry("x%-1", true, &confs("x")).unwrap(), 0);
        assert_eq!(b.store_entry("y%-1", false, &confs("y")).unwrap(), 1);
        assert_eq!(b.store_entry("x%-1", true, &confs("x")).unwrap(), 0);
        assert!(b.lookup(&["x%-1"]).is_some());
    }

    #[test]
    fn writers_wait_for_a_held_lock() {
        let dir = tempfile::tempdir().unwrap();
        let index = dir.path().join("rcc.index");
        let archive = ClosureArchive::open(&index, None).unwrap();

        // Another handle on the index holds the lock well past one backoff
        // step, then lets go from a second thread.
        let holder = OpenOptions::new().append(true).create(true).open(&index).unwrap();
        holder.lock_exclusive().unwrap();
        let release = thread::spawn(move || {
            thread::sleep(Duration::from_millis(300));
            FileExt::unlock(&holder).unwrap();
        });

        assert_eq!(archive.store_entry("x%-1", true, &confs("x")).unwrap(), 0);
        release.join().unwrap();
        assert_eq!(fs::read_to_string(&index).unwrap(), "x%-1 0 T\n");
    }

    #[test]
    fn only_contention_is_retried() {
        assert!(is_contended(&fs2::lock_contended_error()));
        assert!(is_contended(&io::Error::from(ErrorKind::WouldBlock)));
        assert!(!is_contended(&io::Error::from(ErrorKind::Unsupported)));
        assert!(!is_contended(&io::Error::from(ErrorKind::PermissionDenied)));
    }

    #[test]
    fn corrupted_indexes_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let index = dir.path().join("rcc.index");

        fs::write(&index, "a%-1 0 T\nb%-1 2 F\n").unwrap();
        assert!(matches!(
            ClosureArchive::open(&index, None),
            Err(Error::ArchiveCorruption(_))
        ));

        fs::write(&index, "a%-1 0 T\na%-1 1 F\n").unwrap();
        assert!(matches!(
            ClosureArchive::open(&index, None),
            Err(Error::ArchiveCorruption(_))
        ));

        fs::write(&index, "").unwrap();
        assert!(ClosureArchive::open(&index, None).unwrap().is_empty());
    }
}
