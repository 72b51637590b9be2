use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use crate::{
    archive::ClosureArchive,
    builder::{Assembler3D, SliceAssembler},
    config::RingClosureParameters,
    error::Result,
    pattern::PatternMatcher,
};

/// Counters of the expensive steps taken by a context.
#[derive(Debug, Default)]
pub struct SearchStats {
    torsional_searches: AtomicUsize,
    archive_hits: AtomicUsize,
    rejected_pairs: AtomicUsize,
}

impl SearchStats {
    pub(crate) fn count_torsional_search(&self) {
        self.torsional_searches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn count_archive_hit(&self) {
        self.archive_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn count_rejected_pair(&self) {
        self.rejected_pairs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn torsional_searches(&self) -> usize {
        self.torsional_searches.load(Ordering::Relaxed)
    }

    pub fn archive_hits(&self) -> usize {
        self.archive_hits.load(Ordering::Relaxed)
    }

    pub fn rejected_pairs(&self) -> usize {
        self.rejected_pairs.load(Ordering::Relaxed)
    }
}

/// Everything a ring-closure search needs besides the graph itself.
pub struct RingClosureContext {
    params: RingClosureParameters,
    archive: Arc<ClosureArchive>,
    assembler: Arc<dyn Assembler3D>,
    matcher: Option<Arc<dyn PatternMatcher>>,
    stats: SearchStats,
}

impl RingClosureContext {
    /// Check the parameters and open the archive they point to, if any.
    pub fn new(params: RingClosureParameters) -> Result<Self> {
        let params = params.checked()?;
        let archive = match &params.archive_index {
            Some(index) => ClosureArchive::open(index, params.archive_folder.as_deref())?,
            None => ClosureArchive::in_memory(),
        };
        Ok(Self {
            params,
            archive: Arc::new(archive),
            assembler: Arc::new(SliceAssembler),
            matcher: None,
            stats: SearchStats::default(),
        })
    }

    /// Share an already opened archive.
    pub fn with_archive(mut self, archive: Arc<ClosureArchive>) -> Self {
        self.archive = archive;
        self
    }

    pub fn with_assembler(mut self, assembler: Arc<dyn Assembler3D>) -> Self {
        self.assembler = assembler;
        self
    }

    pub fn with_matcher(mut self, matcher: Arc<dyn PatternMatcher>) -> Self {
        self.matcher = Some(matcher);
        self
    }

    pub fn params(&self) -> &RingClosureParameters {
        &self.params
    }

    pub fn archive(&self) -> &Arc<ClosureArchive> {
        &self.archive
    }

    pub fn assembler(&self) -> &dyn Assembler3D {
        self.assembler.as_ref()
    }

    pub fn matcher(&self) -> Option<&dyn PatternMatcher> {
        self.matcher.as_deref()
    }

    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }
}
