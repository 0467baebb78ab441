//! Index lifecycle: one writer per index location, synchronous commits and
//! near-real-time snapshots.
//!
//! The writer lives behind an explicit state machine ([`HandleStatus`]):
//! `Open` is the only state a mutation runs in. A `Closed` or `Degraded`
//! handle is reinitialized on the next mutation, and a mutation that finds
//! the handle invalid is retried exactly once against a fresh writer.
//!
//! Snapshots are copy-on-refresh: the manager keeps the latest one and swaps
//! in a new searcher only when a commit happened since it was taken. Callers
//! holding an older snapshot keep querying it until they drop it.
use parking_lot::{Mutex, RwLock};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tantivy::directory::MmapDirectory;
use tantivy::{Index, IndexReader, IndexWriter, Opstamp, ReloadPolicy, Searcher, TantivyError};
use tracing::{debug, info, warn};

use docsearch_core::config::IndexSettings;
use docsearch_core::error::{Error, Result};

use crate::schema::{build_schema, register_tokenizer, DocFields};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexLocation {
	Directory(PathBuf),
	InMemory,
}

impl IndexLocation {
	pub fn from_settings(settings: &IndexSettings) -> Self {
		if settings.in_memory {
			Self::InMemory
		} else {
			Self::Directory(settings.index_dir())
		}
	}

	fn describe(&self) -> String {
		match self {
			Self::Directory(path) => path.display().to_string(),
			Self::InMemory => "<memory>".to_string(),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleStatus {
	Closed,
	Open,
	Degraded,
}

enum WriterState {
	Closed,
	Open(IndexWriter),
	Degraded(String),
}

enum WriterEvent {
	Opened(IndexWriter),
	Failed(String),
	Closed,
}

impl WriterState {
	fn status(&self) -> HandleStatus {
		match self {
			Self::Closed => HandleStatus::Closed,
			Self::Open(_) => HandleStatus::Open,
			Self::Degraded(_) => HandleStatus::Degraded,
		}
	}

	fn degraded_reason(&self) -> Option<&str> {
		match self {
			Self::Degraded(reason) => Some(reason),
			Self::Closed | Self::Open(_) => None,
		}
	}

	/// Moves to the state `event` leads to and hands back the writer the
	/// previous state owned, if any. Dropping that writer discards its
	/// uncommitted operations and releases the directory lock.
	fn transition(&mut self, event: WriterEvent) -> Option<IndexWriter> {
		let next = match event {
			WriterEvent::Opened(writer) => Self::Open(writer),
			WriterEvent::Failed(reason) => Self::Degraded(reason),
			WriterEvent::Closed => Self::Closed,
		};
		match std::mem::replace(self, next) {
			Self::Open(writer) => Some(writer),
			Self::Closed | Self::Degraded(_) => None,
		}
	}
}

enum Failure {
	/// The writer handle is unusable; reinitializing may help.
	Handle(String),
	/// Reported to the caller as is.
	Fatal(Error),
}

/// Immutable point-in-time view over committed index state.
///
/// Cheap to clone. Stays queryable after newer commits until dropped.
#[derive(Clone)]
pub struct IndexSnapshot {
	searcher: Searcher,
	opstamp: Opstamp,
}

impl IndexSnapshot {
	pub fn searcher(&self) -> &Searcher {
		&self.searcher
	}

	/// Commit opstamp this snapshot is guaranteed to include.
	pub fn opstamp(&self) -> Opstamp {
		self.opstamp
	}

	pub fn num_docs(&self) -> u64 {
		self.searcher.num_docs()
	}
}

pub struct IndexManager {
	location: IndexLocation,
	writer_heap_bytes: usize,
	index: Index,
	fields: DocFields,
	writer: Mutex<WriterState>,
	reader: RwLock<IndexReader>,
	current: RwLock<Option<IndexSnapshot>>,
	committed: AtomicU64,
}

impl IndexManager {
	pub fn open(settings: &IndexSettings) -> Result<Self> {
		Self::open_or_create(IndexLocation::from_settings(settings), settings.writer_heap_bytes)
	}

	/// Opens the index at `location`, creating it when absent, and takes the
	/// writer lock. A second live manager on the same directory fails with
	/// [`Error::WriterLocked`].
	pub fn open_or_create(location: IndexLocation, writer_heap_bytes: usize) -> Result<Self> {
		let index = open_index(&location)?;
		let fields = DocFields::resolve(&index.schema())?;
		let mut writer = create_writer(&index, &location, writer_heap_bytes)?;
		// Commit right away so a brand-new index has a readable meta.json.
		let opstamp = writer.commit().map_err(|e| unavailable(&location, e))?;
		let reader = build_reader(&index)?;
		info!(location = %location.describe(), opstamp, docs = reader.searcher().num_docs(), "search index opened");
		Ok(Self {
			location,
			writer_heap_bytes,
			index,
			fields,
			writer: Mutex::new(WriterState::Open(writer)),
			reader: RwLock::new(reader),
			current: RwLock::new(None),
			committed: AtomicU64::new(opstamp),
		})
	}

	pub fn index(&self) -> &Index {
		&self.index
	}

	pub fn fields(&self) -> &DocFields {
		&self.fields
	}

	pub fn status(&self) -> HandleStatus {
		self.writer.lock().status()
	}

	/// Why the writer was marked unusable, while it stays degraded.
	pub fn degraded_reason(&self) -> Option<String> {
		self.writer.lock().degraded_reason().map(str::to_string)
	}

	pub fn committed_opstamp(&self) -> Opstamp {
		self.committed.load(Ordering::Acquire)
	}

	/// Runs `op` against the writer and commits.
	///
	/// Mutations are serialized on the writer lock for their whole duration,
	/// commit included. On failure nothing from `op` becomes visible.
	pub fn mutate<T, F>(&self, op: F) -> Result<T>
	where
		F: Fn(&IndexWriter, &DocFields) -> tantivy::Result<T>,
	{
		let mut state = self.writer.lock();
		match self.attempt(&mut state, &op) {
			Ok(value) => Ok(value),
			Err(Failure::Fatal(err)) => Err(err),
			Err(Failure::Handle(reason)) => {
				warn!(location = %self.location.describe(), %reason, "index writer invalid, reinitializing");
				drop(state.transition(WriterEvent::Failed(reason)));
				match self.attempt(&mut state, &op) {
					Ok(value) => Ok(value),
					Err(Failure::Fatal(err)) => Err(err),
					Err(Failure::Handle(reason)) => {
						warn!(location = %self.location.describe(), %reason, "index writer still invalid after reinitialization");
						drop(state.transition(WriterEvent::Failed(reason.clone())));
						Err(Error::IndexUnavailable(reason))
					}
				}
			}
		}
	}

	fn attempt<T, F>(&self, state: &mut WriterState, op: &F) -> std::result::Result<T, Failure>
	where
		F: Fn(&IndexWriter, &DocFields) -> tantivy::Result<T>,
	{
		if state.status() != HandleStatus::Open {
			if let Some(reason) = state.degraded_reason() {
				debug!(location = %self.location.describe(), %reason, "replacing degraded writer");
			}
			let writer = self.reopen_writer()?;
			drop(state.transition(WriterEvent::Opened(writer)));
		}
		let WriterState::Open(writer) = state else {
			return Err(Failure::Handle("writer handle did not open".to_string()));
		};
		let value = match op(&*writer, &self.fields) {
			Ok(value) => value,
			Err(err) => return Err(abandon(writer, err)),
		};
		match writer.commit() {
			Ok(opstamp) => {
				self.committed.store(opstamp, Ordering::Release);
				debug!(opstamp, "index commit");
				Ok(value)
			}
			Err(err) => Err(abandon(writer, err)),
		}
	}

	fn reopen_writer(&self) -> std::result::Result<IndexWriter, Failure> {
		let index = match &self.location {
			IndexLocation::Directory(_) => open_index(&self.location).map_err(|e| Failure::Handle(e.to_string()))?,
			IndexLocation::InMemory => self.index.clone(),
		};
		let writer = create_writer(&index, &self.location, self.writer_heap_bytes).map_err(|err| match err {
			locked @ Error::WriterLocked(_) => Failure::Fatal(locked),
			other => Failure::Handle(other.to_string()),
		})?;
		info!(location = %self.location.describe(), "index writer reinitialized");
		Ok(writer)
	}

	/// Returns a snapshot that includes every commit completed before the call.
	///
	/// Reuses the current snapshot when nothing was committed since it was
	/// taken; otherwise reloads and swaps in a new one.
	pub fn snapshot(&self) -> Result<IndexSnapshot> {
		let committed = self.committed_opstamp();
		if let Some(existing) = self.current.read().as_ref().filter(|s| s.opstamp >= committed) {
			return Ok(existing.clone());
		}
		let mut current = self.current.write();
		if let Some(existing) = current.as_ref().filter(|s| s.opstamp >= committed) {
			return Ok(existing.clone());
		}
		let searcher = self.refresh_searcher()?;
		let snapshot = IndexSnapshot { searcher, opstamp: committed };
		debug!(opstamp = committed, docs = snapshot.num_docs(), "snapshot refreshed");
		*current = Some(snapshot.clone());
		Ok(snapshot)
	}

	fn refresh_searcher(&self) -> Result<Searcher> {
		let reloaded = {
			let reader = self.reader.read();
			reader.reload().map(|()| reader.searcher())
		};
		match reloaded {
			Ok(searcher) => Ok(searcher),
			Err(err) => {
				warn!(location = %self.location.describe(), %err, "snapshot reload failed, rebuilding reader");
				let reader = build_reader(&self.index)?;
				let searcher = reader.searcher();
				*self.reader.write() = reader;
				Ok(searcher)
			}
		}
	}

	/// Waits for merges, releases the writer lock and the current snapshot.
	/// A later mutation reopens the writer.
	pub fn close(&self) -> Result<()> {
		let released = self.writer.lock().transition(WriterEvent::Closed);
		*self.current.write() = None;
		if let Some(writer) = released {
			writer.wait_merging_threads().map_err(|e| unavailable(&self.location, e))?;
		}
		info!(location = %self.location.describe(), "search index closed");
		Ok(())
	}

	#[cfg(test)]
	pub(crate) fn force_degraded(&self, reason: &str) {
		drop(self.writer.lock().transition(WriterEvent::Failed(reason.to_string())));
	}
}

fn open_index(location: &IndexLocation) -> Result<Index> {
	let index = match location {
		IndexLocation::Directory(path) => {
			std::fs::create_dir_all(path)
				.map_err(|e| Error::IndexUnavailable(format!("creating {}: {}", path.display(), e)))?;
			let dir = MmapDirectory::open(path)
				.map_err(|e| Error::IndexUnavailable(format!("opening {}: {}", path.display(), e)))?;
			Index::open_or_create(dir, build_schema()).map_err(|e| unavailable(location, e))?
		}
		IndexLocation::InMemory => Index::create_in_ram(build_schema()),
	};
	register_tokenizer(&index);
	Ok(index)
}

fn create_writer(index: &Index, location: &IndexLocation, heap_bytes: usize) -> Result<IndexWriter> {
	index.writer(heap_bytes).map_err(|err| match err {
		TantivyError::LockFailure(..) => Error::WriterLocked(location.describe()),
		other => unavailable(location, other),
	})
}

fn build_reader(index: &Index) -> Result<IndexReader> {
	index
		.reader_builder()
		.reload_policy(ReloadPolicy::Manual)
		.try_into()
		.map_err(|e| Error::IndexUnavailable(format!("opening reader: {}", e)))
}

fn unavailable(location: &IndexLocation, err: TantivyError) -> Error {
	Error::IndexUnavailable(format!("{}: {}", location.describe(), err))
}

fn is_handle_failure(err: &TantivyError) -> bool {
	matches!(
		err,
		TantivyError::ErrorInThread(_) | TantivyError::Poisoned | TantivyError::IoError(_) | TantivyError::SystemError(_)
	)
}

/// Discards uncommitted operations so the last commit stays the visible state.
fn abandon(writer: &mut IndexWriter, err: TantivyError) -> Failure {
	if is_handle_failure(&err) {
		return Failure::Handle(err.to_string());
	}
	match writer.rollback() {
		Ok(_) => Failure::Fatal(Error::Operation(err.to_string())),
		Err(rollback_err) => Failure::Handle(format!("{}; rollback failed: {}", err, rollback_err)),
	}
}
