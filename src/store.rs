//! Document stores: where label PDFs are listed, fetched and replaced
//!
//! The batch orchestrator only talks to a [`DocumentStore`]. Two
//! implementations ship with the crate: [`MemoryStore`] for tests and
//! embedding, and [`DirectoryStore`], which maps locations to directories
//! under a root.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::error::{Error, Result};

pub const PDF_MIME_TYPE: &str = "application/pdf";
const OCTET_STREAM: &str = "application/octet-stream";

/// One entry directly under a location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    /// Store-specific identity, stable across content replacement
    pub id: String,
    pub name: String,
    pub mime_type: String,
}

impl StoredEntry {
    /// PDF by declared type or by name suffix
    pub fn is_pdf(&self) -> bool {
        self.mime_type.trim().eq_ignore_ascii_case(PDF_MIME_TYPE)
            || self.name.trim().to_lowercase().ends_with(".pdf")
    }
}

/// Storage the orchestrator reads labels from and writes them back to
pub trait DocumentStore {
    /// All live entries directly under `location`
    fn list(&self, location: &str) -> Result<Vec<StoredEntry>>;

    /// Full content of an entry
    fn fetch(&self, id: &str) -> Result<Vec<u8>>;

    /// Replace an entry's content, keeping its identity
    fn store(&mut self, id: &str, content: &[u8]) -> Result<()>;

    /// Copy an entry to `destination` under `name`, replacing any entry
    /// already there with that name
    fn duplicate(&mut self, id: &str, destination: &str, name: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    location: String,
    name: String,
    mime_type: String,
    content: Vec<u8>,
    trashed: bool,
}

/// In-memory document store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, MemoryEntry>,
    next_id: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry and return its id
    pub fn insert(&mut self, location: &str, name: &str, mime_type: &str, content: Vec<u8>) -> String {
        self.next_id += 1;
        let id = format!("mem-{:04}", self.next_id);
        self.entries.insert(
            id.clone(),
            MemoryEntry {
                location: location.to_string(),
                name: name.to_string(),
                mime_type: mime_type.to_string(),
                content,
                trashed: false,
            },
        );
        id
    }

    /// Current content of a live entry
    pub fn content(&self, id: &str) -> Option<&[u8]> {
        self.entries
            .get(id)
            .filter(|e| !e.trashed)
            .map(|e| e.content.as_slice())
    }

    /// Id of the live entry named `name` under `location`
    pub fn find(&self, location: &str, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, e)| !e.trashed && e.location == location && e.name == name)
            .map(|(id, _)| id.as_str())
    }

    /// Move an entry to the trash; trashed entries are never listed
    pub fn trash(&mut self, id: &str) -> Result<()> {
        match self.entries.get_mut(id) {
            Some(entry) => {
                entry.trashed = true;
                Ok(())
            }
            None => Err(Error::NotFound(id.to_string())),
        }
    }

    fn live(&self, id: &str) -> Result<&MemoryEntry> {
        self.entries
            .get(id)
            .filter(|e| !e.trashed)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }
}

impl DocumentStore for MemoryStore {
    fn list(&self, location: &str) -> Result<Vec<StoredEntry>> {
        let mut listed: Vec<StoredEntry> = self
            .entries
            .iter()
            .filter(|(_, e)| !e.trashed && e.location == location)
            .map(|(id, e)| StoredEntry {
                id: id.clone(),
                name: e.name.clone(),
                mime_type: e.mime_type.clone(),
            })
            .collect();
        listed.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listed)
    }

    fn fetch(&self, id: &str) -> Result<Vec<u8>> {
        Ok(self.live(id)?.content.clone())
    }

    fn store(&mut self, id: &str, content: &[u8]) -> Result<()> {
        self.live(id)?;
        if let Some(entry) = self.entries.get_mut(id) {
            entry.content = content.to_vec();
        }
        Ok(())
    }

    fn duplicate(&mut self, id: &str, destination: &str, name: &str) -> Result<()> {
        let source = self.live(id)?.clone();

        let existing: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| !e.trashed && e.location == destination && e.name == name)
            .map(|(id, _)| id.clone())
            .collect();
        for old in existing {
            self.entries.remove(&old);
        }

        self.insert(destination, name, &source.mime_type, source.content);
        Ok(())
    }
}

/// Document store over a directory tree
///
/// A location is a directory directly under the root and an entry id is
/// `location/name`.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Id of `name` under `location`
    pub fn entry_id(location: &str, name: &str) -> String {
        format!("{}/{}", location.trim_matches('/'), name)
    }

    fn location_dir(&self, location: &str) -> Result<PathBuf> {
        let location = location.trim_matches('/');
        let valid = !location.is_empty()
            && location
                .split('/')
                .all(|part| !part.is_empty() && part != "." && part != ".." && !part.contains('\\'));
        if !valid {
            return Err(Error::store("resolve", location, "invalid location"));
        }
        Ok(self.root.join(location))
    }

    fn entry_path(&self, id: &str) -> Result<PathBuf> {
        let (location, name) = id
            .rsplit_once('/')
            .ok_or_else(|| Error::store("resolve", id, "id is not location/name"))?;
        check_name(id, name)?;
        Ok(self.location_dir(location)?.join(name))
    }
}

fn check_name(id: &str, name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(Error::store("resolve", id, "invalid entry name"));
    }
    Ok(())
}

fn mime_type_for(name: &str) -> &'static str {
    if name.to_lowercase().ends_with(".pdf") {
        PDF_MIME_TYPE
    } else {
        OCTET_STREAM
    }
}

/// Map an IO error to a store error, keeping "not found" distinct
fn io_failure(op: &'static str, id: &str, err: io::Error) -> Error {
    if err.kind() == io::ErrorKind::NotFound {
        Error::NotFound(id.to_string())
    } else {
        Error::store(op, id, err)
    }
}

impl DocumentStore for DirectoryStore {
    fn list(&self, location: &str) -> Result<Vec<StoredEntry>> {
        let dir = self.location_dir(location)?;
        let reader = fs::read_dir(&dir).map_err(|e| io_failure("list", location, e))?;

        let mut listed = Vec::new();
        for entry in reader {
            let entry = entry.map_err(|e| io_failure("list", location, e))?;
            let file_type = entry.file_type().map_err(|e| io_failure("list", location, e))?;
            if !file_type.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            listed.push(StoredEntry {
                id: Self::entry_id(location, &name),
                mime_type: mime_type_for(&name).to_string(),
                name,
            });
        }
        listed.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listed)
    }

    fn fetch(&self, id: &str) -> Result<Vec<u8>> {
        let path = self.entry_path(id)?;
        fs::read(&path).map_err(|e| io_failure("fetch", id, e))
    }

    fn store(&mut self, id: &str, content: &[u8]) -> Result<()> {
        let path = self.entry_path(id)?;
        if !path.is_file() {
            return Err(Error::NotFound(id.to_string()));
        }
        let dir = path
            .parent()
            .ok_or_else(|| Error::store("store", id, "entry has no parent directory"))?;

        // Readers see either the old file or the new one, never a partial write
        let mut temp = NamedTempFile::new_in(dir).map_err(|e| io_failure("store", id, e))?;
        temp.write_all(content).map_err(|e| io_failure("store", id, e))?;
        temp.as_file().sync_all().map_err(|e| io_failure("store", id, e))?;
        temp.persist(&path).map_err(|e| io_failure("store", id, e.error))?;
        Ok(())
    }

    fn duplicate(&mut self, id: &str, destination: &str, name: &str) -> Result<()> {
        let source = self.entry_path(id)?;
        if !source.is_file() {
            return Err(Error::NotFound(id.to_string()));
        }
        let dest_id = Self::entry_id(destination, name);
        check_name(&dest_id, name)?;
        let dest_dir = self.location_dir(destination)?;
        fs::create_dir_all(&dest_dir).map_err(|e| io_failure("duplicate", &dest_id, e))?;

        let target = dest_dir.join(name);
        if target.exists() {
            fs::remove_file(&target).map_err(|e| io_failure("duplicate", &dest_id, e))?;
        }
        fs::copy(&source, &target).map_err(|e| io_failure("duplicate", &dest_id, e))?;
        Ok(())
    }
}
