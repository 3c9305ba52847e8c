//! Directory-tree storage backend
//!
//! Each key maps to a directory: `rc:app:prod` lives in `<root>/rc/app/prod/`
//! and its value is written to `prod.<extension>` inside that directory.
//! Reading a key concatenates every value file in its directory, so several
//! files can contribute to one layer.

use fs2::FileExt;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::backend::FileParams;
use crate::{Error, KeyPattern, Result, Storage};

/// A [`Storage`] adapter that keeps layers as files in a directory tree.
#[derive(Debug)]
pub struct FileStorage {
    root: PathBuf,
    extension: String,
    exclude: Vec<String>,
}

impl FileStorage {
    /// Open a store rooted at `params.root`, creating the directory if needed.
    pub fn open(params: &FileParams) -> Result<Self> {
        let root = &params.root;
        if root.exists() && !root.is_dir() {
            return Err(Error::InvalidBackend {
                kind: "file".into(),
                message: format!("{} is not a directory", root.display()),
            });
        }
        fs::create_dir_all(root).map_err(|e| Error::io(root, e))?;
        tracing::debug!(root = %root.display(), "Opened file storage");
        Ok(Self {
            root: root.clone(),
            extension: params.extension.trim_start_matches('.').to_string(),
            exclude: params.exclude.clone(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_dir(&self, key: &str) -> Result<PathBuf> {
        let mut dir = self.root.clone();
        for segment in key.split(':') {
            if segment.is_empty()
                || segment == "."
                || segment == ".."
                || segment.contains(['/', '\\', '#'])
            {
                return Err(Error::malformed_key(
                    key,
                    format!("segment {segment:?} cannot be stored as a directory"),
                ));
            }
            dir.push(segment);
        }
        Ok(dir)
    }

    fn is_value_file(&self, path: &Path) -> bool {
        path.is_file()
            && path.extension().and_then(|e| e.to_str()) == Some(self.extension.as_str())
            && !path
                .file_stem()
                .and_then(|s| s.to_str())
                .is_some_and(|stem| self.exclude.iter().any(|x| x == stem))
    }

    fn value_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .map_err(|e| Error::io(dir, e))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| self.is_value_file(path))
            .collect();
        files.sort();
        Ok(files)
    }

    fn read_key(&self, key: &str) -> Result<Option<String>> {
        let dir = self.key_dir(key)?;
        let files = self.value_files(&dir)?;
        if files.is_empty() {
            return Ok(None);
        }
        let mut values = Vec::with_capacity(files.len());
        for file in files {
            values.push(fs::read_to_string(&file).map_err(|e| Error::io(&file, e))?);
        }
        Ok(Some(values.join("\n")))
    }

    fn collect_keys(&self, dir: &Path, segments: &mut Vec<String>, out: &mut Vec<String>) -> Result<()> {
        if !segments.is_empty() && !self.value_files(dir)?.is_empty() {
            out.push(segments.join(":"));
        }
        let mut children: Vec<PathBuf> = fs::read_dir(dir)
            .map_err(|e| Error::io(dir, e))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_dir())
            .collect();
        children.sort();
        for child in children {
            let Some(name) = child.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            segments.push(name.to_string());
            self.collect_keys(&child, segments, out)?;
            segments.pop();
        }
        Ok(())
    }

    fn matching(&self, pattern: &str) -> Result<Vec<String>> {
        let pattern = KeyPattern::new(pattern)?;
        if pattern.is_literal() {
            let dir = self.key_dir(pattern.as_str())?;
            return Ok(if self.value_files(&dir)?.is_empty() {
                Vec::new()
            } else {
                vec![pattern.as_str().to_string()]
            });
        }
        let mut keys = Vec::new();
        self.collect_keys(&self.root, &mut Vec::new(), &mut keys)?;
        keys.retain(|key| pattern.matches(key));
        keys.sort();
        Ok(keys)
    }

    /// Remove now-empty directories from `dir` up to (not including) the root.
    fn prune(&self, mut dir: PathBuf) {
        while dir != self.root && dir.starts_with(&self.root) {
            if fs::remove_dir(&dir).is_err() {
                break;
            }
            if !dir.pop() {
                break;
            }
        }
    }
}

/// Replace `file` with `content`.
///
/// The bytes go to a hidden `.partial` sibling first, which is locked,
/// synced and then renamed over `file`. The sibling is removed again when
/// any of those steps fails.
fn replace_file(file: &Path, content: &[u8]) -> Result<()> {
    if let Some(dir) = file.parent() {
        fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
    }
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let partial = file.with_file_name(format!(".{name}.{}.partial", std::process::id()));

    let staged = stage(&partial, file, content)
        .and_then(|()| fs::rename(&partial, file).map_err(|e| Error::io(file, e)));
    if staged.is_err() {
        discard(&partial);
    }
    staged
}

/// Write and sync `content` into `partial` under an exclusive lock.
fn stage(partial: &Path, file: &Path, content: &[u8]) -> Result<()> {
    let mut handle = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(partial)
        .map_err(|e| Error::io(partial, e))?;
    let lock_failed = |_: std::io::Error| Error::LockFailed {
        path: file.to_path_buf(),
    };

    handle.lock_exclusive().map_err(lock_failed)?;
    handle.write_all(content).map_err(|e| Error::io(partial, e))?;
    handle.sync_all().map_err(|e| Error::io(partial, e))?;
    FileExt::unlock(&handle).map_err(lock_failed)
}

fn discard(partial: &Path) {
    match fs::remove_file(partial) {
        Ok(()) => tracing::debug!(file = %partial.display(), "Removed partial write"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(file = %partial.display(), error = %e, "Could not remove partial write"),
    }
}

impl Storage for FileStorage {
    fn get(&mut self, pattern: &str) -> Result<Option<String>> {
        match self.matching(pattern)?.first() {
            Some(key) => self.read_key(key),
            None => Ok(None),
        }
    }

    fn get_many(
        &mut self,
        pattern: &str,
        exclude: Option<&str>,
    ) -> Result<BTreeMap<String, String>> {
        let exclude = exclude.map(KeyPattern::new).transpose()?;
        let mut found = BTreeMap::new();
        for key in self.matching(pattern)? {
            if exclude.as_ref().is_some_and(|p| p.matches(&key)) {
                continue;
            }
            if let Some(value) = self.read_key(&key)? {
                found.insert(key, value);
            }
        }
        Ok(found)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<bool> {
        let dir = self.key_dir(key)?;
        let stem = key.rsplit(':').next().unwrap_or(key);
        let file = dir.join(format!("{stem}.{}", self.extension));
        replace_file(&file, value.as_bytes())?;
        tracing::debug!(key, file = %file.display(), "Wrote layer file");
        Ok(true)
    }

    fn keys(&mut self, pattern: &str) -> Result<Vec<String>> {
        self.matching(pattern)
    }

    fn delete(&mut self, pattern: &str) -> Result<Vec<String>> {
        let keys = self.matching(pattern)?;
        for key in &keys {
            let dir = self.key_dir(key)?;
            for file in self.value_files(&dir)? {
                fs::remove_file(&file).map_err(|e| Error::io(&file, e))?;
            }
            self.prune(dir);
        }
        Ok(keys)
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn supports_attributes(&self) -> bool {
        false
    }
}
