//! Batch driver: file selection, backup bookkeeping and runtime install.
//!
//! A batch is one file or one directory tree. Each eligible file is
//! rewritten through a temporary that is swapped in only on success, with
//! the pristine file kept next to it as `<file>.orig`. A file that already
//! starts with the runtime include is restored from its backup first, so
//! running the tool twice produces the same bytes as running it once.
//! Processing is strictly sequential and fail-fast: the first broken file
//! aborts the batch with its path and line, and nothing is rolled back.

use std::fs;
use std::io::{BufRead, BufReader, BufWriter};
use std::path::{Path, PathBuf, MAIN_SEPARATOR};

use anyhow::{Context, Result};
use ignore::WalkBuilder;
use log::{debug, info};

use crate::domain::types::{Config, FileContext};
use crate::inject;
use crate::translate;

/// Extensions the rewriter touches; everything else passes untouched.
pub const SOURCE_EXTENSIONS: &[&str] = &["c", "cpp", "h", "hpp"];

pub struct ProjectTranslator {
    config: Config,
    runtime_dir: Option<PathBuf>,
}

impl ProjectTranslator {
    pub fn new(config: Config, runtime_dir: Option<PathBuf>) -> Self {
        ProjectTranslator { config, runtime_dir }
    }

    /// Rewrite `input` (a file or a directory tree) and install the runtime
    /// support files into the project root. Returns the number of files
    /// rewritten.
    pub fn run(&self, input: &Path) -> Result<usize> {
        let (root, files) = if input.is_dir() {
            (input.to_path_buf(), collect_files(input)?)
        } else {
            (parent_dir(input), vec![input.to_path_buf()])
        };

        let mut count = 0;
        for file in &files {
            if !eligible(file) {
                debug!("skipping {} (not an instrumentable source)", file.display());
                continue;
            }
            self.translate_file(file)
                .with_context(|| format!("failed to rewrite {}", file.display()))?;
            count += 1;
        }

        self.install_runtime(&root)?;
        Ok(count)
    }

    /// Rewrite one file in place, keeping the original as `<file>.orig`.
    fn translate_file(&self, path: &Path) -> Result<()> {
        if already_instrumented(path)? {
            let backup = backup_path(path);
            fs::rename(&backup, path).with_context(|| {
                format!("restoring {} before re-instrumenting", backup.display())
            })?;
            debug!("restored {} from backup", path.display());
        }

        let package = package_of(path);
        let class = class_of(path);
        info!("rewriting {} (package {package}, class {class})", path.display());

        let tmp = tmp_path(path);
        if let Err(e) = self.rewrite(path, &tmp, &package, &class) {
            // Leave the source untouched; only the temporary is discarded.
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }

        fs::rename(path, backup_path(path)).context("creating backup")?;
        fs::rename(&tmp, path).context("moving rewritten file into place")?;
        Ok(())
    }

    fn rewrite(&self, path: &Path, tmp: &Path, package: &str, class: &str) -> Result<()> {
        let input = BufReader::new(fs::File::open(path).context("opening source")?);
        let output = BufWriter::new(fs::File::create(tmp).context("creating temporary")?);
        let ctx = FileContext::new(&self.config, package, class);
        translate::translate(ctx, input, output)?;
        Ok(())
    }

    /// Copy the runtime support sources into the project root, where the
    /// injected includes expect them.
    fn install_runtime(&self, root: &Path) -> Result<()> {
        let Some(dir) = &self.runtime_dir else { return Ok(()) };
        for name in [inject::RUNTIME_HEADER, inject::RUNTIME_IMPL] {
            let src = dir.join(name);
            if src.exists() {
                fs::copy(&src, root.join(name))
                    .with_context(|| format!("installing {name} into {}", root.display()))?;
                info!("installed {name} into {}", root.display());
            }
        }
        Ok(())
    }
}

/// All files under `dir`, in deterministic (sorted) batch order. The walk
/// honors ignore files, so vendored and build trees stay untouched.
fn collect_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkBuilder::new(dir).build() {
        let entry = entry.context("walking project directory")?;
        if entry.file_type().is_some_and(|t| t.is_file()) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Whether the rewriter should touch this file at all. The runtime support
/// files are excluded so a second run never instruments them.
fn eligible(path: &Path) -> bool {
    if path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n == inject::RUNTIME_HEADER || n == inject::RUNTIME_IMPL)
    {
        return false;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SOURCE_EXTENSIONS.contains(&e))
}

/// A file is already instrumented when its first line pulls in the runtime
/// header (the rewriter puts it there unconditionally).
fn already_instrumented(path: &Path) -> Result<bool> {
    let file =
        fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut first = Vec::new();
    BufReader::new(file)
        .read_until(b'\n', &mut first)
        .context("reading first line")?;
    Ok(first
        .windows(inject::RUNTIME_HEADER.len())
        .any(|w| w == inject::RUNTIME_HEADER.as_bytes()))
}

/// Dotted package string: the directory path after the last `/src/`
/// marker, with separators turned into dots.
pub fn package_of(path: &Path) -> String {
    let dir = path.parent().map(Path::to_string_lossy).unwrap_or_default();
    let marker = format!("{MAIN_SEPARATOR}src{MAIN_SEPARATOR}");
    let tail = dir.rsplit(marker.as_str()).next().unwrap_or_default();
    tail.replace(MAIN_SEPARATOR, ".")
}

/// Class string: the file's base name without extension.
pub fn class_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn backup_path(path: &Path) -> PathBuf {
    append_suffix(path, "orig")
}

fn tmp_path(path: &Path) -> PathBuf {
    append_suffix(path, "weave")
}

fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".{suffix}"));
    PathBuf::from(name)
}
