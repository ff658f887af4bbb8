//! Filename sanitization and collision-free path resolution for downloads.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use tokio::fs::{File, OpenOptions};

/// Name used when the remote filename sanitizes to nothing usable.
const FALLBACK_FILENAME: &str = "download.bin";

/// Sanitizes filename for filesystem safety.
///
/// Replaces characters that are invalid on common filesystems:
/// / \ : * ? " < > |
pub(crate) fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() {
        return "_".to_string();
    }

    if is_safe_filename_segment(&sanitized) {
        sanitized
    } else {
        sanitized
            .chars()
            .map(|c| if c == '.' { '_' } else { c })
            .collect()
    }
}

fn is_safe_filename_segment(name: &str) -> bool {
    !Path::new(name).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}

/// Splits `name` into stem and extension (the extension keeps its dot).
///
/// A leading dot is part of the stem, so `.hidden` has no extension.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(pos) if pos > 0 => (&name[..pos], &name[pos..]),
        _ => (name, ""),
    }
}

/// `dir/filename`, then `stem_1.ext`, `stem_2.ext`, ... without end.
fn candidate_paths(dir: &Path, filename: &str) -> impl Iterator<Item = PathBuf> {
    let filename = {
        let sanitized = sanitize_filename(filename);
        if sanitized.trim_matches('_').is_empty() {
            FALLBACK_FILENAME.to_string()
        } else {
            sanitized
        }
    };
    let base_path = dir.join(&filename);
    let (stem, ext) = split_extension(&filename);
    let (stem, ext) = (stem.to_string(), ext.to_string());
    let dir = dir.to_path_buf();
    std::iter::once(base_path).chain((1u64..).map(move |i| dir.join(format!("{stem}_{i}{ext}"))))
}

/// Resolves a path in `dir` that does not exist yet.
///
/// Returns `dir/filename` when free, otherwise the first free name in
/// `stem_1.ext`, `stem_2.ext`, ... The check is not atomic: two writers racing
/// for the same name may both pick it. [`create_unique_file`] claims the name.
#[must_use]
pub fn resolve_unique_path(dir: &Path, filename: &str) -> PathBuf {
    candidate_paths(dir, filename)
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| dir.join(FALLBACK_FILENAME))
}

/// Creates and opens the first free name in the same sequence as
/// [`resolve_unique_path`].
///
/// Each candidate is opened with `create_new`, so concurrent writers never
/// end up sharing a file.
///
/// # Errors
///
/// Returns any IO error other than `AlreadyExists`.
pub async fn create_unique_file(dir: &Path, filename: &str) -> std::io::Result<(PathBuf, File)> {
    for candidate in candidate_paths(dir, filename) {
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
            .await
        {
            Ok(file) => return Ok((candidate, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
            Err(e) => return Err(e),
        }
    }
    Err(std::io::Error::new(ErrorKind::AlreadyExists, "no free file name left"))
}
