//! Mirror tree layout and atomic file writes
//!
//! This module maps canonical page URLs to Markdown files under the output
//! directory and writes them via temp file + rename, so an interrupted run
//! never leaves a half-written page behind.

use crate::output::{OutputError, OutputResult};
use sha2::{Digest, Sha256};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use url::Url;

/// File name used for URLs that look like directories
pub const INDEX_FILE: &str = "_index.md";

/// Hex characters of the query hash appended to file stems
const QUERY_HASH_LEN: usize = 12;

/// Maps a canonical URL to a path relative to the output directory
///
/// - The URL path is taken relative to the directory of the allowed prefix.
/// - A last segment ending in `.html` becomes `<stem>.md`; `.htm` becomes
///   `<stem>.htm.md`.
/// - Any other path is a directory and maps to `<path>/_index.md`.
/// - A query string appends `-q<12 hex chars of SHA-256(query)>` to the stem.
///
/// Names that could be mistaken for generated ones are escaped: a leading
/// `_` is doubled, and a trailing `_` is added to names ending in `.md`,
/// `.htm` or a query tag (ignoring trailing underscores). Directory names
/// therefore never end in `.md` and distinct URLs never share a path.
///
/// # Examples
///
/// ```
/// use doc_mirror::output::output_path;
/// use std::path::PathBuf;
/// use url::Url;
///
/// let prefix = Url::parse("https://x.test/docs/").unwrap();
/// let page = Url::parse("https://x.test/docs/guide/intro.html").unwrap();
/// assert_eq!(output_path(&page, &prefix), PathBuf::from("guide/intro.md"));
/// ```
pub fn output_path(url: &Url, allowed_prefix: &Url) -> PathBuf {
    let relative = relative_path(url.path(), allowed_prefix.path());
    let mut segments: Vec<&str> = relative.split('/').filter(|s| !s.is_empty()).collect();

    let query_tag = url
        .query()
        .filter(|q| !q.is_empty())
        .map(|q| format!("-q{}", &sha256_hex(q.as_bytes())[..QUERY_HASH_LEN]))
        .unwrap_or_default();

    let file_name = match segments.last().copied() {
        Some(last) if last.ends_with(".html") => {
            segments.pop();
            let stem = &last[..last.len() - ".html".len()];
            format!("{}{}.md", escape_name(stem), query_tag)
        }
        Some(last) if last.ends_with(".htm") => {
            segments.pop();
            let stem = &last[..last.len() - ".htm".len()];
            format!("{}{}.htm.md", escape_name(stem), query_tag)
        }
        _ => format!("_index{}.md", query_tag),
    };

    let mut path = PathBuf::new();
    for segment in segments {
        path.push(escape_name(segment));
    }
    path.push(file_name);
    path
}

/// Writes a rendered page below `base_dir`
///
/// # Returns
///
/// * `Ok(PathBuf)` - Absolute (or base-relative) path of the written file
/// * `Err(OutputError)` - Directory creation or write failed
pub fn write_page(base_dir: &Path, relative: &Path, markdown: &str) -> OutputResult<PathBuf> {
    let path = base_dir.join(relative);
    write_atomic(&path, markdown.as_bytes())?;
    Ok(path)
}

/// Writes `contents` to a sibling temp file, syncs it and renames it over `path`
pub fn write_atomic(path: &Path, contents: &[u8]) -> OutputResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| write_error(parent, e))?;
        }
    }

    let tmp_path = sibling_with_suffix(path, ".tmp");
    let result = (|| -> std::io::Result<()> {
        let mut file = File::create(&tmp_path)?;
        file.write_all(contents)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp_path);
        return Err(write_error(path, e));
    }

    Ok(())
}

/// Appends `suffix` to the file name (`page.md` -> `page.md.tmp`)
pub(crate) fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn write_error(path: &Path, source: std::io::Error) -> OutputError {
    OutputError::Write {
        path: path.to_path_buf(),
        source,
    }
}

fn relative_path<'a>(url_path: &'a str, prefix_path: &str) -> &'a str {
    // Directory part of the prefix, including its trailing slash
    let base = match prefix_path.rfind('/') {
        Some(idx) => &prefix_path[..=idx],
        None => "/",
    };

    if let Some(rest) = url_path.strip_prefix(base) {
        return rest;
    }

    // Canonical URLs drop the trailing slash of the prefix directory itself
    if base.strip_suffix('/') == Some(url_path) {
        return "";
    }

    url_path.trim_start_matches('/')
}

fn escape_name(name: &str) -> String {
    let mut escaped = String::with_capacity(name.len() + 2);
    if name.starts_with('_') {
        escaped.push('_');
    }
    escaped.push_str(name);

    let trimmed = name.trim_end_matches('_');
    if trimmed.ends_with(".md") || trimmed.ends_with(".htm") || ends_with_query_tag(trimmed) {
        escaped.push('_');
    }
    escaped
}

fn ends_with_query_tag(name: &str) -> bool {
    let tag_len = 2 + QUERY_HASH_LEN;
    if name.len() < tag_len || !name.is_char_boundary(name.len() - tag_len) {
        return false;
    }

    let tag = &name[name.len() - tag_len..];
    tag.starts_with("-q")
        && tag[2..]
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}
