use crate::error::{Result, ScanError};
use std::collections::HashSet;
use url::Url;

/// File extensions that never lead to a crawlable HTML page.
pub const DEFAULT_IGNORED_EXTENSIONS: &[&str] = &[
    // images
    "png", "jpg", "jpeg", "gif", "svg", "webp", "ico", "bmp", "tif", "tiff",
    // archives
    "zip", "tar", "gz", "tgz", "bz2", "xz", "7z", "rar",
    // media
    "mp3", "mp4", "m4a", "avi", "mov", "wmv", "webm", "ogg", "wav", "flac",
    // fonts
    "woff", "woff2", "ttf", "otf", "eot",
    // stylesheets and scripts
    "css", "js", "map",
    // documents and binaries
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "exe", "dmg", "iso", "apk", "bin",
];

/// Resolves discovered link references into canonical same-host URLs.
///
/// Stateless after construction, so a single instance can be shared
/// between tasks.
#[derive(Debug, Clone)]
pub struct UrlNormalizer {
    ignored_extensions: HashSet<String>,
}

impl UrlNormalizer {
    pub fn new<I, S>(ignored_extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            ignored_extensions: ignored_extensions
                .into_iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    /// Resolve `reference` against `parent`.
    ///
    /// Returns `None` for anything the crawl should not follow: non-http(s)
    /// schemes, other hosts (port included), ignored extensions, and
    /// references that do not resolve at all. The fragment is always
    /// dropped.
    pub fn normalize(&self, reference: &str, parent: &Url) -> Option<Url> {
        let reference = reference.trim();
        if reference.is_empty() {
            return None;
        }

        let mut resolved = parent.join(reference).ok()?;

        if !matches!(resolved.scheme(), "http" | "https") {
            return None;
        }

        if resolved.host_str() != parent.host_str() || resolved.port() != parent.port() {
            return None;
        }

        if let Some(ext) = path_extension(&resolved)
            && self.ignored_extensions.contains(&ext)
        {
            return None;
        }

        resolved.set_fragment(None);
        Some(resolved)
    }

    pub fn is_ignored_extension(&self, ext: &str) -> bool {
        self.ignored_extensions.contains(&ext.to_lowercase())
    }
}

impl Default for UrlNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_IGNORED_EXTENSIONS)
    }
}

/// Lowercased extension of the last path segment, if it has one.
fn path_extension(url: &Url) -> Option<String> {
    let last_segment = url.path_segments()?.next_back()?;
    let (stem, ext) = last_segment.rsplit_once('.')?;
    if stem.is_empty() && ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

/// Parse a seed URL into its canonical crawl form.
pub fn normalize_seed(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", raw, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ScanError::InvalidUrl(format!(
            "{}: unsupported scheme '{}'",
            raw,
            url.scheme()
        )));
    }
    if url.host_str().is_none() {
        return Err(ScanError::InvalidUrl(format!("{}: missing host", raw)));
    }

    url.set_fragment(None);
    Ok(url)
}
