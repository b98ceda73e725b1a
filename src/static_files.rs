//! Watchman Static Asset Collection
//!
//! Gathers assets into the static root for deployment. Under the
//! compressed-manifest strategy every file also gets a content-hashed copy,
//! `staticfiles.json` maps original names to hashed ones, and both copies get
//! `.gz` and `.br` siblings for `ServeDir` to pick up.

use brotli::CompressorWriter;
use flate2::{write::GzEncoder, Compression};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::{Settings, StaticAssetStrategy};
use crate::errors::StaticFilesError;

pub const MANIFEST_NAME: &str = "staticfiles.json";
pub const MANIFEST_VERSION: &str = "1.1";
pub const SOURCE_DIR_NAME: &str = "assets";
const HASH_LEN: usize = 12;
const BROTLI_BUFFER: usize = 4096;
const BROTLI_QUALITY: u32 = 11;
const BROTLI_WINDOW: u32 = 22;

/// Extensions whose contents are already compressed.
const SKIP_COMPRESSION: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "avif", "ico", "zip", "gz", "tgz", "bz2", "tbz", "xz",
    "br", "zst", "woff", "woff2", "mp3", "mp4", "m4v", "mov", "mpeg", "mpg", "webm", "ogg",
    "avi", "wmv", "flv", "3gp", "3gpp",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub paths: BTreeMap<String, String>,
    pub version: String,
    pub hash: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct CollectReport {
    pub copied: usize,
    pub hashed: usize,
    pub compressed: usize,
    pub manifest: Option<PathBuf>,
}

pub fn default_source(settings: &Settings) -> PathBuf {
    settings.base_dir.join(SOURCE_DIR_NAME)
}

pub fn collect(source: &Path, strategy: &StaticAssetStrategy) -> Result<CollectReport, StaticFilesError> {
    if !source.is_dir() {
        return Err(StaticFilesError::SourceMissing(source.to_path_buf()));
    }

    let root = strategy.static_root();
    let mut files = Vec::new();
    walk(source, Path::new(""), &mut files)?;
    files.sort();

    info!(
        "Collecting {} static file(s) from {} into {}",
        files.len(),
        source.display(),
        root.display()
    );

    let mut report = CollectReport::default();
    let mut paths = BTreeMap::new();

    for relative in &files {
        let from = source.join(relative);
        let contents = fs::read(&from).map_err(|e| StaticFilesError::ReadFailed(from.clone(), e))?;
        let name = url_path(relative);

        write_file(&root.join(relative), &contents)?;
        report.copied += 1;

        if strategy.is_manifest() {
            let hashed = hashed_name(&name, &contents);
            write_file(&root.join(&hashed), &contents)?;
            debug!("{} -> {}", name, hashed);
            report.compressed += write_compressed(&root.join(relative), &contents)?;
            report.compressed += write_compressed(&root.join(&hashed), &contents)?;
            paths.insert(name, hashed);
            report.hashed += 1;
        }
    }

    if strategy.is_manifest() {
        let manifest_path = root.join(MANIFEST_NAME);
        let manifest = Manifest::new(paths)?;
        let json = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| StaticFilesError::ManifestFailed(e.to_string()))?;
        write_file(&manifest_path, &json)?;
        report.manifest = Some(manifest_path);
    }

    info!(
        "{} static file(s) copied, {} hashed, {} compressed",
        report.copied, report.hashed, report.compressed
    );
    Ok(report)
}

impl Manifest {
    fn new(paths: BTreeMap<String, String>) -> Result<Self, StaticFilesError> {
        let encoded =
            serde_json::to_vec(&paths).map_err(|e| StaticFilesError::ManifestFailed(e.to_string()))?;
        Ok(Self {
            hash: content_hash(&encoded),
            paths,
            version: MANIFEST_VERSION.to_string(),
        })
    }

    pub fn load(static_root: &Path) -> Result<Self, StaticFilesError> {
        let path = static_root.join(MANIFEST_NAME);
        let raw = fs::read(&path).map_err(|e| StaticFilesError::ReadFailed(path, e))?;
        serde_json::from_slice(&raw).map_err(|e| StaticFilesError::ManifestFailed(e.to_string()))
    }

    /// Hashed URL path for an asset, if it was collected.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.paths.get(name.trim_start_matches('/')).map(String::as_str)
    }
}

/// `css/app.css` -> `css/app.<hash>.css`
pub fn hashed_name(name: &str, contents: &[u8]) -> String {
    let hash = content_hash(contents);
    let (dir, file) = match name.rsplit_once('/') {
        Some((dir, file)) => (format!("{}/", dir), file),
        None => (String::new(), name),
    };
    match file.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}{}.{}.{}", dir, stem, hash, ext),
        _ => format!("{}{}.{}", dir, file, hash),
    }
}

fn content_hash(contents: &[u8]) -> String {
    Sha256::digest(contents)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<String>()[..HASH_LEN]
        .to_string()
}

fn should_compress(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => !SKIP_COMPRESSION.contains(&ext.to_ascii_lowercase().as_str()),
        None => true,
    }
}

/// A compressed copy is only worth serving when it saves at least 5%.
fn is_effective(original: usize, compressed: usize) -> bool {
    compressed * 20 < original * 19
}

fn gzip_bytes(contents: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(contents)?;
    encoder.finish()
}

fn brotli_bytes(contents: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut writer = CompressorWriter::new(Vec::new(), BROTLI_BUFFER, BROTLI_QUALITY, BROTLI_WINDOW);
    writer.write_all(contents)?;
    Ok(writer.into_inner())
}

/// Writes `<path>.gz` and `<path>.br` next to `path`. Returns how many were kept.
fn write_compressed(path: &Path, contents: &[u8]) -> Result<usize, StaticFilesError> {
    if !should_compress(path) {
        return Ok(0);
    }

    let mut written = 0;
    for (suffix, encoded) in [("gz", gzip_bytes(contents)), ("br", brotli_bytes(contents))] {
        let target = sibling(path, suffix);
        let encoded = encoded.map_err(|e| StaticFilesError::WriteFailed(target.clone(), e))?;
        if is_effective(contents.len(), encoded.len()) {
            write_file(&target, &encoded)?;
            written += 1;
        }
    }
    Ok(written)
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

fn walk(dir: &Path, relative: &Path, out: &mut Vec<PathBuf>) -> Result<(), StaticFilesError> {
    let entries = fs::read_dir(dir).map_err(|e| StaticFilesError::ReadFailed(dir.to_path_buf(), e))?;
    for entry in entries {
        let entry = entry.map_err(|e| StaticFilesError::ReadFailed(dir.to_path_buf(), e))?;
        let path = entry.path();
        let child = relative.join(entry.file_name());
        if path.is_dir() {
            walk(&path, &child, out)?;
        } else {
            out.push(child);
        }
    }
    Ok(())
}

fn url_path(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), StaticFilesError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| StaticFilesError::WriteFailed(parent.to_path_buf(), e))?;
    }
    fs::write(path, contents).map_err(|e| StaticFilesError::WriteFailed(path.to_path_buf(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("watchman-static-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(dir.join("assets/css")).unwrap();
        fs::write(dir.join("assets/css/app.css"), "body { color: red }").unwrap();
        fs::write(dir.join("assets/robots.txt"), "User-agent: *").unwrap();
        fs::write(dir.join("assets/app.js"), "console.log('watchman');\n".repeat(64)).unwrap();
        fs::write(dir.join("assets/logo.png"), "not really a png ".repeat(64)).unwrap();
        dir
    }

    #[test]
    fn test_hashed_name() {
        let name = hashed_name("css/app.css", b"body");
        assert!(name.starts_with("css/app."));
        assert!(name.ends_with(".css"));
        assert_eq!(name.len(), "css/app..css".len() + HASH_LEN);

        assert_eq!(hashed_name("LICENSE", b"x"), format!("LICENSE.{}", content_hash(b"x")));
        assert_eq!(hashed_name(".hidden", b"x"), format!(".hidden.{}", content_hash(b"x")));
    }

    #[test]
    fn test_hash_depends_on_contents() {
        assert_ne!(hashed_name("a.js", b"one"), hashed_name("a.js", b"two"));
        assert_eq!(hashed_name("a.js", b"one"), hashed_name("a.js", b"one"));
    }

    #[test]
    fn test_collect_local_filesystem() {
        let dir = scratch("local");
        let strategy = StaticAssetStrategy::for_mode(&dir, true);

        let report = collect(&dir.join("assets"), &strategy).unwrap();

        assert_eq!(report.copied, 4);
        assert_eq!(report.hashed, 0);
        assert_eq!(report.compressed, 0);
        assert_eq!(report.manifest, None);
        assert!(dir.join("static/css/app.css").is_file());
        assert!(!dir.join("static/app.js.gz").exists());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_collect_compressed_manifest() {
        let dir = scratch("manifest");
        let strategy = StaticAssetStrategy::for_mode(&dir, false);

        let report = collect(&dir.join("assets"), &strategy).unwrap();

        assert_eq!(report.copied, 4);
        assert_eq!(report.hashed, 4);
        let root = dir.join("staticfiles");
        let manifest = Manifest::load(&root).unwrap();
        assert_eq!(manifest.version, "1.1");
        assert_eq!(manifest.hash.len(), HASH_LEN);

        let hashed = manifest.lookup("/css/app.css").unwrap();
        assert_ne!(hashed, "css/app.css");
        assert_eq!(
            fs::read_to_string(root.join(hashed)).unwrap(),
            "body { color: red }"
        );
        assert!(root.join("css/app.css").is_file());
        assert!(manifest.lookup("robots.txt").is_some());

        // app.js and its hashed copy, each as .gz and .br
        assert_eq!(report.compressed, 4);
        let hashed_js = manifest.lookup("app.js").unwrap();
        for name in ["app.js", hashed_js] {
            let gz = fs::read(root.join(format!("{}.gz", name))).unwrap();
            let mut decoded = String::new();
            flate2::read::GzDecoder::new(&gz[..])
                .read_to_string(&mut decoded)
                .unwrap();
            assert_eq!(decoded, "console.log('watchman');\n".repeat(64));

            let br = fs::read(root.join(format!("{}.br", name))).unwrap();
            let mut decoded = Vec::new();
            brotli::Decompressor::new(&br[..], BROTLI_BUFFER)
                .read_to_end(&mut decoded)
                .unwrap();
            assert_eq!(decoded, "console.log('watchman');\n".repeat(64).into_bytes());
        }

        // too small to shrink, or already compressed
        assert!(!root.join("robots.txt.gz").exists());
        assert!(!root.join("logo.png.gz").exists());
        assert!(!root.join("logo.png.br").exists());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_should_compress() {
        assert!(should_compress(Path::new("css/app.css")));
        assert!(should_compress(Path::new("LICENSE")));
        assert!(!should_compress(Path::new("img/logo.PNG")));
        assert!(!should_compress(Path::new("fonts/a.woff2")));
        assert!(is_effective(100, 94));
        assert!(!is_effective(100, 96));
    }

    #[test]
    fn test_missing_source() {
        let strategy = StaticAssetStrategy::for_mode(Path::new("/nonexistent"), true);
        let err = collect(Path::new("/nonexistent/assets"), &strategy).unwrap_err();
        assert!(matches!(err, StaticFilesError::SourceMissing(_)));
    }
}
