use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::engine::GeneratedPage;

pub const MANIFEST_FILE: &str = "url_id_list.txt";

/// Writes generated pages under an output directory.
///
/// Layout: `html/{id}.html`, `link/{id}.txt`, `image/{id}.png` and a
/// tab-separated manifest at the root.
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    base_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(base_dir: &Path) -> Result<Self> {
        let base_dir = base_dir.to_path_buf();
        for sub in ["html", "image", "link"] {
            let dir = base_dir.join(sub);
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create directory: {:?}", dir))?;
        }

        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn html_path(&self, site_id: &str) -> PathBuf {
        self.base_dir.join("html").join(format!("{}.html", site_id))
    }

    pub fn link_path(&self, site_id: &str) -> PathBuf {
        self.base_dir.join("link").join(format!("{}.txt", site_id))
    }

    pub fn image_path(&self, site_id: &str) -> PathBuf {
        self.base_dir.join("image").join(format!("{}.png", site_id))
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.base_dir.join(MANIFEST_FILE)
    }

    /// Write every artifact of `page` and record it in the manifest.
    /// Returns the path of the HTML document.
    pub fn save(&self, page: &GeneratedPage) -> Result<PathBuf> {
        let html_path = self.html_path(&page.site_id);
        fs::write(&html_path, page.html.as_bytes())
            .with_context(|| format!("Failed to write file: {:?}", html_path))?;

        let link_path = self.link_path(&page.site_id);
        fs::write(&link_path, page.links.join("\n"))
            .with_context(|| format!("Failed to write file: {:?}", link_path))?;

        if let Some(png) = &page.screenshot {
            let image_path = self.image_path(&page.site_id);
            fs::write(&image_path, png)
                .with_context(|| format!("Failed to write file: {:?}", image_path))?;
        }

        self.record(&page.site_id, &page.base_url)?;
        Ok(html_path)
    }

    fn record(&self, site_id: &str, base_url: &str) -> Result<()> {
        let manifest = self.manifest_path();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&manifest)
            .with_context(|| format!("Failed to open manifest: {:?}", manifest))?;

        let stamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        writeln!(file, "{}\t{}\t{}", site_id, base_url, stamp)
            .with_context(|| format!("Failed to append to manifest: {:?}", manifest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn page(screenshot: Option<Vec<u8>>) -> GeneratedPage {
        GeneratedPage {
            site_id: "abc123".to_string(),
            base_url: "https://example.com/".to_string(),
            html: "<html><body>hi</body></html>".to_string(),
            links: vec![
                "https://example.com/".to_string(),
                "https://example.com/about".to_string(),
                "https://other.org/".to_string(),
            ],
            screenshot,
        }
    }

    #[test]
    fn test_creates_layout() {
        let temp_dir = tempdir().unwrap();
        let store = ArtifactStore::new(temp_dir.path()).unwrap();

        for sub in ["html", "image", "link"] {
            assert!(store.base_dir().join(sub).is_dir());
        }
    }

    #[test]
    fn test_save_writes_all_artifacts() {
        let temp_dir = tempdir().unwrap();
        let store = ArtifactStore::new(temp_dir.path()).unwrap();

        let html_path = store.save(&page(Some(vec![0x89, b'P', b'N', b'G']))).unwrap();
        assert_eq!(html_path, store.html_path("abc123"));
        assert_eq!(
            fs::read_to_string(&html_path).unwrap(),
            "<html><body>hi</body></html>"
        );
        assert_eq!(
            fs::read_to_string(store.link_path("abc123")).unwrap(),
            "https://example.com/\nhttps://example.com/about\nhttps://other.org/"
        );
        assert_eq!(
            fs::read(store.image_path("abc123")).unwrap(),
            [0x89, b'P', b'N', b'G']
        );
    }

    #[test]
    fn test_no_screenshot_no_image() {
        let temp_dir = tempdir().unwrap();
        let store = ArtifactStore::new(temp_dir.path()).unwrap();

        store.save(&page(None)).unwrap();
        assert!(!store.image_path("abc123").exists());
    }

    #[test]
    fn test_manifest_is_appended() {
        let temp_dir = tempdir().unwrap();
        let store = ArtifactStore::new(temp_dir.path()).unwrap();

        store.save(&page(None)).unwrap();
        store.save(&page(None)).unwrap();

        let manifest = fs::read_to_string(store.manifest_path()).unwrap();
        let lines: Vec<&str> = manifest.lines().collect();
        assert_eq!(lines.len(), 2);

        let fields: Vec<&str> = lines[0].split('\t').collect();
        assert_eq!(fields[0], "abc123");
        assert_eq!(fields[1], "https://example.com/");
        assert_eq!(fields[2].len(), "2024-01-01 00:00:00".len());
    }
}
