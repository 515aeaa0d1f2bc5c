//! Persisting fetched pages to disk

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use super::response::Response;
use crate::error::Result;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S-%3f";

/// Writes response bodies into a timestamped session directory
#[derive(Debug, Clone)]
pub struct ResponseSaver {
    base_dir: PathBuf,
    session_dir: PathBuf,
    page_count: usize,
}

impl ResponseSaver {
    /// Create a saver with a fresh `yyyy-mm-dd_HH-MM-SS-mmm` session directory under `base_dir`
    pub async fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let session_dir = create_session_dir(&base_dir).await?;
        info!("Response session directory: {}", session_dir.display());

        Ok(Self {
            base_dir,
            session_dir,
            page_count: 0,
        })
    }

    /// Save a response body as `page_NNN_<timestamp>.<ext>`
    pub async fn save(&mut self, response: &Response) -> Result<PathBuf> {
        self.page_count += 1;
        let now: DateTime<Local> = Local::now();

        let filename = format!(
            "page_{:03}_{}.{}",
            self.page_count,
            now.format(TIMESTAMP_FORMAT),
            extension_for(response.content_type())
        );
        let file_path = self.session_dir.join(&filename);
        fs::write(&file_path, &response.body).await?;

        debug!(
            "Saved {} ({} bytes, status {})",
            file_path.display(),
            response.body.len(),
            response.status
        );

        Ok(file_path)
    }

    /// Directory pages of the current session go to
    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    /// Directory session directories are created under
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Pages saved in the current session
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Restart page numbering within the current session
    pub fn reset_page_count(&mut self) {
        self.page_count = 0;
    }

    /// Switch to a new session directory and restart numbering
    pub async fn new_session(&mut self) -> Result<()> {
        self.session_dir = create_session_dir(&self.base_dir).await?;
        self.page_count = 0;
        info!("New response session directory: {}", self.session_dir.display());
        Ok(())
    }
}

async fn create_session_dir(base_dir: &Path) -> Result<PathBuf> {
    let session_name = Local::now().format(TIMESTAMP_FORMAT).to_string();
    let session_dir = base_dir.join(session_name);
    fs::create_dir_all(&session_dir).await?;
    Ok(session_dir)
}

/// File extension for a media type
pub fn extension_for(content_type: Option<&str>) -> &'static str {
    let Some(ct) = content_type.map(str::to_ascii_lowercase) else {
        return "bin";
    };
    if ct.contains("html") {
        "html"
    } else if ct.contains("json") {
        "json"
    } else if ct.contains("xml") {
        "xml"
    } else if ct.starts_with("text/") {
        "txt"
    } else {
        "bin"
    }
}

#[cfg(test)]
mod tests {
    use super::super::response::sample;
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_extension_for() {
        assert_eq!(extension_for(Some("text/html")), "html");
        assert_eq!(extension_for(Some("application/xhtml+xml")), "html");
        assert_eq!(extension_for(Some("application/json")), "json");
        assert_eq!(extension_for(Some("application/rss+xml")), "xml");
        assert_eq!(extension_for(Some("text/plain")), "txt");
        assert_eq!(extension_for(Some("image/png")), "bin");
        assert_eq!(extension_for(None), "bin");
    }

    #[tokio::test]
    async fn test_saver_creation() {
        let temp_dir = tempdir().unwrap();
        let saver = ResponseSaver::new(temp_dir.path()).await.unwrap();

        assert!(saver.session_dir().exists());
        assert!(saver.session_dir().starts_with(temp_dir.path()));
        assert_eq!(saver.base_dir(), temp_dir.path());
        assert_eq!(saver.page_count(), 0);
    }

    #[tokio::test]
    async fn test_save_pages() {
        let temp_dir = tempdir().unwrap();
        let mut saver = ResponseSaver::new(temp_dir.path()).await.unwrap();

        let first = saver.save(&sample("text/html", "<p>hi</p>")).await.unwrap();
        let second = saver.save(&sample("application/json", "{}")).await.unwrap();

        let first_name = first.file_name().unwrap().to_string_lossy().into_owned();
        let second_name = second.file_name().unwrap().to_string_lossy().into_owned();
        assert!(first_name.starts_with("page_001_"));
        assert!(first_name.ends_with(".html"));
        assert!(second_name.starts_with("page_002_"));
        assert!(second_name.ends_with(".json"));
        assert_eq!(std::fs::read_to_string(&first).unwrap(), "<p>hi</p>");
        assert_eq!(saver.page_count(), 2);

        saver.reset_page_count();
        assert_eq!(saver.page_count(), 0);
    }

    #[tokio::test]
    async fn test_new_session() {
        let temp_dir = tempdir().unwrap();
        let mut saver = ResponseSaver::new(temp_dir.path()).await.unwrap();
        saver.save(&sample("text/plain", "x")).await.unwrap();
        let old_session = saver.session_dir().to_path_buf();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        saver.new_session().await.unwrap();

        assert_ne!(saver.session_dir(), old_session);
        assert!(saver.session_dir().exists());
        assert_eq!(saver.page_count(), 0);
    }
}
