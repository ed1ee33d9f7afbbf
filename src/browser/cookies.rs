use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One persisted cookie. The records are opaque to the rest of the system;
/// they travel from the driver to disk and back without inspection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CookieRecord {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub expires: Option<f64>,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CookieFile {
    saved_at: chrono::DateTime<chrono::Utc>,
    cookies: Vec<CookieRecord>,
}

/// Cookie persistence across attempts and process runs. Absence or corruption
/// of the file is never an error: the login flow tolerates starting cold.
#[derive(Debug, Clone)]
pub struct CookieStore {
    path: PathBuf,
}

impl CookieStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Option<Vec<CookieRecord>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) => {
                debug!("No cookie file at {}: {}", self.path.display(), e);
                return None;
            }
        };
        match serde_json::from_str::<CookieFile>(&raw) {
            Ok(file) => {
                info!(
                    "Loaded {} cookies saved at {}",
                    file.cookies.len(),
                    file.saved_at
                );
                Some(file.cookies)
            }
            Err(e) => {
                debug!("Ignoring corrupt cookie file: {}", e);
                None
            }
        }
    }

    /// Overwrite atomically: write a sibling temp file, then rename over.
    pub fn save(&self, cookies: &[CookieRecord]) -> std::io::Result<()> {
        let file = CookieFile {
            saved_at: chrono::Utc::now(),
            cookies: cookies.to_vec(),
        };
        let raw = serde_json::to_string_pretty(&file)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, raw)?;
        std::fs::rename(&tmp, &self.path)?;
        info!("Saved {} cookies to {}", cookies.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_cookie() -> CookieRecord {
        CookieRecord {
            name: "session".to_string(),
            value: "abc123".to_string(),
            domain: ".example.com".to_string(),
            path: "/".to_string(),
            expires: Some(1_900_000_000.0),
            http_only: true,
            secure: true,
            same_site: Some("Lax".to_string()),
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = CookieStore::new(dir.path().join("cookies.json"));
        store.save(&[sample_cookie()]).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded, vec![sample_cookie()]);
    }

    #[test]
    fn missing_file_is_silent_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = CookieStore::new(dir.path().join("absent.json"));
        assert!(store.load().is_none());
    }

    #[test]
    fn corrupt_file_is_silent_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        std::fs::write(&path, "not json {{{").unwrap();
        let store = CookieStore::new(path);
        assert!(store.load().is_none());
    }

    #[test]
    fn save_overwrites_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let store = CookieStore::new(dir.path().join("cookies.json"));
        store.save(&[sample_cookie()]).unwrap();
        store.save(&[]).unwrap();
        assert_eq!(store.load().unwrap().len(), 0);
    }
}
