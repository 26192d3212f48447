//! Saving text into folders under a fixed base directory.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Writes text files into folders under a base directory, normally the
/// user's desktop.
///
/// Folder and file names are joined onto the base directory as given; they
/// are not checked for `..` or absolute components.
#[derive(Debug, Clone)]
pub struct FileWriter {
    base_dir: PathBuf,
}

impl FileWriter {
    /// Creates a writer rooted at `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Creates a writer rooted at the user's desktop, if a home directory
    /// can be resolved.
    pub fn desktop() -> Option<Self> {
        dirs::desktop_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join("Desktop")))
            .map(Self::new)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Writes `content` to `base_dir/folder_name/filename`, creating the
    /// folder when missing and overwriting any existing file.
    pub fn try_save(
        &self,
        content: &str,
        folder_name: &str,
        filename: &str,
    ) -> std::io::Result<PathBuf> {
        let folder = self.base_dir.join(folder_name);
        std::fs::create_dir_all(&folder)?;

        let full_path = std::path::absolute(folder.join(filename))?;
        std::fs::write(&full_path, content)?;
        debug!(path = %full_path.display(), bytes = content.len(), "Saved file");
        Ok(full_path)
    }

    /// Writes the file and renders the outcome as a confirmation or error
    /// message.
    pub fn save(&self, content: &str, folder_name: &str, filename: &str) -> String {
        self.save_report(content, folder_name, filename)
            .unwrap_or_else(|message| message)
    }

    /// Like [`FileWriter::save`], with failures kept apart.
    pub fn save_report(
        &self,
        content: &str,
        folder_name: &str,
        filename: &str,
    ) -> Result<String, String> {
        match self.try_save(content, folder_name, filename) {
            Ok(path) => Ok(format!(
                "Success: file saved in folder [{}], path: {}",
                folder_name,
                path.display()
            )),
            Err(err) => {
                warn!(folder = folder_name, filename, error = %err, "Failed to save file");
                Err(format!("Failed to save file: {}", err))
            }
        }
    }
}
