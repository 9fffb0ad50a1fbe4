use crate::core::Storage;
use crate::utils::error::Result;
use std::fs;
use std::path::Path;

/// Filesystem storage for CLI runs. Reads resolve the path as given, so
/// the input panel can live anywhere; writes land under the output base
/// path and go through a temp file plus rename, so a crashed run never
/// leaves a half-written artifact.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: String,
}

impl LocalStorage {
    pub fn new(base_path: String) -> Self {
        Self { base_path }
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let data = fs::read(path)?;
        Ok(data)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = Path::new(&self.base_path).join(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut tmp_name = full_path.clone().into_os_string();
        tmp_name.push(".tmp");
        let tmp_path = std::path::PathBuf::from(tmp_name);

        fs::write(&tmp_path, data)?;
        fs::rename(&tmp_path, &full_path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_lands_under_base_path_without_tmp_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().to_string_lossy().to_string());

        tokio_test::block_on(storage.write_file("tables/did_table.tex", b"\\begin{table}"))
            .unwrap();

        let written = dir.path().join("tables/did_table.tex");
        assert_eq!(fs::read(&written).unwrap(), b"\\begin{table}");
        assert!(!dir.path().join("tables/did_table.tex.tmp").exists());
    }

    #[test]
    fn test_write_replaces_existing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().to_string_lossy().to_string());

        tokio_test::block_on(storage.write_file("analysis_summary.json", b"{}")).unwrap();
        tokio_test::block_on(storage.write_file("analysis_summary.json", b"{\"rows\":8}"))
            .unwrap();

        let written = dir.path().join("analysis_summary.json");
        assert_eq!(fs::read(&written).unwrap(), b"{\"rows\":8}");
    }

    #[test]
    fn test_read_resolves_the_path_as_given() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("panel.csv");
        fs::write(&input, b"date,revenue").unwrap();

        // Base path deliberately points elsewhere.
        let storage = LocalStorage::new("/nonexistent".to_string());
        let data =
            tokio_test::block_on(storage.read_file(&input.to_string_lossy())).unwrap();

        assert_eq!(data, b"date,revenue");
    }
}
