use async_trait::async_trait;
use serde_json::Value;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, error};

use crate::{
    application::ports::DocumentRepository,
    domain::{
        document::DocumentKind,
        errors::{DomainError, DomainResult},
    },
};

/// Documentos JSON en el directorio público que sirve el panel.
#[derive(Debug, Clone)]
pub struct FsDocumentRepository {
    root: PathBuf,
}

impl FsDocumentRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Ruta final de `filename` dentro del directorio, o `InvalidInput` si el
    /// nombre intenta salir de él.
    pub fn resolve(&self, filename: &str) -> DomainResult<PathBuf> {
        validate_filename(filename)?;
        Ok(self.root.join(filename))
    }
}

/// Un nombre válido es un único componente normal terminado en `.json`.
pub fn validate_filename(filename: &str) -> DomainResult<()> {
    let invalid = || DomainError::InvalidInput("Invalid filename".into());
    if filename.trim().is_empty() || !filename.ends_with(".json") || filename.contains('\\') {
        return Err(invalid());
    }
    let mut components = Path::new(filename).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(invalid()),
    }
}

#[async_trait]
impl DocumentRepository for FsDocumentRepository {
    async fn load(&self, kind: DocumentKind) -> DomainResult<Value> {
        let path = self.root.join(kind.filename());
        let text = tokio::fs::read_to_string(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => DomainError::NotFound(path.display().to_string()),
            _ => DomainError::OperationFailed(format!("{}: {e}", path.display())),
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn save(&self, filename: &str, data: &Value) -> DomainResult<()> {
        let path = self.resolve(filename)?;
        let text = serde_json::to_string_pretty(data)
            .map_err(|e| DomainError::OperationFailed(e.to_string()))?;

        let write = async {
            tokio::fs::create_dir_all(&self.root).await?;
            tokio::fs::write(&path, text).await
        };
        write.await.map_err(|e| {
            error!("Error escribiendo {}: {e}", path.display());
            DomainError::OperationFailed("Failed to save file".into())
        })?;
        debug!("Escrito {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filename_rules() {
        for ok in ["config.json", "vehicle.json", "a.b.json"] {
            assert!(validate_filename(ok).is_ok(), "{ok}");
        }
        for bad in [
            "",
            "   ",
            "notes.txt",
            "../../etc/passwd",
            "../config.json",
            "sub/config.json",
            "/etc/config.json",
            "..\\config.json",
            "..",
            "./config.json",
        ] {
            assert!(validate_filename(bad).is_err(), "{bad}");
        }
    }

    #[tokio::test]
    async fn save_writes_pretty_json_and_load_reads_it_back() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FsDocumentRepository::new(dir.path().join("public"));
        let data = json!({"mqtt": {"host": "broker", "port": "1883"}, "frame": 10});

        repo.save("config.json", &data).await.unwrap();

        let text = std::fs::read_to_string(dir.path().join("public/config.json")).unwrap();
        assert!(text.starts_with("{\n  \"mqtt\": {\n    \"host\""));
        assert_eq!(repo.load(DocumentKind::Config).await.unwrap(), data);
    }

    #[tokio::test]
    async fn traversal_never_touches_disk() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FsDocumentRepository::new(dir.path().join("public"));
        let err = repo.save("../escape.json", &json!({})).await.unwrap_err();
        assert_eq!(err, DomainError::InvalidInput("Invalid filename".into()));
        assert!(!dir.path().join("escape.json").exists());
    }

    #[tokio::test]
    async fn missing_document_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FsDocumentRepository::new(dir.path());
        assert!(matches!(repo.load(DocumentKind::Vehicle).await, Err(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn malformed_document_is_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("vehicle.json"), "{nope").unwrap();
        let repo = FsDocumentRepository::new(dir.path());
        assert!(matches!(repo.load(DocumentKind::Vehicle).await, Err(DomainError::InvalidInput(_))));
    }
}
