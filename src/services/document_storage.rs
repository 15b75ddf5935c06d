//! Almacenamiento de documentos adjuntos
//!
//! Los documentos llegan en base64 dentro del JSON y se guardan en
//! `{root}/registration-requests/{kind}_{uuid}.{ext}`.

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use uuid::Uuid;

use super::validation_engine::{DocumentKind, Presence};
use crate::utils::errors::{AppError, AppResult};

/// Tamaño máximo de un documento decodificado
pub const MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;

const SUBDIR: &str = "registration-requests";

/// Documento ya decodificado, pendiente de escribir
#[derive(Debug, Clone)]
pub struct DecodedDocument {
    pub kind: DocumentKind,
    pub extension: String,
    pub bytes: Vec<u8>,
}

/// Decodifica un adjunto opcional. Devuelve la presencia para el motor de
/// reglas y el contenido si es válido.
pub fn decode_document(
    kind: DocumentKind,
    file_name: Option<&str>,
    content_base64: Option<&str>,
) -> (Presence, Option<DecodedDocument>) {
    let Some(raw) = content_base64.map(str::trim).filter(|c| !c.is_empty()) else {
        return (Presence::Missing, None);
    };

    // admite data URLs: "data:application/pdf;base64,...."
    let payload = match raw.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => raw,
    };

    match STANDARD.decode(payload) {
        Ok(bytes) if !bytes.is_empty() && bytes.len() <= MAX_DOCUMENT_BYTES => (
            Presence::Present,
            Some(DecodedDocument {
                kind,
                extension: extension_of(file_name),
                bytes,
            }),
        ),
        Ok(bytes) => {
            log::warn!("⚠️ {} document rejected ({} bytes)", kind.as_str(), bytes.len());
            (Presence::Invalid, None)
        }
        Err(e) => {
            log::warn!("⚠️ {} document is not valid base64: {}", kind.as_str(), e);
            (Presence::Invalid, None)
        }
    }
}

fn extension_of(file_name: Option<&str>) -> String {
    file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| "bin".to_string())
}

#[derive(Debug, Clone)]
pub struct DocumentStorage {
    root: PathBuf,
}

impl DocumentStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Escribe los documentos; si uno falla se borran los ya escritos
    pub async fn save_all(&self, documents: &[DecodedDocument]) -> AppResult<Vec<(DocumentKind, String)>> {
        let dir = self.root.join(SUBDIR);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| AppError::Internal(format!("Cannot create {}: {}", dir.display(), e)))?;

        let mut saved: Vec<(DocumentKind, String)> = Vec::with_capacity(documents.len());
        for document in documents {
            let path = dir.join(format!(
                "{}_{}.{}",
                document.kind.as_str(),
                Uuid::new_v4(),
                document.extension
            ));
            if let Err(e) = tokio::fs::write(&path, &document.bytes).await {
                let written: Vec<String> = saved.into_iter().map(|(_, p)| p).collect();
                self.remove_all(&written).await;
                return Err(AppError::Internal(format!("Cannot write {}: {}", path.display(), e)));
            }

            let path = path.to_string_lossy().into_owned();
            log::info!(
                "📎 Stored {} document {} ({} bytes, md5 {:x})",
                document.kind.as_str(),
                path,
                document.bytes.len(),
                md5::compute(&document.bytes)
            );
            saved.push((document.kind, path));
        }
        Ok(saved)
    }

    /// Borra archivos escritos para una operación que no llegó a confirmarse
    pub async fn remove_all(&self, paths: &[String]) {
        for path in paths {
            if let Err(e) = tokio::fs::remove_file(path).await {
                log::warn!("⚠️ Could not remove orphan document {}: {}", path, e);
            }
        }
    }
}
