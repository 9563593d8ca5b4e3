//! Live-artifact snapshots.
//!
//! A snapshot serializes the artifact object itself, keyed by the backend
//! that produced it, so a later session can reconstruct it and keep
//! editing (retitle, republish). Restoration is strict: a missing backend
//! or a corrupted payload raises a named error rather than returning a
//! degraded object.

use figrev_model::{FigrevError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::backend::{Artifact, BackendRegistry};

/// A serialized artifact plus the backend needed to revive it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotBlob {
    /// Backend that produced the payload; restoration requires it.
    pub backend: String,
    /// Hex SHA-256 of the payload, checked on restore.
    pub digest: String,
    pub payload: Vec<u8>,
}

impl SnapshotBlob {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| FigrevError::Serde(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| FigrevError::snapshot_restore(format!("malformed blob: {e}")))
    }
}

/// Serialize a live artifact through the backend that owns it.
pub fn snapshot(registry: &BackendRegistry, artifact: &dyn Artifact) -> Result<SnapshotBlob> {
    let backend = registry.require(artifact)?;
    let payload = backend.snapshot(artifact)?;
    Ok(SnapshotBlob {
        backend: backend.name().to_string(),
        digest: hex::encode(Sha256::digest(&payload)),
        payload,
    })
}

/// Reconstruct a live artifact from a snapshot.
pub fn restore(registry: &BackendRegistry, blob: &SnapshotBlob) -> Result<Box<dyn Artifact>> {
    let backend = registry.by_name(&blob.backend).ok_or_else(|| {
        FigrevError::snapshot_restore(format!(
            "backend '{}' is not available in this environment",
            blob.backend
        ))
    })?;
    let digest = hex::encode(Sha256::digest(&blob.payload));
    if digest != blob.digest {
        return Err(FigrevError::snapshot_restore(format!(
            "payload digest mismatch for backend '{}'",
            blob.backend
        )));
    }
    backend.restore(&blob.payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::ChartArtifact;
    use crate::backend::build_default_registry;

    #[test]
    fn snapshot_survives_a_round_trip() {
        let registry = build_default_registry();
        let chart = ChartArtifact::figure(vec![(1.0, 2.0), (3.0, 4.0)]).with_title("Doses");

        let blob = snapshot(&registry, &chart).expect("snapshot");
        assert_eq!(blob.backend, "chart");

        let bytes = blob.to_bytes().expect("blob bytes");
        let parsed = SnapshotBlob::from_bytes(&bytes).expect("blob parse");
        let revived = restore(&registry, &parsed).expect("restore");
        let revived = revived
            .as_any()
            .downcast_ref::<ChartArtifact>()
            .expect("chart back");
        assert_eq!(revived.title.as_deref(), Some("Doses"));
    }

    #[test]
    fn missing_backend_is_a_named_failure() {
        let registry = build_default_registry();
        let chart = ChartArtifact::figure(vec![(0.0, 0.0)]);
        let mut blob = snapshot(&registry, &chart).expect("snapshot");
        blob.backend = "retired".to_string();

        let err = restore(&registry, &blob).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("snapshot restore failure"));
        assert!(text.contains("retired"));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let registry = build_default_registry();
        let chart = ChartArtifact::figure(vec![(0.0, 0.0)]);
        let mut blob = snapshot(&registry, &chart).expect("snapshot");
        blob.payload.push(b'!');

        let err = restore(&registry, &blob).unwrap_err();
        assert!(err.to_string().contains("digest mismatch"));
    }
}
