use std::path::PathBuf;

use crate::error::ContentError;
use crate::storage::protocol::validate_key;

/// Local-filesystem content service: blobs live at
/// `basePath/videoId/filename`. Used by single-machine deployments where the
/// clustered plane is overkill.
pub struct FsContentService {
    base_path: PathBuf,
}

impl FsContentService {
    pub fn new(base_path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let base_path = base_path.into();
        std::fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    pub async fn read(&self, video_id: &str, filename: &str) -> Result<Vec<u8>, ContentError> {
        validate_key(video_id, filename)?;
        let path = self.base_path.join(video_id).join(filename);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ContentError::NotFound(format!("{video_id}/{filename}")))
            }
            Err(e) => Err(ContentError::Io(e)),
        }
    }

    pub async fn write(
        &self,
        video_id: &str,
        filename: &str,
        data: &[u8],
    ) -> Result<(), ContentError> {
        validate_key(video_id, filename)?;
        let dir = self.base_path.join(video_id);
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(filename);
        tokio::fs::write(&path, data).await?;
        Ok(())
    }
}
