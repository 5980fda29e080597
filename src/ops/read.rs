use std::fs::File;

use super::FileOps;
use crate::error::MediaError;

impl FileOps {
    /// Read a whole file.
    pub fn read_file(&self, name: &str, folder: &str) -> Result<Vec<u8>, MediaError> {
        let path = self.file_path(folder, name)?;
        std::fs::read(&path).map_err(|e| MediaError::Read {
            path,
            message: e.to_string(),
        })
    }

    /// Open a file for streaming reads.
    pub fn read_stream(&self, name: &str, folder: &str) -> Result<File, MediaError> {
        let path = self.file_path(folder, name)?;
        let file = File::open(&path).map_err(|e| MediaError::Read {
            path: path.clone(),
            message: e.to_string(),
        })?;
        match file.metadata() {
            Ok(meta) if meta.is_file() => Ok(file),
            Ok(_) => Err(MediaError::Read {
                path,
                message: "Is a directory".to_string(),
            }),
            Err(e) => Err(MediaError::Read {
                path,
                message: e.to_string(),
            }),
        }
    }

    /// Width and height of an image, read from its header.
    pub fn read_image_dimensions(&self, name: &str, folder: &str) -> Result<(u32, u32), MediaError> {
        let path = self.file_path(folder, name)?;
        image::image_dimensions(&path).map_err(|e| MediaError::Read {
            path,
            message: e.to_string(),
        })
    }
}
