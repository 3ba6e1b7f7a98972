// error_handling.rs - Error types and texture readback helpers

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RendererError {
    #[error("WebGPU adapter creation failed")]
    AdapterCreationFailed,

    #[error("WebGPU device creation failed: {0}")]
    DeviceCreationFailed(#[from] wgpu::RequestDeviceError),

    #[error("Buffer operation failed: {message}")]
    BufferError { message: String },

    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Image processing failed: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("glTF import failed: {0}")]
    ModelImport(#[from] gltf::Error),

    #[error("Invalid model data: {reason}")]
    InvalidModel { reason: String },

    #[error("Renderer used before prepare()")]
    NotPrepared,

    #[error("Renderer already disposed")]
    Disposed,
}

pub type Result<T> = std::result::Result<T, RendererError>;

/// Row pitch for a texture-to-buffer copy, rounded up to wgpu's copy alignment
pub fn padded_bytes_per_row(width: u32, bytes_per_pixel: u32) -> u32 {
    (width * bytes_per_pixel).next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
}

/// Strip the copy padding from each row of a mapped readback buffer
pub fn unpad_rows(padded: &[u8], width: u32, height: u32, bytes_per_pixel: u32) -> Vec<u8> {
    let row = (width * bytes_per_pixel) as usize;
    let pitch = padded_bytes_per_row(width, bytes_per_pixel) as usize;
    if row == 0 {
        return Vec::new();
    }
    padded
        .chunks(pitch)
        .take(height as usize)
        .flat_map(|line| &line[..row.min(line.len())])
        .copied()
        .collect()
}
