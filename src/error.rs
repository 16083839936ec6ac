use thiserror::Error;

/// 앱을 띄우거나 결과를 저장할 때 생기는 오류. 트레이싱 자체는 실패하지 않음
#[derive(Debug, Error)]
pub enum EmberError {
    #[error("Failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("Failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("No GPU adapter compatible with the window surface")]
    NoAdapter,

    #[error("Surface reports no supported texture formats")]
    UnsupportedSurface,

    #[error("Failed to request GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("Failed to save image: {0}")]
    Image(#[from] image::ImageError),

    #[error("Framebuffer does not match {width}x{height}")]
    FramebufferSize { width: u32, height: u32 },
}
