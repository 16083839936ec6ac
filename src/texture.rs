use wgpu::{
    Device, Extent3d, ImageCopyTexture, ImageDataLayout, Origin3d, Queue, Texture, TextureAspect,
    TextureDescriptor, TextureDimension, TextureFormat, TextureUsages, TextureView,
    TextureViewDescriptor,
};
use winit::dpi::PhysicalSize;

/// CPU에서 그린 프레임을 egui에 띄우기 위한 GPU 텍스쳐. 샘플링 방식은 egui 쪽에 등록할 때 정함
pub struct Image {
    pub gpu_texture: Texture,
    pub view: TextureView,
    pub name: String,
}

impl Image {
    pub fn new(device: &Device, width: u32, height: u32, label: &str) -> Image {
        // 크기가 0인 텍스쳐는 만들 수 없음
        let width = width.max(1);
        let height = height.max(1);

        let gpu_texture = device.create_texture(&TextureDescriptor {
            label: Some(label),
            size: Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            // egui_wgpu의 native texture는 sRGB 포맷이어야 함
            format: TextureFormat::Rgba8UnormSrgb,
            // Texture Binding: 쉐이더에서 쓸 예정
            // Copy destination: CPU에서 GPU로 데이터가 복사될 예정
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let view = gpu_texture.create_view(&TextureViewDescriptor {
            label: Some(&format!("{} view", label)),
            ..Default::default()
        });

        Self {
            gpu_texture,
            view,
            name: label.to_string(),
        }
    }

    /// rgba는 한 픽셀에 4바이트, 위쪽 줄부터
    pub fn load_image(&mut self, queue: &Queue, rgba: &[u8]) {
        let pixel_count = {
            let size = self.gpu_texture.size();
            size.width * size.height
        } as usize;
        assert_eq!(pixel_count, rgba.len() / 4, "texture size and pixel data differ");

        queue.write_texture(
            ImageCopyTexture {
                texture: &self.gpu_texture,
                mip_level: 0,
                origin: Origin3d::ZERO,
                aspect: TextureAspect::All,
            },
            rgba,
            ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * self.gpu_texture.width()),
                rows_per_image: Some(self.gpu_texture.height()),
            },
            self.gpu_texture.size(),
        )
    }

    /// 크기가 바뀌었으면 true. 이때 view가 새로 만들어지니 egui 쪽 등록도 갱신해야 함
    pub fn resize(&mut self, device: &Device, new_size: PhysicalSize<u32>) -> bool {
        if self.size() == new_size {
            return false;
        }

        let new = Self::new(device, new_size.width, new_size.height, &self.name);
        self.view = new.view;
        self.gpu_texture = new.gpu_texture;

        true
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        PhysicalSize::new(self.gpu_texture.width(), self.gpu_texture.height())
    }
}
