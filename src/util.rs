use std::ops::Range;

use nalgebra::{Vector3, Vector4};
use rand::Rng;

/// 각 성분을 range 안에서 균일하게 뽑은 벡터
pub fn random_vec<R: Rng + ?Sized>(rng: &mut R, range: Range<f32>) -> Vector3<f32> {
    Vector3::new(
        rng.gen_range(range.clone()),
        rng.gen_range(range.clone()),
        rng.gen_range(range),
    )
}

/// 선형 색상을 R, G, B, A 순서(최상위 바이트부터)의 u32로 압축.
///
/// 반올림하지 않고 버림. [0, 1] 밖의 값은 `as u8` 변환에서 0 또는 255로 포화됨.
pub fn vec4_to_rgba(color: &Vector4<f32>) -> u32 {
    let [r, g, b, a] = [color.x, color.y, color.z, color.w].map(|c| (c * 255.0) as u8 as u32);
    (r << 24) | (g << 16) | (b << 8) | a
}

pub fn rgba_to_vec4(rgba: u32) -> Vector4<f32> {
    let [r, g, b, a] = rgba.to_be_bytes().map(|c| c as f32 / 255.0);
    Vector4::new(r, g, b, a)
}

/// 프레임버퍼는 아래 줄부터 쌓여 있으니 위아래를 뒤집고, 픽셀마다 RGBA 바이트 순서로 풀어줌
pub fn to_display_bytes(framebuffer: &[u32], width: usize) -> Vec<[u8; 4]> {
    if width == 0 {
        return Vec::new();
    }

    framebuffer
        .chunks_exact(width)
        .rev()
        .flat_map(|row| row.iter().map(|pixel| pixel.to_be_bytes()))
        .collect()
}

#[cfg(not(target_arch = "wasm32"))]
pub fn save_png<P: AsRef<std::path::Path>>(
    path: P,
    framebuffer: &[u32],
    width: u32,
    height: u32,
) -> Result<(), crate::EmberError> {
    let bytes = to_display_bytes(framebuffer, width as usize);
    let image = image::RgbaImage::from_raw(width, height, bytemuck::cast_slice(&bytes).to_vec())
        .ok_or(crate::EmberError::FramebufferSize { width, height })?;

    image.save_with_format(path, image::ImageFormat::Png)?;
    Ok(())
}
