use nalgebra::{Point3, Vector3};

use crate::ember::ray::Ray;

/// 핀홀 카메라의 광학 설정
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lens {
    pub focal_length: f32,
    pub viewport_height: f32,
}

impl Default for Lens {
    fn default() -> Self {
        Self {
            focal_length: 1.0,
            viewport_height: 1.0,
        }
    }
}

/// 픽셀 좌표를 월드 좌표의 레이로 바꿔줌.
///
/// 카메라는 -Z 방향을 바라보고 회전은 없음. V축이 +Y라서 y = 0 인 줄이 화면 아래쪽임.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    center: Point3<f32>,
    pixel00: Point3<f32>,
    pixel_delta_u: Vector3<f32>,
    pixel_delta_v: Vector3<f32>,
    width: u32,
    height: u32,
}

impl Viewport {
    pub fn new(center: Point3<f32>, lens: &Lens, width: u32, height: u32) -> Self {
        let viewport_height = lens.viewport_height;
        let viewport_width = viewport_height * (width as f32 / height as f32);

        let viewport_u = Vector3::new(viewport_width, 0.0, 0.0);
        let viewport_v = Vector3::new(0.0, viewport_height, 0.0);

        let pixel_delta_u = viewport_u / width as f32;
        let pixel_delta_v = viewport_v / height as f32;

        // 뷰포트 모서리에서 반 픽셀 안쪽이 첫 픽셀의 중심
        let corner = center - Vector3::new(0.0, 0.0, lens.focal_length)
            - viewport_u * 0.5
            - viewport_v * 0.5;
        let pixel00 = corner + (pixel_delta_u + pixel_delta_v) * 0.5;

        Self {
            center,
            pixel00,
            pixel_delta_u,
            pixel_delta_v,
            width,
            height,
        }
    }

    pub fn ray(&self, x: u32, y: u32) -> Ray {
        let pixel_center =
            self.pixel00 + (self.pixel_delta_u * x as f32) + (self.pixel_delta_v * y as f32);
        Ray::new(self.center, pixel_center - self.center)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn center(&self) -> Point3<f32> {
        self.center
    }

    pub fn pixel_delta(&self) -> (Vector3<f32>, Vector3<f32>) {
        (self.pixel_delta_u, self.pixel_delta_v)
    }
}
