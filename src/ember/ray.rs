use nalgebra::{Point3, Vector3};

/// `origin + t * direction`
///
/// direction은 정규화하지 않음. 카메라가 만든 레이는 뷰포트 픽셀까지의 벡터 그대로이고,
/// 따라서 교차 거리 t도 direction 길이 기준임.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Point3<f32>,
    pub direction: Vector3<f32>,
}

impl Ray {
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Self {
        Self { origin, direction }
    }

    pub fn at(&self, t: f32) -> Point3<f32> {
        self.origin + self.direction * t
    }
}
