use nalgebra::{Point3, Vector3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    /// 채널별 반사율, 보통 [0, 1]
    pub albedo: Vector3<f32>,
    /// 0이면 거울, 1에 가까울수록 난반사
    pub roughness: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            albedo: Vector3::new(1.0, 0.0, 1.0),
            roughness: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub position: Point3<f32>,
    pub radius: f32,
    pub material: Material,
}

impl Sphere {
    pub fn new(position: Point3<f32>, radius: f32, material: Material) -> Self {
        Self {
            position,
            radius,
            material,
        }
    }
}

impl Default for Sphere {
    fn default() -> Self {
        Self {
            position: Point3::origin(),
            radius: 0.5,
            material: Material::default(),
        }
    }
}

/// 한 프레임 동안은 읽기 전용. 프레임 사이에 바깥에서 다시 만들어도 됨.
///
/// 구의 순서는 HitPayload::sphere_index 에만 영향을 줌
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub spheres: Vec<Sphere>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sphere(mut self, sphere: Sphere) -> Self {
        self.spheres.push(sphere);
        self
    }

    /// 분홍색 구 두 개와 바닥 역할을 하는 커다란 초록 구
    pub fn demo() -> Self {
        let shiny = Material {
            roughness: 0.01,
            ..Default::default()
        };
        let ground = Material {
            albedo: Vector3::new(0.0, 1.0, 0.0),
            roughness: 0.9,
        };

        Self::new()
            .with_sphere(Sphere::new(Point3::new(-1.0, 0.0, -2.0), 0.5, shiny))
            .with_sphere(Sphere::new(Point3::new(1.0, 0.0, -2.0), 0.5, shiny))
            .with_sphere(Sphere::new(Point3::new(0.0, -200.5, 0.0), 200.0, ground))
    }
}
