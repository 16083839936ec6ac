use log::trace;
use nalgebra::{Point3, Unit, Vector3, Vector4};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::ember::scene::{Scene, Sphere};
use crate::util::{random_vec, vec4_to_rgba};

mod camera;
mod ray;
pub mod scene;

pub use camera::{Lens, Viewport};
pub use ray::Ray;

/// 셰이딩 상수와 바운스 횟수
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub bounces: u32,
    /// 단위 벡터여야 함
    pub light_direction: Vector3<f32>,
    pub ambient: f32,
    /// 바운스마다 multiplier에 곱해지는 값
    pub attenuation: f32,
    /// 다음 레이의 시작점을 법선 방향으로 밀어내는 거리
    pub bias: f32,
    pub background: Vector3<f32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bounces: 10,
            light_direction: Vector3::new(-1.0, -1.0, -1.0).normalize(),
            ambient: 0.1,
            attenuation: 0.7,
            bias: 0.0001,
            background: Vector3::new(0.5, 0.7, 1.0),
        }
    }
}

/// CPU 프레임버퍼. 픽셀은 행 우선, y = 0 이 화면 아래쪽 줄.
pub struct Ember {
    pub final_image_data: Vec<u32>,
    width: u32,
    height: u32,
    pub settings: Settings,
}

impl Default for Ember {
    fn default() -> Self {
        Self::new()
    }
}

impl Ember {
    pub fn new() -> Self {
        Self {
            final_image_data: Vec::new(),
            width: 0,
            height: 0,
            settings: Settings::default(),
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// 화면 전체를 한 번 그림.
    ///
    /// 줄마다 독립된 StdRng를 쓰므로 같은 seed면 스레드 순서와 상관없이 같은 결과가 나옴.
    /// viewport 크기가 바뀌었으면 프레임버퍼도 다시 잡음.
    pub fn render(&mut self, scene: &Scene, viewport: &Viewport, seed: u64) {
        let (width, height) = (viewport.width(), viewport.height());
        let pixel_count = (width as usize) * (height as usize);

        if self.final_image_data.len() != pixel_count {
            self.final_image_data = vec![0; pixel_count];
        }
        self.width = width;
        self.height = height;

        if pixel_count == 0 {
            return;
        }

        let settings = &self.settings;
        self.final_image_data
            .par_chunks_mut(width as usize)
            .enumerate()
            .for_each(|(y, row)| {
                let mut rng = StdRng::seed_from_u64(row_seed(seed, y));

                for (x, pixel) in row.iter_mut().enumerate() {
                    let ray = viewport.ray(x as u32, y as u32);
                    *pixel = per_pixel(settings, scene, ray, &mut rng).color;
                }
            });

        trace!("rendered {}x{} with {} spheres", width, height, scene.spheres.len());
    }
}

fn row_seed(seed: u64, row: usize) -> u64 {
    seed ^ (row as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// per_pixel의 결과. last_hit은 마지막 바운스의 교차 정보일 뿐이라 색을 정하는 데는 쓰지 않음
pub struct Sample<'a> {
    pub color: u32,
    pub last_hit: Option<HitPayload<'a>>,
}

// DirectX의 RayGen 쉐이더와 같음
pub fn per_pixel<'a, R: Rng + ?Sized>(
    settings: &Settings,
    scene: &'a Scene,
    primary: Ray,
    rng: &mut R,
) -> Sample<'a> {
    let mut ray = primary;
    let mut color: Vector3<f32> = Vector3::zeros();
    let mut multiplier: f32 = 1.0;
    let mut last_hit = None;

    for _ in 0..settings.bounces {
        let Some(hit) = trace_ray(scene, &ray) else {
            color += settings.background * multiplier;
            color = color.map(|c| c.clamp(0.0, 1.0));
            last_hit = None;
            break;
        };

        let material = &hit.sphere.material;

        let intensity = hit.normal.dot(&-settings.light_direction).max(0.0);
        let sphere_color = (material.albedo * intensity)
            .add_scalar(settings.ambient)
            .map(|c| c.clamp(0.0, 1.0));

        color += sphere_color * multiplier;
        multiplier *= settings.attenuation;

        ray = scatter_ray(settings, &ray, &hit, rng);
        last_hit = Some(hit);
    }

    // 바운스를 다 쓰고 끝나면 clamp 하지 않음. 넘친 채널은 압축할 때 255로 포화됨
    Sample {
        color: vec4_to_rgba(&Vector4::new(color.x, color.y, color.z, 1.0)),
        last_hit,
    }
}

/// 다음 바운스의 레이.
///
/// 반사축은 `normal + roughness * scatter` 를 정규화하지 않고 그대로 씀
pub fn scatter_ray<R: Rng + ?Sized>(settings: &Settings, ray: &Ray, hit: &HitPayload, rng: &mut R) -> Ray {
    // 교차점 그대로 쓰면 같은 구에 다시 부딪히니 법선 방향으로 살짝 밀어냄
    let origin = hit.position + hit.normal.as_ref() * settings.bias;

    let scatter = random_vec(rng, -0.5..0.5).normalize();
    let axis = hit.normal.as_ref() + scatter * hit.sphere.material.roughness;
    let direction = reflect(&ray.direction, &axis);

    Ray::new(origin, direction)
}

/// `I - 2 (N·I) N`
pub fn reflect(incident: &Vector3<f32>, axis: &Vector3<f32>) -> Vector3<f32> {
    incident - axis * (2.0 * axis.dot(incident))
}

/// 가장 가까운 구와의 교차. 안 맞으면 None
pub fn trace_ray<'a>(scene: &'a Scene, ray: &Ray) -> Option<HitPayload<'a>> {
    let mut closest = None;
    let mut hit_distance = f32::MAX;

    for (index, sphere) in scene.spheres.iter().enumerate() {
        // 구를 원점으로 옮긴 좌표계에서 |o + t*d|^2 = r^2 를 풂
        let origin = ray.origin - sphere.position;

        let a = ray.direction.magnitude_squared();
        let b = 2.0 * origin.dot(&ray.direction);
        let c = origin.magnitude_squared() - sphere.radius.powi(2);

        // 판별식
        let discriminant = b.powi(2) - 4.0 * a * c;
        if discriminant < 0.0 {
            continue;
        }

        // 가까운 근만 봄. 레이가 구 안에서 출발하면 t < 0 이라 맞지 않은 것으로 취급
        let distance = (-b - discriminant.sqrt()) / (2.0 * a);
        if distance > 0.0 && distance < hit_distance {
            hit_distance = distance;
            closest = Some(index);
        }
    }

    closest.map(|index| closest_hit(ray, hit_distance, index, &scene.spheres[index]))
}

pub fn closest_hit<'a>(ray: &Ray, distance: f32, index: usize, sphere: &'a Sphere) -> HitPayload<'a> {
    let fake_origin = ray.origin - sphere.position;
    let fake_position = fake_origin + ray.direction * distance;

    // 법선은 구 중심 기준 좌표에서 구한 다음에 월드 좌표로 되돌림
    let normal = Unit::new_normalize(fake_position);
    let position = sphere.position + fake_position;

    HitPayload {
        distance,
        position,
        normal,
        sphere_index: index,
        sphere,
    }
}

// Cherno씨와 같은 디자인 선택, HitPayload는 빛의 경로에 대한 정보만 담고
// 이를 이용해 색상을 알아내는건 나중에 함
#[derive(Debug, Clone, Copy)]
pub struct HitPayload<'a> {
    pub distance: f32,
    pub position: Point3<f32>,
    pub normal: Unit<Vector3<f32>>,
    pub sphere_index: usize,
    pub sphere: &'a Sphere,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ember::scene::Material;
    use crate::util::rgba_to_vec4;

    const EPSILON: f32 = 1e-4;

    fn sphere_at(x: f32, y: f32, z: f32, radius: f32) -> Sphere {
        Sphere::new(Point3::new(x, y, z), radius, Material::default())
    }

    fn magenta_scene() -> Scene {
        Scene::new().with_sphere(Sphere::new(
            Point3::origin(),
            0.5,
            Material {
                albedo: Vector3::new(1.0, 0.0, 1.0),
                roughness: 0.0,
            },
        ))
    }

    #[test]
    fn hit_distance_is_gap_to_surface() {
        let scene = Scene::new()
            .with_sphere(sphere_at(10.0, 10.0, 10.0, 1.0))
            .with_sphere(sphere_at(0.0, 0.0, 0.0, 1.5));
        let ray = Ray::new(Point3::new(0.0, 4.0, 0.0), Vector3::new(0.0, -1.0, 0.0));

        let hit = trace_ray(&scene, &ray).expect("ray aimed at the centre");

        assert!((hit.distance - 2.5).abs() < EPSILON);
        assert_eq!(hit.sphere_index, 1);
        assert!((hit.position - Point3::new(0.0, 1.5, 0.0)).norm() < EPSILON);
    }

    #[test]
    fn misses_when_scene_is_empty_or_ray_points_away() {
        let ray = Ray::new(Point3::new(0.0, 0.0, 3.0), Vector3::new(0.0, 0.0, -1.0));
        assert!(trace_ray(&Scene::new(), &ray).is_none());

        let away = Ray::new(Point3::new(0.0, 0.0, 3.0), Vector3::new(0.0, 0.0, 1.0));
        assert!(trace_ray(&magenta_scene(), &away).is_none());

        let beside = Ray::new(Point3::new(2.0, 0.0, 3.0), Vector3::new(0.0, 0.0, -1.0));
        assert!(trace_ray(&magenta_scene(), &beside).is_none());
    }

    #[test]
    fn nearest_sphere_wins_regardless_of_order() {
        let near = sphere_at(0.0, 0.0, -2.0, 0.5);
        let far = sphere_at(0.0, 0.0, -5.0, 1.0);
        let ray = Ray::new(Point3::origin(), Vector3::new(0.0, 0.0, -1.0));

        let forward = Scene::new().with_sphere(near).with_sphere(far);
        let backward = Scene::new().with_sphere(far).with_sphere(near);

        let hit = trace_ray(&forward, &ray).unwrap();
        assert_eq!(hit.sphere_index, 0);
        assert!((hit.distance - 1.5).abs() < EPSILON);

        let hit = trace_ray(&backward, &ray).unwrap();
        assert_eq!(hit.sphere_index, 1);
        assert!((hit.distance - 1.5).abs() < EPSILON);
    }

    #[test]
    fn origin_inside_sphere_is_not_a_hit() {
        let ray = Ray::new(Point3::origin(), Vector3::new(1.0, 0.0, 0.0));
        assert!(trace_ray(&magenta_scene(), &ray).is_none());
    }

    #[test]
    fn normal_is_relative_to_sphere_center() {
        let scene = Scene::new().with_sphere(sphere_at(3.0, 0.0, 0.0, 0.5));
        let ray = Ray::new(Point3::new(3.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));

        let hit = trace_ray(&scene, &ray).unwrap();

        assert!((hit.normal.into_inner() - Vector3::new(0.0, 0.0, 1.0)).norm() < EPSILON);
        assert!((hit.position - Point3::new(3.0, 0.0, 0.5)).norm() < EPSILON);
    }

    #[test]
    fn distance_is_measured_in_direction_lengths() {
        let scene = Scene::new().with_sphere(sphere_at(0.0, 0.0, -3.0, 1.0));
        let ray = Ray::new(Point3::origin(), Vector3::new(0.0, 0.0, -2.0));

        let hit = trace_ray(&scene, &ray).unwrap();

        assert!((hit.distance - 1.0).abs() < EPSILON);
        assert!((ray.at(hit.distance) - hit.position).norm() < EPSILON);
    }

    #[test]
    fn empty_scene_shades_background() {
        let settings = Settings::default();
        let mut rng = StdRng::seed_from_u64(1);
        let ray = Ray::new(Point3::origin(), Vector3::new(0.3, -0.2, -1.0));

        let scene = Scene::new();

        let sample = per_pixel(&settings, &scene, ray, &mut rng);

        assert_eq!(sample.color, vec4_to_rgba(&Vector4::new(0.5, 0.7, 1.0, 1.0)));
        assert_eq!(sample.color & 0xFF, 0xFF);
        assert!(sample.last_hit.is_none());
    }

    #[test]
    fn mirror_bounce_then_background() {
        let scene = magenta_scene();
        let settings = Settings::default();
        let viewport = Viewport::new(Point3::new(0.0, 0.0, 1.0), &Lens::default(), 1, 1);
        let ray = viewport.ray(0, 0);

        let hit = trace_ray(&scene, &ray).unwrap();
        assert!((hit.distance - 0.5).abs() < EPSILON);
        assert!((hit.normal.into_inner() - Vector3::new(0.0, 0.0, 1.0)).norm() < EPSILON);

        let diffuse = hit.normal.dot(&-settings.light_direction).max(0.0);
        assert!((diffuse - 1.0 / 3f32.sqrt()).abs() < EPSILON);

        // 반사된 레이는 +Z로 날아가서 배경을 봄:
        // (1+d+0.1, 0.1, 1+d+0.1) 중 넘치는 부분은 잘리고 G = 0.1 + 0.7 * 0.7
        let mut rng = StdRng::seed_from_u64(42);
        let sample = per_pixel(&settings, &scene, ray, &mut rng);

        assert_eq!(sample.color, 0xFF96FFFF);
        assert!(sample.last_hit.is_none());
    }

    #[test]
    fn exhausted_budget_skips_background() {
        let scene = magenta_scene();
        let settings = Settings {
            bounces: 1,
            ..Default::default()
        };
        let ray = Ray::new(Point3::new(0.0, 0.0, 1.0), Vector3::new(0.0, 0.0, -1.0));
        let mut rng = StdRng::seed_from_u64(42);

        let sample = per_pixel(&settings, &scene, ray, &mut rng);

        let d = 1.0 / 3f32.sqrt();
        let expected = vec4_to_rgba(&Vector4::new(d + 0.1, 0.1, d + 0.1, 1.0));
        assert_eq!(sample.color, expected);

        let last = sample.last_hit.expect("budget ended on a hit");
        assert_eq!(last.sphere_index, 0);
    }

    #[test]
    fn zero_bounces_leave_black() {
        let settings = Settings {
            bounces: 0,
            ..Default::default()
        };
        let ray = Ray::new(Point3::origin(), Vector3::new(0.0, 0.0, -1.0));
        let mut rng = StdRng::seed_from_u64(3);

        let scene = Scene::demo();

        let sample = per_pixel(&settings, &scene, ray, &mut rng);

        assert_eq!(sample.color, 0x000000FF);
    }

    #[test]
    fn reflect_keeps_unnormalized_axis() {
        let incident = Vector3::new(0.0, 0.0, -1.0);

        // 단위 법선이면 거울 반사
        let mirrored = reflect(&incident, &Vector3::new(0.0, 0.0, 1.0));
        assert!((mirrored - Vector3::new(0.0, 0.0, 1.0)).norm() < EPSILON);

        // 길이 2 짜리 축은 정규화한 축과 결과가 다름
        let long_axis = Vector3::new(0.0, 0.0, 2.0);
        let reflected = reflect(&incident, &long_axis);
        assert!((reflected - Vector3::new(0.0, 0.0, 7.0)).norm() < EPSILON);

        let tilted = Vector3::new(0.6, 0.0, 0.3);
        let reflected = reflect(&incident, &tilted);
        assert!((reflected - Vector3::new(0.36, 0.0, -0.82)).norm() < EPSILON);
    }

    #[test]
    fn rough_bounce_reflects_about_raw_axis() {
        let scene = Scene::new().with_sphere(Sphere::new(
            Point3::origin(),
            0.5,
            Material {
                albedo: Vector3::new(0.8, 0.8, 0.8),
                roughness: 0.9,
            },
        ));
        let settings = Settings::default();
        let ray = Ray::new(Point3::new(0.1, 0.2, 2.0), Vector3::new(0.0, 0.0, -1.0));
        let hit = trace_ray(&scene, &ray).unwrap();

        for seed in 0..32 {
            let bounced = scatter_ray(&settings, &ray, &hit, &mut StdRng::seed_from_u64(seed));

            let mut rng = StdRng::seed_from_u64(seed);
            let scatter = random_vec(&mut rng, -0.5..0.5).normalize();
            let axis = hit.normal.into_inner() + scatter * 0.9;
            let expected = ray.direction - axis * (2.0 * axis.dot(&ray.direction));

            assert!((bounced.direction - expected).norm() < EPSILON, "seed {seed}");
            assert!((bounced.origin - (hit.position + hit.normal.into_inner() * settings.bias)).norm() < EPSILON);
        }
    }

    // 바운스 과정을 그대로 풀어쓴 구현과 per_pixel이 같은 프레임을 내야 함
    fn reference_color(settings: &Settings, scene: &Scene, primary: Ray, rng: &mut StdRng) -> u32 {
        let mut ray = primary;
        let mut color: Vector3<f32> = Vector3::zeros();
        let mut multiplier: f32 = 1.0;

        for _ in 0..settings.bounces {
            let Some(hit) = trace_ray(scene, &ray) else {
                color += settings.background * multiplier;
                color = color.map(|c| c.clamp(0.0, 1.0));
                break;
            };

            let material = &scene.spheres[hit.sphere_index].material;
            let d = hit.normal.dot(&-settings.light_direction).max(0.0);
            let sphere_color = (material.albedo * d).add_scalar(settings.ambient).map(|c| c.clamp(0.0, 1.0));
            color += sphere_color * multiplier;
            multiplier *= settings.attenuation;

            let scatter = random_vec(rng, -0.5..0.5).normalize();
            let axis = hit.normal.into_inner() + scatter * material.roughness;
            let direction = ray.direction - axis * (2.0 * axis.dot(&ray.direction));
            ray = Ray::new(hit.position + hit.normal.into_inner() * settings.bias, direction);
        }

        vec4_to_rgba(&Vector4::new(color.x, color.y, color.z, 1.0))
    }

    #[test]
    fn demo_frame_matches_unrolled_bounces() {
        let scene = Scene::demo();
        let settings = Settings::default();
        let viewport = Viewport::new(Point3::origin(), &Lens::default(), 64, 36);

        for y in 0..36 {
            for x in 0..64 {
                let ray = viewport.ray(x, y);
                let actual = per_pixel(&settings, &scene, ray, &mut StdRng::seed_from_u64(7)).color;
                let expected = reference_color(&settings, &scene, ray, &mut StdRng::seed_from_u64(7));
                assert_eq!(actual, expected, "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn same_seed_same_color() {
        let scene = Scene::demo();
        let settings = Settings::default();
        let viewport = Viewport::new(Point3::origin(), &Lens::default(), 32, 18);

        for (x, y) in [(3, 2), (16, 4), (28, 9), (10, 0)] {
            let ray = viewport.ray(x, y);
            let first = per_pixel(&settings, &scene, ray, &mut StdRng::seed_from_u64(99)).color;
            let second = per_pixel(&settings, &scene, ray, &mut StdRng::seed_from_u64(99)).color;
            assert_eq!(first, second);
        }
    }

    #[test]
    fn render_is_reproducible_and_opaque() {
        let scene = Scene::demo();
        let viewport = Viewport::new(Point3::origin(), &Lens::default(), 48, 27);

        let mut first = Ember::new();
        first.render(&scene, &viewport, 1234);
        let mut second = Ember::new();
        second.render(&scene, &viewport, 1234);

        assert_eq!(first.size(), (48, 27));
        assert_eq!(first.final_image_data.len(), 48 * 27);
        assert_eq!(first.final_image_data, second.final_image_data);
        assert!(first.final_image_data.iter().all(|pixel| pixel & 0xFF == 0xFF));
    }

    #[test]
    fn render_follows_viewport_resize() {
        let scene = Scene::demo();
        let mut ember = Ember::new();

        ember.render(&scene, &Viewport::new(Point3::origin(), &Lens::default(), 16, 9), 5);
        assert_eq!(ember.final_image_data.len(), 16 * 9);

        ember.render(&scene, &Viewport::new(Point3::origin(), &Lens::default(), 8, 20), 5);
        assert_eq!(ember.size(), (8, 20));
        assert_eq!(ember.final_image_data.len(), 8 * 20);
    }

    #[test]
    fn ground_is_green_under_the_camera() {
        let ground = Scene::demo().spheres[2];
        let scene = Scene::new().with_sphere(ground);
        let viewport = Viewport::new(Point3::origin(), &Lens::default(), 16, 16);
        let mut ember = Ember::new();
        ember.render(&scene, &viewport, 8);

        // 맨 아래 줄 가운데는 바닥 구를 봄. 이후 바운스는 바닥이나 하늘뿐이라 G가 가장 큼
        let pixel = rgba_to_vec4(ember.final_image_data[8]);
        assert!(pixel.y > pixel.x);
        assert!(pixel.y > pixel.z);
    }
}
