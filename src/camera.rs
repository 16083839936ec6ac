use std::time::Duration;

use nalgebra::{Point3, Vector3};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyboardInput, VirtualKeyCode, WindowEvent};

use crate::ember::{Lens, Viewport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    Forward,
    Left,
    Backward,
    Right,
    Up,
    Down,
}

impl Movement {
    fn index(self) -> usize {
        self as usize
    }

    fn direction(self) -> Vector3<f32> {
        // 카메라는 언제나 -Z를 바라봄
        match self {
            Movement::Forward => -Vector3::z(),
            Movement::Left => -Vector3::x(),
            Movement::Backward => Vector3::z(),
            Movement::Right => Vector3::x(),
            Movement::Up => Vector3::y(),
            Movement::Down => -Vector3::y(),
        }
    }
}

const MOVEMENTS: [Movement; 6] = [
    Movement::Forward,
    Movement::Left,
    Movement::Backward,
    Movement::Right,
    Movement::Up,
    Movement::Down,
];

/// 키보드로 움직이는 핀홀 카메라. 회전은 없음
pub struct Camera {
    pub position: Point3<f32>,
    lens: Lens,
    viewport: Viewport,
    viewport_size: PhysicalSize<u32>,

    inputs: [bool; 6],
    // WASD SPACE SHIFT
}

impl Camera {
    pub fn new(lens: Lens, position: Point3<f32>, viewport_size: PhysicalSize<u32>) -> Self {
        let viewport = Viewport::new(position, &lens, viewport_size.width, viewport_size.height);

        Self {
            position,
            lens,
            viewport,
            viewport_size,
            inputs: [false; 6],
        }
    }

    pub fn input(&mut self, event: &WindowEvent) -> bool {
        let WindowEvent::KeyboardInput {
            input: KeyboardInput {
                state,
                virtual_keycode: Some(key),
                ..
            },
            ..
        } = event
        else {
            return false;
        };

        let is_press = matches!(state, ElementState::Pressed);
        let movement = match key {
            VirtualKeyCode::W => Movement::Forward,
            VirtualKeyCode::A => Movement::Left,
            VirtualKeyCode::S => Movement::Backward,
            VirtualKeyCode::D => Movement::Right,
            VirtualKeyCode::Space => Movement::Up,
            VirtualKeyCode::LShift => Movement::Down,
            _ => return false,
        };
        self.set_movement(movement, is_press);

        true
    }

    pub fn set_movement(&mut self, movement: Movement, pressed: bool) {
        self.inputs[movement.index()] = pressed;
    }

    /// 눌린 키만큼 움직임. 움직였으면 true
    pub fn update(&mut self, frame_time: Duration) -> bool {
        let time_step = frame_time.as_secs_f32().min(1.0 / 60.0);

        let offset: Vector3<f32> = MOVEMENTS
            .iter()
            .filter(|movement| self.inputs[movement.index()])
            .map(|movement| movement.direction())
            .sum();

        if offset == Vector3::zeros() {
            return false;
        }

        self.position += offset * self.movement_speed() * time_step;
        self.reevaluate_viewport();

        true
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 || new_size == self.viewport_size {
            return;
        }

        self.viewport_size = new_size;
        self.reevaluate_viewport();
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_size(&self) -> PhysicalSize<u32> {
        self.viewport_size
    }

    pub fn movement_speed(&self) -> f32 {
        5.0
    }

    fn reevaluate_viewport(&mut self) {
        self.viewport = Viewport::new(
            self.position,
            &self.lens,
            self.viewport_size.width,
            self.viewport_size.height,
        );
    }
}
