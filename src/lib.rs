use cfg_if::cfg_if;
use log::{debug, error, info, warn};
use nalgebra::Point3;
use wgpu::SurfaceError;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, KeyboardInput, VirtualKeyCode, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::{Window, WindowBuilder};

use crate::app::{Application, Status};
use crate::camera::Camera;
use crate::ember::scene::Scene;
use crate::ember::{Ember, Lens};

// wasm32 환경에서만 wasm_bindgen 활용
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

cfg_if! {
    if #[cfg(target_arch = "wasm32")] {
        use web_time::Instant;
    } else {
        use std::time::Instant;
    }
}

pub mod app;
pub mod camera;
pub mod ember;
mod error;
pub mod texture;
pub mod util;

pub use error::EmberError;
pub use util::{rgba_to_vec4, vec4_to_rgba};

const WINDOW_SIZE: PhysicalSize<u32> = PhysicalSize::new(1280, 720);

// wasm 연결시 아래 함수를 시작점으로 삼도록 함.
#[cfg_attr(target_arch = "wasm32", wasm_bindgen(start))]
pub fn run() {
    // 로거 초기화
    cfg_if! {
        if #[cfg(target_arch = "wasm32")] {
            // panic 발생시 웹 브라우저의 console.err에 로그 띄우기
            std::panic::set_hook(Box::new(console_error_panic_hook::hook));
            console_log::init_with_level(log::Level::Debug).expect("로거 초기화 실패");
        } else {
            // 아니면 기본적인 로거만 불러오기
            env_logger::init();
        }
    }

    let event_loop = EventLoop::new();
    let window = match WindowBuilder::new()
        .with_title("Ember: Ray Tracer")
        .with_inner_size(WINDOW_SIZE)
        .with_resizable(true)
        .build(&event_loop)
    {
        Ok(window) => window,
        Err(e) => {
            error!("{}", EmberError::from(e));
            return;
        }
    };

    cfg_if! {
        if #[cfg(target_arch = "wasm32")] {
            attach_canvas(&window);
            wasm_bindgen_futures::spawn_local(start(window, event_loop));
        } else {
            pollster::block_on(start(window, event_loop));
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn attach_canvas(window: &Window) {
    use winit::platform::web::WindowExtWebSys;

    // 브라우저에선 canvas를 직접 문서에 붙여야 보임
    let attached = web_sys::window()
        .and_then(|win| win.document())
        .and_then(|doc| {
            let body = doc.body()?;
            let canvas = web_sys::Element::from(window.canvas());
            body.append_child(&canvas).ok()?;
            Some(())
        });

    if attached.is_none() {
        error!("Failed to attach canvas to document body");
    }
}

async fn start(window: Window, event_loop: EventLoop<()>) {
    let mut app = match Application::new(window, &event_loop).await {
        Ok(app) => app,
        Err(e) => {
            error!("{}", e);
            return;
        }
    };

    let scene = Scene::demo();
    let mut camera = Camera::new(Lens::default(), Point3::origin(), app.size);
    let mut ember = Ember::new();
    let mut last_frame = Instant::now();

    info!("Rendering {} spheres at {}x{}", scene.spheres.len(), app.size.width, app.size.height);

    event_loop.run(move |event, _, control_flow| match event {
        Event::WindowEvent {
            ref event,
            window_id,
        } if window_id == app.window.id() => match event {
            // 만약 앱을 운영체제에서 닫으려고 하거나
            WindowEvent::CloseRequested |
            // 키보드로 ESC를 눌렀으면 나가기. 그리던 프레임은 끝까지 그림
            WindowEvent::KeyboardInput {
                input: KeyboardInput {
                    state: ElementState::Pressed, virtual_keycode: Some(VirtualKeyCode::Escape), ..
                }, ..
            } => *control_flow = ControlFlow::ExitWithCode(0),

            WindowEvent::Resized(physical_size) => app.resize(*physical_size),
            WindowEvent::ScaleFactorChanged { new_inner_size, .. } => app.resize(**new_inner_size),

            _ => {
                if !app.input(event) {
                    camera.input(event);
                }
            }
        },
        Event::RedrawRequested(window_id) if window_id == app.window.id() => {
            let now = Instant::now();
            let frame_time = now - last_frame;
            last_frame = now;

            camera.update(frame_time);
            ember.render(&scene, camera.viewport(), rand::random());

            let status = Status {
                frame_time,
                camera_position: camera.position,
            };

            match app.render(&mut ember, &status) {
                Ok(response) => {
                    if let Some(size) = response.viewport_size {
                        camera.resize(size);
                    }
                    if response.save_requested {
                        save_frame(&ember);
                    }
                }
                // surface를 잃어버렸으면 다시 설정
                Err(SurfaceError::Lost) => app.resize(app.size),
                Err(SurfaceError::OutOfMemory) => {
                    error!("GPU out of memory");
                    *control_flow = ControlFlow::ExitWithCode(1);
                }
                Err(e) => warn!("{:?}", e),
            }

            let delta_ms = frame_time.as_secs_f64() * 1000.0;
            debug!("Delta time: {:.0} ms", delta_ms);
            debug!("FPS: {:.2}", 1000.0 / delta_ms.max(f64::EPSILON));
        }
        // 매 프레임 다시 그림
        Event::MainEventsCleared => app.window.request_redraw(),
        _ => {}
    });
}

#[cfg(not(target_arch = "wasm32"))]
fn save_frame(ember: &Ember) {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default();
    let path = format!("ember-{}.png", timestamp);
    let (width, height) = ember.size();

    match util::save_png(&path, &ember.final_image_data, width, height) {
        Ok(()) => info!("Saved {}", path),
        Err(e) => error!("{}", e),
    }
}

#[cfg(target_arch = "wasm32")]
fn save_frame(_ember: &Ember) {
    warn!("Saving images is not supported in the browser");
}
