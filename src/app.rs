use std::iter;
use std::time::Duration;

use bytemuck::cast_slice;
use eframe::egui::{CentralPanel, ClippedPrimitive, Frame, SidePanel, Slider, TextureId};
use log::info;
use nalgebra::Point3;
use wgpu::{
    Backends, Color, CommandBuffer, CommandEncoder, CommandEncoderDescriptor, CompositeAlphaMode,
    Device, DeviceDescriptor, Dx12Compiler, Features, FilterMode, Instance, InstanceDescriptor,
    Limits, LoadOp, Operations, PowerPreference, PresentMode, Queue, RenderPassColorAttachment,
    RenderPassDescriptor, RequestAdapterOptions, Surface, SurfaceConfiguration, SurfaceError,
    TextureUsages, TextureViewDescriptor,
};
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::EventLoop;
use winit::window::Window;

use crate::ember::{Ember, Settings};
use crate::texture::Image;
use crate::util::to_display_bytes;
use crate::EmberError;

/// 사이드 패널에 보여줄 값들
pub struct Status {
    pub frame_time: Duration,
    pub camera_position: Point3<f32>,
}

/// 한 프레임 동안 UI에서 일어난 일
#[derive(Debug, Default)]
pub struct PanelResponse {
    /// 중앙 패널의 픽셀 크기. 다음 프레임은 이 크기로 그려야 함
    pub viewport_size: Option<PhysicalSize<u32>>,
    pub save_requested: bool,
}

struct PreparedUi {
    primitives: Vec<ClippedPrimitive>,
    command_buffers: Vec<CommandBuffer>,
    freed: Vec<TextureId>,
    response: PanelResponse,
}

pub struct Application {
    surface: Surface,
    device: Device,
    queue: Queue,
    config: SurfaceConfiguration,
    pub size: PhysicalSize<u32>,
    // 무조건 winit의 Window를 쓸 것!
    pub window: Window,
    egui_state: egui_winit::State,
    egui_context: eframe::egui::Context,
    egui_renderer: egui_wgpu::Renderer,
    egui_screen: egui_wgpu::renderer::ScreenDescriptor,
    image: Image,
    image_id: TextureId,
}

impl Application {
    pub async fn new(window: Window, event_loop: &EventLoop<()>) -> Result<Self, EmberError> {
        let size = window.inner_size();

        let instance = Instance::new(InstanceDescriptor {
            backends: Backends::all(),
            dx12_shader_compiler: Dx12Compiler::default(),
        });

        // surface는 window보다 오래 살 수 없음. 둘 다 Application이 들고 있음
        let surface = unsafe { instance.create_surface(&window) }?;

        let adapter = instance
            .request_adapter(&RequestAdapterOptions {
                power_preference: PowerPreference::default(),
                force_fallback_adapter: false,
                compatible_surface: Some(&surface),
            })
            .await
            .ok_or(EmberError::NoAdapter)?;

        let adapter_info = adapter.get_info();
        info!("GPU: {} ({:?})", adapter_info.name, adapter_info.backend);

        let (device, queue) = adapter
            .request_device(
                &DeviceDescriptor {
                    features: Features::empty(),
                    // 브라우저가 아직 webgpu를 제대로 지원 안하니 webgl2 기준 채택
                    limits: if cfg!(target_arch = "wasm32") {
                        Limits::downlevel_webgl2_defaults()
                    } else {
                        Limits::default()
                    },
                    label: Some("Ember GPU"),
                },
                None,
            )
            .await?;

        let capabilities = surface.get_capabilities(&adapter);

        // sRGB가 없으면 아무거나
        let surface_format = capabilities
            .formats
            .iter()
            .copied()
            .find(|format| format.is_srgb())
            .or_else(|| capabilities.formats.first().copied())
            .ok_or(EmberError::UnsupportedSurface)?;
        info!("Surface format: {:?}", surface_format);

        let config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: PresentMode::AutoVsync,
            alpha_mode: CompositeAlphaMode::Auto,
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let egui_state = egui_winit::State::new(event_loop);
        let egui_context = eframe::egui::Context::default();

        let mut egui_renderer = egui_wgpu::Renderer::new(
            &device,
            surface_format,
            None, // 깊이 안씀
            1,
        );
        let egui_screen = egui_wgpu::renderer::ScreenDescriptor {
            size_in_pixels: [config.width, config.height],
            pixels_per_point: egui_context.pixels_per_point(),
        };

        // 트레이서 결과는 확대해도 픽셀이 보이도록 Nearest
        let image = Image::new(&device, size.width, size.height, "Ember Output");
        let image_id = egui_renderer.register_native_texture(&device, &image.view, FilterMode::Nearest);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            window,
            egui_state,
            egui_context,
            egui_renderer,
            egui_screen,
            image,
            image_id,
        })
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }

        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);

        self.egui_screen.pixels_per_point = self.egui_context.pixels_per_point();
        self.egui_screen.size_in_pixels = [self.config.width, self.config.height];
    }

    // true: egui에서 입력 처리를 했으니 따로 관리할 필요 없음
    pub fn input(&mut self, event: &WindowEvent) -> bool {
        self.egui_state.on_event(&self.egui_context, event).consumed
    }

    /// 프레임버퍼를 올리고 UI와 함께 화면에 출력함
    pub fn render(&mut self, ember: &mut Ember, status: &Status) -> Result<PanelResponse, SurfaceError> {
        self.upload(ember);

        let output = self.surface.get_current_texture()?;
        let view = output.texture.create_view(&TextureViewDescriptor::default());
        let mut encoder = self.device.create_command_encoder(&CommandEncoderDescriptor {
            label: Some("Encoder"),
        });

        let ui = self.update_egui(&mut encoder, &mut ember.settings, status);

        // render_pass가 encoder를 빌려오기 때문에 블록으로 감쌈
        {
            let mut render_pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(Color::BLACK),
                        store: true,
                    },
                })],
                depth_stencil_attachment: None,
            });

            self.egui_renderer.render(&mut render_pass, &ui.primitives, &self.egui_screen);
        }

        self.queue.submit(
            ui.command_buffers
                .into_iter()
                .chain(iter::once(encoder.finish())),
        );
        output.present();

        for id in &ui.freed {
            self.egui_renderer.free_texture(id);
        }

        Ok(ui.response)
    }

    fn upload(&mut self, ember: &Ember) {
        let (width, height) = ember.size();
        if width == 0 || height == 0 {
            return;
        }

        // 텍스쳐를 새로 만들었으면 egui가 들고 있는 view도 바꿔줘야 함
        if self.image.resize(&self.device, PhysicalSize::new(width, height)) {
            self.egui_renderer.update_egui_texture_from_wgpu_texture(
                &self.device,
                &self.image.view,
                FilterMode::Nearest,
                self.image_id,
            );
        }

        let pixels = to_display_bytes(&ember.final_image_data, width as usize);
        self.image.load_image(&self.queue, cast_slice(&pixels));
    }

    fn update_egui(
        &mut self,
        encoder: &mut CommandEncoder,
        settings: &mut Settings,
        status: &Status,
    ) -> PreparedUi {
        let image_id = self.image_id;
        let image_size = self.image.size();
        let pixels_per_point = self.egui_context.pixels_per_point();
        let mut response = PanelResponse::default();

        let egui_input = self.egui_state.take_egui_input(&self.window);
        let egui_output = self.egui_context.run(egui_input, |ctx| {
            SidePanel::right("Side Menu")
                .resizable(true)
                .width_range(0.0..=512.0)
                .default_width(180.0)
                .show(ctx, |ui| {
                    let frame_ms = status.frame_time.as_secs_f32() * 1000.0;
                    let fps = if frame_ms > 0.0 { 1000.0 / frame_ms } else { 0.0 };
                    let position = status.camera_position;

                    ui.heading("Ember");
                    ui.label(format!("Frame time: {:.1} ms", frame_ms));
                    ui.label(format!("FPS: {:.2}", fps));
                    ui.label(format!("Resolution: {}x{}", image_size.width, image_size.height));
                    ui.label(format!(
                        "Camera: ({:.2}, {:.2}, {:.2})",
                        position.x, position.y, position.z
                    ));
                    ui.separator();
                    ui.add(Slider::new(&mut settings.bounces, 1..=32).text("Bounces"));

                    if cfg!(not(target_arch = "wasm32")) && ui.button("Save PNG").clicked() {
                        response.save_requested = true;
                    }
                    ui.separator();
                    ui.label("WASD / Space / Shift: move");
                });

            CentralPanel::default().frame(Frame::none()).show(ctx, |ui| {
                let available = ui.available_size();
                response.viewport_size = Some(PhysicalSize::new(
                    (available.x * pixels_per_point).round() as u32,
                    (available.y * pixels_per_point).round() as u32,
                ));
                ui.image(image_id, available);
            });
        });

        self.egui_state.handle_platform_output(&self.window, &self.egui_context, egui_output.platform_output);
        let primitives = self.egui_context.tessellate(egui_output.shapes);
        egui_output.textures_delta.set.iter().for_each(|(id, delta)| {
            self.egui_renderer.update_texture(&self.device, &self.queue, *id, delta);
        });

        let command_buffers = self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            encoder,
            &primitives,
            &self.egui_screen,
        );

        PreparedUi {
            primitives,
            command_buffers,
            freed: egui_output.textures_delta.free,
            response,
        }
    }
}
