use anyhow::{anyhow, Context, Result};
use glutin::{
    config::ConfigTemplateBuilder,
    context::{ContextApi, ContextAttributesBuilder, GlProfile, PossiblyCurrentContext, Version},
    display::{GetGlDisplay, GlDisplay},
    prelude::*,
    surface::{Surface, SwapInterval, WindowSurface},
};
use glutin_winit::{DisplayBuilder, GlWindow};
use log::{error, info, warn, LevelFilter};
use raw_window_handle::HasRawWindowHandle;
use simple_logger::SimpleLogger;
use std::{ffi::CString, num::NonZeroU32, process};
use winit::{
    dpi::{LogicalSize, PhysicalSize},
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop, EventLoopBuilder},
    window::{Window, WindowBuilder},
};

use quadlesson::{
    config::{AppConfig, DEFAULT_CONFIG_PATH},
    render::{load_program, GlDevice, Renderer},
};

// Field order is drop order: GL objects go before the context that owns them.
struct App {
    renderer: Option<Renderer>,
    device: GlDevice,
    gl_surface: Surface<WindowSurface>,
    gl_context: PossiblyCurrentContext,
    window: Window,
}

impl App {
    fn new(config: &AppConfig) -> Result<(Self, EventLoop<()>)> {
        let event_loop = EventLoopBuilder::new().build()?;
        let window_builder = WindowBuilder::new()
            .with_title(config.window.title.as_str())
            .with_inner_size(LogicalSize::new(config.window.width, config.window.height))
            .with_resizable(true);

        let template = ConfigTemplateBuilder::new().with_alpha_size(8);
        let display_builder = DisplayBuilder::new().with_window_builder(Some(window_builder));

        let (window, gl_config) = display_builder
            .build(&event_loop, template, |configs| {
                // glutin only calls the picker with a non-empty match set.
                configs
                    .reduce(|accum, config| {
                        if config.num_samples() > accum.num_samples() {
                            config
                        } else {
                            accum
                        }
                    })
                    .expect("GL display offered no configs")
            })
            .map_err(|err| anyhow!("Failed to create GL display: {}", err))?;

        let window = window.context("Display builder did not create a window")?;
        let raw_window_handle = window.raw_window_handle();

        let context_attributes = ContextAttributesBuilder::new()
            .with_context_api(ContextApi::OpenGl(Some(Version::new(3, 3))))
            .with_profile(GlProfile::Core)
            .build(Some(raw_window_handle));

        let gl_display = gl_config.display();

        let gl_context = unsafe { gl_display.create_context(&gl_config, &context_attributes) }
            .context("Failed to create OpenGL context")?;

        let attrs = window.build_surface_attributes(<_>::default());
        let gl_surface = unsafe { gl_display.create_window_surface(&gl_config, &attrs) }
            .context("Failed to create GL surface")?;

        let gl_context = gl_context
            .make_current(&gl_surface)
            .context("Failed to make context current")?;

        if config.window.vsync {
            if let Err(err) =
                gl_surface.set_swap_interval(&gl_context, SwapInterval::Wait(NonZeroU32::MIN))
            {
                warn!("Failed to enable vsync: {}", err);
            }
        }

        // Load OpenGL functions
        let device = unsafe {
            GlDevice::load(|symbol| match CString::new(symbol) {
                Ok(symbol) => gl_display.get_proc_address(symbol.as_c_str()),
                Err(_) => std::ptr::null(),
            })
        };

        match device.version() {
            Some(version) => info!("GL Version: {}", version),
            None => warn!("GL Version: unavailable"),
        }

        let size = window.inner_size();
        device.viewport(size.width, size.height);

        let program = load_program(&device, &config.render).with_context(|| {
            format!(
                "Failed to build shader program from {}",
                config.render.shader_path.display()
            )
        })?;
        let renderer = Renderer::new(&device, program, config.render.clear_color);
        info!("Using shader program {}", renderer.program().id());

        Ok((
            Self {
                renderer: Some(renderer),
                device,
                gl_surface,
                gl_context,
                window,
            },
            event_loop,
        ))
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        if let (Some(width), Some(height)) =
            (NonZeroU32::new(size.width), NonZeroU32::new(size.height))
        {
            self.gl_surface.resize(&self.gl_context, width, height);
            self.device.viewport(size.width, size.height);
        }
    }

    fn redraw(&mut self) -> Result<()> {
        let Some(renderer) = &self.renderer else {
            return Ok(());
        };

        renderer.draw_frame(&self.device);
        self.gl_surface
            .swap_buffers(&self.gl_context)
            .context("Failed to swap buffers")?;
        Ok(())
    }

    fn close(&mut self) {
        if self.renderer.take().is_some() {
            info!("Window closed, releasing GL resources");
        }
    }
}

/// Why the event loop stopped.
#[derive(Debug)]
enum Shutdown {
    Running,
    Closed,
    Failed(anyhow::Error),
}

impl Shutdown {
    /// Records how the loop ended. The first terminal state wins.
    fn finish(&mut self, next: Shutdown) {
        if matches!(self, Shutdown::Running) {
            *self = next;
        }
    }

    fn into_result(self) -> Result<()> {
        match self {
            Shutdown::Failed(err) => Err(err),
            Shutdown::Running | Shutdown::Closed => Ok(()),
        }
    }
}

fn run() -> Result<()> {
    let config = AppConfig::load(DEFAULT_CONFIG_PATH)?;
    let (mut app, event_loop) = App::new(&config)?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut shutdown = Shutdown::Running;
    event_loop.run(|event, elwt| match event {
        Event::WindowEvent { event, .. } => match event {
            WindowEvent::CloseRequested => {
                app.close();
                shutdown.finish(Shutdown::Closed);
                elwt.exit();
            }
            WindowEvent::Resized(size) => app.resize(size),
            WindowEvent::RedrawRequested => {
                if let Err(err) = app.redraw() {
                    app.close();
                    shutdown.finish(Shutdown::Failed(err));
                    elwt.exit();
                }
            }
            _ => (),
        },
        Event::AboutToWait => {
            app.window.request_redraw();
        }
        _ => (),
    })?;

    shutdown.into_result()
}

fn main() {
    if let Err(err) = SimpleLogger::new().with_level(LevelFilter::Info).env().init() {
        // No logger to report through.
        println!("Failed to initialise logging: {}", err);
        process::exit(-1);
    }

    if let Err(err) = run() {
        error!("{:#}", err);
        process::exit(-1);
    }
}
