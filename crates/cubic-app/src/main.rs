// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use cubic_core::init_tracing;
use cubic_platform::{present_size, to_present_size};
use cubic_present::Presenter;
use cubic_present_vk::{DeviceReport, NegotiationConfig, VkPresenter, VkVsyncMode};
use tracing::{error, info, warn};

use cubic_platform::winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

mod config;

use config::{load_or_default, AppCfg};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(long, default_value = "cubic.toml")]
    config: PathBuf,
    /// Force the Vulkan validation layer on
    #[arg(long)]
    validation: bool,
    /// Print every device's suitability and exit
    #[arg(long)]
    list_devices: bool,
    /// Exit right after negotiation
    #[arg(long)]
    once: bool,
}

struct App {
    cfg: AppCfg,
    negotiation: NegotiationConfig,
    list_devices: bool,
    once: bool,

    // Presenter must go before the window it was built from.
    presenter: Option<VkPresenter>,
    window: Option<Window>,
    failure: Option<anyhow::Error>,
}

impl App {
    fn bail(&mut self, event_loop: &ActiveEventLoop, e: anyhow::Error) {
        error!("{e:#}");
        self.failure = Some(e);
        self.presenter = None;
        self.window = None;
        event_loop.exit();
    }

    fn open_window(&self, event_loop: &ActiveEventLoop) -> Result<Window> {
        let w = &self.cfg.window;
        event_loop
            .create_window(
                Window::default_attributes()
                    .with_title(w.title.clone())
                    .with_inner_size(PhysicalSize::new(w.width.max(1), w.height.max(1))),
            )
            .context("create_window")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PresentKey {
    ToggleVsync,
    CycleVsyncMode,
}

// V: vsync on/off, M: fifo <-> mailbox
fn present_key(code: KeyCode) -> Option<PresentKey> {
    match code {
        KeyCode::KeyV => Some(PresentKey::ToggleVsync),
        KeyCode::KeyM => Some(PresentKey::CycleVsyncMode),
        _ => None,
    }
}

fn next_vsync_mode(mode: VkVsyncMode) -> VkVsyncMode {
    match mode {
        VkVsyncMode::Fifo => VkVsyncMode::Mailbox,
        VkVsyncMode::Mailbox => VkVsyncMode::Fifo,
    }
}

fn print_reports(reports: &[DeviceReport]) {
    for r in reports {
        let verdict = match &r.verdict {
            Ok(q) if q.is_shared() => format!("suitable (graphics+present family {})", q.graphics()),
            Ok(q) => format!(
                "suitable (graphics family {}, present family {})",
                q.graphics(),
                q.present()
            ),
            Err(e) => format!("rejected: {e}"),
        };
        println!(
            "[{}] {} ({:?}): {}",
            r.index, r.identity.name, r.identity.device_type, verdict
        );
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        event_loop.set_control_flow(ControlFlow::Wait);

        let window = match self.open_window(event_loop) {
            Ok(w) => w,
            Err(e) => return self.bail(event_loop, e),
        };

        if self.list_devices {
            match cubic_present_vk::survey(&window, &window, &self.negotiation) {
                Ok(reports) => print_reports(&reports),
                Err(e) => return self.bail(event_loop, e),
            }
            event_loop.exit();
            return;
        }

        let mut size = present_size(&window);
        size.width = size.width.max(1);
        size.height = size.height.max(1);

        match VkPresenter::new(&window, &window, size, &self.negotiation) {
            Ok(p) => {
                info!(
                    "presenting on {} ({} images)",
                    p.selected().identity.name,
                    p.chain().map_or(0, |c| c.image_count())
                );
                self.presenter = Some(p);
                self.window = Some(window);
            }
            Err(e) => return self.bail(event_loop, e.context("Vulkan presentation setup")),
        }

        if self.once {
            info!("--once: negotiation done, exiting");
            self.presenter = None;
            self.window = None;
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if let Some(window) = &self.window {
            if window_id != window.id() {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("CloseRequested");
                self.presenter = None;
                self.window = None;
                event_loop.exit();
            }

            WindowEvent::Resized(new_size) => {
                let size = to_present_size(new_size);
                info!("Resized → {}x{}", size.width, size.height);
                if size.is_empty() {
                    return;
                }
                if let Some(p) = &mut self.presenter {
                    if let Err(e) = p.resize(size) {
                        error!("swapchain recreation failed: {e:#}");
                    }
                }
            }

            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed && !event.repeat =>
            {
                let PhysicalKey::Code(code) = event.physical_key else {
                    return;
                };
                let Some(p) = &mut self.presenter else {
                    return;
                };
                match present_key(code) {
                    Some(PresentKey::ToggleVsync) => {
                        self.negotiation.vsync = !self.negotiation.vsync;
                        info!("vsync = {}", self.negotiation.vsync);
                        p.set_vsync(self.negotiation.vsync);
                    }
                    Some(PresentKey::CycleVsyncMode) => {
                        self.negotiation.vsync_mode = next_vsync_mode(self.negotiation.vsync_mode);
                        info!("vsync mode = {:?}", self.negotiation.vsync_mode);
                        p.set_vsync_mode(self.negotiation.vsync_mode);
                    }
                    None => {}
                }
            }

            _ => {}
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let (cfg, fallback) = load_or_default(&args.config);

    init_tracing(&cfg.debug.log_filter);
    if let Some(why) = fallback {
        warn!("{why}; using defaults");
    }

    let event_loop: EventLoop<()> = EventLoop::new()?;
    let mut app = App {
        negotiation: cfg.negotiation(args.validation),
        cfg,
        list_devices: args.list_devices,
        once: args.once,
        presenter: None,
        window: None,
        failure: None,
    };

    event_loop.run_app(&mut app)?;
    match app.failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
