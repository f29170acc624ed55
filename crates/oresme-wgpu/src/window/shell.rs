use std::time::Duration;

use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowId};

use crate::device::{Gpu, GpuInit};

/// Window configuration.
#[derive(Debug, Clone)]
pub struct WindowConfig {
    pub title: String,
    pub initial_size: PhysicalSize<u32>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "oresme".to_string(),
            initial_size: PhysicalSize::new(560, 420),
        }
    }
}

#[self_referencing]
struct WindowEntry {
    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

/// Event-loop state driven by [`WindowShell::pump`].
///
/// Unlike a `run_app` runtime, nothing here renders: events only mutate
/// state (close request, surface reconfiguration) and control returns to the
/// caller, which draws through the backend between pumps.
struct ShellState {
    config: WindowConfig,
    gpu_init: GpuInit,

    entry: Option<WindowEntry>,
    close_requested: bool,
    init_error: Option<anyhow::Error>,
}

impl ShellState {
    fn create_entry(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let gpu_init = self.gpu_init.clone();
        let entry = WindowEntryTryBuilder {
            window,
            gpu_builder: |w| pollster::block_on(Gpu::new(w, gpu_init)),
        }
        .try_build()
        .context("failed to initialize GPU for window")?;

        self.entry = Some(entry);
        Ok(())
    }
}

impl ApplicationHandler for ShellState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_some() {
            return;
        }

        if let Err(e) = self.create_entry(event_loop) {
            log::error!("window initialization failed: {e:#}");
            self.init_error = Some(e);
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(entry) = self.entry.as_mut() else {
            return;
        };
        if entry.with_window(|w| w.id()) != window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                self.close_requested = true;
            }

            // Escape dismisses the plot window, like the close button.
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                self.close_requested = true;
            }

            WindowEvent::Resized(new_size) => {
                entry.with_gpu_mut(|gpu| gpu.resize(new_size));
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                let new_size = entry.with_window(|w| w.inner_size());
                entry.with_gpu_mut(|gpu| gpu.resize(new_size));
            }

            _ => {}
        }
    }
}

/// Owns the winit event loop and the single plot window + GPU pair.
///
/// The shell is pumped, not run: callers drive it with [`WindowShell::pump`]
/// (typically once per frame) and block with
/// [`WindowShell::pump_until_dismissed`] when waiting for the user to close
/// the window.
pub struct WindowShell {
    // Dropped before the event loop; the window must not outlive it.
    state: ShellState,
    event_loop: EventLoop<()>,
}

impl WindowShell {
    /// Creates the event loop, the window and its GPU context.
    ///
    /// Pumps the loop until the windowing system has delivered the
    /// creation events, so the window is fully usable on return.
    pub fn new(config: WindowConfig, gpu_init: GpuInit) -> Result<Self> {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;

        let mut shell = WindowShell {
            state: ShellState {
                config,
                gpu_init,
                entry: None,
                close_requested: false,
                init_error: None,
            },
            event_loop,
        };

        shell.pump();
        if let Some(e) = shell.state.init_error.take() {
            return Err(e);
        }
        anyhow::ensure!(
            shell.state.entry.is_some(),
            "event loop did not deliver window creation"
        );

        Ok(shell)
    }

    /// Processes pending events without blocking.
    ///
    /// Returns `false` once the event loop has exited.
    pub fn pump(&mut self) -> bool {
        match self
            .event_loop
            .pump_app_events(Some(Duration::ZERO), &mut self.state)
        {
            PumpStatus::Continue => true,
            PumpStatus::Exit(_) => {
                self.state.close_requested = true;
                false
            }
        }
    }

    /// Blocks until the window is dismissed (close button or Escape), then
    /// destroys it.
    pub fn pump_until_dismissed(&mut self) {
        while !self.state.close_requested {
            let status = self
                .event_loop
                .pump_app_events(Some(Duration::from_millis(50)), &mut self.state);
            if let PumpStatus::Exit(_) = status {
                break;
            }
        }

        self.state.entry = None;
        log::debug!("plot window dismissed");
    }

    /// Whether the user has asked to close the window.
    pub fn close_requested(&self) -> bool {
        self.state.close_requested
    }

    /// Whether the window is still alive.
    pub fn is_open(&self) -> bool {
        self.state.entry.is_some()
    }

    pub fn with_window<R>(&self, f: impl FnOnce(&Window) -> R) -> Option<R> {
        self.state.entry.as_ref().map(|e| e.with_window(|w| f(w)))
    }

    pub fn with_gpu<R>(&self, f: impl FnOnce(&Gpu<'_>) -> R) -> Option<R> {
        self.state.entry.as_ref().map(|e| e.with_gpu(|gpu| f(gpu)))
    }

    pub fn with_gpu_mut<R>(&mut self, f: impl FnOnce(&mut Gpu<'_>) -> R) -> Option<R> {
        self.state
            .entry
            .as_mut()
            .map(|e| e.with_gpu_mut(|gpu| f(gpu)))
    }
}
