use anyhow::{Context, Result};

use oresme_backend::{Backend, Color};
use oresme_wgpu::device::GpuInit;
use oresme_wgpu::logging::{init_logging, LoggingConfig};
use oresme_wgpu::offscreen::OffscreenBackend;
use oresme_wgpu::window::WindowConfig;
use oresme_wgpu::windowed::WindowedBackend;
use winit::dpi::PhysicalSize;

const WIDTH: u32 = 800;
const HEIGHT: u32 = 600;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let mut out = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--out" => out = Some(args.next().context("--out needs a file name")?),
            other => anyhow::bail!("unknown argument `{other}` (usage: oresme-demo [--out FILE])"),
        }
    }

    match out {
        Some(path) => export(&path),
        None => interactive(),
    }
}

fn interactive() -> Result<()> {
    let config = WindowConfig {
        title: "oresme demo".to_string(),
        initial_size: PhysicalSize::new(WIDTH, HEIGHT),
    };
    let mut backend = WindowedBackend::new(config, GpuInit::default())?;

    backend.new_frame()?;
    draw_scene(&mut backend)?;
    backend.render_data()?;

    log::info!("close the window or press Escape to exit");
    backend.wait();
    Ok(())
}

fn export(path: &str) -> Result<()> {
    let mut backend = OffscreenBackend::new(WIDTH, HEIGHT)?;
    if !backend.set_output(path)? {
        anyhow::bail!("`{path}` has no recognized image extension (png, jpg, bmp)");
    }

    backend.new_frame()?;
    draw_scene(&mut backend)?;
    backend.render_data()?;
    Ok(())
}

/// Draws a small chart: grid, sine curve, and translucent bars inside a
/// framed plot box. Coordinates are device pixels with the origin at the
/// bottom left.
fn draw_scene(backend: &mut dyn Backend) -> Result<()> {
    let width = f64::from(backend.width()?);
    let height = f64::from(backend.height()?);

    // Plot box margins.
    let (x1, x2) = (60.0, width - 30.0);
    let (y1, y2) = (50.0, height - 40.0);

    backend.draw_background(Color::opaque(0.96, 0.96, 0.98))?;
    backend.draw_rectangle(x1, x2, y1, y2, Color::opaque(1.0, 1.0, 1.0))?;

    // Grid.
    let grid = Color::opaque(0.85, 0.85, 0.88);
    for i in 1..8 {
        let x = x1 + (x2 - x1) * f64::from(i) / 8.0;
        backend.draw_path(&[x, x], &[y1, y2], grid)?;
    }
    for i in 1..6 {
        let y = y1 + (y2 - y1) * f64::from(i) / 6.0;
        backend.draw_path(&[x1, x2], &[y, y], grid)?;
    }

    // Translucent bars from the baseline.
    let bar_color = Color::new(0.35, 0.9, 0.55, 0.15);
    let heights = [0.35, 0.6, 0.45, 0.8, 0.55, 0.7, 0.4, 0.65];
    let slot = (x2 - x1) / heights.len() as f64;
    for (i, &h) in heights.iter().enumerate() {
        let left = x1 + slot * (i as f64 + 0.2);
        let right = x1 + slot * (i as f64 + 0.8);
        backend.draw_rectangle(left, right, y1, y1 + (y2 - y1) * h, bar_color)?;
    }

    // Sine curve across the box.
    let mid = (y1 + y2) / 2.0;
    let amplitude = (y2 - y1) * 0.35;
    let (mut xs, mut ys) = (Vec::new(), Vec::new());
    for i in 0..=200 {
        let t = f64::from(i) / 200.0;
        xs.push(x1 + (x2 - x1) * t);
        ys.push(mid + amplitude * (t * 4.0 * std::f64::consts::PI).sin());
    }
    backend.draw_path(&xs, &ys, Color::opaque(0.1, 0.35, 0.75))?;

    // Box outline last, over the grid and data.
    let frame = Color::opaque(0.25, 0.25, 0.3);
    backend.draw_path(&[x1, x2, x2, x1, x1], &[y1, y1, y2, y2, y1], frame)?;

    Ok(())
}
