use anyhow::{Context, Result};

use crate::viewport::Viewport;

/// Render target format for offscreen frames.
///
/// Non-sRGB so draw colors land in the readback byte-exact, and universally
/// supported as a render attachment.
pub const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// GPU context rendering to an offscreen texture instead of a surface.
///
/// Owns Device/Queue plus the target texture; frames are committed with
/// [`HeadlessGpu::submit`] and fetched with [`HeadlessGpu::read_pixels`].
pub struct HeadlessGpu {
    device: wgpu::Device,
    queue: wgpu::Queue,
    target: wgpu::Texture,
    view: wgpu::TextureView,
    extent: Viewport,

    /// Device limit on vertex attributes, queried once at construction.
    max_vertex_attributes: u32,
}

impl HeadlessGpu {
    /// Creates a GPU context with an offscreen target of the given extent.
    pub async fn new(extent: Viewport) -> Result<Self> {
        anyhow::ensure!(extent.is_renderable(), "target has zero size");

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // No surface to be compatible with; software adapters are acceptable
        // for file export.
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let info = adapter.get_info();
        log::debug!("adapter: {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("oresme-wgpu headless device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let max_vertex_attributes = device.limits().max_vertex_attributes;
        log::debug!("maximum nr of vertex attributes supported: {max_vertex_attributes}");

        let (target, view) = make_target(&device, extent);

        Ok(HeadlessGpu {
            device,
            queue,
            target,
            view,
            extent,
            max_vertex_attributes,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn extent(&self) -> Viewport {
        self.extent
    }

    /// Device limit on vertex attributes, queried once at construction.
    pub fn max_vertex_attributes(&self) -> u32 {
        self.max_vertex_attributes
    }

    /// Recreates the target texture at a new extent.
    ///
    /// Non-renderable extents are ignored; the previous target stays valid.
    pub fn resize(&mut self, extent: Viewport) {
        if !extent.is_renderable() || extent == self.extent {
            return;
        }

        let (target, view) = make_target(&self.device, extent);
        self.target = target;
        self.view = view;
        self.extent = extent;
    }

    /// Creates an encoder for one offscreen frame.
    pub fn begin_frame(&self) -> wgpu::CommandEncoder {
        self.device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("oresme offscreen encoder"),
            })
    }

    /// Submits the recorded commands.
    pub fn submit(&self, encoder: wgpu::CommandEncoder) {
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Reads the target back as tightly packed RGBA8 rows, top row first.
    ///
    /// Blocks until the copy completes. Must run after the frame's commands
    /// have been submitted.
    pub fn read_pixels(&self) -> Result<Vec<u8>> {
        let width = self.extent.width;
        let height = self.extent.height;
        let bytes_per_row = padded_bytes_per_row(width);
        let buffer_size = u64::from(bytes_per_row) * u64::from(height);

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("oresme readback"),
            size: buffer_size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("oresme readback encoder"),
            });

        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.target,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );

        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            tx.send(result).ok();
        });
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .context("failed to wait for readback")?;
        rx.recv()
            .context("readback mapping was dropped")?
            .context("failed to map readback buffer")?;

        // Rows are padded to the copy alignment; repack them tightly.
        let row_bytes = (width as usize) * 4;
        let mut pixels = vec![0u8; row_bytes * height as usize];
        {
            let data = slice.get_mapped_range();
            for y in 0..height as usize {
                let src = y * bytes_per_row as usize;
                pixels[y * row_bytes..(y + 1) * row_bytes]
                    .copy_from_slice(&data[src..src + row_bytes]);
            }
        }
        buffer.unmap();

        Ok(pixels)
    }
}

fn make_target(device: &wgpu::Device, extent: Viewport) -> (wgpu::Texture, wgpu::TextureView) {
    let target = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("oresme offscreen target"),
        size: wgpu::Extent3d {
            width: extent.width,
            height: extent.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TARGET_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let view = target.create_view(&wgpu::TextureViewDescriptor::default());
    (target, view)
}

fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * 4;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::record_clear;
    use oresme_backend::Color;

    /// Builds a context, or skips the calling test when no adapter exists.
    fn gpu(width: u32, height: u32) -> Option<HeadlessGpu> {
        match pollster::block_on(HeadlessGpu::new(Viewport::new(width, height))) {
            Ok(gpu) => Some(gpu),
            Err(e) => {
                eprintln!("skipping GPU test: {e:#}");
                None
            }
        }
    }

    #[test]
    fn padded_rows_are_aligned() {
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        for width in [1, 63, 64, 100, 560, 1920] {
            let padded = padded_bytes_per_row(width);
            assert_eq!(padded % align, 0);
            assert!(padded >= width * 4);
            assert!(padded - width * 4 < align);
        }
    }

    #[test]
    fn readback_blocks_until_mapped_and_depads_rows() {
        // 61 px rows take 244 bytes, so the copy pads them to 256.
        let Some(gpu) = gpu(61, 7) else {
            return;
        };

        let mut encoder = gpu.begin_frame();
        record_clear(&mut encoder, gpu.view(), Color::opaque(0.0, 1.0, 0.0));
        gpu.submit(encoder);

        let pixels = gpu.read_pixels().unwrap();
        assert_eq!(pixels.len(), 61 * 7 * 4);
        assert!(pixels.chunks_exact(4).all(|px| px == [0, 255, 0, 255]));
    }
}
