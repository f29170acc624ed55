use wgpu::util::DeviceExt;

use oresme_backend::Color;

use crate::program::FlatColorProgram;

use super::stage::{DrawTopology, StagedDraw};

/// Records a clearing pass with the remapped background color.
///
/// `LoadOp::Clear` bypasses blending, so the complemented alpha lands in the
/// target verbatim.
pub fn record_clear(encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView, color: Color) {
    let [r, g, b, a] = color.to_shader_rgba();

    let _rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("oresme clear"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color {
                    r: r as f64,
                    g: g as f64,
                    b: b as f64,
                    a: a as f64,
                }),
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    });
}

/// Uploads one staged draw and records it as its own render pass.
///
/// Vertex, index and uniform buffers are created per call and dropped on
/// return; the pass keeps them alive until the submitted work completes, so
/// queued draws never alias one another's uniforms and nothing outlives its
/// frame.
pub fn record_draw(
    device: &wgpu::Device,
    encoder: &mut wgpu::CommandEncoder,
    view: &wgpu::TextureView,
    program: &FlatColorProgram,
    draw: &StagedDraw,
    uniforms: &[u8],
) {
    let vbo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("oresme draw vbo"),
        contents: bytemuck::cast_slice(&draw.vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });

    let bind_group = program.interface().blocks().first().map(|block| {
        let ubo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("oresme draw ubo"),
            contents: uniforms,
            usage: wgpu::BufferUsages::UNIFORM,
        });
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("oresme draw bind group"),
            layout: program.bind_group_layout(),
            entries: &[wgpu::BindGroupEntry {
                binding: block.binding.binding,
                resource: ubo.as_entire_binding(),
            }],
        })
    });

    let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("oresme draw pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Load,
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    });

    match draw.topology {
        DrawTopology::FillQuad => rpass.set_pipeline(program.fill_pipeline()),
        DrawTopology::Polyline => rpass.set_pipeline(program.stroke_pipeline()),
    }
    if let Some(bind_group) = bind_group.as_ref() {
        rpass.set_bind_group(0, bind_group, &[]);
    }
    rpass.set_vertex_buffer(0, vbo.slice(..));

    match &draw.indices {
        Some(indices) => {
            let ibo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("oresme draw ibo"),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });
            rpass.set_index_buffer(ibo.slice(..), wgpu::IndexFormat::Uint16);
            rpass.draw_indexed(0..draw.index_count(), 0, 0..1);
        }
        None => {
            rpass.draw(0..draw.vertex_count(), 0..1);
        }
    }
}
