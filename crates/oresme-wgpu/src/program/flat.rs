use oresme_backend::{BackendError, ShaderStage};

use super::reflect::{compile_stage, BlockBinding, ProgramInterface, UniformSlot};

pub const VERT_SOURCE: &str = include_str!("shaders/flat.vert.wgsl");
pub const FRAG_SOURCE: &str = include_str!("shaders/flat.frag.wgsl");

/// Uniform names exposed by the flat-color shader pair.
pub const U_WINDOW_WIDTH: &str = "windowWidth";
pub const U_WINDOW_HEIGHT: &str = "windowHeight";
pub const U_COLOR: &str = "color";

/// Flat-color program: one shader pair, validated and reflected up front,
/// baked into two pipelines (wgpu fixes the primitive topology per pipeline).
///
/// Shader diagnostics are produced CPU-side before the device ever sees the
/// source, so a broken shader fails construction with a readable
/// [`BackendError::ShaderCompile`]/[`BackendError::ShaderLink`] instead of a
/// device validation panic.
pub struct FlatColorProgram {
    interface: ProgramInterface,
    bind_group_layout: wgpu::BindGroupLayout,
    fill: wgpu::RenderPipeline,
    stroke: wgpu::RenderPipeline,
}

impl FlatColorProgram {
    /// Compiles both stage sources, links them and bakes the pipelines for
    /// the given target format.
    ///
    /// The intermediate stage modules are dropped on return; only the linked
    /// program survives.
    pub fn compile_and_link(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<Self, BackendError> {
        let vert = compile_stage(ShaderStage::Vertex, vertex_source)?;
        let frag = compile_stage(ShaderStage::Fragment, fragment_source)?;
        let interface = ProgramInterface::link(&vert, &frag)?;
        require_flat_block(&interface)?;

        let vs_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("oresme flat vertex shader"),
            source: wgpu::ShaderSource::Wgsl(vertex_source.into()),
        });
        let fs_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("oresme flat fragment shader"),
            source: wgpu::ShaderSource::Wgsl(fragment_source.into()),
        });

        let entries: Vec<wgpu::BindGroupLayoutEntry> = interface
            .blocks()
            .iter()
            .map(|b| wgpu::BindGroupLayoutEntry {
                binding: b.binding.binding,
                visibility: b.visibility,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(u64::from(b.size)),
                },
                count: None,
            })
            .collect();

        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("oresme flat bgl"),
                entries: &entries,
            });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("oresme flat pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            // Newer wgpu uses immediate constants; keep disabled.
            immediate_size: 0,
        });

        let fill = make_pipeline(
            device,
            &pipeline_layout,
            &vs_module,
            &fs_module,
            format,
            wgpu::PrimitiveTopology::TriangleList,
            "oresme flat fill pipeline",
        );
        let stroke = make_pipeline(
            device,
            &pipeline_layout,
            &vs_module,
            &fs_module,
            format,
            wgpu::PrimitiveTopology::LineStrip,
            "oresme flat stroke pipeline",
        );

        Ok(FlatColorProgram {
            interface,
            bind_group_layout,
            fill,
            stroke,
        })
    }

    /// Resolves a uniform by name; unknown names are a hard error.
    pub fn uniform(&self, name: &str) -> Result<UniformSlot, BackendError> {
        self.interface.uniform(name)
    }

    pub fn interface(&self) -> &ProgramInterface {
        &self.interface
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }

    /// Pipeline for indexed triangle-list geometry (rectangle fills).
    pub fn fill_pipeline(&self) -> &wgpu::RenderPipeline {
        &self.fill
    }

    /// Pipeline for line-strip geometry (paths).
    pub fn stroke_pipeline(&self) -> &wgpu::RenderPipeline {
        &self.stroke
    }
}

/// The flat-color contract: exactly one uniform block, bound at group 0,
/// binding 0. Draw recording relies on this when it builds bind groups.
fn require_flat_block(interface: &ProgramInterface) -> Result<(), BackendError> {
    let expected = BlockBinding {
        group: 0,
        binding: 0,
    };
    match interface.blocks() {
        [block] if block.binding == expected => Ok(()),
        _ => Err(BackendError::ShaderLink {
            log: "program must expose a single uniform block at group 0, binding 0".to_string(),
        }),
    }
}

const POSITION_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

/// Vertex layout shared by both pipelines: interleaved `[x, y]` pairs in
/// device space.
pub fn position_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: (std::mem::size_of::<f32>() * 2) as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &POSITION_ATTRS,
    }
}

fn straight_alpha_blend() -> wgpu::BlendState {
    wgpu::BlendState::ALPHA_BLENDING
}

fn make_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    vs_module: &wgpu::ShaderModule,
    fs_module: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    topology: wgpu::PrimitiveTopology,
    label: &str,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),

        vertex: wgpu::VertexState {
            module: vs_module,
            entry_point: Some(super::reflect::VS_ENTRY),
            compilation_options: Default::default(),
            buffers: &[position_layout()],
        },

        fragment: Some(wgpu::FragmentState {
            module: fs_module,
            entry_point: Some(super::reflect::FS_ENTRY),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(straight_alpha_blend()),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),

        primitive: wgpu::PrimitiveState {
            topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },

        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),

        // Newer wgpu field names:
        multiview_mask: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // The embedded sources compile, link and expose the expected interface —
    // all CPU-side, no device involved.

    #[test]
    fn embedded_sources_compile() {
        assert!(compile_stage(ShaderStage::Vertex, VERT_SOURCE).is_ok());
        assert!(compile_stage(ShaderStage::Fragment, FRAG_SOURCE).is_ok());
    }

    #[test]
    fn embedded_sources_link_as_one_block() {
        let vert = compile_stage(ShaderStage::Vertex, VERT_SOURCE).unwrap();
        let frag = compile_stage(ShaderStage::Fragment, FRAG_SOURCE).unwrap();
        let interface = ProgramInterface::link(&vert, &frag).unwrap();

        assert_eq!(interface.blocks().len(), 1);
        let block = &interface.blocks()[0];
        assert_eq!(block.binding, BlockBinding { group: 0, binding: 0 });
        assert_eq!(
            block.visibility,
            wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT
        );
    }

    #[test]
    fn embedded_sources_expose_expected_uniforms() {
        let vert = compile_stage(ShaderStage::Vertex, VERT_SOURCE).unwrap();
        let frag = compile_stage(ShaderStage::Fragment, FRAG_SOURCE).unwrap();
        let interface = ProgramInterface::link(&vert, &frag).unwrap();

        for name in [U_WINDOW_WIDTH, U_WINDOW_HEIGHT, U_COLOR] {
            assert!(interface.uniform(name).is_ok(), "missing uniform {name}");
        }
    }

    #[test]
    fn block_outside_slot_zero_violates_the_contract() {
        const VERT: &str = r#"
            struct Uniforms {
                windowWidth: f32,
                windowHeight: f32,
                color: vec4<f32>,
            }

            @group(0) @binding(1)
            var<uniform> uniforms: Uniforms;

            @vertex
            fn vs_main(@location(0) position: vec2<f32>) -> @builtin(position) vec4<f32> {
                let x = position.x / uniforms.windowWidth * 2.0 - 1.0;
                let y = 1.0 - position.y / uniforms.windowHeight * 2.0;
                return vec4<f32>(x, y, 0.0, 1.0);
            }
        "#;
        const FRAG: &str = r#"
            struct Uniforms {
                windowWidth: f32,
                windowHeight: f32,
                color: vec4<f32>,
            }

            @group(0) @binding(1)
            var<uniform> uniforms: Uniforms;

            @fragment
            fn fs_main() -> @location(0) vec4<f32> {
                return uniforms.color;
            }
        "#;

        let vert = compile_stage(ShaderStage::Vertex, VERT).unwrap();
        let frag = compile_stage(ShaderStage::Fragment, FRAG).unwrap();
        let interface = ProgramInterface::link(&vert, &frag).unwrap();

        let err = require_flat_block(&interface).unwrap_err();
        assert!(matches!(err, BackendError::ShaderLink { .. }));
    }
}
