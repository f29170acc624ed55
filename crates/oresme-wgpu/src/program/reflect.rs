use std::collections::HashMap;

use oresme_backend::{BackendError, ShaderStage};

/// Entry point names every program is linked against.
pub const VS_ENTRY: &str = "vs_main";
pub const FS_ENTRY: &str = "fs_main";

/// Uniform block address: bind group index + binding index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockBinding {
    pub group: u32,
    pub binding: u32,
}

/// One uniform block of a linked program.
#[derive(Debug, Clone)]
pub struct BlockLayout {
    pub binding: BlockBinding,
    /// Total block size in bytes, including interior padding.
    pub size: u32,
    /// Stages that declare the block.
    pub visibility: wgpu::ShaderStages,
}

/// Byte location of a named uniform inside a linked program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformSlot {
    /// Index into [`ProgramInterface::blocks`].
    pub block: usize,
    pub offset: u32,
    pub size: u32,
}

/// Uniform interface of a linked program, reflected from the shader IR.
///
/// Lookup is by name, like a classic GL uniform table, but misses are hard
/// errors: a shader edit that renames or drops a uniform surfaces as
/// [`BackendError::UniformNotFound`] at the first draw instead of silently
/// rendering garbage.
#[derive(Debug)]
pub struct ProgramInterface {
    blocks: Vec<BlockLayout>,
    uniforms: HashMap<String, UniformSlot>,
}

impl ProgramInterface {
    /// Merges the uniform interfaces of a validated vertex + fragment module
    /// pair, checking the same interface rules a program link would.
    ///
    /// Fails with [`BackendError::ShaderLink`] when an entry point is missing
    /// or the stages disagree about a block's layout.
    pub fn link(vertex: &naga::Module, fragment: &naga::Module) -> Result<Self, BackendError> {
        require_entry(vertex, naga::ShaderStage::Vertex, VS_ENTRY)?;
        require_entry(fragment, naga::ShaderStage::Fragment, FS_ENTRY)?;

        let mut blocks: Vec<BlockLayout> = Vec::new();
        let mut members: Vec<Vec<(String, u32, u32)>> = Vec::new();

        for (module, stage_bit) in [
            (vertex, wgpu::ShaderStages::VERTEX),
            (fragment, wgpu::ShaderStages::FRAGMENT),
        ] {
            for block in reflect_stage(module) {
                match blocks.iter().position(|b| b.binding == block.binding) {
                    Some(i) => {
                        if blocks[i].size != block.size || members[i] != block.members {
                            return Err(BackendError::ShaderLink {
                                log: format!(
                                    "uniform block at group {} binding {} has mismatched layouts \
                                     across stages",
                                    block.binding.group, block.binding.binding,
                                ),
                            });
                        }
                        blocks[i].visibility |= stage_bit;
                    }
                    None => {
                        blocks.push(BlockLayout {
                            binding: block.binding,
                            size: block.size,
                            visibility: stage_bit,
                        });
                        members.push(block.members);
                    }
                }
            }
        }

        let mut uniforms = HashMap::new();
        for (index, block_members) in members.iter().enumerate() {
            for (name, offset, size) in block_members {
                let slot = UniformSlot {
                    block: index,
                    offset: *offset,
                    size: *size,
                };
                if let Some(prev) = uniforms.insert(name.clone(), slot) {
                    if prev != slot {
                        return Err(BackendError::ShaderLink {
                            log: format!("uniform '{name}' is declared at conflicting locations"),
                        });
                    }
                }
            }
        }

        Ok(ProgramInterface { blocks, uniforms })
    }

    pub fn blocks(&self) -> &[BlockLayout] {
        &self.blocks
    }

    /// Resolves a uniform by name; unknown names are a hard error.
    pub fn uniform(&self, name: &str) -> Result<UniformSlot, BackendError> {
        self.uniforms
            .get(name)
            .copied()
            .ok_or_else(|| BackendError::UniformNotFound {
                name: name.to_owned(),
            })
    }
}

/// Parses and validates one WGSL stage source.
///
/// Both parse and validation failures surface as
/// [`BackendError::ShaderCompile`] carrying the stage tag and the full
/// diagnostic rendered against the source.
pub fn compile_stage(stage: ShaderStage, source: &str) -> Result<naga::Module, BackendError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| BackendError::ShaderCompile {
        stage,
        log: e.emit_to_string(source),
    })?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| BackendError::ShaderCompile {
        stage,
        log: e.emit_to_string(source),
    })?;

    Ok(module)
}

fn require_entry(
    module: &naga::Module,
    stage: naga::ShaderStage,
    name: &str,
) -> Result<(), BackendError> {
    let found = module
        .entry_points
        .iter()
        .any(|ep| ep.stage == stage && ep.name == name);
    if found {
        Ok(())
    } else {
        Err(BackendError::ShaderLink {
            log: format!("entry point '{name}' not found"),
        })
    }
}

struct StageBlock {
    binding: BlockBinding,
    size: u32,
    /// `(name, offset, size)` per member, in declaration order.
    members: Vec<(String, u32, u32)>,
}

/// Collects the uniform blocks declared by one module.
///
/// Struct-typed blocks contribute one entry per field; a non-struct uniform
/// variable contributes a single entry under the variable's own name.
fn reflect_stage(module: &naga::Module) -> Vec<StageBlock> {
    let mut out = Vec::new();

    for (_, var) in module.global_variables.iter() {
        if var.space != naga::AddressSpace::Uniform {
            continue;
        }
        let Some(res) = &var.binding else { continue };

        let ty = &module.types[var.ty];
        let size = ty.inner.size(module.to_ctx());

        let members = match &ty.inner {
            naga::TypeInner::Struct { members, .. } => members
                .iter()
                .filter_map(|m| {
                    let name = m.name.clone()?;
                    let m_size = module.types[m.ty].inner.size(module.to_ctx());
                    Some((name, m.offset, m_size))
                })
                .collect(),
            _ => match &var.name {
                Some(name) => vec![(name.clone(), 0, size)],
                None => Vec::new(),
            },
        };

        out.push(StageBlock {
            binding: BlockBinding {
                group: res.group,
                binding: res.binding,
            },
            size,
            members,
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERT: &str = r#"
        struct FlatUniforms {
            windowWidth: f32,
            windowHeight: f32,
            color: vec4<f32>,
        }

        @group(0) @binding(0) var<uniform> flat_uniforms: FlatUniforms;

        @vertex
        fn vs_main(@location(0) position: vec2<f32>) -> @builtin(position) vec4<f32> {
            let extent = vec2<f32>(flat_uniforms.windowWidth, flat_uniforms.windowHeight);
            let clip = position / extent * 2.0 - 1.0;
            return vec4<f32>(clip, 0.0, 1.0);
        }
    "#;

    const FRAG: &str = r#"
        struct FlatUniforms {
            windowWidth: f32,
            windowHeight: f32,
            color: vec4<f32>,
        }

        @group(0) @binding(0) var<uniform> flat_uniforms: FlatUniforms;

        @fragment
        fn fs_main() -> @location(0) vec4<f32> {
            return flat_uniforms.color;
        }
    "#;

    // ── compile_stage ─────────────────────────────────────────────────────

    #[test]
    fn compile_valid_stage() {
        assert!(compile_stage(ShaderStage::Vertex, VERT).is_ok());
        assert!(compile_stage(ShaderStage::Fragment, FRAG).is_ok());
    }

    #[test]
    fn compile_parse_error_carries_stage_and_log() {
        let err = compile_stage(ShaderStage::Vertex, "fn vs_main( {").unwrap_err();
        match err {
            BackendError::ShaderCompile { stage, log } => {
                assert_eq!(stage, ShaderStage::Vertex);
                assert!(!log.is_empty());
            }
            other => panic!("expected ShaderCompile, got {other:?}"),
        }
    }

    #[test]
    fn compile_validation_error_carries_stage_and_log() {
        // Parses fine, fails validation: uniform without a resource binding.
        let src = r#"
            var<uniform> u: f32;

            @fragment
            fn fs_main() -> @location(0) vec4<f32> {
                return vec4<f32>(u, 0.0, 0.0, 1.0);
            }
        "#;
        let err = compile_stage(ShaderStage::Fragment, src).unwrap_err();
        match err {
            BackendError::ShaderCompile { stage, log } => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert!(!log.is_empty());
            }
            other => panic!("expected ShaderCompile, got {other:?}"),
        }
    }

    // ── link ──────────────────────────────────────────────────────────────

    #[test]
    fn link_merges_shared_block() {
        let vert = compile_stage(ShaderStage::Vertex, VERT).unwrap();
        let frag = compile_stage(ShaderStage::Fragment, FRAG).unwrap();
        let interface = ProgramInterface::link(&vert, &frag).unwrap();

        assert_eq!(interface.blocks().len(), 1);
        let block = &interface.blocks()[0];
        assert_eq!(block.binding, BlockBinding { group: 0, binding: 0 });
        assert_eq!(block.size, 32);
        assert_eq!(
            block.visibility,
            wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT
        );
    }

    #[test]
    fn link_reflects_member_offsets() {
        let vert = compile_stage(ShaderStage::Vertex, VERT).unwrap();
        let frag = compile_stage(ShaderStage::Fragment, FRAG).unwrap();
        let interface = ProgramInterface::link(&vert, &frag).unwrap();

        let width = interface.uniform("windowWidth").unwrap();
        assert_eq!((width.offset, width.size), (0, 4));

        let height = interface.uniform("windowHeight").unwrap();
        assert_eq!((height.offset, height.size), (4, 4));

        // vec4 members align to 16 bytes.
        let color = interface.uniform("color").unwrap();
        assert_eq!((color.offset, color.size), (16, 16));
    }

    #[test]
    fn link_missing_fragment_entry_fails() {
        let vert = compile_stage(ShaderStage::Vertex, VERT).unwrap();
        let frag_src = FRAG.replace("fs_main", "main");
        let frag = compile_stage(ShaderStage::Fragment, &frag_src).unwrap();

        let err = ProgramInterface::link(&vert, &frag).unwrap_err();
        match err {
            BackendError::ShaderLink { log } => assert!(log.contains("fs_main")),
            other => panic!("expected ShaderLink, got {other:?}"),
        }
    }

    #[test]
    fn link_mismatched_block_layout_fails() {
        let vert = compile_stage(ShaderStage::Vertex, VERT).unwrap();
        let frag_src = r#"
            struct FlatUniforms {
                color: vec4<f32>,
            }

            @group(0) @binding(0) var<uniform> flat_uniforms: FlatUniforms;

            @fragment
            fn fs_main() -> @location(0) vec4<f32> {
                return flat_uniforms.color;
            }
        "#;
        let frag = compile_stage(ShaderStage::Fragment, frag_src).unwrap();

        let err = ProgramInterface::link(&vert, &frag).unwrap_err();
        assert!(matches!(err, BackendError::ShaderLink { .. }));
    }

    // ── uniform lookup ────────────────────────────────────────────────────

    #[test]
    fn unknown_uniform_is_a_hard_error() {
        let vert = compile_stage(ShaderStage::Vertex, VERT).unwrap();
        let frag = compile_stage(ShaderStage::Fragment, FRAG).unwrap();
        let interface = ProgramInterface::link(&vert, &frag).unwrap();

        let err = interface.uniform("ourColor").unwrap_err();
        match err {
            BackendError::UniformNotFound { name } => assert_eq!(name, "ourColor"),
            other => panic!("expected UniformNotFound, got {other:?}"),
        }
    }

    #[test]
    fn non_struct_uniform_uses_variable_name() {
        let vert_src = r#"
            @group(0) @binding(0) var<uniform> scale: f32;

            @vertex
            fn vs_main(@location(0) position: vec2<f32>) -> @builtin(position) vec4<f32> {
                return vec4<f32>(position * scale, 0.0, 1.0);
            }
        "#;
        let frag_src = r#"
            @fragment
            fn fs_main() -> @location(0) vec4<f32> {
                return vec4<f32>(1.0, 1.0, 1.0, 1.0);
            }
        "#;
        let vert = compile_stage(ShaderStage::Vertex, vert_src).unwrap();
        let frag = compile_stage(ShaderStage::Fragment, frag_src).unwrap();
        let interface = ProgramInterface::link(&vert, &frag).unwrap();

        let slot = interface.uniform("scale").unwrap();
        assert_eq!((slot.offset, slot.size), (0, 4));
    }
}
