use crate::reflect::collect::{ActiveUniform, BlockParam, ReflectProgram, UniformParam};
use glow::HasContext;

/// A linked program on a `glow` context.
pub struct GlowProgram<'a> {
    ctx: &'a glow::Context,
    program: glow::Program,
}

impl<'a> GlowProgram<'a> {
    /// Wrap a program handle. The context must be current on this thread.
    pub fn new(ctx: &'a glow::Context, program: glow::Program) -> Self {
        GlowProgram { ctx, program }
    }
}

impl ReflectProgram for GlowProgram<'_> {
    fn link_status(&self) -> bool {
        unsafe { self.ctx.get_program_link_status(self.program) }
    }

    fn active_uniforms(&self) -> u32 {
        unsafe { self.ctx.get_active_uniforms(self.program) }
    }

    fn uniform_info(&self, index: u32) -> Option<ActiveUniform> {
        let uniform = unsafe { self.ctx.get_active_uniform(self.program, index) }?;
        Some(ActiveUniform {
            name: uniform.name,
            ty: uniform.utype,
            size: uniform.size,
        })
    }

    fn uniform_param(&self, index: u32, param: UniformParam) -> i32 {
        let pname = match param {
            UniformParam::BlockIndex => glow::UNIFORM_BLOCK_INDEX,
            UniformParam::Offset => glow::UNIFORM_OFFSET,
            UniformParam::ArrayStride => glow::UNIFORM_ARRAY_STRIDE,
            UniformParam::MatrixStride => glow::UNIFORM_MATRIX_STRIDE,
            UniformParam::IsRowMajor => glow::UNIFORM_IS_ROW_MAJOR,
        };
        let values = unsafe {
            self.ctx
                .get_active_uniforms_parameter(self.program, &[index], pname)
        };
        values.first().copied().unwrap_or(-1)
    }

    fn uniform_location(&self, name: &str) -> Option<u32> {
        unsafe { self.ctx.get_uniform_location(self.program, name) }.map(|location| location.0)
    }

    fn active_blocks(&self) -> u32 {
        let count = unsafe {
            self.ctx
                .get_program_parameter_i32(self.program, glow::ACTIVE_UNIFORM_BLOCKS)
        };
        count.max(0) as u32
    }

    fn block_name(&self, index: u32) -> String {
        unsafe { self.ctx.get_active_uniform_block_name(self.program, index) }
    }

    fn block_param(&self, index: u32, param: BlockParam) -> i32 {
        let pname = match param {
            BlockParam::DataSize => glow::UNIFORM_BLOCK_DATA_SIZE,
            BlockParam::Binding => glow::UNIFORM_BLOCK_BINDING,
            BlockParam::ReferencedByVertexShader => {
                glow::UNIFORM_BLOCK_REFERENCED_BY_VERTEX_SHADER
            }
            BlockParam::ReferencedByFragmentShader => {
                glow::UNIFORM_BLOCK_REFERENCED_BY_FRAGMENT_SHADER
            }
        };
        unsafe {
            self.ctx
                .get_active_uniform_block_parameter_i32(self.program, index, pname)
        }
    }
}
