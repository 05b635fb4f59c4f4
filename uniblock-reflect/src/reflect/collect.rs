use crate::error::ShaderReflectError;
use crate::reflect::{BlockRecord, UniformLocation, UniformRecord};
use std::fmt::Write;
use uniblock_common::{BindingStage, UniformType};

/// A per-uniform query on a linked program.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum UniformParam {
    BlockIndex,
    Offset,
    ArrayStride,
    MatrixStride,
    IsRowMajor,
}

/// A per-block query on a linked program.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BlockParam {
    DataSize,
    Binding,
    ReferencedByVertexShader,
    ReferencedByFragmentShader,
}

/// Name, type and array size of an active uniform.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ActiveUniform {
    pub name: String,
    /// The raw driver type enum.
    pub ty: u32,
    pub size: i32,
}

/// Introspection of a linked program, implemented by graphics backends.
pub trait ReflectProgram {
    fn link_status(&self) -> bool;

    fn active_uniforms(&self) -> u32;

    /// Query the active uniform at `index`. `None` if the driver reports nothing.
    fn uniform_info(&self, index: u32) -> Option<ActiveUniform>;

    fn uniform_param(&self, index: u32, param: UniformParam) -> i32;

    fn uniform_location(&self, name: &str) -> Option<u32>;

    fn active_blocks(&self) -> u32;

    fn block_name(&self, index: u32) -> String;

    fn block_param(&self, index: u32, param: BlockParam) -> i32;
}

/// Read every active uniform and block of a linked program, in driver order.
pub fn collect(
    program: &impl ReflectProgram,
) -> Result<(Vec<UniformRecord>, Vec<BlockRecord>), ShaderReflectError> {
    if !program.link_status() {
        return Err(ShaderReflectError::ProgramNotLinked);
    }

    let mut uniforms = Vec::new();
    for index in 0..program.active_uniforms() {
        let Some(info) = program.uniform_info(index) else {
            log::warn!("active uniform {index} could not be queried");
            continue;
        };

        let block_index = program.uniform_param(index, UniformParam::BlockIndex);
        let location = if block_index < 0 {
            program.uniform_location(&info.name).map(UniformLocation)
        } else {
            None
        };

        uniforms.push(UniformRecord {
            ty: UniformType::from(info.ty),
            size: info.size.max(1) as u32,
            block_index,
            offset: program.uniform_param(index, UniformParam::Offset),
            array_stride: program.uniform_param(index, UniformParam::ArrayStride),
            matrix_stride: program.uniform_param(index, UniformParam::MatrixStride),
            row_major: program.uniform_param(index, UniformParam::IsRowMajor) != 0,
            location,
            name: info.name,
        });
    }

    let mut blocks = Vec::new();
    for index in 0..program.active_blocks() {
        let stages = BindingStage::from_referenced(
            program.block_param(index, BlockParam::ReferencedByVertexShader) != 0,
            program.block_param(index, BlockParam::ReferencedByFragmentShader) != 0,
        );

        blocks.push(BlockRecord {
            name: program.block_name(index),
            index,
            byte_size: program.block_param(index, BlockParam::DataSize).max(0) as u32,
            binding: program.block_param(index, BlockParam::Binding).max(0) as u32,
            stages,
        });
    }

    log::debug!(
        "collected {} uniforms in {} blocks",
        uniforms.len(),
        blocks.len()
    );
    Ok((uniforms, blocks))
}

fn format_uniform(out: &mut String, record: &UniformRecord) {
    // Writing to a String cannot fail.
    let _ = writeln!(
        out,
        "{} : {} x {} offset: {} arrayStride: {} matrixStride: {} rowMajor: {}",
        record.name,
        record.size,
        record.ty,
        record.offset,
        record.array_stride,
        record.matrix_stride,
        record.row_major
    );
}

/// Render a listing of the records: plain uniforms first, then each block with
/// its members in offset order.
pub fn dump_uniforms(records: &[UniformRecord], blocks: &[BlockRecord]) -> String {
    let mut out = String::new();
    for record in records.iter().filter(|r| !r.is_block_member()) {
        format_uniform(&mut out, record);
    }

    for block in blocks {
        let _ = writeln!(
            out,
            "{} (binding: {}, size: {})",
            block.name, block.binding, block.byte_size
        );
        let mut members: Vec<&UniformRecord> = records
            .iter()
            .filter(|r| i64::from(r.block_index) == i64::from(block.index))
            .collect();
        members.sort_by_key(|r| r.offset);
        for record in members {
            out.push_str("    ");
            format_uniform(&mut out, record);
        }
    }
    out
}
