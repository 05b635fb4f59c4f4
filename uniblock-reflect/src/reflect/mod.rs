use uniblock_common::{BindingStage, UniformType};

/// Reflection record collection from a linked program.
pub mod collect;
/// Block layout reconstruction.
pub mod layout;
/// The uniform type model.
pub mod model;

#[cfg(feature = "gl")]
/// Reflection through a `glow` context.
pub mod gl;

mod definition;
mod path;

pub use definition::*;
pub use path::*;

/// A location handle for a uniform outside any block.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct UniformLocation(pub u32);

/// An active uniform as reported by the driver.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformRecord {
    /// The dotted and bracketed name, such as `uBlock.shapes[2].color`.
    pub name: String,
    pub ty: UniformType,
    /// The number of array elements, at least 1.
    pub size: u32,
    /// The index of the owning block, or -1.
    pub block_index: i32,
    /// Byte offset within the owning block.
    pub offset: i32,
    pub array_stride: i32,
    pub matrix_stride: i32,
    pub row_major: bool,
    /// Only present for uniforms outside any block.
    pub location: Option<UniformLocation>,
}

impl UniformRecord {
    /// A record for a uniform outside any block.
    pub fn plain(name: impl Into<String>, ty: UniformType, size: u32, location: u32) -> Self {
        UniformRecord {
            name: name.into(),
            ty,
            size,
            block_index: -1,
            offset: -1,
            array_stride: -1,
            matrix_stride: -1,
            row_major: false,
            location: Some(UniformLocation(location)),
        }
    }

    /// A record for a uniform inside the block with the given index.
    pub fn in_block(
        name: impl Into<String>,
        ty: UniformType,
        size: u32,
        block_index: u32,
        offset: u32,
    ) -> Self {
        UniformRecord {
            name: name.into(),
            ty,
            size,
            block_index: block_index as i32,
            offset: offset as i32,
            array_stride: 0,
            matrix_stride: 0,
            row_major: false,
            location: None,
        }
    }

    pub fn with_array_stride(mut self, stride: u32) -> Self {
        self.array_stride = stride as i32;
        self
    }

    pub fn with_matrix_stride(mut self, stride: u32, row_major: bool) -> Self {
        self.matrix_stride = stride as i32;
        self.row_major = row_major;
        self
    }

    pub fn is_block_member(&self) -> bool {
        self.block_index >= 0
    }
}

/// An active uniform block as reported by the driver.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct BlockRecord {
    pub name: String,
    /// The driver block index uniforms refer to.
    pub index: u32,
    /// The driver-reported size, including trailing padding.
    pub byte_size: u32,
    pub binding: u32,
    pub stages: BindingStage,
}

impl BlockRecord {
    pub fn new(name: impl Into<String>, index: u32, byte_size: u32) -> Self {
        BlockRecord {
            name: name.into(),
            index,
            byte_size,
            binding: 0,
            stages: BindingStage::VERTEX | BindingStage::FRAGMENT,
        }
    }

    pub fn with_binding(mut self, binding: u32) -> Self {
        self.binding = binding;
        self
    }

    pub fn with_stages(mut self, stages: BindingStage) -> Self {
        self.stages = stages;
        self
    }

    /// The block name without an instance array index, `Lights` for `Lights[1]`.
    pub fn base_name(&self) -> &str {
        match self.name.find('[') {
            Some(bracket) => &self.name[..bracket],
            None => &self.name,
        }
    }
}
