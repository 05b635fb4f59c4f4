use crate::error::{ContractViolation, ShaderReflectError};
use crate::reflect::{BlockRecord, UniformLocation, UniformPath, UniformRecord};
use uniblock_common::UniformType;

/// Where the value of a uniform lives.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum UniformStorage {
    /// Set through the driver at a location.
    Program {
        location: UniformLocation,
        row_major: bool,
    },
    /// Stored in the buffer backing a block.
    Block {
        /// Position of the owning block in the block list of the model.
        block: usize,
        /// Absolute byte offset in the block.
        offset: u32,
        array_stride: u32,
        matrix_stride: u32,
        row_major: bool,
    },
}

/// A uniform record after ingestion, with its name parsed once.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct UniformDefinition {
    pub path: UniformPath,
    pub ty: UniformType,
    pub size: u32,
    pub storage: UniformStorage,
}

impl UniformDefinition {
    /// Ingest a record, resolving its block index against the block list.
    pub fn from_record(
        record: &UniformRecord,
        blocks: &[BlockRecord],
    ) -> Result<UniformDefinition, ShaderReflectError> {
        let path: UniformPath = record.name.parse().map_err(|_| {
            ShaderReflectError::ReflectionContractViolation(ContractViolation::InvalidName(
                record.name.clone(),
            ))
        })?;

        let storage = if record.is_block_member() {
            let block = blocks
                .iter()
                .position(|b| i64::from(b.index) == i64::from(record.block_index))
                .ok_or_else(|| {
                    ShaderReflectError::ReflectionContractViolation(
                        ContractViolation::UnknownBlockIndex {
                            uniform: record.name.clone(),
                            block_index: record.block_index,
                        },
                    )
                })?;
            UniformStorage::Block {
                block,
                offset: record.offset.max(0) as u32,
                array_stride: record.array_stride.max(0) as u32,
                matrix_stride: record.matrix_stride.max(0) as u32,
                row_major: record.row_major,
            }
        } else {
            let location = record.location.ok_or_else(|| {
                ShaderReflectError::ReflectionContractViolation(
                    ContractViolation::MissingLocation(record.name.clone()),
                )
            })?;
            UniformStorage::Program {
                location,
                row_major: record.row_major,
            }
        };

        if !record.ty.is_known() {
            log::warn!(
                "uniform `{}` has unrecognised type {}, keeping it as an unknown primitive",
                record.name,
                record.ty
            );
        }

        Ok(UniformDefinition {
            path,
            ty: record.ty,
            size: record.size.max(1),
            storage,
        })
    }

    /// The owning block position, if the uniform lives in a block.
    pub fn block(&self) -> Option<usize> {
        match self.storage {
            UniformStorage::Block { block, .. } => Some(block),
            UniformStorage::Program { .. } => None,
        }
    }

    /// The absolute byte offset in the owning block, zero outside blocks.
    pub fn offset(&self) -> u32 {
        match self.storage {
            UniformStorage::Block { offset, .. } => offset,
            UniformStorage::Program { .. } => 0,
        }
    }
}

#[cfg(test)]
mod test {
    use crate::error::{ContractViolation, ShaderReflectError};
    use crate::reflect::{
        BlockRecord, UniformDefinition, UniformLocation, UniformRecord, UniformStorage,
    };
    use uniblock_common::UniformType;

    #[test]
    fn ingests_plain_and_block_records() {
        let blocks = [BlockRecord::new("Frame", 3, 16)];
        let plain = UniformDefinition::from_record(
            &UniformRecord::plain("uTime", UniformType::Float, 1, 7),
            &blocks,
        )
        .unwrap();
        assert_eq!(
            plain.storage,
            UniformStorage::Program {
                location: UniformLocation(7),
                row_major: false,
            }
        );

        let member = UniformDefinition::from_record(
            &UniformRecord::in_block("Frame.time", UniformType::Float, 1, 3, 4),
            &blocks,
        )
        .unwrap();
        assert_eq!(member.block(), Some(0));
        assert_eq!(member.offset(), 4);
        assert_eq!(member.path.to_string(), "Frame.time");
    }

    #[test]
    fn unknown_block_index_violates_contract() {
        let err = UniformDefinition::from_record(
            &UniformRecord::in_block("x", UniformType::Float, 1, 2, 0),
            &[BlockRecord::new("Frame", 0, 16)],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ShaderReflectError::ReflectionContractViolation(
                ContractViolation::UnknownBlockIndex { block_index: 2, .. }
            )
        ));
    }
}
