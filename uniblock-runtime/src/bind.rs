use crate::block::{BlockField, BoundBlock};
use crate::driver::UniformDriver;
use crate::error::{BindingIncompleteError, ValueError};
use crate::program::ProgramUniform;
use crate::value::UniformValue;
use uniblock_common::map::FastHashMap;
use uniblock_reflect::error::UnsupportedTypeError;
use uniblock_reflect::reflect::layout::{layout_table, LayoutKind};
use uniblock_reflect::reflect::model::ProgramUniforms;
use uniblock_reflect::reflect::UniformStorage;

/// Live accessors for every uniform of a program.
#[derive(Debug, Clone)]
pub struct BoundUniforms {
    uniforms: FastHashMap<String, ProgramUniform>,
    blocks: FastHashMap<String, BoundBlock>,
}

/// Create accessors for every uniform of the model.
///
/// Fails without creating any accessor if some leaf has a type that cannot be set:
/// unknown types anywhere, or samplers inside blocks.
pub fn bind(model: &ProgramUniforms) -> Result<BoundUniforms, BindingIncompleteError> {
    let mut unsupported = Vec::new();
    let mut uniforms = FastHashMap::default();

    for definition in model.definitions() {
        let UniformStorage::Program {
            location,
            row_major,
        } = definition.storage
        else {
            continue;
        };
        if !definition.ty.is_known() {
            unsupported.push(UnsupportedTypeError {
                path: definition.path.to_string(),
                ty: definition.ty,
            });
            continue;
        }

        let key = match definition.path.leaf().index {
            Some(0) => definition.path.without_leaf_index().to_string(),
            _ => definition.path.to_string(),
        };
        log::trace!("binding uniform `{key}`");
        uniforms.insert(
            key.clone(),
            ProgramUniform::new(key, definition.ty, definition.size, location, row_major),
        );
    }

    let mut blocks = FastHashMap::default();
    for (id, record) in model.blocks() {
        let Some(layout) = layout_table(model, id) else {
            continue;
        };

        let mut fields = Vec::new();
        for entry in layout.leaves() {
            let LayoutKind::Leaf { ty, .. } = entry.kind else {
                continue;
            };
            if !ty.is_known() || ty.is_sampler() {
                unsupported.push(UnsupportedTypeError {
                    path: format!("{}.{}", record.name, entry.path),
                    ty,
                });
                continue;
            }
            fields.extend(BlockField::from_entry(entry));
        }

        log::debug!(
            "binding block `{}` with {} fields in {} bytes",
            record.name,
            fields.len(),
            layout.bytes()
        );
        blocks.insert(record.name.clone(), BoundBlock::new(layout, fields));
    }

    if !unsupported.is_empty() {
        return Err(BindingIncompleteError { unsupported });
    }
    Ok(BoundUniforms { uniforms, blocks })
}

impl BoundUniforms {
    /// Look up a plain uniform. Arrays are keyed without the `[0]` suffix, but may be
    /// looked up with it.
    pub fn uniform(&self, name: &str) -> Option<&ProgramUniform> {
        self.uniforms
            .get(name)
            .or_else(|| self.uniforms.get(name.strip_suffix("[0]")?))
    }

    pub fn uniform_mut(&mut self, name: &str) -> Option<&mut ProgramUniform> {
        let key = match name.strip_suffix("[0]") {
            Some(stripped) if !self.uniforms.contains_key(name) => stripped,
            _ => name,
        };
        self.uniforms.get_mut(key)
    }

    pub fn uniforms(&self) -> impl Iterator<Item = &ProgramUniform> {
        self.uniforms.values()
    }

    /// Set a plain uniform through the driver.
    pub fn set<'v>(
        &mut self,
        driver: &mut impl UniformDriver,
        name: &str,
        value: impl Into<UniformValue<'v>>,
    ) -> Result<(), ValueError> {
        self.uniform_mut(name)
            .ok_or_else(|| ValueError::UnknownField(name.to_string()))?
            .set(driver, value)
    }

    /// The last value set on a plain uniform.
    pub fn get(&self, name: &str) -> Option<UniformValue<'_>> {
        self.uniform(name)?.get()
    }

    pub fn block(&self, name: &str) -> Option<&BoundBlock> {
        self.blocks.get(name)
    }

    pub fn block_mut(&mut self, name: &str) -> Option<&mut BoundBlock> {
        self.blocks.get_mut(name)
    }

    pub fn blocks(&self) -> impl Iterator<Item = &BoundBlock> {
        self.blocks.values()
    }

    pub fn blocks_mut(&mut self) -> impl Iterator<Item = &mut BoundBlock> {
        self.blocks.values_mut()
    }
}
