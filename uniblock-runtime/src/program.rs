use crate::driver::UniformDriver;
use crate::error::ValueError;
use crate::value::{accepted_kind, UniformData, UniformValue};
use uniblock_common::{ScalarKind, UniformType};
use uniblock_reflect::reflect::UniformLocation;

/// A setter for one uniform outside any block.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramUniform {
    path: String,
    ty: UniformType,
    /// The number of array elements.
    size: u32,
    location: UniformLocation,
    row_major: bool,
    value: Option<UniformData>,
}

impl ProgramUniform {
    pub(crate) fn new(
        path: String,
        ty: UniformType,
        size: u32,
        location: UniformLocation,
        row_major: bool,
    ) -> Self {
        ProgramUniform {
            path,
            ty,
            size: size.max(1),
            location,
            row_major,
            value: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn ty(&self) -> UniformType {
        self.ty
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn location(&self) -> UniformLocation {
        self.location
    }

    /// The last value set.
    pub fn get(&self) -> Option<UniformValue<'_>> {
        self.value.as_ref().map(UniformData::as_value)
    }

    /// Set the value through the driver. Arrays may be set with fewer elements than
    /// their size.
    pub fn set<'v>(
        &mut self,
        driver: &mut impl UniformDriver,
        value: impl Into<UniformValue<'v>>,
    ) -> Result<(), ValueError> {
        let value = value.into();
        let expected = self
            .ty
            .scalar_kind()
            .map(accepted_kind)
            .unwrap_or(ScalarKind::Float);
        let found = value.kind();
        // Booleans may also be given as integers.
        let compatible =
            found == expected || (expected == ScalarKind::Bool && found == ScalarKind::Int);
        if !compatible {
            return Err(ValueError::TypeMismatch {
                path: self.path.clone(),
                expected,
                found,
            });
        }

        let components = self.ty.component_count();
        if value.is_empty() || value.len() % components as usize != 0 {
            return Err(ValueError::ComponentMismatch {
                path: self.path.clone(),
                expected: components,
                found: value.len(),
            });
        }
        let elements = (value.len() / components as usize) as u32;
        if elements > self.size {
            return Err(ValueError::IndexOutOfRange {
                path: self.path.clone(),
                index: elements - 1,
                len: self.size,
            });
        }

        let location = self.location;
        match value {
            UniformValue::Float(values) if self.ty.is_matrix() => driver.uniform_matrix(
                location,
                self.ty.columns(),
                self.ty.rows(),
                self.row_major,
                values,
            ),
            UniformValue::Float(values) => driver.uniform_f32(location, components, values),
            UniformValue::Int(values) => driver.uniform_i32(location, components, values),
            UniformValue::UInt(values) => driver.uniform_u32(location, components, values),
            UniformValue::Bool(values) => {
                let values: Vec<i32> = values.iter().map(|&b| i32::from(b)).collect();
                driver.uniform_i32(location, components, &values)
            }
        }

        self.value = Some(value.to_data());
        Ok(())
    }
}
