use uniblock_common::ScalarKind;

/// A borrowed uniform value, one or more elements flattened into components.
///
/// Matrices are given column by column.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue<'a> {
    Float(&'a [f32]),
    Int(&'a [i32]),
    UInt(&'a [u32]),
    Bool(&'a [bool]),
}

impl UniformValue<'_> {
    /// The number of components.
    pub fn len(&self) -> usize {
        match self {
            UniformValue::Float(v) => v.len(),
            UniformValue::Int(v) => v.len(),
            UniformValue::UInt(v) => v.len(),
            UniformValue::Bool(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> ScalarKind {
        match self {
            UniformValue::Float(_) => ScalarKind::Float,
            UniformValue::Int(_) => ScalarKind::Int,
            UniformValue::UInt(_) => ScalarKind::UInt,
            UniformValue::Bool(_) => ScalarKind::Bool,
        }
    }

    pub fn to_data(&self) -> UniformData {
        match *self {
            UniformValue::Float(v) => UniformData::Float(v.to_vec()),
            UniformValue::Int(v) => UniformData::Int(v.to_vec()),
            UniformValue::UInt(v) => UniformData::UInt(v.to_vec()),
            UniformValue::Bool(v) => UniformData::Bool(v.to_vec()),
        }
    }
}

/// An owned uniform value, as cached by setters and returned by block reads.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformData {
    Float(Vec<f32>),
    Int(Vec<i32>),
    UInt(Vec<u32>),
    Bool(Vec<bool>),
}

impl UniformData {
    pub fn as_value(&self) -> UniformValue<'_> {
        match self {
            UniformData::Float(v) => UniformValue::Float(v),
            UniformData::Int(v) => UniformValue::Int(v),
            UniformData::UInt(v) => UniformValue::UInt(v),
            UniformData::Bool(v) => UniformValue::Bool(v),
        }
    }
}

macro_rules! impl_from_value {
    ($($ty:ty => $variant:ident),*) => {
        $(
            impl<'a> From<&'a [$ty]> for UniformValue<'a> {
                fn from(value: &'a [$ty]) -> Self {
                    UniformValue::$variant(value)
                }
            }

            impl<'a, const N: usize> From<&'a [$ty; N]> for UniformValue<'a> {
                fn from(value: &'a [$ty; N]) -> Self {
                    UniformValue::$variant(value)
                }
            }

            impl<'a> From<&'a $ty> for UniformValue<'a> {
                fn from(value: &'a $ty) -> Self {
                    UniformValue::$variant(std::slice::from_ref(value))
                }
            }
        )*
    };
}

impl_from_value!(f32 => Float, i32 => Int, u32 => UInt, bool => Bool);

/// The scalar kind a uniform type accepts through setters. Samplers take integers.
pub(crate) fn accepted_kind(kind: ScalarKind) -> ScalarKind {
    match kind {
        ScalarKind::Sampler => ScalarKind::Int,
        kind => kind,
    }
}
