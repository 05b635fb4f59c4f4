//! Common types shared by the uniblock crates.
//!
//! The central type is [`UniformType`], the set of uniform types a GLSL program can expose
//! through reflection, along with the shape information (scalar kind, vector width, matrix
//! dimensions) the layout and binding code needs.

/// Fast hash map aliases.
pub mod map;

mod stage;
pub use stage::BindingStage;

use std::fmt::{Display, Formatter};

/// The scalar component kind of a uniform type.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ScalarKind {
    /// 32-bit IEEE float.
    Float,
    /// 32-bit signed integer.
    Int,
    /// 32-bit unsigned integer.
    UInt,
    /// Boolean, stored as a 32-bit integer.
    Bool,
    /// Opaque sampler handle, set through the integer entry point.
    Sampler,
}

impl ScalarKind {
    /// The name of the Rust type that holds one component of this kind.
    pub fn rust_type(&self) -> &'static str {
        match self {
            ScalarKind::Float => "f32",
            ScalarKind::Int | ScalarKind::Sampler => "i32",
            ScalarKind::UInt => "u32",
            ScalarKind::Bool => "bool",
        }
    }
}

macro_rules! uniform_types {
    ($($variant:ident => ($gl:literal, $glsl:literal, $kind:ident, $columns:literal, $rows:literal)),* $(,)?) => {
        /// A uniform type as reported by the driver or declared in GLSL source.
        ///
        /// Matrix types follow the GLSL `matCxR` convention: `C` columns of `R` rows.
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
        pub enum UniformType {
            $(
                #[doc = concat!("`", $glsl, "`")]
                $variant,
            )*
            /// A type enum the engine does not recognise.
            Unknown(u32),
        }

        impl UniformType {
            /// The GL enum value of this type.
            pub fn gl_enum(&self) -> u32 {
                match self {
                    $(UniformType::$variant => $gl,)*
                    UniformType::Unknown(raw) => *raw,
                }
            }

            /// The GLSL keyword for this type, if it is known.
            pub fn glsl_name(&self) -> Option<&'static str> {
                match self {
                    $(UniformType::$variant => Some($glsl),)*
                    UniformType::Unknown(_) => None,
                }
            }

            /// Look up a type by its GLSL keyword.
            pub fn from_glsl_name(name: &str) -> Option<UniformType> {
                match name {
                    $($glsl => Some(UniformType::$variant),)*
                    _ => None,
                }
            }

            /// The scalar kind of the components, if the type is known.
            pub fn scalar_kind(&self) -> Option<ScalarKind> {
                match self {
                    $(UniformType::$variant => Some(ScalarKind::$kind),)*
                    UniformType::Unknown(_) => None,
                }
            }

            /// The number of columns. One for scalars and vectors.
            pub fn columns(&self) -> u32 {
                match self {
                    $(UniformType::$variant => $columns,)*
                    UniformType::Unknown(_) => 0,
                }
            }

            /// The number of rows. This is the component count for scalars and vectors.
            pub fn rows(&self) -> u32 {
                match self {
                    $(UniformType::$variant => $rows,)*
                    UniformType::Unknown(_) => 0,
                }
            }
        }

        impl From<u32> for UniformType {
            fn from(value: u32) -> Self {
                match value {
                    $($gl => UniformType::$variant,)*
                    raw => UniformType::Unknown(raw),
                }
            }
        }
    };
}

uniform_types! {
    Float => (0x1406, "float", Float, 1, 1),
    FloatVec2 => (0x8B50, "vec2", Float, 1, 2),
    FloatVec3 => (0x8B51, "vec3", Float, 1, 3),
    FloatVec4 => (0x8B52, "vec4", Float, 1, 4),
    Int => (0x1404, "int", Int, 1, 1),
    IntVec2 => (0x8B53, "ivec2", Int, 1, 2),
    IntVec3 => (0x8B54, "ivec3", Int, 1, 3),
    IntVec4 => (0x8B55, "ivec4", Int, 1, 4),
    UnsignedInt => (0x1405, "uint", UInt, 1, 1),
    UnsignedIntVec2 => (0x8DC6, "uvec2", UInt, 1, 2),
    UnsignedIntVec3 => (0x8DC7, "uvec3", UInt, 1, 3),
    UnsignedIntVec4 => (0x8DC8, "uvec4", UInt, 1, 4),
    Bool => (0x8B56, "bool", Bool, 1, 1),
    BoolVec2 => (0x8B57, "bvec2", Bool, 1, 2),
    BoolVec3 => (0x8B58, "bvec3", Bool, 1, 3),
    BoolVec4 => (0x8B59, "bvec4", Bool, 1, 4),
    FloatMat2 => (0x8B5A, "mat2", Float, 2, 2),
    FloatMat3 => (0x8B5B, "mat3", Float, 3, 3),
    FloatMat4 => (0x8B5C, "mat4", Float, 4, 4),
    FloatMat2x3 => (0x8B65, "mat2x3", Float, 2, 3),
    FloatMat2x4 => (0x8B66, "mat2x4", Float, 2, 4),
    FloatMat3x2 => (0x8B67, "mat3x2", Float, 3, 2),
    FloatMat3x4 => (0x8B68, "mat3x4", Float, 3, 4),
    FloatMat4x2 => (0x8B69, "mat4x2", Float, 4, 2),
    FloatMat4x3 => (0x8B6A, "mat4x3", Float, 4, 3),
    Sampler2D => (0x8B5E, "sampler2D", Sampler, 1, 1),
    Sampler3D => (0x8B5F, "sampler3D", Sampler, 1, 1),
    SamplerCube => (0x8B60, "samplerCube", Sampler, 1, 1),
    Sampler2DShadow => (0x8B62, "sampler2DShadow", Sampler, 1, 1),
    Sampler2DArray => (0x8DC1, "sampler2DArray", Sampler, 1, 1),
    Sampler2DArrayShadow => (0x8DC4, "sampler2DArrayShadow", Sampler, 1, 1),
    SamplerCubeShadow => (0x8DC5, "samplerCubeShadow", Sampler, 1, 1),
    IntSampler2D => (0x8DCA, "isampler2D", Sampler, 1, 1),
    IntSampler3D => (0x8DCB, "isampler3D", Sampler, 1, 1),
    IntSamplerCube => (0x8DCC, "isamplerCube", Sampler, 1, 1),
    IntSampler2DArray => (0x8DCF, "isampler2DArray", Sampler, 1, 1),
    UnsignedIntSampler2D => (0x8DD2, "usampler2D", Sampler, 1, 1),
    UnsignedIntSampler3D => (0x8DD3, "usampler3D", Sampler, 1, 1),
    UnsignedIntSamplerCube => (0x8DD4, "usamplerCube", Sampler, 1, 1),
    UnsignedIntSampler2DArray => (0x8DD7, "usampler2DArray", Sampler, 1, 1),
}

impl UniformType {
    /// Whether this is a known scalar type.
    pub fn is_scalar(&self) -> bool {
        self.is_known() && !self.is_sampler() && self.columns() == 1 && self.rows() == 1
    }

    /// Whether this is a vector type.
    pub fn is_vector(&self) -> bool {
        self.columns() == 1 && self.rows() > 1
    }

    /// Whether this is a matrix type.
    pub fn is_matrix(&self) -> bool {
        self.columns() > 1
    }

    /// Whether this is an opaque sampler type.
    pub fn is_sampler(&self) -> bool {
        self.scalar_kind() == Some(ScalarKind::Sampler)
    }

    /// Whether the driver enum was recognised.
    pub fn is_known(&self) -> bool {
        !matches!(self, UniformType::Unknown(_))
    }

    /// The number of scalar components in one element.
    pub fn component_count(&self) -> u32 {
        self.columns() * self.rows()
    }

    /// The tightly-packed size of one element in bytes.
    ///
    /// Every component, booleans and sampler handles included, occupies four bytes.
    pub fn element_bytes(&self) -> Option<u32> {
        if self.is_known() {
            Some(self.component_count() * 4)
        } else {
            None
        }
    }
}

impl Display for UniformType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.glsl_name() {
            Some(name) => f.write_str(name),
            None => write!(f, "<unknown 0x{:X}>", self.gl_enum()),
        }
    }
}

#[cfg(test)]
mod test {
    use crate::{ScalarKind, UniformType};

    #[test]
    fn gl_enum_round_trips() {
        for ty in [
            UniformType::Float,
            UniformType::FloatMat2x3,
            UniformType::UnsignedIntVec4,
            UniformType::SamplerCubeShadow,
        ] {
            assert_eq!(UniformType::from(ty.gl_enum()), ty);
        }
        assert_eq!(UniformType::from(0xDEAD), UniformType::Unknown(0xDEAD));
    }

    #[test]
    fn matrix_shape_is_columns_by_rows() {
        let mat = UniformType::from_glsl_name("mat2x3").unwrap();
        assert_eq!(mat.columns(), 2);
        assert_eq!(mat.rows(), 3);
        assert!(mat.is_matrix());
        assert_eq!(mat.element_bytes(), Some(24));
    }

    #[test]
    fn shapes_of_vectors_and_samplers() {
        assert!(UniformType::BoolVec3.is_vector());
        assert_eq!(UniformType::BoolVec3.scalar_kind(), Some(ScalarKind::Bool));
        assert!(UniformType::Sampler2D.is_sampler());
        assert!(!UniformType::Sampler2D.is_scalar());
        assert!(UniformType::UnsignedInt.is_scalar());
        assert_eq!(UniformType::Unknown(1).element_bytes(), None);
        assert_eq!(UniformType::Unknown(1).to_string(), "<unknown 0x1>");
    }
}
