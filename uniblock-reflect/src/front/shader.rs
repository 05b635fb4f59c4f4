use crate::error::{ParseDiagnostic, ShaderReflectError};
use rustc_hash::FxHashMap;
use std::fmt::{Display, Formatter};
use uniblock_common::UniformType;

/// A floating point precision qualifier.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Precision {
    Low,
    Medium,
    High,
}

impl Precision {
    pub(crate) fn from_keyword(keyword: &str) -> Option<Precision> {
        match keyword {
            "lowp" => Some(Precision::Low),
            "mediump" => Some(Precision::Medium),
            "highp" => Some(Precision::High),
            _ => None,
        }
    }
}

/// A default precision statement, such as `precision highp float;`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PrecisionStatement {
    pub precision: Precision,
    /// The type the default applies to.
    pub ty: String,
}

/// The storage qualifier of a declaration.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum StorageQualifier {
    Const,
    In,
    Out,
    InOut,
    Uniform,
    Buffer,
    Shared,
}

impl StorageQualifier {
    pub(crate) fn from_keyword(keyword: &str) -> Option<StorageQualifier> {
        match keyword {
            "const" => Some(StorageQualifier::Const),
            "in" | "attribute" => Some(StorageQualifier::In),
            "out" | "varying" => Some(StorageQualifier::Out),
            "inout" => Some(StorageQualifier::InOut),
            "uniform" => Some(StorageQualifier::Uniform),
            "buffer" => Some(StorageQualifier::Buffer),
            "shared" => Some(StorageQualifier::Shared),
            _ => None,
        }
    }
}

/// A single `layout(...)` entry, such as `std140` or `binding = 2`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LayoutQualifier {
    pub name: String,
    pub value: Option<i64>,
}

/// Every qualifier attached to a declaration.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Qualifiers {
    pub storage: Option<StorageQualifier>,
    pub layout: Vec<LayoutQualifier>,
    pub precision: Option<Precision>,
    /// Interpolation, invariance and auxiliary qualifiers, kept verbatim.
    pub other: Vec<String>,
}

impl Qualifiers {
    /// Look up a layout qualifier by name.
    pub fn layout(&self, name: &str) -> Option<&LayoutQualifier> {
        self.layout.iter().find(|q| q.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_none()
            && self.layout.is_empty()
            && self.precision.is_none()
            && self.other.is_empty()
    }
}

/// The length of an array declarator.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ArrayLength {
    /// Written in the source, possibly through a constant.
    Explicit(u32),
    /// Omitted, and taken from the element count of the initializer.
    Inferred(u32),
    /// Omitted with nothing to infer it from.
    Unresolved,
}

impl ArrayLength {
    pub fn get(&self) -> Option<u32> {
        match self {
            ArrayLength::Explicit(len) | ArrayLength::Inferred(len) => Some(*len),
            ArrayLength::Unresolved => None,
        }
    }
}

/// The type of a declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeName {
    /// A built in scalar, vector, matrix or sampler type.
    Builtin(UniformType),
    /// A reference to a named struct.
    Struct(String),
    /// An anonymous struct defined in place.
    Anonymous(Box<StructDecl>),
    Void,
}

impl TypeName {
    /// Whether this is a non-opaque built in type.
    pub fn is_plain_builtin(&self) -> bool {
        matches!(self, TypeName::Builtin(ty) if !ty.is_sampler())
    }
}

impl Display for TypeName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeName::Builtin(ty) => Display::fmt(ty, f),
            TypeName::Struct(name) => f.write_str(name),
            TypeName::Anonymous(_) => f.write_str("struct"),
            TypeName::Void => f.write_str("void"),
        }
    }
}

/// A variable, struct member or function parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDecl {
    pub name: String,
    pub ty: TypeName,
    pub array: Option<ArrayLength>,
    pub qualifiers: Qualifiers,
    pub row: u32,
}

/// A struct declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct StructDecl {
    /// The struct name, `None` for anonymous structs.
    pub name: Option<String>,
    pub members: Vec<VariableDecl>,
}

/// The instance name of an interface block, as in `uniform Lights { ... } lights[2];`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct BlockInstance {
    pub name: String,
    pub array: Option<ArrayLength>,
}

/// An interface block declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceBlock {
    pub name: String,
    pub qualifiers: Qualifiers,
    pub members: Vec<VariableDecl>,
    pub instance: Option<BlockInstance>,
}

/// A function prototype or definition. Only the signature is retained.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: String,
    pub return_type: TypeName,
    pub return_array: Option<ArrayLength>,
    pub parameters: Vec<VariableDecl>,
    /// Whether the declaration had a body.
    pub defined: bool,
}

/// The declaration tree of one shader source.
#[derive(Debug, Clone, Default)]
pub struct ParsedShader {
    /// The `#version` argument.
    pub version: Option<String>,
    pub precisions: Vec<PrecisionStatement>,
    /// Top level `uniform` variables outside any block.
    pub uniforms: Vec<VariableDecl>,
    /// Top level `in` variables of scalar, vector or matrix type.
    pub inputs: Vec<VariableDecl>,
    /// Top level `out` variables of scalar, vector or matrix type.
    pub outputs: Vec<VariableDecl>,
    /// Named struct declarations, in declaration order.
    pub structs: Vec<StructDecl>,
    pub blocks: Vec<InterfaceBlock>,
    pub functions: Vec<FunctionDecl>,
    /// Global integer constants usable as array lengths.
    pub constants: FxHashMap<String, i64>,
    pub diagnostics: Vec<ParseDiagnostic>,
}

impl ParsedShader {
    /// Look up a named struct.
    pub fn struct_decl(&self, name: &str) -> Option<&StructDecl> {
        self.structs
            .iter()
            .find(|s| s.name.as_deref() == Some(name))
    }

    /// Look up a uniform outside any block.
    pub fn uniform(&self, name: &str) -> Option<&VariableDecl> {
        self.uniforms.iter().find(|u| u.name == name)
    }

    /// Look up an interface block by block name.
    pub fn block(&self, name: &str) -> Option<&InterfaceBlock> {
        self.blocks.iter().find(|b| b.name == name)
    }

    /// Resolve the members of a struct type.
    pub fn members_of<'a>(&'a self, ty: &'a TypeName) -> Option<&'a [VariableDecl]> {
        match ty {
            TypeName::Struct(name) => self.struct_decl(name).map(|s| s.members.as_slice()),
            TypeName::Anonymous(decl) => Some(decl.members.as_slice()),
            _ => None,
        }
    }

    /// Expand every uniform outside a block into the leaf names a driver reports,
    /// such as `lights[1].color`.
    ///
    /// Arrays of built in types produce a single `name[0]` entry, matching driver output.
    pub fn flatten_uniforms(&self) -> Result<Vec<(String, UniformType)>, ShaderReflectError> {
        let mut leaves = Vec::new();
        for uniform in &self.uniforms {
            self.flatten(uniform, "", &mut leaves)?;
        }
        Ok(leaves)
    }

    fn flatten(
        &self,
        decl: &VariableDecl,
        prefix: &str,
        leaves: &mut Vec<(String, UniformType)>,
    ) -> Result<(), ShaderReflectError> {
        let name = format!("{prefix}{}", decl.name);
        let length = match decl.array {
            Some(length) => Some(
                length
                    .get()
                    .ok_or_else(|| ShaderReflectError::UnresolvedDeclaration(name.clone()))?,
            ),
            None => None,
        };

        match &decl.ty {
            TypeName::Builtin(ty) => {
                let leaf = match length {
                    Some(_) => format!("{name}[0]"),
                    None => name,
                };
                leaves.push((leaf, *ty));
            }
            ty => {
                let members = self
                    .members_of(ty)
                    .ok_or_else(|| ShaderReflectError::UnresolvedDeclaration(name.clone()))?;
                let prefixes = match length {
                    Some(length) => (0..length).map(|i| format!("{name}[{i}].")).collect(),
                    None => vec![format!("{name}.")],
                };
                for prefix in prefixes {
                    for member in members {
                        self.flatten(member, &prefix, leaves)?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// The union of the plain uniforms of several shaders, keyed by name. The first
/// declaration of a name wins.
pub fn merge_uniforms(shaders: &[&ParsedShader]) -> Vec<VariableDecl> {
    let mut merged: Vec<VariableDecl> = Vec::new();
    for shader in shaders {
        for uniform in &shader.uniforms {
            if !merged.iter().any(|u| u.name == uniform.name) {
                merged.push(uniform.clone());
            }
        }
    }
    merged
}

/// The union of the interface blocks of several shaders, keyed by block name, together
/// with the union of their named structs.
pub fn merge_uniform_blocks(shaders: &[&ParsedShader]) -> (Vec<InterfaceBlock>, Vec<StructDecl>) {
    let mut blocks: Vec<InterfaceBlock> = Vec::new();
    let mut structs: Vec<StructDecl> = Vec::new();
    for shader in shaders {
        for block in &shader.blocks {
            if block.qualifiers.storage == Some(StorageQualifier::Uniform)
                && !blocks.iter().any(|b| b.name == block.name)
            {
                blocks.push(block.clone());
            }
        }
        for decl in &shader.structs {
            if !structs.iter().any(|s| s.name == decl.name) {
                structs.push(decl.clone());
            }
        }
    }
    (blocks, structs)
}
