//! Rust declarations for the structs and blocks of a uniform model.

mod naming;

use crate::error::UnsupportedTypeError;
use crate::reflect::model::{Member, ProgramUniforms, StructId, StructType, Type};
use naming::{
    block_struct_name, const_ident, field_ident, pascal_case, singular_name,
    strip_uniform_prefix, Namer,
};
use rustc_hash::FxHashMap;
use std::fmt::Write;
use uniblock_common::UniformType;

/// Options for [`generate`].
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Emit a struct with this name holding the plain uniforms of the program.
    pub interface_name: Option<String>,
    /// Derive `Debug` on every generated struct.
    pub derive_debug: bool,
}

/// The output of [`generate`].
#[derive(Debug, Clone)]
pub struct GeneratedBindings {
    pub source: String,
    /// Members that were left out because their type has no Rust rendering.
    pub skipped: Vec<UnsupportedTypeError>,
}

/// Generate Rust declarations for every distinct struct and block of the model.
pub fn generate(model: &ProgramUniforms, options: &GenerateOptions) -> GeneratedBindings {
    let mut namer = Namer::default();
    let interface = options.interface_name.clone().map(|name| namer.claim(name));

    // Instances of one block array share a struct.
    let mut names = FxHashMap::default();
    let mut block_names: FxHashMap<&str, String> = FxHashMap::default();
    let mut instances = Vec::new();
    for (id, record) in model.blocks() {
        let name = match block_names.get(record.base_name()) {
            Some(name) => name.clone(),
            None => {
                let name = namer.claim(block_struct_name(record.base_name()));
                block_names.insert(record.base_name(), name.clone());
                instances.push((id, record));
                name
            }
        };
        names.insert(id, name);
    }
    for id in model.structs() {
        names.insert(id, namer.claim(struct_name(model.struct_type(id))));
    }

    let mut writer = Writer {
        model,
        names,
        derive_debug: options.derive_debug,
        source: String::from("// Generated uniform bindings.\n"),
        skipped: Vec::new(),
    };

    for (id, record) in instances {
        writer.emit_struct(
            id,
            &format!("Layout of the uniform block `{}`.", record.base_name()),
        );
    }
    for id in model.structs() {
        let references: Vec<String> = model
            .struct_type(id)
            .references
            .iter()
            .map(|r| format!("`{}`", r.member_name))
            .collect();
        writer.emit_struct(id, &format!("Used by {}.", references.join(", ")));
    }
    if let Some(interface) = interface {
        writer.emit_interface(&interface);
    }

    GeneratedBindings {
        source: writer.source,
        skipped: writer.skipped,
    }
}

fn struct_name(ty: &StructType) -> String {
    if let Some(declared) = &ty.declared_name {
        return pascal_case(declared);
    }
    match ty.references.first() {
        Some(reference) => {
            let name = strip_uniform_prefix(&reference.member_name);
            if reference.is_array() {
                pascal_case(&singular_name(name))
            } else {
                pascal_case(name)
            }
        }
        None => String::from("Anonymous"),
    }
}

fn render_primitive(ty: UniformType) -> Option<String> {
    let scalar = ty.scalar_kind()?.rust_type();
    let rendered = if ty.is_matrix() {
        format!("[[{scalar}; {}]; {}]", ty.rows(), ty.columns())
    } else if ty.is_vector() {
        format!("[{scalar}; {}]", ty.rows())
    } else {
        scalar.to_string()
    };
    Some(rendered)
}

struct Writer<'a> {
    model: &'a ProgramUniforms,
    names: FxHashMap<StructId, String>,
    derive_debug: bool,
    source: String,
    skipped: Vec<UnsupportedTypeError>,
}

impl Writer<'_> {
    fn render_type(&self, ty: &Type) -> Result<String, UniformType> {
        match ty {
            Type::Primitive(definition) => render_primitive(definition.ty).ok_or(definition.ty),
            Type::Array { element, size } => Ok(format!("[{}; {size}]", self.render_type(element)?)),
            Type::Struct(id) | Type::Block(id) => Ok(self.names[id].clone()),
        }
    }

    fn derives(&self) -> &'static str {
        if self.derive_debug {
            "#[derive(Clone, Copy, Debug, PartialEq)]"
        } else {
            "#[derive(Clone, Copy, PartialEq)]"
        }
    }

    /// Write the fields of a struct body, returning the members that were rendered.
    fn emit_fields<'m>(
        &mut self,
        owner: &str,
        members: impl Iterator<Item = &'m Member>,
    ) -> Vec<(&'m Member, String)> {
        let mut rendered = Vec::new();
        for member in members {
            match self.render_type(&member.ty) {
                Ok(ty) => {
                    let field = field_ident(&member.name);
                    let _ = writeln!(self.source, "    pub {field}: {ty},");
                    rendered.push((member, field));
                }
                Err(ty) => {
                    let _ = writeln!(self.source, "    // unsupported: {} ({ty})", member.name);
                    log::warn!("skipping `{owner}.{}` with unsupported type {ty}", member.name);
                    self.skipped.push(UnsupportedTypeError {
                        path: format!("{owner}.{}", member.name),
                        ty,
                    });
                }
            }
        }
        rendered
    }

    fn emit_struct(&mut self, id: StructId, doc: &str) {
        let model = self.model;
        let ty = model.struct_type(id);
        let name = self.names[&id].clone();
        let owner = match model.block_record(id) {
            Some(record) => record.name.clone(),
            None => name.clone(),
        };

        let derives = self.derives();
        let _ = writeln!(self.source, "\n/// {doc}");
        let _ = writeln!(self.source, "{derives}");
        let _ = writeln!(self.source, "pub struct {name} {{");
        let rendered = self.emit_fields(&owner, ty.members.iter());
        self.source.push_str("}\n");

        // Offsets are only meaningful for structs laid out in a block buffer.
        let Some(bytes) = ty.bytes() else {
            return;
        };
        let _ = writeln!(self.source, "\nimpl {name} {{");
        let _ = writeln!(self.source, "    pub const BYTES: usize = {bytes};");
        for (member, field) in rendered {
            let constant = const_ident(&field);
            let _ = writeln!(
                self.source,
                "    pub const {constant}_OFFSET: usize = {};",
                member.offset
            );
            let _ = writeln!(
                self.source,
                "    pub const {constant}_STRIDE: usize = {};",
                member.stride
            );
        }
        self.source.push_str("}\n");
    }

    fn emit_interface(&mut self, name: &str) {
        let derives = self.derives();
        let _ = writeln!(self.source, "\n/// Uniforms set outside any block.");
        let _ = writeln!(self.source, "{derives}");
        let _ = writeln!(self.source, "pub struct {name} {{");
        let model = self.model;
        let plain = model
            .uniforms()
            .iter()
            .filter(|m| !matches!(m.ty, Type::Block(_)));
        self.emit_fields(name, plain);
        self.source.push_str("}\n");
    }
}

#[cfg(test)]
mod test {
    use crate::back::{generate, GenerateOptions};
    use crate::front::parse;
    use crate::reflect::model::{build, build_with_declarations};
    use crate::reflect::{BlockRecord, UniformRecord};
    use uniblock_common::UniformType;

    #[test]
    fn generates_block_struct() {
        let blocks = [BlockRecord::new("uLights", 0, 32)];
        let records = [
            UniformRecord::in_block("uLights.color", UniformType::FloatVec3, 1, 0, 0),
            UniformRecord::in_block("uLights.intensity", UniformType::Float, 1, 0, 12),
            UniformRecord::in_block("uLights.count", UniformType::Int, 1, 0, 16),
        ];
        let model = build(&records, &blocks).unwrap();
        let out = generate(&model, &GenerateOptions::default());

        assert!(out.skipped.is_empty());
        for line in [
            "#[derive(Clone, Copy, PartialEq)]",
            "pub struct LightsUniform {",
            "    pub color: [f32; 3],",
            "    pub intensity: f32,",
            "    pub count: i32,",
            "    pub const BYTES: usize = 32;",
            "    pub const COLOR_STRIDE: usize = 12;",
            "    pub const COUNT_OFFSET: usize = 16;",
            "    pub const COUNT_STRIDE: usize = 16;",
        ] {
            assert!(out.source.lines().any(|l| l == line), "missing {line:?} in\n{}", out.source);
        }
    }

    #[test]
    fn names_anonymous_structs_from_references() {
        let records = [
            UniformRecord::plain("lights[0].color", UniformType::FloatVec3, 1, 0),
            UniformRecord::plain("lights[1].color", UniformType::FloatVec3, 1, 1),
            UniformRecord::plain("uTime", UniformType::Float, 1, 2),
            UniformRecord::plain("shadowMap", UniformType::Sampler2D, 1, 3),
            UniformRecord::plain("view", UniformType::FloatMat3x2, 1, 4),
        ];
        let model = build(&records, &[]).unwrap();
        let out = generate(
            &model,
            &GenerateOptions {
                interface_name: Some("Globals".to_string()),
                derive_debug: true,
            },
        );

        assert!(out.source.contains("pub struct Light {"));
        assert!(out.source.contains("#[derive(Clone, Copy, Debug, PartialEq)]"));
        assert!(out.source.contains("pub struct Globals {"));
        assert!(out.source.contains("    pub lights: [Light; 2],"));
        assert!(out.source.contains("    pub u_time: f32,"));
        assert!(out.source.contains("    pub shadow_map: i32,"));
        assert!(out.source.contains("    pub view: [[f32; 2]; 3],"));
        // Plain structs have no buffer layout.
        assert!(!out.source.contains("impl Light"));
    }

    #[test]
    fn prefers_declared_names() {
        let shader = parse("struct PointLight { vec3 color; };\nuniform PointLight lamps[2];\n").unwrap();
        let records = [
            UniformRecord::plain("lamps[0].color", UniformType::FloatVec3, 1, 0),
            UniformRecord::plain("lamps[1].color", UniformType::FloatVec3, 1, 1),
        ];
        let model = build_with_declarations(&records, &[], &shader).unwrap();
        let out = generate(&model, &GenerateOptions::default());
        assert!(out.source.contains("pub struct PointLight {"));
        assert!(!out.source.contains("pub struct Lamp {"));
    }

    #[test]
    fn colliding_names_get_suffixes() {
        let records = [
            UniformRecord::plain("light.a", UniformType::Float, 1, 0),
            UniformRecord::plain("lights[0].b", UniformType::Int, 1, 1),
        ];
        let model = build(&records, &[]).unwrap();
        let out = generate(&model, &GenerateOptions::default());
        assert!(out.source.contains("pub struct Light {"));
        assert!(out.source.contains("pub struct Light2 {"));
    }

    #[test]
    fn block_instances_share_a_struct() {
        let blocks = [
            BlockRecord::new("Lights[0]", 0, 16),
            BlockRecord::new("Lights[1]", 1, 16),
        ];
        let records = [
            UniformRecord::in_block("Lights.color", UniformType::FloatVec4, 1, 0, 0),
            UniformRecord::in_block("Lights.color", UniformType::FloatVec4, 1, 1, 0),
        ];
        let model = build(&records, &blocks).unwrap();
        let out = generate(&model, &GenerateOptions::default());

        assert_eq!(out.source.matches("pub struct LightsUniform {").count(), 1);
        assert!(!out.source.contains("LightsUniform2"));
        assert!(out.source.contains("/// Layout of the uniform block `Lights`."));
    }

    #[test]
    fn discarded_duplicates_add_no_references() {
        let records = [
            UniformRecord::plain("a.inner.x", UniformType::Float, 1, 0),
            UniformRecord::plain("b.inner.x", UniformType::Float, 1, 1),
        ];
        let model = build(&records, &[]).unwrap();
        let out = generate(&model, &GenerateOptions::default());
        assert!(out.source.contains("/// Used by `inner`.\n"));
        assert!(out.source.contains("/// Used by `a`, `b`.\n"));
    }

    #[test]
    fn unknown_members_are_skipped() {
        let records = [
            UniformRecord::plain("odd", UniformType::from(0x1234), 1, 0),
            UniformRecord::plain("fine", UniformType::Float, 1, 1),
        ];
        let model = build(&records, &[]).unwrap();
        let out = generate(
            &model,
            &GenerateOptions {
                interface_name: Some("Globals".to_string()),
                derive_debug: false,
            },
        );

        assert!(out.source.contains("    // unsupported: odd"));
        assert!(out.source.contains("    pub fine: f32,"));
        assert_eq!(out.skipped.len(), 1);
        assert_eq!(out.skipped[0].path, "Globals.odd");
        assert_eq!(out.skipped[0].ty, UniformType::Unknown(0x1234));
    }
}
