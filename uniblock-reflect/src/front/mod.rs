use crate::error::ParseError;
use uniblock_preprocess::{ParseOptions, ShaderSource};

mod parser;
mod shader;
mod token;

pub use shader::*;

/// Preprocess and parse GLSL source into a declaration tree.
pub fn parse(source: &str) -> Result<ParsedShader, ParseError> {
    parse_with_options(source, &ParseOptions::default())
}

/// Preprocess GLSL source with predefined macros, then parse it.
pub fn parse_with_options(source: &str, options: &ParseOptions) -> Result<ParsedShader, ParseError> {
    let source = ShaderSource::parse_with_options(source, options)?;
    parse_source(&source)
}

/// Parse an already preprocessed translation unit.
pub fn parse_source(source: &ShaderSource) -> Result<ParsedShader, ParseError> {
    let tokens = token::do_lex(&source.source)?;
    let mut shader = parser::Parser::new(&tokens).parse()?;
    shader.version = source.version.clone();
    Ok(shader)
}

#[cfg(test)]
mod test {
    use crate::error::{DiagnosticKind, ParseError};
    use crate::front::{
        merge_uniform_blocks, merge_uniforms, parse, ArrayLength, Precision, StorageQualifier,
        TypeName,
    };
    use uniblock_common::UniformType;

    const LIGHTING: &str = r#"#version 300 es
precision highp float;
precision mediump sampler2D;

#define MAX_LIGHTS 4
const int SHADOW_CASCADES = 2 + 1;

struct Light {
    vec3 position;
    vec3 color;
    float intensity;
};

struct Material {
    vec4 albedo;
    struct {
        float roughness, metallic;
    } surface;
};

uniform Light lights[MAX_LIGHTS];
uniform Material material;
uniform mat4 cascades[SHADOW_CASCADES];
uniform sampler2D shadowMap;
uniform float weights[] = float[](0.25, 0.5, 0.25);

layout(std140, binding = 2) uniform Camera {
    mat4 view;
    layout(row_major) mat4 projection;
    vec3 eye;
} camera;

in vec3 vNormal;
in Light vLight;
flat in int vIndex;
out vec4 fragColor;

vec3 shade(in Light light, vec3 normal);

vec3 shade(in Light light, vec3 normal) {
    float d = max(dot(normal, light.position), 0.0);
    if (d > 0.5) { return light.color; }
    return light.color * d;
}

void main() {
    fragColor = vec4(shade(lights[0], vNormal), 1.0);
}
"#;

    #[test]
    fn parses_lighting_shader() {
        let shader = parse(LIGHTING).unwrap();
        assert_eq!(shader.version.as_deref(), Some("300 es"));
        assert!(shader.diagnostics.is_empty(), "{:?}", shader.diagnostics);

        assert_eq!(shader.precisions.len(), 2);
        assert_eq!(shader.precisions[0].precision, Precision::High);
        assert_eq!(shader.precisions[0].ty, "float");

        let lights = shader.uniform("lights").unwrap();
        assert_eq!(lights.ty, TypeName::Struct("Light".to_string()));
        assert_eq!(lights.array, Some(ArrayLength::Explicit(4)));

        let cascades = shader.uniform("cascades").unwrap();
        assert_eq!(cascades.array, Some(ArrayLength::Explicit(3)));

        let weights = shader.uniform("weights").unwrap();
        assert_eq!(weights.array, Some(ArrayLength::Inferred(3)));

        let material = shader.struct_decl("Material").unwrap();
        let surface = &material.members[1];
        let TypeName::Anonymous(inner) = &surface.ty else {
            panic!("expected an anonymous struct, got {:?}", surface.ty);
        };
        let names: Vec<&str> = inner.members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["roughness", "metallic"]);
    }

    #[test]
    fn parses_interface_block() {
        let shader = parse(LIGHTING).unwrap();
        let camera = shader.block("Camera").unwrap();
        assert_eq!(camera.qualifiers.storage, Some(StorageQualifier::Uniform));
        assert_eq!(camera.qualifiers.layout("binding").unwrap().value, Some(2));
        assert_eq!(camera.qualifiers.layout("std140").unwrap().value, None);
        assert_eq!(camera.members.len(), 3);
        assert!(camera.members[1].qualifiers.layout("row_major").is_some());
        assert_eq!(camera.instance.as_ref().unwrap().name, "camera");
    }

    #[test]
    fn records_attributes_and_functions() {
        let shader = parse(LIGHTING).unwrap();
        let inputs: Vec<&str> = shader.inputs.iter().map(|i| i.name.as_str()).collect();
        // Struct typed inputs are not attributes.
        assert_eq!(inputs, vec!["vNormal", "vIndex"]);
        assert_eq!(shader.inputs[1].qualifiers.other, vec!["flat"]);
        assert_eq!(shader.outputs[0].ty, TypeName::Builtin(UniformType::FloatVec4));

        assert_eq!(shader.functions.len(), 2);
        let shade = &shader.functions[0];
        assert_eq!(shade.name, "shade");
        assert!(shade.defined);
        assert_eq!(shade.parameters[0].name, "light");
        assert_eq!(shade.parameters[0].qualifiers.storage, Some(StorageQualifier::In));
        assert_eq!(shader.functions[1].return_type, TypeName::Void);
        assert_eq!(shader.constants.get("SHADOW_CASCADES"), Some(&3));
    }

    #[test]
    fn unknown_types_are_skipped() {
        let shader = parse(
            "uniform sampler2DMS msaa;\nuniform float after;\nstruct S { dvec3 d; float f; };\n",
        )
        .unwrap();
        assert_eq!(shader.uniforms.len(), 1);
        assert_eq!(shader.uniforms[0].name, "after");
        assert_eq!(shader.struct_decl("S").unwrap().members.len(), 1);
        let unknown: Vec<&DiagnosticKind> = shader.diagnostics.iter().map(|d| &d.kind).collect();
        assert_eq!(
            unknown,
            vec![
                &DiagnosticKind::UnknownType("sampler2DMS".to_string()),
                &DiagnosticKind::UnknownType("dvec3".to_string()),
            ]
        );
        assert_eq!(shader.diagnostics[0].row, 1);
    }

    #[test]
    fn unresolved_length_is_a_diagnostic() {
        let shader = parse("uniform vec4 colors[];\nuniform float scale[UNKNOWN_LEN];\n").unwrap();
        assert_eq!(shader.uniforms[0].array, Some(ArrayLength::Unresolved));
        assert_eq!(shader.uniforms[1].array, Some(ArrayLength::Unresolved));
        assert_eq!(shader.diagnostics.len(), 2);
    }

    #[test]
    fn struct_redeclaration_keeps_first() {
        let shader = parse("struct A { float x; };\nstruct A { int y; };\n").unwrap();
        assert_eq!(shader.structs.len(), 1);
        assert_eq!(shader.structs[0].members[0].name, "x");
        assert_eq!(
            shader.diagnostics[0].kind,
            DiagnosticKind::StructRedeclared("A".to_string())
        );
    }

    #[test]
    fn eof_inside_declaration_is_fatal() {
        let err = parse("uniform float a;\nuniform vec4 b").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEof { row: 2, col: 1 }));
    }

    #[test]
    fn flattens_struct_arrays() {
        let shader = parse(
            "struct L { vec3 c; float i[2]; };\nuniform L lights[2];\nuniform float t;\n",
        )
        .unwrap();
        let names: Vec<String> = shader
            .flatten_uniforms()
            .unwrap()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(
            names,
            vec!["lights[0].c", "lights[0].i[0]", "lights[1].c", "lights[1].i[0]", "t"]
        );
    }

    #[test]
    fn merges_shader_stages() {
        let vertex = parse(
            "uniform mat4 mvp;\nuniform float t;\nlayout(std140) uniform Frame { float time; };\n",
        )
        .unwrap();
        let fragment = parse(
            "struct S { float a; };\nuniform int t;\nuniform S s;\nlayout(std140) uniform Frame { float time; };\n",
        )
        .unwrap();

        let uniforms = merge_uniforms(&[&vertex, &fragment]);
        let names: Vec<&str> = uniforms.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["mvp", "t", "s"]);
        assert_eq!(uniforms[1].ty, TypeName::Builtin(UniformType::Float));

        let (blocks, structs) = merge_uniform_blocks(&[&vertex, &fragment]);
        assert_eq!(blocks.len(), 1);
        assert_eq!(structs.len(), 1);
    }
}
