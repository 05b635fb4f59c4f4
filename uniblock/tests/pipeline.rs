use uniblock::reflect::back::{generate, GenerateOptions};
use uniblock::reflect::front::parse;
use uniblock::reflect::{
    build_with_declarations, collect, dump_uniforms, layout_table, ActiveUniform, BlockParam,
    ReflectProgram, ShaderReflectError, UniformLocation, UniformParam,
};
use uniblock::runtime::{bind, UniformData, UniformDriver, ValueError};
use uniblock::UniformType;

const SOURCE: &str = r#"#version 300 es
precision highp float;

#define LIGHT_COUNT 2

struct Light {
    vec3 color;
    float intensity;
};

layout(std140) uniform uLights {
    Light lights[LIGHT_COUNT];
    int count;
};

uniform float uTime;
uniform vec3 uTint;

out vec4 fragColor;

void main() {
    fragColor = vec4(lights[0].color * uTint, 1.0);
}
"#;

struct Uniform {
    name: &'static str,
    ty: UniformType,
    block: i32,
    offset: i32,
}

/// A program as a std140 driver would report the shader above.
struct LinkedProgram {
    linked: bool,
    uniforms: Vec<Uniform>,
}

impl LinkedProgram {
    fn new() -> Self {
        let member = |name, ty, offset| Uniform {
            name,
            ty,
            block: 0,
            offset,
        };
        let plain = |name, ty| Uniform {
            name,
            ty,
            block: -1,
            offset: -1,
        };
        LinkedProgram {
            linked: true,
            uniforms: vec![
                plain("uTime", UniformType::Float),
                member("lights[0].color", UniformType::FloatVec3, 0),
                member("lights[0].intensity", UniformType::Float, 12),
                member("lights[1].color", UniformType::FloatVec3, 16),
                member("lights[1].intensity", UniformType::Float, 28),
                member("count", UniformType::Int, 32),
                plain("uTint", UniformType::FloatVec3),
            ],
        }
    }
}

impl ReflectProgram for LinkedProgram {
    fn link_status(&self) -> bool {
        self.linked
    }

    fn active_uniforms(&self) -> u32 {
        self.uniforms.len() as u32
    }

    fn uniform_info(&self, index: u32) -> Option<ActiveUniform> {
        let uniform = self.uniforms.get(index as usize)?;
        Some(ActiveUniform {
            name: uniform.name.to_string(),
            ty: uniform.ty.gl_enum(),
            size: 1,
        })
    }

    fn uniform_param(&self, index: u32, param: UniformParam) -> i32 {
        let uniform = &self.uniforms[index as usize];
        match param {
            UniformParam::BlockIndex => uniform.block,
            UniformParam::Offset => uniform.offset,
            UniformParam::ArrayStride | UniformParam::MatrixStride => 0,
            UniformParam::IsRowMajor => 0,
        }
    }

    fn uniform_location(&self, name: &str) -> Option<u32> {
        self.uniforms
            .iter()
            .filter(|u| u.block < 0)
            .position(|u| u.name == name)
            .map(|p| p as u32 + 10)
    }

    fn active_blocks(&self) -> u32 {
        1
    }

    fn block_name(&self, _index: u32) -> String {
        "uLights".to_string()
    }

    fn block_param(&self, _index: u32, param: BlockParam) -> i32 {
        match param {
            BlockParam::DataSize => 48,
            BlockParam::Binding => 1,
            BlockParam::ReferencedByVertexShader => 0,
            BlockParam::ReferencedByFragmentShader => 1,
        }
    }
}

#[derive(Default)]
struct Recorder {
    floats: Vec<(UniformLocation, u32, Vec<f32>)>,
}

impl UniformDriver for Recorder {
    fn uniform_f32(&mut self, location: UniformLocation, components: u32, values: &[f32]) {
        self.floats.push((location, components, values.to_vec()));
    }

    fn uniform_i32(&mut self, _: UniformLocation, _: u32, _: &[i32]) {}

    fn uniform_u32(&mut self, _: UniformLocation, _: u32, _: &[u32]) {}

    fn uniform_matrix(&mut self, _: UniformLocation, _: u32, _: u32, _: bool, _: &[f32]) {}
}

#[test]
fn reflects_lays_out_and_binds() {
    let shader = parse(SOURCE).unwrap();
    let (records, blocks) = collect(&LinkedProgram::new()).unwrap();
    assert_eq!(records.len(), 7);
    assert_eq!(blocks[0].binding, 1);

    let model = build_with_declarations(&records, &blocks, &shader).unwrap();
    let id = model.block("uLights").unwrap();
    let layout = layout_table(&model, id).unwrap();
    assert_eq!(layout.bytes(), 48);

    let lights = layout.get("lights").unwrap();
    assert_eq!((lights.offset, lights.array_stride, lights.array_size), (0, 16, 2));
    let intensity = layout.get("lights[1].intensity").unwrap();
    assert_eq!((intensity.offset, intensity.stride), (28, 4));
    let count = layout.get("count").unwrap();
    assert_eq!((count.offset, count.stride), (32, 16));

    let mut bound = bind(&model).unwrap();
    let block = bound.block_mut("uLights").unwrap();
    assert_eq!(block.binding(), 1);
    block.set("lights[1].color", &[0.0f32, 1.0, 0.0]).unwrap();
    block.set("count", &2i32).unwrap();
    assert_eq!(block.take_dirty(false), Some(16..36));
    assert_eq!(
        block.get("lights[1].color").unwrap(),
        UniformData::Float(vec![0.0, 1.0, 0.0])
    );

    let mut driver = Recorder::default();
    bound.set(&mut driver, "uTint", &[1.0f32, 0.5, 0.5]).unwrap();
    bound.set(&mut driver, "uTime", &3.5f32).unwrap();
    assert_eq!(
        driver.floats,
        vec![
            (UniformLocation(11), 3, vec![1.0, 0.5, 0.5]),
            (UniformLocation(10), 1, vec![3.5]),
        ]
    );
    assert_eq!(
        bound.set(&mut driver, "uTint", &[1.0f32]),
        Err(ValueError::ComponentMismatch {
            path: "uTint".to_string(),
            expected: 3,
            found: 1
        })
    );
}

#[test]
fn generates_declarations_for_the_model() {
    let shader = parse(SOURCE).unwrap();
    let (records, blocks) = collect(&LinkedProgram::new()).unwrap();
    let model = build_with_declarations(&records, &blocks, &shader).unwrap();

    let out = generate(
        &model,
        &GenerateOptions {
            interface_name: Some("Globals".to_string()),
            derive_debug: false,
        },
    );
    assert!(out.skipped.is_empty());
    for line in [
        "pub struct LightsUniform {",
        "    pub lights: [Light; 2],",
        "    pub const BYTES: usize = 48;",
        "pub struct Light {",
        "pub struct Globals {",
        "    pub u_tint: [f32; 3],",
    ] {
        assert!(out.source.lines().any(|l| l == line), "missing {line:?} in\n{}", out.source);
    }
}

#[test]
fn dumps_the_reflection() {
    let (records, blocks) = collect(&LinkedProgram::new()).unwrap();
    let dump = dump_uniforms(&records, &blocks);
    assert!(dump.contains("uLights (binding: 1, size: 48)"));
    assert!(dump.contains("    count : 1 x int offset: 32"));
}

#[test]
fn unlinked_programs_are_rejected() {
    let mut program = LinkedProgram::new();
    program.linked = false;
    assert!(matches!(
        collect(&program),
        Err(ShaderReflectError::ProgramNotLinked)
    ));
}
