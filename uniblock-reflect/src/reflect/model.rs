use crate::error::ShaderReflectError;
use crate::front::{ParsedShader, TypeName, VariableDecl};
use crate::reflect::layout;
use crate::reflect::{BlockRecord, PathSegment, UniformDefinition, UniformRecord};
use std::collections::VecDeque;

/// An index into the struct arena of a [`ProgramUniforms`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct StructId(pub(crate) usize);

const ROOT: StructId = StructId(0);

/// The type of a member in the uniform model.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// A scalar, vector, matrix or sampler, with the record it was built from.
    Primitive(UniformDefinition),
    Array { element: Box<Type>, size: u32 },
    Struct(StructId),
    /// A struct backed by a block buffer.
    Block(StructId),
}

impl Type {
    /// The struct this type refers to, looking through arrays.
    pub fn struct_id(&self) -> Option<StructId> {
        match self {
            Type::Struct(id) | Type::Block(id) => Some(*id),
            Type::Array { element, .. } => element.struct_id(),
            Type::Primitive(_) => None,
        }
    }

    /// The innermost element type.
    pub fn element(&self) -> &Type {
        match self {
            Type::Array { element, .. } => element.element(),
            ty => ty,
        }
    }
}

/// A named member of a struct.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub name: String,
    pub ty: Type,
    /// Byte offset relative to the containing struct.
    pub offset: u32,
    /// Distance to the next sibling, or to the end of the containing struct.
    pub stride: u32,
}

/// A member through which a struct was discovered.
#[derive(Debug, Clone, PartialEq)]
pub struct StructReference {
    pub member_name: String,
    /// The type of that member, either the struct itself or an array of it.
    pub member_type: Type,
}

impl StructReference {
    pub fn is_array(&self) -> bool {
        matches!(self.member_type, Type::Array { .. })
    }
}

/// A struct or block in the uniform model.
#[derive(Debug, Clone, Default)]
pub struct StructType {
    pub members: Vec<Member>,
    /// Position of the backing block record, for blocks.
    pub block: Option<usize>,
    pub references: Vec<StructReference>,
    /// The struct name from the source declaration, when known.
    pub declared_name: Option<String>,
    pub(crate) bytes: Option<u32>,
    /// Whether member offsets and strides come from a block layout.
    pub(crate) laid_out: bool,
    pub(crate) start_offset: u32,
    pub(crate) open_member: Option<usize>,
    pub(crate) span_sized: bool,
    pub(crate) finalized: bool,
}

impl StructType {
    /// The size in bytes. Always the driver-reported size for blocks.
    pub fn bytes(&self) -> Option<u32> {
        self.bytes
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn is_block(&self) -> bool {
        self.block.is_some()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Whether the struct lives in a block buffer, so its offsets are meaningful.
    pub fn has_layout(&self) -> bool {
        self.laid_out
    }
}

/// The deduplicated uniform type graph of one linked program.
#[derive(Debug, Clone)]
pub struct ProgramUniforms {
    pub(crate) structs: Vec<StructType>,
    pub(crate) blocks: Vec<BlockRecord>,
    pub(crate) definitions: Vec<UniformDefinition>,
}

impl ProgramUniforms {
    /// The root uniforms: plain uniforms and one member per block.
    pub fn uniforms(&self) -> &[Member] {
        &self.structs[ROOT.0].members
    }

    /// Look up a root uniform or block by name.
    pub fn get(&self, name: &str) -> Option<&Member> {
        self.structs[ROOT.0].member(name)
    }

    pub fn struct_type(&self, id: StructId) -> &StructType {
        &self.structs[id.0]
    }

    /// The distinct structs reachable from the root, breadth first. Blocks are not included.
    pub fn structs(&self) -> Vec<StructId> {
        let mut found = Vec::new();
        let mut queue: VecDeque<&Type> = self.uniforms().iter().map(|m| &m.ty).collect();
        while let Some(ty) = queue.pop_front() {
            let element = ty.element();
            let Some(id) = element.struct_id() else {
                continue;
            };
            if matches!(element, Type::Struct(_)) {
                if found.contains(&id) {
                    continue;
                }
                found.push(id);
            }
            queue.extend(self.structs[id.0].members.iter().map(|m| &m.ty));
        }
        found
    }

    /// Every block with its struct, in root order.
    pub fn blocks(&self) -> Vec<(StructId, &BlockRecord)> {
        self.uniforms()
            .iter()
            .filter_map(|m| match m.ty {
                Type::Block(id) => self.block_record(id).map(|record| (id, record)),
                _ => None,
            })
            .collect()
    }

    /// Look up a block struct by block name.
    pub fn block(&self, name: &str) -> Option<StructId> {
        match self.get(name)?.ty {
            Type::Block(id) => Some(id),
            _ => None,
        }
    }

    /// The record backing a block struct.
    pub fn block_record(&self, id: StructId) -> Option<&BlockRecord> {
        self.structs[id.0].block.map(|b| &self.blocks[b])
    }

    pub fn block_records(&self) -> &[BlockRecord] {
        &self.blocks
    }

    /// The ingested records, in reflection order.
    pub fn definitions(&self) -> &[UniformDefinition] {
        &self.definitions
    }
}

/// Build the uniform model from reflection records.
pub fn build(
    records: &[UniformRecord],
    blocks: &[BlockRecord],
) -> Result<ProgramUniforms, ShaderReflectError> {
    let mut builder = Builder::new(records, blocks)?;
    builder.ingest();
    builder.unify();
    Ok(builder.model)
}

/// Build the uniform model, using the declarations of the source to name structs and
/// to correct struct array lengths that reflection under-reports.
pub fn build_with_declarations(
    records: &[UniformRecord],
    blocks: &[BlockRecord],
    shader: &ParsedShader,
) -> Result<ProgramUniforms, ShaderReflectError> {
    let mut builder = Builder::new(records, blocks)?;
    builder.ingest();
    builder.apply_declarations(shader);
    builder.unify();
    Ok(builder.model)
}

struct Builder {
    model: ProgramUniforms,
    open_block: Option<StructId>,
}

impl Builder {
    fn new(records: &[UniformRecord], blocks: &[BlockRecord]) -> Result<Self, ShaderReflectError> {
        let definitions = records
            .iter()
            .map(|record| UniformDefinition::from_record(record, blocks))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Builder {
            model: ProgramUniforms {
                structs: vec![StructType::default()],
                blocks: blocks.to_vec(),
                definitions,
            },
            open_block: None,
        })
    }

    /// Place every definition. Records of one block are placed together in offset order,
    /// at the position of the first record of that block.
    fn ingest(&mut self) {
        let definitions = std::mem::take(&mut self.model.definitions);
        let mut placed_blocks = vec![false; self.model.blocks.len()];

        for definition in &definitions {
            let Some(block) = definition.block() else {
                self.place(ROOT, definition.path.segments(), definition);
                continue;
            };
            if placed_blocks[block] {
                continue;
            }
            placed_blocks[block] = true;

            let mut members: Vec<&UniformDefinition> = definitions
                .iter()
                .filter(|d| d.block() == Some(block))
                .collect();
            members.sort_by_key(|d| d.offset());

            let id = self.begin_block(block);
            let base_name = self.model.blocks[block].base_name().to_string();
            for member in members {
                let segments = match member.path.segments() {
                    [first, rest @ ..]
                        if !rest.is_empty() && first.index.is_none() && first.name == base_name =>
                    {
                        rest
                    }
                    segments => segments,
                };
                self.place(id, segments, member);
            }
        }

        for block in 0..self.model.blocks.len() {
            if !placed_blocks[block] {
                log::debug!("block `{}` has no active members", self.model.blocks[block].name);
                self.begin_block(block);
            }
        }

        if let Some(open) = self.open_block.take() {
            layout::finalize(&mut self.model, open);
        }
        self.model.definitions = definitions;
    }

    fn new_struct(&mut self, start_offset: u32, block: Option<usize>, laid_out: bool) -> StructId {
        self.model.structs.push(StructType {
            start_offset,
            block,
            laid_out,
            ..StructType::default()
        });
        StructId(self.model.structs.len() - 1)
    }

    /// Add the root member for a block, finalizing the previously open block.
    fn begin_block(&mut self, block: usize) -> StructId {
        if let Some(previous) = self.open_block.take() {
            layout::finalize(&mut self.model, previous);
        }

        let id = self.new_struct(0, Some(block), true);
        let name = self.model.blocks[block].name.clone();
        log::debug!("building block `{name}`");
        self.model.structs[ROOT.0].members.push(Member {
            name,
            ty: Type::Block(id),
            offset: 0,
            stride: 0,
        });
        self.open_block = Some(id);
        id
    }

    fn find_member(&self, parent: StructId, name: &str) -> Option<usize> {
        self.model.structs[parent.0]
            .members
            .iter()
            .position(|m| m.name == name)
    }

    /// Append a member, closing the previously open member of a block-backed struct.
    fn create_member(
        &mut self,
        parent: StructId,
        name: &str,
        ty: Type,
        offset: u32,
        tracks_layout: bool,
    ) -> usize {
        if tracks_layout {
            layout::close_open_member(&mut self.model.structs, parent, offset);
        }
        let members = &mut self.model.structs[parent.0].members;
        members.push(Member {
            name: name.to_string(),
            ty,
            offset,
            stride: 0,
        });
        let index = members.len() - 1;
        if tracks_layout {
            self.model.structs[parent.0].open_member = Some(index);
        }
        index
    }

    /// Walk the remaining path segments below `parent`.
    fn place(&mut self, parent: StructId, segments: &[PathSegment], definition: &UniformDefinition) {
        let Some((segment, rest)) = segments.split_first() else {
            return;
        };
        let tracks_layout = definition.block().is_some();
        let offset = definition
            .offset()
            .saturating_sub(self.model.structs[parent.0].start_offset);
        let existing = self.find_member(parent, &segment.name);

        if rest.is_empty() {
            self.place_leaf(parent, segment, definition, offset, existing, tracks_layout);
            return;
        }

        let index = match existing {
            Some(index) => index,
            None => {
                let element =
                    Type::Struct(self.new_struct(definition.offset(), None, tracks_layout));
                let ty = match segment.index {
                    Some(i) => Type::Array {
                        element: Box::new(element),
                        size: i.saturating_add(1),
                    },
                    None => element,
                };
                self.create_member(parent, &segment.name, ty, offset, tracks_layout)
            }
        };

        let member = &mut self.model.structs[parent.0].members[index];
        let member_offset = member.offset;
        let child = match (&mut member.ty, segment.index) {
            (Type::Struct(id), None) => *id,
            (Type::Array { element, size }, Some(i)) => {
                *size = (*size).max(i.saturating_add(1));
                let Type::Struct(id) = **element else {
                    log::warn!(
                        "`{}` is reflected both as a struct array and as a primitive",
                        definition.path
                    );
                    return;
                };
                if tracks_layout && i > 0 {
                    // Only element zero contributes members. The start of element one
                    // fixes the element size.
                    if i == 1 && self.model.structs[id.0].bytes.is_none() {
                        let bytes = offset.saturating_sub(member_offset);
                        layout::close_struct(&mut self.model.structs, id, bytes);
                    }
                    return;
                }
                id
            }
            _ => {
                log::warn!(
                    "`{}` conflicts with an earlier uniform of a different shape",
                    definition.path
                );
                return;
            }
        };

        self.place(child, rest, definition);
    }

    fn place_leaf(
        &mut self,
        parent: StructId,
        segment: &PathSegment,
        definition: &UniformDefinition,
        offset: u32,
        existing: Option<usize>,
        tracks_layout: bool,
    ) {
        let extent = segment.index.map(|i| i.saturating_add(definition.size));
        match (existing, extent) {
            (None, None) => {
                let ty = Type::Primitive(definition.clone());
                self.create_member(parent, &segment.name, ty, offset, tracks_layout);
            }
            (None, Some(extent)) => {
                let ty = Type::Array {
                    element: Box::new(Type::Primitive(definition.clone())),
                    size: extent,
                };
                self.create_member(parent, &segment.name, ty, offset, tracks_layout);
            }
            (Some(index), Some(extent)) => {
                if let Type::Array { size, .. } = &mut self.model.structs[parent.0].members[index].ty
                {
                    *size = (*size).max(extent);
                }
            }
            (Some(_), None) => {
                log::trace!("`{}` already placed", definition.path);
            }
        }
    }

    fn apply_declarations(&mut self, shader: &ParsedShader) {
        for uniform in &shader.uniforms {
            if let Some(index) = self.find_member(ROOT, &uniform.name) {
                self.apply_declaration(ROOT, index, uniform, shader);
            }
        }

        for declared in &shader.blocks {
            let blocks: Vec<StructId> = self
                .model
                .blocks()
                .into_iter()
                .filter(|(_, record)| record.base_name() == declared.name)
                .map(|(id, _)| id)
                .collect();
            for id in blocks {
                for member in &declared.members {
                    if let Some(index) = self.find_member(id, &member.name) {
                        self.apply_declaration(id, index, member, shader);
                    }
                }
            }
        }
    }

    fn apply_declaration(
        &mut self,
        parent: StructId,
        index: usize,
        declaration: &VariableDecl,
        shader: &ParsedShader,
    ) {
        let member = &mut self.model.structs[parent.0].members[index];
        let stride = member.stride;
        let declared_len = declaration.array.and_then(|len| len.get());

        if let (Type::Array { element, size }, Some(declared)) = (&mut member.ty, declared_len) {
            if let Type::Struct(element) = **element {
                if declared > *size {
                    log::debug!(
                        "widening `{}` from {} to its declared length {}",
                        member.name,
                        size,
                        declared
                    );
                    *size = declared;
                    layout::resize_span_sized(&mut self.model.structs, element, stride, declared);
                } else if declared < *size {
                    log::warn!(
                        "`{}` is declared with {} elements but {} were reflected",
                        member.name,
                        declared,
                        size
                    );
                }
            }
        }

        let member = &self.model.structs[parent.0].members[index];
        let Some(child) = member.ty.struct_id() else {
            return;
        };

        if let TypeName::Struct(name) = &declaration.ty {
            self.model.structs[child.0]
                .declared_name
                .get_or_insert_with(|| name.clone());
        }

        let Some(members) = shader.members_of(&declaration.ty) else {
            return;
        };
        for declared in members {
            if let Some(index) = self.find_member(child, &declared.name) {
                self.apply_declaration(child, index, declared, shader);
            }
        }
    }

    fn unify(&mut self) {
        let mut canonical = Vec::new();
        self.unify_members(ROOT, &mut canonical);
        self.record_references(ROOT);
    }

    /// Replace the struct types of the members of `id` with their canonical structs.
    fn unify_members(&mut self, id: StructId, canonical: &mut Vec<StructId>) {
        for index in 0..self.model.structs[id.0].members.len() {
            let ty = self.model.structs[id.0].members[index].ty.clone();
            let ty = self.unify_type(ty, canonical);
            self.model.structs[id.0].members[index].ty = ty;
        }
    }

    fn unify_type(&mut self, ty: Type, canonical: &mut Vec<StructId>) -> Type {
        match ty {
            Type::Primitive(_) => ty,
            Type::Block(id) => {
                self.unify_members(id, canonical);
                self.record_references(id);
                Type::Block(id)
            }
            Type::Struct(id) => Type::Struct(self.unify_struct(id, canonical)),
            Type::Array { element, size } => Type::Array {
                element: Box::new(self.unify_type(*element, canonical)),
                size,
            },
        }
    }

    /// Unify the children of a struct, then the struct itself against the structs seen
    /// so far. Only a struct that stays canonical records references to its children.
    fn unify_struct(&mut self, id: StructId, canonical: &mut Vec<StructId>) -> StructId {
        self.unify_members(id, canonical);
        let found = canonical
            .iter()
            .copied()
            .find(|&seen| seen == id || self.structurally_equal(seen, id));
        match found {
            Some(seen) => {
                if seen != id {
                    log::trace!("struct {id:?} unified with {seen:?}");
                }
                seen
            }
            None => {
                canonical.push(id);
                self.record_references(id);
                id
            }
        }
    }

    fn record_references(&mut self, id: StructId) {
        let references: Vec<(StructId, StructReference)> = self.model.structs[id.0]
            .members
            .iter()
            .filter_map(|member| match member.ty.element() {
                Type::Struct(child) => Some((
                    *child,
                    StructReference {
                        member_name: member.name.clone(),
                        member_type: member.ty.clone(),
                    },
                )),
                _ => None,
            })
            .collect();
        for (child, reference) in references {
            self.model.structs[child.0].references.push(reference);
        }
    }

    /// Member-wise equality. Structs laid out in a block also have to agree on every
    /// offset and stride, and are never equal to a struct without layout.
    fn structurally_equal(&self, a: StructId, b: StructId) -> bool {
        let a = &self.model.structs[a.0];
        let b = &self.model.structs[b.0];
        if a.laid_out != b.laid_out || a.is_block() || b.is_block() {
            return false;
        }
        if a.laid_out && a.bytes != b.bytes {
            return false;
        }
        a.members.len() == b.members.len()
            && a.members.iter().zip(&b.members).all(|(x, y)| {
                x.name == y.name
                    && types_equal(&x.ty, &y.ty)
                    && (!a.laid_out || (x.offset == y.offset && x.stride == y.stride))
            })
    }
}

fn types_equal(a: &Type, b: &Type) -> bool {
    match (a, b) {
        (Type::Primitive(a), Type::Primitive(b)) => a.ty == b.ty && a.size == b.size,
        (
            Type::Array {
                element: a,
                size: a_size,
            },
            Type::Array {
                element: b,
                size: b_size,
            },
        ) => a_size == b_size && types_equal(a, b),
        (Type::Struct(a), Type::Struct(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod test {
    use crate::error::{ContractViolation, ShaderReflectError};
    use crate::front::parse;
    use crate::reflect::model::{build, build_with_declarations, Type};
    use crate::reflect::{BlockRecord, UniformRecord};
    use uniblock_common::UniformType;

    fn plain(name: &str, ty: UniformType, location: u32) -> UniformRecord {
        UniformRecord::plain(name, ty, 1, location)
    }

    #[test]
    fn array_size_is_max_index_plus_one() {
        let records = [
            plain("arr[0].v", UniformType::Float, 0),
            plain("arr[3].v", UniformType::Float, 1),
            plain("arr[1].v", UniformType::Float, 2),
        ];
        let model = build(&records, &[]).unwrap();
        let arr = model.get("arr").unwrap();
        let Type::Array { size, element } = &arr.ty else {
            panic!("expected an array, got {:?}", arr.ty);
        };
        assert_eq!(*size, 4);
        assert!(matches!(**element, Type::Struct(_)));
    }

    #[test]
    fn terminal_arrays_use_reported_size() {
        let records = [UniformRecord::plain("weights[0]", UniformType::Float, 5, 0)];
        let model = build(&records, &[]).unwrap();
        assert!(matches!(
            model.get("weights").unwrap().ty,
            Type::Array { size: 5, .. }
        ));
    }

    #[test]
    fn identical_structs_are_unified() {
        let records = [
            plain("sun.color", UniformType::FloatVec3, 0),
            plain("sun.power", UniformType::Float, 1),
            plain("moon.color", UniformType::FloatVec3, 2),
            plain("moon.power", UniformType::Float, 3),
            plain("fog.color", UniformType::FloatVec3, 4),
        ];
        let model = build(&records, &[]).unwrap();

        let structs = model.structs();
        assert_eq!(structs.len(), 2);
        let light = model.struct_type(structs[0]);
        let names: Vec<&str> = light
            .references
            .iter()
            .map(|r| r.member_name.as_str())
            .collect();
        assert_eq!(names, vec!["sun", "moon"]);
        assert_eq!(
            model.get("sun").unwrap().ty,
            model.get("moon").unwrap().ty
        );
        assert_eq!(model.struct_type(structs[1]).references.len(), 1);
    }

    #[test]
    fn nested_structs_unify_bottom_up() {
        let records = [
            plain("a.inner.x", UniformType::Float, 0),
            plain("b.inner.x", UniformType::Float, 1),
        ];
        let model = build(&records, &[]).unwrap();
        // One outer and one inner struct.
        assert_eq!(model.structs().len(), 2);
        let outer = model.get("a").unwrap().ty.struct_id().unwrap();
        assert_eq!(model.struct_type(outer).references.len(), 2);
        // The discarded duplicate of the outer struct does not reference the inner one.
        let inner = model.struct_type(outer).member("inner").unwrap();
        let inner = model.struct_type(inner.ty.struct_id().unwrap());
        assert_eq!(inner.references.len(), 1);
    }

    #[test]
    fn block_structs_keep_their_layout() {
        let blocks = [BlockRecord::new("Scene", 0, 48)];
        let records = [
            plain("sun.color", UniformType::FloatVec3, 0),
            plain("sun.power", UniformType::Float, 1),
            UniformRecord::in_block("Scene.ambient", UniformType::FloatVec4, 1, 0, 0),
            UniformRecord::in_block("Scene.light.color", UniformType::FloatVec3, 1, 0, 16),
            UniformRecord::in_block("Scene.light.power", UniformType::Float, 1, 0, 28),
            UniformRecord::in_block("Scene.count", UniformType::Int, 1, 0, 32),
        ];
        let model = build(&records, &blocks).unwrap();

        let sun = model.get("sun").unwrap().ty.struct_id().unwrap();
        let scene = model.struct_type(model.block("Scene").unwrap());
        let light = scene.member("light").unwrap().ty.struct_id().unwrap();
        assert_ne!(sun, light);

        let light = model.struct_type(light);
        assert!(light.has_layout());
        assert!(!model.struct_type(sun).has_layout());
        let power = light.member("power").unwrap();
        assert_eq!((power.offset, power.stride), (12, 4));
    }

    #[test]
    fn differently_laid_out_structs_stay_apart() {
        let blocks = [
            BlockRecord::new("A", 0, 32),
            BlockRecord::new("B", 1, 16),
            BlockRecord::new("C", 2, 16),
        ];
        let records = [
            UniformRecord::in_block("A.s.x", UniformType::Float, 1, 0, 0),
            UniformRecord::in_block("A.s.y", UniformType::Float, 1, 0, 16),
            UniformRecord::in_block("B.s.x", UniformType::Float, 1, 1, 0),
            UniformRecord::in_block("B.s.y", UniformType::Float, 1, 1, 4),
            UniformRecord::in_block("C.s.x", UniformType::Float, 1, 2, 0),
            UniformRecord::in_block("C.s.y", UniformType::Float, 1, 2, 4),
        ];
        let model = build(&records, &blocks).unwrap();

        let s = |block: &str| {
            let block = model.struct_type(model.block(block).unwrap());
            block.member("s").unwrap().ty.struct_id().unwrap()
        };
        assert_ne!(s("A"), s("B"));
        assert_eq!(s("B"), s("C"));
        let y = model.struct_type(s("B")).member("y").unwrap();
        assert_eq!(y.offset, 4);
    }

    #[test]
    fn huge_indices_saturate() {
        let records = [
            plain("arr[4294967295]", UniformType::Float, 0),
            plain("list[4294967295].v", UniformType::Float, 1),
        ];
        let model = build(&records, &[]).unwrap();
        assert!(matches!(
            model.get("arr").unwrap().ty,
            Type::Array { size: u32::MAX, .. }
        ));
        assert!(matches!(
            model.get("list").unwrap().ty,
            Type::Array { size: u32::MAX, .. }
        ));
    }

    #[test]
    fn block_members_get_strides() {
        let blocks = [BlockRecord::new("Frame", 0, 48)];
        let records = [
            UniformRecord::in_block("Frame.a", UniformType::FloatVec4, 1, 0, 0),
            UniformRecord::in_block("Frame.b", UniformType::FloatVec4, 1, 0, 16),
            UniformRecord::in_block("Frame.c", UniformType::FloatVec4, 1, 0, 32),
        ];
        let model = build(&records, &blocks).unwrap();
        let id = model.block("Frame").unwrap();
        let block = model.struct_type(id);
        let layout: Vec<(&str, u32, u32)> = block
            .members
            .iter()
            .map(|m| (m.name.as_str(), m.offset, m.stride))
            .collect();
        assert_eq!(layout, vec![("a", 0, 16), ("b", 16, 16), ("c", 32, 16)]);
        assert_eq!(block.bytes(), Some(48));
    }

    #[test]
    fn block_records_are_placed_in_offset_order() {
        let blocks = [BlockRecord::new("Frame", 0, 32)];
        let records = [
            UniformRecord::in_block("time", UniformType::Float, 1, 0, 16),
            UniformRecord::in_block("tint", UniformType::FloatVec3, 1, 0, 0),
        ];
        let model = build(&records, &blocks).unwrap();
        let block = model.struct_type(model.block("Frame").unwrap());
        assert_eq!(block.members[0].name, "tint");
        assert_eq!(block.members[0].stride, 16);
        assert_eq!(block.members[1].stride, 16);
        // Definitions keep reflection order.
        assert_eq!(model.definitions()[0].path.to_string(), "time");
    }

    #[test]
    fn nested_struct_size_comes_from_next_sibling() {
        let blocks = [BlockRecord::new("Scene", 0, 48)];
        let records = [
            UniformRecord::in_block("Scene.a", UniformType::Float, 1, 0, 0),
            UniformRecord::in_block("Scene.s.x", UniformType::FloatVec3, 1, 0, 16),
            UniformRecord::in_block("Scene.s.y", UniformType::Float, 1, 0, 28),
            UniformRecord::in_block("Scene.b", UniformType::Float, 1, 0, 32),
        ];
        let model = build(&records, &blocks).unwrap();
        let block = model.struct_type(model.block("Scene").unwrap());
        let s = block.member("s").unwrap();
        assert_eq!((s.offset, s.stride), (16, 16));

        let inner = model.struct_type(s.ty.struct_id().unwrap());
        assert_eq!(inner.bytes(), Some(16));
        let strides: Vec<u32> = inner.members.iter().map(|m| m.stride).collect();
        assert_eq!(strides, vec![12, 4]);
        assert_eq!(block.member("b").unwrap().stride, 16);
    }

    #[test]
    fn struct_array_element_size_from_second_element() {
        let blocks = [BlockRecord::new("Shapes", 0, 96)];
        let mut records = Vec::new();
        for i in 0..4u32 {
            records.push(UniformRecord::in_block(
                format!("Shapes.shapes[{i}].color"),
                UniformType::FloatVec3,
                1,
                0,
                16 + i * 16,
            ));
            records.push(UniformRecord::in_block(
                format!("Shapes.shapes[{i}].size"),
                UniformType::Float,
                1,
                0,
                28 + i * 16,
            ));
        }
        records.push(UniformRecord::in_block(
            "Shapes.count",
            UniformType::Int,
            1,
            0,
            80,
        ));
        records.push(UniformRecord::in_block(
            "Shapes.scale",
            UniformType::Float,
            1,
            0,
            0,
        ));

        let model = build(&records, &blocks).unwrap();
        let block = model.struct_type(model.block("Shapes").unwrap());
        let shapes = block.member("shapes").unwrap();
        assert!(matches!(shapes.ty, Type::Array { size: 4, .. }));
        assert_eq!((shapes.offset, shapes.stride), (16, 64));

        let shape = model.struct_type(shapes.ty.struct_id().unwrap());
        assert_eq!(shape.bytes(), Some(16));
        assert_eq!(shape.members.len(), 2);
        assert_eq!(shape.members[1].stride, 4);
        assert_eq!(block.member("count").unwrap().stride, 16);
    }

    #[test]
    fn unknown_block_index_is_fatal() {
        let records = [UniformRecord::in_block("x", UniformType::Float, 1, 4, 0)];
        let err = build(&records, &[BlockRecord::new("B", 0, 16)]).unwrap_err();
        assert!(matches!(
            err,
            ShaderReflectError::ReflectionContractViolation(
                ContractViolation::UnknownBlockIndex { .. }
            )
        ));
    }

    #[test]
    fn unknown_types_are_kept() {
        let records = [UniformRecord::plain("odd", UniformType::from(0x9999), 1, 0)];
        let model = build(&records, &[]).unwrap();
        let Type::Primitive(def) = &model.get("odd").unwrap().ty else {
            panic!("expected a primitive");
        };
        assert_eq!(def.ty, UniformType::Unknown(0x9999));
    }

    #[test]
    fn instanced_blocks_are_separate_roots() {
        let blocks = [
            BlockRecord::new("Lights[0]", 0, 16),
            BlockRecord::new("Lights[1]", 1, 16),
        ];
        let records = [
            UniformRecord::in_block("Lights.color", UniformType::FloatVec4, 1, 0, 0),
            UniformRecord::in_block("Lights.color", UniformType::FloatVec4, 1, 1, 0),
        ];
        let model = build(&records, &blocks).unwrap();
        assert_eq!(model.blocks().len(), 2);
        let first = model.struct_type(model.block("Lights[1]").unwrap());
        assert_eq!(first.members[0].name, "color");
        assert_eq!(first.members[0].stride, 16);
    }

    #[test]
    fn declarations_name_structs_and_widen_arrays() {
        let shader = parse(
            "struct PointLight { vec3 color; float power; };\nuniform PointLight lights[4];\n",
        )
        .unwrap();
        let records = [
            plain("lights[0].color", UniformType::FloatVec3, 0),
            plain("lights[0].power", UniformType::Float, 1),
            plain("lights[1].color", UniformType::FloatVec3, 2),
            plain("lights[1].power", UniformType::Float, 3),
        ];

        let model = build_with_declarations(&records, &[], &shader).unwrap();
        let lights = model.get("lights").unwrap();
        assert!(matches!(lights.ty, Type::Array { size: 4, .. }));
        let light = model.struct_type(lights.ty.struct_id().unwrap());
        assert_eq!(light.declared_name.as_deref(), Some("PointLight"));
    }
}
