use crate::reflect::model::{ProgramUniforms, StructId, StructType, Type};
use crate::reflect::{BlockRecord, UniformDefinition, UniformStorage};
use uniblock_common::UniformType;

/// Close the open member of a struct, giving it the stride up to `end`.
///
/// A closed struct member gets its size from the stride, and an array of structs
/// derives the element size from the stride when the second element never fixed it.
pub(crate) fn close_open_member(structs: &mut [StructType], id: StructId, end: u32) {
    let Some(index) = structs[id.0].open_member.take() else {
        return;
    };
    let member = &mut structs[id.0].members[index];
    member.stride = end.saturating_sub(member.offset);
    let stride = member.stride;

    match &member.ty {
        Type::Struct(child) => {
            let child = *child;
            close_struct(structs, child, stride);
        }
        Type::Array { element, size } => {
            if let Type::Struct(child) = **element {
                let size = (*size).max(1);
                if structs[child.0].bytes.is_none() {
                    structs[child.0].span_sized = true;
                }
                close_struct(structs, child, stride / size);
            }
        }
        _ => {}
    }
}

/// Fix the size of a nested struct if it is not yet known, then close its open member.
pub(crate) fn close_struct(structs: &mut [StructType], id: StructId, bytes: u32) {
    let bytes = *structs[id.0].bytes.get_or_insert(bytes);
    close_open_member(structs, id, bytes);
}

/// Recompute the element size of a struct array that was sized from its span,
/// after the array length changed.
pub(crate) fn resize_span_sized(structs: &mut [StructType], id: StructId, span: u32, len: u32) {
    let element = &mut structs[id.0];
    if !element.span_sized || len == 0 {
        return;
    }
    let bytes = span / len;
    element.bytes = Some(bytes);
    if let Some(last) = element.members.last_mut() {
        last.stride = bytes.saturating_sub(last.offset);
    }
}

/// Complete the layout of a block: its size becomes the driver-reported size and the
/// last open member is closed against it. Finalizing twice has no further effect.
pub fn finalize(model: &mut ProgramUniforms, block: StructId) {
    let structs = &mut model.structs;
    if structs[block.0].finalized {
        return;
    }
    let Some(record) = structs[block.0].block.map(|b| &model.blocks[b]) else {
        return;
    };
    let bytes = record.byte_size;
    structs[block.0].bytes = Some(bytes);
    close_open_member(structs, block, bytes);
    structs[block.0].finalized = true;
}

/// What a layout entry describes.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LayoutKind {
    /// A primitive, or a whole array of primitives.
    Leaf {
        ty: UniformType,
        matrix_stride: u32,
        row_major: bool,
    },
    /// One struct value. Its members follow as separate entries.
    Struct(StructId),
    /// An array of structs. Each element follows as a separate entry.
    Array(StructId),
}

/// One addressable range in a block buffer.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LayoutEntry {
    /// The dotted path relative to the block, such as `shapes[1].color`.
    pub path: String,
    /// Absolute byte offset in the block.
    pub offset: u32,
    /// Bytes reserved up to the next sibling.
    pub stride: u32,
    /// Distance between array elements, 0 when not an array.
    pub array_stride: u32,
    pub array_size: u32,
    pub kind: LayoutKind,
}

impl LayoutEntry {
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, LayoutKind::Leaf { .. })
    }
}

/// The flattened layout of one block.
#[derive(Debug, Clone)]
pub struct BlockLayout {
    pub block: BlockRecord,
    pub entries: Vec<LayoutEntry>,
}

impl BlockLayout {
    pub fn bytes(&self) -> u32 {
        self.block.byte_size
    }

    pub fn get(&self, path: &str) -> Option<&LayoutEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    pub fn leaves(&self) -> impl Iterator<Item = &LayoutEntry> {
        self.entries.iter().filter(|e| e.is_leaf())
    }
}

/// Flatten a finalized block into absolute offsets. Returns `None` if the struct is not a block.
pub fn layout_table(model: &ProgramUniforms, block: StructId) -> Option<BlockLayout> {
    let record = model.block_record(block)?.clone();
    let mut entries = Vec::new();
    collect_entries(model, block, 0, "", &mut entries);
    Some(BlockLayout { block: record, entries })
}

fn collect_entries(
    model: &ProgramUniforms,
    id: StructId,
    base: u32,
    prefix: &str,
    entries: &mut Vec<LayoutEntry>,
) {
    for member in &model.struct_type(id).members {
        let path = if prefix.is_empty() {
            member.name.clone()
        } else {
            format!("{prefix}.{}", member.name)
        };
        let offset = base + member.offset;

        match &member.ty {
            Type::Primitive(definition) => {
                entries.push(leaf(path, offset, member.stride, definition, 1));
            }
            Type::Struct(child) => {
                entries.push(LayoutEntry {
                    path: path.clone(),
                    offset,
                    stride: member.stride,
                    array_stride: 0,
                    array_size: 1,
                    kind: LayoutKind::Struct(*child),
                });
                collect_entries(model, *child, offset, &path, entries);
            }
            Type::Array { element, size } => match element.as_ref() {
                Type::Primitive(definition) => {
                    entries.push(leaf(path, offset, member.stride, definition, *size));
                }
                Type::Struct(child) => {
                    let bytes = model
                        .struct_type(*child)
                        .bytes()
                        .unwrap_or(member.stride / (*size).max(1));
                    entries.push(LayoutEntry {
                        path: path.clone(),
                        offset,
                        stride: member.stride,
                        array_stride: bytes,
                        array_size: *size,
                        kind: LayoutKind::Array(*child),
                    });
                    for i in 0..*size {
                        let element_path = format!("{path}[{i}]");
                        let element_offset = offset + i * bytes;
                        entries.push(LayoutEntry {
                            path: element_path.clone(),
                            offset: element_offset,
                            stride: bytes,
                            array_stride: 0,
                            array_size: 1,
                            kind: LayoutKind::Struct(*child),
                        });
                        collect_entries(model, *child, element_offset, &element_path, entries);
                    }
                }
                _ => log::warn!("`{path}` has an unsupported array element type"),
            },
            Type::Block(_) => {}
        }
    }
}

fn leaf(path: String, offset: u32, stride: u32, definition: &UniformDefinition, size: u32) -> LayoutEntry {
    let (array_stride, matrix_stride, row_major) = match definition.storage {
        UniformStorage::Block {
            array_stride,
            matrix_stride,
            row_major,
            ..
        } => (array_stride, matrix_stride, row_major),
        UniformStorage::Program { .. } => (0, 0, false),
    };
    let array_stride = match (array_stride, size) {
        (_, 1) => array_stride,
        (0, size) => stride / size,
        (array_stride, _) => array_stride,
    };

    LayoutEntry {
        path,
        offset,
        stride,
        array_stride,
        array_size: size,
        kind: LayoutKind::Leaf {
            ty: definition.ty,
            matrix_stride,
            row_major,
        },
    }
}

#[cfg(test)]
mod test {
    use crate::reflect::layout::{finalize, layout_table, LayoutKind};
    use crate::reflect::model::build;
    use crate::reflect::{BlockRecord, UniformRecord};
    use uniblock_common::UniformType;

    fn lights() -> (Vec<UniformRecord>, Vec<BlockRecord>) {
        (
            vec![
                UniformRecord::in_block("uLights.color", UniformType::FloatVec3, 1, 0, 0),
                UniformRecord::in_block("uLights.intensity", UniformType::Float, 1, 0, 12),
                UniformRecord::in_block("uLights.count", UniformType::Int, 1, 0, 16),
            ],
            vec![BlockRecord::new("uLights", 0, 32)],
        )
    }

    #[test]
    fn lights_block_layout() {
        let (records, blocks) = lights();
        let model = build(&records, &blocks).unwrap();
        let id = model.block("uLights").unwrap();
        let layout = layout_table(&model, id).unwrap();

        let table: Vec<(&str, u32, u32)> = layout
            .entries
            .iter()
            .map(|e| (e.path.as_str(), e.offset, e.stride))
            .collect();
        assert_eq!(
            table,
            vec![("color", 0, 12), ("intensity", 12, 4), ("count", 16, 16)]
        );
        assert_eq!(layout.bytes(), 32);
    }

    #[test]
    fn finalize_is_idempotent() {
        let (records, blocks) = lights();
        let mut model = build(&records, &blocks).unwrap();
        let id = model.block("uLights").unwrap();
        let before = model.struct_type(id).members.clone();

        finalize(&mut model, id);
        finalize(&mut model, id);

        assert!(model.struct_type(id).is_finalized());
        assert_eq!(model.struct_type(id).members, before);
        assert_eq!(model.struct_type(id).bytes(), Some(32));
    }

    #[test]
    fn struct_arrays_expand_per_element() {
        let blocks = [BlockRecord::new("Scene", 2, 48)];
        let records = [
            UniformRecord::in_block("items[0].a", UniformType::FloatVec2, 1, 2, 0),
            UniformRecord::in_block("items[0].b", UniformType::Float, 1, 2, 8),
            UniformRecord::in_block("items[1].a", UniformType::FloatVec2, 1, 2, 16),
            UniformRecord::in_block("items[1].b", UniformType::Float, 1, 2, 24),
            UniformRecord::in_block("tail", UniformType::FloatVec4, 1, 2, 32),
        ];
        let model = build(&records, &blocks).unwrap();
        let layout = layout_table(&model, model.block("Scene").unwrap()).unwrap();

        let items = layout.get("items").unwrap();
        assert!(matches!(items.kind, LayoutKind::Array(_)));
        assert_eq!((items.array_size, items.array_stride), (2, 16));

        let second = layout.get("items[1].b").unwrap();
        assert_eq!((second.offset, second.stride), (24, 8));
        assert_eq!(layout.get("tail").unwrap().offset, 32);

        let leaves: Vec<&str> = layout.leaves().map(|e| e.path.as_str()).collect();
        assert_eq!(
            leaves,
            vec!["items[0].a", "items[0].b", "items[1].a", "items[1].b", "tail"]
        );
    }

    #[test]
    fn primitive_arrays_are_one_entry() {
        let blocks = [BlockRecord::new("Weights", 0, 64)];
        let records = [
            UniformRecord::in_block("w[0]", UniformType::Float, 4, 0, 0).with_array_stride(16),
        ];
        let model = build(&records, &blocks).unwrap();
        let layout = layout_table(&model, model.block("Weights").unwrap()).unwrap();

        assert_eq!(layout.entries.len(), 1);
        let w = &layout.entries[0];
        assert_eq!(w.path, "w");
        assert_eq!((w.array_size, w.array_stride, w.stride), (4, 16, 64));
    }

    #[test]
    fn matrices_keep_their_stride() {
        let blocks = [BlockRecord::new("Camera", 0, 64)];
        let records = [UniformRecord::in_block("Camera.view", UniformType::FloatMat4, 1, 0, 0)
            .with_matrix_stride(16, true)];
        let model = build(&records, &blocks).unwrap();
        let layout = layout_table(&model, model.block("Camera").unwrap()).unwrap();
        assert_eq!(
            layout.get("view").unwrap().kind,
            LayoutKind::Leaf {
                ty: UniformType::FloatMat4,
                matrix_stride: 16,
                row_major: true
            }
        );
    }

    #[test]
    fn plain_structs_have_no_layout() {
        let model = build(&[UniformRecord::plain("s.x", UniformType::Float, 1, 0)], &[]).unwrap();
        let id = model.get("s").unwrap().ty.struct_id().unwrap();
        assert!(layout_table(&model, id).is_none());
    }
}
