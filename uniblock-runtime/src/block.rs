use crate::buffer::BlockBuffer;
use crate::error::ValueError;
use crate::value::{UniformData, UniformValue};
use bytemuck::Pod;
use std::ops::Range;
use uniblock_common::map::FastHashMap;
use uniblock_common::{ScalarKind, UniformType};
use uniblock_reflect::reflect::layout::{BlockLayout, LayoutEntry, LayoutKind};
use uniblock_reflect::reflect::BlockRecord;

/// The placement of one leaf value in a block buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockField {
    pub path: String,
    pub ty: UniformType,
    /// Absolute offset of element zero.
    pub offset: usize,
    pub array_stride: usize,
    pub array_size: u32,
    pub matrix_stride: usize,
    pub row_major: bool,
}

impl BlockField {
    pub(crate) fn from_entry(entry: &LayoutEntry) -> Option<BlockField> {
        let LayoutKind::Leaf {
            ty,
            matrix_stride,
            row_major,
        } = entry.kind
        else {
            return None;
        };
        Some(BlockField {
            path: entry.path.clone(),
            ty,
            offset: entry.offset as usize,
            array_stride: entry.array_stride as usize,
            array_size: entry.array_size.max(1),
            matrix_stride: matrix_stride as usize,
            row_major,
        })
    }

    fn components(&self) -> usize {
        self.ty.component_count() as usize
    }

    fn element_offset(&self, index: usize) -> usize {
        self.offset + index * self.array_stride
    }

    /// Distance between the column (or row, when row-major) vectors of a matrix.
    fn vector_stride(&self) -> usize {
        if self.matrix_stride > 0 {
            return self.matrix_stride;
        }
        let width = if self.row_major {
            self.ty.columns()
        } else {
            self.ty.rows()
        };
        width as usize * 4
    }

    /// Bytes from the start of one element to the end of its last component.
    fn element_span(&self) -> usize {
        if !self.ty.is_matrix() {
            return self.components() * 4;
        }
        let (vectors, width) = if self.row_major {
            (self.ty.rows(), self.ty.columns())
        } else {
            (self.ty.columns(), self.ty.rows())
        };
        (vectors as usize - 1) * self.vector_stride() + width as usize * 4
    }

    fn check(&self, first: u32, value: &UniformValue, capacity: usize) -> Result<(), ValueError> {
        let expected = self.ty.scalar_kind().unwrap_or(ScalarKind::Float);
        if value.kind() != expected {
            return Err(ValueError::TypeMismatch {
                path: self.path.clone(),
                expected,
                found: value.kind(),
            });
        }

        let components = self.components();
        if value.is_empty() || value.len() % components != 0 {
            return Err(ValueError::ComponentMismatch {
                path: self.path.clone(),
                expected: components as u32,
                found: value.len(),
            });
        }

        let last = first as usize + value.len() / components - 1;
        if last >= self.array_size as usize {
            return Err(ValueError::IndexOutOfRange {
                path: self.path.clone(),
                index: last as u32,
                len: self.array_size,
            });
        }

        // Nothing is written unless every element fits.
        let start = self.element_offset(first as usize);
        let end = self.element_offset(last) + self.element_span();
        if end > capacity {
            return Err(ValueError::OutOfBounds {
                offset: start,
                len: end - start,
                capacity,
            });
        }
        Ok(())
    }

    /// Write whole elements starting at element `first`.
    pub fn write(
        &self,
        buffer: &mut BlockBuffer,
        first: u32,
        value: UniformValue,
    ) -> Result<(), ValueError> {
        self.check(first, &value, buffer.capacity())?;
        match value {
            UniformValue::Float(values) => self.write_elements(buffer, first, values),
            UniformValue::Int(values) => self.write_elements(buffer, first, values),
            UniformValue::UInt(values) => self.write_elements(buffer, first, values),
            UniformValue::Bool(values) => {
                let values: Vec<u32> = values.iter().map(|&b| u32::from(b)).collect();
                self.write_elements(buffer, first, &values)
            }
        }
    }

    fn write_elements<T: Pod>(
        &self,
        buffer: &mut BlockBuffer,
        first: u32,
        values: &[T],
    ) -> Result<(), ValueError> {
        for (i, element) in values.chunks(self.components()).enumerate() {
            let base = self.element_offset(first as usize + i);
            if self.ty.is_matrix() {
                self.write_matrix(buffer, base, element)?;
            } else {
                buffer.write(base, element)?;
            }
        }
        Ok(())
    }

    fn write_matrix<T: Pod>(
        &self,
        buffer: &mut BlockBuffer,
        base: usize,
        element: &[T],
    ) -> Result<(), ValueError> {
        let rows = self.ty.rows() as usize;
        let columns = self.ty.columns() as usize;
        let stride = self.vector_stride();

        if !self.row_major {
            for (c, column) in element.chunks(rows).enumerate() {
                buffer.write(base + c * stride, column)?;
            }
            return Ok(());
        }

        let mut row = Vec::with_capacity(columns);
        for r in 0..rows {
            row.clear();
            row.extend((0..columns).map(|c| element[c * rows + r]));
            buffer.write(base + r * stride, &row)?;
        }
        Ok(())
    }

    fn read_elements<T: Pod>(&self, buffer: &BlockBuffer) -> Result<Vec<T>, ValueError> {
        let rows = self.ty.rows() as usize;
        let columns = self.ty.columns() as usize;
        let stride = self.vector_stride();
        let mut values = Vec::with_capacity(self.components() * self.array_size as usize);

        for i in 0..self.array_size as usize {
            let base = self.element_offset(i);
            for c in 0..columns {
                for r in 0..rows {
                    let offset = match (columns > 1, self.row_major) {
                        (false, _) => base + r * 4,
                        (true, false) => base + c * stride + r * 4,
                        (true, true) => base + r * stride + c * 4,
                    };
                    values.push(buffer.read_value(offset)?);
                }
            }
        }
        Ok(values)
    }

    /// Read every element back, matrices in column order.
    pub fn read(&self, buffer: &BlockBuffer) -> Result<UniformData, ValueError> {
        Ok(match self.ty.scalar_kind() {
            Some(ScalarKind::Int | ScalarKind::Sampler) => {
                UniformData::Int(self.read_elements(buffer)?)
            }
            Some(ScalarKind::UInt) => UniformData::UInt(self.read_elements(buffer)?),
            Some(ScalarKind::Bool) => UniformData::Bool(
                self.read_elements::<u32>(buffer)?
                    .into_iter()
                    .map(|v| v != 0)
                    .collect(),
            ),
            Some(ScalarKind::Float) | None => UniformData::Float(self.read_elements(buffer)?),
        })
    }
}

fn lookup<'a>(
    fields: &'a FastHashMap<String, BlockField>,
    record: &BlockRecord,
    path: &str,
) -> Option<&'a BlockField> {
    fields.get(path).or_else(|| {
        path.strip_prefix(record.base_name())
            .and_then(|rest| rest.strip_prefix('.'))
            .and_then(|rest| fields.get(rest))
    })
}

/// A uniform block with its host-side buffer and a writer for every leaf.
#[derive(Debug, Clone)]
pub struct BoundBlock {
    record: BlockRecord,
    buffer: BlockBuffer,
    fields: FastHashMap<String, BlockField>,
}

impl BoundBlock {
    pub(crate) fn new(layout: BlockLayout, fields: Vec<BlockField>) -> Self {
        BoundBlock {
            buffer: BlockBuffer::new(layout.bytes() as usize),
            fields: fields.into_iter().map(|f| (f.path.clone(), f)).collect(),
            record: layout.block,
        }
    }

    pub fn record(&self) -> &BlockRecord {
        &self.record
    }

    pub fn binding(&self) -> u32 {
        self.record.binding
    }

    pub fn buffer(&self) -> &BlockBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut BlockBuffer {
        &mut self.buffer
    }

    /// Look up a leaf by its path in the block, with or without the block name in front.
    pub fn field(&self, path: &str) -> Option<&BlockField> {
        lookup(&self.fields, &self.record, path)
    }

    pub fn fields(&self) -> impl Iterator<Item = &BlockField> {
        self.fields.values()
    }

    /// Set a leaf, starting at element zero for arrays.
    pub fn set<'v>(&mut self, path: &str, value: impl Into<UniformValue<'v>>) -> Result<(), ValueError> {
        self.set_element(path, 0, value)
    }

    /// Set elements of an array leaf starting at `index`.
    pub fn set_element<'v>(
        &mut self,
        path: &str,
        index: u32,
        value: impl Into<UniformValue<'v>>,
    ) -> Result<(), ValueError> {
        let field = lookup(&self.fields, &self.record, path)
            .ok_or_else(|| ValueError::UnknownField(path.to_string()))?;
        field.write(&mut self.buffer, index, value.into())
    }

    /// Read a leaf back from the buffer.
    pub fn get(&self, path: &str) -> Result<UniformData, ValueError> {
        let field = self
            .field(path)
            .ok_or_else(|| ValueError::UnknownField(path.to_string()))?;
        field.read(&self.buffer)
    }

    /// The byte range to upload, see [`BlockBuffer::take_dirty`].
    pub fn take_dirty(&mut self, force: bool) -> Option<Range<usize>> {
        self.buffer.take_dirty(force)
    }
}
