use crate::error::ValueError;
use bytemuck::Pod;
use std::ops::Range;

/// Host-side storage for one uniform block, tracking which bytes changed since the
/// last flush.
///
/// Values are stored in native byte order.
#[derive(Debug, Clone)]
pub struct BlockBuffer {
    data: Box<[u8]>,
    size: usize,
    dirty: Option<Range<usize>>,
}

impl BlockBuffer {
    pub fn new(capacity: usize) -> Self {
        BlockBuffer {
            data: vec![0u8; capacity].into_boxed_slice(),
            size: capacity,
            dirty: None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// The number of bytes a forced flush uploads.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Limit forced flushes to the first `size` bytes, clamped to the capacity.
    pub fn set_size(&mut self, size: usize) {
        self.size = size.min(self.capacity());
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    fn range(&self, offset: usize, len: usize) -> Result<Range<usize>, ValueError> {
        match offset.checked_add(len) {
            Some(end) if end <= self.data.len() => Ok(offset..end),
            _ => Err(ValueError::OutOfBounds {
                offset,
                len,
                capacity: self.data.len(),
            }),
        }
    }

    fn mark_dirty(&mut self, range: Range<usize>) {
        self.dirty = Some(match self.dirty.take() {
            Some(dirty) => dirty.start.min(range.start)..dirty.end.max(range.end),
            None => range,
        });
    }

    /// Write values contiguously at `offset`.
    pub fn write<T: Pod>(&mut self, offset: usize, values: &[T]) -> Result<(), ValueError> {
        let bytes: &[u8] = bytemuck::cast_slice(values);
        let range = self.range(offset, bytes.len())?;
        self.data[range.clone()].copy_from_slice(bytes);
        if !range.is_empty() {
            self.mark_dirty(range);
        }
        Ok(())
    }

    pub fn read(&self, offset: usize, len: usize) -> Result<&[u8], ValueError> {
        let range = self.range(offset, len)?;
        Ok(&self.data[range])
    }

    /// Read one value at `offset`, which need not be aligned.
    pub fn read_value<T: Pod>(&self, offset: usize) -> Result<T, ValueError> {
        let bytes = self.read(offset, std::mem::size_of::<T>())?;
        Ok(bytemuck::pod_read_unaligned(bytes))
    }

    pub fn set_f32(&mut self, offset: usize, value: f32) -> Result<(), ValueError> {
        self.write(offset, &[value])
    }

    pub fn set_f32s(&mut self, offset: usize, values: &[f32]) -> Result<(), ValueError> {
        self.write(offset, values)
    }

    pub fn set_i32(&mut self, offset: usize, value: i32) -> Result<(), ValueError> {
        self.write(offset, &[value])
    }

    pub fn set_i32s(&mut self, offset: usize, values: &[i32]) -> Result<(), ValueError> {
        self.write(offset, values)
    }

    /// The range written since the last flush.
    pub fn dirty(&self) -> Option<Range<usize>> {
        self.dirty.clone()
    }

    /// Take the range to upload and clear it. A forced flush covers the whole buffer.
    pub fn take_dirty(&mut self, force: bool) -> Option<Range<usize>> {
        let dirty = self.dirty.take();
        let range = if force { Some(0..self.size) } else { dirty };
        range.filter(|r| !r.is_empty())
    }

    /// A cursor writing consecutive values from `offset`.
    pub fn updater(&mut self, offset: usize) -> BlockUpdater<'_> {
        BlockUpdater {
            buffer: self,
            offset,
        }
    }
}

/// A write cursor over a [`BlockBuffer`].
pub struct BlockUpdater<'a> {
    buffer: &'a mut BlockBuffer,
    offset: usize,
}

impl BlockUpdater<'_> {
    /// The offset the next value is written at.
    pub fn offset(&self) -> usize {
        self.offset
    }

    fn push<T: Pod>(&mut self, values: &[T]) -> Result<&mut Self, ValueError> {
        self.buffer.write(self.offset, values)?;
        self.offset += std::mem::size_of_val(values);
        Ok(self)
    }

    pub fn push_f32(&mut self, value: f32) -> Result<&mut Self, ValueError> {
        self.push(&[value])
    }

    pub fn push_f32s(&mut self, values: &[f32]) -> Result<&mut Self, ValueError> {
        self.push(values)
    }

    pub fn push_i32(&mut self, value: i32) -> Result<&mut Self, ValueError> {
        self.push(&[value])
    }

    pub fn push_i32s(&mut self, values: &[i32]) -> Result<&mut Self, ValueError> {
        self.push(values)
    }
}
