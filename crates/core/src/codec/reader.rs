use glam::Vec3;

use super::{CodecError, Color, WireValue};

/// Cursor over a received body. Every read is bounds-checked; a failed read
/// leaves the cursor where it was.
#[derive(Debug, Clone)]
pub struct BufferReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> BufferReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Everything not consumed yet.
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.offset..]
    }

    fn take_slice(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        let remaining = self.remaining();
        if remaining < len {
            return Err(CodecError::UnexpectedEnd {
                needed: len,
                remaining,
            });
        }

        let slice = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    pub fn read<T: WireValue>(&mut self) -> Result<T, CodecError> {
        self.take_slice(T::WIDTH).map(T::take)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        self.take_slice(len)
    }

    pub fn read_bytes16(&mut self) -> Result<Vec<u8>, CodecError> {
        let start = self.offset;
        let len = self.read::<u16>()? as usize;
        match self.take_slice(len) {
            Ok(bytes) => Ok(bytes.to_vec()),
            Err(err) => {
                self.offset = start;
                Err(err)
            }
        }
    }

    pub fn read_str8(&mut self) -> Result<String, CodecError> {
        let start = self.offset;
        let len = self.read::<u8>()? as usize;
        self.read_utf8(start, len)
    }

    pub fn read_str16(&mut self) -> Result<String, CodecError> {
        let start = self.offset;
        let len = self.read::<u16>()? as usize;
        self.read_utf8(start, len)
    }

    fn read_utf8(&mut self, start: usize, len: usize) -> Result<String, CodecError> {
        let result = self.take_slice(len).and_then(|bytes| {
            std::str::from_utf8(bytes)
                .map(str::to_owned)
                .map_err(|_| CodecError::InvalidUtf8)
        });

        if result.is_err() {
            self.offset = start;
        }
        result
    }

    pub fn read_rgb(&mut self) -> Result<Color, CodecError> {
        let bytes = self.take_slice(3)?;
        Ok(Color::rgb(bytes[0], bytes[1], bytes[2]))
    }

    pub fn read_rgba(&mut self) -> Result<Color, CodecError> {
        let bytes = self.take_slice(4)?;
        Ok(Color::rgba(bytes[0], bytes[1], bytes[2], bytes[3]))
    }

    pub fn read_vec3(&mut self) -> Result<Vec3, CodecError> {
        let bytes = self.take_slice(12)?;
        Ok(Vec3::new(
            f32::take(&bytes[0..4]),
            f32::take(&bytes[4..8]),
            f32::take(&bytes[8..12]),
        ))
    }
}
