use glam::Vec3;

use super::{Color, WireValue};

#[derive(Debug, Clone, Default)]
pub struct BufferWriter {
    data: Vec<u8>,
}

impl BufferWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    pub fn write<T: WireValue>(&mut self, value: T) -> &mut Self {
        value.put(&mut self.data);
        self
    }

    pub fn write_raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.data.extend_from_slice(bytes);
        self
    }

    /// Strings longer than 255 bytes are cut at the last char boundary that fits.
    pub fn write_str8(&mut self, value: &str) -> &mut Self {
        let value = truncate_utf8(value, u8::MAX as usize);
        self.write(value.len() as u8).write_raw(value.as_bytes())
    }

    pub fn write_str16(&mut self, value: &str) -> &mut Self {
        let value = truncate_utf8(value, u16::MAX as usize);
        self.write(value.len() as u16).write_raw(value.as_bytes())
    }

    pub fn write_bytes16(&mut self, bytes: &[u8]) -> &mut Self {
        let len = bytes.len().min(u16::MAX as usize);
        if len < bytes.len() {
            log::warn!(
                "Byte field of {} bytes truncated to {} on encode",
                bytes.len(),
                len
            );
        }
        self.write(len as u16).write_raw(&bytes[..len])
    }

    pub fn write_rgb(&mut self, color: Color) -> &mut Self {
        self.write_raw(&[color.r, color.g, color.b])
    }

    pub fn write_rgba(&mut self, color: Color) -> &mut Self {
        self.write_raw(&[color.r, color.g, color.b, color.a])
    }

    pub fn write_vec3(&mut self, value: Vec3) -> &mut Self {
        self.write(value.x).write(value.y).write(value.z)
    }
}

fn truncate_utf8(value: &str, max: usize) -> &str {
    if value.len() <= max {
        return value;
    }

    log::warn!(
        "String field of {} bytes truncated to fit a {} byte prefix",
        value.len(),
        max
    );

    let mut end = max;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}
