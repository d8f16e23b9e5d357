//! Binary reader/writer shared by every signal encoder and decoder.
//!
//! This is the only place the wire layout is defined. Fixed-width values are
//! little-endian, strings are UTF-8 with either a `u8` (`str8`) or `u16`
//! (`str16`) length prefix, byte blobs carry a `u16` length prefix.

mod reader;
mod writer;

pub use reader::BufferReader;
pub use writer::BufferWriter;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("unexpected end of buffer: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEnd { needed: usize, remaining: usize },
    #[error("string field is not valid utf-8")]
    InvalidUtf8,
}

/// A value with a fixed-width little-endian wire representation.
pub trait WireValue: Sized {
    const WIDTH: usize;

    fn put(self, out: &mut Vec<u8>);

    /// `bytes` is guaranteed to hold at least `WIDTH` bytes.
    fn take(bytes: &[u8]) -> Self;
}

macro_rules! impl_wire_value {
    ($($ty:ty),*) => {
        $(
            impl WireValue for $ty {
                const WIDTH: usize = std::mem::size_of::<$ty>();

                #[inline]
                fn put(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                #[inline]
                fn take(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(&bytes[..Self::WIDTH]);
                    <$ty>::from_le_bytes(raw)
                }
            }
        )*
    };
}

impl_wire_value!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

impl WireValue for bool {
    const WIDTH: usize = 1;

    #[inline]
    fn put(self, out: &mut Vec<u8>) {
        out.push(self as u8);
    }

    #[inline]
    fn take(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_fixed_width_layout_is_little_endian() {
        let mut writer = BufferWriter::new();
        writer.write(0x0102u16).write(0x0A0B0C0Du32);

        assert_eq!(writer.as_bytes(), &[0x02, 0x01, 0x0D, 0x0C, 0x0B, 0x0A]);
    }

    #[test]
    fn test_read_advances_cursor() {
        let mut writer = BufferWriter::new();
        writer
            .write(7u8)
            .write(-3i32)
            .write(1.5f32)
            .write(true)
            .write_str8("abc")
            .write_str16("a longer message")
            .write_bytes16(&[9, 8, 7])
            .write_rgba(Color::rgba(1, 2, 3, 4))
            .write_vec3(Vec3::new(1.0, 2.0, 3.0));

        let bytes = writer.into_inner();
        let mut reader = BufferReader::new(&bytes);

        assert_eq!(reader.read::<u8>(), Ok(7));
        assert_eq!(reader.read::<i32>(), Ok(-3));
        assert_eq!(reader.read::<f32>(), Ok(1.5));
        assert_eq!(reader.read::<bool>(), Ok(true));
        assert_eq!(reader.read_str8().as_deref(), Ok("abc"));
        assert_eq!(reader.read_str16().as_deref(), Ok("a longer message"));
        assert_eq!(reader.read_bytes16(), Ok(vec![9, 8, 7]));
        assert_eq!(reader.read_rgba(), Ok(Color::rgba(1, 2, 3, 4)));
        assert_eq!(reader.read_vec3(), Ok(Vec3::new(1.0, 2.0, 3.0)));
        assert!(reader.is_empty());
    }

    #[test]
    fn test_short_buffer_fails_fast() {
        let bytes = [1u8, 2, 3];
        let mut reader = BufferReader::new(&bytes);

        assert_eq!(
            reader.read::<u32>(),
            Err(CodecError::UnexpectedEnd {
                needed: 4,
                remaining: 3
            })
        );
        // a failed read leaves the cursor untouched
        assert_eq!(reader.offset(), 0);
        assert_eq!(reader.read::<u16>(), Ok(0x0201));
    }

    #[test]
    fn test_string_length_prefix_checked() {
        // claims 10 bytes but only carries 2
        let bytes = [10u8, b'h', b'i'];
        let mut reader = BufferReader::new(&bytes);

        assert!(matches!(
            reader.read_str8(),
            Err(CodecError::UnexpectedEnd { needed: 10, .. })
        ));
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let bytes = [2u8, 0xFF, 0xFE];
        let mut reader = BufferReader::new(&bytes);

        assert_eq!(reader.read_str8(), Err(CodecError::InvalidUtf8));
    }

    #[test]
    fn test_str8_truncates_on_char_boundary() {
        let long = "é".repeat(200);
        let mut writer = BufferWriter::new();
        writer.write_str8(&long);

        let bytes = writer.into_inner();
        let mut reader = BufferReader::new(&bytes);
        let decoded = reader.read_str8().unwrap();

        assert!(decoded.len() <= u8::MAX as usize);
        assert!(long.starts_with(&decoded));
    }
}
