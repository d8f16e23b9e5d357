//! Compound field types shared by several signals.

use crate::actor::Direction;
use crate::codec::{BufferReader, BufferWriter, CodecError, Color};
use crate::net::ProtocolError;

/// A value written and read as one unit inside a signal body.
pub trait WireField: Sized {
    fn write_to(&self, writer: &mut BufferWriter);
    fn read_from(reader: &mut BufferReader<'_>) -> Result<Self, ProtocolError>;
}

pub fn write_list<T: WireField>(writer: &mut BufferWriter, items: &[T]) {
    let len = items.len().min(u16::MAX as usize);
    writer.write(len as u16);
    for item in &items[..len] {
        item.write_to(writer);
    }
}

pub fn read_list<T: WireField>(reader: &mut BufferReader<'_>) -> Result<Vec<T>, ProtocolError> {
    let len = reader.read::<u16>()? as usize;
    // every element takes at least one byte
    if len > reader.remaining() {
        return Err(CodecError::UnexpectedEnd {
            needed: len,
            remaining: reader.remaining(),
        }
        .into());
    }
    (0..len).map(|_| T::read_from(reader)).collect()
}

pub fn write_opt_str8(writer: &mut BufferWriter, value: Option<&str>) {
    writer.write(value.is_some());
    if let Some(value) = value {
        writer.write_str8(value);
    }
}

pub fn read_opt_str8(reader: &mut BufferReader<'_>) -> Result<Option<String>, CodecError> {
    if reader.read::<bool>()? {
        reader.read_str8().map(Some)
    } else {
        Ok(None)
    }
}

pub fn write_opt_str16(writer: &mut BufferWriter, value: Option<&str>) {
    writer.write(value.is_some());
    if let Some(value) = value {
        writer.write_str16(value);
    }
}

pub fn read_opt_str16(reader: &mut BufferReader<'_>) -> Result<Option<String>, CodecError> {
    if reader.read::<bool>()? {
        reader.read_str16().map(Some)
    } else {
        Ok(None)
    }
}

pub fn read_direction(reader: &mut BufferReader<'_>) -> Result<Direction, ProtocolError> {
    let value = reader.read::<u8>()?;
    Direction::from_u8(value).ok_or(ProtocolError::InvalidValue {
        field: "direction",
        value: value as u64,
    })
}

/// Mugshot shown beside a textbox.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mugshot {
    pub texture_path: String,
    pub animation_path: String,
}

impl WireField for Mugshot {
    fn write_to(&self, writer: &mut BufferWriter) {
        writer
            .write_str16(&self.texture_path)
            .write_str16(&self.animation_path);
    }

    fn read_from(reader: &mut BufferReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            texture_path: reader.read_str16()?,
            animation_path: reader.read_str16()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub description: String,
}

impl WireField for Item {
    fn write_to(&self, writer: &mut BufferWriter) {
        writer
            .write_str8(&self.id)
            .write_str8(&self.name)
            .write_str16(&self.description);
    }

    fn read_from(reader: &mut BufferReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            id: reader.read_str8()?,
            name: reader.read_str8()?,
            description: reader.read_str16()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoardPost {
    pub id: String,
    pub read: bool,
    pub title: String,
    pub author: String,
}

impl WireField for BoardPost {
    fn write_to(&self, writer: &mut BufferWriter) {
        writer
            .write_str8(&self.id)
            .write(self.read)
            .write_str16(&self.title)
            .write_str8(&self.author);
    }

    fn read_from(reader: &mut BufferReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            id: reader.read_str8()?,
            read: reader.read()?,
            title: reader.read_str16()?,
            author: reader.read_str8()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShopItem {
    pub name: String,
    pub description: String,
    pub price: u32,
}

impl WireField for ShopItem {
    fn write_to(&self, writer: &mut BufferWriter) {
        writer
            .write_str8(&self.name)
            .write_str16(&self.description)
            .write(self.price);
    }

    fn read_from(reader: &mut BufferReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            name: reader.read_str8()?,
            description: reader.read_str16()?,
            price: reader.read()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PackageCategory {
    Player = 0,
    Card = 1,
    Encounter = 2,
    Library = 3,
    Block = 4,
    Pack = 5,
}

impl TryFrom<u8> for PackageCategory {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Player,
            1 => Self::Card,
            2 => Self::Encounter,
            3 => Self::Library,
            4 => Self::Block,
            5 => Self::Pack,
            other => {
                return Err(ProtocolError::InvalidValue {
                    field: "package_category",
                    value: other as u64,
                });
            }
        })
    }
}

/// Another player taking part in a PVP encounter.
#[derive(Debug, Clone, PartialEq)]
pub struct RemotePlayer {
    pub ticket: String,
    pub address: String,
}

impl WireField for RemotePlayer {
    fn write_to(&self, writer: &mut BufferWriter) {
        writer.write_str8(&self.ticket).write_str16(&self.address);
    }

    fn read_from(reader: &mut BufferReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            ticket: reader.read_str8()?,
            address: reader.read_str16()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Ease {
    Linear = 0,
    In = 1,
    Out = 2,
    InOut = 3,
    Floor = 4,
}

impl TryFrom<u8> for Ease {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Linear,
            1 => Self::In,
            2 => Self::Out,
            3 => Self::InOut,
            4 => Self::Floor,
            other => {
                return Err(ProtocolError::InvalidValue {
                    field: "ease",
                    value: other as u64,
                });
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum KeyframeProperty {
    Animation(String),
    AnimationSpeed(f32),
    X(f32),
    Y(f32),
    Z(f32),
    ScaleX(f32),
    ScaleY(f32),
    Rotation(f32),
    Direction(Direction),
    SoundEffect(String),
    SoundEffectLoop(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyframeStep {
    pub property: KeyframeProperty,
    pub ease: Ease,
}

impl WireField for KeyframeStep {
    fn write_to(&self, writer: &mut BufferWriter) {
        use KeyframeProperty as P;

        let tag: u8 = match &self.property {
            P::Animation(_) => 0,
            P::AnimationSpeed(_) => 1,
            P::X(_) => 2,
            P::Y(_) => 3,
            P::Z(_) => 4,
            P::ScaleX(_) => 5,
            P::ScaleY(_) => 6,
            P::Rotation(_) => 7,
            P::Direction(_) => 8,
            P::SoundEffect(_) => 9,
            P::SoundEffectLoop(_) => 10,
        };
        writer.write(tag).write(self.ease as u8);

        match &self.property {
            P::Animation(state) => {
                writer.write_str8(state);
            }
            P::AnimationSpeed(value)
            | P::X(value)
            | P::Y(value)
            | P::Z(value)
            | P::ScaleX(value)
            | P::ScaleY(value)
            | P::Rotation(value) => {
                writer.write(*value);
            }
            P::Direction(direction) => {
                writer.write(*direction as u8);
            }
            P::SoundEffect(path) | P::SoundEffectLoop(path) => {
                writer.write_str16(path);
            }
        }
    }

    fn read_from(reader: &mut BufferReader<'_>) -> Result<Self, ProtocolError> {
        use KeyframeProperty as P;

        let tag = reader.read::<u8>()?;
        let ease = Ease::try_from(reader.read::<u8>()?)?;
        let property = match tag {
            0 => P::Animation(reader.read_str8()?),
            1 => P::AnimationSpeed(reader.read()?),
            2 => P::X(reader.read()?),
            3 => P::Y(reader.read()?),
            4 => P::Z(reader.read()?),
            5 => P::ScaleX(reader.read()?),
            6 => P::ScaleY(reader.read()?),
            7 => P::Rotation(reader.read()?),
            8 => P::Direction(read_direction(reader)?),
            9 => P::SoundEffect(reader.read_str16()?),
            10 => P::SoundEffectLoop(reader.read_str16()?),
            other => {
                return Err(ProtocolError::InvalidValue {
                    field: "keyframe_property",
                    value: other as u64,
                });
            }
        };

        Ok(Self { property, ease })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Keyframe {
    /// Seconds spent reaching this frame's values.
    pub duration: f32,
    pub steps: Vec<KeyframeStep>,
}

impl WireField for Keyframe {
    fn write_to(&self, writer: &mut BufferWriter) {
        writer.write(self.duration);
        write_list(writer, &self.steps);
    }

    fn read_from(reader: &mut BufferReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            duration: reader.read()?,
            steps: read_list(reader)?,
        })
    }
}

/// Outcome of a battle, reported back to the server.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BattleResults {
    pub health: i32,
    pub score: u32,
    pub seconds: f32,
    pub ran: bool,
    pub emotion: u8,
    pub turns: u32,
    /// `(enemy id, remaining health)`
    pub enemies: Vec<(String, i32)>,
}

impl WireField for BattleResults {
    fn write_to(&self, writer: &mut BufferWriter) {
        writer
            .write(self.health)
            .write(self.score)
            .write(self.seconds)
            .write(self.ran)
            .write(self.emotion)
            .write(self.turns);

        let len = self.enemies.len().min(u16::MAX as usize);
        writer.write(len as u16);
        for (id, health) in &self.enemies[..len] {
            writer.write_str8(id).write(*health);
        }
    }

    fn read_from(reader: &mut BufferReader<'_>) -> Result<Self, ProtocolError> {
        let health = reader.read()?;
        let score = reader.read()?;
        let seconds = reader.read()?;
        let ran = reader.read()?;
        let emotion = reader.read()?;
        let turns = reader.read()?;

        let len = reader.read::<u16>()? as usize;
        let mut enemies = Vec::with_capacity(len.min(reader.remaining()));
        for _ in 0..len {
            enemies.push((reader.read_str8()?, reader.read::<i32>()?));
        }

        Ok(Self {
            health,
            score,
            seconds,
            ran,
            emotion,
            turns,
            enemies,
        })
    }
}

impl WireField for Color {
    fn write_to(&self, writer: &mut BufferWriter) {
        writer.write_rgba(*self);
    }

    fn read_from(reader: &mut BufferReader<'_>) -> Result<Self, ProtocolError> {
        Ok(reader.read_rgba()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_length_checked_against_buffer() {
        // claims 500 posts in a 3 byte body
        let bytes = [0xF4u8, 0x01, 0];
        let mut reader = BufferReader::new(&bytes);

        assert!(matches!(
            read_list::<BoardPost>(&mut reader),
            Err(ProtocolError::Codec(CodecError::UnexpectedEnd { .. }))
        ));
    }

    #[test]
    fn test_keyframe_layout() {
        let keyframe = Keyframe {
            duration: 0.5,
            steps: vec![
                KeyframeStep {
                    property: KeyframeProperty::X(3.0),
                    ease: Ease::Out,
                },
                KeyframeStep {
                    property: KeyframeProperty::Animation("IDLE_D".to_string()),
                    ease: Ease::Floor,
                },
            ],
        };

        let mut writer = BufferWriter::new();
        keyframe.write_to(&mut writer);
        let bytes = writer.into_inner();

        // duration, count, [tag, ease, f32], [tag, ease, len, "IDLE_D"]
        assert_eq!(bytes.len(), 4 + 2 + (2 + 4) + (2 + 1 + 6));

        let mut reader = BufferReader::new(&bytes);
        assert_eq!(Keyframe::read_from(&mut reader), Ok(keyframe));
    }

    #[test]
    fn test_unknown_keyframe_property_rejected() {
        let bytes = [99u8, 0];
        let mut reader = BufferReader::new(&bytes);

        assert_eq!(
            KeyframeStep::read_from(&mut reader),
            Err(ProtocolError::InvalidValue {
                field: "keyframe_property",
                value: 99
            })
        );
    }
}
