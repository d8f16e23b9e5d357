use crate::codec::CodecError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Codec(#[from] CodecError),
    #[error("empty frame")]
    EmptyFrame,
    #[error("unknown reliability class {0}")]
    UnknownReliability(u8),
    #[error("unknown signal {0}")]
    UnknownSignal(u16),
    #[error("invalid value {value} for field `{field}`")]
    InvalidValue { field: &'static str, value: u64 },
}
