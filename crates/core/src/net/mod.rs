mod config;
mod envelope;
mod error;
mod processor;
mod shipper;
mod sorter;
mod stats;

pub(crate) use config::secs;

pub use config::ProcessorConfig;
pub use envelope::{
    ACK_SIGNAL, FRAME_HEADER_SIZE, Frame, HEARTBEAT_SIGNAL, MAX_DATAGRAM_SIZE, MAX_PAYLOAD_SIZE,
    Reliability, decode_ack, encode_ack, encode_heartbeat, peek_signal,
};
pub use error::ProtocolError;
pub use processor::PacketProcessor;
pub use shipper::PacketShipper;
pub use sorter::{PacketSorter, Sorted};
pub use stats::{LossSimulation, NetworkStats};
