//! WebSocket protocol core types (RFC 6455).

pub mod frame;
pub mod mask;
pub mod opcode;

pub use frame::{Frame, MAX_CONTROL_FRAME_PAYLOAD};
pub use mask::{apply_mask, apply_mask_fast};
pub use opcode::OpCode;
