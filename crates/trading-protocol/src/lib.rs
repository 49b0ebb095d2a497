//! trading-protocol
//!
//! Wire-level encoding/decoding for the trading server: the fixed-size
//! order frame exchanged in both directions and the one-shot trader-id
//! handshake a client sends after connecting.

pub mod frame;

pub use frame::{
    decode_frame, decode_handshake, encode_frame, encode_handshake, FrameError, OrderFrame,
    FRAME_LEN, HANDSHAKE_LEN, STOCK_LEN, TRADER_LEN,
};
