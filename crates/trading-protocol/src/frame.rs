//! Fixed-layout wire frames for the trading protocol.
//!
//! Every order, inbound or outbound, travels as one fixed-size frame in
//! native byte order with no framing delimiter; the frame length itself is
//! the delimiter. Layout:
//!
//! ```text
//! [0..8]    stock      NUL-padded ASCII, at most 7 significant bytes
//! [8..72]   trader     NUL-padded ASCII, at most 63 significant bytes
//! [72..76]  trader_id  i32
//! [76..80]  quantity   i32, non-negative
//! [80..84]  balance    i32
//! [84..88]  side       i32, 0 = Buy, 1 = Sell
//! ```
//!
//! A connection opens with a separate 8-byte handshake carrying the decimal
//! trader id as NUL-padded ASCII.
//!
//! Decoding rejects anything outside that domain; a rejected frame is a
//! protocol violation and the server closes the offending connection.

use std::fmt;

use trading_core::{Order, Side};

/// Width of the stock field, including its NUL terminator.
pub const STOCK_LEN: usize = 8;

/// Width of the trader name field, including its NUL terminator.
pub const TRADER_LEN: usize = 64;

/// Total order frame size on the wire.
pub const FRAME_LEN: usize = STOCK_LEN + TRADER_LEN + 4 * 4;

/// Size of the trader-id handshake sent once after connect.
pub const HANDSHAKE_LEN: usize = 8;

/// Field offsets within a frame.
const TRADER_ID_OFF: usize = STOCK_LEN + TRADER_LEN;
const QUANTITY_OFF: usize = TRADER_ID_OFF + 4;
const BALANCE_OFF: usize = QUANTITY_OFF + 4;
const SIDE_OFF: usize = BALANCE_OFF + 4;

/// The decoded fields of one order frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderFrame {
    pub stock: String,
    pub trader: String,
    pub trader_id: i32,
    pub quantity: i32,
    pub balance: i32,
    pub side: Side,
}

impl From<&Order> for OrderFrame {
    fn from(order: &Order) -> Self {
        OrderFrame {
            stock: order.stock.clone(),
            trader: order.trader.clone(),
            trader_id: order.trader_id,
            quantity: order.quantity,
            balance: order.balance,
            side: order.side,
        }
    }
}

/// Errors raised while encoding or decoding frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Buffer shorter than the fixed frame size.
    Truncated { got: usize, want: usize },
    /// Side field held something other than 0 or 1.
    UnknownSide(i32),
    /// Quantity field was negative.
    NegativeQuantity(i32),
    /// A string field had no NUL terminator.
    Unterminated(&'static str),
    /// A string field held non-ASCII bytes.
    BadText(&'static str),
    /// A string too long for its fixed field.
    FieldTooLong(&'static str),
    /// Handshake bytes did not parse as a decimal trader id.
    BadHandshake,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::Truncated { got, want } => {
                write!(f, "frame truncated: {} bytes, expected {}", got, want)
            }
            FrameError::UnknownSide(v) => write!(f, "unknown side value: {}", v),
            FrameError::NegativeQuantity(q) => write!(f, "negative quantity: {}", q),
            FrameError::Unterminated(field) => {
                write!(f, "field '{}' is not NUL-terminated", field)
            }
            FrameError::BadText(field) => write!(f, "field '{}' is not ASCII", field),
            FrameError::FieldTooLong(field) => {
                write!(f, "field '{}' does not fit its fixed width", field)
            }
            FrameError::BadHandshake => write!(f, "handshake is not a decimal trader id"),
        }
    }
}

impl std::error::Error for FrameError {}

/// Decode one order frame.
///
/// The buffer must hold at least [`FRAME_LEN`] bytes; extra bytes are
/// ignored. Bytes after a string field's first NUL are ignored as padding.
pub fn decode_frame(buf: &[u8]) -> Result<OrderFrame, FrameError> {
    if buf.len() < FRAME_LEN {
        return Err(FrameError::Truncated {
            got: buf.len(),
            want: FRAME_LEN,
        });
    }

    let stock = read_text(&buf[..STOCK_LEN], "stock")?;
    let trader = read_text(&buf[STOCK_LEN..TRADER_ID_OFF], "trader")?;
    let trader_id = read_i32(buf, TRADER_ID_OFF);
    let quantity = read_i32(buf, QUANTITY_OFF);
    let balance = read_i32(buf, BALANCE_OFF);
    let side_raw = read_i32(buf, SIDE_OFF);

    if quantity < 0 {
        return Err(FrameError::NegativeQuantity(quantity));
    }
    let side = Side::from_i32(side_raw).ok_or(FrameError::UnknownSide(side_raw))?;

    Ok(OrderFrame {
        stock,
        trader,
        trader_id,
        quantity,
        balance,
        side,
    })
}

/// Encode one order frame.
///
/// Fails only when a string field cannot fit its fixed width with a NUL
/// terminator. `decode_frame(encode_frame(f)) == f` for every frame that
/// encodes.
pub fn encode_frame(frame: &OrderFrame) -> Result<[u8; FRAME_LEN], FrameError> {
    let mut buf = [0u8; FRAME_LEN];
    write_text(&mut buf[..STOCK_LEN], &frame.stock, "stock")?;
    write_text(&mut buf[STOCK_LEN..TRADER_ID_OFF], &frame.trader, "trader")?;
    buf[TRADER_ID_OFF..QUANTITY_OFF].copy_from_slice(&frame.trader_id.to_ne_bytes());
    buf[QUANTITY_OFF..BALANCE_OFF].copy_from_slice(&frame.quantity.to_ne_bytes());
    buf[BALANCE_OFF..SIDE_OFF].copy_from_slice(&frame.balance.to_ne_bytes());
    buf[SIDE_OFF..FRAME_LEN].copy_from_slice(&frame.side.as_i32().to_ne_bytes());
    Ok(buf)
}

/// Parse the 8-byte connect handshake into a trader id.
pub fn decode_handshake(buf: &[u8]) -> Result<i32, FrameError> {
    if buf.len() < HANDSHAKE_LEN {
        return Err(FrameError::Truncated {
            got: buf.len(),
            want: HANDSHAKE_LEN,
        });
    }
    let end = buf[..HANDSHAKE_LEN]
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(HANDSHAKE_LEN);
    let text = std::str::from_utf8(&buf[..end]).map_err(|_| FrameError::BadHandshake)?;
    text.parse::<i32>().map_err(|_| FrameError::BadHandshake)
}

/// Format a trader id as the 8-byte connect handshake.
pub fn encode_handshake(trader_id: i32) -> Result<[u8; HANDSHAKE_LEN], FrameError> {
    let text = trader_id.to_string();
    if text.len() >= HANDSHAKE_LEN {
        return Err(FrameError::FieldTooLong("trader_id"));
    }
    let mut buf = [0u8; HANDSHAKE_LEN];
    buf[..text.len()].copy_from_slice(text.as_bytes());
    Ok(buf)
}

// -----------------------------------------------------------------------------
// Helpers
// -----------------------------------------------------------------------------

/// Read a NUL-terminated ASCII string out of a fixed-width field.
fn read_text(field: &[u8], name: &'static str) -> Result<String, FrameError> {
    let end = field
        .iter()
        .position(|&b| b == 0)
        .ok_or(FrameError::Unterminated(name))?;
    let text = std::str::from_utf8(&field[..end]).map_err(|_| FrameError::BadText(name))?;
    if !text.is_ascii() {
        return Err(FrameError::BadText(name));
    }
    Ok(text.to_string())
}

/// Write a string into a fixed-width field, NUL-padding the remainder.
/// The field is already zeroed; a terminator byte must still fit.
fn write_text(field: &mut [u8], text: &str, name: &'static str) -> Result<(), FrameError> {
    let bytes = text.as_bytes();
    if bytes.len() >= field.len() {
        return Err(FrameError::FieldTooLong(name));
    }
    if !text.is_ascii() {
        return Err(FrameError::BadText(name));
    }
    field[..bytes.len()].copy_from_slice(bytes);
    Ok(())
}

fn read_i32(buf: &[u8], offset: usize) -> i32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&buf[offset..offset + 4]);
    i32::from_ne_bytes(raw)
}
