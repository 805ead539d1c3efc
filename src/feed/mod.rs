//! Price feed module
//!
//! Instruments, stream addressing, and decoding of raw stream messages into ticks

mod binance;
mod decoder;
mod types;

pub use binance::{BinanceStream, StreamKind, BINANCE_WS_URL};
pub use decoder::{
    parse_decimal, DecodeError, FieldCandidate, FieldParser, TickDecoder, PRICE_FIELDS,
    VOLUME_FIELDS,
};
pub use types::{Instrument, InstrumentError, Tick};
