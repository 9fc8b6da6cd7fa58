//! A bounded, lock-free, multi-producer/multi-consumer ring buffer for
//! transporting fixed-shape records between threads without locks,
//! blocking, or per-operation heap allocation.

pub mod constants;
pub mod error;
pub mod record;
pub mod ring;

pub use error::{Result, RingError};
pub use record::TradeRecord;
pub use ring::RingBuffer;
