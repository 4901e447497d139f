pub mod error;
pub mod key;
pub mod types;

pub use error::{CacheError, Result};
pub use key::{KeyParams, ParamValue, build_key};
pub use types::{
    CacheEntry, CacheSource, CacheTypeStats, EntryMeta, InvalidationScope, ReadOptions,
    WriteOptions,
};
