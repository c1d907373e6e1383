pub mod cache;
pub mod config;
pub mod definition;
pub mod detect;
pub mod error;
pub mod generator;
pub mod merge;
pub mod numbering;
pub mod parser;
pub mod scanner;
pub mod store;
pub mod sync;
pub mod validator;

pub use definition::EnumDefinition;
pub use error::{Result, SyncError};
pub use generator::generate;
pub use merge::merge;
pub use numbering::{next_value, NumberingMode, NumberingPolicy};
pub use parser::{parse, ParsedEnum, ParsedEnumValue};
