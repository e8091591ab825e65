//! Log line records and the parser chain that refines them.

mod parser;
mod record;

pub use parser::{LineParser, MetadataParser, ParseError, NO_CONTEXT};
pub use record::LogLine;
