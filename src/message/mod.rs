//! IRC message parsing.

mod nom_parser;
pub mod tags;
mod types;

pub use self::nom_parser::parse_line;
pub use self::tags::Tag;
pub use self::types::Message;
