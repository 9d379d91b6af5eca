pub mod error;
pub mod extract;
pub mod fetch;
pub mod locate;
pub mod pipeline;
pub mod render;

pub use ridetrace_parser as parser;
