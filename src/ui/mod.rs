pub mod reader;
pub mod sink;
pub mod windows;
