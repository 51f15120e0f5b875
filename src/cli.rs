use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "flashread",
    version,
    about = "Read plain-text books one word at a time in the terminal.",
    long_about = None
)]
pub struct Cli {
    /// Print the library with reading progress
    #[clap(short = 'r', long)]
    pub history: bool,

    /// Print the words of FILE one per line
    #[clap(short, long, requires = "file")]
    pub dump: bool,

    /// Print reading statistics for the last week
    #[clap(long)]
    pub stats: bool,

    /// Remove a book from the library
    #[clap(long, value_name = "ID")]
    pub delete: Option<String>,

    /// Open a library book by id
    #[clap(long, value_name = "ID", conflicts_with = "file")]
    pub open: Option<String>,

    /// Import FILE into the library without opening it
    #[clap(long, requires = "file")]
    pub add: bool,

    /// Reading speed for this session, in words per minute
    #[clap(short, long, value_name = "N")]
    pub wpm: Option<u32>,

    /// Use a specific configuration file
    #[clap(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[clap(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Enable debug output
    #[clap(long)]
    pub debug: bool,

    /// Plain-text book to import and read
    #[clap(name = "file", value_name = "FILE")]
    pub file: Option<PathBuf>,
}

impl Cli {
    /// Whether this invocation starts the terminal reader.
    pub fn is_interactive(&self) -> bool {
        !(self.history || self.dump || self.stats || self.add || self.delete.is_some())
    }
}
