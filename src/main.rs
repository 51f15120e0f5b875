use std::path::Path;
use std::rc::Rc;

use flashread::{
    cli::Cli,
    config::{Config, get_app_data_prefix},
    ingest::import_file,
    logging::{self, LogLevel, LogTarget},
    models::BookId,
    settings::clamp_wpm,
    state::State,
    ui::reader::Reader,
};

use chrono::Local;
use clap::Parser;
use eyre::{Result, bail, eyre};
use tracing::info;

const STATS_DAYS: u64 = 7;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = LogLevel::from_flags(cli.verbose, cli.debug);
    let target = if cli.is_interactive() {
        LogTarget::File(get_app_data_prefix()?.join("flashread.log"))
    } else {
        LogTarget::Stderr
    };
    logging::init(level, target)?;

    if cli.dump {
        let file = cli.file.as_deref().ok_or_else(|| eyre!("--dump needs a FILE"))?;
        return dump_words(file);
    }

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path.clone())?,
        None => Config::new()?,
    };
    if let Some(wpm) = cli.wpm {
        config.preferences.wpm = clamp_wpm(wpm);
    }

    let state = Rc::new(State::new()?);

    if cli.history {
        return print_history(&state);
    }
    if cli.stats {
        return print_stats(&state);
    }
    if let Some(id) = &cli.delete {
        if !state.delete_book(&BookId::new(id.as_str()))? {
            bail!("No book with id {id}");
        }
        println!("Deleted {id}");
        return Ok(());
    }

    let (book_id, title) = if let Some(file) = &cli.file {
        let book = import_file(file)?;
        if state.add_book(&book)? {
            info!(book_id = %book.id, words = book.word_count, "book imported");
            println!("Imported \"{}\" ({} words) as {}", book.title, book.word_count, book.id);
        } else {
            println!("\"{}\" is already in the library as {}", book.title, book.id);
        }
        if cli.add {
            return Ok(());
        }
        (book.id, book.title)
    } else if let Some(id) = &cli.open {
        let book = state
            .get_book(&BookId::new(id.as_str()))?
            .ok_or_else(|| eyre!("No book with id {id}"))?;
        (book.id, book.title)
    } else {
        let last = match state.get_last_read_book()? {
            Some(item) => Some(item),
            None => state.list_books()?.into_iter().next(),
        };
        match last {
            Some(item) => (item.id, item.title),
            None => {
                println!("Your library is empty. Run `flashread FILE` to import a text file.");
                return Ok(());
            }
        }
    };

    let mut reader = Reader::new(config, state, book_id, title)?;
    reader.run()
}

fn dump_words(file: &Path) -> Result<()> {
    let book = import_file(file)?;
    for word in &book.words {
        println!("{word}");
    }
    Ok(())
}

fn print_history(state: &State) -> Result<()> {
    let books = state.list_books()?;
    if books.is_empty() {
        println!("No books in the library.");
        return Ok(());
    }
    for item in books {
        let last_read = item
            .last_read
            .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "never".to_string());
        let done = if item.completed { "done" } else { "" };
        println!(
            "{}  {:>3}%  {:<4}  {:<16}  {}",
            item.id,
            item.percentage(),
            done,
            last_read,
            item.title
        );
    }
    Ok(())
}

fn print_stats(state: &State) -> Result<()> {
    let today = Local::now().date_naive();
    let days = state.recent_stats(today, STATS_DAYS)?;

    let mut total_words = 0;
    let mut total_secs = 0.0;
    for day in &days {
        let Some(date) = day.date else { continue };
        total_words += day.words_read;
        total_secs += day.reading_secs;
        println!(
            "{date}  {:>7} words  {:>9}  {} book(s)",
            day.words_read,
            format_duration(day.reading_secs),
            day.books_read
        );
    }
    println!(
        "Last {STATS_DAYS} days: {total_words} words in {}",
        format_duration(total_secs)
    );

    for session in state.sessions_on(today)? {
        println!(
            "  today: {} ({} words at {} WPM)",
            session.title, session.words_read, session.wpm
        );
    }
    Ok(())
}

fn format_duration(secs: f64) -> String {
    let secs = secs.round() as u64;
    format!("{}m {:02}s", secs / 60, secs % 60)
}
