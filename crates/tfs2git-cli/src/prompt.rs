//! Interactive prompt collection.
//!
//! All terminal input lives here; the core engine only ever receives a fully
//! formed parameter bundle and an injected confirmation function, so it runs
//! headless in tests.

use std::io::{self, BufRead, Write};

/// Prints `message` and reads one trimmed line from stdin.
///
/// # Errors
///
/// Returns the underlying I/O error when stdin or stdout is unavailable.
pub fn line(message: &str) -> io::Result<String> {
    print!("{message}: ");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Asks a yes/no question; anything other than an explicit yes declines.
pub fn confirm(message: &str) -> bool {
    match line(&format!("{message} [y/N]")) {
        Ok(answer) => matches!(answer.to_lowercase().as_str(), "y" | "yes"),
        Err(_) => false,
    }
}
