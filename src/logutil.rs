//! Logging helpers.
//!
//! Editor keys and script names come straight out of authored data and may
//! hold control characters; [`escape_log`] keeps them on one log line.
//! [`init_logging`] sets up `env_logger` for the binary.

use std::io::Write;
use std::sync::{Arc, Mutex};

use crate::config::LoggingConfig;

/// Editor keys top out well below this; anything longer is a script name
/// or text pulled from a malformed dump and is cut with an ellipsis.
const MAX_LOGGED_KEY: usize = 96;

/// Make an authored key or label safe for a single log line: control
/// characters are escaped and the value is capped at [`MAX_LOGGED_KEY`] chars.
pub fn escape_log(key: &str) -> String {
    let mut out = String::with_capacity(key.len().min(MAX_LOGGED_KEY) + 4);
    let mut chars = key.chars();
    for ch in chars.by_ref().take(MAX_LOGGED_KEY) {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.extend(c.escape_unicode()),
            c => out.push(c),
        }
    }
    if chars.next().is_some() {
        out.push('…');
    }
    out
}

fn parse_level(level: &str) -> log::LevelFilter {
    match level.trim().to_ascii_lowercase().as_str() {
        "off" => log::LevelFilter::Off,
        "error" => log::LevelFilter::Error,
        "warn" | "warning" => log::LevelFilter::Warn,
        "debug" => log::LevelFilter::Debug,
        "trace" => log::LevelFilter::Trace,
        _ => log::LevelFilter::Info,
    }
}

/// Initialize logging. `-v` flags raise the configured level; with a log file
/// configured, lines go to the file and also to the console when stdout is a TTY.
pub fn init_logging(config: Option<&LoggingConfig>, verbosity: u8) {
    let mut builder = env_logger::Builder::new();
    let base_level = match verbosity {
        0 => config.map_or(log::LevelFilter::Info, |cfg| parse_level(&cfg.level)),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let file = config
        .and_then(|cfg| cfg.file.as_ref())
        .and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });

    match file {
        Some(f) => {
            let sink = Arc::new(Mutex::new(f));
            let is_tty = atty::is(atty::Stream::Stdout);
            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());
                if let Ok(mut guard) = sink.lock() {
                    let _ = writeln!(guard, "{}", line);
                }
                if is_tty {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
        }
        None => {
            builder.format(|fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
            });
        }
    }
    let _ = builder.try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_control_characters_in_keys() {
        assert_eq!(escape_log("Gate\nDoor\t01"), "Gate\\nDoor\\t01");
        assert_eq!(escape_log("a\u{7}b"), "a\\u{7}b");
        assert_eq!(escape_log("TES4Door\\x"), "TES4Door\\\\x");
    }

    #[test]
    fn caps_long_keys_only() {
        let at_cap = "k".repeat(MAX_LOGGED_KEY);
        assert_eq!(escape_log(&at_cap), at_cap);

        let long = "x".repeat(MAX_LOGGED_KEY + 10);
        let escaped = escape_log(&long);
        assert!(escaped.ends_with('…'));
        assert_eq!(escaped.chars().count(), MAX_LOGGED_KEY + 1);
    }

    #[test]
    fn unknown_levels_fall_back_to_info() {
        assert_eq!(parse_level("WARN"), log::LevelFilter::Warn);
        assert_eq!(parse_level("chatty"), log::LevelFilter::Info);
    }
}
