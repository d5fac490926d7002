//! Conversion directives read from the metadata file written by the script
//! translator. One directive per line: `KEYWORD <argument>`.

use std::fs;
use std::path::Path;

pub const SPEAK_AS_ACTOR: &str = "ADD_SPEAK_AS_ACTOR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Actor that dialogue is spoken through and needs a placed reference.
    SpeakAsActor(String),
}

/// Every recognized directive, in file order. Unknown keywords and lines
/// without an argument are ignored.
pub fn parse(text: &str) -> Vec<Directive> {
    text.lines()
        .filter_map(|line| {
            let line = line.trim();
            let (keyword, argument) = line.split_once(char::is_whitespace)?;
            let argument = argument.trim();
            if argument.is_empty() {
                return None;
            }
            match keyword {
                SPEAK_AS_ACTOR => Some(Directive::SpeakAsActor(argument.to_string())),
                _ => None,
            }
        })
        .collect()
}

pub fn speak_as_actors(directives: &[Directive]) -> Vec<String> {
    directives
        .iter()
        .map(|directive| match directive {
            Directive::SpeakAsActor(name) => name.clone(),
        })
        .collect()
}

/// Read and parse a directive file. A missing file means no directives.
pub fn read_directive_file<P: AsRef<Path>>(path: P) -> std::io::Result<Vec<Directive>> {
    let path = path.as_ref();
    match fs::read_to_string(path) {
        Ok(text) => Ok(parse(&text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::warn!("directive file {} not found; no directives applied", path.display());
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}
