//! Command vocabulary and line validation.

use std::fmt;

use log::debug;
use thiserror::Error;

use crate::types::{Arg, Destination, Instruction, Task, DEFAULT_VOCABULARY};

/// Word that asks for the help text instead of issuing a command.
pub const HELP_WORD: &str = "help";

#[derive(Debug, Error)]
pub enum InputError {
    #[error("empty input")]
    Empty,

    #[error("help requested")]
    HelpRequested,

    #[error("command word `{0}` is not first")]
    IncorrectFormat(String),

    #[error("input not recognized")]
    Unrecognized,

    #[error("`{0}` is not a task")]
    UnknownTask(String),

    #[error("input closed")]
    Eof,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Commands an input screen accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    words: Vec<String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new(DEFAULT_VOCABULARY)
    }
}

impl Vocabulary {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for w in words {
            let w = w.into();
            if !w.is_empty() && !out.contains(&w) {
                out.push(w);
            }
        }
        Self { words: out }
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.iter().any(|w| w == word)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl fmt::Display for Vocabulary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, w) in self.words.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "'{w}'")?;
        }
        f.write_str("]")
    }
}

/// Validate one line of user input.
///
/// The line is accepted when its first word is a command. A command word
/// anywhere else is a format error.
pub fn check_input(line: &str, vocab: &Vocabulary) -> Result<Vec<String>, InputError> {
    let words: Vec<String> = line.split_whitespace().map(str::to_string).collect();
    let Some(first) = words.first() else {
        return Err(InputError::Empty);
    };
    if first == HELP_WORD {
        return Err(InputError::HelpRequested);
    }
    if vocab.contains(first) {
        debug!("valid command: {}", first);
        return Ok(words);
    }
    match words.iter().find(|w| vocab.contains(w)) {
        Some(w) => Err(InputError::IncorrectFormat(w.clone())),
        None => Err(InputError::Unrecognized),
    }
}

/// The command list followed by the prompt.
pub fn help_message(vocab: &Vocabulary, prompt: &str) -> String {
    let mut out = String::from("Here are the commands that you can currently use\n\n");
    for w in vocab.iter() {
        out.push_str(w);
        out.push('\n');
    }
    out.push_str(prompt);
    out
}

/// Text shown before re-prompting after `err`.
pub fn retry_message(err: &InputError, vocab: &Vocabulary, prompt: &str) -> String {
    match err {
        InputError::HelpRequested => help_message(vocab, prompt),
        InputError::IncorrectFormat(_) => format!("Incorrect format, please try again\n{prompt}"),
        InputError::Unrecognized | InputError::UnknownTask(_) => format!(
            "Input not recognized, recognized inputs are {vocab} please try again.\n{prompt}"
        ),
        _ => prompt.to_string(),
    }
}

/// Build an instruction from validated words.
///
/// The first word names the task. Remaining words become integers when
/// they parse as one. `stop` always goes to the engine, without arguments.
pub fn create_instruction(words: &[String], to: Destination) -> Result<Instruction, InputError> {
    let (first, rest) = words.split_first().ok_or(InputError::Empty)?;
    let task = Task::from_str(first).ok_or_else(|| InputError::UnknownTask(first.clone()))?;
    if task == Task::Stop {
        return Ok(Instruction::new(Task::Stop, Destination::Engine));
    }
    let args = rest.iter().map(|w| match w.parse::<i64>() {
        Ok(n) => Arg::Int(n),
        Err(_) => Arg::Text(w.clone()),
    });
    Ok(Instruction::new(task, to).with_args(args))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn accepts_command_first() {
        let v = Vocabulary::default();
        assert_eq!(check_input("print hello world", &v).unwrap(), words("print hello world"));
    }

    #[test]
    fn rejects_misplaced_command() {
        let v = Vocabulary::default();
        assert!(matches!(
            check_input("hello print", &v),
            Err(InputError::IncorrectFormat(w)) if w == "print"
        ));
    }

    #[test]
    fn rejects_unknown_and_empty() {
        let v = Vocabulary::default();
        assert!(matches!(check_input("jump", &v), Err(InputError::Unrecognized)));
        assert!(matches!(check_input("   ", &v), Err(InputError::Empty)));
        assert!(matches!(check_input("help me", &v), Err(InputError::HelpRequested)));
    }

    #[test]
    fn help_lists_every_command_then_prompt() {
        let v = Vocabulary::new(["print", "stop"]);
        assert_eq!(
            help_message(&v, "Input: "),
            "Here are the commands that you can currently use\n\nprint\nstop\nInput: "
        );
    }

    #[test]
    fn unrecognized_message_names_vocabulary() {
        let v = Vocabulary::new(["print", "clear"]);
        let msg = retry_message(&InputError::Unrecognized, &v, "> ");
        assert_eq!(
            msg,
            "Input not recognized, recognized inputs are ['print', 'clear'] please try again.\n> "
        );
    }

    #[test]
    fn instruction_args_are_typed() {
        let ins = create_instruction(&words("print 3 4 hi"), Destination::Display(0)).unwrap();
        assert_eq!(ins.task(), Task::Print);
        assert_eq!(ins.destination(), Destination::Display(0));
        assert_eq!(
            ins.args(),
            &[Arg::Int(3), Arg::Int(4), Arg::Text("hi".into())]
        );
    }

    #[test]
    fn stop_goes_to_engine() {
        let ins = create_instruction(&words("stop now"), Destination::Display(1)).unwrap();
        assert_eq!(ins.task(), Task::Stop);
        assert_eq!(ins.destination(), Destination::Engine);
        assert!(ins.args().is_empty());
    }

    #[test]
    fn vocabulary_word_that_is_not_a_task() {
        let err = create_instruction(&words("dance"), Destination::Game).unwrap_err();
        assert!(matches!(err, InputError::UnknownTask(t) if t == "dance"));
    }

    #[test]
    fn vocabulary_drops_duplicates() {
        let v = Vocabulary::new(["print", "print", "", "clear"]);
        assert_eq!(v.len(), 2);
    }
}
