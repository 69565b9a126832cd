use std::io::{BufRead, Write};

use log::debug;

use crate::types::{Destination, Instruction, Task};
use crate::vocabulary::{check_input, create_instruction, retry_message, InputError, Vocabulary};

/// Prompt until a valid command line is read.
///
/// Invalid lines print a hint (help, format, or the command list) followed
/// by the prompt again. Lines whose command word is not a known task are
/// rejected the same way. Returns [`InputError::Eof`] when the reader closes.
pub fn prompt_until_valid<R, W>(
    reader: &mut R,
    writer: &mut W,
    vocab: &Vocabulary,
    prompt: &str,
) -> Result<Vec<String>, InputError>
where
    R: BufRead,
    W: Write,
{
    let mut message = prompt.to_string();
    let mut line = String::new();
    loop {
        writer.write_all(message.as_bytes())?;
        writer.flush()?;

        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Err(InputError::Eof);
        }

        let err = match check_input(&line, vocab) {
            Ok(words) => match Task::from_str(&words[0]) {
                Some(_) => return Ok(words),
                None => InputError::UnknownTask(words[0].clone()),
            },
            Err(e) => e,
        };
        debug!("rejected input: {}", err);
        message = retry_message(&err, vocab, prompt);
    }
}

/// Prompt on the process terminal and turn the answer into an instruction.
pub fn read_instruction(
    vocab: &Vocabulary,
    prompt: &str,
    to: Destination,
) -> Result<Instruction, InputError> {
    let stdin = std::io::stdin();
    let mut reader = stdin.lock();
    let mut writer = std::io::stdout();
    let words = prompt_until_valid(&mut reader, &mut writer, vocab, prompt)?;
    create_instruction(&words, to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn run(input: &str) -> (Result<Vec<String>, InputError>, String) {
        let mut reader = Cursor::new(input.as_bytes().to_vec());
        let mut out = Vec::new();
        let res = prompt_until_valid(&mut reader, &mut out, &Vocabulary::default(), "> ");
        (res, String::from_utf8(out).unwrap())
    }

    #[test]
    fn first_valid_line_wins() {
        let (res, out) = run("clear\n");
        assert_eq!(res.unwrap(), vec!["clear".to_string()]);
        assert_eq!(out, "> ");
    }

    #[test]
    fn reprompts_until_valid() {
        let (res, out) = run("jump\nhello print\nprint hi\n");
        assert_eq!(res.unwrap(), vec!["print".to_string(), "hi".to_string()]);
        assert!(out.contains("Input not recognized"));
        assert!(out.contains("Incorrect format, please try again\n> "));
        assert!(out.ends_with("> "));
    }

    #[test]
    fn help_then_command() {
        let (res, out) = run("help\nstop\n");
        assert_eq!(res.unwrap(), vec!["stop".to_string()]);
        assert!(out.contains("Here are the commands that you can currently use"));
    }

    #[test]
    fn eof_is_an_error() {
        let (res, _) = run("jump\n");
        assert!(matches!(res, Err(InputError::Eof)));
    }

    #[test]
    fn many_bad_lines_do_not_grow_the_stack() {
        let input = "nope\n".repeat(10_000) + "fill #\n";
        let (res, _) = run(&input);
        assert_eq!(res.unwrap()[0], "fill");
    }
}
