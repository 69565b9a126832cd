//! Input screen for the text game.
//!
//! An input process reads commands from its terminal, validates them against
//! the vocabulary the engine sent in its welcome, and sends them on as
//! instructions. Validation and prompting are plain functions over
//! `BufRead`/`Write` so they can be tested without a terminal.

pub mod prompt;
pub mod screen;
pub mod vocabulary;

pub use textgame_adapter as adapter;
pub use textgame_term as term;
pub use textgame_types as types;

pub use prompt::{prompt_until_valid, read_instruction};
pub use screen::{run_input_screen, InputAction, InputScreen, Prompter};
pub use vocabulary::{
    check_input, create_instruction, help_message, retry_message, InputError, Vocabulary, HELP_WORD,
};
