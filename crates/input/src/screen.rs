//! Input screen: answers engine instructions and runs the prompt.
//!
//! While a prompt is open the screen is busy. Instructions that arrive in
//! the meantime wait in a local FIFO and are handled, in order, once the
//! prompt has been answered. `stop` is the exception: it is acted on at
//! once, open prompt or not.

use std::collections::VecDeque;

use anyhow::Result;
use log::{debug, info, warn, LevelFilter};
use tokio::sync::oneshot;

use crate::adapter::{PeerMessage, PeerReader, PeerWriter, WelcomeMessage};
use crate::types::{Destination, Instruction, Task, DEFAULT_PROMPT};
use crate::vocabulary::{InputError, Vocabulary};

/// What the input process should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    /// Read a command with `prompt` and send it to `to`.
    Prompt { prompt: String, to: Destination },
    Retitle(String),
    HideLogs,
    Stop,
    /// Instruction this screen does not handle.
    Ignored(Task),
}

#[derive(Debug, Default)]
pub struct InputScreen {
    vocab: Vocabulary,
    title: String,
    pending: VecDeque<Instruction>,
    busy: bool,
    stopping: bool,
}

impl InputScreen {
    pub fn new(vocab: Vocabulary) -> Self {
        Self {
            vocab,
            ..Self::default()
        }
    }

    /// Screen set up from the engine's welcome.
    pub fn from_welcome(welcome: &WelcomeMessage) -> Self {
        let vocab = if welcome.tasks.iter().next().is_some() {
            Vocabulary::new(welcome.tasks.iter())
        } else {
            Vocabulary::default()
        };
        let mut screen = Self::new(vocab);
        screen.title = welcome.title.clone();
        screen
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Queue an instruction from the engine.
    pub fn push(&mut self, ins: Instruction) {
        if ins.task() == Task::Stop {
            self.stopping = true;
            return;
        }
        if self.busy {
            debug!("busy, queued {}", ins);
        }
        self.pending.push_back(ins);
    }

    /// Next action to carry out, or `None` while busy or idle. A pushed
    /// `stop` is returned even while busy.
    ///
    /// Returning a [`InputAction::Prompt`] marks the screen busy until
    /// [`InputScreen::prompt_finished`] is called.
    pub fn next_action(&mut self) -> Option<InputAction> {
        if self.stopping {
            return Some(InputAction::Stop);
        }
        if self.busy {
            return None;
        }
        let ins = self.pending.pop_front()?;
        let action = self.handle(&ins);
        if matches!(action, InputAction::Prompt { .. }) {
            self.busy = true;
        }
        Some(action)
    }

    pub fn prompt_finished(&mut self) {
        self.busy = false;
    }

    fn handle(&mut self, ins: &Instruction) -> InputAction {
        match ins.task() {
            Task::GetFromPrompt => {
                let prompt = ins.text_arg(0).unwrap_or(DEFAULT_PROMPT).to_string();
                let to = ins
                    .text_arg(1)
                    .and_then(Destination::from_str)
                    .unwrap_or(Destination::Engine);
                InputAction::Prompt { prompt, to }
            }
            Task::ChangeTitle => {
                self.title = ins.text_from(0).unwrap_or_default();
                InputAction::Retitle(self.title.clone())
            }
            Task::HideLogs => InputAction::HideLogs,
            other => InputAction::Ignored(other),
        }
    }
}

/// Reads a command; runs on a blocking thread.
pub type Prompter =
    fn(&Vocabulary, &str, Destination) -> Result<Instruction, InputError>;

/// Drive an input screen against the engine until `stop` or disconnect.
pub async fn run_input_screen(
    mut reader: PeerReader,
    mut writer: PeerWriter,
    mut screen: InputScreen,
    prompter: Prompter,
) -> Result<()> {
    let mut answer: Option<oneshot::Receiver<Result<Instruction, InputError>>> = None;

    loop {
        while let Some(action) = screen.next_action() {
            match action {
                InputAction::Prompt { prompt, to } => {
                    let vocab = screen.vocabulary().clone();
                    let (tx, rx) = oneshot::channel();
                    tokio::task::spawn_blocking(move || {
                        let _ = tx.send(prompter(&vocab, &prompt, to));
                    });
                    answer = Some(rx);
                }
                InputAction::Retitle(title) => {
                    if let Err(e) = crate::term::set_terminal_title(&title) {
                        warn!("failed to set title: {}", e);
                    }
                }
                InputAction::HideLogs => log::set_max_level(LevelFilter::Error),
                InputAction::Stop => {
                    info!("stop received");
                    return Ok(());
                }
                InputAction::Ignored(task) => debug!("input screen ignores {}", task),
            }
        }

        tokio::select! {
            msg = reader.recv() => match msg? {
                Some(PeerMessage::Instruction(m)) => screen.push(m.into_instruction()),
                Some(PeerMessage::Error(e)) => warn!("engine error {:?}: {}", e.code, e.message),
                Some(other) => debug!("ignoring {:?}", other),
                None => {
                    info!("engine closed the connection");
                    return Ok(());
                }
            },
            res = wait_answer(&mut answer) => {
                answer = None;
                screen.prompt_finished();
                match res {
                    Ok(ins) => {
                        debug!("input retrieved: {}", ins);
                        writer.send(ins).await?;
                    }
                    Err(InputError::Eof) => {
                        info!("terminal input closed");
                        return Ok(());
                    }
                    Err(e) => warn!("prompt failed: {}", e),
                }
            }
        }
    }
}

async fn wait_answer(
    answer: &mut Option<oneshot::Receiver<Result<Instruction, InputError>>>,
) -> Result<Instruction, InputError> {
    match answer {
        Some(rx) => rx.await.unwrap_or(Err(InputError::Eof)),
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Arg;

    fn get_from_prompt(to: &str) -> Instruction {
        Instruction::new(Task::GetFromPrompt, Destination::Input(0))
            .with_args([Arg::Text("> ".into()), Arg::Text(to.into())])
    }

    #[test]
    fn prompt_defaults_to_engine() {
        let mut s = InputScreen::default();
        s.push(Instruction::new(Task::GetFromPrompt, Destination::Input(0)));
        assert_eq!(
            s.next_action(),
            Some(InputAction::Prompt {
                prompt: DEFAULT_PROMPT.to_string(),
                to: Destination::Engine
            })
        );
    }

    #[test]
    fn busy_screen_queues_in_order() {
        let mut s = InputScreen::default();
        s.push(get_from_prompt("display0"));
        assert!(matches!(s.next_action(), Some(InputAction::Prompt { .. })));
        assert!(s.is_busy());

        s.push(Instruction::new(Task::ChangeTitle, Destination::Input(0)).with_arg("one"));
        s.push(Instruction::new(Task::HideLogs, Destination::Input(0)));
        assert_eq!(s.next_action(), None);
        assert_eq!(s.pending(), 2);

        s.prompt_finished();
        assert_eq!(s.next_action(), Some(InputAction::Retitle("one".into())));
        assert_eq!(s.next_action(), Some(InputAction::HideLogs));
        assert_eq!(s.next_action(), None);
    }

    #[test]
    fn second_prompt_waits_for_first() {
        let mut s = InputScreen::default();
        s.push(get_from_prompt("display0"));
        s.push(get_from_prompt("display1"));
        assert!(matches!(
            s.next_action(),
            Some(InputAction::Prompt { to: Destination::Display(0), .. })
        ));
        assert_eq!(s.next_action(), None);
        s.prompt_finished();
        assert!(matches!(
            s.next_action(),
            Some(InputAction::Prompt { to: Destination::Display(1), .. })
        ));
    }

    #[test]
    fn display_tasks_are_ignored() {
        let mut s = InputScreen::default();
        s.push(Instruction::new(Task::Print, Destination::Input(0)));
        assert_eq!(s.next_action(), Some(InputAction::Ignored(Task::Print)));
    }

    #[test]
    fn stop_cuts_through_an_open_prompt() {
        let mut s = InputScreen::default();
        s.push(get_from_prompt("display0"));
        assert!(matches!(s.next_action(), Some(InputAction::Prompt { .. })));

        s.push(Instruction::new(Task::HideLogs, Destination::Input(0)));
        s.push(Instruction::new(Task::Stop, Destination::Input(0)));
        assert!(s.is_busy());
        assert_eq!(s.next_action(), Some(InputAction::Stop));
    }
}
