//! DisplayScreen: turns instructions into frames for one terminal.
//!
//! This module is pure (no I/O). The display binary feeds it instructions,
//! pulls frames out on every tick, and hands them to the renderer.

use log::{debug, warn};
use thiserror::Error;

use crate::core::{checked_size, CoreError, Frame, FrameBuffer, Sprite};
use crate::types::{Destination, Instruction, Task, DEFAULT_FILL_CHAR};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisplayError {
    #[error("display does not handle task {0}")]
    Unsupported(Task),

    #[error("{task}: missing or invalid argument {index} ({expected})")]
    BadArg {
        task: Task,
        index: usize,
        expected: &'static str,
    },

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// What the display process should do after an instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayAction {
    /// Nothing beyond the state change (frames may have been queued).
    None,
    /// Print this frame right away.
    Render(Frame),
    /// Resize the terminal window.
    Resize { height: u16, width: u16 },
    /// Retitle the terminal window.
    Retitle(String),
    /// Send this instruction back to the engine.
    Reply(Instruction),
    /// Lower this process's log level.
    HideLogs,
    /// Shut the display down.
    Stop,
}

pub struct DisplayScreen {
    height: u16,
    width: u16,
    fill_char: char,
    title: String,
    canvas: Frame,
    cursor: u16,
    buffer: FrameBuffer,
    shown: bool,
}

impl DisplayScreen {
    pub fn new(height: u16, width: u16, buffer_len: usize) -> Result<Self, DisplayError> {
        let buffer = FrameBuffer::new(buffer_len.max(1), height, width)?;
        let mut canvas = Frame::new(height, width);
        canvas.fill(DEFAULT_FILL_CHAR);
        Ok(Self {
            height,
            width,
            fill_char: DEFAULT_FILL_CHAR,
            title: String::new(),
            canvas,
            cursor: 0,
            buffer,
            shown: false,
        })
    }

    pub fn with_fill_char(mut self, fill_char: char) -> Self {
        self.fill_char = fill_char;
        self.canvas.fill(fill_char);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// `(height, width)`
    pub fn size(&self) -> (u16, u16) {
        (self.height, self.width)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn canvas(&self) -> &Frame {
        &self.canvas
    }

    pub fn buffer(&self) -> &FrameBuffer {
        &self.buffer
    }

    /// Next frame to print, if any.
    ///
    /// A pending frame is popped from the buffer. With nothing pending the
    /// screen keeps what it shows, except before the first print, when the
    /// blank frame stands in.
    pub fn tick(&mut self) -> Option<Frame> {
        match self.buffer.pop() {
            Some(frame) => {
                self.shown = true;
                Some(frame)
            }
            None if !self.shown => {
                self.shown = true;
                Some(self.blank())
            }
            None => None,
        }
    }

    fn blank(&self) -> Frame {
        let mut f = self.buffer.blank();
        f.fill(self.fill_char);
        f
    }

    /// Queue a frame; a full buffer drops it.
    pub fn update_frame_buffer(&mut self, frame: Frame) {
        if let Err(e) = self.buffer.push(frame) {
            warn!("frame dropped: {}", e);
        }
    }

    fn queue_canvas(&mut self) {
        let snapshot = self.canvas.clone();
        self.update_frame_buffer(snapshot);
    }

    pub fn handle(&mut self, ins: &Instruction) -> Result<DisplayAction, DisplayError> {
        debug!("display handling {}", ins);
        let task = ins.task();
        match task {
            Task::Print => {
                match (ins.int_arg(0), ins.int_arg(1)) {
                    (Some(row), Some(col)) if ins.args().len() >= 2 => {
                        let row = to_u16(task, 0, row)?;
                        let col = to_u16(task, 1, col)?;
                        let text = ins.text_from(2).unwrap_or_default();
                        self.canvas.write_str(row, col, &text);
                    }
                    _ => {
                        let text = ins.text_from(0).unwrap_or_default();
                        self.print_line(&text);
                    }
                }
                self.queue_canvas();
                Ok(DisplayAction::None)
            }
            Task::Clear => {
                self.canvas.fill(self.fill_char);
                self.cursor = 0;
                self.queue_canvas();
                Ok(DisplayAction::None)
            }
            Task::Fill => {
                let ch = ins
                    .text_from(0)
                    .and_then(|s| s.chars().next())
                    .unwrap_or(self.fill_char);
                self.canvas.fill(ch);
                self.queue_canvas();
                Ok(DisplayAction::None)
            }
            Task::DrawSprite => {
                let x = ins
                    .int_arg(0)
                    .ok_or(DisplayError::BadArg { task, index: 0, expected: "column" })?;
                let y = ins
                    .int_arg(1)
                    .ok_or(DisplayError::BadArg { task, index: 1, expected: "row" })?;
                let text = ins
                    .text_from(2)
                    .ok_or(DisplayError::BadArg { task, index: 2, expected: "sprite text" })?;
                let sprite = Sprite::new(&text.replace("\\n", "\n"))?
                    .at(to_u16(task, 0, x)?, to_u16(task, 1, y)?);
                sprite.place_onto(&mut self.canvas)?;
                self.queue_canvas();
                Ok(DisplayAction::None)
            }
            Task::UpdateFrameBuffer => {
                let grid = ins
                    .grid_arg(0)
                    .ok_or(DisplayError::BadArg { task, index: 0, expected: "frame grid" })?;
                let frame = Frame::from_grid(grid)?;
                self.update_frame_buffer(frame);
                Ok(DisplayAction::None)
            }
            Task::UpdateDisplay => {
                self.shown = true;
                let frame = self.buffer.pop().unwrap_or_else(|| self.blank());
                Ok(DisplayAction::Render(frame))
            }
            Task::ChangeDisplaySize => {
                let h = ins
                    .int_arg(0)
                    .ok_or(DisplayError::BadArg { task, index: 0, expected: "height" })?;
                let w = ins
                    .int_arg(1)
                    .ok_or(DisplayError::BadArg { task, index: 1, expected: "width" })?;
                let (height, width) = (to_u16(task, 0, h)?, to_u16(task, 1, w)?);
                checked_size(height as usize, width as usize)?;
                self.change_size(height, width);
                Ok(DisplayAction::Resize { height, width })
            }
            Task::ResetDisplay => Ok(DisplayAction::Resize {
                height: self.height,
                width: self.width,
            }),
            Task::ChangeTitle => {
                let title = ins
                    .text_from(0)
                    .ok_or(DisplayError::BadArg { task, index: 0, expected: "title" })?;
                self.title = title.clone();
                Ok(DisplayAction::Retitle(title))
            }
            Task::ReturnSize => Ok(DisplayAction::Reply(
                Instruction::new(Task::ReportSize, Destination::Game)
                    .with_arg(self.height as i64)
                    .with_arg(self.width as i64),
            )),
            Task::HideLogs => Ok(DisplayAction::HideLogs),
            Task::Stop => Ok(DisplayAction::Stop),
            other => Err(DisplayError::Unsupported(other)),
        }
    }

    /// Write `text` at the cursor, wrapping at the right edge and scrolling
    /// when the bottom is reached.
    fn print_line(&mut self, text: &str) {
        if self.height == 0 || self.width == 0 {
            return;
        }
        let chars: Vec<char> = text.chars().collect();
        let mut chunks: Vec<String> = chars
            .chunks(self.width as usize)
            .map(|c| c.iter().collect())
            .collect();
        if chunks.is_empty() {
            chunks.push(String::new());
        }
        for chunk in chunks {
            if self.cursor >= self.height {
                self.canvas.scroll_up(1, self.fill_char);
                self.cursor = self.height - 1;
            }
            self.canvas.write_str(self.cursor, 0, &chunk);
            self.cursor += 1;
        }
    }

    fn change_size(&mut self, height: u16, width: u16) {
        self.height = height;
        self.width = width;
        self.canvas.resize(height, width, self.fill_char);
        self.cursor = self.cursor.min(height);
        self.buffer.resize_frames(height, width);
        self.queue_canvas();
    }
}

fn to_u16(task: Task, index: usize, v: i64) -> Result<u16, DisplayError> {
    u16::try_from(v).map_err(|_| DisplayError::BadArg {
        task,
        index,
        expected: "a non-negative number",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Frame;
    use crate::types::Arg;

    fn screen(h: u16, w: u16, len: usize) -> DisplayScreen {
        DisplayScreen::new(h, w, len).unwrap().with_fill_char('.')
    }

    fn print(text: &str) -> Instruction {
        Instruction::new(Task::Print, Destination::Display(0)).with_arg(text)
    }

    #[test]
    fn first_tick_shows_blank_then_nothing() {
        let mut s = screen(2, 3, 2);
        assert_eq!(s.tick().unwrap().to_string(), "...\n...");
        assert!(s.tick().is_none());
    }

    #[test]
    fn print_queues_canvas_snapshot() {
        let mut s = screen(2, 5, 3);
        s.handle(&print("hi")).unwrap();
        s.handle(&print("yo")).unwrap();
        assert_eq!(s.tick().unwrap().to_string(), "hi...\n.....");
        assert_eq!(s.tick().unwrap().to_string(), "hi...\nyo...");
        assert!(s.tick().is_none());
    }

    #[test]
    fn print_at_position() {
        let mut s = screen(2, 5, 1);
        let ins = Instruction::new(Task::Print, Destination::Display(0))
            .with_args([Arg::Int(1), Arg::Int(2), Arg::Text("ab".into())]);
        s.handle(&ins).unwrap();
        assert_eq!(s.canvas().to_string(), ".....\n..ab.");
    }

    #[test]
    fn single_number_prints_as_text() {
        let mut s = screen(1, 4, 1);
        let ins = Instruction::new(Task::Print, Destination::Display(0)).with_arg(42);
        s.handle(&ins).unwrap();
        assert_eq!(s.canvas().to_string(), "42..");
    }

    #[test]
    fn print_wraps_and_scrolls() {
        let mut s = screen(2, 3, 5);
        s.handle(&print("abcdef")).unwrap();
        assert_eq!(s.canvas().to_string(), "abc\ndef");
        s.handle(&print("g")).unwrap();
        assert_eq!(s.canvas().to_string(), "def\ng..");
    }

    #[test]
    fn full_buffer_drops_frames() {
        let mut s = screen(1, 1, 1);
        s.handle(&print("a")).unwrap();
        s.handle(&print("b")).unwrap();
        assert_eq!(s.buffer().len(), 1);
        assert_eq!(s.tick().unwrap().to_string(), "a");
    }

    #[test]
    fn fill_and_clear() {
        let mut s = screen(1, 3, 4);
        let fill = Instruction::new(Task::Fill, Destination::Display(0)).with_arg("#");
        s.handle(&fill).unwrap();
        assert_eq!(s.canvas().to_string(), "###");
        let clear = Instruction::new(Task::Clear, Destination::Display(0));
        s.handle(&clear).unwrap();
        assert_eq!(s.canvas().to_string(), "...");
        assert_eq!(s.buffer().len(), 2);
    }

    #[test]
    fn draw_sprite_places_multiline_text() {
        let mut s = screen(3, 4, 1);
        let ins = Instruction::new(Task::DrawSprite, Destination::Display(0))
            .with_args([Arg::Int(1), Arg::Int(1), Arg::Text("ab\\ncd".into())]);
        s.handle(&ins).unwrap();
        assert_eq!(s.canvas().to_string(), "....\n.ab.\n.cd.");
    }

    #[test]
    fn draw_sprite_outside_fails() {
        let mut s = screen(1, 1, 1);
        let ins = Instruction::new(Task::DrawSprite, Destination::Display(0))
            .with_args([Arg::Int(9), Arg::Int(9), Arg::Text("x".into())]);
        assert_eq!(
            s.handle(&ins),
            Err(DisplayError::Core(CoreError::NoIntersection))
        );
    }

    #[test]
    fn update_frame_buffer_accepts_grid() {
        let mut s = screen(1, 2, 2);
        let mut f = Frame::new(1, 2);
        f.write_str(0, 0, "ok");
        let ins = Instruction::new(Task::UpdateFrameBuffer, Destination::Display(0))
            .with_arg(f.to_grid());
        s.handle(&ins).unwrap();
        assert_eq!(s.tick().unwrap().to_string(), "ok");
    }

    #[test]
    fn update_display_substitutes_blank() {
        let mut s = screen(1, 2, 2);
        let ins = Instruction::new(Task::UpdateDisplay, Destination::Display(0));
        match s.handle(&ins).unwrap() {
            DisplayAction::Render(f) => assert_eq!(f.size(), (1, 2)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn change_size_resizes_canvas_and_buffer() {
        let mut s = screen(1, 2, 2);
        let ins = Instruction::new(Task::ChangeDisplaySize, Destination::Display(0))
            .with_args([Arg::Int(2), Arg::Int(3)]);
        assert_eq!(
            s.handle(&ins).unwrap(),
            DisplayAction::Resize { height: 2, width: 3 }
        );
        assert_eq!(s.size(), (2, 3));
        assert_eq!(s.tick().unwrap().size(), (2, 3));
    }

    #[test]
    fn change_size_rejects_negative() {
        let mut s = screen(1, 2, 2);
        let ins = Instruction::new(Task::ChangeDisplaySize, Destination::Display(0))
            .with_args([Arg::Int(-2), Arg::Int(3)]);
        assert!(matches!(s.handle(&ins), Err(DisplayError::BadArg { index: 0, .. })));
    }

    #[test]
    fn return_size_replies_to_game() {
        let mut s = screen(4, 7, 1);
        let ins = Instruction::new(Task::ReturnSize, Destination::Display(0));
        let DisplayAction::Reply(reply) = s.handle(&ins).unwrap() else {
            panic!("expected reply");
        };
        assert_eq!(reply.task(), Task::ReportSize);
        assert_eq!(reply.destination(), Destination::Game);
        assert_eq!(reply.args(), &[Arg::Int(4), Arg::Int(7)]);
    }

    #[test]
    fn change_title_keeps_spaces() {
        let mut s = screen(1, 1, 1);
        let ins = Instruction::new(Task::ChangeTitle, Destination::Display(0))
            .with_args([Arg::Text("Station".into()), Arg::Text("Keeper".into())]);
        assert_eq!(
            s.handle(&ins).unwrap(),
            DisplayAction::Retitle("Station Keeper".into())
        );
        assert_eq!(s.title(), "Station Keeper");
    }

    #[test]
    fn input_tasks_are_unsupported() {
        let mut s = screen(1, 1, 1);
        let ins = Instruction::new(Task::GetFromPrompt, Destination::Display(0));
        assert_eq!(
            s.handle(&ins),
            Err(DisplayError::Unsupported(Task::GetFromPrompt))
        );
    }

    #[test]
    fn update_display_blank_uses_fill_char() {
        let mut s = screen(1, 3, 2);
        let ins = Instruction::new(Task::UpdateDisplay, Destination::Display(0));
        let DisplayAction::Render(forced) = s.handle(&ins).unwrap() else {
            panic!("expected render");
        };
        assert_eq!(forced.to_string(), "...");

        let mut fresh = screen(1, 3, 2);
        assert_eq!(fresh.tick().unwrap(), forced);
    }

    #[test]
    fn change_size_refuses_huge_screens() {
        let mut s = screen(1, 2, 2);
        let ins = Instruction::new(Task::ChangeDisplaySize, Destination::Display(0))
            .with_args([Arg::Int(65535), Arg::Int(65535)]);
        assert!(matches!(
            s.handle(&ins),
            Err(DisplayError::Core(CoreError::FrameTooLarge { .. }))
        ));
        assert_eq!(s.size(), (1, 2));
        assert_eq!(s.canvas().size(), (1, 2));
    }

    #[test]
    fn new_refuses_huge_screens() {
        assert!(matches!(
            DisplayScreen::new(u16::MAX, u16::MAX, 1),
            Err(DisplayError::Core(CoreError::FrameTooLarge { .. }))
        ));
    }

    #[test]
    fn oversized_grid_is_refused_before_allocating() {
        let mut s = screen(1, 2, 2);
        let grid = crate::types::GridData {
            height: u16::MAX,
            width: u16::MAX,
            priority: 1,
            row: 0,
            col: 0,
            rows: vec![String::new(); u16::MAX as usize],
        };
        let ins = Instruction::new(Task::UpdateFrameBuffer, Destination::Display(0)).with_arg(grid);
        assert!(matches!(
            s.handle(&ins),
            Err(DisplayError::Core(CoreError::FrameTooLarge { .. }))
        ));
        assert!(s.buffer().is_empty());
    }
}
