//! TerminalRenderer: flushes frames to a real terminal.
//!
//! Draws are diffed against the previously drawn frame so only changed
//! runs of cells are written.

use std::io::{self, Write};

use anyhow::Result;

use crossterm::{cursor, style::Print, terminal, QueueableCommand};

use crate::core::Frame;

pub struct TerminalRenderer {
    stdout: io::Stdout,
    last: Option<Frame>,
    buf: Vec<u8>,
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalRenderer {
    pub fn new() -> Self {
        Self {
            stdout: io::stdout(),
            last: None,
            buf: Vec::with_capacity(64 * 1024),
        }
    }

    pub fn enter(&mut self) -> Result<()> {
        self.buf.clear();
        self.buf.queue(terminal::EnterAlternateScreen)?;
        self.buf.queue(cursor::Hide)?;
        self.buf.queue(terminal::DisableLineWrap)?;
        self.flush_buf()
    }

    pub fn exit(&mut self) -> Result<()> {
        self.buf.clear();
        self.buf.queue(terminal::EnableLineWrap)?;
        self.buf.queue(cursor::Show)?;
        self.buf.queue(terminal::LeaveAlternateScreen)?;
        self.flush_buf()
    }

    /// Force the next draw to be a full redraw.
    ///
    /// Useful on terminal resize events.
    pub fn invalidate(&mut self) {
        self.last = None;
    }

    /// The frame currently on screen.
    pub fn last(&self) -> Option<&Frame> {
        self.last.as_ref()
    }

    /// Draw a frame, diffing against the previous one.
    pub fn draw(&mut self, frame: &Frame) -> Result<()> {
        self.buf.clear();
        match self.last.as_ref() {
            Some(prev) if prev.size() == frame.size() => encode_diff_into(prev, frame, &mut self.buf)?,
            _ => encode_full_into(frame, &mut self.buf)?,
        }
        self.flush_buf()?;
        self.last = Some(frame.clone());
        Ok(())
    }

    pub fn set_title(&mut self, title: &str) -> Result<()> {
        self.buf.clear();
        self.buf.queue(terminal::SetTitle(title))?;
        self.flush_buf()
    }

    /// Ask the terminal to resize to `height` rows by `width` columns.
    ///
    /// Not every terminal honours this; the next draw is a full redraw
    /// either way.
    pub fn set_size(&mut self, height: u16, width: u16) -> Result<()> {
        self.buf.clear();
        self.buf.queue(terminal::SetSize(width, height))?;
        self.flush_buf()?;
        self.invalidate();
        Ok(())
    }

    fn flush_buf(&mut self) -> Result<()> {
        self.stdout.write_all(&self.buf)?;
        self.stdout.flush()?;
        Ok(())
    }
}

/// Retitle the controlling terminal without a renderer.
pub fn set_terminal_title(title: &str) -> Result<()> {
    let mut out = io::stdout();
    out.queue(terminal::SetTitle(title))?;
    out.flush()?;
    Ok(())
}

/// Encode a full-frame redraw into `out`.
///
/// This builds a sequence of crossterm commands without writing to stdout.
pub fn encode_full_into(frame: &Frame, out: &mut Vec<u8>) -> Result<()> {
    out.queue(terminal::Clear(terminal::ClearType::All))?;
    out.queue(cursor::MoveTo(0, 0))?;

    let mut line = String::with_capacity(frame.width() as usize);
    for (y, row) in frame.rows().enumerate() {
        line.clear();
        line.extend(row.iter().map(|c| c.glyph()));
        out.queue(cursor::MoveTo(0, y as u16))?;
        out.queue(Print(&line))?;
    }
    Ok(())
}

/// Encode a diff redraw (changed runs) into `out`.
///
/// This builds a sequence of crossterm commands without writing to stdout.
pub fn encode_diff_into(prev: &Frame, next: &Frame, out: &mut Vec<u8>) -> Result<()> {
    let mut run = String::new();
    for_each_changed_run(prev, next, |x, y, len| {
        run.clear();
        for dx in 0..len {
            run.push(next.get(y, x + dx).map(|c| c.glyph()).unwrap_or(' '));
        }
        out.queue(cursor::MoveTo(x, y))?;
        out.queue(Print(&run))?;
        Ok(())
    })
}

/// Call `f(x, y, len)` for every horizontal run of cells that differ.
fn for_each_changed_run(
    prev: &Frame,
    next: &Frame,
    mut f: impl FnMut(u16, u16, u16) -> Result<()>,
) -> Result<()> {
    if prev.size() != next.size() {
        // Size changed: treat everything as dirty in a single pass (row runs).
        for y in 0..next.height() {
            f(0, y, next.width())?;
        }
        return Ok(());
    }

    let w = next.width();
    let h = next.height();
    let glyph = |frame: &Frame, x: u16, y: u16| frame.get(y, x).map(|c| c.glyph());

    for y in 0..h {
        let mut x = 0;
        while x < w {
            if glyph(prev, x, y) == glyph(next, x, y) {
                x += 1;
                continue;
            }

            let start = x;
            x += 1;
            while x < w && glyph(prev, x, y) != glyph(next, x, y) {
                x += 1;
            }
            f(start, y, x - start)?;
        }
    }

    Ok(())
}
