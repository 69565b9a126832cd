use crate::core::Frame;

/// Decides when a display tick should put a frame on the terminal.
///
/// Fresh frames from the buffer always draw, as does any frame whose
/// fingerprint differs from the last one drawn. Repeating the same frame is
/// a repaint and happens at most once per `repaint_interval_ms`.
#[derive(Debug, Clone)]
pub struct RenderThrottle {
    repaint_interval_ms: u64,
    last_draw_ms: Option<u64>,
    last_fingerprint: u64,
}

impl RenderThrottle {
    pub fn new(repaint_interval_ms: u64) -> Self {
        Self {
            repaint_interval_ms,
            last_draw_ms: None,
            last_fingerprint: 0,
        }
    }

    pub fn should_draw(&mut self, now_ms: u64, frame: &Frame, fresh: bool) -> bool {
        let fingerprint = frame.fingerprint();
        let due = match self.last_draw_ms {
            None => true,
            Some(_) if fresh || fingerprint != self.last_fingerprint => true,
            Some(last) => now_ms.saturating_sub(last) >= self.repaint_interval_ms,
        };
        if due {
            self.last_draw_ms = Some(now_ms);
            self.last_fingerprint = fingerprint;
        }
        due
    }
}
