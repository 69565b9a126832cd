use textgame::core::Frame;
use textgame::term::RenderThrottle;

fn frame(text: &str) -> Frame {
    let mut f = Frame::new(1, 4);
    f.write_str(0, 0, text);
    f
}

#[test]
fn render_throttle_draws_first_frame() {
    let mut t = RenderThrottle::new(250);
    assert!(t.should_draw(0, &frame("a"), false));
}

#[test]
fn render_throttle_repaint_draws_on_change() {
    let mut t = RenderThrottle::new(250);
    assert!(t.should_draw(0, &frame("a"), false));
    assert!(t.should_draw(1, &frame("b"), false));
}

#[test]
fn render_throttle_repaint_throttles_when_unchanged() {
    let mut t = RenderThrottle::new(250);
    let f = frame("a");
    assert!(t.should_draw(0, &f, false));
    assert!(!t.should_draw(10, &f, false));
    assert!(!t.should_draw(249, &f, false));
    assert!(t.should_draw(250, &f, false));
    assert!(!t.should_draw(300, &f, false));
}

#[test]
fn render_throttle_fresh_frames_always_draw() {
    let mut t = RenderThrottle::new(250);
    let f = frame("a");
    assert!(t.should_draw(0, &f, true));
    assert!(t.should_draw(1, &f, true));
    assert!(t.should_draw(2, &f, true));
}
