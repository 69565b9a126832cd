use textgame::adapter::protocol::{create_instruction, parse_peer_message, PeerMessage};
use textgame::core::{compose, Frame, Sprite};
use textgame::term::{DisplayAction, DisplayScreen};
use textgame::types::{Destination, Instruction, Task};

fn background(h: u16, w: u16) -> Frame {
    let mut f = Frame::new(h, w).with_priority(1);
    f.fill('.');
    f
}

#[test]
fn composed_frame_travels_to_the_display() {
    let hud = {
        let mut f = Frame::new(1, 3).with_priority(3).with_origin(0, 2);
        f.write_str(0, 0, "HP9");
        f
    };
    let ship = Sprite::new("/\\\n||")
        .unwrap()
        .with_priority(2)
        .into_frame()
        .with_origin(1, 1);
    let frame = compose(&[background(3, 5), hud, ship]).unwrap();
    assert_eq!(frame.to_string(), "..HP9\n./\\..\n.||..");

    // Game side: wrap the frame as an instruction and put it on the wire.
    let ins = Instruction::new(Task::UpdateFrameBuffer, Destination::Display(0))
        .with_arg(frame.to_grid());
    let line = serde_json::to_string(&create_instruction(1, ins)).unwrap();

    // Display side.
    let PeerMessage::Instruction(msg) = parse_peer_message(&line).unwrap() else {
        panic!("expected instruction");
    };
    let mut screen = DisplayScreen::new(3, 5, 2).unwrap();
    assert_eq!(screen.handle(&msg.into_instruction()).unwrap(), DisplayAction::None);
    assert_eq!(screen.tick().unwrap(), frame);
    assert!(screen.tick().is_none());
}

#[test]
fn transparent_cells_keep_lower_layers() {
    let mut top = Frame::new(1, 3).with_priority(5);
    top.set(0, 1, '#');
    let merged = background(1, 3).merge(top).unwrap();
    assert_eq!(merged.to_string(), ".#.");
    assert_eq!(merged.priority(), 1);
}

#[test]
fn misshapen_grid_is_rejected_by_the_display() {
    let mut grid = Frame::new(2, 2).to_grid();
    grid.rows.pop();
    let ins = Instruction::new(Task::UpdateFrameBuffer, Destination::Display(0)).with_arg(grid);
    let mut screen = DisplayScreen::new(2, 2, 1).unwrap();
    assert!(screen.handle(&ins).is_err());
    assert_eq!(screen.buffer().len(), 0);
}
