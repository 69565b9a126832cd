use crate::types::{Destination, Instruction, Task};

/// Where the engine sends an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Forward to a connected display or input.
    Peer(Destination),
    /// Deliver to the game channel.
    Game,
    Stop,
    Start,
    HideLogs,
    /// Engine-addressed task the engine has no handler for.
    Unhandled(Task),
}

/// Decide where `ins` goes. Pure; nothing is sent.
pub fn route(ins: &Instruction) -> Route {
    match ins.destination() {
        dest @ (Destination::Input(_) | Destination::Display(_)) => Route::Peer(dest),
        Destination::Game => Route::Game,
        Destination::Engine => match ins.task() {
            Task::Stop => Route::Stop,
            Task::Start => Route::Start,
            Task::HideLogs => Route::HideLogs,
            other => Route::Unhandled(other),
        },
    }
}
