/// Requests from any control surface (signals, schedule, file watcher, UI).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Start,
    Stop,
    Toggle,
    /// The library changed on disk.
    Reload,
}
