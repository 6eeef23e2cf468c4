pub mod cell;
pub mod processor;
pub mod terminal;

pub use terminal::TerminalView;
