mod args;
mod check;
mod serve;

pub use check::CheckCommand;
pub use serve::ServeCommand;
