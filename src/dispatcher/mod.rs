mod dispatcher;
mod run;

pub use dispatcher::Dispatcher;
pub use run::{Run, RunOutput, RunState};
