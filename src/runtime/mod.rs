mod context;

pub use context::{ExecutionContext, INPUT_KEY};
