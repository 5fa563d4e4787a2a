// Profiler domain commands

use crate::commands::{profiler_commands, Command, NoReturns};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Enable;

impl Command for Enable {
    const METHOD: &'static str = profiler_commands::ENABLE;
    type Returns = NoReturns;
}
