mod command_result;
mod command_spec;
mod runner;
mod supervisor;

pub use {
    command_result::{CommandResult, EXIT_LAUNCH_FAILURE, EXIT_TIMEOUT},
    command_spec::CommandSpec,
    runner::CommandRunner,
    supervisor::{ProcessSupervisor, TERMINATION_GRACE},
};
