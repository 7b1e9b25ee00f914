mod command_catalog;
mod tool_paths;

pub use {
    command_catalog::{CommandCatalog, CommandTemplate, Substitution},
    tool_paths::ToolPaths,
};
