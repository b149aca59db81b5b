// Slash commands
pub mod distok;
pub mod help;
pub mod register;
