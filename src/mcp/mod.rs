//! MCP server surface: shared context and tool handlers.
pub mod server;
pub mod tools;
