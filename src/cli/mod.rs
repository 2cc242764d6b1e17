//! # CLI
//!
//! ```bash
//! # Serve the built-in forum routes (or a manifest) with echo handlers
//! forumrouter serve --config config/forum.yaml --addr 0.0.0.0:8080
//! forumrouter serve --routes config/routes.yaml
//!
//! # Print the route table
//! forumrouter routes
//!
//! # Show how a request would be routed
//! forumrouter match --method DELETE --path /threads/42
//! ```

mod commands;


pub use commands::{describe_match, load_table, run_cli, Cli, Commands};
