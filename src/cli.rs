//! Command-line argument parsing.

use clap::Parser;

/// A single-threaded, readiness-driven IRC-compatible chat server.
#[derive(Debug, Parser)]
#[command(name = "slircd", version, about)]
pub struct Args {
    /// TCP port to listen on.
    #[arg(value_parser = clap::value_parser!(u16).range(1..=65535))]
    pub port: u16,

    /// Connection password clients must supply via `PASS` before
    /// registering.
    #[arg(value_parser = non_empty)]
    pub password: String,
}

fn non_empty(s: &str) -> Result<String, String> {
    if s.is_empty() {
        Err("password must not be empty".to_string())
    } else {
        Ok(s.to_string())
    }
}
