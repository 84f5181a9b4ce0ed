//! Delegated routing binary executable.

use delegated_routing::cli::Cli;

fn main() {
    if let Err(err) = Cli::parse_args().run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}
