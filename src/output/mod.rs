mod progress;
mod styling;
mod summary;
mod tables;

pub use progress::PhaseProgress;
pub use summary::print_summary;

use styling::{dim, magenta_bold};

/// Prints the `DCILens` banner to stderr.
///
/// Displays the tool name, version, and description at the start of execution.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("🔍 DCILens"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("DCI Job Insights Tool")
    );
}
