use clap::Parser;

/// In-cluster passive HTTP traffic observer.
///
/// Verbosity is the only command-line surface (§6) — everything else
/// (metrics port, kubeconfig path) is read from the environment, following
/// the original's own flag-free `main()`.
#[derive(Debug, Parser)]
#[command(name = "netobserve-agent", version, about)]
pub struct Cli {
    /// Increase log verbosity; repeat for more detail (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::INFO,
            1 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}
