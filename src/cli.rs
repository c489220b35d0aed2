//! Command-line interface built on clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// docjob: submit documents to an asynchronous extraction service and wait
/// for the result.
#[derive(Debug, Parser)]
#[command(name = "docjob", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file.
    #[arg(long, global = true, default_value = "docjob.toml")]
    pub config: PathBuf,

    /// Override the per-job timeout in seconds.
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// Enable debug logging.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Parse one document and print the normalized result.
    Parse(ParseArgs),

    /// Await the result of an already submitted job.
    Poll {
        /// Remote job id returned by the service.
        job_id: String,

        /// Print the job summary after the result.
        #[arg(long, default_value_t = false)]
        summary: bool,
    },

    /// Serve the HTTP parse endpoint.
    Serve {
        /// Bind address; defaults to `bind_addr` from the config.
        #[arg(long)]
        addr: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct ParseArgs {
    /// Document text submitted inline.
    #[arg(long, conflicts_with = "file", required_unless_present = "file")]
    pub text: Option<String>,

    /// Local document file.
    #[arg(long)]
    pub file: Option<PathBuf>,

    #[arg(long)]
    pub candidate_name: Option<String>,

    /// Caller-side job reference stored with the result.
    #[arg(long)]
    pub job_id: Option<String>,

    #[arg(long)]
    pub user_id: Option<String>,

    /// Print the parsed payload only, without the response envelope.
    #[arg(long, default_value_t = false)]
    pub raw: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_parse_with_text() {
        let cli = Cli::parse_from(["docjob", "parse", "--text", "Jane Doe", "--candidate-name", "Jane"]);
        match cli.command {
            Command::Parse(args) => {
                assert_eq!(args.text.as_deref(), Some("Jane Doe"));
                assert_eq!(args.candidate_name.as_deref(), Some("Jane"));
                assert!(args.file.is_none());
                assert!(!args.raw);
            }
            _ => panic!("expected Parse command"),
        }
    }

    #[test]
    fn cli_parse_requires_a_document() {
        assert!(Cli::try_parse_from(["docjob", "parse"]).is_err());
        assert!(
            Cli::try_parse_from(["docjob", "parse", "--text", "a", "--file", "b.pdf"]).is_err()
        );
    }

    #[test]
    fn cli_parses_global_flags() {
        let cli = Cli::parse_from([
            "docjob",
            "--config",
            "other.toml",
            "--timeout-secs",
            "90",
            "--verbose",
            "poll",
            "J1",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.config, PathBuf::from("other.toml"));
        assert_eq!(cli.timeout_secs, Some(90));
        match cli.command {
            Command::Poll { job_id, summary } => {
                assert_eq!(job_id, "J1");
                assert!(!summary);
            }
            _ => panic!("expected Poll command"),
        }
    }

    #[test]
    fn cli_parses_serve() {
        let cli = Cli::parse_from(["docjob", "serve", "--addr", "0.0.0.0:9000"]);
        assert!(matches!(cli.command, Command::Serve { addr: Some(a) } if a == "0.0.0.0:9000"));
    }

    #[test]
    fn cli_verify() {
        Cli::command().debug_assert();
    }
}
