//! Application configuration.

use std::{path::PathBuf, time::Duration};

use clap::{Args, Parser, Subcommand};
use election_types::admin::AdminCredentials;
use election_types::display::DisplayZone;
use election_types::voting::{CandidateId, PositionId};

/// How often the countdown recomputes the time remaining.
pub(crate) const COUNTDOWN_TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Parser)]
#[command(author, version, about)]
pub(crate) struct Config {
    /// Base URL of the election API, e.g. `https://vote.example.com/api`.
    #[arg(long, env = "ELECTION_API_URL", default_value = "http://localhost:5000/api/")]
    pub(crate) api_url: reqwest::Url,

    /// File holding the signed-in user and cached results between runs.
    #[arg(long, env = "STATE_FILE", default_value = ".election-terminal.json")]
    pub(crate) state_file: PathBuf,

    /// Seconds between election status polls while watching.
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    pub(crate) poll_interval_secs: u64,

    /// UTC offset times are displayed in, e.g. `+03:00`.
    #[arg(long, env = "DISPLAY_UTC_OFFSET", default_value = "+03:00")]
    pub(crate) display_zone: DisplayZone,

    /// Log level.
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    pub(crate) log_level: tracing::Level,

    #[command(subcommand)]
    pub(crate) command: Command,
}

impl Config {
    pub(crate) fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

#[derive(Debug, Clone, Subcommand)]
pub(crate) enum Command {
    /// Follow the election live until interrupted: phase changes and a
    /// countdown to the close of voting.
    Watch,

    /// Show the current election status.
    Status,

    /// Show election results, falling back to the last results cached for
    /// the current election.
    Results,

    /// Sign in as a voter.
    Signin {
        #[arg(long)]
        email: String,

        #[arg(long, env = "ELECTION_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Sign out and forget cached results.
    Logout,

    /// Show the signed-in voter.
    Whoami,

    /// List the positions on the ballot.
    Positions,

    /// List the candidates standing for a position.
    Candidates { position_id: PositionId },

    /// Vote for a candidate. Only possible while the election is active.
    Vote {
        position_id: PositionId,
        candidate_id: CandidateId,
    },

    /// Show which positions the signed-in voter has voted for.
    MyVotes,

    /// Administrative commands.
    Admin(AdminArgs),
}

#[derive(Debug, Clone, Args)]
pub(crate) struct AdminArgs {
    #[arg(long, env = "ADMIN_NAME")]
    pub(crate) admin_name: String,

    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    pub(crate) admin_password: String,

    #[command(subcommand)]
    pub(crate) command: AdminCommand,
}

impl AdminArgs {
    pub(crate) fn credentials(&self) -> AdminCredentials {
        AdminCredentials {
            admin_name: self.admin_name.clone(),
            admin_password: self.admin_password.clone(),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
pub(crate) enum AdminCommand {
    /// Check the admin credentials.
    Login,

    /// Register a new voter.
    CreateUser {
        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,

        #[arg(long)]
        name: String,
    },

    /// Add a candidate to a position.
    AddCandidate {
        #[arg(long)]
        position: PositionId,

        #[arg(long)]
        name: String,

        /// Image URL shown next to the candidate.
        #[arg(long)]
        image: Option<String>,
    },

    /// Remove a candidate.
    DeleteCandidate { candidate_id: CandidateId },

    /// Add (or, with a negative amount, remove) votes for a candidate.
    AdjustVotes {
        candidate_id: CandidateId,

        #[arg(allow_negative_numbers = true)]
        amount: i64,
    },

    /// Schedule the election. Times are RFC 3339, or `YYYY-MM-DDTHH:MM` in the
    /// display offset.
    SetElection {
        #[arg(long)]
        name: String,

        #[arg(long)]
        start_at: String,

        #[arg(long)]
        end_at: String,

        /// Wipe all votes and start a fresh election.
        #[arg(long)]
        reset_data: bool,
    },

    /// List every candidate with vote counts.
    Candidates,
}
