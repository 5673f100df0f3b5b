//! Command line arguments

use std::path::PathBuf;

use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};

use riskwatch_types::parse_wire_time;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Log in to a security appliance and count risk events")]
pub struct Cli {
    /// Credential file (defaults to <config dir>/riskwatch/account.json)
    #[arg(long, global = true, env = "RISKWATCH_STORE")]
    pub store: Option<PathBuf>,

    /// Subcommand
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Fetch a captcha, prompt for its text and log in
    Login {
        /// Appliance base URL, e.g. https://10.0.0.1
        #[arg(long, env = "RISKWATCH_BASE_URL")]
        base_url: String,

        /// Account name
        #[arg(short, long, env = "RISKWATCH_USERNAME")]
        username: String,

        /// Password; prompted for when omitted
        #[arg(short, long, env = "RISKWATCH_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Login type (0 or 1)
        #[arg(long, default_value_t = 1)]
        login_type: u8,

        /// Where to write the captcha image
        #[arg(long, default_value = "captcha.png")]
        captcha_out: PathBuf,
    },

    /// Count risk events between two times using the stored session
    Query {
        /// Range start, `yyyy-MM-dd HH:mm:ss` or `yyyy-MM-dd`
        #[arg(long, value_parser = parse_time)]
        start: NaiveDateTime,

        /// Range end (exclusive)
        #[arg(long, value_parser = parse_time)]
        end: NaiveDateTime,
    },

    /// Show the stored session token's claims
    Token,
}

fn parse_time(input: &str) -> Result<NaiveDateTime, String> {
    parse_wire_time(input).map_err(|e| e.to_string())
}
