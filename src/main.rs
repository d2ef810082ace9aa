/// DIDgeridoo - ATProto handle resolver
///
/// `didgeridoo` serves the resolver and settings API.
/// `didgeridoo token <subject> [--admin]` prints a bearer token for the API.

use chrono::Duration;
use clap::{Parser, Subcommand};
use didgeridoo::{
    auth::issue_token,
    config::{LoggingConfig, ServerConfig},
    server, AppContext, DidgeridooResult,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "didgeridoo")]
#[command(about = "Publish ATProto DIDs for a domain and its organization handles")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
enum Commands {
    /// Serve the resolver and settings API (default)
    Serve,

    /// Print a bearer token for the settings and profile API
    Token {
        /// Token subject (user id)
        subject: String,

        /// Grant the admin capability
        #[arg(long)]
        admin: bool,

        /// Validity in days
        #[arg(long, default_value_t = 30)]
        days: i64,
    },
}

#[tokio::main]
async fn main() -> DidgeridooResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = ServerConfig::from_env()?;

    init_logging(&config.logging);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let ctx = AppContext::new(config).await?;
            server::serve(ctx).await?;
        }
        Commands::Token {
            subject,
            admin,
            days,
        } => {
            config.validate()?;
            let token = issue_token(
                &config.authentication.jwt_secret,
                &subject,
                admin,
                Duration::days(days),
            )?;
            println!("{}", token);
        }
    }

    Ok(())
}

fn init_logging(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_new(&logging.level)
        .unwrap_or_else(|_| "didgeridoo=info,tower_http=info".into());

    let registry = tracing_subscriber::registry().with(filter);
    if logging.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_serves() {
        let cli = Cli::try_parse_from(["didgeridoo"]).unwrap();
        assert_eq!(cli.command, None);
    }

    #[test]
    fn test_token_subcommand() {
        let cli = Cli::try_parse_from(["didgeridoo", "token", "42", "--admin"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Token {
                subject: "42".to_string(),
                admin: true,
                days: 30,
            })
        );
    }

    #[test]
    fn test_unknown_arguments_rejected() {
        assert!(Cli::try_parse_from(["didgeridoo", "tokn", "alice"]).is_err());
        assert!(Cli::try_parse_from(["didgeridoo", "token", "--admin"]).is_err());
        assert!(Cli::try_parse_from(["didgeridoo", "token", "42", "--root"]).is_err());
    }
}
