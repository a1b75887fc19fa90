use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "srm")]
#[command(version, about = "Secure resource manager policy tooling", long_about = None)]
struct Cli {
    /// Log engine events to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Security database management
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Decide one request against a security database
    Eval {
        /// Path to the security database (YAML or JSON)
        file: String,

        /// Requesting subject: UUID, base64 or "*"
        #[arg(short, long)]
        subject: String,

        /// Resource path, query allowed
        #[arg(short, long)]
        resource: String,

        /// Request method (GET, PUT, POST, DELETE)
        #[arg(short, long, default_value = "GET")]
        method: String,

        /// Evaluation time as YYYYmmddTHHMMSS (default: now)
        #[arg(long)]
        at: Option<String>,

        /// Engine configuration TOML file
        #[arg(short, long)]
        config: Option<String>,
    },
    /// Check whether a time falls in a validity window
    Window {
        /// Period, "YYYYmmdd/YYYYmmdd" or "YYYYmmddTHHMMSS/YYYYmmddTHHMMSS"
        #[arg(short, long)]
        period: String,

        /// Recurrence rule, e.g. "FREQ=DAILY; BYDAY=MO,FR"
        #[arg(short, long, default_value = "")]
        recurrence: String,

        /// Time to check as YYYYmmddTHHMMSS (default: now)
        #[arg(long)]
        at: Option<String>,
    },
}

#[derive(Subcommand)]
enum DbCommands {
    /// Validate a security database file
    Check {
        /// Path to the security database (YAML or JSON)
        file: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let filter = if cli.verbose { "debug" } else { "warn" };
    app_utils::logging::init_tracing(filter)?;

    match cli.command {
        Commands::Db { command } => match command {
            DbCommands::Check { file } => {
                commands::db::check(&file)?;
            }
        },
        Commands::Eval {
            file,
            subject,
            resource,
            method,
            at,
            config,
        } => {
            commands::eval::run(&commands::eval::EvalArgs {
                file: &file,
                subject: &subject,
                resource: &resource,
                method: &method,
                at: at.as_deref(),
                config: config.as_deref(),
            })?;
        }
        Commands::Window {
            period,
            recurrence,
            at,
        } => {
            commands::window::run(&period, &recurrence, at.as_deref())?;
        }
    }

    Ok(())
}
