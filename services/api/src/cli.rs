use crate::demo::{run_demo, run_model_check, DemoArgs, ModelCheckArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use heart_risk::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Heart Attack Risk",
    about = "Run and demonstrate the heart-attack risk assessment service",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Run an offline signup, login and assessment walkthrough
    Demo(DemoArgs),
    /// Inspect the model artifact
    Model {
        #[command(subcommand)]
        command: ModelCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ModelCommand {
    /// Load and validate the artifact eagerly, then score a reference patient
    Check(ModelCheckArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args).await,
        Command::Model {
            command: ModelCommand::Check(args),
        } => run_model_check(args),
    }
}
