use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use squadqa::cmd;

#[derive(Parser)]
#[command(name = "squadqa")]
#[command(version)]
#[command(about = "Extractive question answering over text passages", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer the built-in demo questions with a model variant
    Ask {
        variant: String,
        #[arg(long)]
        gpu: bool,
    },
    /// Evaluate a variant on a SQuAD dev set and write its predictions file
    Eval {
        variant: String,
        #[arg(short, long, default_value = "data/dev-v2.0.json")]
        data: PathBuf,
        /// Root directory for predictions output
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        gpu: bool,
    },
    /// Fine-tune a variant on a SQuAD training set
    Train {
        variant: String,
        #[arg(short, long, default_value = "data/train-v2.0.json")]
        data: PathBuf,
        #[arg(long)]
        epochs: Option<usize>,
        #[arg(long)]
        batch_size: Option<usize>,
        #[arg(long)]
        learning_rate: Option<f64>,
        #[arg(long)]
        gpu: bool,
    },
    /// Serve the answering endpoint over HTTP
    Serve {
        #[arg(default_value = "roberta")]
        variant: String,
        #[arg(long)]
        gpu: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("squadqa=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Ask { variant, gpu } => cmd::ask(&variant, gpu),
        Commands::Eval {
            variant,
            data,
            output,
            gpu,
        } => cmd::eval(&variant, data, output, gpu),
        Commands::Train {
            variant,
            data,
            epochs,
            batch_size,
            learning_rate,
            gpu,
        } => cmd::train(&variant, data, epochs, batch_size, learning_rate, gpu),
        Commands::Serve { variant, gpu } => cmd::serve(&variant, gpu).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
