//! MatrixPool Client
//!
//! Sends one operation to the coordinator and prints the result. Matrices are
//! given as JSON, e.g. `--a '[[1,2],[3,4]]'`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use matrixpool_coordinator::client::{CoordinatorClient, DEFAULT_COORDINATOR};
use matrixpool_proto::{Matrix, Operation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// MatrixPool client
#[derive(Parser, Debug)]
#[command(name = "matrixpool-client")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Coordinator address (host:port)
    #[arg(long, default_value = DEFAULT_COORDINATOR)]
    coordinator: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Elementwise sum of two matrices of the same shape
    Add {
        #[arg(long, value_parser = parse_matrix)]
        a: Matrix,
        #[arg(long, value_parser = parse_matrix)]
        b: Matrix,
    },
    /// Transpose one matrix
    Transpose {
        #[arg(long, value_parser = parse_matrix)]
        a: Matrix,
    },
    /// Product of two matrices; columns of A must equal rows of B
    Multiply {
        #[arg(long, value_parser = parse_matrix)]
        a: Matrix,
        #[arg(long, value_parser = parse_matrix)]
        b: Matrix,
    },
    /// Ask the coordinator to shut down
    Shutdown,
}

fn parse_matrix(raw: &str) -> std::result::Result<Matrix, String> {
    serde_json::from_str(raw).map_err(|e| format!("expected a JSON array of integer rows: {}", e))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "matrixpool_coordinator=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let client = CoordinatorClient::new(cli.coordinator);

    let op = match cli.command {
        Command::Add { a, b } => Operation::add(a, b),
        Command::Transpose { a } => Operation::transpose(a),
        Command::Multiply { a, b } => Operation::multiply(a, b),
        Command::Shutdown => {
            let ack = client
                .shutdown()
                .await
                .with_context(|| format!("Shutdown request to {} failed", client.address()))?;
            println!("{}", ack);
            return Ok(());
        }
    };

    let result = client
        .submit(&op)
        .await
        .with_context(|| format!("Request to {} failed", client.address()))?;

    match result.into_result() {
        Ok(matrix) => {
            println!("Result:");
            for row in matrix {
                println!("{:?}", row);
            }
        }
        Err(error) => println!("Error: {}", error),
    }

    Ok(())
}
