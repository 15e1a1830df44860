use cfi_io::cli::{run_inpaint_command, run_sensitivity_command, Cli, Commands};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Inpaint { common } => {
            run_inpaint_command(common).await?;
        }
        Commands::Sensitivity {
            common,
            samples,
            predictor,
        } => {
            run_sensitivity_command(common, samples, predictor).await?;
        }
    }

    Ok(())
}
