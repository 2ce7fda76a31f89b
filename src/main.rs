use clap::Parser;

use gitbot::{Args, Result, command};

fn initialize_logger(level: simplelog::LevelFilter) -> Result<()> {
    let config = simplelog::ConfigBuilder::new()
        .add_filter_allow_str("gitbot")
        .build();

    simplelog::TermLogger::init(
        level,
        config,
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli_args = Args::parse();

    initialize_logger(cli_args.log.into())?;

    if let Err(err) = command::execute(&cli_args).await {
        eprintln!("{err}");
        std::process::exit(-1);
    }

    Ok(())
}
