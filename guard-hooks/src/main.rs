use clap::Parser;
use tokio::io::AsyncReadExt;

use guard_hooks::cli::{Cli, run_cli};
use guard_hooks::logging;

#[cfg(not(tarpaulin_include))]
#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let mut stdin = String::new();
    if cli.reads_stdin()
        && let Err(e) = tokio::io::stdin().read_to_string(&mut stdin).await
    {
        tracing::warn!(error = %e, "failed to read stdin, treating it as empty");
        stdin.clear();
    }

    match run_cli(cli, &stdin).await {
        Ok((output, exit_code)) => {
            println!("{}", output);
            if exit_code != 0 {
                std::process::exit(exit_code);
            }
        }
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    }
}
