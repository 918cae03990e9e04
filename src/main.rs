use std::io::IsTerminal;

use ptail::cli::{parse_args, usage, Invocation};
use ptail::config::build_config;
use ptail::logging;
use ptail::stream;

#[tokio::main]
async fn main() {
    let cli = match parse_args(std::env::args()) {
        Ok(Invocation::Tail(cli)) => cli,
        Ok(Invocation::Usage { missing_target }) => {
            if missing_target {
                println!("Please specify a valid folder, file name or file pattern in the command line.");
                println!();
            }
            print!("{}", usage());
            return;
        }
        Err(e) => e.exit(),
    };

    let config = build_config(&cli, std::io::stdout().is_terminal());
    logging::init(config.verbose);
    tracing::debug!(?config, "effective config");

    if let Err(e) = stream::run_stream(&config).await {
        let code = e.exit_code();
        if code != 0 {
            eprintln!("ptail: {}", e);
        }
        std::process::exit(code);
    }
}
