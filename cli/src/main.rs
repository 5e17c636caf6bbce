mod cli;
mod logging;

use clap::Parser;
use cli::Cli;

fn main() {
    let cli = Cli::parse();

    if let Err(err) = logging::init_logging(cli.verbose) {
        eprintln!("sizeproxy: logging disabled: {:#}", err);
    }

    if let Err(err) = cli.run() {
        eprintln!("sizeproxy error: {:#}", err);
        std::process::exit(1);
    }
}
