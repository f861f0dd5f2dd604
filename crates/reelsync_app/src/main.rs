mod driver;
mod logging;
mod persistence;

use std::path::PathBuf;

use driver::Command;

fn main() {
    logging::initialize(logging::LogDestination::File);

    let command = match parse_args(std::env::args().skip(1).collect()) {
        Some(command) => command,
        None => {
            eprintln!("usage: reelsync_app import <watchlist.csv> [--remove-all]");
            eprintln!("       reelsync_app restore <archive.zip>");
            eprintln!("       reelsync_app status");
            eprintln!("       reelsync_app reset");
            std::process::exit(2);
        }
    };

    if let Err(message) = driver::run(command) {
        eprintln!("error: {message}");
        std::process::exit(1);
    }
}

fn parse_args(args: Vec<String>) -> Option<Command> {
    let mut args = args.into_iter();
    match args.next()?.as_str() {
        "import" => {
            let csv = PathBuf::from(args.next()?);
            let remove_all = args.any(|arg| arg == "--remove-all");
            Some(Command::Import { csv, remove_all })
        }
        "restore" => Some(Command::Restore {
            archive: PathBuf::from(args.next()?),
        }),
        "status" => Some(Command::Status),
        "reset" => Some(Command::Reset),
        _ => None,
    }
}
