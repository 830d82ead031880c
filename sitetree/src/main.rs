use clap::error::ErrorKind;
use colored::Colorize;
use sitetree::commands::command_argument_builder;
use sitetree::handlers::{handle_crawl, init_logging};

#[tokio::main]
async fn main() {
    let chosen_command = match command_argument_builder().try_get_matches() {
        Ok(matches) => matches,
        Err(e) => {
            let _ = e.print();
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            std::process::exit(code);
        }
    };

    let quiet = chosen_command.get_flag("quiet");
    init_logging(chosen_command.get_flag("verbose"), quiet);

    let result = match chosen_command.subcommand() {
        Some(("crawl", primary_command)) => handle_crawl(primary_command, quiet).await,
        _ => unreachable!("clap should ensure we don't get here"),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}
