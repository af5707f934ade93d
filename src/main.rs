use clap::Parser;
use tasktree::cli::commands::{Cli, Commands};
use tasktree::cli::handlers;
use tasktree::io::logging;
use tasktree::model::config::Config;

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init(args) => {
            // Init runs before a project (and its config) exists
            logging::init_logging(&Config::default());
            handlers::cmd_init(args, cli.project_dir.as_deref())
        }
        _ => handlers::dispatch(cli),
    };
    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
