mod cli;
mod commands;
mod config;
mod env_loader;
mod error;
mod logging;
mod matrix;
mod migrate;
mod rocketchat;
mod util;

fn main() {
    env_loader::load_dotenv();

    if let Err(err) = cli::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
