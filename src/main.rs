mod cli;
mod commands;
mod env_loader;
mod error;
mod logging;
mod vault;

use crate::error::VarcError;

fn main() {
    env_loader::load_dotenv();

    if let Err(err) = cli::run() {
        match err.downcast_ref::<VarcError>() {
            Some(coded) => eprintln!("error: [{}] {err:#}", coded.code().as_str()),
            None => eprintln!("error: {err:#}"),
        }
        std::process::exit(1);
    }
}
