use std::process;

use zlox_drv::{Config, USAGE};

fn main() {
    let Ok(config) = Config::from_args(std::env::args().skip(1)) else {
        eprintln!("{USAGE}");
        process::exit(1);
    };

    if let Err(error) = zlox_drv::run(&config) {
        eprintln!("error: {error:#}");
        process::exit(1);
    }
}
