use std::{env, path::PathBuf};

use anyhow::{Result, anyhow};

pub fn config_path_from_args() -> Result<PathBuf> {
    config_path_from(env::args().skip(1))
}

fn config_path_from(mut args: impl Iterator<Item = String>) -> Result<PathBuf> {
    let first = args.next();

    if args.next().is_some() {
        return Err(anyhow!(
            "expected at most one argument: <config-path>. Example: cargo run -- ./flipflop.jsonc"
        ));
    }

    match first {
        Some(path) => Ok(PathBuf::from(path)),
        None => {
            let mut path = env::current_dir()?;
            path.push("flipflop.jsonc");
            Ok(path)
        }
    }
}
