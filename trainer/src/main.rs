use std::{env, process::ExitCode};

use log::{error, info};
use trainer::{Session, TrainingConfig};

fn run(path: &str) -> trainer::Result<()> {
    let config = TrainingConfig::load(path)?;
    let (params, reports) = Session::from_config(config)?.run()?;

    if let Some(last) = reports.last() {
        info!("finished after {} epochs, train loss {:.6}", last.epoch, last.train_loss);
    }
    info!("trained {} parameters", params.len());
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let Some(path) = env::args().nth(1) else {
        eprintln!("usage: trainer <config.json>");
        return ExitCode::FAILURE;
    };

    match run(&path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
