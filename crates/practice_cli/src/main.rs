//! `practice` bootstrap entry point.
//!
//! # Responsibility
//! - Configure logging and load the persistence descriptor.
//! - Run one unit of work for the configured persistence unit.
//!
//! # Invariants
//! - A rolled-back unit of work still exits successfully; only bootstrap
//!   failures change the exit status.

use log::{error, info};
use practice_core::{
    core_version, error_chain, flush_logging, init_logging, logic, run_persistence_unit,
    RuntimeConfig, UnitOfWorkOutcome,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    let config = match RuntimeConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("practice: invalid configuration: {err}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = init_logging(config.log_level, config.log_dir.as_deref()) {
        eprintln!("practice: failed to initialize logging: {err}");
        return ExitCode::FAILURE;
    }

    let code = run(&config);
    flush_logging();
    code
}

fn run(config: &RuntimeConfig) -> ExitCode {
    info!(
        "event=bootstrap module=cli status=start unit={} version={}",
        config.unit_name,
        core_version()
    );

    let descriptor = match config.load_descriptor() {
        Ok(descriptor) => descriptor,
        Err(err) => {
            error!(
                "event=bootstrap module=cli status=error error_code=descriptor_invalid error={}",
                error_chain(&err)
            );
            return ExitCode::FAILURE;
        }
    };

    match run_persistence_unit(&descriptor, &config.unit_name, logic) {
        Ok(UnitOfWorkOutcome::Committed) => {
            info!("event=bootstrap module=cli status=ok outcome=committed");
            ExitCode::SUCCESS
        }
        Ok(UnitOfWorkOutcome::RolledBack { .. }) => {
            info!("event=bootstrap module=cli status=ok outcome=rolled_back");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(
                "event=bootstrap module=cli status=error error_code=bootstrap_failed error={}",
                error_chain(&err)
            );
            ExitCode::FAILURE
        }
    }
}
