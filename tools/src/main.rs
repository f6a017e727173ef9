//! gacha-calc: JSON front end for the pull-cost models.
//!
//! Usage:
//!   gacha-calc '{"game":"hsr","pool":"character","targetCount":1,"initialState":{"pity":0,"isGuaranteed":false}}'
//!   gacha-calc --request req.json --config sim.json --seed 12345 --workers 8

use anyhow::{Context, Result};
use gacha_core::{config::SimConfig, Request};
use std::env;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if let Err(e) = run(&args) {
        log::error!("request failed: {e:#}");
        eprintln!("FATAL: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

fn run(args: &[String]) -> Result<()> {
    let mut config = match flag_value(args, "--config") {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    if let Some(seed) = parse_flag::<u64>(args, "--seed")? {
        config.seed = Some(seed);
    }
    if let Some(workers) = parse_flag::<usize>(args, "--workers")? {
        config.workers = workers;
    }

    let raw = match flag_value(args, "--request") {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("Cannot read {path}"))?,
        None => positional(args).context("missing request JSON argument")?.to_string(),
    };
    let request: Request = serde_json::from_str(&raw).context("invalid request JSON")?;
    log::debug!("request: {request:?}");

    let response = gacha_core::run(&request, &config)?;
    println!("{}", serde_json::to_string(&response)?);
    Ok(())
}

const VALUE_FLAGS: [&str; 4] = ["--config", "--seed", "--workers", "--request"];

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_flag<T>(args: &[String], flag: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    flag_value(args, flag)
        .map(|v| v.parse::<T>().with_context(|| format!("bad value for {flag}: {v}")))
        .transpose()
}

/// First argument that is neither a flag nor a flag's value.
fn positional(args: &[String]) -> Option<&str> {
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        if VALUE_FLAGS.contains(&arg.as_str()) {
            iter.next();
            continue;
        }
        return Some(arg.as_str());
    }
    None
}
