mod demo;

use std::{fs, process};

use assoc_cache::{config::Config, trace::Trace, Result};

fn main() {
    env_logger::init();
    if let Err(err) = try_main() {
        eprintln!("error: {err}");
        process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let mut args = pico_args::Arguments::from_env();

    let config_str: Option<String> = if let Some(config_str) = args
        .opt_value_from_str("--config")
        .expect("--config needs a value")
    {
        Some(config_str)
    } else if let Some(config_path) = args
        .opt_value_from_str::<_, String>("-p")
        .expect("-p needs a path")
    {
        Some(fs::read_to_string(config_path)?)
    } else {
        None
    };
    let mut config = match config_str {
        Some(json) => Config::from_json(&json)?,
        None => Config::default(),
    };
    if let Some(seed) = args
        .opt_value_from_str("--seed")
        .expect("--seed should be an integer")
    {
        config.seed = Some(seed);
    }

    let trace_path: Option<String> = args.opt_value_from_str("-t").expect("-t needs a path");
    let stats_path: Option<String> = args
        .opt_value_from_str("--json")
        .expect("--json needs a path");
    let ops_per_block: usize = args
        .opt_value_from_str("--buffer-size")
        .expect("--buffer-size must be an integer")
        .unwrap_or(1024);
    let blocks_per_queue: usize = args
        .opt_value_from_str("--queue-size")
        .expect("--queue-size must be an integer")
        .unwrap_or(32);

    let mut system = config.to_system()?;
    match trace_path {
        Some(path) => {
            let trace = Trace::read(path.into(), ops_per_block, blocks_per_queue)?;
            let summary = assoc_cache::trace::run(&trace, &mut system)?;
            println!("Ran {} ops", summary.ops);
            if summary.mismatches > 0 {
                println!(
                    "{} reads did not match their expected value",
                    summary.mismatches
                );
            }
        }
        None => demo::run(&mut system)?,
    }

    let stats = system.stats();
    log::info!("{stats:?}");
    if let Some(stats_path) = stats_path {
        let stats_file = fs::File::create(stats_path)?;
        serde_json::to_writer_pretty(stats_file, &stats)?;
    }
    Ok(())
}
