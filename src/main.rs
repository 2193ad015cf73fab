use clap::{arg, command, error::ErrorKind, value_parser, ArgAction, Command};
use log::info;
use scatter::config::Config;
use scatter::keys::KeyManager;
use scatter::models::address::WorkerAddress;
use scatter::models::report::WorkerHealth;
use scatter::pipeline::{assemble_payload, check_workers, scatter_payload, AssembleOptions};
use scatter::worker::dir::DirCluster;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

#[tokio::main]
async fn main() {
    env_logger::init();

    let mut cmd = command!()
        .propagate_version(true)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("keygen")
                .about("Generate the key pair for this identity, replacing any prior pair.")
                .arg(arg!(--keydir <DIR>).required(false).action(ArgAction::Set))
                .arg(arg!(--identity <NAME>).required(false).action(ArgAction::Set)),
        )
        .subcommand(
            Command::new("scatter")
                .about("Encrypt the payload, split it, and hand the fragments to the workers.")
                .arg(arg!(--infile <FILE>).required(true).action(ArgAction::Set))
                .arg(arg!(--cluster <DIR>).required(true).action(ArgAction::Set))
                .arg(arg!(--workers <LIST>).required(false).action(ArgAction::Set))
                .arg(arg!(--keydir <DIR>).required(false).action(ArgAction::Set))
                .arg(arg!(--identity <NAME>).required(false).action(ArgAction::Set))
                .arg(arg!(--order <FILE>).required(true).action(ArgAction::Set)),
        )
        .subcommand(
            Command::new("assemble")
                .about("Collect the fragments back, verify them, and recover the payload.")
                .arg(arg!(--outfile <FILE>).required(true).action(ArgAction::Set))
                .arg(arg!(--cluster <DIR>).required(true).action(ArgAction::Set))
                .arg(arg!(--workers <LIST>).required(false).action(ArgAction::Set))
                .arg(arg!(--keydir <DIR>).required(false).action(ArgAction::Set))
                .arg(arg!(--identity <NAME>).required(false).action(ArgAction::Set))
                .arg(arg!(--order <FILE>).required(true).action(ArgAction::Set))
                .arg(
                    arg!(--tolerance <SECONDS>)
                        .required(false)
                        .value_parser(value_parser!(i64))
                        .action(ArgAction::Set),
                ),
        )
        .subcommand(
            Command::new("check")
                .about("Probe every worker and report its health.")
                .arg(arg!(--cluster <DIR>).required(true).action(ArgAction::Set))
                .arg(arg!(--workers <LIST>).required(false).action(ArgAction::Set)),
        );
    let matches = cmd.get_matches_mut();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => cmd.error(ErrorKind::ValueValidation, e.to_string()).exit(),
    };
    info!("running as {}", config.role);

    match matches.subcommand() {
        Some(("keygen", sub_matches)) => {
            let key_dir = resolve_key_dir(sub_matches, &config);
            let identity = resolve_identity(sub_matches, &config);
            let manager = KeyManager::new(key_dir, identity);
            match manager.generate(&config.password) {
                Ok(_) => println!("key pair generated"),
                Err(e) => {
                    eprintln!("keygen failed: {}", e);
                    process::exit(1);
                }
            }
        }
        Some(("scatter", sub_matches)) => {
            let input_file = Path::new(sub_matches.get_one::<String>("infile").unwrap());
            if !input_file.is_file() {
                cmd.error(ErrorKind::ValueValidation, "Input is not a readable file.")
                    .exit();
            }
            let workers = resolve_workers(sub_matches, &config);
            if workers.is_empty() {
                cmd.error(ErrorKind::ValueValidation, "No worker addresses given.")
                    .exit();
            }

            let cluster = DirCluster::new(sub_matches.get_one::<String>("cluster").unwrap());
            let manager = KeyManager::new(
                resolve_key_dir(sub_matches, &config),
                resolve_identity(sub_matches, &config),
            );
            let order_file = PathBuf::from(sub_matches.get_one::<String>("order").unwrap());

            match handle_scatter(&cluster, &manager, input_file, &workers, &order_file, &config)
                .await
            {
                Ok(sent) => println!("scattered to {}/{} workers", sent, workers.len()),
                Err(e) => {
                    eprintln!("scatter failed: {}", e);
                    process::exit(1);
                }
            }
        }
        Some(("assemble", sub_matches)) => {
            let output_file = Path::new(sub_matches.get_one::<String>("outfile").unwrap());
            let workers = resolve_workers(sub_matches, &config);
            if workers.is_empty() {
                cmd.error(ErrorKind::ValueValidation, "No worker addresses given.")
                    .exit();
            }

            let cluster = DirCluster::new(sub_matches.get_one::<String>("cluster").unwrap());
            let manager = KeyManager::new(
                resolve_key_dir(sub_matches, &config),
                resolve_identity(sub_matches, &config),
            );
            let order_file = PathBuf::from(sub_matches.get_one::<String>("order").unwrap());
            let tolerance_secs = sub_matches
                .get_one::<i64>("tolerance")
                .copied()
                .unwrap_or(config.tolerance_secs);

            let opts = AssembleOptions {
                tolerance: chrono::Duration::seconds(tolerance_secs),
                min_fragments: config.min_fragments,
                call_timeout: Duration::from_secs(config.call_timeout_secs),
                deadline: Duration::from_secs(config.deadline_secs),
            };
            let assembled = handle_assemble(
                &cluster,
                &manager,
                output_file,
                &workers,
                &order_file,
                &opts,
                &config,
            )
            .await;
            match assembled {
                Ok(len) => println!("recovered {} bytes to {}", len, output_file.display()),
                Err(e) => {
                    eprintln!("assemble failed: {}", e);
                    process::exit(1);
                }
            }
        }
        Some(("check", sub_matches)) => {
            let workers = resolve_workers(sub_matches, &config);
            let cluster = DirCluster::new(sub_matches.get_one::<String>("cluster").unwrap());
            let report = check_workers(
                &cluster,
                &workers,
                Duration::from_secs(config.call_timeout_secs),
            )
            .await;
            for (addr, health) in report {
                match health {
                    WorkerHealth::Healthy => println!("{}: healthy", addr),
                    WorkerHealth::Unhealthy(reason) => println!("{}: {}", addr, reason),
                }
            }
        }

        _ => unreachable!("invalid subcommand"),
    }
}

async fn handle_scatter(
    cluster: &DirCluster,
    manager: &KeyManager,
    input_file: &Path,
    workers: &[WorkerAddress],
    order_file: &Path,
    config: &Config,
) -> Result<usize, Box<dyn Error>> {
    let payload = fs::read(input_file)?;
    let recipient = manager.load_public()?;
    let record = scatter_payload(
        cluster,
        manager,
        &recipient,
        &payload,
        workers,
        Duration::from_secs(config.call_timeout_secs),
    )
    .await?;

    // the sealed order is the only way back to the original byte order;
    // the distributor keeps it, the workers never see it
    fs::write(order_file, &record.sealed_order)?;
    for (addr, failure) in record.report.failures() {
        eprintln!("{}: {}", addr, failure);
    }
    Ok(record.report.sent_count())
}

async fn handle_assemble(
    cluster: &DirCluster,
    manager: &KeyManager,
    output_file: &Path,
    workers: &[WorkerAddress],
    order_file: &Path,
    opts: &AssembleOptions,
    config: &Config,
) -> Result<usize, Box<dyn Error>> {
    let sealed_order = fs::read(order_file)?;
    let plaintext = assemble_payload(
        cluster,
        manager,
        &config.password,
        workers,
        &sealed_order,
        opts,
    )
    .await?;
    fs::write(output_file, &plaintext)?;
    Ok(plaintext.len())
}

fn resolve_workers(sub_matches: &clap::ArgMatches, config: &Config) -> Vec<WorkerAddress> {
    match sub_matches.get_one::<String>("workers") {
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(WorkerAddress::from)
            .collect(),
        None => config.workers.clone(),
    }
}

fn resolve_key_dir(sub_matches: &clap::ArgMatches, config: &Config) -> PathBuf {
    sub_matches
        .get_one::<String>("keydir")
        .map(PathBuf::from)
        .unwrap_or_else(|| config.key_dir.clone())
}

fn resolve_identity(sub_matches: &clap::ArgMatches, config: &Config) -> String {
    sub_matches
        .get_one::<String>("identity")
        .cloned()
        .unwrap_or_else(|| config.identity.clone())
}
