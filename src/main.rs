use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use huella::cli::Cli;
use huella::env::{Env, FsEnv};
use huella::trace_env::TracingEnv;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn key_for(i: u32) -> String {
    format!("key{i:08}")
}

fn random_value(size: usize, rng: &mut StdRng) -> Vec<u8> {
    const ALPHABET: &[u8] =
        b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
    (0..size)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())])
        .collect()
}

/// One workload record: `keyNNNNNNNN=<value>\n`.
fn record_len(value_size: usize) -> usize {
    key_for(0).len() + 1 + value_size + 1
}

/// Append `num_writes` keyed records to the workload log.
fn write_phase(env: &dyn Env, log: &Path, cli: &Cli) -> Result<()> {
    let mut rng = StdRng::seed_from_u64(0xC0DE_F00D);
    let mut file = env
        .new_writable_file(log)
        .with_context(|| format!("open writable {}", log.display()))?;

    for i in 0..cli.num_writes {
        let value = random_value(cli.value_size, &mut rng);
        let mut record = Vec::with_capacity(record_len(cli.value_size));
        record.extend_from_slice(key_for(i).as_bytes());
        record.push(b'=');
        record.extend_from_slice(&value);
        record.push(b'\n');

        file.append(&record)
            .with_context(|| format!("append record {i}"))?;
        if cli.sync_writes {
            file.sync().with_context(|| format!("sync record {i}"))?;
        }
    }

    file.flush().context("flush workload log")?;
    file.close().context("close workload log")?;
    Ok(())
}

/// Read records back, first sequentially, then at random-access offsets.
fn read_phase(env: &dyn Env, log: &Path, cli: &Cli) -> Result<()> {
    if cli.num_writes == 0 || cli.num_reads == 0 {
        return Ok(());
    }
    let len = record_len(cli.value_size);

    let mut seq = env
        .new_sequential_file(log)
        .with_context(|| format!("open sequential {}", log.display()))?;
    let mut buf = vec![0u8; len];
    for i in 0..cli.num_reads.min(cli.num_writes) {
        let n = seq
            .read(&mut buf)
            .with_context(|| format!("sequential read {i}"))?;
        if n == 0 {
            break;
        }
    }

    let file = env
        .new_random_access_file(log)
        .with_context(|| format!("open random-access {}", log.display()))?;
    for i in 0..cli.num_reads {
        let k = i % cli.num_writes;
        let offset = u64::from(k) * len as u64;
        file.read_at(offset, &mut buf)
            .with_context(|| format!("random read at offset {offset}"))?;
    }
    Ok(())
}

fn run(cli: &Cli) -> Result<()> {
    std::fs::create_dir_all(&cli.db)
        .with_context(|| format!("create workload directory {}", cli.db.display()))?;

    let base = FsEnv;
    let env = TracingEnv::new(&base, cli.policy());
    let log = cli.db.join("000001.log");

    eprintln!("[huella] workload started in {}", cli.db.display());
    write_phase(&env, &log, cli)?;
    read_phase(&env, &log, cli)?;
    eprintln!("[huella] done");
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);
    run(&cli)
}
