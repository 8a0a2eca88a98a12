use clap::Parser;
use log::error;
use std::path::PathBuf;
use std::process;

use s3hash::utils::{resolve_workers, Status};
use s3hash::{Etag, HashOptions, MIB, MIN_PART_SIZE};

/// Command-line interface for s3hash
#[derive(Parser, Debug)]
#[command(
    name = "s3hash",
    version,
    about = "Calculate/verify the ETag of an S3 object, given a file and chunk size"
)]
struct Cli {
    /// Verify that the file has this S3 ETag; prints OK or ERROR
    #[arg(short = 'e', long = "expect", value_name = "ETAG")]
    expect: Option<String>,

    /// Number of workers. Negative N uses N workers per core, 0 hashes sequentially
    #[arg(
        short = 'p',
        long,
        value_name = "NUM",
        default_value_t = -1,
        allow_negative_numbers = true
    )]
    workers: i64,

    /// Disables the progress bar
    #[arg(long)]
    no_progress: bool,

    /// Part size in MiB, as used for the upload (at least 5)
    #[arg(value_name = "CHUNK_SIZE_MB")]
    chunk_size: String,

    /// File to hash
    file: PathBuf,
}

fn main() {
    // Initialize logging using env_logger and S3HASH_LOG
    env_logger::Builder::from_env(env_logger::Env::new().filter("S3HASH_LOG")).init();

    let cli = Cli::parse();

    let chunk_size = match cli.chunk_size.parse::<u64>() {
        Ok(mb) if mb >= MIN_PART_SIZE / MIB => mb.checked_mul(MIB),
        _ => None,
    };
    let Some(chunk_size) = chunk_size else {
        eprintln!("Please specify a valid chunk size");
        process::exit(1);
    };

    let options = HashOptions {
        chunk_size,
        workers: resolve_workers(cli.workers, num_cpus::get()),
        no_progress: cli.no_progress,
    };

    let result = match s3hash::calculate_for_file(&cli.file, &options) {
        Ok(result) => result,
        Err(e) => {
            error!("Hashing {:?} failed: {:?}", cli.file, e);
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    if let Some(expected) = cli.expect {
        let status = match Etag::parse(&expected) {
            Ok(etag) => Status::from(etag.to_string() == result),
            Err(e) => {
                eprintln!("{}", e);
                Status::Failed
            }
        };
        match status {
            Status::Passed => println!("OK"),
            Status::Failed => {
                eprintln!("ERROR");
                process::exit(1);
            }
        }
        return;
    }

    println!("{}", result);
}
