use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use log::LevelFilter;
use simple_logger::SimpleLogger;

use external_text_sort::order::Order;
use external_text_sort::sort_command::{status, SortCommand};

/// Sort SORT_DIR/SORT_FILE into SORT_DIR/SORTED_FILE with bounded memory
#[derive(Parser, Debug)]
#[command(name = "external-text-sort", version, about)]
struct Args {
    /// Directory holding the input, the sorted file is written here too
    sort_dir: PathBuf,
    /// Name of the file to sort
    sort_file: PathBuf,
    /// Directory for intermediate runs
    tmp_dir: PathBuf,
    /// Name of the sorted file
    sorted_file: PathBuf,
    /// Bytes of records held in memory before a run is written [default: 4096, env: EX_SORT_MAX_BUFFER]
    #[arg(long)]
    memory_budget: Option<u64>,
    /// Number of leading bytes of each line to sort by
    #[arg(long, default_value_t = 10)]
    key_length: usize,
    #[arg(long, value_enum, default_value_t = SortOrder::Asc)]
    order: SortOrder,
    /// Maximum number of runs merged at once
    #[arg(long, default_value_t = 1024)]
    max_open_runs: usize,
    #[arg(long, default_value_t = LevelFilter::Warn)]
    log_level: LevelFilter,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SortOrder {
    Asc,
    Desc,
}

impl From<SortOrder> for Order {
    fn from(order: SortOrder) -> Order {
        match order {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        }
    }
}

fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();
    SimpleLogger::new().with_level(args.log_level).init()?;

    let mut command = SortCommand::new(args.sort_dir, args.sort_file, args.tmp_dir, args.sorted_file);
    if let Some(memory_budget) = args.memory_budget {
        command.with_memory_budget_bytes(memory_budget);
    }
    command.with_key_length(args.key_length);
    command.with_order(args.order.into());
    command.with_max_open_runs(args.max_open_runs);

    let result = command.execute();
    println!("{}", status(&result));
    if let Err(e) = result {
        log::error!("{:?}", e);
        process::exit(1);
    }
    Ok(())
}
