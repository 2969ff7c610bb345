use std::env;
use std::fs;
use std::path::PathBuf;

use external_text_sort::config::{MAX_INPUT_ENV, MEMORY_BUDGET_ENV};
use external_text_sort::key::PrefixKey;
use external_text_sort::sort::Sort;

mod common;

// a single test, the environment is shared by the whole test binary
#[test]
fn test_env_overrides() -> Result<(), anyhow::Error> {
    common::setup();
    let input_path = common::temp_file_name("./target/results/");
    let output_path = common::temp_file_name("./target/results/");
    common::write_lines(input_path.clone(), &common::random_records(100, 3))?;

    let mut sort = Sort::new(vec![input_path.clone()], output_path.clone());
    sort.with_tmp_dir(PathBuf::from("./target/results/"));
    sort.with_key(PrefixKey::new(3));

    // non-numeric values keep the 4096 bytes default, all 1100 bytes fit one run
    env::set_var(MEMORY_BUDGET_ENV, "lots");
    env::set_var(MAX_INPUT_ENV, "");
    sort.with_env_overrides();
    assert_eq!(sort.sort()?.runs(), 1);

    // 11 bytes per line, 10 lines per run
    env::set_var(MEMORY_BUDGET_ENV, "110");
    sort.with_env_overrides();
    assert_eq!(sort.sort()?.runs(), 10);

    env::set_var(MAX_INPUT_ENV, "100");
    sort.with_env_overrides();
    let error = sort.sort().err().unwrap();
    assert_eq!(error.category(), "invalid configuration");
    assert!(error.to_string().contains("file size exceeds maximum"));

    env::set_var(MEMORY_BUDGET_ENV, "0");
    sort.with_env_overrides();
    assert_eq!(sort.sort().err().unwrap().category(), "invalid configuration");

    env::remove_var(MEMORY_BUDGET_ENV);
    env::remove_var(MAX_INPUT_ENV);
    fs::remove_file(input_path)?;
    fs::remove_file(output_path)?;
    Ok(())
}
