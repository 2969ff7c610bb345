use std::fs;
use std::path::PathBuf;

use external_text_sort::key::PrefixKey;
use external_text_sort::order::Order;
use external_text_sort::sort::Sort;

mod common;

#[test]
fn test_check_sorted() -> Result<(), anyhow::Error> {
    common::setup();
    let input_path = common::temp_file_name("./target/results/");
    let mut lines = common::random_records(1000, 10);
    lines.sort();
    common::write_lines(input_path.clone(), &lines)?;

    let text_file_sort = Sort::new(vec![input_path.clone(), input_path.clone()], PathBuf::new());
    let result = text_file_sort.check()?;
    assert_eq!(result, true);
    fs::remove_file(input_path)?;
    Ok(())
}

#[test]
fn test_check_sorted_desc() -> Result<(), anyhow::Error> {
    common::setup();
    let input_path = common::temp_file_name("./target/results/");
    let mut lines = common::random_records(1000, 10);
    lines.sort();
    lines.reverse();
    common::write_lines(input_path.clone(), &lines)?;

    let mut text_file_sort = Sort::new(vec![input_path.clone(), input_path.clone()], PathBuf::new());
    text_file_sort.with_order(Order::Desc);
    let result = text_file_sort.check()?;
    assert_eq!(result, true);
    fs::remove_file(input_path)?;
    Ok(())
}

#[test]
fn test_check_not_sorted() -> Result<(), anyhow::Error> {
    common::setup();
    let input_path = common::temp_file_name("./target/results/");
    fs::write(&input_path, "alpha-0001\ncharlie-03\nbravo-0002\n")?;

    let text_file_sort = Sort::new(vec![input_path.clone()], PathBuf::new());
    let result = text_file_sort.check()?;
    assert_eq!(result, false);
    fs::remove_file(input_path)?;
    Ok(())
}

#[test]
fn test_check_sorted_output() -> Result<(), anyhow::Error> {
    common::setup();
    let input_path = common::temp_file_name("./target/results/");
    let output_path = common::temp_file_name("./target/results/");
    common::write_lines(input_path.clone(), &common::random_records(1000, 2))?;

    let mut text_file_sort = Sort::new(vec![input_path.clone()], output_path.clone());
    text_file_sort.with_tmp_dir(PathBuf::from("./target/results/"));
    text_file_sort.with_key(PrefixKey::new(2));
    text_file_sort.with_memory_budget_bytes(256);
    assert_eq!(text_file_sort.check()?, false);
    text_file_sort.sort()?;

    let mut check = Sort::new(vec![output_path.clone()], PathBuf::new());
    check.with_key(PrefixKey::new(2));
    assert_eq!(check.check()?, true);
    fs::remove_file(input_path)?;
    fs::remove_file(output_path)?;
    Ok(())
}

#[test]
fn test_check_malformed() -> Result<(), anyhow::Error> {
    common::setup();
    let input_path = common::temp_file_name("./target/results/");
    fs::write(&input_path, "alpha-0001\nbeta\n")?;

    let text_file_sort = Sort::new(vec![input_path.clone()], PathBuf::new());
    let error = text_file_sort.check().err().unwrap();
    assert_eq!(error.category(), "malformed record");
    fs::remove_file(input_path)?;
    Ok(())
}
