use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::fs::File;
use data_encoding::HEXLOWER;
use rand::Rng;

pub fn setup() {
    let results_dir_path = PathBuf::from_str("./target/results/").unwrap();

    if !results_dir_path.exists() {
        fs::create_dir_all(&results_dir_path).unwrap_or_else(|_|
            panic!("Failed to create results directory: {:?}", results_dir_path)
        );
    } else {
        println!("Results directory exists at {:?}", results_dir_path);
    }
}

#[allow(dead_code)]
pub fn read_lines(path: PathBuf) -> Result<Vec<String>, anyhow::Error> {
    let reader = BufReader::new(File::open(path)?);
    let lines = reader.lines().map(|x| x.unwrap()).collect();
    Ok(lines)
}

#[allow(dead_code)]
pub fn write_lines(path: PathBuf, lines: &[String]) -> Result<(), anyhow::Error> {
    let mut writer = BufWriter::new(File::create(path)?);
    for line in lines {
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

#[allow(dead_code)]
pub fn temp_file_name(dir: &str) -> PathBuf {
    let mut result = PathBuf::from(dir);
    let name = HEXLOWER.encode(&rand::random::<[u8; 16]>());
    result.push(name);
    result
}

/// A fresh directory under `dir`, for tests that look at what is left in it
#[allow(dead_code)]
pub fn temp_dir(dir: &str) -> Result<PathBuf, anyhow::Error> {
    let path = temp_file_name(dir);
    fs::create_dir_all(&path)?;
    Ok(path)
}

/// `count` lines, each a random key of `key_length` letters `a` to `d` followed by `:` and the line
/// index. Keys are drawn from a small alphabet so that ties are common.
#[allow(dead_code)]
pub fn random_records(count: usize, key_length: usize) -> Vec<String> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|i| {
            let key: String = (0..key_length)
                .map(|_| char::from(b'a' + rng.gen_range(0..4u8)))
                .collect();
            format!("{key}:{i:06}")
        })
        .collect()
}
