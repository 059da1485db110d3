use std::hash::BuildHasher;
use std::hash::RandomState;

use clap::Parser;
use robin_map::HashMap;
use robin_map::HashTable;
use robin_map::hash_table::Entry;

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'c', long = "target_capacity", default_value_t = 1000)]
    target_capacity: usize,

    /// Fraction of the inserted values to erase again before reporting.
    #[arg(short = 'e', long = "erase_fraction", default_value_t = 0.0)]
    erase_fraction: f64,
}

fn main() {
    let args = Args::parse();
    let state = RandomState::new();

    println!(
        "Creating HashTable with target capacity: {}",
        args.target_capacity
    );

    let mut table: HashTable<u64> = HashTable::with_capacity(args.target_capacity);
    let capacity = table.capacity();

    println!("Actual capacity: {}", capacity);
    println!("Filling table with u64 values...");

    // Stay below the fill level so the table keeps its capacity.
    let num_values = args.target_capacity.min(capacity * 7 / 10) as u64;
    for value in 0..num_values {
        let hash = state.hash_one(value);
        match table.entry(hash, |&v| v == value) {
            Entry::Vacant(entry) => {
                entry.insert(value);
            }
            Entry::Occupied(_) => {
                panic!("Value already exists in table: {}", value);
            }
        }
    }

    let to_erase = (num_values as f64 * args.erase_fraction.clamp(0.0, 1.0)) as u64;
    for value in 0..to_erase {
        table.remove(state.hash_one(value), |&v| v == value);
    }

    println!(
        "Inserted {} values, erased {}, {} remain",
        num_values,
        to_erase,
        table.len()
    );
    println!(
        "Final load factor: {:.2}%",
        (table.len() as f64 / table.capacity() as f64) * 100.0
    );

    table.probe_histogram().print();
    table.debug_stats().print();

    let words: HashMap<&str, usize> = "the quick brown fox jumps over the lazy dog"
        .split_whitespace()
        .zip(0..)
        .collect();
    println!("\nWord map ({} unique words):", words.len());
    words.debug_stats().print();
}
