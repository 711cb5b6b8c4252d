//! Hammers one cell from many threads under every strategy and prints how many
//! increments survived.
//!
//! ```sh
//! cargo run --release --example lost_updates
//! ```

use counter_store::{controller, Strategy};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

const THREADS: usize = 8;
const INCREMENTS: usize = 200_000;

fn main() {
    println!("Lost Updates");
    println!("============");
    println!("{THREADS} threads x {INCREMENTS} increments on a single cell\n");
    println!(
        "{:<15} {:>8} {:>12} {:>12} {:>10} {:>10}",
        "strategy", "racy", "write count", "sum", "lost", "time"
    );

    for strategy in Strategy::ALL {
        let store = controller::build(strategy, 1).expect("size 1 is valid");
        let started = Instant::now();

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..INCREMENTS {
                        store.increment(0).expect("index 0 is in range");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("Thread panicked");
        }

        let count = store.write_count();
        let sum = store.total_sum();
        println!(
            "{:<15} {:>8} {:>12} {:>12} {:>10} {:>10.2?}",
            strategy.as_str(),
            if strategy.may_lose_updates() { "yes" } else { "no" },
            count,
            sum,
            count as i64 - sum,
            started.elapsed()
        );
    }
}
