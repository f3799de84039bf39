// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Sends a herd of concurrent callers at each acquisition strategy in turn and reports how
//! many generations each one paid for.
//!
//! Run with `cargo run --example herd -p stampede`. Pass a strategy name (for example
//! `single-flight-cached`) to run just that one.

use std::{sync::Arc, time::Duration};

use stampede::{AcquisitionStrategy, DEFAULT_KEY, StampedeOptions, Strategy, StrategyKind};

const CALLERS: usize = 5;
const CALLER_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> stampede::Result<()> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

    let options = StampedeOptions::builder()
        .item_count(10)
        .item_delay(Duration::from_millis(50))
        .build()?;

    let kinds = match std::env::args().nth(1) {
        Some(name) => vec![name.parse::<StrategyKind>()?],
        None => StrategyKind::ALL.to_vec(),
    };

    for kind in kinds {
        run(kind, &options).await;
    }

    Ok(())
}

async fn run(kind: StrategyKind, options: &StampedeOptions) {
    println!("\n== {kind}: {CALLERS} concurrent callers ==");
    let strategy = Arc::new(Strategy::new(kind, options));
    let start = tokio::time::Instant::now();

    let handles: Vec<_> = (1..=CALLERS)
        .map(|caller| {
            let strategy = Arc::clone(&strategy);
            tokio::spawn(async move {
                let outcome = strategy.acquire_within(DEFAULT_KEY, CALLER_TIMEOUT).await;
                (caller, outcome)
            })
        })
        .collect();

    let mut batches = Vec::new();
    for handle in handles {
        let (caller, outcome) = handle.await.expect("caller task panicked");
        match outcome {
            Ok(batch) => {
                println!("  caller {caller}: {} items after {:?}", batch.len(), start.elapsed());
                batches.push(batch);
            }
            Err(error) => println!("  caller {caller}: {error}"),
        }
    }

    let distinct = batches
        .iter()
        .enumerate()
        .filter(|(i, batch)| !batches[..*i].iter().any(|earlier| earlier.same_batch(batch)))
        .count();
    println!("  {distinct} distinct batch(es) in {:?}", start.elapsed());

    strategy.shutdown();
}
