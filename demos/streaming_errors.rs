//! Streaming pipeline with fail-fast error isolation.
//!
//! Run with: `cargo run --example streaming_errors`

use fanline::error::{Error, Result};
use fanline::prelude::*;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter("fanline=debug")
        .init();

    let transformer = Transformer::new(4)?.capacity(8);

    let (tx, rx) = mpsc::channel(8);
    tokio::spawn(async move {
        for x in 1u32..=20 {
            if tx.send(x).await.is_err() {
                break;
            }
        }
    });

    let (mut out, mut errors) = transformer.try_transform_channel(
        rx,
        try_stage("gate", |x: u32| {
            if x % 13 == 0 {
                Err(Error::action(format!("{x} is unlucky")))
            } else {
                Ok(x * 2)
            }
        }),
    );

    while let Some(value) = out.recv().await {
        println!("ok: {value}");
    }
    if let Some(err) = errors.recv().await {
        println!("failed: {err}");
    }
    Ok(())
}
