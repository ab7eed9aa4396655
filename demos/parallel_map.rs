//! Ordered parallel map over a bounded input.
//!
//! Run with: `cargo run --example parallel_map`

use fanline::error::Result;
use fanline::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let transformer = Transformer::new(4)?.capacity(16);

    let words = vec![
        "the".to_string(),
        "quick".to_string(),
        "brown".to_string(),
        "fox".to_string(),
    ];

    let out = transformer
        .transform(
            words,
            stage(|w: String| w.to_uppercase()).map(|w| format!("<{w}>")),
        )
        .await;

    // Workers race, the output does not: input order is preserved.
    for line in out {
        println!("{line}");
    }
    Ok(())
}
