use std::collections::BTreeSet;
use std::time::Duration;

use fanline::error::{Error, Result};
use fanline::prelude::*;
use tokio::sync::mpsc;

mod common;
use common::feed;

#[tokio::test]
async fn channel_output_matches_the_input_multiset() -> Result<()> {
    let transformer = Transformer::new(4)?;

    let mut out = transformer.transform_channel(feed((1u32..=9).collect()), stage(|x: u32| x * 2));

    let mut seen = BTreeSet::new();
    while let Some(value) = out.recv().await {
        assert!(seen.insert(value), "duplicate output {value}");
    }

    let expected: BTreeSet<u32> = (1..=9).map(|x| x * 2).collect();
    assert_eq!(seen, expected);
    Ok(())
}

#[tokio::test]
async fn channel_stages_compose() -> Result<()> {
    let transformer = Transformer::new(3)?;

    let mut out = transformer.transform_channel(
        feed((1u32..=9).collect()),
        stage(|x: u32| x * 2).map(|x| x + 1),
    );

    let mut seen = BTreeSet::new();
    while let Some(value) = out.recv().await {
        seen.insert(value);
    }

    let expected: BTreeSet<u32> = (1..=9).map(|x| x * 2 + 1).collect();
    assert_eq!(seen, expected);
    Ok(())
}

#[tokio::test]
async fn channel_errors_are_isolated() -> Result<()> {
    let transformer = Transformer::new(4)?;

    let (mut out, mut errors) = transformer.try_transform_channel(
        feed((1u32..=9).collect()),
        try_stage("gate", |x: u32| {
            if x % 5 == 0 {
                Err(Error::action(format!("{x} is divisible by 5")))
            } else {
                Ok(x * 2)
            }
        }),
    );

    let mut seen = BTreeSet::new();
    while let Some(value) = out.recv().await {
        seen.insert(value);
    }

    let err = errors.recv().await.expect("one error must be delivered");
    assert!(format!("{err}").contains("gate"));
    assert!(
        errors.recv().await.is_none(),
        "the error channel delivers at most one error"
    );

    // Everything delivered before the failure was observed is a doubled
    // non-multiple of 5; under fail-fast, items past the error may be cut.
    let allowed: BTreeSet<u32> = [2, 4, 6, 8, 12, 14, 16, 18].into_iter().collect();
    assert!(
        seen.is_subset(&allowed),
        "unexpected outputs: {seen:?}"
    );
    Ok(())
}

#[tokio::test]
async fn error_free_fallible_channel_delivers_everything() -> Result<()> {
    let transformer = Transformer::new(4)?;

    let (mut out, mut errors) = transformer
        .try_transform_channel(feed((1u32..=9).collect()), try_stage("double", |x: u32| Ok(x * 2)));

    let mut seen = BTreeSet::new();
    while let Some(value) = out.recv().await {
        seen.insert(value);
    }

    assert!(errors.recv().await.is_none(), "no error expected");

    let expected: BTreeSet<u32> = (1..=9).map(|x| x * 2).collect();
    assert_eq!(seen, expected);
    Ok(())
}

#[tokio::test]
async fn dropping_the_output_receiver_stops_the_source() -> Result<()> {
    let transformer = Transformer::new(2)?.capacity(2);

    let (tx, rx) = mpsc::channel::<u32>(2);
    let producer = tokio::spawn(async move {
        for x in 0..1_000_000u32 {
            if tx.send(x).await.is_err() {
                break;
            }
        }
    });

    let out = transformer.transform_channel(rx, stage(|x: u32| x * 2));
    drop(out);

    // Once the forwarder notices the dropped receiver it aborts the run, the
    // feeder drops its end of the source channel, and the producer unblocks.
    tokio::time::timeout(Duration::from_secs(5), producer)
        .await
        .expect("producer must stop after the output is dropped")
        .expect("producer task must not panic");
    Ok(())
}
