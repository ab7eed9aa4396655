use std::sync::Arc;

use tokio::sync::mpsc::{Receiver, Sender};
use tokio::sync::Mutex;
use tokio::task::JoinSet;

use crate::error::Result;
use crate::pipeline::abort::AbortToken;
use crate::pipeline::envelope::Envelope;

/// Shape of every worker pool in one pipeline run: `width` concurrent workers
/// per stage, `capacity` envelopes buffered per inter-stage channel.
#[derive(Clone, Copy, Debug)]
pub struct Pool {
    pub width: usize,
    pub capacity: usize,
}

/// Run one stage's worker pool to completion.
///
/// Spawns `pool.width` identical workers sharing the input receiver. Each
/// worker loops read → apply → write until the input channel is drained and
/// closed, the run is aborted, or downstream goes away. The output channel
/// closes when the last worker drops its sender clone, so the next stage can
/// only ever observe a fully terminated queue. The `JoinSet` is the completion
/// barrier; a worker that panicked inside `apply` surfaces as `Error::Join`.
pub(crate) async fn run<I, O, A>(
    stage: &'static str,
    input: Receiver<Envelope<I>>,
    output: Sender<Envelope<O>>,
    pool: Pool,
    abort: AbortToken,
    apply: A,
) -> Result<()>
where
    I: Send + 'static,
    O: Send + 'static,
    A: Fn(Envelope<I>) -> Envelope<O> + Clone + Send + Sync + 'static,
{
    debug_assert!(pool.width >= 1);

    let input = Arc::new(Mutex::new(input));
    let mut workers = JoinSet::new();

    for worker in 0..pool.width {
        let input = input.clone();
        let output = output.clone();
        let abort = abort.clone();
        let apply = apply.clone();
        workers.spawn(worker_loop(stage, worker, input, output, abort, apply));
    }

    // Workers now hold the only senders; the channel closes once the last one
    // exits, never while a write is still pending.
    drop(output);

    while let Some(joined) = workers.join_next().await {
        joined?;
    }
    Ok(())
}

async fn worker_loop<I, O, A>(
    stage: &'static str,
    worker: usize,
    input: Arc<Mutex<Receiver<Envelope<I>>>>,
    output: Sender<Envelope<O>>,
    abort: AbortToken,
    apply: A,
) where
    I: Send + 'static,
    O: Send + 'static,
    A: Fn(Envelope<I>) -> Envelope<O>,
{
    #[cfg(not(feature = "tracing"))]
    let _ = (stage, worker);

    loop {
        // The receiver lock is held only while pulling, so another worker can
        // wait for the next item while this one is still transforming or
        // blocked on a full output channel.
        let pull = async { input.lock().await.recv().await };
        let env = tokio::select! {
            _ = abort.aborted() => break,
            env = pull => match env {
                Some(env) => env,
                None => break,
            },
        };

        let env = apply(env);

        tokio::select! {
            _ = abort.aborted() => break,
            sent = output.send(env) => {
                if sent.is_err() {
                    #[cfg(feature = "tracing")]
                    tracing::event!(
                        tracing::Level::DEBUG,
                        event = "fanline.downstream.closed",
                        stage = stage,
                        worker = worker,
                        "fanline.downstream.closed"
                    );
                    break;
                }
            }
        }
    }

    #[cfg(feature = "tracing")]
    tracing::event!(
        tracing::Level::TRACE,
        event = "fanline.worker.exit",
        stage = stage,
        worker = worker,
        "fanline.worker.exit"
    );
}
