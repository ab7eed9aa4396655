use tokio::sync::mpsc::{self, Receiver};
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::pipeline::abort::AbortToken;
use crate::pipeline::envelope::Envelope;
use crate::pipeline::flow::Flow;
use crate::pipeline::pool::Pool;

const DEFAULT_CAPACITY: usize = 128;

/// The transformation engine.
///
/// A transformer is configured once with the number of concurrent workers
/// every stage gets, then reused across calls; it is generic per call, so one
/// transformer can serve differently-typed pipelines.
///
/// The ordered APIs ([`transform`](Self::transform),
/// [`try_transform`](Self::try_transform)) stamp each item with its input
/// position and reassemble the output in that order no matter how workers
/// race. The channel APIs ([`transform_channel`](Self::transform_channel),
/// [`try_transform_channel`](Self::try_transform_channel)) make no ordering
/// guarantee.
#[derive(Debug)]
pub struct Transformer {
    workers: usize,
    capacity: usize,
}

impl Transformer {
    /// Configure a transformer with `workers` concurrent workers per stage.
    ///
    /// Fails with [`Error::Config`] when `workers` is zero.
    pub fn new(workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(Error::config("worker count must be at least 1"));
        }
        Ok(Self {
            workers,
            capacity: DEFAULT_CAPACITY,
        })
    }

    /// Inter-stage channel capacity (default 128, clamped to at least 1).
    ///
    /// Capacity is deliberately independent of input length: a pipeline over a
    /// large slice keeps at most `capacity` envelopes buffered per queue, and
    /// a slow stage backs up its upstream instead of holding the whole input
    /// in flight.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    fn pool(&self) -> Pool {
        Pool {
            width: self.workers,
            capacity: self.capacity,
        }
    }

    /// Apply `flow` to every item concurrently, preserving input order.
    ///
    /// Actions cannot signal failure at the type level; if one panics, the
    /// panic is propagated out of this call.
    pub async fn transform<I, O, F>(&self, items: Vec<I>, flow: F) -> Vec<O>
    where
        I: Send + 'static,
        O: Send + 'static,
        F: Flow<I, O> + 'static,
    {
        let total = items.len();
        let abort = AbortToken::default();
        let (run, mut exit) = self.launch(items, |item| item, flow, &abort);

        let mut slots: Vec<Option<O>> = std::iter::repeat_with(|| None).take(total).collect();
        while let Some(env) = exit.recv().await {
            let index = env.index.expect("ordered pipelines stamp every envelope");
            slots[index] = Some(env.payload);
        }

        if let Err(err) = run.join().await {
            panic!("transform pipeline failed: {err}");
        }

        slots
            .into_iter()
            .map(|slot| slot.expect("every input position yields exactly one output"))
            .collect()
    }

    /// Apply `flow` to every item concurrently, preserving input order and
    /// stopping at the first action failure.
    ///
    /// All-or-nothing: on failure no partial output is returned, the feeder
    /// and every worker pool are aborted, and their tasks are reaped before
    /// the error surfaces. When several items fail concurrently, the error
    /// that arrives at the collector first wins; which one that is, is a race.
    pub async fn try_transform<I, O, F>(&self, items: Vec<I>, flow: F) -> Result<Vec<O>>
    where
        I: Send + 'static,
        O: Send + 'static,
        F: Flow<Result<I>, Result<O>> + 'static,
    {
        let total = items.len();
        let abort = AbortToken::default();
        let (run, mut exit) = self.launch(items, Ok, flow, &abort);

        let mut slots: Vec<Option<O>> = std::iter::repeat_with(|| None).take(total).collect();
        while let Some(env) = exit.recv().await {
            let index = env.index.expect("ordered pipelines stamp every envelope");
            match env.payload {
                Ok(value) => slots[index] = Some(value),
                Err(err) => {
                    #[cfg(feature = "tracing")]
                    tracing::event!(
                        tracing::Level::WARN,
                        event = "fanline.error.short_circuit",
                        index = index,
                        error = %err,
                        "fanline.error.short_circuit"
                    );
                    abort.abort();
                    drop(exit);
                    run.discard().await;
                    return Err(err);
                }
            }
        }

        run.join().await?;

        Ok(slots
            .into_iter()
            .map(|slot| slot.expect("every input position yields exactly one output"))
            .collect())
    }

    /// Apply `flow` to every item read from `items`, concurrently and without
    /// any ordering guarantee.
    ///
    /// The returned channel closes once the source is exhausted and every
    /// in-flight item has been delivered. Dropping the receiver aborts the
    /// remaining upstream work.
    pub fn transform_channel<I, O, F>(&self, items: Receiver<I>, flow: F) -> Receiver<O>
    where
        I: Send + 'static,
        O: Send + 'static,
        F: Flow<I, O> + 'static,
    {
        let abort = AbortToken::default();
        let (out_tx, out_rx) = mpsc::channel::<O>(self.capacity);
        let mut exit = self.launch_stream(items, |item| item, flow, &abort);

        tokio::spawn(async move {
            while let Some(env) = exit.recv().await {
                if out_tx.send(env.payload).await.is_err() {
                    abort.abort();
                    break;
                }
            }
        });

        out_rx
    }

    /// Apply `flow` to every item read from `items`, concurrently, without
    /// any ordering guarantee, and stopping at the first action failure.
    ///
    /// Weaker than all-or-nothing: items successfully transformed before the
    /// failure is observed are still delivered on the output channel. The
    /// error channel has capacity one and receives at most the first error;
    /// both channels close once the source is exhausted or the run was cut
    /// short.
    pub fn try_transform_channel<I, O, F>(
        &self,
        items: Receiver<I>,
        flow: F,
    ) -> (Receiver<O>, Receiver<Error>)
    where
        I: Send + 'static,
        O: Send + 'static,
        F: Flow<Result<I>, Result<O>> + 'static,
    {
        let abort = AbortToken::default();
        let (out_tx, out_rx) = mpsc::channel::<O>(self.capacity);
        let (err_tx, err_rx) = mpsc::channel::<Error>(1);
        let mut exit = self.launch_stream(items, Ok, flow, &abort);

        tokio::spawn(async move {
            while let Some(env) = exit.recv().await {
                match env.payload {
                    Ok(value) => {
                        if out_tx.send(value).await.is_err() {
                            abort.abort();
                            break;
                        }
                    }
                    Err(err) => {
                        #[cfg(feature = "tracing")]
                        tracing::event!(
                            tracing::Level::WARN,
                            event = "fanline.error.short_circuit",
                            error = %err,
                            "fanline.error.short_circuit"
                        );
                        // Capacity one and first send: this never blocks.
                        let _ = err_tx.send(err).await;
                        abort.abort();
                        break;
                    }
                }
            }
            // Both channels close here, whether the source drained or the
            // run was cut short.
        });

        (out_rx, err_rx)
    }

    /// Wire feeder → flow → exit for a bounded input.
    fn launch<I, P, O, F, W>(
        &self,
        items: Vec<I>,
        wrap: W,
        flow: F,
        abort: &AbortToken,
    ) -> (Run, Receiver<Envelope<O>>)
    where
        I: Send + 'static,
        P: Send + 'static,
        O: Send + 'static,
        F: Flow<P, O> + 'static,
        W: Fn(I) -> P + Send + 'static,
    {
        let pool = self.pool();
        let (entry_tx, entry_rx) = mpsc::channel::<Envelope<P>>(pool.capacity);
        let (exit_tx, exit_rx) = mpsc::channel::<Envelope<O>>(pool.capacity);

        let feeder = {
            let abort = abort.clone();
            tokio::spawn(async move {
                for (index, item) in items.into_iter().enumerate() {
                    let env = Envelope::new(Some(index), wrap(item));
                    tokio::select! {
                        _ = abort.aborted() => break,
                        sent = entry_tx.send(env) => {
                            if sent.is_err() {
                                break;
                            }
                        }
                    }
                }
            })
        };

        let runner = spawn_flow(flow, entry_rx, exit_tx, pool, abort.clone());

        (Run { feeder, runner }, exit_rx)
    }

    /// Wire feeder → flow → exit for a channel input. The tasks are detached;
    /// the abort token is their only tether.
    fn launch_stream<I, P, O, F, W>(
        &self,
        mut items: Receiver<I>,
        wrap: W,
        flow: F,
        abort: &AbortToken,
    ) -> Receiver<Envelope<O>>
    where
        I: Send + 'static,
        P: Send + 'static,
        O: Send + 'static,
        F: Flow<P, O> + 'static,
        W: Fn(I) -> P + Send + 'static,
    {
        let pool = self.pool();
        let (entry_tx, entry_rx) = mpsc::channel::<Envelope<P>>(pool.capacity);
        let (exit_tx, exit_rx) = mpsc::channel::<Envelope<O>>(pool.capacity);

        {
            let abort = abort.clone();
            tokio::spawn(async move {
                loop {
                    let item = tokio::select! {
                        _ = abort.aborted() => break,
                        item = items.recv() => match item {
                            Some(item) => item,
                            None => break,
                        },
                    };
                    let env = Envelope::new(None, wrap(item));
                    tokio::select! {
                        _ = abort.aborted() => break,
                        sent = entry_tx.send(env) => {
                            if sent.is_err() {
                                break;
                            }
                        }
                    }
                }
            });
        }

        spawn_flow(flow, entry_rx, exit_tx, pool, abort.clone());

        exit_rx
    }
}

/// Feeder and flow tasks for one ordered run.
struct Run {
    feeder: JoinHandle<()>,
    runner: JoinHandle<Result<()>>,
}

impl Run {
    /// Reap both tasks, surfacing flow failures (worker panics).
    async fn join(self) -> Result<()> {
        self.feeder.await?;
        self.runner.await??;
        Ok(())
    }

    /// Reap both tasks on the error path; the first error already observed is
    /// authoritative, so secondary failures are dropped.
    async fn discard(self) {
        let _ = self.feeder.await;
        let _ = self.runner.await;
    }
}

fn spawn_flow<P, O, F>(
    flow: F,
    entry: Receiver<Envelope<P>>,
    exit: mpsc::Sender<Envelope<O>>,
    pool: Pool,
    abort: AbortToken,
) -> JoinHandle<Result<()>>
where
    P: Send + 'static,
    O: Send + 'static,
    F: Flow<P, O> + 'static,
{
    #[cfg(feature = "tracing")]
    let handle = {
        use tracing::Instrument;
        let span = tracing::info_span!(
            "fanline.stage",
            stage = flow.label(),
            workers = pool.width,
            capacity = pool.capacity
        );
        tokio::spawn(async move { flow.process(entry, exit, pool, abort).await }.instrument(span))
    };

    #[cfg(not(feature = "tracing"))]
    let handle = tokio::spawn(async move { flow.process(entry, exit, pool, abort).await });

    handle
}
