use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::{self, Receiver, Sender};

use crate::error::{Error, Result};
use crate::pipeline::abort::AbortToken;
use crate::pipeline::envelope::Envelope;
use crate::pipeline::pool::{self, Pool};

/// A typed chain of transformation stages.
///
/// A flow consumes envelopes of `I` and produces envelopes of `O`; composing
/// two flows checks the intermediate type at compile time, so no payload is
/// ever type-erased or downcast at runtime. Implementations must forward each
/// envelope's position stamp untouched.
#[async_trait]
pub trait Flow<I: Send + 'static, O: Send + 'static>: Send + Sync {
    /// Diagnostic label used in instrumentation and error wrapping.
    fn label(&self) -> &'static str {
        "stage"
    }

    /// Drive this flow until `input` is drained and closed, the run is
    /// aborted, or downstream goes away.
    async fn process(
        &self,
        input: Receiver<Envelope<I>>,
        output: Sender<Envelope<O>>,
        pool: Pool,
        abort: AbortToken,
    ) -> Result<()>;
}

/// One infallible action and its worker pool: the action cannot signal
/// failure at the type level, which is what makes the no-error transformer
/// APIs safe to offer.
pub struct Stage<F> {
    action: Arc<F>,
}

impl<F> Stage<F> {
    pub fn new(action: F) -> Self {
        Self {
            action: Arc::new(action),
        }
    }
}

/// Build a single-stage flow from an infallible action.
pub fn stage<F>(action: F) -> Stage<F> {
    Stage::new(action)
}

#[async_trait]
impl<I, O, F> Flow<I, O> for Stage<F>
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(I) -> O + Send + Sync + 'static,
{
    fn label(&self) -> &'static str {
        "map"
    }

    async fn process(
        &self,
        input: Receiver<Envelope<I>>,
        output: Sender<Envelope<O>>,
        pool: Pool,
        abort: AbortToken,
    ) -> Result<()> {
        let action = self.action.clone();
        pool::run(self.label(), input, output, pool, abort, move |env| {
            env.map(|value| (*action)(value))
        })
        .await
    }
}

/// One fallible action, its worker pool, and a stage label for diagnostics.
///
/// An action failure is wrapped with the label and travels downstream in the
/// envelope payload; an envelope that already carries an error passes through
/// without the action being invoked, so the first error is never compounded
/// or overwritten.
pub struct TryStage<F> {
    stage: &'static str,
    action: Arc<F>,
}

impl<F> TryStage<F> {
    pub fn new(stage: &'static str, action: F) -> Self {
        Self {
            stage,
            action: Arc::new(action),
        }
    }
}

/// Build a single-stage flow from a fallible action.
pub fn try_stage<F>(stage: &'static str, action: F) -> TryStage<F> {
    TryStage::new(stage, action)
}

#[async_trait]
impl<I, O, F> Flow<Result<I>, Result<O>> for TryStage<F>
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(I) -> Result<O> + Send + Sync + 'static,
{
    fn label(&self) -> &'static str {
        self.stage
    }

    async fn process(
        &self,
        input: Receiver<Envelope<Result<I>>>,
        output: Sender<Envelope<Result<O>>>,
        pool: Pool,
        abort: AbortToken,
    ) -> Result<()> {
        let action = self.action.clone();
        let stage = self.stage;
        pool::run(stage, input, output, pool, abort, move |env| {
            env.map(|payload| {
                payload.and_then(|value| (*action)(value).map_err(|err| Error::stage(stage, err)))
            })
        })
        .await
    }
}

/// Two flows glued together, with the intermediate envelope type checked when
/// the chain is built.
pub struct Then<A, B, M> {
    head: A,
    tail: B,
    _mid: PhantomData<fn() -> M>,
}

impl<A, B, M> Then<A, B, M> {
    pub fn new(head: A, tail: B) -> Self {
        Self {
            head,
            tail,
            _mid: PhantomData,
        }
    }
}

#[async_trait]
impl<I, M, O, A, B> Flow<I, O> for Then<A, B, M>
where
    I: Send + 'static,
    M: Send + 'static,
    O: Send + 'static,
    A: Flow<I, M>,
    B: Flow<M, O>,
{
    async fn process(
        &self,
        input: Receiver<Envelope<I>>,
        output: Sender<Envelope<O>>,
        pool: Pool,
        abort: AbortToken,
    ) -> Result<()> {
        let (tx_mid, rx_mid) = mpsc::channel::<Envelope<M>>(pool.capacity);

        let (head, tail) = tokio::join!(
            self.head.process(input, tx_mid, pool, abort.clone()),
            self.tail.process(rx_mid, output, pool, abort),
        );
        head?;
        tail?;
        Ok(())
    }
}

/// The zero-stage flow: envelopes pass through unchanged, in arrival order,
/// without a worker pool.
pub struct Identity;

/// Build the zero-stage pass-through flow.
pub fn identity() -> Identity {
    Identity
}

#[async_trait]
impl<T: Send + 'static> Flow<T, T> for Identity {
    fn label(&self) -> &'static str {
        "identity"
    }

    async fn process(
        &self,
        mut input: Receiver<Envelope<T>>,
        output: Sender<Envelope<T>>,
        _pool: Pool,
        abort: AbortToken,
    ) -> Result<()> {
        loop {
            tokio::select! {
                _ = abort.aborted() => break,
                env = input.recv() => {
                    let Some(env) = env else { break; };
                    if output.send(env).await.is_err() {
                        break;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Chaining sugar available on every flow.
pub trait FlowExt<I, O>: Flow<I, O> + Sized
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Chain another flow after this one.
    fn then<N, P>(self, next: P) -> Then<Self, P, O>
    where
        N: Send + 'static,
        P: Flow<O, N>,
    {
        Then::new(self, next)
    }

    /// Append an infallible action.
    fn map<N, F>(self, action: F) -> Then<Self, Stage<F>, O>
    where
        N: Send + 'static,
        F: Fn(O) -> N + Send + Sync + 'static,
    {
        Then::new(self, Stage::new(action))
    }
}

impl<I, O, P> FlowExt<I, O> for P
where
    I: Send + 'static,
    O: Send + 'static,
    P: Flow<I, O> + Sized,
{
}

/// Chaining sugar available on fallible flows.
pub trait TryFlowExt<I, T>: Flow<I, Result<T>> + Sized
where
    I: Send + 'static,
    T: Send + 'static,
{
    /// Append a fallible action with a diagnostic stage label.
    fn try_map<N, F>(self, stage: &'static str, action: F) -> Then<Self, TryStage<F>, Result<T>>
    where
        N: Send + 'static,
        F: Fn(T) -> Result<N> + Send + Sync + 'static,
    {
        Then::new(self, TryStage::new(stage, action))
    }
}

impl<I, T, P> TryFlowExt<I, T> for P
where
    I: Send + 'static,
    T: Send + 'static,
    P: Flow<I, Result<T>> + Sized,
{
}
