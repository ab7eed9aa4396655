/// A payload plus its original input position, as it travels through a
/// pipeline.
///
/// `index` is stamped once by the feeder on the ordered (slice) path and is
/// `None` on the channel path. Stages rewrite the payload; the stamp is never
/// touched, so it stays a valid lookup key for final reassembly no matter how
/// the worker pools reorder items in between.
///
/// Fallible pipelines carry `Result<T, Error>` as the payload. An `Err`
/// payload passes through later stages via [`Result::and_then`], which both
/// skips the action and guarantees the first error is never overwritten.
#[derive(Debug)]
pub struct Envelope<P> {
    pub index: Option<usize>,
    pub payload: P,
}

impl<P> Envelope<P> {
    pub fn new(index: Option<usize>, payload: P) -> Self {
        Self { index, payload }
    }

    /// Rewrite the payload, keeping the position stamp.
    pub fn map<Q>(self, f: impl FnOnce(P) -> Q) -> Envelope<Q> {
        Envelope {
            index: self.index,
            payload: f(self.payload),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_keeps_the_stamp() {
        let env = Envelope::new(Some(7), 21u32);
        let out = env.map(|v| v * 2);
        assert_eq!(out.index, Some(7));
        assert_eq!(out.payload, 42);
    }

    #[test]
    fn map_over_err_payload_skips_the_action() {
        let env: Envelope<crate::error::Result<u32>> =
            Envelope::new(None, Err(crate::error::Error::action("boom")));
        let out = env.map(|p| {
            p.and_then(|_| -> crate::error::Result<u32> { panic!("must not run") })
        });
        assert!(out.payload.is_err());
    }
}
