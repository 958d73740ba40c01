//! The calculator service.
//!
//! One method per call pattern, plus a second unary method carrying the only
//! business rule with a status contract: the square root of a negative number
//! is rejected with `InvalidArgument` naming the offending value.
//!
//! The arithmetic lives in small pure helpers ([`PrimeFactors`],
//! [`MaxTracker`], [`Mean`], [`square_root`]) so it can be tested without a
//! call around it.

use crate::proto::{
    CALCULATE_AVERAGE, CALCULATE_SUM, CalculateAverageRequest, CalculateAverageResponse,
    CalculateSumRequest, CalculateSumResponse, FIND_MAX, FindMaxRequest, FindMaxResponse,
    PRIME_DECOMPOSE, PrimeDecomposeRequest, PrimeDecomposeResponse, SQUARE_ROOT,
    SquareRootRequest, SquareRootResponse,
};
use callwire::{CallContext, RegistryBuilder, Status, StreamSender, Streaming};

/// Candidate divisors tried by one [`PrimeFactors::step`] before yielding
/// control back to the caller.
const TRIALS_PER_STEP: u32 = 1 << 14;

/// Stateless calculator handlers.
#[derive(Debug, Clone, Copy, Default)]
pub struct Calculator;

impl Calculator {
    /// Registers every calculator method.
    ///
    /// # Errors
    ///
    /// Returns an error if any calculator method is already registered.
    pub fn register(self, builder: &mut RegistryBuilder) -> callwire::Result<()> {
        builder
            .unary(CALCULATE_SUM, Self::calculate_sum)?
            .server_streaming(PRIME_DECOMPOSE, Self::prime_decompose)?
            .client_streaming(CALCULATE_AVERAGE, Self::calculate_average)?
            .bidi_streaming(FIND_MAX, Self::find_max)?
            .unary(SQUARE_ROOT, Self::square_root)?;
        Ok(())
    }

    async fn calculate_sum(
        req: CalculateSumRequest,
        _ctx: CallContext,
    ) -> Result<CalculateSumResponse, Status> {
        #[cfg(feature = "tracing")]
        tracing::info!(x = req.x, y = req.y, "Calculating sum");

        let result = req.x.checked_add(req.y).ok_or_else(|| {
            Status::invalid_argument(format!("Sum of {} and {} overflows", req.x, req.y))
        })?;
        Ok(CalculateSumResponse { result })
    }

    async fn prime_decompose(
        req: PrimeDecomposeRequest,
        tx: StreamSender<PrimeDecomposeResponse>,
        ctx: CallContext,
    ) -> Result<(), Status> {
        #[cfg(feature = "tracing")]
        tracing::info!(number = req.number, "Decomposing into primes");

        let mut factors = PrimeFactors::new(req.number)?;
        loop {
            match factors.step() {
                Step::Factor(number) => tx.send(PrimeDecomposeResponse { number }).await?,
                Step::Pending => {
                    ctx.check()?;
                    tokio::task::yield_now().await;
                }
                Step::Done => return Ok(()),
            }
        }
    }

    async fn calculate_average(
        mut rx: Streaming<CalculateAverageRequest>,
        _ctx: CallContext,
    ) -> Result<CalculateAverageResponse, Status> {
        let mut mean = Mean::default();
        while let Some(req) = rx.message().await? {
            mean.push(req.number);
        }

        #[cfg(feature = "tracing")]
        tracing::info!(count = mean.count(), "Averaging received numbers");

        let average = mean
            .value()
            .ok_or_else(|| Status::invalid_argument("no numbers received"))?;
        Ok(CalculateAverageResponse { average })
    }

    async fn find_max(
        mut rx: Streaming<FindMaxRequest>,
        tx: StreamSender<FindMaxResponse>,
        _ctx: CallContext,
    ) -> Result<(), Status> {
        let mut tracker = MaxTracker::default();
        while let Some(req) = rx.message().await? {
            if let Some(number) = tracker.observe(req.number) {
                tx.send(FindMaxResponse { number }).await?;
            }
        }
        Ok(())
    }

    async fn square_root(
        req: SquareRootRequest,
        _ctx: CallContext,
    ) -> Result<SquareRootResponse, Status> {
        Ok(SquareRootResponse {
            result: square_root(req.number)?,
        })
    }
}

/// Square root of a non-negative integer.
///
/// # Errors
///
/// Returns `InvalidArgument` naming `number` when it is negative.
pub fn square_root(number: i32) -> Result<f64, Status> {
    if number < 0 {
        return Err(Status::invalid_argument(format!(
            "Received negative number {number}"
        )));
    }
    Ok(f64::from(number).sqrt())
}

/// Outcome of one bounded slice of factorisation work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The next prime factor.
    Factor(i64),
    /// No factor found yet; call [`PrimeFactors::step`] again.
    Pending,
    /// The remainder reached one.
    Done,
}

/// Trial-division factorisation, producing factors in nondecreasing order.
///
/// The candidate divisor only advances when it fails to divide the
/// remainder. Once the candidate's square exceeds the remainder, the
/// remainder itself is the last factor.
#[derive(Debug, Clone)]
pub struct PrimeFactors {
    remainder: u64,
    divisor: u64,
}

impl PrimeFactors {
    /// # Errors
    ///
    /// Returns `InvalidArgument` for `number <= 0`, which has no prime
    /// factorisation.
    pub fn new(number: i64) -> Result<Self, Status> {
        let remainder = u64::try_from(number)
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| {
                Status::invalid_argument(format!("Cannot decompose non-positive number {number}"))
            })?;
        Ok(Self {
            remainder,
            divisor: 2,
        })
    }

    /// Tries at most a bounded number of candidate divisors.
    pub fn step(&mut self) -> Step {
        for _ in 0..TRIALS_PER_STEP {
            if self.remainder == 1 {
                return Step::Done;
            }

            let beyond_root = self
                .divisor
                .checked_mul(self.divisor)
                .is_none_or(|square| square > self.remainder);
            if beyond_root {
                let last = self.remainder;
                self.remainder = 1;
                return Step::Factor(to_i64(last));
            }

            if self.remainder % self.divisor == 0 {
                self.remainder /= self.divisor;
                return Step::Factor(to_i64(self.divisor));
            }
            self.divisor += if self.divisor == 2 { 1 } else { 2 };
        }
        Step::Pending
    }
}

/// Factors are bounded by the positive `i64` input.
fn to_i64(factor: u64) -> i64 {
    i64::try_from(factor).unwrap_or(i64::MAX)
}

impl Iterator for PrimeFactors {
    type Item = i64;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.step() {
                Step::Factor(factor) => return Some(factor),
                Step::Pending => {}
                Step::Done => return None,
            }
        }
    }
}

/// Tracks the running maximum of a sequence.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxTracker {
    max: Option<i64>,
}

impl MaxTracker {
    /// Returns the new maximum if `number` strictly exceeds every value seen
    /// so far. The first value is always a new maximum.
    pub fn observe(&mut self, number: i64) -> Option<i64> {
        match self.max {
            Some(max) if number <= max => None,
            _ => {
                self.max = Some(number);
                self.max
            }
        }
    }

    pub const fn max(&self) -> Option<i64> {
        self.max
    }
}

/// Running arithmetic mean.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mean {
    sum: f64,
    count: u64,
}

impl Mean {
    pub fn push(&mut self, number: f64) {
        self.sum += number;
        self.count += 1;
    }

    pub const fn count(&self) -> u64 {
        self.count
    }

    /// `None` until at least one number was pushed.
    #[allow(clippy::cast_precision_loss)]
    pub fn value(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}
