//! The greeter service.
//!
//! Its slow methods do their waiting in bounded work units through
//! [`CallContext::work_unit`], so a deadline or a cancellation is observed
//! within one unit instead of after the whole sequence.

use crate::proto::{
    GREET, GREET_EVERYONE, GREET_MANY_TIMES, GREET_WITH_DEADLINE, GreetRequest, GreetResponse,
    Greeting, LONG_GREET,
};
use callwire::{CallContext, RegistryBuilder, Status, StreamSender, Streaming};
use core::time::Duration;

/// Pacing of the greeter's slow methods.
#[derive(Debug, Clone, Copy)]
pub struct GreeterConfig {
    /// Pause between two `GreetManyTimes` responses.
    pub pace: Duration,
    /// Length of one unit of simulated work in `GreetWithDeadline`.
    pub work_unit: Duration,
    /// Units of simulated work `GreetWithDeadline` performs before replying.
    pub work_units: u32,
    /// Responses sent by `GreetManyTimes`.
    pub stream_count: u32,
}

impl GreeterConfig {
    pub const DEFAULT_PACE: Duration = Duration::from_secs(1);
    pub const DEFAULT_WORK_UNIT: Duration = Duration::from_secs(1);
    pub const DEFAULT_WORK_UNITS: u32 = 3;
    pub const DEFAULT_STREAM_COUNT: u32 = 10;
}

impl Default for GreeterConfig {
    fn default() -> Self {
        Self {
            pace: Self::DEFAULT_PACE,
            work_unit: Self::DEFAULT_WORK_UNIT,
            work_units: Self::DEFAULT_WORK_UNITS,
            stream_count: Self::DEFAULT_STREAM_COUNT,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Greeter {
    config: GreeterConfig,
}

impl Greeter {
    pub const fn new(config: GreeterConfig) -> Self {
        Self { config }
    }

    /// Registers every greeter method.
    ///
    /// # Errors
    ///
    /// Returns an error if any greeter method is already registered.
    pub fn register(self, builder: &mut RegistryBuilder) -> callwire::Result<()> {
        let config = self.config;
        builder
            .unary(GREET, greet)?
            .unary(GREET_WITH_DEADLINE, move |req: GreetRequest, ctx: CallContext| {
                greet_with_deadline(config, req, ctx)
            })?
            .server_streaming(
                GREET_MANY_TIMES,
                move |req: GreetRequest, tx: StreamSender<GreetResponse>, ctx: CallContext| {
                    greet_many_times(config, req, tx, ctx)
                },
            )?
            .client_streaming(LONG_GREET, long_greet)?
            .bidi_streaming(GREET_EVERYONE, greet_everyone)?;
        Ok(())
    }
}

fn greeting(req: GreetRequest) -> Result<Greeting, Status> {
    req.greeting
        .ok_or_else(|| Status::invalid_argument("greeting is required"))
}

fn hello(greeting: &Greeting) -> String {
    format!("Hello {} {}", greeting.first_name, greeting.last_name)
}

async fn greet(req: GreetRequest, _ctx: CallContext) -> Result<GreetResponse, Status> {
    let greeting = greeting(req)?;

    #[cfg(feature = "tracing")]
    tracing::info!(first_name = %greeting.first_name, "Greeting");

    Ok(GreetResponse {
        result: hello(&greeting),
    })
}

async fn greet_with_deadline(
    config: GreeterConfig,
    req: GreetRequest,
    ctx: CallContext,
) -> Result<GreetResponse, Status> {
    let greeting = greeting(req)?;

    #[cfg(feature = "tracing")]
    tracing::info!(
        first_name = %greeting.first_name,
        remaining = ?ctx.time_remaining(),
        "Greeting after simulated work"
    );

    for _ in 0..config.work_units {
        ctx.work_unit(config.work_unit).await?;
    }
    Ok(GreetResponse {
        result: hello(&greeting),
    })
}

async fn greet_many_times(
    config: GreeterConfig,
    req: GreetRequest,
    tx: StreamSender<GreetResponse>,
    ctx: CallContext,
) -> Result<(), Status> {
    let greeting = greeting(req)?;
    let prefix = hello(&greeting);

    for i in 0..config.stream_count {
        if i > 0 {
            ctx.work_unit(config.pace).await?;
        }
        tx.send(GreetResponse {
            result: format!("{prefix}. {i}"),
        })
        .await?;
    }
    Ok(())
}

async fn long_greet(
    mut rx: Streaming<GreetRequest>,
    _ctx: CallContext,
) -> Result<GreetResponse, Status> {
    let mut result = String::new();
    while let Some(req) = rx.message().await? {
        result.push_str(&greeting(req)?.first_name);
    }
    Ok(GreetResponse { result })
}

async fn greet_everyone(
    mut rx: Streaming<GreetRequest>,
    tx: StreamSender<GreetResponse>,
    _ctx: CallContext,
) -> Result<(), Status> {
    while let Some(req) = rx.message().await? {
        let greeting = greeting(req)?;
        tx.send(GreetResponse {
            result: format!("Hello! {}!", greeting.first_name),
        })
        .await?;
    }
    Ok(())
}
