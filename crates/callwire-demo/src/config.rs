use anyhow::bail;
use callwire_services::{GreeterConfig, callwire::EngineConfig};
use clap::{Parser, ValueEnum};
use core::time::Duration;

/// Demo scenarios, one per client flow of the demo services.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// Run every scenario below in order.
    All,
    Sum,
    Primes,
    Average,
    Max,
    Sqrt,
    Greet,
    GreetMany,
    LongGreet,
    GreetEveryone,
    GreetDeadline,
}

impl Scenario {
    /// Every concrete scenario, in the order `all` runs them.
    pub const SEQUENCE: [Self; 10] = [
        Self::Sum,
        Self::Primes,
        Self::Average,
        Self::Max,
        Self::Sqrt,
        Self::Greet,
        Self::GreetMany,
        Self::LongGreet,
        Self::GreetEveryone,
        Self::GreetDeadline,
    ];

    pub fn expand(self) -> Vec<Self> {
        match self {
            Self::All => Self::SEQUENCE.to_vec(),
            other => vec![other],
        }
    }
}

/// Runtime configuration for the `callwire-demo` binary.
///
/// Every flag can also be supplied as an environment variable, including
/// through a `.env` file in the working directory.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "callwire-demo",
    version,
    about = "Runs the calculator and greeter services over an in-process callwire connection"
)]
pub struct CliArgs {
    /// Scenario to run.
    ///
    /// Environment variable: `SCENARIO`
    #[arg(long, env = "SCENARIO", value_enum, default_value_t = Scenario::All)]
    pub scenario: Scenario,

    /// Messages buffered per call direction before `send` waits.
    ///
    /// Environment variable: `CHANNEL_CAPACITY`
    #[arg(
        long,
        env = "CHANNEL_CAPACITY",
        default_value_t = EngineConfig::DEFAULT_CHANNEL_CAPACITY
    )]
    pub channel_capacity: usize,

    /// Timeout in milliseconds for calls made without an explicit one. Unset
    /// leaves such calls unbounded.
    ///
    /// Environment variable: `DEFAULT_TIMEOUT_MS`
    #[arg(long, env = "DEFAULT_TIMEOUT_MS")]
    pub default_timeout_ms: Option<u64>,

    /// Seconds in-flight calls get to finish on shutdown before they are
    /// cancelled.
    ///
    /// Environment variable: `SHUTDOWN_GRACE_SECS`
    #[arg(long, env = "SHUTDOWN_GRACE_SECS", default_value_t = 3)]
    pub shutdown_grace_secs: u64,

    /// Pause between two `GreetManyTimes` responses, in milliseconds.
    ///
    /// Environment variable: `GREET_PACE_MS`
    #[arg(long, env = "GREET_PACE_MS", default_value_t = 1000)]
    pub greet_pace_ms: u64,

    /// Responses sent by `GreetManyTimes`.
    ///
    /// Environment variable: `GREET_COUNT`
    #[arg(long, env = "GREET_COUNT", default_value_t = GreeterConfig::DEFAULT_STREAM_COUNT)]
    pub greet_count: u32,

    /// Length of one unit of simulated work in `GreetWithDeadline`, in
    /// milliseconds.
    ///
    /// Environment variable: `WORK_UNIT_MS`
    #[arg(long, env = "WORK_UNIT_MS", default_value_t = 1000)]
    pub work_unit_ms: u64,

    /// Units of simulated work in `GreetWithDeadline`.
    ///
    /// Environment variable: `WORK_UNITS`
    #[arg(long, env = "WORK_UNITS", default_value_t = GreeterConfig::DEFAULT_WORK_UNITS)]
    pub work_units: u32,

    /// Operands of the sum scenario.
    ///
    /// Environment variable: `SUM_OPERANDS`
    #[arg(
        long,
        env = "SUM_OPERANDS",
        value_delimiter = ',',
        allow_hyphen_values = true,
        default_values_t = [21, 11]
    )]
    pub sum_operands: Vec<i64>,

    /// Number decomposed by the primes scenario.
    ///
    /// Environment variable: `PRIME_NUMBER`
    #[arg(
        long,
        env = "PRIME_NUMBER",
        allow_hyphen_values = true,
        default_value_t = 465_723
    )]
    pub prime_number: i64,

    /// How many numbers the average scenario streams.
    ///
    /// Environment variable: `AVERAGE_COUNT`
    #[arg(long, env = "AVERAGE_COUNT", default_value_t = 115)]
    pub average_count: u32,

    /// Numbers streamed by the max scenario.
    ///
    /// Environment variable: `MAX_NUMBERS`
    #[arg(
        long,
        env = "MAX_NUMBERS",
        value_delimiter = ',',
        allow_hyphen_values = true,
        default_values_t = [
            12, -2, 1233, 1, 7, -86, 346, 92, 477, 485_644, 67_564_468, 576, 213_446
        ]
    )]
    pub max_numbers: Vec<i64>,

    /// Numbers sent to the square root scenario, one call each.
    ///
    /// Environment variable: `SQRT_NUMBERS`
    #[arg(
        long,
        env = "SQRT_NUMBERS",
        value_delimiter = ',',
        allow_hyphen_values = true,
        default_values_t = [225, -12]
    )]
    pub sqrt_numbers: Vec<i32>,

    /// First name used by the greeter scenarios.
    ///
    /// Environment variable: `FIRST_NAME`
    #[arg(long, env = "FIRST_NAME", default_value_t = String::from("Ada"))]
    pub first_name: String,

    /// Last name used by the greeter scenarios.
    ///
    /// Environment variable: `LAST_NAME`
    #[arg(long, env = "LAST_NAME", default_value_t = String::from("Lovelace"))]
    pub last_name: String,

    /// Timeouts for the deadline scenario, in milliseconds, one call each.
    ///
    /// Environment variable: `DEADLINE_TIMEOUTS_MS`
    #[arg(
        long,
        env = "DEADLINE_TIMEOUTS_MS",
        value_delimiter = ',',
        default_values_t = [5000, 1000]
    )]
    pub deadline_timeouts_ms: Vec<u64>,
}

/// Inputs of the demo scenarios.
#[derive(Debug, Clone)]
pub struct ScenarioInputs {
    pub sum: (i64, i64),
    pub prime_number: i64,
    pub average_count: u32,
    pub max_numbers: Vec<i64>,
    pub sqrt_numbers: Vec<i32>,
    pub first_name: String,
    pub last_name: String,
    pub deadline_timeouts: Vec<Duration>,
}

#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub scenario: Scenario,
    pub engine: EngineConfig,
    pub greeter: GreeterConfig,
    pub inputs: ScenarioInputs,
}

impl TryFrom<CliArgs> for DemoConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.channel_capacity == 0 {
            bail!("CHANNEL_CAPACITY must be greater than 0");
        }

        if args.default_timeout_ms == Some(0) {
            bail!("DEFAULT_TIMEOUT_MS must be greater than 0 when set");
        }

        if args.greet_count == 0 {
            bail!("GREET_COUNT must be greater than 0");
        }

        let [x, y] = args.sum_operands[..] else {
            bail!(
                "SUM_OPERANDS takes exactly two numbers, got {}",
                args.sum_operands.len()
            );
        };

        if args.deadline_timeouts_ms.contains(&0) {
            bail!("DEADLINE_TIMEOUTS_MS entries must be greater than 0");
        }

        let engine = EngineConfig {
            channel_capacity: args.channel_capacity,
            default_timeout: args.default_timeout_ms.map(Duration::from_millis),
            shutdown_grace: Duration::from_secs(args.shutdown_grace_secs),
            ..EngineConfig::default()
        };

        let greeter = GreeterConfig {
            pace: Duration::from_millis(args.greet_pace_ms),
            work_unit: Duration::from_millis(args.work_unit_ms),
            work_units: args.work_units,
            stream_count: args.greet_count,
        };

        let inputs = ScenarioInputs {
            sum: (x, y),
            prime_number: args.prime_number,
            average_count: args.average_count,
            max_numbers: args.max_numbers,
            sqrt_numbers: args.sqrt_numbers,
            first_name: args.first_name,
            last_name: args.last_name,
            deadline_timeouts: args
                .deadline_timeouts_ms
                .into_iter()
                .map(Duration::from_millis)
                .collect(),
        };

        Ok(Self {
            scenario: args.scenario,
            engine,
            greeter,
            inputs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<DemoConfig> {
        let args =
            CliArgs::try_parse_from(core::iter::once("callwire-demo").chain(args.iter().copied()))?;
        DemoConfig::try_from(args)
    }

    #[test]
    fn defaults_mirror_the_reference_inputs() {
        let config = parse(&[]).unwrap();
        assert_eq!(config.scenario, Scenario::All);
        assert_eq!(config.inputs.sum, (21, 11));
        assert_eq!(config.inputs.prime_number, 465_723);
        assert_eq!(config.inputs.sqrt_numbers, vec![225, -12]);
        assert_eq!(config.inputs.max_numbers.len(), 13);
        assert_eq!(config.greeter.stream_count, 10);
        assert_eq!(config.engine.default_timeout, None);
    }

    #[test]
    fn flags_override_defaults() {
        let config = parse(&[
            "--scenario",
            "greet-deadline",
            "--sum-operands",
            "-4,9",
            "--deadline-timeouts-ms",
            "10,20",
            "--default-timeout-ms",
            "250",
        ])
        .unwrap();
        assert_eq!(config.scenario, Scenario::GreetDeadline);
        assert_eq!(config.inputs.sum, (-4, 9));
        assert_eq!(
            config.inputs.deadline_timeouts,
            vec![Duration::from_millis(10), Duration::from_millis(20)]
        );
        assert_eq!(config.engine.default_timeout, Some(Duration::from_millis(250)));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(parse(&["--channel-capacity", "0"]).is_err());
        assert!(parse(&["--greet-count", "0"]).is_err());
        assert!(parse(&["--deadline-timeouts-ms", "0"]).is_err());
        assert!(parse(&["--default-timeout-ms", "0"]).is_err());
    }

    #[test]
    fn all_expands_to_every_scenario() {
        assert_eq!(Scenario::All.expand(), Scenario::SEQUENCE.to_vec());
        assert_eq!(Scenario::Max.expand(), vec![Scenario::Max]);
    }
}
