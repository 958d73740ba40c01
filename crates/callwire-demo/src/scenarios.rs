//! Client flows exercising every call pattern of the demo services.
//!
//! Results are printed to stdout. Expected failures (a negative square root,
//! a deadline that is too short) are reported and do not abort the run; any
//! other non-OK status does.

use crate::config::{Scenario, ScenarioInputs};
use anyhow::bail;
use callwire_services::{
    CalculatorClient, GreeterClient,
    callwire::{CallOptions, Code, Transport},
    proto::{
        CalculateAverageRequest, CalculateSumRequest, FindMaxRequest, GreetRequest, Greeting,
        PrimeDecomposeRequest, SquareRootRequest,
    },
};
use core::f64::consts::{E, PI};
use tokio::time::Instant;

/// Names streamed after the configured one by the client and bidi greeters.
const CROWD: [&str; 3] = ["Grace", "Edsger", "Barbara"];

pub struct Scenarios<T> {
    calculator: CalculatorClient<T>,
    greeter: GreeterClient<T>,
    inputs: ScenarioInputs,
}

impl<T: Transport> Scenarios<T> {
    pub const fn new(
        calculator: CalculatorClient<T>,
        greeter: GreeterClient<T>,
        inputs: ScenarioInputs,
    ) -> Self {
        Self {
            calculator,
            greeter,
            inputs,
        }
    }

    /// Runs `scenario`, or every scenario in order for [`Scenario::All`].
    ///
    /// # Errors
    ///
    /// Returns the first unexpected non-OK status.
    pub async fn run(&self, scenario: Scenario) -> anyhow::Result<()> {
        for scenario in scenario.expand() {
            #[cfg(feature = "tracing")]
            tracing::info!(?scenario, "Running scenario");

            println!("== {scenario:?}");
            self.run_one(scenario).await?;
        }
        Ok(())
    }

    async fn run_one(&self, scenario: Scenario) -> anyhow::Result<()> {
        match scenario {
            Scenario::All => bail!("`all` expands to the other scenarios"),
            Scenario::Sum => self.sum().await,
            Scenario::Primes => self.primes().await,
            Scenario::Average => self.average().await,
            Scenario::Max => self.max().await,
            Scenario::Sqrt => self.sqrt().await,
            Scenario::Greet => self.greet().await,
            Scenario::GreetMany => self.greet_many().await,
            Scenario::LongGreet => self.long_greet().await,
            Scenario::GreetEveryone => self.greet_everyone().await,
            Scenario::GreetDeadline => self.greet_deadline().await,
        }
    }

    fn request(&self, first_name: &str) -> GreetRequest {
        Greeting::new(first_name, self.inputs.last_name.as_str()).into()
    }

    fn names(&self) -> impl Iterator<Item = &str> {
        core::iter::once(self.inputs.first_name.as_str()).chain(CROWD)
    }

    async fn sum(&self) -> anyhow::Result<()> {
        let (x, y) = self.inputs.sum;
        let res = self
            .calculator
            .calculate_sum(CalculateSumRequest { x, y }, CallOptions::default())
            .await?;
        println!("{x} + {y} = {}", res.result);
        Ok(())
    }

    async fn primes(&self) -> anyhow::Result<()> {
        let number = self.inputs.prime_number;
        let mut factors = self
            .calculator
            .prime_decompose(PrimeDecomposeRequest { number }, CallOptions::default())
            .await?;

        let mut found = Vec::new();
        while let Some(factor) = factors.message().await? {
            println!("Factor of {number}: {}", factor.number);
            found.push(factor.number);
        }
        println!("{number} decomposes into {found:?}");
        Ok(())
    }

    async fn average(&self) -> anyhow::Result<()> {
        let call = self
            .calculator
            .calculate_average(CallOptions::default())
            .await?;
        for i in 0..self.inputs.average_count {
            let number = f64::from(i) / PI * E;
            call.send(CalculateAverageRequest { number }).await?;
        }

        match call.close_and_recv().await {
            Ok(res) => println!(
                "Average of {} numbers is {}",
                self.inputs.average_count, res.average
            ),
            Err(status) if status.code() == Code::InvalidArgument => {
                println!("Average rejected: {}", status.message());
            }
            Err(status) => return Err(status.into()),
        }
        Ok(())
    }

    async fn max(&self) -> anyhow::Result<()> {
        let call = self.calculator.find_max(CallOptions::default()).await?;
        let (requests, mut maxima) = call.split();

        let numbers = self.inputs.max_numbers.clone();
        let sender = tokio::spawn(async move {
            for number in numbers {
                requests.send(FindMaxRequest { number }).await?;
            }
            requests.close_send();
            Ok::<_, callwire_services::callwire::Status>(())
        });

        while let Some(res) = maxima.message().await? {
            println!("New maximum: {}", res.number);
        }
        sender.await??;
        Ok(())
    }

    async fn sqrt(&self) -> anyhow::Result<()> {
        for &number in &self.inputs.sqrt_numbers {
            match self
                .calculator
                .square_root(SquareRootRequest { number }, CallOptions::default())
                .await
            {
                Ok(res) => println!("Square root of {number} is {}", res.result),
                Err(status) if status.code() == Code::InvalidArgument => {
                    println!("Square root of {number} rejected: {}", status.message());
                }
                Err(status) => return Err(status.into()),
            }
        }
        Ok(())
    }

    async fn greet(&self) -> anyhow::Result<()> {
        let res = self
            .greeter
            .greet(self.request(&self.inputs.first_name), CallOptions::default())
            .await?;
        println!("{}", res.result);
        Ok(())
    }

    async fn greet_many(&self) -> anyhow::Result<()> {
        let mut greetings = self
            .greeter
            .greet_many_times(self.request(&self.inputs.first_name), CallOptions::default())
            .await?;
        while let Some(res) = greetings.message().await? {
            println!("{}", res.result);
        }
        Ok(())
    }

    async fn long_greet(&self) -> anyhow::Result<()> {
        let call = self.greeter.long_greet(CallOptions::default()).await?;
        for name in self.names() {
            call.send(self.request(name)).await?;
        }
        let res = call.close_and_recv().await?;
        println!("{}", res.result);
        Ok(())
    }

    async fn greet_everyone(&self) -> anyhow::Result<()> {
        let mut call = self.greeter.greet_everyone(CallOptions::default()).await?;
        for name in self.names() {
            call.send(self.request(name)).await?;
            if let Some(res) = call.message().await? {
                println!("{}", res.result);
            }
        }
        call.close_send();
        while let Some(res) = call.message().await? {
            println!("{}", res.result);
        }
        Ok(())
    }

    async fn greet_deadline(&self) -> anyhow::Result<()> {
        for &timeout in &self.inputs.deadline_timeouts {
            let start = Instant::now();
            let outcome = self
                .greeter
                .greet_with_deadline(
                    self.request(&self.inputs.first_name),
                    CallOptions::default().with_timeout(timeout),
                )
                .await;

            match outcome {
                Ok(res) => println!(
                    "{} (timeout {timeout:?}, took {:?})",
                    res.result,
                    start.elapsed()
                ),
                Err(status) if status.code() == Code::DeadlineExceeded => {
                    println!(
                        "Deadline exceeded after {:?} (timeout {timeout:?})",
                        start.elapsed()
                    );
                }
                Err(status) => return Err(status.into()),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CliArgs, DemoConfig};
    use callwire_services::{
        GreeterConfig,
        callwire::{Client, LocalTransport, Server, local},
        registry,
    };
    use clap::Parser;
    use core::time::Duration;

    fn demo(args: &[&str]) -> (DemoConfig, Server, Scenarios<LocalTransport>) {
        let args =
            CliArgs::parse_from(core::iter::once("callwire-demo").chain(args.iter().copied()));
        let config = DemoConfig::try_from(args).unwrap();
        let (transport, incoming) = local(&config.engine);
        let server = Server::new(registry(config.greeter).unwrap(), config.engine.clone());
        let serving = server.clone();
        tokio::spawn(async move { serving.serve(incoming).await });

        let client = Client::with_config(transport, config.engine.clone());
        let scenarios = Scenarios::new(
            CalculatorClient::new(client.clone()),
            GreeterClient::new(client),
            config.inputs.clone(),
        );
        (config, server, scenarios)
    }

    #[tokio::test(start_paused = true)]
    async fn every_scenario_completes_with_default_inputs() {
        let (config, _server, scenarios) = demo(&[]);
        assert_eq!(config.greeter.pace, GreeterConfig::DEFAULT_PACE);
        scenarios.run(Scenario::All).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn short_deadline_is_reported_not_raised() {
        let (_, _server, scenarios) = demo(&["--deadline-timeouts-ms", "10"]);
        let start = Instant::now();
        scenarios.run(Scenario::GreetDeadline).await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_millis(10));
    }

    #[tokio::test]
    async fn unexpected_failures_abort_the_run() {
        let (_, _server, scenarios) = demo(&["--prime-number", "-5"]);
        let err = scenarios.run(Scenario::Primes).await.unwrap_err();
        assert!(err.to_string().contains("non-positive"));
    }
}
