use crate::{
    CalculatorClient, GreeterClient, GreeterConfig,
    proto::{
        CalculateAverageRequest, CalculateSumRequest, FindMaxRequest, GreetRequest, Greeting,
        PrimeDecomposeRequest, SquareRootRequest,
    },
    registry,
};
use callwire::{CallOptions, Client, Code, EngineConfig, LocalTransport, Server, local};
use core::time::Duration;
use futures::StreamExt;
use tokio::time::Instant;

fn serve(
    greeter: GreeterConfig,
) -> (CalculatorClient<LocalTransport>, GreeterClient<LocalTransport>) {
    let config = EngineConfig::default();
    let (transport, incoming) = local(&config);
    let server = Server::new(registry(greeter).unwrap(), config);
    tokio::spawn(async move { server.serve(incoming).await });

    let client = Client::new(transport);
    (CalculatorClient::new(client.clone()), GreeterClient::new(client))
}

fn fast_greeter() -> GreeterConfig {
    GreeterConfig {
        pace: Duration::from_millis(1),
        work_unit: Duration::from_millis(1),
        ..GreeterConfig::default()
    }
}

fn opts() -> CallOptions {
    CallOptions::default()
}

// === Calculator ===

#[tokio::test]
async fn sum_adds_and_rejects_overflow() {
    let (calc, _) = serve(fast_greeter());

    let res = calc
        .calculate_sum(CalculateSumRequest { x: 21, y: 11 }, opts())
        .await
        .unwrap();
    assert_eq!(res.result, 32);

    let err = calc
        .calculate_sum(CalculateSumRequest { x: i64::MAX, y: 1 }, opts())
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
}

#[tokio::test]
async fn prime_decompose_streams_factors() {
    let (calc, _) = serve(fast_greeter());

    let stream = calc
        .prime_decompose(PrimeDecomposeRequest { number: 465_723 }, opts())
        .await
        .unwrap();
    let factors: Vec<i64> = stream
        .into_stream()
        .map(|res| res.unwrap().number)
        .collect()
        .await;
    assert_eq!(factors, vec![3, 3, 3, 47, 367]);
}

#[tokio::test]
async fn prime_decompose_of_one_is_empty_and_ok() {
    let (calc, _) = serve(fast_greeter());

    let mut stream = calc
        .prime_decompose(PrimeDecomposeRequest { number: 1 }, opts())
        .await
        .unwrap();
    assert_eq!(stream.message().await.unwrap(), None);
}

#[tokio::test]
async fn prime_decompose_rejects_non_positive_before_emitting() {
    let (calc, _) = serve(fast_greeter());

    for number in [0, -7] {
        let mut stream = calc
            .prime_decompose(PrimeDecomposeRequest { number }, opts())
            .await
            .unwrap();
        let err = stream.message().await.unwrap_err();
        assert_eq!(err.code(), Code::InvalidArgument);
    }
}

#[tokio::test]
async fn average_of_exactly_the_sent_numbers() {
    let (calc, _) = serve(fast_greeter());

    let numbers: Vec<f64> = (0..115)
        .map(|i| f64::from(i) / core::f64::consts::PI * core::f64::consts::E)
        .collect();
    let call = calc.calculate_average(opts()).await.unwrap();
    for &number in &numbers {
        call.send(CalculateAverageRequest { number }).await.unwrap();
    }
    let res = call.close_and_recv().await.unwrap();

    let expected = numbers.iter().sum::<f64>() / 115.0;
    assert!((res.average - expected).abs() < 1e-9);
}

#[tokio::test]
async fn average_of_nothing_is_invalid_argument() {
    let (calc, _) = serve(fast_greeter());

    let call = calc.calculate_average(opts()).await.unwrap();
    let err = call.close_and_recv().await.unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
    assert_eq!(err.message(), "no numbers received");
}

#[tokio::test]
async fn find_max_emits_only_new_maxima() {
    let (calc, _) = serve(fast_greeter());

    let call = calc.find_max(opts()).await.unwrap();
    let (tx, rx) = call.split();
    let sender = tokio::spawn(async move {
        for number in [12, -2, 1233, 1, 7, -86, 1233, 2000] {
            tx.send(FindMaxRequest { number }).await.unwrap();
        }
        tx.close_send();
    });

    let updates: Vec<i64> = rx
        .into_stream()
        .map(|res| res.unwrap().number)
        .collect()
        .await;
    sender.await.unwrap();
    assert_eq!(updates, vec![12, 1233, 2000]);
}

#[tokio::test]
async fn find_max_replies_while_requests_are_still_open() {
    let (calc, _) = serve(fast_greeter());

    let mut call = calc.find_max(opts()).await.unwrap();
    call.send(FindMaxRequest { number: 5 }).await.unwrap();
    assert_eq!(call.message().await.unwrap().unwrap().number, 5);
    call.send(FindMaxRequest { number: 3 }).await.unwrap();
    call.send(FindMaxRequest { number: 9 }).await.unwrap();
    assert_eq!(call.message().await.unwrap().unwrap().number, 9);
    call.close_send();
    assert_eq!(call.message().await.unwrap(), None);
}

#[tokio::test]
async fn square_root_contract() {
    let (calc, _) = serve(fast_greeter());

    let res = calc
        .square_root(SquareRootRequest { number: 225 }, opts())
        .await
        .unwrap();
    assert!((res.result - 15.0).abs() < f64::EPSILON);

    let err = calc
        .square_root(SquareRootRequest { number: -12 }, opts())
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
    assert_eq!(err.message(), "Received negative number -12");
}

// === Greeter ===

fn request(first: &str, last: &str) -> GreetRequest {
    Greeting::new(first, last).into()
}

#[tokio::test]
async fn greet_renders_full_name() {
    let (_, greeter) = serve(fast_greeter());

    let res = greeter.greet(request("Ada", "Lovelace"), opts()).await.unwrap();
    assert_eq!(res.result, "Hello Ada Lovelace");

    let err = greeter
        .greet(GreetRequest::default(), opts())
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
}

#[tokio::test(start_paused = true)]
async fn greet_many_times_is_paced() {
    let (_, greeter) = serve(GreeterConfig::default());

    let start = Instant::now();
    let results: Vec<String> = greeter
        .greet_many_times(request("Ada", "Lovelace"), opts())
        .await
        .unwrap()
        .into_stream()
        .map(|res| res.unwrap().result)
        .collect()
        .await;

    assert_eq!(results.len(), 10);
    assert_eq!(results[0], "Hello Ada Lovelace. 0");
    assert_eq!(results[9], "Hello Ada Lovelace. 9");
    assert_eq!(start.elapsed(), Duration::from_secs(9));
}

#[tokio::test]
async fn long_greet_concatenates_first_names() {
    let (_, greeter) = serve(fast_greeter());

    let call = greeter.long_greet(opts()).await.unwrap();
    for first in ["Ada", "Grace", "Edsger"] {
        call.send(request(first, "x")).await.unwrap();
    }
    let res = call.close_and_recv().await.unwrap();
    assert_eq!(res.result, "AdaGraceEdsger");

    let call = greeter.long_greet(opts()).await.unwrap();
    assert_eq!(call.close_and_recv().await.unwrap().result, "");
}

#[tokio::test]
async fn greet_everyone_replies_per_message() {
    let (_, greeter) = serve(fast_greeter());

    let mut call = greeter.greet_everyone(opts()).await.unwrap();
    for first in ["Ada", "Grace"] {
        call.send(request(first, "x")).await.unwrap();
        let res = call.message().await.unwrap().unwrap();
        assert_eq!(res.result, format!("Hello! {first}!"));
    }
    call.close_send();
    assert_eq!(call.message().await.unwrap(), None);
}

#[tokio::test(start_paused = true)]
async fn greet_with_deadline_short_timeout_exceeds_on_both_ends() {
    let (_, greeter) = serve(GreeterConfig::default());

    let start = Instant::now();
    let err = greeter
        .greet_with_deadline(
            request("Ada", "Lovelace"),
            opts().with_timeout(Duration::from_secs(2)),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::DeadlineExceeded);
    assert_eq!(start.elapsed(), Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn greet_with_deadline_long_timeout_succeeds() {
    let (_, greeter) = serve(GreeterConfig::default());

    let start = Instant::now();
    let res = greeter
        .greet_with_deadline(
            request("Ada", "Lovelace"),
            opts().with_timeout(Duration::from_secs(5)),
        )
        .await
        .unwrap();
    assert_eq!(res.result, "Hello Ada Lovelace");
    assert_eq!(start.elapsed(), Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn cancelling_greet_many_times_stops_within_one_pace() {
    let (_, greeter) = serve(GreeterConfig::default());

    let mut stream = greeter
        .greet_many_times(request("Ada", "Lovelace"), opts())
        .await
        .unwrap();
    stream.message().await.unwrap();
    stream.message().await.unwrap();

    let start = Instant::now();
    stream.context().cancel();
    let err = stream.message().await.unwrap_err();
    assert_eq!(err.code(), Code::Cancelled);
    assert!(start.elapsed() < GreeterConfig::DEFAULT_PACE);
}
