//! Message types and method descriptors of the demo services.
//!
//! Messages are plain `prost` structs. Field numbers are part of the wire
//! contract between callers and handlers and must not be reused.

use callwire::{CallKind, MethodDescriptor};

pub const CALCULATOR_SERVICE: &str = "calc.Calculator";
pub const GREETER_SERVICE: &str = "greet.GreetService";

pub const CALCULATE_SUM: MethodDescriptor =
    MethodDescriptor::from_static(CALCULATOR_SERVICE, "CalculateSum", CallKind::Unary);
pub const PRIME_DECOMPOSE: MethodDescriptor =
    MethodDescriptor::from_static(CALCULATOR_SERVICE, "PrimeDecompose", CallKind::ServerStream);
pub const CALCULATE_AVERAGE: MethodDescriptor =
    MethodDescriptor::from_static(CALCULATOR_SERVICE, "CalculateAverage", CallKind::ClientStream);
pub const FIND_MAX: MethodDescriptor =
    MethodDescriptor::from_static(CALCULATOR_SERVICE, "FindMax", CallKind::BidiStream);
pub const SQUARE_ROOT: MethodDescriptor =
    MethodDescriptor::from_static(CALCULATOR_SERVICE, "SquareRoot", CallKind::Unary);

pub const GREET: MethodDescriptor =
    MethodDescriptor::from_static(GREETER_SERVICE, "Greet", CallKind::Unary);
pub const GREET_WITH_DEADLINE: MethodDescriptor =
    MethodDescriptor::from_static(GREETER_SERVICE, "GreetWithDeadline", CallKind::Unary);
pub const GREET_MANY_TIMES: MethodDescriptor =
    MethodDescriptor::from_static(GREETER_SERVICE, "GreetManyTimes", CallKind::ServerStream);
pub const LONG_GREET: MethodDescriptor =
    MethodDescriptor::from_static(GREETER_SERVICE, "LongGreet", CallKind::ClientStream);
pub const GREET_EVERYONE: MethodDescriptor =
    MethodDescriptor::from_static(GREETER_SERVICE, "GreetEveryone", CallKind::BidiStream);

// === Calculator ===

#[derive(Clone, PartialEq, prost::Message)]
pub struct CalculateSumRequest {
    #[prost(int64, tag = "1")]
    pub x: i64,
    #[prost(int64, tag = "2")]
    pub y: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CalculateSumResponse {
    #[prost(int64, tag = "1")]
    pub result: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PrimeDecomposeRequest {
    #[prost(int64, tag = "1")]
    pub number: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PrimeDecomposeResponse {
    #[prost(int64, tag = "1")]
    pub number: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CalculateAverageRequest {
    #[prost(double, tag = "1")]
    pub number: f64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CalculateAverageResponse {
    #[prost(double, tag = "1")]
    pub average: f64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct FindMaxRequest {
    #[prost(int64, tag = "1")]
    pub number: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct FindMaxResponse {
    #[prost(int64, tag = "1")]
    pub number: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SquareRootRequest {
    #[prost(int32, tag = "1")]
    pub number: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SquareRootResponse {
    #[prost(double, tag = "1")]
    pub result: f64,
}

// === Greeter ===

#[derive(Clone, PartialEq, prost::Message)]
pub struct Greeting {
    #[prost(string, tag = "1")]
    pub first_name: String,
    #[prost(string, tag = "2")]
    pub last_name: String,
}

impl Greeting {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }
}

/// Request carrying a single [`Greeting`], shared by every greeter method.
#[derive(Clone, PartialEq, prost::Message)]
pub struct GreetRequest {
    #[prost(message, optional, tag = "1")]
    pub greeting: Option<Greeting>,
}

impl From<Greeting> for GreetRequest {
    fn from(greeting: Greeting) -> Self {
        Self {
            greeting: Some(greeting),
        }
    }
}

/// Response carrying the rendered greeting, shared by every greeter method.
#[derive(Clone, PartialEq, prost::Message)]
pub struct GreetResponse {
    #[prost(string, tag = "1")]
    pub result: String,
}
