//! Typed client stubs for the demo services.

use crate::proto::{
    CALCULATE_AVERAGE, CALCULATE_SUM, CalculateAverageRequest, CalculateAverageResponse,
    CalculateSumRequest, CalculateSumResponse, FIND_MAX, FindMaxRequest, FindMaxResponse, GREET,
    GREET_EVERYONE, GREET_MANY_TIMES, GREET_WITH_DEADLINE, GreetRequest, GreetResponse,
    LONG_GREET, PRIME_DECOMPOSE, PrimeDecomposeRequest, PrimeDecomposeResponse, SQUARE_ROOT,
    SquareRootRequest, SquareRootResponse,
};
use callwire::{BidiCall, CallOptions, Client, ClientStreamingCall, Status, Streaming, Transport};

#[derive(Clone)]
pub struct CalculatorClient<T> {
    inner: Client<T>,
}

impl<T: Transport> CalculatorClient<T> {
    pub const fn new(inner: Client<T>) -> Self {
        Self { inner }
    }

    /// # Errors
    ///
    /// Returns the call's terminal status when it is not OK.
    pub async fn calculate_sum(
        &self,
        req: CalculateSumRequest,
        options: CallOptions,
    ) -> Result<CalculateSumResponse, Status> {
        self.inner.unary(&CALCULATE_SUM, req, options).await
    }

    /// # Errors
    ///
    /// Returns the call's terminal status if it fails before the request is
    /// delivered.
    pub async fn prime_decompose(
        &self,
        req: PrimeDecomposeRequest,
        options: CallOptions,
    ) -> Result<Streaming<PrimeDecomposeResponse>, Status> {
        self.inner.server_streaming(&PRIME_DECOMPOSE, req, options).await
    }

    /// # Errors
    ///
    /// Returns a status if the call cannot be opened.
    pub async fn calculate_average(
        &self,
        options: CallOptions,
    ) -> Result<ClientStreamingCall<CalculateAverageRequest, CalculateAverageResponse>, Status> {
        self.inner.client_streaming(&CALCULATE_AVERAGE, options).await
    }

    /// # Errors
    ///
    /// Returns a status if the call cannot be opened.
    pub async fn find_max(
        &self,
        options: CallOptions,
    ) -> Result<BidiCall<FindMaxRequest, FindMaxResponse>, Status> {
        self.inner.bidi_streaming(&FIND_MAX, options).await
    }

    /// # Errors
    ///
    /// Returns `InvalidArgument` for a negative number, or the call's
    /// terminal status when it is otherwise not OK.
    pub async fn square_root(
        &self,
        req: SquareRootRequest,
        options: CallOptions,
    ) -> Result<SquareRootResponse, Status> {
        self.inner.unary(&SQUARE_ROOT, req, options).await
    }
}

#[derive(Clone)]
pub struct GreeterClient<T> {
    inner: Client<T>,
}

impl<T: Transport> GreeterClient<T> {
    pub const fn new(inner: Client<T>) -> Self {
        Self { inner }
    }

    /// # Errors
    ///
    /// Returns the call's terminal status when it is not OK.
    pub async fn greet(
        &self,
        req: GreetRequest,
        options: CallOptions,
    ) -> Result<GreetResponse, Status> {
        self.inner.unary(&GREET, req, options).await
    }

    /// # Errors
    ///
    /// Returns `DeadlineExceeded` when the deadline in `options` passes
    /// before the greeting is ready.
    pub async fn greet_with_deadline(
        &self,
        req: GreetRequest,
        options: CallOptions,
    ) -> Result<GreetResponse, Status> {
        self.inner.unary(&GREET_WITH_DEADLINE, req, options).await
    }

    /// # Errors
    ///
    /// Returns the call's terminal status if it fails before the request is
    /// delivered.
    pub async fn greet_many_times(
        &self,
        req: GreetRequest,
        options: CallOptions,
    ) -> Result<Streaming<GreetResponse>, Status> {
        self.inner.server_streaming(&GREET_MANY_TIMES, req, options).await
    }

    /// # Errors
    ///
    /// Returns a status if the call cannot be opened.
    pub async fn long_greet(
        &self,
        options: CallOptions,
    ) -> Result<ClientStreamingCall<GreetRequest, GreetResponse>, Status> {
        self.inner.client_streaming(&LONG_GREET, options).await
    }

    /// # Errors
    ///
    /// Returns a status if the call cannot be opened.
    pub async fn greet_everyone(
        &self,
        options: CallOptions,
    ) -> Result<BidiCall<GreetRequest, GreetResponse>, Status> {
        self.inner.bidi_streaming(&GREET_EVERYONE, options).await
    }
}
