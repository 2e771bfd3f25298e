// Function-mode entry point: one gateway request per invocation

use std::sync::Arc;

use lambda_http::{run, service_fn, Error as LambdaError, Request};

use solana_traders_api::adapter::{FunctionAdapter, SsmParameterStore};

#[tokio::main]
async fn main() -> Result<(), LambdaError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with_target(false) // don't print the module name
        .without_time() // the log sink stamps each line
        .init();

    let store = SsmParameterStore::from_env().await;
    let adapter = Arc::new(FunctionAdapter::new(Arc::new(store)));

    run(service_fn(move |request: Request| {
        let adapter = Arc::clone(&adapter);
        async move { Ok::<_, LambdaError>(adapter.handle(request).await) }
    }))
    .await
}
