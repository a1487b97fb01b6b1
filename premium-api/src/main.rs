//! Premium Content Lambda - Handles GET/POST /home/premium.

use lambda_http::{run, service_fn, Error};

#[tokio::main]
async fn main() -> Result<(), Error> {
    shared::init_tracing();

    run(service_fn(premium_api::handler)).await
}
