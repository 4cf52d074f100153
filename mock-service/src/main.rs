use mock_service::{prelude::*, rps_measure_task, run};
use std::net::SocketAddr;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter("mock_service=debug,tower_http=info")
        .init();

    let state = MockState::with_orders(&[1, 2, 3]).shared();
    tokio::task::spawn(rps_measure_task(state.clone()));

    let addr: SocketAddr = "0.0.0.0:8000".parse()?;
    run(addr, state).await
}
