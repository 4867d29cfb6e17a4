use apc_framework::tracing::setup_tracing;
use apc_framework::RuntimeConfig;
use apc_sample::error::DemoError;
use apc_sample::lifecycle::DemoSystem;
use apc_sample::model::{Batch, CalcOp};
use tracing::{error, info, Instrument};

const DEMO_BATCH: &str = r#"ops = [{ add = 1 }, { add = 1 }, { add = 1 }]"#;

#[tokio::main]
async fn main() -> Result<(), DemoError> {
    setup_tracing();

    let config = RuntimeConfig::from_env().map_err(|e| DemoError::Startup(e.to_string()))?;
    info!(workers = config.worker_threads, "Starting APC demo");
    let demo = DemoSystem::new(config)?;

    // Ping travels ping -> pong -> ping -> caller.
    let span = tracing::info_span!("ping_pong");
    async {
        for seq in 1..=3 {
            let reply = demo.ping.ping(seq).await?;
            info!(%reply, "Reply received");
        }
        Ok::<_, DemoError>(())
    }
    .instrument(span)
    .await?;

    let span = tracing::info_span!("calculator");
    async {
        let total = demo.calculator.apply(CalcOp::Add(5)).await?;
        info!(total, "Added asynchronously");

        let total = demo.calculator.apply_now(CalcOp::Mul(3))?;
        info!(total, "Multiplied through a synchronous call");

        let Batch(ops) = Batch::from_toml_str(DEMO_BATCH)?;
        let totals = demo.calculator.run_batch(ops).await?;
        info!(?totals, "Batch completed in send order");

        match demo.calculator.apply(CalcOp::Div(0)).await {
            Ok(total) => error!(total, "Division by zero succeeded"),
            Err(e) => info!(error = %e, "Division by zero rejected"),
        }
        Ok::<_, DemoError>(())
    }
    .instrument(span)
    .await?;

    let span = tracing::info_span!("shouter");
    async {
        for text in ["hello", "bad", "panic"] {
            let reply = demo.shouter.shout(text).await?;
            info!(input = text, %reply, "Shouted");
        }

        let previous = demo.shouter.set_fallback(None);
        match demo.shouter.shout("bad").await {
            Ok(reply) => error!(%reply, "Failure went unnoticed"),
            Err(e) => info!(error = %e, "Failure reached the caller without a handler"),
        }
        demo.shouter.set_fallback(previous);
        Ok::<_, DemoError>(())
    }
    .instrument(span)
    .await?;

    demo.shutdown();
    info!("Demo completed");
    Ok(())
}
