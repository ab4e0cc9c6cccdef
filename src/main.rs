use anyhow::Context;
use xkcd_harvest::{get_args, init_logging, run};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = get_args();
    let _guard = init_logging(config.log_dir.as_deref()).context("could not set up logging")?;
    run(config).await.context("harvest aborted")?;
    Ok(())
}
