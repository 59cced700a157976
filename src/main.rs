use clap::Parser as _;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "brasfut_client=warn".into()),
        )
        .init();

    let args = brasfut_client::CliArgs::parse();
    brasfut_client::run(args).await
}
