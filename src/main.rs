use anyhow::Result;
use clap::Parser;
use paperwright::cli::Args;
use paperwright::launch;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// RUST_LOG 优先；否则 verbose 为 debug，默认 info
fn log_subscriber(verbose: bool) -> impl tracing::Subscriber + Send + Sync + 'static {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .finish()
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let topic = args.topic.clone();

    // 加载配置期间按命令行参数输出日志，之后以合并后的配置为准
    let config = tracing::subscriber::with_default(log_subscriber(args.verbose), || {
        args.into_config()
    })?;
    tracing::subscriber::set_global_default(log_subscriber(config.verbose))?;

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("🛑 收到中断信号，正在取消...");
            ctrl_c_token.cancel();
        }
    });

    let report = launch(&config, &topic, cancel).await?;

    println!("📄 {}", report.document.title);
    for path in &report.written {
        println!("💾 {}", path.display());
    }
    if !report.failed_sections.is_empty() {
        println!(
            "⚠️ 以下章节生成失败，已使用占位正文: {}",
            report.failed_sections.join(", ")
        );
    }

    Ok(())
}
