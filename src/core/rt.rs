use std::future::Future;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::runtime;

use crate::{
    core::{
        self,
        args::{ArgsParser, Cmd, EmitterArgs, MonitorArgs},
        config,
        shutdown::{trap_ctrl_c, Shutdown, ShutdownHandle},
    },
    emitter::Emitter,
    monitor::Monitor,
};

pub fn stage0_delegate() -> Result<()> {
    let args = ArgsParser::parse();
    let _guard = core::init_logging(args.log_dir.as_deref())?;
    match args.cmd {
        Cmd::Run { args } => stage1_async(|shutdown| run_emitter(args, shutdown)),
        Cmd::Once { args } => stage1_async(|_| send_once(args)),
        Cmd::Monitor { args } => stage1_async(|shutdown| run_monitor(args, shutdown)),
    }
}

/// runs `main` on a single threaded runtime, with ctrl+c wired to the shutdown handle it gets
pub fn stage1_async<F, Fut>(main: F) -> Result<()>
where
    F: FnOnce(ShutdownHandle) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    debug!("Launching async runtime");
    let runtime = runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let mut shutdown = Shutdown::new();
    runtime.block_on(async {
        trap_ctrl_c(shutdown.handle());
        let result = main(shutdown.handle()).await;
        if let Err(e) = &result {
            error!("Main task exited with error: {e:#}");
        }
        shutdown.trigger_shutdown();
        shutdown.wait_for_completion().await;
        result
    })
}

async fn build_emitter(args: EmitterArgs) -> Result<Emitter> {
    let cfg = config::load_emitter(&args)?;
    let settings = cfg.settings()?;
    let dest = core::lookup_destination(&cfg.destination.host, cfg.destination.port).await?;
    Emitter::bind(settings, dest)
        .await
        .context("failed to set up the emitter")
}

async fn run_emitter(args: EmitterArgs, shutdown: ShutdownHandle) -> Result<()> {
    let emitter = build_emitter(args).await?;
    info!("running -- press ctrl+c to exit");
    emitter.run(shutdown).await?;
    Ok(())
}

async fn send_once(args: EmitterArgs) -> Result<()> {
    let mut emitter = build_emitter(args).await?;
    emitter.emit_once().await?;
    debug!(stats = ?emitter.stats(), "done");
    Ok(())
}

async fn run_monitor(args: MonitorArgs, shutdown: ShutdownHandle) -> Result<()> {
    let cfg = config::load_monitor(&args)?;
    let monitor = Monitor::bind(cfg.settings()?, cfg.listen_addr())
        .await
        .with_context(|| format!("failed to listen on {}", cfg.listen_addr()))?;
    info!("Listening for readings on {}", monitor.local_addr()?);
    info!("running -- press ctrl+c to exit");
    let state = monitor.run(shutdown).await?;
    info!("Last known values: {}", state.summary());
    Ok(())
}
