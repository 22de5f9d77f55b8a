//! `run`: drive the bridge from stdin until end of input or a signal.

use std::sync::Arc;

use nfc2ble_config::{Config, PublisherKind};
use nfc2ble_core::{Bridge, BridgeConfig, IdentityMap};
use tracing::{info, warn};

use crate::adapters::{AnyPublisher, LineReader};
use crate::cli::{GlobalOpts, PublisherArg, RunArgs};
use crate::error::CliError;

pub async fn handle(args: &RunArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut config = super::load_config(global, &args.ids)?;
    apply_publisher_args(&mut config, args);
    let mut bridge_config = config.to_bridge_config()?;
    apply_timing_args(&mut bridge_config, args);

    let (ids, load) = IdentityMap::discover(&bridge_config.id_source)?;
    if let Some(ref path) = load.path {
        info!(
            path = %path.display(),
            loaded = load.loaded,
            rejected = load.rejected,
            nfc_ids = ids.len(),
            "identifier map ready"
        );
    }

    let publisher = AnyPublisher::from_config(&config.publisher)?;
    let bridge = Bridge::new(bridge_config, Arc::new(ids), publisher)?;

    let shutdown = bridge.shutdown_token();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("signal received, shutting down");
        shutdown.cancel();
    });

    bridge.run(LineReader::stdin()).await?;
    Ok(())
}

fn apply_publisher_args(config: &mut Config, args: &RunArgs) {
    if let Some(kind) = args.publisher {
        config.publisher.kind = match kind {
            PublisherArg::Log => PublisherKind::Log,
            PublisherArg::Command => PublisherKind::Command,
        };
    }
    if let Some(ref cmd) = args.start_command {
        config.publisher.start_command = Some(cmd.clone());
    }
    if let Some(ref cmd) = args.stop_command {
        config.publisher.stop_command = Some(cmd.clone());
    }
}

fn apply_timing_args(config: &mut BridgeConfig, args: &RunArgs) {
    if let Some(d) = args.max_duration {
        config.max_duration = d;
    }
    if let Some(d) = args.tick_interval {
        config.tick_interval = d;
    }
    if let Some(d) = args.settle_delay {
        config.settle_delay = d;
    }
    if let Some(d) = args.shutdown_drain {
        config.shutdown_drain = d;
    }
    if args.no_reset {
        config.reset_on_startup = false;
    }
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
