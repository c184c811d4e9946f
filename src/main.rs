#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Skyglow node entrypoint.
//! Opens the ledger, runs the simulated oracle and applies its callbacks.

use anyhow::{bail, Context, Result};
use skyglow::{
    config::LedgerConfig,
    core::{
        algebra::passthrough::PassthroughAlgebra,
        events::ChannelEvents,
        oracle::{
            keys::{parse_public_key_hex, OracleKey},
            service::{spawn_oracle, OracleServiceConfig},
        },
        runtime::executor::{now_ms, CallContext, LedgerExecutor},
        state::ledger_store::LedgerStore,
        types::{CipherFields, ContributorId, RegionCode, H256},
    },
    monitoring::{http, metrics::Metrics},
};
use std::{net::SocketAddr, path::Path, sync::Arc, time::Duration};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

fn env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn init_tracing() {
    let json = env("SKYGLOW_LOG_FORMAT").as_deref() == Some("json");
    let builder = tracing_subscriber::fmt().with_target(false).with_level(true);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.compact().try_init()
    };
}

/// Submit a few observations and ask for one reveal so a fresh node has
/// something to show.
fn seed_demo<A, C, E>(exec: &mut LedgerExecutor<A, C, E>) -> Result<()>
where
    A: skyglow::core::algebra::CiphertextAlgebra,
    C: skyglow::core::access::AccessControl,
    E: skyglow::core::events::EventSink,
{
    let who = ContributorId(*H256::digest(b"skyglow-demo-contributor").as_bytes());
    let ctx = CallContext::now(who);
    let samples = [
        ("EU-1", 2150u64, 48_137, 11_575),
        ("EU-1", 1980, 48_208, 16_373),
        ("AS-2", 1720, 35_676, 139_650),
    ];

    let mut first = None;
    for (region, brightness, lat, lon) in samples {
        let fields = CipherFields {
            brightness: PassthroughAlgebra::encrypt(brightness),
            latitude: PassthroughAlgebra::encrypt(lat),
            longitude: PassthroughAlgebra::encrypt(lon),
            timestamp: PassthroughAlgebra::encrypt(ctx.now_ms / 1000),
        };
        let id = exec.submit(&ctx, fields, RegionCode::new(region))?;
        first.get_or_insert(id);
    }
    if let Some(id) = first {
        exec.request_reveal(&ctx, id)?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cfg_path = env("SKYGLOW_CONFIG");
    let cfg = LedgerConfig::load(cfg_path.as_deref()).context("load config")?;

    let key = OracleKey::load_or_create(Path::new(&cfg.oracle.key_path)).context("oracle key")?;
    let pinned = if cfg.oracle.public_key_hex.trim().is_empty() {
        key.public_key()
    } else {
        match parse_public_key_hex(&cfg.oracle.public_key_hex) {
            Some(pk) => pk,
            None => bail!("oracle.public_key_hex is not a 32-byte hex key"),
        }
    };
    if pinned != key.public_key() {
        warn!("pinned oracle key differs from the local oracle key; callbacks will be rejected");
    }

    let (dispatch_tx, dispatch_rx) = mpsc::unbounded_channel();
    let (callback_tx, mut callback_rx) = mpsc::channel(1024);
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();

    let algebra = PassthroughAlgebra::new(pinned).with_dispatch(dispatch_tx);
    let access = cfg.access_policy().context("access policy")?;
    let events = ChannelEvents(event_tx);
    let metrics = Arc::new(Metrics::new().context("metrics init")?);

    let exec = if cfg.data_dir.trim().is_empty() {
        LedgerExecutor::new(algebra, access, events)
    } else {
        let store = LedgerStore::open(&cfg.data_dir).context("open ledger store")?;
        LedgerExecutor::open(store, algebra, access, events).context("restore ledger")?
    };
    let mut exec = exec
        .with_metrics(metrics.clone())
        .with_reveal_ttl(cfg.reveal_ttl_ms);

    info!(
        data_dir = %cfg.data_dir,
        observations = exec.observation_count(),
        regions = exec.registered_regions().len(),
        oracle = %hex::encode(pinned),
        "skyglow node starting"
    );

    if !cfg.metrics_addr.trim().is_empty() {
        let addr: SocketAddr = cfg.metrics_addr.parse().context("metrics_addr")?;
        let m = metrics.clone();
        tokio::spawn(async move {
            if let Err(e) = http::serve(addr, m).await {
                error!(error = %e, "metrics endpoint stopped");
            }
        });
    }

    let oracle_task = spawn_oracle(
        key,
        OracleServiceConfig {
            delay: Duration::from_millis(cfg.oracle.delay_ms),
        },
        dispatch_rx,
        callback_tx,
    );

    let event_task = tokio::spawn(async move {
        while let Some(ev) = event_rx.recv().await {
            info!(?ev, "ledger event");
        }
    });

    if env("SKYGLOW_DEMO").is_some() {
        seed_demo(&mut exec).context("demo workload")?;
    }

    let mut sweep = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            Some(f) = callback_rx.recv() => {
                if let Err(e) = exec.fulfill(&f.request_id, f.values, &f.proof) {
                    warn!(request = %f.request_id, error = %e, "callback not applied");
                }
            }
            _ = sweep.tick() => {
                if let Err(e) = exec.expire_pending(now_ms()) {
                    error!(error = %e, "expiry sweep failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown requested");
                break;
            }
        }
    }

    drop(exec);
    let _ = oracle_task.await;
    event_task.abort();
    Ok(())
}
