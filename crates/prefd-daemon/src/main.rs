//! prefd entry point.
//!
//! Wires the layered configuration store to the property transport and runs
//! the single-threaded event loop until the transport closes.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ paths                 -- resolve template and user file locations
//!  └─ ConfigStore::open     -- load template, merge user overrides
//!  └─ PropertyRegistry      -- one bus object per category
//!  └─ event_loop::run       -- poll(2), serve accesses, emit signals
//! ```

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use prefd_core::ConfigStore;
use prefd_daemon::transport::{mock::MockBus, BusNames};
use prefd_daemon::{event_loop, paths, registry::PropertyRegistry};

fn main() -> anyhow::Result<()> {
    // Initialise structured logging.  Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("prefd starting");

    let template = paths::template_path();
    let user = paths::user_config_path().context("resolving the user configuration path")?;
    info!(
        "template: {}, user overrides: {}",
        template.display(),
        user.display()
    );

    let mut store = ConfigStore::open(&template, user).context("loading the base template")?;

    // In production: replace MockBus with the system-bus backend once one is
    // linked in.  Everything past this line is transport-agnostic.
    let mut bus = MockBus::new().context("creating the property transport")?;

    let names = BusNames::default();
    let registry = PropertyRegistry::register(&store, &names, &mut bus)
        .context("registering category objects")?;
    info!(
        "serving {} category objects as {}",
        registry.object_count(),
        names.service
    );

    event_loop::run(&mut store, &registry, &mut bus).context("event loop failed")?;

    info!("prefd stopped");
    Ok(())
}
