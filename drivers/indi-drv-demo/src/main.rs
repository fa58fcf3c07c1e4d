//! Process entry point: CLI parsing, logging, and the two concurrent
//! loops a driver needs -- a blocking stdin reader feeding the
//! dispatcher, and a timer that advances the simulated hardware.
//! `indi-api` itself never awaits; this binary only uses `tokio` to
//! host those two loops side by side.

use indi_api::sink::StreamSink;
use indi_api::types::name::Device;
use indi_api::{dispatch, DriverContext};
use indi_drv_demo::{config::Params, HeaterDriver};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let cli = indi_config::Cli::parse_args();
    indi_config::init_logging(cli.log_level());

    let params = match cli.load_config() {
        Ok(cfg) => Params::from_config(&cfg).unwrap_or_else(|e| {
            warn!(%e, "malformed heater config, using defaults");
            Params::default()
        }),
        Err(e) => {
            warn!(%e, "no hardware config given, using defaults");
            Params::default()
        }
    };

    let device = Device::new("Heater Simulator").expect("built-in device name is valid");
    let ctx = Arc::new(DriverContext::new(Arc::new(StreamSink::new(io::stdout()))));
    let driver = Arc::new(
        HeaterDriver::new(device, params.clone()).expect("built-in property names are valid"),
    );

    if let Err(e) = driver.define_properties(&ctx) {
        error!(%e, "failed to define initial properties");
        return;
    }

    let poll = Duration::from_millis(params.poll_ms);
    let tick_driver = Arc::clone(&driver);
    let tick_ctx = Arc::clone(&ctx);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(poll);
        loop {
            interval.tick().await;
            tick_driver.tick(&tick_ctx, poll.as_secs_f64());
        }
    });

    let dispatch_driver = Arc::clone(&driver);
    let dispatch_ctx = Arc::clone(&ctx);
    let dispatch_task =
        tokio::task::spawn_blocking(move || run_dispatch_loop(&dispatch_ctx, dispatch_driver.as_ref()));

    if let Err(e) = dispatch_task.await {
        error!(?e, "dispatch loop panicked");
    }
}

/// Reads XML fragments from stdin and feeds each to the dispatcher
/// until stdin closes, matching `indidriver.c`'s stdin read loop.
fn run_dispatch_loop(ctx: &DriverContext, handlers: &dyn indi_api::Handlers) {
    let stdin = io::stdin();
    let mut reader = quick_xml::reader::Reader::from_reader(stdin.lock());
    reader.config_mut().trim_text(true);

    loop {
        match indi_api::xml::read_element(&mut reader) {
            Ok(Some(element)) => {
                if let Err(e) = dispatch::dispatch(ctx, handlers, &element) {
                    match e {
                        indi_api::Error::Fatal(detail) => {
                            error!(%detail, "fatal protocol error, exiting");
                            return;
                        }
                        other => warn!(%other, "rejected command"),
                    }
                }
            }
            Ok(None) => return,
            Err(e) => {
                error!(%e, "malformed input, exiting");
                return;
            }
        }
    }
}
