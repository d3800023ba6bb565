#![forbid(unsafe_code)]

use std::process;

use gblend::Blender;
use gblend_harness::cli::Opts;
use gblend_harness::workload;

fn main() {
    let opts = Opts::parse();
    init_tracing(opts.json);

    let mut blender = match Blender::new(opts.config, opts.gamma) {
        Ok(blender) => blender,
        Err(err) => {
            eprintln!("Invalid cache configuration: {err}");
            process::exit(1);
        }
    };

    let report = workload::run(&mut blender, &opts.workload());
    if opts.json {
        println!("{}", report.to_json());
    } else {
        println!("{report}");
    }
    // Same counters again, as a structured event for the subscriber.
    #[cfg(feature = "tracing")]
    blender.dump_stats();
}

#[cfg(feature = "tracing")]
fn init_tracing(json: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

#[cfg(not(feature = "tracing"))]
fn init_tracing(_json: bool) {}
