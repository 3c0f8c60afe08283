use std::path::PathBuf;

use anyhow::Context;
use ath_csi::{
    params::{DecodeParams, DEFAULT_TAIL_GUARD},
    trace::{Record, TraceFile},
};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Summarize a trace recorded by the Atheros CSI logging tool
#[derive(Parser, Debug)]
#[command(name = "athdump")]
#[command(version, about, long_about = None)]
struct Args {
    /// Trace file to decode
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Keep records that carry no CSI
    #[arg(long)]
    keep_empty: bool,

    /// Stop once fewer than this many bytes are left after a record
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_TAIL_GUARD)]
    tail_guard: usize,

    /// Fail on a malformed record instead of stopping before it
    #[arg(long)]
    strict: bool,

    /// Print one line per record
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn params(&self) -> DecodeParams {
        DecodeParams {
            keep_metadata_only: self.keep_empty,
            tail_guard: self.tail_guard,
        }
    }
}

fn summary(i: usize, record: &Record) -> String {
    let h = &record.header;
    let bw = h
        .bandwidth()
        .map(|bw| format!("{}MHz", bw.mhz()))
        .unwrap_or_else(|_| format!("?{}", h.bandwidth));
    let (num_tones, nc, nr) = record.csi.dim();

    format!(
        "{i:>6} ts={} ch={} bw={bw} rate={:#04x} noise={} rssi={} [{} {} {}] csi={num_tones}x{nc}x{nr} payload={}",
        h.timestamp, h.tx_channel, h.rate, h.noise_floor, h.rssi, h.rssi_1, h.rssi_2, h.rssi_3, h.payload_length,
    )
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let data = std::fs::read(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    info!(path = %args.input.display(), bytes = data.len(), "read trace");

    let params = args.params();
    let trace = if args.strict {
        TraceFile::try_from_bytes(&data, &params)
            .with_context(|| format!("failed to decode {}", args.input.display()))?
    } else {
        TraceFile::from_bytes_with(&data, &params)
    };

    if args.verbose {
        for (i, record) in trace.iter().enumerate() {
            println!("{}", summary(i, record));
        }
    }

    println!("Have CSI for {} packets.", trace.len());

    Ok(())
}

#[cfg(test)]
mod tests {
    use ath_csi::{matrix::ComplexMatrix, trace::Record, Header};
    use clap::{CommandFactory, Parser};

    use super::{summary, Args};

    #[test]
    fn verify_cli() {
        Args::command().debug_assert();
    }

    #[test]
    fn params_from_flags() {
        let args = Args::parse_from(["athdump", "trace.dat"]);
        assert_eq!(args.params(), Default::default());

        let args = Args::parse_from(["athdump", "--keep-empty", "--tail-guard", "0", "trace.dat"]);
        let params = args.params();
        assert!(params.keep_metadata_only);
        assert_eq!(params.tail_guard, 0);
    }

    #[test]
    fn record_line() {
        let record = Record {
            header: Header {
                timestamp: 12,
                tx_channel: 2437,
                bandwidth: 1,
                rate: 0x8b,
                ..Default::default()
            },
            csi: ComplexMatrix::zeros(114, 2, 3),
        };

        assert_eq!(
            summary(3, &record),
            "     3 ts=12 ch=2437 bw=40MHz rate=0x8b noise=0 rssi=0 [0 0 0] csi=114x2x3 payload=0"
        );
    }
}
