use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use bytes::Bytes;
use clap::Parser;
use tracing::info;

use mpegts_mxf::constants::TS_SYNC_BYTE;
use mpegts_mxf::{DemuxConfig, FlowError, MxfConfig, MxfReader, Reporter, TsDemux, logging, network};

#[derive(Parser)]
#[clap(about = "Inspect MPEG-TS programs or MXF structure")]
struct Opt {
    /// Capture file to read (TS or MXF, detected from the first bytes)
    #[clap(long, conflicts_with = "udp")]
    file: Option<PathBuf>,

    /// UDP socket to bind + listen (IPv4, unicast or multicast)
    #[clap(long)]
    udp: Option<String>,

    /// Programs to demux, colon separated ("1:2:0x10")
    #[clap(long)]
    programs: Option<String>,

    /// Refresh interval for the JSON snapshot (UDP only)
    #[clap(long, default_value_t = 2)]
    refresh: u64,

    /// JSON file with a DemuxConfig
    #[clap(long)]
    config: Option<PathBuf>,

    /// Force 188/192/204/208-byte packets instead of the configured size
    #[clap(long)]
    packet_size: Option<usize>,

    /// Auto-detect the packet size
    #[clap(long, default_value_t = false, conflicts_with = "packet_size")]
    detect_size: bool,

    /// Verify PSI section CRCs
    #[clap(long, default_value_t = false)]
    check_crc: bool,

    /// Decode index entries strictly in tag order
    #[clap(long, default_value_t = false)]
    single_pass_index: bool,
}

impl Opt {
    fn demux_config(&self) -> anyhow::Result<DemuxConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
            }
            None => DemuxConfig::default(),
        };
        if let Some(list) = &self.programs {
            config.program_numbers = DemuxConfig::parse_program_list(list)?;
        }
        if self.packet_size.is_some() {
            config.packet_size = self.packet_size;
        }
        if self.detect_size {
            config.packet_size = None;
        }
        config.check_crc |= self.check_crc;
        Ok(config)
    }
}

/// Builds a demux with one counting pad per selected program.
fn build_demux(config: DemuxConfig) -> TsDemux {
    let programs = config.program_numbers.clone();
    let mut demux = TsDemux::new(config);
    demux.on_pmt(|program, pmt| {
        info!(program, version = pmt.version, streams = pmt.streams.len(), "PMT");
    });
    for program in programs {
        demux.request_pad(program, Box::new(|_: &Bytes| -> Result<(), FlowError> { Ok(()) }));
    }
    demux
}

fn looks_like_mxf(head: &[u8]) -> bool {
    head.starts_with(&[0x06, 0x0e, 0x2b, 0x34])
}

fn inspect_file(opt: &Opt, path: &PathBuf) -> anyhow::Result<()> {
    let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;

    if looks_like_mxf(&data) {
        let config = MxfConfig { two_pass_index_decode: !opt.single_pass_index };
        let mut reader = MxfReader::new(config);
        let (events, errors) = reader.read_all(&data)?;
        println!("{}", Reporter::generate_mxf_json_report(&events, &errors));
        return Ok(());
    }

    if !data.contains(&TS_SYNC_BYTE) {
        anyhow::bail!("{} is neither MXF nor MPEG-TS", path.display());
    }
    let mut demux = build_demux(opt.demux_config()?);
    demux.push(&data)?;
    println!("{}", Reporter::generate_json_report(&demux));
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    let opt = Opt::parse();

    if let Some(path) = &opt.file {
        return inspect_file(&opt, path);
    }

    let addr = opt.udp.clone().unwrap_or_else(|| "239.1.1.2:1234".to_string());
    let mut demux = build_demux(opt.demux_config()?);
    network::receive_into(&addr, &mut demux, Duration::from_secs(opt.refresh.max(1)), |d| {
        println!("{}", Reporter::generate_json_report(d));
    })
    .await
}
