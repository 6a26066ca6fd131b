//! callbridge: answer SIP calls and talk to Gemini Live

use anyhow::{Context, Result};
use clap::Parser;
use infra_common::{LoggingConfig, parse_log_level, setup_logging};
use session_core::{CallController, GatewayConfig, SipGateway};
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info, warn};

#[derive(Parser, Debug)]
#[command(name = "callbridge", version)]
#[command(about = "SIP gateway that bridges each call's audio to Gemini Live")]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "CALLBRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind the SIP and RTP sockets to
    #[arg(long)]
    bind: Option<IpAddr>,

    /// Address advertised in Contact and the SDP answer
    #[arg(long)]
    local_ip: Option<IpAddr>,

    /// SIP listening port
    #[arg(long)]
    sip_port: Option<u16>,

    /// RTP port for call media
    #[arg(long)]
    rtp_port: Option<u16>,

    /// Echo the caller's audio back instead of bridging to the AI
    #[arg(long)]
    loopback: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Log as JSON lines
    #[arg(long)]
    json_logs: bool,
}

impl Args {
    /// File configuration (or defaults) with command-line overrides applied
    fn gateway_config(&self) -> Result<GatewayConfig> {
        let mut config = match &self.config {
            Some(path) => infra_common::config::load_toml::<GatewayConfig>(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => GatewayConfig::default(),
        };
        if let Some(bind) = self.bind {
            config.bind_ip = bind;
            config.media.bind_ip = bind;
        }
        if let Some(local_ip) = self.local_ip {
            config.local_ip = local_ip;
        }
        if let Some(port) = self.sip_port {
            config.sip_port = port;
        }
        if let Some(port) = self.rtp_port {
            config.media.rtp_port = port;
        }
        if self.loopback {
            config.media.loopback = true;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = parse_log_level(&args.log_level)?;
    let mut logging = LoggingConfig::new(level, "callbridge");
    if args.json_logs {
        logging = logging.with_json();
    }
    if level >= Level::DEBUG {
        logging = logging.with_file_info();
    }
    setup_logging(logging)?;

    let config = args.gateway_config()?;
    config.validate().context("invalid configuration")?;
    if config.media.loopback {
        info!(delay_frames = config.media.echo_delay_frames, "Loopback mode");
    } else if config.ai_enabled() {
        info!(model = %config.ai.model_name(), voice = config.ai.voice_name(), "AI mode");
    } else {
        warn!("No API key in the configuration or GOOGLE_API_KEY/GEMINI_API_KEY; callers will hear silence");
    }

    let controller = Arc::new(CallController::new(config));
    let gateway = SipGateway::bind(controller.clone())
        .await
        .context("binding the SIP socket")?;

    let cancel = CancellationToken::new();
    let mut server = {
        let token = cancel.clone();
        tokio::spawn(async move { gateway.run(token).await })
    };

    let finished = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("listening for Ctrl-C")?;
            info!("Ctrl-C received, shutting down");
            None
        }
        result = &mut server => Some(result),
    };

    cancel.cancel();
    let outcome = match finished {
        Some(result) => result,
        None => server.await,
    };
    controller.shutdown().await;
    outcome.context("SIP transport task failed")??;

    info!("callbridge stopped");
    Ok(())
}
