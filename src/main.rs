use std::env;
use std::path::PathBuf;

use anyhow::anyhow;
use tracing_subscriber::EnvFilter;

use utterance_gateway::{BoundaryDecider, GatewayConfig};

const USAGE: &str = "Usage: utterance-gateway [-c|--config <file.yaml>] <command>

Commands:
  config                                    Print the effective configuration as YAML
  decide <text> [confidence] [--speech-ended]
                                            Show how long the gateway would wait
                                            before finalizing <text>";

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config_path: Option<PathBuf> = None;
    let mut positional = Vec::new();
    let mut speech_ended = false;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-c" | "--config" => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                config_path = Some(PathBuf::from(path));
            }
            "--speech-ended" => speech_ended = true,
            "-h" | "--help" => {
                println!("{USAGE}");
                return Ok(());
            }
            _ => positional.push(arg),
        }
    }

    // Load configuration
    let config = match &config_path {
        Some(path) => GatewayConfig::from_file(path),
        None => GatewayConfig::from_env(),
    }
    .map_err(|e| anyhow!(e.to_string()))?;

    let mut positional = positional.into_iter();
    let Some(command) = positional.next() else {
        anyhow::bail!("Missing command.\n\n{USAGE}");
    };

    match command.as_str() {
        "config" => {
            if let Some(extra) = positional.next() {
                anyhow::bail!("Unexpected argument '{extra}' after 'config'");
            }
            let yaml = serde_yaml::to_string(&config)
                .map_err(|e| anyhow!("Failed to render configuration: {}", e))?;
            print!("{yaml}");
        }
        "decide" => {
            let text = positional
                .next()
                .ok_or_else(|| anyhow!("'decide' requires the utterance text"))?;
            let confidence = match positional.next() {
                Some(value) => value
                    .parse::<f32>()
                    .map_err(|_| anyhow!("Invalid confidence '{value}'"))?,
                None => 1.0,
            };
            if !(0.0..=1.0).contains(&confidence) {
                anyhow::bail!("Confidence must be between 0 and 1, got {confidence}");
            }
            if let Some(extra) = positional.next() {
                anyhow::bail!("Unexpected argument '{extra}' after 'decide'");
            }

            let decider = BoundaryDecider::new(&config.endpointing);
            let decision = decider.decide(&text, confidence, speech_ended);
            println!("reason:  {}", decision.reason);
            println!("timeout: {:.2}s", decision.timeout.as_secs_f64());
        }
        other => {
            anyhow::bail!("Unknown command '{other}'. Supported commands: config, decide");
        }
    }

    Ok(())
}
