use proxyprobe::cli::Cli;
use proxyprobe::config::HarnessConfig;
use proxyprobe::core::network::{
    get_debug_logger, IsahcProbeClient, ProbeError, StatusRenderer, Verifier,
};
use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    let renderer = StatusRenderer::new();

    match run(&cli, &renderer) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", renderer.render_failure(&e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, renderer: &StatusRenderer) -> Result<(), ProbeError> {
    let mut config = HarnessConfig::from_env()?;
    config.apply_cli(cli);
    config.check()?;

    if cli.check {
        println!("✓ Configuration valid");
        return Ok(());
    }

    if cli.print {
        config.print()?;
        return Ok(());
    }

    let logger = get_debug_logger();
    logger.config_loaded(
        &config.proxy.uri(),
        config.targets.http_port,
        config.targets.https_port,
    );

    // One client for both legs
    let client = IsahcProbeClient::from_config(&config)?;
    logger.client_built(
        client.proxy_uri(),
        &config.credential.username,
        config.trust.skip_certificate_validation,
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let report = Verifier::new(&client, logger).run(&config, &mut out)?;

    if cli.json {
        match renderer.render_json(&report) {
            Ok(json) => eprintln!("{}", json),
            Err(e) => eprintln!("Warning: failed to render report: {}", e),
        }
    } else if !cli.quiet {
        eprintln!("{}", renderer.render_report(&report));
    }

    Ok(())
}
