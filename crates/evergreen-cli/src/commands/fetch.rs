use anyhow::Result;
use evergreen_core::utils::{format_size, truncate_string};
use evergreen_core::{Config, Network, Request, Response, ResponseSource};

use super::{active_manager, Host};
use crate::args::FetchArgs;

/// Longest URL shown in the summary line
const MAX_URL_DISPLAY: usize = 80;

pub async fn run(config: &Config, args: FetchArgs) -> Result<()> {
    let host = Host::new(config)?;
    let origin = config.origin_url()?;
    let manager = active_manager(&host, config).await?;

    for path in &args.paths {
        let request = Request::for_path(&args.method, &origin, path)?;
        let (response, source) = match manager {
            Some(ref manager) => manager.handle_with_source(&request).await,
            // Nothing installed: behave like an uncontrolled page.
            None => match host.network.fetch(&request).await {
                Ok(response) => (response, ResponseSource::Network),
                Err(_) => (Response::error(), ResponseSource::Synthetic),
            },
        };

        let status = if response.is_error() {
            "ERR".to_string()
        } else {
            response.status.to_string()
        };
        println!(
            "{:>3} {:<9} {:>10}  {}",
            status,
            source,
            format_size(response.body.len()),
            truncate_string(request.url.as_str(), MAX_URL_DISPLAY)
        );
        if args.body && !response.body.is_empty() {
            println!("{}", response.text());
        }
    }
    Ok(())
}
