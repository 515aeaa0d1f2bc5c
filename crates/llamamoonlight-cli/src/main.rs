//! llamamoonlight CLI - browser-like HTTP requests from the command line
//!
//! Usage:
//!     llamamoonlight [OPTIONS] <COMMAND>
//!
//! Environment Variables:
//!     LLAMAMOONLIGHT_CONFIG: Configuration file to load
//!     LLAMAMOONLIGHT_LOG: Log level (default: warn)
//!     LLAMAMOONLIGHT_LANGUAGE, LLAMAMOONLIGHT_USER_AGENT, LLAMAMOONLIGHT_BROWSER, LLAMAMOONLIGHT_MOBILE,
//!     LLAMAMOONLIGHT_TIMEOUT, LLAMAMOONLIGHT_BASE_URL, LLAMAMOONLIGHT_PROXIES,
//!     LLAMAMOONLIGHT_MIN_DELAY_MS, LLAMAMOONLIGHT_MAX_DELAY_MS,
//!     LLAMAMOONLIGHT_MAX_RETRIES, LLAMAMOONLIGHT_DOMAIN_INTERVAL_MS:
//!         used when no configuration file is found

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use llamamoonlight::{
    init_logging, BrowserKind, Client, Config, DelayConfig, Header, ProxyCheck, Response,
    ResponseSaver, UserAgent, DEFAULT_CHECK_URL,
};
use serde_json::json;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Browser-like HTTP client with proxy rotation and request pacing
#[derive(Parser, Debug)]
#[command(name = "llamamoonlight", version)]
#[command(about = "Browser-like HTTP client with proxy rotation and request pacing")]
#[command(after_help = r#"Examples:
    # Show the headers that would be sent to a site
    llamamoonlight headers https://www.example.de/ -n 3

    # Fetch a page through two rotating proxies
    llamamoonlight --proxy http://10.0.0.1:8080 --proxy socks5://10.0.0.2:1080 fetch https://example.com/

    # Save a page into a timestamped session directory
    llamamoonlight fetch https://example.com/ --save-dir ./pages

    # Check which proxies of a pool work
    llamamoonlight --proxy http://10.0.0.1:8080 --proxy socks5h://10.0.0.2:1080 proxy check

    # Only impersonate Firefox, pausing like a person between requests
    llamamoonlight --browser firefox --human fetch https://example.com/

    # Parse a User-Agent string
    llamamoonlight user-agent --parse "Mozilla/5.0 (X11; Linux x86_64; rv:97.0) Gecko/20100101 Firefox/97.0"

    # Write a default configuration file
    llamamoonlight config init
"#)]
struct Cli {
    /// Configuration file (TOML); must exist when given
    #[arg(long, global = true, env = "LLAMAMOONLIGHT_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "LLAMAMOONLIGHT_LOG", default_value = "warn")]
    log_level: String,

    /// Proxy URL; repeat to build a rotating pool
    #[arg(long = "proxy", global = true, value_name = "URL")]
    proxies: Vec<String>,

    /// Request timeout in seconds
    #[arg(long, global = true, value_name = "SECS")]
    timeout: Option<u64>,

    /// Impersonate mobile browsers
    #[arg(long, global = true)]
    mobile: bool,

    /// Locale for Accept-Language and referers (e.g. de-DE)
    #[arg(long, global = true, value_name = "LANG")]
    language: Option<String>,

    /// Only use User-Agents of this browser
    #[arg(long, global = true, value_parser = ["chrome", "firefox", "safari", "edge"])]
    browser: Option<String>,

    /// Pause 0.5-3 s before each request
    #[arg(long, global = true)]
    human: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print generated browser headers for a URL
    Headers {
        url: String,

        /// Number of header sets to generate
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// GET a URL with generated headers
    Fetch {
        url: String,

        /// Write the body to this file instead of stdout
        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Save the body into a timestamped session directory under DIR
        #[arg(long, value_name = "DIR")]
        save_dir: Option<PathBuf>,

        /// Print the status line and response headers before the body
        #[arg(short = 'i', long)]
        include_headers: bool,

        /// Print the whole response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse a User-Agent or print random ones
    UserAgent {
        /// User-Agent string to parse
        #[arg(long, value_name = "UA")]
        parse: Option<String>,

        /// Number of random User-Agents to print
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Work with the configured proxy pool
    Proxy {
        #[command(subcommand)]
        action: ProxyAction,
    },
}

#[derive(Subcommand, Debug)]
enum ProxyAction {
    /// Fetch a test URL through every proxy and report which ones work
    Check {
        /// URL fetched through each proxy
        #[arg(long, default_value = DEFAULT_CHECK_URL)]
        url: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Write a default configuration file
    Init {
        /// Destination (default: platform config directory)
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration as TOML
    Show,

    /// Print the default configuration file location
    Path,
}

/// Resolve configuration: explicit file, then the default file, then the environment; flags last
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => match Config::default_path().filter(|p| p.exists()) {
            Some(path) => Config::load(&path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
            None => Config::from_env(),
        },
    };

    apply_flags(cli, &mut config);
    config.validate()?;
    Ok(config)
}

fn apply_flags(cli: &Cli, config: &mut Config) {
    if !cli.proxies.is_empty() {
        config.proxy.urls = cli.proxies.clone();
    }
    if let Some(timeout) = cli.timeout {
        config.http.timeout_secs = timeout;
    }
    if cli.mobile {
        config.headers.mobile = true;
    }
    if let Some(language) = &cli.language {
        config.headers.language = Some(language.clone());
    }
    if let Some(browser) = cli.browser.as_deref().and_then(BrowserKind::from_str) {
        config.headers.browser = Some(browser);
    }
    if cli.human {
        config.timing.delay = DelayConfig::human();
    }
}

fn header_json(header: &Header) -> serde_json::Value {
    json!({
        "user_agent": header.user_agent,
        "headers": header.headers,
    })
}

fn response_json(response: &Response) -> serde_json::Value {
    json!({
        "url": response.url,
        "status": response.status,
        "headers": response.headers,
        "attempts": response.attempts,
        "elapsed_ms": response.elapsed.as_millis() as u64,
        "proxy": response.proxy,
        "fetched_at": response.fetched_at.to_rfc3339(),
        "body": response.text(),
    })
}

fn print_headers(client: &Client, url: &str, count: usize, as_json: bool) -> Result<()> {
    let headers = (0..count)
        .map(|_| client.generate_headers(url))
        .collect::<llamamoonlight::Result<Vec<_>>>()?;

    if as_json {
        let values: Vec<_> = headers.iter().map(header_json).collect();
        println!("{}", serde_json::to_string_pretty(&values)?);
        return Ok(());
    }

    for (i, header) in headers.iter().enumerate() {
        if count > 1 {
            if i > 0 {
                println!();
            }
            println!("# Header set {}", i + 1);
        }
        print!("{}", header);
    }
    Ok(())
}

async fn fetch(
    client: &Client,
    url: &str,
    output: Option<&Path>,
    save_dir: Option<&Path>,
    include_headers: bool,
    as_json: bool,
) -> Result<()> {
    let response = client.get(url).await?;

    if let Some(dir) = save_dir {
        let mut saver = ResponseSaver::new(dir).await?;
        let path = saver.save(&response).await?;
        eprintln!("Saved {} bytes to {}", response.body.len(), path.display());
    }

    if as_json {
        println!("{}", serde_json::to_string_pretty(&response_json(&response))?);
        return Ok(());
    }

    if include_headers {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "HTTP {} {}", response.status, response.url)?;
        for (name, values) in &response.headers {
            for value in values {
                writeln!(stdout, "{}: {}", name, value)?;
            }
        }
        writeln!(stdout)?;
    }

    if let Some(path) = output {
        tokio::fs::write(path, &response.body)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        eprintln!("Saved {} bytes to {}", response.body.len(), path.display());
    } else if save_dir.is_none() {
        let mut stdout = io::stdout().lock();
        stdout.write_all(&response.body)?;
        stdout.flush()?;
    }
    Ok(())
}

fn check_line(check: &ProxyCheck) -> String {
    match (check.working, check.response_time_ms) {
        (true, Some(ms)) => format!("OK    {} ({} ms)", check.proxy, ms),
        (true, None) => format!("OK    {}", check.proxy),
        (false, _) => format!(
            "FAIL  {} ({})",
            check.proxy,
            check.error.as_deref().unwrap_or("unknown error")
        ),
    }
}

async fn proxy_command(cli: &Cli, action: &ProxyAction) -> Result<()> {
    match action {
        ProxyAction::Check { url, json } => {
            let config = load_config(cli)?;
            if config.proxy.urls.is_empty() {
                bail!("No proxies configured; pass --proxy or set proxy.urls");
            }

            let client = Client::new(config)?;
            let checks = client.validate_proxies(url).await;
            let working = checks.iter().filter(|c| c.working).count();

            if *json {
                println!("{}", serde_json::to_string_pretty(&checks)?);
            } else {
                for check in &checks {
                    println!("{}", check_line(check));
                }
                println!("{} of {} proxies working", working, checks.len());
            }

            if working == 0 {
                bail!("No working proxies");
            }
        }
    }
    Ok(())
}

fn user_agents(parse: Option<&str>, count: usize, mobile: bool) -> Result<()> {
    if let Some(ua) = parse {
        let ua = UserAgent::parse(ua)?;
        println!("Browser:    {} {}", ua.browser, ua.browser_version);
        println!("OS:         {} {}", ua.os, ua.os_version);
        println!("Mobile:     {}", ua.is_mobile());
        println!("Chromium:   {}", ua.is_chromium());
        return Ok(());
    }

    for _ in 0..count {
        println!("{}", UserAgent::random(mobile)?);
    }
    Ok(())
}

fn config_command(cli: &Cli, action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Init { path, force } => {
            let path = match path.clone().or_else(Config::default_path) {
                Some(path) => path,
                None => bail!("Could not determine a configuration directory; pass a PATH"),
            };
            if path.exists() && !force {
                bail!(
                    "{} already exists; use --force to overwrite",
                    path.display()
                );
            }
            Config::default().save(&path)?;
            println!("Wrote default configuration to {}", path.display());
        }
        ConfigAction::Show => {
            print!("{}", load_config(cli)?.to_toml()?);
        }
        ConfigAction::Path => match Config::default_path() {
            Some(path) => {
                let state = if path.exists() { "exists" } else { "not created" };
                println!("{} ({})", path.display(), state);
            }
            None => bail!("Could not determine a configuration directory"),
        },
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match &cli.command {
        Command::Headers { url, count, json } => {
            let client = Client::new(load_config(&cli)?)?;
            print_headers(&client, url, *count, *json)
        }
        Command::Fetch {
            url,
            output,
            save_dir,
            include_headers,
            json,
        } => {
            let client = Client::new(load_config(&cli)?)?;
            fetch(
                &client,
                url,
                output.as_deref(),
                save_dir.as_deref(),
                *include_headers,
                *json,
            )
            .await
        }
        Command::UserAgent { parse, count } => user_agents(parse.as_deref(), *count, cli.mobile),
        Command::Config { action } => config_command(&cli, action),
        Command::Proxy { action } => proxy_command(&cli, action).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_fetch_with_globals() {
        let cli = Cli::try_parse_from([
            "llamamoonlight",
            "fetch",
            "https://example.com/",
            "--proxy",
            "http://10.0.0.1:8080",
            "--proxy",
            "http://10.0.0.2:8080",
            "--timeout",
            "5",
            "-i",
        ])
        .unwrap();

        assert_eq!(cli.proxies.len(), 2);
        assert_eq!(cli.timeout, Some(5));
        match cli.command {
            Command::Fetch {
                url,
                include_headers,
                json,
                ..
            } => {
                assert_eq!(url, "https://example.com/");
                assert!(include_headers);
                assert!(!json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from([
            "llamamoonlight",
            "--mobile",
            "--language",
            "fr-FR",
            "--timeout",
            "7",
            "--proxy",
            "socks5://127.0.0.1:9050",
            "--browser",
            "firefox",
            "--human",
            "headers",
            "https://example.com/",
        ])
        .unwrap();

        let mut config = Config::default().with_timeout(60);
        apply_flags(&cli, &mut config);
        assert!(config.headers.mobile);
        assert_eq!(config.headers.language.as_deref(), Some("fr-FR"));
        assert_eq!(config.headers.browser, Some(BrowserKind::Firefox));
        assert_eq!(config.timing.delay, DelayConfig::human());
        assert_eq!(config.http.timeout_secs, 7);
        assert_eq!(config.proxy.urls, vec!["socks5://127.0.0.1:9050".to_string()]);
    }

    #[test]
    fn test_unknown_browser_rejected() {
        let parsed = Cli::try_parse_from([
            "llamamoonlight",
            "--browser",
            "netscape",
            "headers",
            "https://example.com/",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_parse_proxy_check() {
        let cli = Cli::try_parse_from(["llamamoonlight", "proxy", "check", "--json"]).unwrap();
        match cli.command {
            Command::Proxy {
                action: ProxyAction::Check { url, json },
            } => {
                assert_eq!(url, DEFAULT_CHECK_URL);
                assert!(json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_check_line() {
        let ok = ProxyCheck {
            proxy: "http://10.0.0.1:8080".to_string(),
            working: true,
            status: Some(200),
            response_time_ms: Some(42),
            error: None,
        };
        assert_eq!(check_line(&ok), "OK    http://10.0.0.1:8080 (42 ms)");

        let failed = ProxyCheck {
            working: false,
            status: None,
            response_time_ms: None,
            error: Some("connection refused".to_string()),
            ..ok
        };
        assert_eq!(check_line(&failed), "FAIL  http://10.0.0.1:8080 (connection refused)");
    }
}
